use time::PrimitiveDateTime;

use crate::db::models::AssessmentResult;
use crate::db::types::AssessmentType;

use super::types::NewLock;
use super::COLUMNS;

pub(crate) async fn acquire_grader_course_lock(
    executor: impl sqlx::PgExecutor<'_>,
    assessor_id: &str,
    course_id: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
        .bind(format!("assessment-lock:{assessor_id}:{course_id}"))
        .execute(executor)
        .await?;
    Ok(())
}

/// Inserts the draft row; `None` means another request already owns the round.
pub(crate) async fn insert_lock(
    executor: impl sqlx::PgExecutor<'_>,
    lock: NewLock<'_>,
) -> Result<Option<AssessmentResult>, sqlx::Error> {
    sqlx::query_as::<_, AssessmentResult>(&format!(
        "INSERT INTO results (
            id, submission_id, correction_round, assessor_id, completion_date, rated, score,
            assessment_type, has_complaint, broadcast_at, created_at, updated_at
         ) VALUES ($1,$2,$3,$4,NULL,FALSE,NULL,$5,FALSE,NULL,$6,$6)
         ON CONFLICT ON CONSTRAINT results_submission_round_key DO NOTHING
         RETURNING {COLUMNS}"
    ))
    .bind(lock.id)
    .bind(lock.submission_id)
    .bind(lock.correction_round)
    .bind(lock.assessor_id)
    .bind(lock.assessment_type)
    .bind(lock.locked_at)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn delete_lock(
    executor: impl sqlx::PgExecutor<'_>,
    result_id: &str,
) -> Result<bool, sqlx::Error> {
    let deleted = sqlx::query("DELETE FROM results WHERE id = $1 AND completion_date IS NULL")
        .bind(result_id)
        .execute(executor)
        .await?;
    Ok(deleted.rows_affected() > 0)
}

pub(crate) async fn update_draft(
    executor: impl sqlx::PgExecutor<'_>,
    result_id: &str,
    score: f64,
    assessment_type: AssessmentType,
    now: PrimitiveDateTime,
) -> Result<AssessmentResult, sqlx::Error> {
    sqlx::query_as::<_, AssessmentResult>(&format!(
        "UPDATE results
         SET score = $1, assessment_type = $2, updated_at = $3
         WHERE id = $4
         RETURNING {COLUMNS}"
    ))
    .bind(score)
    .bind(assessment_type)
    .bind(now)
    .bind(result_id)
    .fetch_one(executor)
    .await
}

pub(crate) async fn finalize(
    executor: impl sqlx::PgExecutor<'_>,
    result_id: &str,
    completed_at: PrimitiveDateTime,
) -> Result<AssessmentResult, sqlx::Error> {
    sqlx::query_as::<_, AssessmentResult>(&format!(
        "UPDATE results
         SET completion_date = $1, rated = TRUE, updated_at = $1
         WHERE id = $2 AND completion_date IS NULL
         RETURNING {COLUMNS}"
    ))
    .bind(completed_at)
    .bind(result_id)
    .fetch_one(executor)
    .await
}

pub(crate) async fn reopen(
    executor: impl sqlx::PgExecutor<'_>,
    result_id: &str,
    assessor_id: &str,
    now: PrimitiveDateTime,
) -> Result<AssessmentResult, sqlx::Error> {
    sqlx::query_as::<_, AssessmentResult>(&format!(
        "UPDATE results
         SET completion_date = NULL,
             assessor_id = $1,
             rated = FALSE,
             broadcast_at = NULL,
             updated_at = $2
         WHERE id = $3
         RETURNING {COLUMNS}"
    ))
    .bind(assessor_id)
    .bind(now)
    .bind(result_id)
    .fetch_one(executor)
    .await
}

pub(crate) async fn mark_broadcast(
    executor: impl sqlx::PgExecutor<'_>,
    result_id: &str,
    now: PrimitiveDateTime,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE results SET broadcast_at = $1 WHERE id = $2 AND broadcast_at IS NULL")
        .bind(now)
        .bind(result_id)
        .execute(executor)
        .await?;
    Ok(())
}

pub(crate) async fn set_has_complaint(
    executor: impl sqlx::PgExecutor<'_>,
    result_id: &str,
    now: PrimitiveDateTime,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE results SET has_complaint = TRUE, updated_at = $1 WHERE id = $2")
        .bind(now)
        .bind(result_id)
        .execute(executor)
        .await?;
    Ok(())
}
