use sqlx::PgPool;
use time::PrimitiveDateTime;

use crate::db::models::AssessmentResult;

use super::types::{ActiveLockRow, ReleasableResult};
use super::COLUMNS;

pub(crate) async fn find_by_id(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
) -> Result<Option<AssessmentResult>, sqlx::Error> {
    sqlx::query_as::<_, AssessmentResult>(&format!("SELECT {COLUMNS} FROM results WHERE id = $1"))
        .bind(id)
        .fetch_optional(executor)
        .await
}

pub(crate) async fn find_by_id_for_update(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
) -> Result<Option<AssessmentResult>, sqlx::Error> {
    sqlx::query_as::<_, AssessmentResult>(&format!(
        "SELECT {COLUMNS} FROM results WHERE id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn find_for_round(
    executor: impl sqlx::PgExecutor<'_>,
    submission_id: &str,
    correction_round: i32,
) -> Result<Option<AssessmentResult>, sqlx::Error> {
    sqlx::query_as::<_, AssessmentResult>(&format!(
        "SELECT {COLUMNS} FROM results WHERE submission_id = $1 AND correction_round = $2"
    ))
    .bind(submission_id)
    .bind(correction_round)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn find_for_round_for_update(
    executor: impl sqlx::PgExecutor<'_>,
    submission_id: &str,
    correction_round: i32,
) -> Result<Option<AssessmentResult>, sqlx::Error> {
    sqlx::query_as::<_, AssessmentResult>(&format!(
        "SELECT {COLUMNS} FROM results
         WHERE submission_id = $1 AND correction_round = $2
         FOR UPDATE"
    ))
    .bind(submission_id)
    .bind(correction_round)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn list_for_submission(
    executor: impl sqlx::PgExecutor<'_>,
    submission_id: &str,
) -> Result<Vec<AssessmentResult>, sqlx::Error> {
    sqlx::query_as::<_, AssessmentResult>(&format!(
        "SELECT {COLUMNS} FROM results WHERE submission_id = $1 ORDER BY correction_round ASC"
    ))
    .bind(submission_id)
    .fetch_all(executor)
    .await
}

pub(crate) async fn latest_round(
    executor: impl sqlx::PgExecutor<'_>,
    submission_id: &str,
) -> Result<Option<i32>, sqlx::Error> {
    sqlx::query_scalar("SELECT MAX(correction_round) FROM results WHERE submission_id = $1")
        .bind(submission_id)
        .fetch_one(executor)
        .await
}

pub(crate) async fn count_active_locks(
    executor: impl sqlx::PgExecutor<'_>,
    assessor_id: &str,
    course_id: &str,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT COUNT(*)
         FROM results r
         JOIN submissions s ON s.id = r.submission_id
         JOIN participations p ON p.id = s.participation_id
         JOIN exercises e ON e.id = p.exercise_id
         WHERE r.assessor_id = $1
           AND r.completion_date IS NULL
           AND e.course_id = $2",
    )
    .bind(assessor_id)
    .bind(course_id)
    .fetch_one(executor)
    .await
}

pub(crate) async fn list_active_locks(
    pool: &PgPool,
    assessor_id: &str,
    course_id: &str,
) -> Result<Vec<ActiveLockRow>, sqlx::Error> {
    sqlx::query_as::<_, ActiveLockRow>(
        "SELECT r.id AS result_id,
                r.submission_id,
                r.correction_round,
                e.id AS exercise_id,
                e.title AS exercise_title,
                e.exercise_type,
                r.created_at AS locked_at
         FROM results r
         JOIN submissions s ON s.id = r.submission_id
         JOIN participations p ON p.id = s.participation_id
         JOIN exercises e ON e.id = p.exercise_id
         WHERE r.assessor_id = $1
           AND r.completion_date IS NULL
           AND e.course_id = $2
         ORDER BY r.created_at ASC, r.id ASC",
    )
    .bind(assessor_id)
    .bind(course_id)
    .fetch_all(pool)
    .await
}

pub(crate) async fn list_releasable(
    pool: &PgPool,
    now: PrimitiveDateTime,
    limit: i64,
) -> Result<Vec<ReleasableResult>, sqlx::Error> {
    sqlx::query_as::<_, ReleasableResult>(
        "SELECT r.id AS result_id, p.id AS participation_id
         FROM results r
         JOIN submissions s ON s.id = r.submission_id
         JOIN participations p ON p.id = s.participation_id
         JOIN exercises e ON e.id = p.exercise_id
         WHERE r.completion_date IS NOT NULL
           AND r.rated
           AND r.broadcast_at IS NULL
           AND (e.assessment_due_date IS NULL OR e.assessment_due_date <= $1)
           AND NOT EXISTS (
               SELECT 1 FROM results later
               WHERE later.submission_id = r.submission_id
                 AND later.correction_round > r.correction_round
           )
         ORDER BY r.completion_date ASC
         LIMIT $2",
    )
    .bind(now)
    .bind(limit.clamp(1, 1000))
    .fetch_all(pool)
    .await
}
