use time::PrimitiveDateTime;

use crate::db::models::ComplaintResponse;

const COLUMNS: &str = "\
    id, complaint_id, reviewer_id, response_text, accepted, resolved, locked_at, \
    submitted_at, created_at";

pub(crate) async fn find_by_complaint(
    executor: impl sqlx::PgExecutor<'_>,
    complaint_id: &str,
) -> Result<Option<ComplaintResponse>, sqlx::Error> {
    sqlx::query_as::<_, ComplaintResponse>(&format!(
        "SELECT {COLUMNS} FROM complaint_responses WHERE complaint_id = $1"
    ))
    .bind(complaint_id)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn find_by_complaint_for_update(
    executor: impl sqlx::PgExecutor<'_>,
    complaint_id: &str,
) -> Result<Option<ComplaintResponse>, sqlx::Error> {
    sqlx::query_as::<_, ComplaintResponse>(&format!(
        "SELECT {COLUMNS} FROM complaint_responses WHERE complaint_id = $1 FOR UPDATE"
    ))
    .bind(complaint_id)
    .fetch_optional(executor)
    .await
}

/// Creates the empty response that reserves the complaint. `None` if one already exists.
pub(crate) async fn insert_sentinel(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
    complaint_id: &str,
    reviewer_id: &str,
    now: PrimitiveDateTime,
) -> Result<Option<ComplaintResponse>, sqlx::Error> {
    sqlx::query_as::<_, ComplaintResponse>(&format!(
        "INSERT INTO complaint_responses (
            id, complaint_id, reviewer_id, response_text, accepted, resolved,
            locked_at, submitted_at, created_at
         ) VALUES ($1,$2,$3,NULL,NULL,FALSE,$4,NULL,$4)
         ON CONFLICT (complaint_id) DO NOTHING
         RETURNING {COLUMNS}"
    ))
    .bind(id)
    .bind(complaint_id)
    .bind(reviewer_id)
    .bind(now)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn restamp(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
    now: PrimitiveDateTime,
) -> Result<ComplaintResponse, sqlx::Error> {
    sqlx::query_as::<_, ComplaintResponse>(&format!(
        "UPDATE complaint_responses SET locked_at = $1 WHERE id = $2 RETURNING {COLUMNS}"
    ))
    .bind(now)
    .bind(id)
    .fetch_one(executor)
    .await
}

pub(crate) async fn delete_sentinel(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
) -> Result<bool, sqlx::Error> {
    let deleted = sqlx::query(
        "DELETE FROM complaint_responses
         WHERE id = $1 AND NOT resolved AND response_text IS NULL",
    )
    .bind(id)
    .execute(executor)
    .await?;
    Ok(deleted.rows_affected() > 0)
}

pub(crate) async fn resolve(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
    response_text: &str,
    accepted: bool,
    now: PrimitiveDateTime,
) -> Result<ComplaintResponse, sqlx::Error> {
    sqlx::query_as::<_, ComplaintResponse>(&format!(
        "UPDATE complaint_responses
         SET response_text = $1, accepted = $2, resolved = TRUE, submitted_at = $3
         WHERE id = $4
         RETURNING {COLUMNS}"
    ))
    .bind(response_text)
    .bind(accepted)
    .bind(now)
    .bind(id)
    .fetch_one(executor)
    .await
}
