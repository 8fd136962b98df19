use time::PrimitiveDateTime;

use crate::db::models::Complaint;
use crate::db::types::ComplaintStatus;

const COLUMNS: &str = "id, result_id, student_id, complaint_text, status, submitted_at";

#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct ComplaintContext {
    pub(crate) complaint_id: String,
    pub(crate) result_id: String,
    pub(crate) submission_id: String,
    pub(crate) course_id: String,
    pub(crate) assessor_id: Option<String>,
    pub(crate) status: ComplaintStatus,
}

pub(crate) async fn find_by_id(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
) -> Result<Option<Complaint>, sqlx::Error> {
    sqlx::query_as::<_, Complaint>(&format!("SELECT {COLUMNS} FROM complaints WHERE id = $1"))
        .bind(id)
        .fetch_optional(executor)
        .await
}

pub(crate) async fn find_context(
    executor: impl sqlx::PgExecutor<'_>,
    complaint_id: &str,
) -> Result<Option<ComplaintContext>, sqlx::Error> {
    sqlx::query_as::<_, ComplaintContext>(
        "SELECT c.id AS complaint_id,
                c.result_id,
                r.submission_id,
                e.course_id,
                r.assessor_id,
                c.status
         FROM complaints c
         JOIN results r ON r.id = c.result_id
         JOIN submissions s ON s.id = r.submission_id
         JOIN participations p ON p.id = s.participation_id
         JOIN exercises e ON e.id = p.exercise_id
         WHERE c.id = $1",
    )
    .bind(complaint_id)
    .fetch_optional(executor)
    .await
}

pub(crate) struct CreateComplaint<'a> {
    pub(crate) id: &'a str,
    pub(crate) result_id: &'a str,
    pub(crate) student_id: &'a str,
    pub(crate) complaint_text: &'a str,
    pub(crate) submitted_at: PrimitiveDateTime,
}

pub(crate) async fn create(
    executor: impl sqlx::PgExecutor<'_>,
    params: CreateComplaint<'_>,
) -> Result<Option<Complaint>, sqlx::Error> {
    sqlx::query_as::<_, Complaint>(&format!(
        "INSERT INTO complaints (id, result_id, student_id, complaint_text, status, submitted_at)
         VALUES ($1,$2,$3,$4,$5,$6)
         ON CONFLICT (result_id) DO NOTHING
         RETURNING {COLUMNS}"
    ))
    .bind(params.id)
    .bind(params.result_id)
    .bind(params.student_id)
    .bind(params.complaint_text)
    .bind(ComplaintStatus::Open)
    .bind(params.submitted_at)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn set_status(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
    status: ComplaintStatus,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE complaints SET status = $1 WHERE id = $2")
        .bind(status)
        .bind(id)
        .execute(executor)
        .await?;
    Ok(())
}
