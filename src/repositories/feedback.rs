use uuid::Uuid;

use crate::db::models::Feedback;
use crate::db::types::FeedbackType;

const COLUMNS: &str = "id, result_id, position, feedback_type, reference, text, detail_text, credits";

#[derive(Debug, Clone)]
pub(crate) struct NewFeedback {
    pub(crate) feedback_type: FeedbackType,
    pub(crate) reference: Option<String>,
    pub(crate) text: Option<String>,
    pub(crate) detail_text: Option<String>,
    pub(crate) credits: f64,
}

pub(crate) async fn list_by_result(
    executor: impl sqlx::PgExecutor<'_>,
    result_id: &str,
) -> Result<Vec<Feedback>, sqlx::Error> {
    sqlx::query_as::<_, Feedback>(&format!(
        "SELECT {COLUMNS} FROM feedbacks WHERE result_id = $1 ORDER BY position ASC, id ASC"
    ))
    .bind(result_id)
    .fetch_all(executor)
    .await
}

pub(crate) async fn replace_for_result(
    conn: &mut sqlx::PgConnection,
    result_id: &str,
    items: &[NewFeedback],
    keep_automatic: bool,
) -> Result<Vec<Feedback>, sqlx::Error> {
    if keep_automatic {
        sqlx::query("DELETE FROM feedbacks WHERE result_id = $1 AND feedback_type <> $2")
            .bind(result_id)
            .bind(FeedbackType::Automatic)
            .execute(&mut *conn)
            .await?;
    } else {
        sqlx::query("DELETE FROM feedbacks WHERE result_id = $1")
            .bind(result_id)
            .execute(&mut *conn)
            .await?;
    }

    let offset: i32 =
        sqlx::query_scalar("SELECT COALESCE(MAX(position) + 1, 0) FROM feedbacks WHERE result_id = $1")
            .bind(result_id)
            .fetch_one(&mut *conn)
            .await?;

    for (index, item) in items.iter().enumerate() {
        sqlx::query(
            "INSERT INTO feedbacks (
                id, result_id, position, feedback_type, reference, text, detail_text, credits
             ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8)",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(result_id)
        .bind(offset + index as i32)
        .bind(item.feedback_type)
        .bind(item.reference.as_deref())
        .bind(item.text.as_deref())
        .bind(item.detail_text.as_deref())
        .bind(item.credits)
        .execute(&mut *conn)
        .await?;
    }

    list_by_result(&mut *conn, result_id).await
}
