#[cfg(test)]
use sqlx::PgPool;

use crate::db::models::Participation;

const COLUMNS: &str = "id, exercise_id, student_id, created_at";

pub(crate) async fn find_by_id(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
) -> Result<Option<Participation>, sqlx::Error> {
    sqlx::query_as::<_, Participation>(&format!(
        "SELECT {COLUMNS} FROM participations WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(executor)
    .await
}

#[cfg(test)]
pub(crate) async fn create(
    pool: &PgPool,
    id: &str,
    exercise_id: &str,
    student_id: &str,
    created_at: time::PrimitiveDateTime,
) -> Result<Participation, sqlx::Error> {
    sqlx::query_as::<_, Participation>(&format!(
        "INSERT INTO participations (id, exercise_id, student_id, created_at)
         VALUES ($1,$2,$3,$4)
         RETURNING {COLUMNS}"
    ))
    .bind(id)
    .bind(exercise_id)
    .bind(student_id)
    .bind(created_at)
    .fetch_one(pool)
    .await
}
