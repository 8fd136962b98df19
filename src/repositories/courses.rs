#[cfg(test)]
use sqlx::PgPool;

use crate::db::models::Course;

const COLUMNS: &str = "id, short_name, title, max_locked_submissions, created_at, updated_at";

#[cfg(test)]
pub(crate) struct CreateCourse<'a> {
    pub(crate) id: &'a str,
    pub(crate) short_name: &'a str,
    pub(crate) title: &'a str,
    pub(crate) max_locked_submissions: Option<i32>,
    pub(crate) created_at: time::PrimitiveDateTime,
}

#[cfg(test)]
pub(crate) async fn create(pool: &PgPool, params: CreateCourse<'_>) -> Result<Course, sqlx::Error> {
    sqlx::query_as::<_, Course>(&format!(
        "INSERT INTO courses (id, short_name, title, max_locked_submissions, created_at, updated_at)
         VALUES ($1,$2,$3,$4,$5,$5)
         RETURNING {COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.short_name)
    .bind(params.title)
    .bind(params.max_locked_submissions)
    .bind(params.created_at)
    .fetch_one(pool)
    .await
}

pub(crate) async fn find_by_id(
    executor: impl sqlx::PgExecutor<'_>,
    course_id: &str,
) -> Result<Option<Course>, sqlx::Error> {
    sqlx::query_as::<_, Course>(&format!("SELECT {COLUMNS} FROM courses WHERE id = $1"))
        .bind(course_id)
        .fetch_optional(executor)
        .await
}
