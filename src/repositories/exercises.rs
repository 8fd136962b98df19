#[cfg(test)]
use sqlx::PgPool;
#[cfg(test)]
use time::PrimitiveDateTime;

use crate::db::models::Exercise;
#[cfg(test)]
use crate::db::types::ExerciseType;

const COLUMNS: &str = "\
    id, course_id, exercise_type, title, max_points, bonus_points, due_date, \
    assessment_due_date, is_exam_exercise, correction_rounds, lock_limit_override, \
    created_at, updated_at";

pub(crate) async fn find_by_id(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
) -> Result<Option<Exercise>, sqlx::Error> {
    sqlx::query_as::<_, Exercise>(&format!("SELECT {COLUMNS} FROM exercises WHERE id = $1"))
        .bind(id)
        .fetch_optional(executor)
        .await
}

#[cfg(test)]
pub(crate) struct CreateExercise<'a> {
    pub(crate) id: &'a str,
    pub(crate) course_id: &'a str,
    pub(crate) exercise_type: ExerciseType,
    pub(crate) title: &'a str,
    pub(crate) max_points: f64,
    pub(crate) bonus_points: f64,
    pub(crate) due_date: Option<PrimitiveDateTime>,
    pub(crate) assessment_due_date: Option<PrimitiveDateTime>,
    pub(crate) is_exam_exercise: bool,
    pub(crate) correction_rounds: i32,
    pub(crate) lock_limit_override: Option<i32>,
    pub(crate) created_at: PrimitiveDateTime,
}

#[cfg(test)]
pub(crate) async fn create(
    pool: &PgPool,
    params: CreateExercise<'_>,
) -> Result<Exercise, sqlx::Error> {
    sqlx::query_as::<_, Exercise>(&format!(
        "INSERT INTO exercises (
            id, course_id, exercise_type, title, max_points, bonus_points, due_date,
            assessment_due_date, is_exam_exercise, correction_rounds, lock_limit_override,
            created_at, updated_at
         ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$12)
         RETURNING {COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.course_id)
    .bind(params.exercise_type)
    .bind(params.title)
    .bind(params.max_points)
    .bind(params.bonus_points)
    .bind(params.due_date)
    .bind(params.assessment_due_date)
    .bind(params.is_exam_exercise)
    .bind(params.correction_rounds)
    .bind(params.lock_limit_override)
    .bind(params.created_at)
    .fetch_one(pool)
    .await
}

#[cfg(test)]
pub(crate) async fn set_assessment_due_date(
    pool: &PgPool,
    id: &str,
    assessment_due_date: Option<PrimitiveDateTime>,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE exercises SET assessment_due_date = $1 WHERE id = $2")
        .bind(assessment_due_date)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}
