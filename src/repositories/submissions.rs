use sqlx::{Postgres, QueryBuilder};

use crate::db::models::Submission;

const COLUMNS: &str =
    "id, participation_id, exercise_type, content, submitted, submitted_at, created_at";

const PREFIXED_COLUMNS: &str = "\
    s.id, s.participation_id, s.exercise_type, s.content, s.submitted, s.submitted_at, \
    s.created_at";

#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct SubmissionContext {
    pub(crate) participation_id: String,
    pub(crate) student_id: String,
    pub(crate) exercise_id: String,
    pub(crate) course_id: String,
    pub(crate) is_latest_submitted: bool,
}

pub(crate) struct CandidateFilter<'a> {
    pub(crate) exercise_id: &'a str,
    pub(crate) correction_round: i32,
    pub(crate) exclude_previous_assessor: Option<&'a str>,
    pub(crate) skip_order: bool,
}

pub(crate) async fn find_by_id(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
) -> Result<Option<Submission>, sqlx::Error> {
    sqlx::query_as::<_, Submission>(&format!("SELECT {COLUMNS} FROM submissions WHERE id = $1"))
        .bind(id)
        .fetch_optional(executor)
        .await
}

pub(crate) async fn find_context(
    executor: impl sqlx::PgExecutor<'_>,
    submission_id: &str,
) -> Result<Option<SubmissionContext>, sqlx::Error> {
    sqlx::query_as::<_, SubmissionContext>(
        "SELECT p.id AS participation_id,
                p.student_id,
                e.id AS exercise_id,
                e.course_id,
                (s.submitted AND s.id = (
                    SELECT latest.id
                    FROM submissions latest
                    WHERE latest.participation_id = s.participation_id AND latest.submitted
                    ORDER BY latest.submitted_at DESC NULLS LAST, latest.id DESC
                    LIMIT 1
                )) AS is_latest_submitted
         FROM submissions s
         JOIN participations p ON p.id = s.participation_id
         JOIN exercises e ON e.id = p.exercise_id
         WHERE s.id = $1",
    )
    .bind(submission_id)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn find_candidate(
    executor: impl sqlx::PgExecutor<'_>,
    filter: CandidateFilter<'_>,
) -> Result<Option<Submission>, sqlx::Error> {
    let mut builder = QueryBuilder::<Postgres>::new(format!(
        "SELECT {PREFIXED_COLUMNS}
         FROM submissions s
         JOIN participations p ON p.id = s.participation_id
         WHERE s.submitted
           AND s.id = (
               SELECT latest.id
               FROM submissions latest
               WHERE latest.participation_id = s.participation_id AND latest.submitted
               ORDER BY latest.submitted_at DESC NULLS LAST, latest.id DESC
               LIMIT 1
           )
           AND p.exercise_id = "
    ));
    builder.push_bind(filter.exercise_id);
    builder.push(
        " AND NOT EXISTS (
             SELECT 1 FROM results r
             WHERE r.submission_id = s.id AND r.correction_round = ",
    );
    builder.push_bind(filter.correction_round);
    builder.push(")");

    if filter.correction_round > 0 {
        builder.push(
            " AND EXISTS (
                 SELECT 1 FROM results prev
                 WHERE prev.submission_id = s.id
                   AND prev.completion_date IS NOT NULL
                   AND prev.correction_round = ",
        );
        builder.push_bind(filter.correction_round - 1);
        if let Some(assessor_id) = filter.exclude_previous_assessor {
            builder.push(" AND prev.assessor_id IS DISTINCT FROM ");
            builder.push_bind(assessor_id);
        }
        builder.push(")");
    }

    if !filter.skip_order {
        builder.push(" ORDER BY s.submitted_at ASC NULLS LAST, s.id ASC");
    }
    builder.push(" LIMIT 1");

    builder.build_query_as::<Submission>().fetch_optional(executor).await
}

#[cfg(test)]
pub(crate) struct CreateSubmission<'a> {
    pub(crate) id: &'a str,
    pub(crate) participation_id: &'a str,
    pub(crate) exercise_type: crate::db::types::ExerciseType,
    pub(crate) content: serde_json::Value,
    pub(crate) submitted_at: Option<time::PrimitiveDateTime>,
    pub(crate) created_at: time::PrimitiveDateTime,
}

#[cfg(test)]
pub(crate) async fn create(
    pool: &sqlx::PgPool,
    params: CreateSubmission<'_>,
) -> Result<Submission, sqlx::Error> {
    sqlx::query_as::<_, Submission>(&format!(
        "INSERT INTO submissions (
            id, participation_id, exercise_type, content, submitted, submitted_at, created_at
         ) VALUES ($1,$2,$3,$4,$5,$6,$7)
         RETURNING {COLUMNS}"
    ))
    .bind(params.id)
    .bind(params.participation_id)
    .bind(params.exercise_type)
    .bind(sqlx::types::Json(params.content))
    .bind(params.submitted_at.is_some())
    .bind(params.submitted_at)
    .bind(params.created_at)
    .fetch_one(pool)
    .await
}
