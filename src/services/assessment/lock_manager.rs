use async_trait::async_trait;
use sqlx::PgPool;
use time::PrimitiveDateTime;
use uuid::Uuid;

use crate::core::metrics;
use crate::core::time::primitive_now_utc;
use crate::db::models::{AssessmentResult, Course, Exercise, Feedback, Submission};
use crate::repositories;
use crate::repositories::feedback::NewFeedback;
use crate::repositories::submissions::CandidateFilter;
use crate::services::authorization::Actor;
use crate::services::complaint_lock::ResultReopener;

use super::accessor::accessor_for;
use super::correction_rounds::{self, AssessorConflictPolicy};
use super::lock_limit::check_submission_lock_limit;
use super::score::calculate_score;
use super::{AssessmentError, LockOutcome};

pub(crate) struct LockRequest<'a> {
    pub(crate) course: &'a Course,
    pub(crate) exercise: &'a Exercise,
    pub(crate) submission: &'a Submission,
    pub(crate) correction_round: i32,
    pub(crate) grader_id: &'a str,
    pub(crate) ceiling: i64,
    pub(crate) policy: AssessorConflictPolicy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CancelOutcome {
    Cancelled,
    NothingToCancel,
}

#[derive(Debug)]
pub(crate) struct SavedAssessment {
    pub(crate) result: AssessmentResult,
    pub(crate) feedbacks: Vec<Feedback>,
}

pub(crate) async fn select_eligible_submission(
    pool: &PgPool,
    exercise: &Exercise,
    correction_round: i32,
    skip_order: bool,
    grader_id: &str,
    policy: AssessorConflictPolicy,
) -> Result<Option<Submission>, AssessmentError> {
    let filter = CandidateFilter {
        exercise_id: &exercise.id,
        correction_round,
        exclude_previous_assessor: policy.excluded_assessor(exercise, correction_round, grader_id),
        skip_order,
    };
    Ok(repositories::submissions::find_candidate(pool, filter).await?)
}

pub(crate) async fn lock_submission(
    pool: &PgPool,
    request: LockRequest<'_>,
) -> Result<LockOutcome, AssessmentError> {
    let LockRequest { course, exercise, submission, correction_round, grader_id, ceiling, policy } =
        request;
    correction_rounds::validate_round_index(exercise, correction_round)?;

    let mut tx = pool.begin().await?;
    repositories::results::acquire_grader_course_lock(&mut *tx, grader_id, &course.id).await?;

    let existing =
        repositories::results::find_for_round(&mut *tx, &submission.id, correction_round).await?;
    if let Some(existing) = existing {
        let outcome = if existing.is_locked_by(grader_id) {
            LockOutcome::Resumed(existing)
        } else if existing.is_finalized() {
            LockOutcome::Assessed
        } else {
            LockOutcome::Taken
        };
        tx.commit().await?;
        return Ok(record_lock(outcome, &submission.id, correction_round, grader_id));
    }

    let limit =
        check_submission_lock_limit(&mut *tx, grader_id, &course.id, ceiling).await?;
    if let Err(err) = limit.ensure_available() {
        metrics::record_assessment_lock("limit");
        tracing::info!(
            grader_id,
            course_id = %course.id,
            active = limit.active,
            ceiling = limit.ceiling,
            "Lock limit reached"
        );
        return Err(err);
    }

    let previous = correction_rounds::assert_round_eligible(
        &mut *tx,
        exercise,
        &submission.id,
        correction_round,
    )
    .await?;
    policy.check(exercise, correction_round, previous.as_ref(), grader_id)?;

    let accessor = accessor_for(exercise.exercise_type);
    let now = primitive_now_utc();
    let result_id = Uuid::new_v4().to_string();
    let inserted = repositories::results::insert_lock(
        &mut *tx,
        repositories::results::NewLock {
            id: &result_id,
            submission_id: &submission.id,
            correction_round,
            assessor_id: grader_id,
            assessment_type: accessor.initial_assessment_type(),
            locked_at: now,
        },
    )
    .await?;

    let Some(mut result) = inserted else {
        tx.rollback().await?;
        return Ok(record_lock(LockOutcome::Taken, &submission.id, correction_round, grader_id));
    };

    let seeded = accessor.seed_feedback(&submission.content.0);
    if !seeded.is_empty() {
        let feedbacks =
            repositories::feedback::replace_for_result(&mut *tx, &result.id, &seeded, false)
                .await?;
        let score = calculate_score(
            feedbacks.iter().map(|feedback| feedback.credits),
            exercise.max_points,
            exercise.bonus_points,
        );
        result = repositories::results::update_draft(
            &mut *tx,
            &result.id,
            score,
            result.assessment_type,
            now,
        )
        .await?;
    }

    tx.commit().await?;
    Ok(record_lock(LockOutcome::Acquired(result), &submission.id, correction_round, grader_id))
}

fn record_lock(
    outcome: LockOutcome,
    submission_id: &str,
    correction_round: i32,
    grader_id: &str,
) -> LockOutcome {
    metrics::record_assessment_lock(outcome.metric_label());
    tracing::info!(
        submission_id,
        correction_round,
        grader_id,
        outcome = outcome.metric_label(),
        "Assessment lock attempt"
    );
    outcome
}

pub(crate) async fn cancel_assessment(
    pool: &PgPool,
    submission_id: &str,
    correction_round: i32,
    actor: &Actor,
) -> Result<CancelOutcome, AssessmentError> {
    let mut tx = pool.begin().await?;
    let existing =
        repositories::results::find_for_round_for_update(&mut *tx, submission_id, correction_round)
            .await?;

    let Some(result) = existing.filter(AssessmentResult::is_active_lock) else {
        tx.commit().await?;
        return Ok(CancelOutcome::NothingToCancel);
    };

    if !result.is_locked_by(&actor.user_id) && !actor.is_instructor() {
        return Err(AssessmentError::Forbidden(
            "Only the assessor or an instructor can cancel this assessment",
        ));
    }
    if result.has_complaint {
        return Err(AssessmentError::BadRequest(
            "An assessment reopened by a complaint has to be submitted".to_string(),
        ));
    }

    repositories::results::delete_lock(&mut *tx, &result.id).await?;
    tx.commit().await?;

    metrics::record_assessment_lock("cancelled");
    tracing::info!(
        submission_id,
        correction_round,
        result_id = %result.id,
        cancelled_by = %actor.user_id,
        "Assessment cancelled"
    );
    Ok(CancelOutcome::Cancelled)
}

pub(crate) async fn save_assessment(
    pool: &PgPool,
    exercise: &Exercise,
    result_id: &str,
    feedback: &[NewFeedback],
    actor: &Actor,
) -> Result<SavedAssessment, AssessmentError> {
    let mut tx = pool.begin().await?;
    let result = load_draft_for_update(&mut *tx, result_id, actor).await?;
    let saved = write_feedback(&mut *tx, exercise, &result, feedback).await?;
    tx.commit().await?;

    tracing::info!(result_id, saved_by = %actor.user_id, "Assessment saved");
    Ok(saved)
}

pub(crate) async fn submit_assessment(
    pool: &PgPool,
    exercise: &Exercise,
    result_id: &str,
    feedback: Option<&[NewFeedback]>,
    actor: &Actor,
    submission_date: PrimitiveDateTime,
) -> Result<SavedAssessment, AssessmentError> {
    let mut tx = pool.begin().await?;
    let result = load_draft_for_update(&mut *tx, result_id, actor).await?;

    let feedbacks = match feedback {
        Some(feedback) => write_feedback(&mut *tx, exercise, &result, feedback).await?.feedbacks,
        None => repositories::feedback::list_by_result(&mut *tx, result_id).await?,
    };
    let result = repositories::results::finalize(&mut *tx, result_id, submission_date).await?;
    tx.commit().await?;

    metrics::record_assessment_lock("submitted");
    tracing::info!(
        result_id,
        submission_id = %result.submission_id,
        correction_round = result.correction_round,
        submitted_by = %actor.user_id,
        score = result.score,
        "Assessment submitted"
    );
    Ok(SavedAssessment { result, feedbacks })
}

async fn load_draft_for_update(
    conn: &mut sqlx::PgConnection,
    result_id: &str,
    actor: &Actor,
) -> Result<AssessmentResult, AssessmentError> {
    let result = repositories::results::find_by_id_for_update(&mut *conn, result_id)
        .await?
        .ok_or(AssessmentError::NotFound("Result not found"))?;

    if result.is_finalized() {
        return Err(AssessmentError::BadRequest("Assessment was already submitted".to_string()));
    }
    if !result.is_active_lock() {
        return Err(AssessmentError::BadRequest("No active lock for this submission".to_string()));
    }
    if !result.is_locked_by(&actor.user_id) && !actor.is_instructor() {
        return Err(AssessmentError::Forbidden("Submission is locked by another assessor"));
    }
    Ok(result)
}

async fn write_feedback(
    conn: &mut sqlx::PgConnection,
    exercise: &Exercise,
    result: &AssessmentResult,
    feedback: &[NewFeedback],
) -> Result<SavedAssessment, AssessmentError> {
    let accessor = accessor_for(exercise.exercise_type);
    let feedbacks = repositories::feedback::replace_for_result(
        &mut *conn,
        &result.id,
        feedback,
        accessor.preserves_automatic_feedback(),
    )
    .await?;

    let score = calculate_score(
        feedbacks.iter().map(|feedback| feedback.credits),
        exercise.max_points,
        exercise.bonus_points,
    );
    let result = repositories::results::update_draft(
        &mut *conn,
        &result.id,
        score,
        result.assessment_type,
        primitive_now_utc(),
    )
    .await?;

    Ok(SavedAssessment { result, feedbacks })
}

pub(crate) struct DraftReopener;

#[async_trait]
impl ResultReopener for DraftReopener {
    async fn reopen(
        &self,
        conn: &mut sqlx::PgConnection,
        result_id: &str,
        reviewer_id: &str,
        now: PrimitiveDateTime,
    ) -> Result<AssessmentResult, AssessmentError> {
        let current = repositories::results::find_by_id_for_update(&mut *conn, result_id)
            .await?
            .ok_or(AssessmentError::NotFound("Result not found"))?;
        let latest =
            repositories::results::latest_round(&mut *conn, &current.submission_id).await?;
        if latest.is_some_and(|round| round > current.correction_round) {
            return Err(AssessmentError::BadRequest(
                "A later correction round supersedes this result".to_string(),
            ));
        }

        let result = repositories::results::reopen(&mut *conn, result_id, reviewer_id, now).await?;
        metrics::record_assessment_lock("reopened");
        tracing::info!(result_id, reviewer_id, "Result reopened after accepted complaint");
        Ok(result)
    }
}
