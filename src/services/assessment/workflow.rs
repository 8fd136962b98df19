use std::collections::HashMap;

use crate::core::state::AppState;
use crate::core::time::{format_optional, format_primitive, primitive_now_utc};
use crate::db::models::{AssessmentResult, Course, Exercise, Feedback, Submission, User};
use crate::db::types::{CourseRole, ExerciseType};
use crate::repositories;
use crate::repositories::feedback::NewFeedback;
use crate::repositories::submissions::SubmissionContext;
use crate::schemas::assessment::{
    LockedSubmissionView, LockedSubmissionsResponse, NextSubmissionQuery, ParticipantView,
    PersonView, ResultView, SubmissionView,
};
use crate::services::anonymization::{self, Viewer};
use crate::services::authorization::{actor_for_course, require_at_least, Actor};
use crate::services::result_broadcast;

use super::accessor::{accessor_for, SubmissionAccessor};
use super::correction_rounds::{validate_round_index, AssessorConflictPolicy};
use super::lock_limit::{check_submission_lock_limit, effective_ceiling};
use super::lock_manager::{self, CancelOutcome, LockRequest, SavedAssessment};
use super::AssessmentError;

struct ExerciseScope {
    course: Course,
    exercise: Exercise,
    actor: Actor,
    accessor: &'static dyn SubmissionAccessor,
}

impl ExerciseScope {
    fn ceiling(&self, state: &AppState) -> i64 {
        effective_ceiling(
            state.settings().assessment().max_locked_submissions_per_tutor,
            &self.course,
            Some(&self.exercise),
        )
    }

    // Course exercises cannot be assessed by tutors before students stopped submitting.
    // Exam exercises follow the exam schedule instead.
    fn ensure_assessment_open(&self) -> Result<(), AssessmentError> {
        if self.actor.is_instructor() || self.exercise.is_exam_exercise {
            return Ok(());
        }
        match self.exercise.due_date {
            Some(due) if primitive_now_utc() < due => Err(AssessmentError::Forbidden(
                "Assessment is not allowed before the exercise due date",
            )),
            _ => Ok(()),
        }
    }
}

fn conflict_policy(state: &AppState) -> AssessorConflictPolicy {
    AssessorConflictPolicy {
        excludes_first_assessor: state.settings().assessment().second_round_excludes_first_assessor,
    }
}

async fn load_exercise_scope(
    state: &AppState,
    user: &User,
    exercise_type: ExerciseType,
    exercise_id: &str,
) -> Result<ExerciseScope, AssessmentError> {
    let exercise = repositories::exercises::find_by_id(state.db(), exercise_id)
        .await?
        .ok_or(AssessmentError::NotFound("Exercise not found"))?;

    let accessor = accessor_for(exercise_type);
    if accessor.exercise_type() != exercise.exercise_type {
        return Err(AssessmentError::NotFound("Exercise not found"));
    }

    let course = repositories::courses::find_by_id(state.db(), &exercise.course_id)
        .await?
        .ok_or(AssessmentError::NotFound("Course not found"))?;
    let actor = actor_for_course(state.db(), user, &course.id).await?;
    require_at_least(&actor, CourseRole::Tutor)?;

    Ok(ExerciseScope { course, exercise, actor, accessor })
}

async fn load_submission_scope(
    state: &AppState,
    user: &User,
    exercise_type: ExerciseType,
    submission_id: &str,
) -> Result<(ExerciseScope, SubmissionContext, Submission), AssessmentError> {
    let context = repositories::submissions::find_context(state.db(), submission_id)
        .await?
        .ok_or(AssessmentError::NotFound("Submission not found"))?;
    let scope = load_exercise_scope(state, user, exercise_type, &context.exercise_id).await?;
    let submission = repositories::submissions::find_by_id(state.db(), submission_id)
        .await?
        .ok_or(AssessmentError::NotFound("Submission not found"))?;
    Ok((scope, context, submission))
}

async fn load_feedback(
    state: &AppState,
    results: Vec<AssessmentResult>,
) -> Result<Vec<(AssessmentResult, Vec<Feedback>)>, AssessmentError> {
    let mut loaded = Vec::with_capacity(results.len());
    for result in results {
        let feedbacks = repositories::feedback::list_by_result(state.db(), &result.id).await?;
        loaded.push((result, feedbacks));
    }
    Ok(loaded)
}

async fn render_submission(
    state: &AppState,
    scope: &ExerciseScope,
    submission: Submission,
    results: Vec<(AssessmentResult, Vec<Feedback>)>,
) -> Result<SubmissionView, AssessmentError> {
    let participation =
        repositories::participations::find_by_id(state.db(), &submission.participation_id)
            .await?
            .ok_or(AssessmentError::NotFound("Participation not found"))?;

    let mut user_ids: Vec<String> =
        results.iter().filter_map(|(result, _)| result.assessor_id.clone()).collect();
    user_ids.push(participation.student_id.clone());
    let names: HashMap<String, String> =
        repositories::users::find_names(state.db(), &user_ids).await?.into_iter().collect();

    let results = results
        .into_iter()
        .map(|(result, feedbacks)| {
            let assessor_name =
                result.assessor_id.as_ref().and_then(|id| names.get(id)).cloned();
            ResultView::new(result, feedbacks, assessor_name)
        })
        .collect();

    let view = SubmissionView {
        id: submission.id,
        exercise_id: participation.exercise_id,
        exercise_type: submission.exercise_type,
        participation: Some(ParticipantView {
            participation_id: participation.id,
            student: PersonView {
                name: names.get(&participation.student_id).cloned(),
                id: participation.student_id,
            },
        }),
        submitted_at: format_optional(submission.submitted_at),
        content: scope.accessor.project_content(&submission.content.0),
        results,
    };
    Ok(anonymization::apply(view, scope.actor.viewer()))
}

pub(crate) async fn next_submission(
    state: &AppState,
    user: &User,
    exercise_type: ExerciseType,
    exercise_id: &str,
    query: &NextSubmissionQuery,
) -> Result<Option<SubmissionView>, AssessmentError> {
    let scope = load_exercise_scope(state, user, exercise_type, exercise_id).await?;
    scope.ensure_assessment_open()?;
    validate_round_index(&scope.exercise, query.correction_round)?;

    let ceiling = scope.ceiling(state);
    if query.lock {
        check_submission_lock_limit(state.db(), &scope.actor.user_id, &scope.course.id, ceiling)
            .await?
            .ensure_available()?;
    }

    let policy = conflict_policy(state);
    let candidate = lock_manager::select_eligible_submission(
        state.db(),
        &scope.exercise,
        query.correction_round,
        query.head,
        &scope.actor.user_id,
        policy,
    )
    .await?;

    let Some(submission) = candidate else {
        return Ok(None);
    };

    if !query.lock {
        return render_submission(state, &scope, submission, Vec::new()).await.map(Some);
    }

    let outcome = lock_manager::lock_submission(
        state.db(),
        LockRequest {
            course: &scope.course,
            exercise: &scope.exercise,
            submission: &submission,
            correction_round: query.correction_round,
            grader_id: &scope.actor.user_id,
            ceiling,
            policy,
        },
    )
    .await?;

    let Some(result) = outcome.into_result() else {
        return Ok(None);
    };
    let results = load_feedback(state, vec![result]).await?;
    render_submission(state, &scope, submission, results).await.map(Some)
}

pub(crate) async fn lock_for_assessment(
    state: &AppState,
    user: &User,
    exercise_type: ExerciseType,
    submission_id: &str,
    correction_round: i32,
) -> Result<SubmissionView, AssessmentError> {
    let (scope, context, submission) =
        load_submission_scope(state, user, exercise_type, submission_id).await?;
    scope.ensure_assessment_open()?;
    if !context.is_latest_submitted {
        return Err(AssessmentError::BadRequest(
            "Only the latest submitted submission can be assessed".to_string(),
        ));
    }

    let outcome = lock_manager::lock_submission(
        state.db(),
        LockRequest {
            course: &scope.course,
            exercise: &scope.exercise,
            submission: &submission,
            correction_round,
            grader_id: &scope.actor.user_id,
            ceiling: scope.ceiling(state),
            policy: conflict_policy(state),
        },
    )
    .await?;

    let result = outcome.into_locked()?;
    let results = load_feedback(state, vec![result]).await?;
    render_submission(state, &scope, submission, results).await
}

pub(crate) async fn save_feedback(
    state: &AppState,
    user: &User,
    exercise_type: ExerciseType,
    submission_id: &str,
    correction_round: i32,
    feedback: Vec<NewFeedback>,
    submit: bool,
) -> Result<ResultView, AssessmentError> {
    let (scope, context, _submission) =
        load_submission_scope(state, user, exercise_type, submission_id).await?;
    validate_round_index(&scope.exercise, correction_round)?;

    let result =
        repositories::results::find_for_round(state.db(), submission_id, correction_round)
            .await?
            .ok_or_else(|| {
                AssessmentError::BadRequest("No active lock for this submission".to_string())
            })?;

    let SavedAssessment { result, feedbacks } = if submit {
        let now = primitive_now_utc();
        let saved = lock_manager::submit_assessment(
            state.db(),
            &scope.exercise,
            &result.id,
            Some(&feedback),
            &scope.actor,
            now,
        )
        .await?;

        if scope.exercise.results_visible_at(now) {
            let released = result_broadcast::release_result(
                state,
                saved.result.clone(),
                &context.participation_id,
                "submit",
            )
            .await;
            match released {
                Ok(true) => {}
                Ok(false) => tracing::warn!(
                    result_id = %saved.result.id,
                    "Submitted result not delivered; the release job will retry"
                ),
                Err(err) => tracing::error!(
                    error = %err,
                    result_id = %saved.result.id,
                    "Failed to release submitted result; the release job will retry"
                ),
            }
        }
        saved
    } else {
        lock_manager::save_assessment(state.db(), &scope.exercise, &result.id, &feedback, &scope.actor)
            .await?
    };

    let view = ResultView::new(result, feedbacks, None);
    Ok(anonymization::apply(view, scope.actor.viewer()))
}

pub(crate) async fn cancel_assessment(
    state: &AppState,
    user: &User,
    exercise_type: ExerciseType,
    submission_id: &str,
    correction_round: i32,
) -> Result<CancelOutcome, AssessmentError> {
    let (scope, _context, _submission) =
        load_submission_scope(state, user, exercise_type, submission_id).await?;
    validate_round_index(&scope.exercise, correction_round)?;

    lock_manager::cancel_assessment(state.db(), submission_id, correction_round, &scope.actor)
        .await
}

pub(crate) async fn submission_for_staff(
    state: &AppState,
    user: &User,
    exercise_type: ExerciseType,
    submission_id: &str,
) -> Result<SubmissionView, AssessmentError> {
    let (scope, _context, submission) =
        load_submission_scope(state, user, exercise_type, submission_id).await?;
    let results = repositories::results::list_for_submission(state.db(), submission_id).await?;
    let results = load_feedback(state, results).await?;
    render_submission(state, &scope, submission, results).await
}

pub(crate) async fn result_for_viewer(
    state: &AppState,
    user: &User,
    result_id: &str,
) -> Result<ResultView, AssessmentError> {
    let result = repositories::results::find_by_id(state.db(), result_id)
        .await?
        .ok_or(AssessmentError::NotFound("Result not found"))?;
    let context = repositories::submissions::find_context(state.db(), &result.submission_id)
        .await?
        .ok_or(AssessmentError::NotFound("Result not found"))?;
    let exercise = repositories::exercises::find_by_id(state.db(), &context.exercise_id)
        .await?
        .ok_or(AssessmentError::NotFound("Result not found"))?;
    let actor = actor_for_course(state.db(), user, &context.course_id).await?;

    let viewer = actor.viewer();
    if viewer == Viewer::Student {
        if context.student_id != user.id {
            return Err(AssessmentError::Forbidden("Not your result"));
        }
        if !result.is_finalized() || !exercise.results_visible_at(primitive_now_utc()) {
            return Err(AssessmentError::NotFound("Result not found"));
        }
        let latest =
            repositories::results::latest_round(state.db(), &result.submission_id).await?;
        if latest.is_some_and(|round| round > result.correction_round) {
            return Err(AssessmentError::NotFound("Result not found"));
        }
    }

    let assessor_name = match result.assessor_id.as_ref() {
        Some(assessor_id) if viewer != Viewer::Student => {
            repositories::users::find_names(state.db(), std::slice::from_ref(assessor_id))
                .await?
                .into_iter()
                .next()
                .map(|(_, name)| name)
        }
        _ => None,
    };
    let feedbacks = repositories::feedback::list_by_result(state.db(), &result.id).await?;
    Ok(anonymization::apply(ResultView::new(result, feedbacks, assessor_name), viewer))
}

pub(crate) async fn locked_submissions(
    state: &AppState,
    user: &User,
    course_id: &str,
    tutor_id: Option<&str>,
) -> Result<LockedSubmissionsResponse, AssessmentError> {
    let course = repositories::courses::find_by_id(state.db(), course_id)
        .await?
        .ok_or(AssessmentError::NotFound("Course not found"))?;
    let actor = actor_for_course(state.db(), user, &course.id).await?;
    require_at_least(&actor, CourseRole::Tutor)?;

    let target = tutor_id.unwrap_or(&actor.user_id);
    if target != actor.user_id {
        require_at_least(&actor, CourseRole::Instructor)?;
    }

    let rows = repositories::results::list_active_locks(state.db(), target, &course.id).await?;
    let ceiling = effective_ceiling(
        state.settings().assessment().max_locked_submissions_per_tutor,
        &course,
        None,
    );

    Ok(LockedSubmissionsResponse {
        tutor_id: target.to_string(),
        active_locks: rows.len() as i64,
        max_locks: ceiling,
        submissions: rows
            .into_iter()
            .map(|row| LockedSubmissionView {
                result_id: row.result_id,
                submission_id: row.submission_id,
                correction_round: row.correction_round,
                exercise_id: row.exercise_id,
                exercise_title: row.exercise_title,
                exercise_type: row.exercise_type,
                locked_at: format_primitive(row.locked_at),
            })
            .collect(),
    })
}
