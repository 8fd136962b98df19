use axum::extract::{Path, Query, State};
use axum::routing::{get, put};
use axum::{Extension, Json, Router};
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::CurrentUser;
use crate::core::state::AppState;
use crate::db::types::ExerciseType;
use crate::schemas::assessment::{
    CorrectionRoundQuery, LockedSubmissionsQuery, LockedSubmissionsResponse, NextSubmissionQuery,
    ResultView, SaveFeedbackQuery, SaveFeedbackRequest, SubmissionView,
};
use crate::services::assessment::lock_manager::CancelOutcome;
use crate::services::assessment::workflow;

pub(crate) fn router(exercise_type: ExerciseType) -> Router<AppState> {
    let segment = exercise_type.route_segment();
    Router::new()
        .route(
            &format!("/exercises/:exercise_id/{segment}-submission-without-assessment"),
            get(next_submission),
        )
        .route(&format!("/{segment}-submissions/:submission_id"), get(get_submission))
        .route(
            &format!("/{segment}-submissions/:submission_id/for-assessment"),
            get(lock_for_assessment),
        )
        .route(&format!("/{segment}-submissions/:submission_id/feedback"), put(save_feedback))
        .route(
            &format!("/{segment}-submissions/:submission_id/cancel-assessment"),
            put(cancel_assessment),
        )
        .layer(Extension(exercise_type))
}

pub(crate) fn course_router() -> Router<AppState> {
    Router::new().route("/courses/:course_id/locked-submissions", get(locked_submissions))
}

async fn next_submission(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Extension(exercise_type): Extension<ExerciseType>,
    Path(exercise_id): Path<String>,
    Query(query): Query<NextSubmissionQuery>,
) -> Result<Json<Option<SubmissionView>>, ApiError> {
    let submission =
        workflow::next_submission(&state, &user, exercise_type, &exercise_id, &query).await?;
    Ok(Json(submission))
}

async fn get_submission(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Extension(exercise_type): Extension<ExerciseType>,
    Path(submission_id): Path<String>,
) -> Result<Json<SubmissionView>, ApiError> {
    let submission =
        workflow::submission_for_staff(&state, &user, exercise_type, &submission_id).await?;
    Ok(Json(submission))
}

async fn lock_for_assessment(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Extension(exercise_type): Extension<ExerciseType>,
    Path(submission_id): Path<String>,
    Query(query): Query<CorrectionRoundQuery>,
) -> Result<Json<SubmissionView>, ApiError> {
    let submission = workflow::lock_for_assessment(
        &state,
        &user,
        exercise_type,
        &submission_id,
        query.correction_round,
    )
    .await?;
    Ok(Json(submission))
}

async fn save_feedback(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Extension(exercise_type): Extension<ExerciseType>,
    Path(submission_id): Path<String>,
    Query(query): Query<SaveFeedbackQuery>,
    Json(payload): Json<SaveFeedbackRequest>,
) -> Result<Json<ResultView>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let feedback = payload.feedbacks.into_iter().map(|item| item.into_new_feedback()).collect();
    let result = workflow::save_feedback(
        &state,
        &user,
        exercise_type,
        &submission_id,
        query.correction_round,
        feedback,
        query.submit,
    )
    .await?;
    Ok(Json(result))
}

async fn cancel_assessment(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Extension(exercise_type): Extension<ExerciseType>,
    Path(submission_id): Path<String>,
    Query(query): Query<CorrectionRoundQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let outcome = workflow::cancel_assessment(
        &state,
        &user,
        exercise_type,
        &submission_id,
        query.correction_round,
    )
    .await?;
    Ok(Json(serde_json::json!({ "cancelled": outcome == CancelOutcome::Cancelled })))
}

async fn locked_submissions(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Path(course_id): Path<String>,
    Query(query): Query<LockedSubmissionsQuery>,
) -> Result<Json<LockedSubmissionsResponse>, ApiError> {
    let response =
        workflow::locked_submissions(&state, &user, &course_id, query.tutor.as_deref()).await?;
    Ok(Json(response))
}

#[cfg(test)]
mod tests;
