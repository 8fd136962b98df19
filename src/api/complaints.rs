use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::CurrentUser;
use crate::core::state::AppState;
use crate::schemas::assessment::ResultView;
use crate::schemas::complaint::{
    ComplaintResponseAction, ComplaintResponseView, ComplaintView, FileComplaintRequest,
};
use crate::services::assessment::workflow;
use crate::services::complaint_lock::ComplaintResolution;
use crate::services::complaints;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/results/:result_id", get(get_result))
        .route("/results/:result_id/complaints", post(file_complaint))
        .route("/complaint/:complaint_id", get(get_complaint))
        .route(
            "/complaint/:complaint_id/response",
            post(lock_complaint).patch(update_response).delete(release_complaint),
        )
}

async fn get_result(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Path(result_id): Path<String>,
) -> Result<Json<ResultView>, ApiError> {
    Ok(Json(workflow::result_for_viewer(&state, &user, &result_id).await?))
}

async fn file_complaint(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Path(result_id): Path<String>,
    Json(payload): Json<FileComplaintRequest>,
) -> Result<(StatusCode, Json<ComplaintView>), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let complaint =
        complaints::file_complaint(&state, &user, &result_id, &payload.complaint_text).await?;
    Ok((StatusCode::CREATED, Json(complaint)))
}

async fn get_complaint(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Path(complaint_id): Path<String>,
) -> Result<Json<ComplaintView>, ApiError> {
    Ok(Json(complaints::complaint_for_viewer(&state, &user, &complaint_id).await?))
}

async fn lock_complaint(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Path(complaint_id): Path<String>,
) -> Result<(StatusCode, Json<ComplaintResponseView>), ApiError> {
    let response = complaints::lock(&state, &user, &complaint_id).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

async fn update_response(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Path(complaint_id): Path<String>,
    Json(action): Json<ComplaintResponseAction>,
) -> Result<(StatusCode, Json<ComplaintResponseView>), ApiError> {
    match action {
        ComplaintResponseAction::RefreshLock => {
            let response = complaints::refresh(&state, &user, &complaint_id).await?;
            Ok((StatusCode::CREATED, Json(response)))
        }
        ComplaintResponseAction::ResolveComplaint { response_text, accepted } => {
            let response = complaints::resolve(
                &state,
                &user,
                &complaint_id,
                ComplaintResolution { response_text, accepted },
            )
            .await?;
            Ok((StatusCode::OK, Json(response)))
        }
    }
}

async fn release_complaint(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Path(complaint_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    complaints::release(&state, &user, &complaint_id).await?;
    Ok(StatusCode::OK)
}
