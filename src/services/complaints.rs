use uuid::Uuid;

use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::User;
use crate::db::types::CourseRole;
use crate::repositories;
use crate::repositories::complaints::ComplaintContext;
use crate::schemas::complaint::{ComplaintResponseView, ComplaintView};
use crate::services::anonymization::{self, Viewer};
use crate::services::assessment::lock_manager::DraftReopener;
use crate::services::assessment::AssessmentError;
use crate::services::authorization::{actor_for_course, require_at_least, Actor};
use crate::services::complaint_lock::{self, ComplaintResolution};

fn lock_duration(state: &AppState) -> time::Duration {
    let minutes = state.settings().assessment().complaint_lock_duration_minutes;
    time::Duration::minutes(i64::try_from(minutes).unwrap_or(i64::MAX / 60))
}

async fn load_context(
    state: &AppState,
    user: &User,
    complaint_id: &str,
) -> Result<(ComplaintContext, Actor), AssessmentError> {
    let context = repositories::complaints::find_context(state.db(), complaint_id)
        .await?
        .ok_or(AssessmentError::NotFound("Complaint not found"))?;
    let actor = actor_for_course(state.db(), user, &context.course_id).await?;
    Ok((context, actor))
}

fn response_view(
    state: &AppState,
    response: crate::db::models::ComplaintResponse,
    viewer: Viewer,
) -> ComplaintResponseView {
    anonymization::apply(ComplaintResponseView::new(response, lock_duration(state)), viewer)
}

pub(crate) async fn file_complaint(
    state: &AppState,
    user: &User,
    result_id: &str,
    complaint_text: &str,
) -> Result<ComplaintView, AssessmentError> {
    let result = repositories::results::find_by_id(state.db(), result_id)
        .await?
        .ok_or(AssessmentError::NotFound("Result not found"))?;
    let context = repositories::submissions::find_context(state.db(), &result.submission_id)
        .await?
        .ok_or(AssessmentError::NotFound("Result not found"))?;
    if context.student_id != user.id {
        return Err(AssessmentError::Forbidden("Only the student can complain about a result"));
    }

    let exercise = repositories::exercises::find_by_id(state.db(), &context.exercise_id)
        .await?
        .ok_or(AssessmentError::NotFound("Result not found"))?;
    let now = primitive_now_utc();
    if !result.is_finalized() || !result.rated || !exercise.results_visible_at(now) {
        return Err(AssessmentError::BadRequest(
            "Complaints are only possible on released results".to_string(),
        ));
    }
    let latest = repositories::results::latest_round(state.db(), &result.submission_id).await?;
    if latest.is_some_and(|round| round > result.correction_round) {
        return Err(AssessmentError::BadRequest(
            "Only the result of the latest correction round can be contested".to_string(),
        ));
    }

    let mut tx = state.db().begin().await?;
    let created = repositories::complaints::create(
        &mut *tx,
        repositories::complaints::CreateComplaint {
            id: &Uuid::new_v4().to_string(),
            result_id,
            student_id: &user.id,
            complaint_text,
            submitted_at: now,
        },
    )
    .await?
    .ok_or_else(|| {
        AssessmentError::Conflict("A complaint was already filed for this result".to_string())
    })?;
    repositories::results::set_has_complaint(&mut *tx, result_id, now).await?;
    tx.commit().await?;

    tracing::info!(complaint_id = %created.id, result_id, "Complaint filed");
    Ok(anonymization::apply(ComplaintView::new(created, None), Viewer::Student))
}

pub(crate) async fn complaint_for_viewer(
    state: &AppState,
    user: &User,
    complaint_id: &str,
) -> Result<ComplaintView, AssessmentError> {
    let (context, actor) = load_context(state, user, complaint_id).await?;
    let complaint = repositories::complaints::find_by_id(state.db(), &context.complaint_id)
        .await?
        .ok_or(AssessmentError::NotFound("Complaint not found"))?;

    let viewer = actor.viewer();
    if viewer == Viewer::Student && complaint.student_id != user.id {
        return Err(AssessmentError::Forbidden("Not your complaint"));
    }

    let response =
        repositories::complaint_responses::find_by_complaint(state.db(), &context.complaint_id)
            .await?
            .map(|response| ComplaintResponseView::new(response, lock_duration(state)));
    Ok(anonymization::apply(ComplaintView::new(complaint, response), viewer))
}

pub(crate) async fn lock(
    state: &AppState,
    user: &User,
    complaint_id: &str,
) -> Result<ComplaintResponseView, AssessmentError> {
    let (context, actor) = load_context(state, user, complaint_id).await?;
    let response = complaint_lock::lock_complaint(state.db(), &context, &actor).await?;
    Ok(response_view(state, response, actor.viewer()))
}

pub(crate) async fn refresh(
    state: &AppState,
    user: &User,
    complaint_id: &str,
) -> Result<ComplaintResponseView, AssessmentError> {
    let (context, actor) = load_context(state, user, complaint_id).await?;
    require_at_least(&actor, CourseRole::Tutor)?;
    let response = complaint_lock::refresh_lock(state.db(), &context, &actor).await?;
    Ok(response_view(state, response, actor.viewer()))
}

pub(crate) async fn release(
    state: &AppState,
    user: &User,
    complaint_id: &str,
) -> Result<(), AssessmentError> {
    let (context, actor) = load_context(state, user, complaint_id).await?;
    require_at_least(&actor, CourseRole::Tutor)?;
    complaint_lock::release_lock(state.db(), &context, &actor).await
}

pub(crate) async fn resolve(
    state: &AppState,
    user: &User,
    complaint_id: &str,
    resolution: ComplaintResolution,
) -> Result<ComplaintResponseView, AssessmentError> {
    let (context, actor) = load_context(state, user, complaint_id).await?;
    require_at_least(&actor, CourseRole::Tutor)?;
    let resolved = complaint_lock::resolve_complaint(
        state.db(),
        &context,
        &actor,
        resolution,
        &DraftReopener,
    )
    .await?;

    if let Some(reopened) = resolved.reopened.as_ref() {
        tracing::info!(
            result_id = %reopened.id,
            submission_id = %context.submission_id,
            "Assessment reopened for complaint review"
        );
    }
    Ok(response_view(state, resolved.response, actor.viewer()))
}
