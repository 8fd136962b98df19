use async_trait::async_trait;
use sqlx::PgPool;
use time::PrimitiveDateTime;
use uuid::Uuid;

use crate::core::metrics;
use crate::core::time::primitive_now_utc;
use crate::db::models::{AssessmentResult, ComplaintResponse};
use crate::db::types::{ComplaintStatus, CourseRole};
use crate::repositories;
use crate::repositories::complaints::ComplaintContext;
use crate::services::assessment::AssessmentError;
use crate::services::authorization::{require_at_least, Actor};

#[async_trait]
pub(crate) trait ResultReopener: Send + Sync {
    async fn reopen(
        &self,
        conn: &mut sqlx::PgConnection,
        result_id: &str,
        reviewer_id: &str,
        now: PrimitiveDateTime,
    ) -> Result<AssessmentResult, AssessmentError>;
}

#[derive(Debug, Clone)]
pub(crate) struct ComplaintResolution {
    pub(crate) response_text: String,
    pub(crate) accepted: bool,
}

#[derive(Debug)]
pub(crate) struct ResolvedComplaint {
    pub(crate) response: ComplaintResponse,
    pub(crate) reopened: Option<AssessmentResult>,
}

fn ensure_open(complaint: &ComplaintContext) -> Result<(), AssessmentError> {
    if complaint.status == ComplaintStatus::Open {
        Ok(())
    } else {
        Err(AssessmentError::BadRequest("Complaint is already resolved".to_string()))
    }
}

fn ensure_sentinel(response: &ComplaintResponse) -> Result<(), AssessmentError> {
    if response.is_lock_sentinel() {
        Ok(())
    } else {
        Err(AssessmentError::BadRequest("Complaint is already resolved".to_string()))
    }
}

pub(crate) async fn lock_complaint(
    pool: &PgPool,
    complaint: &ComplaintContext,
    actor: &Actor,
) -> Result<ComplaintResponse, AssessmentError> {
    require_at_least(actor, CourseRole::Tutor)?;
    ensure_open(complaint)?;

    if !actor.is_instructor() && complaint.assessor_id.as_deref() == Some(actor.user_id.as_str()) {
        return Err(AssessmentError::Forbidden(
            "The assessor of a result cannot review complaints about it",
        ));
    }

    let id = Uuid::new_v4().to_string();
    let inserted = repositories::complaint_responses::insert_sentinel(
        pool,
        &id,
        &complaint.complaint_id,
        &actor.user_id,
        primitive_now_utc(),
    )
    .await?;

    match inserted {
        Some(response) => {
            metrics::record_complaint_lock("acquired");
            tracing::info!(
                complaint_id = %complaint.complaint_id,
                reviewer_id = %actor.user_id,
                "Complaint locked"
            );
            Ok(response)
        }
        None => {
            metrics::record_complaint_lock("taken");
            Err(AssessmentError::Conflict("Complaint is already locked".to_string()))
        }
    }
}

pub(crate) async fn refresh_lock(
    pool: &PgPool,
    complaint: &ComplaintContext,
    actor: &Actor,
) -> Result<ComplaintResponse, AssessmentError> {
    let mut tx = pool.begin().await?;
    let response = repositories::complaint_responses::find_by_complaint_for_update(
        &mut *tx,
        &complaint.complaint_id,
    )
    .await?
    .ok_or_else(|| AssessmentError::BadRequest("Complaint is not locked".to_string()))?;

    ensure_sentinel(&response)?;
    if response.reviewer_id != actor.user_id {
        return Err(AssessmentError::Forbidden("Only the lock holder can refresh the lock"));
    }

    let refreshed =
        repositories::complaint_responses::restamp(&mut *tx, &response.id, primitive_now_utc())
            .await?;
    tx.commit().await?;

    metrics::record_complaint_lock("refreshed");
    tracing::debug!(complaint_id = %complaint.complaint_id, "Complaint lock refreshed");
    Ok(refreshed)
}

pub(crate) async fn release_lock(
    pool: &PgPool,
    complaint: &ComplaintContext,
    actor: &Actor,
) -> Result<(), AssessmentError> {
    let mut tx = pool.begin().await?;
    let response = repositories::complaint_responses::find_by_complaint_for_update(
        &mut *tx,
        &complaint.complaint_id,
    )
    .await?
    .ok_or(AssessmentError::NotFound("Complaint is not locked"))?;

    ensure_sentinel(&response)?;
    if response.reviewer_id != actor.user_id && !actor.is_instructor() {
        return Err(AssessmentError::Forbidden(
            "Only the lock holder or an instructor can release the lock",
        ));
    }

    repositories::complaint_responses::delete_sentinel(&mut *tx, &response.id).await?;
    tx.commit().await?;

    metrics::record_complaint_lock("released");
    tracing::info!(
        complaint_id = %complaint.complaint_id,
        released_by = %actor.user_id,
        "Complaint lock released"
    );
    Ok(())
}

pub(crate) async fn resolve_complaint(
    pool: &PgPool,
    complaint: &ComplaintContext,
    actor: &Actor,
    resolution: ComplaintResolution,
    reopener: &dyn ResultReopener,
) -> Result<ResolvedComplaint, AssessmentError> {
    if resolution.response_text.trim().is_empty() {
        return Err(AssessmentError::BadRequest("response_text must not be empty".to_string()));
    }

    let mut tx = pool.begin().await?;
    let response = repositories::complaint_responses::find_by_complaint_for_update(
        &mut *tx,
        &complaint.complaint_id,
    )
    .await?;

    let Some(response) = response else {
        return Err(AssessmentError::Forbidden("Lock the complaint before resolving it"));
    };
    ensure_sentinel(&response)?;
    if response.reviewer_id != actor.user_id {
        return Err(AssessmentError::Forbidden("Complaint is locked by another reviewer"));
    }

    let now = primitive_now_utc();
    let response = repositories::complaint_responses::resolve(
        &mut *tx,
        &response.id,
        &resolution.response_text,
        resolution.accepted,
        now,
    )
    .await?;

    let status =
        if resolution.accepted { ComplaintStatus::Accepted } else { ComplaintStatus::Rejected };
    repositories::complaints::set_status(&mut *tx, &complaint.complaint_id, status).await?;

    let reopened = if resolution.accepted {
        Some(reopener.reopen(&mut *tx, &complaint.result_id, &actor.user_id, now).await?)
    } else {
        None
    };
    tx.commit().await?;

    metrics::record_complaint_lock("resolved");
    tracing::info!(
        complaint_id = %complaint.complaint_id,
        reviewer_id = %actor.user_id,
        accepted = resolution.accepted,
        "Complaint resolved"
    );
    Ok(ResolvedComplaint { response, reopened })
}
