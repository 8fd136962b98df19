use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::db::models::{Complaint, ComplaintResponse};
use crate::db::types::ComplaintStatus;
use crate::schemas::assessment::PersonView;

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct FileComplaintRequest {
    #[serde(alias = "complaintText")]
    #[validate(length(min = 1, max = 5000, message = "complaint_text must be 1..5000 characters"))]
    pub(crate) complaint_text: String,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "SCREAMING_SNAKE_CASE")]
pub(crate) enum ComplaintResponseAction {
    RefreshLock,
    ResolveComplaint {
        #[serde(alias = "responseText")]
        response_text: String,
        accepted: bool,
    },
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct ComplaintResponseView {
    pub(crate) id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) reviewer: Option<PersonView>,
    pub(crate) response_text: Option<String>,
    pub(crate) accepted: Option<bool>,
    pub(crate) resolved: bool,
    pub(crate) locked_at: String,
    pub(crate) lock_end_date: Option<String>,
    pub(crate) submitted_at: Option<String>,
}

impl ComplaintResponseView {
    pub(crate) fn new(response: ComplaintResponse, lock_duration: time::Duration) -> Self {
        let lock_end_date = response
            .is_lock_sentinel()
            .then(|| crate::core::time::format_primitive(response.locked_at + lock_duration));
        Self {
            id: response.id,
            reviewer: Some(PersonView { id: response.reviewer_id, name: None }),
            response_text: response.response_text,
            accepted: response.accepted,
            resolved: response.resolved,
            locked_at: crate::core::time::format_primitive(response.locked_at),
            lock_end_date,
            submitted_at: crate::core::time::format_optional(response.submitted_at),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct ComplaintView {
    pub(crate) id: String,
    pub(crate) result_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) student: Option<PersonView>,
    pub(crate) complaint_text: String,
    pub(crate) status: ComplaintStatus,
    pub(crate) submitted_at: String,
    pub(crate) response: Option<ComplaintResponseView>,
}

impl ComplaintView {
    pub(crate) fn new(complaint: Complaint, response: Option<ComplaintResponseView>) -> Self {
        Self {
            id: complaint.id,
            result_id: complaint.result_id,
            student: Some(PersonView { id: complaint.student_id, name: None }),
            complaint_text: complaint.complaint_text,
            status: complaint.status,
            submitted_at: crate::core::time::format_primitive(complaint.submitted_at),
            response,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refresh_action_needs_no_payload() {
        let action: ComplaintResponseAction =
            serde_json::from_value(serde_json::json!({"action": "REFRESH_LOCK"})).expect("action");
        assert!(matches!(action, ComplaintResponseAction::RefreshLock));
    }

    #[test]
    fn resolve_action_carries_decision() {
        let action: ComplaintResponseAction = serde_json::from_value(serde_json::json!({
            "action": "RESOLVE_COMPLAINT",
            "responseText": "Points for task 2 restored",
            "accepted": true
        }))
        .expect("action");

        match action {
            ComplaintResponseAction::ResolveComplaint { response_text, accepted } => {
                assert_eq!(response_text, "Points for task 2 restored");
                assert!(accepted);
            }
            other => panic!("unexpected action: {other:?}"),
        }
    }

    #[test]
    fn unknown_action_is_rejected() {
        let parsed = serde_json::from_value::<ComplaintResponseAction>(
            serde_json::json!({"action": "TAKE_OVER"}),
        );
        assert!(parsed.is_err());
    }
}
