use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use time::PrimitiveDateTime;

use crate::db::types::{AssessmentType, ComplaintStatus, ExerciseType, FeedbackType};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct User {
    pub(crate) id: String,
    pub(crate) login: String,
    pub(crate) full_name: String,
    pub(crate) is_platform_admin: bool,
    pub(crate) is_active: bool,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Course {
    pub(crate) id: String,
    pub(crate) short_name: String,
    pub(crate) title: String,
    pub(crate) max_locked_submissions: Option<i32>,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Exercise {
    pub(crate) id: String,
    pub(crate) course_id: String,
    pub(crate) exercise_type: ExerciseType,
    pub(crate) title: String,
    pub(crate) max_points: f64,
    pub(crate) bonus_points: f64,
    pub(crate) due_date: Option<PrimitiveDateTime>,
    pub(crate) assessment_due_date: Option<PrimitiveDateTime>,
    pub(crate) is_exam_exercise: bool,
    pub(crate) correction_rounds: i32,
    pub(crate) lock_limit_override: Option<i32>,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

impl Exercise {
    pub(crate) fn results_visible_at(&self, now: PrimitiveDateTime) -> bool {
        self.assessment_due_date.map_or(true, |due| due <= now)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Participation {
    pub(crate) id: String,
    pub(crate) exercise_id: String,
    pub(crate) student_id: String,
    pub(crate) created_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Submission {
    pub(crate) id: String,
    pub(crate) participation_id: String,
    pub(crate) exercise_type: ExerciseType,
    pub(crate) content: Json<serde_json::Value>,
    pub(crate) submitted: bool,
    pub(crate) submitted_at: Option<PrimitiveDateTime>,
    pub(crate) created_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct AssessmentResult {
    pub(crate) id: String,
    pub(crate) submission_id: String,
    pub(crate) correction_round: i32,
    pub(crate) assessor_id: Option<String>,
    pub(crate) completion_date: Option<PrimitiveDateTime>,
    pub(crate) rated: bool,
    pub(crate) score: Option<f64>,
    pub(crate) assessment_type: AssessmentType,
    pub(crate) has_complaint: bool,
    pub(crate) broadcast_at: Option<PrimitiveDateTime>,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

impl AssessmentResult {
    pub(crate) fn is_active_lock(&self) -> bool {
        self.completion_date.is_none() && self.assessor_id.is_some()
    }

    pub(crate) fn is_finalized(&self) -> bool {
        self.completion_date.is_some()
    }

    pub(crate) fn is_locked_by(&self, user_id: &str) -> bool {
        self.is_active_lock() && self.assessor_id.as_deref() == Some(user_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Feedback {
    pub(crate) id: String,
    pub(crate) result_id: String,
    pub(crate) position: i32,
    pub(crate) feedback_type: FeedbackType,
    pub(crate) reference: Option<String>,
    pub(crate) text: Option<String>,
    pub(crate) detail_text: Option<String>,
    pub(crate) credits: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Complaint {
    pub(crate) id: String,
    pub(crate) result_id: String,
    pub(crate) student_id: String,
    pub(crate) complaint_text: String,
    pub(crate) status: ComplaintStatus,
    pub(crate) submitted_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct ComplaintResponse {
    pub(crate) id: String,
    pub(crate) complaint_id: String,
    pub(crate) reviewer_id: String,
    pub(crate) response_text: Option<String>,
    pub(crate) accepted: Option<bool>,
    pub(crate) resolved: bool,
    pub(crate) locked_at: PrimitiveDateTime,
    pub(crate) submitted_at: Option<PrimitiveDateTime>,
    pub(crate) created_at: PrimitiveDateTime,
}

impl ComplaintResponse {
    pub(crate) fn is_lock_sentinel(&self) -> bool {
        !self.resolved && self.response_text.is_none()
    }
}
