use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::core::time::format_optional;
use crate::db::models::{AssessmentResult, Feedback};
use crate::db::types::{AssessmentType, ExerciseType, FeedbackType};
use crate::repositories::feedback::NewFeedback;

pub(crate) const MAX_DETAIL_TEXT_LEN: u64 = 5000;

#[derive(Debug, Deserialize)]
pub(crate) struct NextSubmissionQuery {
    #[serde(default)]
    pub(crate) lock: bool,
    #[serde(default, rename = "correction-round")]
    pub(crate) correction_round: i32,
    #[serde(default)]
    pub(crate) head: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CorrectionRoundQuery {
    #[serde(default, rename = "correction-round")]
    pub(crate) correction_round: i32,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SaveFeedbackQuery {
    #[serde(default)]
    pub(crate) submit: bool,
    #[serde(default, rename = "correction-round")]
    pub(crate) correction_round: i32,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LockedSubmissionsQuery {
    #[serde(default)]
    pub(crate) tutor: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[validate(schema(function = "validate_feedback_item"))]
pub(crate) struct FeedbackInput {
    #[serde(default, alias = "type")]
    pub(crate) feedback_type: Option<FeedbackType>,
    #[serde(default)]
    pub(crate) reference: Option<String>,
    #[serde(default)]
    pub(crate) text: Option<String>,
    #[serde(default, alias = "detailText")]
    #[validate(length(max = MAX_DETAIL_TEXT_LEN, message = "detail_text is too long"))]
    pub(crate) detail_text: Option<String>,
    #[serde(default)]
    pub(crate) credits: f64,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct SaveFeedbackRequest {
    #[validate(nested)]
    pub(crate) feedbacks: Vec<FeedbackInput>,
}

fn validate_feedback_item(input: &FeedbackInput) -> Result<(), ValidationError> {
    if !input.credits.is_finite() {
        return Err(
            ValidationError::new("credits").with_message("credits must be a finite number".into())
        );
    }

    let has_text = |value: &Option<String>| value.as_deref().is_some_and(|t| !t.trim().is_empty());
    if has_text(&input.text) || has_text(&input.detail_text) {
        Ok(())
    } else {
        Err(ValidationError::new("feedback_text")
            .with_message("every feedback needs text or detail_text".into()))
    }
}

impl FeedbackInput {
    pub(crate) fn into_new_feedback(self) -> NewFeedback {
        let feedback_type = match (self.feedback_type, self.reference.is_some()) {
            (Some(FeedbackType::ManualUnreferenced), _) | (_, false) => {
                FeedbackType::ManualUnreferenced
            }
            _ => FeedbackType::Manual,
        };
        NewFeedback {
            feedback_type,
            reference: self.reference,
            text: self.text,
            detail_text: self.detail_text,
            credits: self.credits,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct PersonView {
    pub(crate) id: String,
    pub(crate) name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct ParticipantView {
    pub(crate) participation_id: String,
    pub(crate) student: PersonView,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct FeedbackView {
    pub(crate) id: String,
    #[serde(rename = "type")]
    pub(crate) feedback_type: FeedbackType,
    pub(crate) reference: Option<String>,
    pub(crate) text: Option<String>,
    pub(crate) detail_text: Option<String>,
    pub(crate) credits: f64,
}

impl From<Feedback> for FeedbackView {
    fn from(feedback: Feedback) -> Self {
        Self {
            id: feedback.id,
            feedback_type: feedback.feedback_type,
            reference: feedback.reference,
            text: feedback.text,
            detail_text: feedback.detail_text,
            credits: feedback.credits,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct ResultView {
    pub(crate) id: String,
    pub(crate) submission_id: String,
    pub(crate) correction_round: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) assessor: Option<PersonView>,
    pub(crate) completion_date: Option<String>,
    pub(crate) rated: bool,
    pub(crate) score: Option<f64>,
    pub(crate) assessment_type: AssessmentType,
    pub(crate) has_complaint: bool,
    pub(crate) feedbacks: Vec<FeedbackView>,
}

impl ResultView {
    pub(crate) fn new(
        result: AssessmentResult,
        feedbacks: Vec<Feedback>,
        assessor_name: Option<String>,
    ) -> Self {
        let assessor =
            result.assessor_id.map(|id| PersonView { id, name: assessor_name });
        Self {
            id: result.id,
            submission_id: result.submission_id,
            correction_round: result.correction_round,
            assessor,
            completion_date: format_optional(result.completion_date),
            rated: result.rated,
            score: result.score,
            assessment_type: result.assessment_type,
            has_complaint: result.has_complaint,
            feedbacks: feedbacks.into_iter().map(FeedbackView::from).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct SubmissionView {
    pub(crate) id: String,
    pub(crate) exercise_id: String,
    pub(crate) exercise_type: ExerciseType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) participation: Option<ParticipantView>,
    pub(crate) submitted_at: Option<String>,
    pub(crate) content: serde_json::Value,
    pub(crate) results: Vec<ResultView>,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct LockedSubmissionView {
    pub(crate) result_id: String,
    pub(crate) submission_id: String,
    pub(crate) correction_round: i32,
    pub(crate) exercise_id: String,
    pub(crate) exercise_title: String,
    pub(crate) exercise_type: ExerciseType,
    pub(crate) locked_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct LockedSubmissionsResponse {
    pub(crate) tutor_id: String,
    pub(crate) active_locks: i64,
    pub(crate) max_locks: i64,
    pub(crate) submissions: Vec<LockedSubmissionView>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(text: Option<&str>, detail: Option<&str>, credits: f64) -> FeedbackInput {
        FeedbackInput {
            feedback_type: None,
            reference: None,
            text: text.map(str::to_string),
            detail_text: detail.map(str::to_string),
            credits,
        }
    }

    #[test]
    fn feedback_requires_some_text() {
        assert!(input(None, None, 1.0).validate().is_err());
        assert!(input(Some("  "), None, 1.0).validate().is_err());
        assert!(input(None, Some("missing base case"), 1.0).validate().is_ok());
    }

    #[test]
    fn feedback_rejects_oversized_detail_and_nan_credits() {
        let long = "x".repeat(MAX_DETAIL_TEXT_LEN as usize + 1);
        assert!(input(Some("ok"), Some(&long), 0.0).validate().is_err());
        assert!(input(Some("ok"), None, f64::NAN).validate().is_err());
        assert!(input(Some("ok"), None, f64::INFINITY).validate().is_err());
    }

    #[test]
    fn grader_feedback_never_becomes_automatic() {
        let mut referenced = input(Some("loop bound"), None, -1.0);
        referenced.feedback_type = Some(FeedbackType::Automatic);
        referenced.reference = Some("file:Main.java:12".to_string());
        assert_eq!(referenced.into_new_feedback().feedback_type, FeedbackType::Manual);

        let mut general = input(Some("well structured"), None, 2.0);
        general.feedback_type = Some(FeedbackType::Automatic);
        assert_eq!(general.into_new_feedback().feedback_type, FeedbackType::ManualUnreferenced);
    }

    #[test]
    fn query_reads_dashed_correction_round() {
        let query: NextSubmissionQuery =
            serde_json::from_value(serde_json::json!({"lock": true, "correction-round": 1}))
                .expect("query");
        assert!(query.lock);
        assert_eq!(query.correction_round, 1);
        assert!(!query.head);
    }
}
