use crate::db::types::CourseRole;
use crate::schemas::assessment::{ResultView, SubmissionView};
use crate::schemas::complaint::{ComplaintResponseView, ComplaintView};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Viewer {
    Student,
    Tutor,
    Instructor,
}

impl Viewer {
    pub(crate) fn from_role(role: CourseRole) -> Self {
        match role {
            CourseRole::Student => Viewer::Student,
            CourseRole::Tutor | CourseRole::Editor => Viewer::Tutor,
            CourseRole::Instructor => Viewer::Instructor,
        }
    }

    fn sees_assessor(self) -> bool {
        self != Viewer::Student
    }

    fn sees_participant(self) -> bool {
        self == Viewer::Instructor
    }
}

pub(crate) trait Anonymize {
    fn strip_assessor(&mut self);

    fn strip_participant(&mut self) {}
}

pub(crate) fn apply<T: Anonymize>(mut payload: T, viewer: Viewer) -> T {
    if !viewer.sees_assessor() {
        payload.strip_assessor();
    }
    if !viewer.sees_participant() {
        payload.strip_participant();
    }
    payload
}

impl Anonymize for ResultView {
    fn strip_assessor(&mut self) {
        self.assessor = None;
    }
}

impl Anonymize for SubmissionView {
    fn strip_assessor(&mut self) {
        self.results.iter_mut().for_each(Anonymize::strip_assessor);
    }

    fn strip_participant(&mut self) {
        self.participation = None;
    }
}

impl Anonymize for ComplaintResponseView {
    fn strip_assessor(&mut self) {
        self.reviewer = None;
    }
}

impl Anonymize for ComplaintView {
    fn strip_assessor(&mut self) {
        if let Some(response) = self.response.as_mut() {
            response.strip_assessor();
        }
    }

    fn strip_participant(&mut self) {
        self.student = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::types::{AssessmentType, ComplaintStatus, ExerciseType};
    use crate::schemas::assessment::{ParticipantView, PersonView};

    fn result_view() -> ResultView {
        ResultView {
            id: "r-1".to_string(),
            submission_id: "s-1".to_string(),
            correction_round: 0,
            assessor: Some(PersonView { id: "tutor-1".to_string(), name: Some("Tia".to_string()) }),
            completion_date: Some("2025-03-14T08:05:00Z".to_string()),
            rated: true,
            score: Some(80.0),
            assessment_type: AssessmentType::Manual,
            has_complaint: false,
            feedbacks: Vec::new(),
        }
    }

    fn submission_view() -> SubmissionView {
        SubmissionView {
            id: "s-1".to_string(),
            exercise_id: "e-1".to_string(),
            exercise_type: ExerciseType::Modeling,
            participation: Some(ParticipantView {
                participation_id: "p-1".to_string(),
                student: PersonView { id: "student-1".to_string(), name: None },
            }),
            submitted_at: None,
            content: serde_json::json!({}),
            results: vec![result_view()],
        }
    }

    #[test]
    fn student_view_hides_assessor() {
        let view = apply(result_view(), Viewer::Student);
        let json = serde_json::to_value(&view).expect("json");

        assert!(json.get("assessor").is_none());
        assert!(!json.to_string().contains("tutor-1"));
    }

    #[test]
    fn tutor_view_hides_participant_but_keeps_assessor() {
        let view = apply(submission_view(), Viewer::Tutor);
        let json = serde_json::to_value(&view).expect("json");

        assert!(json.get("participation").is_none());
        assert!(!json.to_string().contains("student-1"));
        assert_eq!(json["results"][0]["assessor"]["id"], "tutor-1");
    }

    #[test]
    fn instructor_view_keeps_both_identities() {
        let view = apply(submission_view(), Viewer::Instructor);
        let json = serde_json::to_value(&view).expect("json");

        assert_eq!(json["participation"]["student"]["id"], "student-1");
        assert_eq!(json["results"][0]["assessor"]["id"], "tutor-1");
    }

    #[test]
    fn complaint_view_hides_reviewer_from_students() {
        let complaint = ComplaintView {
            id: "c-1".to_string(),
            result_id: "r-1".to_string(),
            student: Some(PersonView { id: "student-1".to_string(), name: None }),
            complaint_text: "Task 2 was graded twice".to_string(),
            status: ComplaintStatus::Open,
            submitted_at: "2025-03-14T08:05:00Z".to_string(),
            response: Some(ComplaintResponseView {
                id: "cr-1".to_string(),
                reviewer: Some(PersonView { id: "tutor-2".to_string(), name: None }),
                response_text: None,
                accepted: None,
                resolved: false,
                locked_at: "2025-03-14T08:05:00Z".to_string(),
                lock_end_date: None,
                submitted_at: None,
            }),
        };

        let for_student = serde_json::to_value(apply(complaint.clone(), Viewer::Student)).unwrap();
        let for_tutor = serde_json::to_value(apply(complaint, Viewer::Tutor)).unwrap();

        assert!(!for_student.to_string().contains("tutor-2"));
        assert!(for_tutor["response"]["reviewer"]["id"] == "tutor-2");
        assert!(for_tutor.get("student").is_none());
    }
}
