use serde::{Deserialize, Serialize};
use sqlx::Type;

// Course roles are ordered: every role includes the capabilities of the ones before it.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Type,
)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "courserole", rename_all = "lowercase")]
pub(crate) enum CourseRole {
    Student,
    Tutor,
    Editor,
    Instructor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "membershipstatus", rename_all = "lowercase")]
pub(crate) enum MembershipStatus {
    Active,
    Suspended,
    Left,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "exercisetype", rename_all = "snake_case")]
pub(crate) enum ExerciseType {
    Text,
    Modeling,
    FileUpload,
    Math,
    Programming,
}

impl ExerciseType {
    pub(crate) const ALL: [ExerciseType; 5] = [
        ExerciseType::Text,
        ExerciseType::Modeling,
        ExerciseType::FileUpload,
        ExerciseType::Math,
        ExerciseType::Programming,
    ];

    pub(crate) fn route_segment(self) -> &'static str {
        match self {
            ExerciseType::Text => "text",
            ExerciseType::Modeling => "modeling",
            ExerciseType::FileUpload => "file-upload",
            ExerciseType::Math => "math",
            ExerciseType::Programming => "programming",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "assessmenttype", rename_all = "snake_case")]
pub(crate) enum AssessmentType {
    Automatic,
    SemiAutomatic,
    Manual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "feedbacktype", rename_all = "snake_case")]
pub(crate) enum FeedbackType {
    Automatic,
    Manual,
    ManualUnreferenced,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "complaintstatus", rename_all = "lowercase")]
pub(crate) enum ComplaintStatus {
    Open,
    Accepted,
    Rejected,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn course_roles_are_ordered() {
        assert!(CourseRole::Student < CourseRole::Tutor);
        assert!(CourseRole::Tutor < CourseRole::Editor);
        assert!(CourseRole::Editor < CourseRole::Instructor);
    }

    #[test]
    fn route_segments_are_unique() {
        let mut segments: Vec<_> = ExerciseType::ALL.iter().map(|t| t.route_segment()).collect();
        segments.sort_unstable();
        segments.dedup();
        assert_eq!(segments.len(), ExerciseType::ALL.len());
    }

    #[test]
    fn assessment_type_serializes_screaming_case() {
        let json = serde_json::to_string(&AssessmentType::SemiAutomatic).unwrap();
        assert_eq!(json, "\"SEMI_AUTOMATIC\"");
    }
}
