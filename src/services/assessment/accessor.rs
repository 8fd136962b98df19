use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::db::types::{AssessmentType, ExerciseType, FeedbackType};
use crate::repositories::feedback::NewFeedback;

pub(crate) trait SubmissionAccessor: Send + Sync {
    fn exercise_type(&self) -> ExerciseType;

    fn project_content(&self, content: &Value) -> Value;

    fn initial_assessment_type(&self) -> AssessmentType {
        AssessmentType::Manual
    }

    fn seed_feedback(&self, _content: &Value) -> Vec<NewFeedback> {
        Vec::new()
    }

    fn preserves_automatic_feedback(&self) -> bool {
        false
    }
}

fn project<T>(content: &Value) -> Value
where
    T: for<'de> Deserialize<'de> + Serialize + Default,
{
    let typed: T = serde_json::from_value(content.clone()).unwrap_or_default();
    serde_json::to_value(typed).unwrap_or(Value::Null)
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct TextContent {
    text: String,
    language: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct ModelingContent {
    model: Value,
    explanation_text: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct FileUploadContent {
    file_path: Option<String>,
    file_name: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct MathContent {
    solution: String,
    steps: Vec<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct ProgrammingContent {
    repository_uri: Option<String>,
    commit_hash: Option<String>,
    build_failed: bool,
    automatic_feedback: Vec<AutomaticFeedback>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct AutomaticFeedback {
    test_name: String,
    detail_text: Option<String>,
    credits: f64,
}

pub(crate) struct TextAccessor;
pub(crate) struct ModelingAccessor;
pub(crate) struct FileUploadAccessor;
pub(crate) struct MathAccessor;
pub(crate) struct ProgrammingAccessor;

impl SubmissionAccessor for TextAccessor {
    fn exercise_type(&self) -> ExerciseType {
        ExerciseType::Text
    }

    fn project_content(&self, content: &Value) -> Value {
        project::<TextContent>(content)
    }
}

impl SubmissionAccessor for ModelingAccessor {
    fn exercise_type(&self) -> ExerciseType {
        ExerciseType::Modeling
    }

    fn project_content(&self, content: &Value) -> Value {
        project::<ModelingContent>(content)
    }
}

impl SubmissionAccessor for FileUploadAccessor {
    fn exercise_type(&self) -> ExerciseType {
        ExerciseType::FileUpload
    }

    fn project_content(&self, content: &Value) -> Value {
        project::<FileUploadContent>(content)
    }
}

impl SubmissionAccessor for MathAccessor {
    fn exercise_type(&self) -> ExerciseType {
        ExerciseType::Math
    }

    fn project_content(&self, content: &Value) -> Value {
        project::<MathContent>(content)
    }
}

impl SubmissionAccessor for ProgrammingAccessor {
    fn exercise_type(&self) -> ExerciseType {
        ExerciseType::Programming
    }

    fn project_content(&self, content: &Value) -> Value {
        project::<ProgrammingContent>(content)
    }

    fn initial_assessment_type(&self) -> AssessmentType {
        AssessmentType::SemiAutomatic
    }

    fn seed_feedback(&self, content: &Value) -> Vec<NewFeedback> {
        let content: ProgrammingContent =
            serde_json::from_value(content.clone()).unwrap_or_default();
        content
            .automatic_feedback
            .into_iter()
            .filter(|item| item.credits.is_finite())
            .map(|item| NewFeedback {
                feedback_type: FeedbackType::Automatic,
                reference: None,
                text: Some(item.test_name),
                detail_text: item.detail_text,
                credits: item.credits,
            })
            .collect()
    }

    fn preserves_automatic_feedback(&self) -> bool {
        true
    }
}

pub(crate) fn accessor_for(exercise_type: ExerciseType) -> &'static dyn SubmissionAccessor {
    match exercise_type {
        ExerciseType::Text => &TextAccessor,
        ExerciseType::Modeling => &ModelingAccessor,
        ExerciseType::FileUpload => &FileUploadAccessor,
        ExerciseType::Math => &MathAccessor,
        ExerciseType::Programming => &ProgrammingAccessor,
    }
}
