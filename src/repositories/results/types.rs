use time::PrimitiveDateTime;

use crate::db::types::{AssessmentType, ExerciseType};

pub(crate) struct NewLock<'a> {
    pub(crate) id: &'a str,
    pub(crate) submission_id: &'a str,
    pub(crate) correction_round: i32,
    pub(crate) assessor_id: &'a str,
    pub(crate) assessment_type: AssessmentType,
    pub(crate) locked_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct ActiveLockRow {
    pub(crate) result_id: String,
    pub(crate) submission_id: String,
    pub(crate) correction_round: i32,
    pub(crate) exercise_id: String,
    pub(crate) exercise_title: String,
    pub(crate) exercise_type: ExerciseType,
    pub(crate) locked_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct ReleasableResult {
    pub(crate) result_id: String,
    pub(crate) participation_id: String,
}
