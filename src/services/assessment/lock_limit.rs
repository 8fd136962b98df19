use crate::db::models::{Course, Exercise};
use crate::repositories;

use super::AssessmentError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct LockLimit {
    pub(crate) active: i64,
    pub(crate) ceiling: i64,
}

impl LockLimit {
    pub(crate) fn ensure_available(&self) -> Result<(), AssessmentError> {
        if self.active < self.ceiling {
            Ok(())
        } else {
            Err(AssessmentError::Conflict(format!(
                "You already hold {} of {} allowed locked submissions in this course",
                self.active, self.ceiling
            )))
        }
    }
}

pub(crate) fn effective_ceiling(default: u32, course: &Course, exercise: Option<&Exercise>) -> i64 {
    exercise
        .and_then(|exercise| exercise.lock_limit_override)
        .or(course.max_locked_submissions)
        .map(i64::from)
        .unwrap_or_else(|| i64::from(default))
}

// Counts from persisted rows. Run it inside the acquiring transaction after the
// grader/course advisory lock so concurrent requests see each other's inserts.
pub(crate) async fn check_submission_lock_limit(
    executor: impl sqlx::PgExecutor<'_>,
    grader_id: &str,
    course_id: &str,
    ceiling: i64,
) -> Result<LockLimit, sqlx::Error> {
    let active =
        repositories::results::count_active_locks(executor, grader_id, course_id).await?;
    Ok(LockLimit { active, ceiling })
}
