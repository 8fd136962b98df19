pub(crate) mod accessor;
pub(crate) mod correction_rounds;
pub(crate) mod lock_limit;
pub(crate) mod lock_manager;
pub(crate) mod score;
pub(crate) mod workflow;

use thiserror::Error;

use crate::db::models::AssessmentResult;

#[derive(Debug, Error)]
pub(crate) enum AssessmentError {
    #[error("{0}")]
    Forbidden(&'static str),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    NotFound(&'static str),
    #[error("{0}")]
    BadRequest(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// How a lock attempt ended. Losing a race is an expected outcome, not an error.
#[derive(Debug)]
pub(crate) enum LockOutcome {
    Acquired(AssessmentResult),
    Resumed(AssessmentResult),
    Taken,
    Assessed,
}

impl LockOutcome {
    pub(crate) fn metric_label(&self) -> &'static str {
        match self {
            LockOutcome::Acquired(_) => "acquired",
            LockOutcome::Resumed(_) => "resumed",
            LockOutcome::Taken => "taken",
            LockOutcome::Assessed => "assessed",
        }
    }

    pub(crate) fn into_result(self) -> Option<AssessmentResult> {
        match self {
            LockOutcome::Acquired(result) | LockOutcome::Resumed(result) => Some(result),
            LockOutcome::Taken | LockOutcome::Assessed => None,
        }
    }

    pub(crate) fn into_locked(self) -> Result<AssessmentResult, AssessmentError> {
        match self {
            LockOutcome::Acquired(result) | LockOutcome::Resumed(result) => Ok(result),
            LockOutcome::Taken => {
                Err(AssessmentError::Conflict("Submission is locked by another assessor".to_string()))
            }
            LockOutcome::Assessed => Err(AssessmentError::Conflict(
                "Submission was already assessed in this round".to_string(),
            )),
        }
    }
}
