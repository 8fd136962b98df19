use crate::db::models::{AssessmentResult, Exercise};
use crate::repositories;

use super::AssessmentError;

#[derive(Debug, Clone, Copy)]
pub(crate) struct AssessorConflictPolicy {
    pub(crate) excludes_first_assessor: bool,
}

impl AssessorConflictPolicy {
    pub(crate) fn excluded_assessor<'a>(
        &self,
        exercise: &Exercise,
        correction_round: i32,
        grader_id: &'a str,
    ) -> Option<&'a str> {
        let applies =
            self.excludes_first_assessor && exercise.is_exam_exercise && correction_round > 0;
        applies.then_some(grader_id)
    }

    pub(crate) fn check(
        &self,
        exercise: &Exercise,
        correction_round: i32,
        previous: Option<&AssessmentResult>,
        grader_id: &str,
    ) -> Result<(), AssessmentError> {
        let Some(excluded) = self.excluded_assessor(exercise, correction_round, grader_id) else {
            return Ok(());
        };

        if previous.and_then(|result| result.assessor_id.as_deref()) == Some(excluded) {
            return Err(AssessmentError::Conflict(
                "The previous correction round was assessed by you".to_string(),
            ));
        }
        Ok(())
    }
}

pub(crate) fn validate_round_index(
    exercise: &Exercise,
    correction_round: i32,
) -> Result<(), AssessmentError> {
    if correction_round < 0 {
        return Err(AssessmentError::BadRequest("correction round must not be negative".to_string()));
    }
    if correction_round >= exercise.correction_rounds {
        return Err(AssessmentError::BadRequest(format!(
            "exercise has {} correction round(s); round {correction_round} does not exist",
            exercise.correction_rounds
        )));
    }
    Ok(())
}

fn previous_round_finalized(
    correction_round: i32,
    previous: Option<&AssessmentResult>,
) -> Result<(), AssessmentError> {
    match previous {
        Some(result) if result.is_finalized() => Ok(()),
        Some(_) => Err(AssessmentError::BadRequest(format!(
            "correction round {} is still in progress",
            correction_round - 1
        ))),
        None => Err(AssessmentError::BadRequest(format!(
            "correction round {} has not been assessed yet",
            correction_round - 1
        ))),
    }
}

// Round 0 is always eligible; round `k` needs a finalized result at round `k - 1`.
pub(crate) async fn assert_round_eligible(
    executor: impl sqlx::PgExecutor<'_>,
    exercise: &Exercise,
    submission_id: &str,
    correction_round: i32,
) -> Result<Option<AssessmentResult>, AssessmentError> {
    validate_round_index(exercise, correction_round)?;
    if correction_round == 0 {
        return Ok(None);
    }

    let previous =
        repositories::results::find_for_round(executor, submission_id, correction_round - 1)
            .await?;
    previous_round_finalized(correction_round, previous.as_ref())?;
    Ok(previous)
}
