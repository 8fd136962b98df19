use anyhow::{Context, Result};

use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::repositories;
use crate::services::result_broadcast;

const RELEASE_BATCH_SIZE: i64 = 200;

pub(crate) async fn release_due_results(state: &AppState) -> Result<usize> {
    let now = primitive_now_utc();
    let due = repositories::results::list_releasable(state.db(), now, RELEASE_BATCH_SIZE)
        .await
        .context("Failed to list releasable results")?;

    let mut released = 0;
    for item in due {
        let Some(result) = repositories::results::find_by_id(state.db(), &item.result_id)
            .await
            .context("Failed to load result")?
        else {
            continue;
        };

        match result_broadcast::release_result(state, result, &item.participation_id, "schedule")
            .await
        {
            Ok(true) => released += 1,
            Ok(false) => {}
            Err(err) => {
                tracing::error!(result_id = %item.result_id, error = %err, "Failed to release result");
            }
        }
    }

    if released > 0 {
        tracing::info!(released_results = released, "Released results after assessment due date");
    }
    Ok(released)
}
