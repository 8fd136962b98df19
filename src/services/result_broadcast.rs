use async_trait::async_trait;

use crate::core::{metrics, redis::RedisHandle, state::AppState, time::primitive_now_utc};
use crate::db::models::AssessmentResult;
use crate::repositories;
use crate::schemas::assessment::ResultView;
use crate::services::anonymization::{self, Viewer};

#[async_trait]
pub(crate) trait ResultBroadcaster: Send + Sync {
    async fn broadcast(&self, participation_id: &str, result: &ResultView) -> anyhow::Result<()>;
}

pub(crate) struct RedisResultBroadcaster {
    redis: RedisHandle,
}

impl RedisResultBroadcaster {
    pub(crate) fn new(redis: RedisHandle) -> Self {
        Self { redis }
    }
}

pub(crate) fn participation_channel(participation_id: &str) -> String {
    format!("results:participation:{participation_id}")
}

#[async_trait]
impl ResultBroadcaster for RedisResultBroadcaster {
    async fn broadcast(&self, participation_id: &str, result: &ResultView) -> anyhow::Result<()> {
        let payload = serde_json::to_string(result)?;
        let channel = participation_channel(participation_id);
        let Some(receivers) = self.redis.publish(&channel, &payload).await? else {
            anyhow::bail!("Redis is disconnected");
        };
        tracing::debug!(channel = %channel, receivers, "Result published");
        Ok(())
    }
}

// Sends the student's view of `result` and marks it as delivered. Returns `false` when the
// push failed; `broadcast_at` then stays empty and the release job picks the result up again.
pub(crate) async fn release_result(
    state: &AppState,
    result: AssessmentResult,
    participation_id: &str,
    trigger: &'static str,
) -> Result<bool, sqlx::Error> {
    let feedbacks = repositories::feedback::list_by_result(state.db(), &result.id).await?;
    let view = anonymization::apply(ResultView::new(result, feedbacks, None), Viewer::Student);

    if let Err(err) = state.broadcaster().broadcast(participation_id, &view).await {
        tracing::warn!(error = %err, result_id = %view.id, trigger, "Failed to broadcast result");
        return Ok(false);
    }

    repositories::results::mark_broadcast(state.db(), &view.id, primitive_now_utc()).await?;
    metrics::record_result_broadcast(trigger);
    tracing::info!(result_id = %view.id, participation_id, trigger, "Result released to student");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_is_scoped_to_participation() {
        assert_eq!(participation_channel("p-42"), "results:participation:p-42");
    }

    #[tokio::test]
    async fn redis_broadcaster_reports_missing_connection() {
        let redis = RedisHandle::new("redis://127.0.0.1:6379/1".to_string());
        let broadcaster = RedisResultBroadcaster::new(redis);
        let view = ResultView {
            id: "r-1".to_string(),
            submission_id: "s-1".to_string(),
            correction_round: 0,
            assessor: None,
            completion_date: None,
            rated: true,
            score: Some(100.0),
            assessment_type: crate::db::types::AssessmentType::Manual,
            has_complaint: false,
            feedbacks: Vec::new(),
        };

        let err = broadcaster.broadcast("p-1", &view).await.expect_err("disconnected");
        assert!(err.to_string().contains("disconnected"), "{err}");
    }
}
