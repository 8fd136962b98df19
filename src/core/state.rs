use std::sync::Arc;

use sqlx::PgPool;

use crate::core::{config::Settings, redis::RedisHandle};
use crate::services::result_broadcast::ResultBroadcaster;

#[derive(Clone)]
pub(crate) struct AppState {
    inner: Arc<InnerState>,
}

struct InnerState {
    settings: Settings,
    db: PgPool,
    redis: RedisHandle,
    broadcaster: Arc<dyn ResultBroadcaster>,
}

impl AppState {
    pub(crate) fn new(
        settings: Settings,
        db: PgPool,
        redis: RedisHandle,
        broadcaster: Arc<dyn ResultBroadcaster>,
    ) -> Self {
        Self { inner: Arc::new(InnerState { settings, db, redis, broadcaster }) }
    }

    pub(crate) fn settings(&self) -> &Settings {
        &self.inner.settings
    }

    pub(crate) fn db(&self) -> &PgPool {
        &self.inner.db
    }

    pub(crate) fn redis(&self) -> &RedisHandle {
        &self.inner.redis
    }

    pub(crate) fn broadcaster(&self) -> &dyn ResultBroadcaster {
        self.inner.broadcaster.as_ref()
    }
}
