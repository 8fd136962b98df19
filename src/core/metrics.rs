use std::sync::OnceLock;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::core::config::Settings;

static PROM_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

pub(crate) fn init(settings: &Settings) -> anyhow::Result<()> {
    if !settings.telemetry().prometheus_enabled {
        return Ok(());
    }

    let handle = PrometheusBuilder::new().install_recorder()?;
    let _ = PROM_HANDLE.set(handle);
    Ok(())
}

pub(crate) fn render() -> Option<String> {
    PROM_HANDLE.get().map(|handle| handle.render())
}

pub(crate) fn record_assessment_lock(outcome: &'static str) {
    ::metrics::counter!("assessment_locks_total", "outcome" => outcome).increment(1);
}

pub(crate) fn record_complaint_lock(outcome: &'static str) {
    ::metrics::counter!("complaint_locks_total", "outcome" => outcome).increment(1);
}

pub(crate) fn record_result_broadcast(trigger: &'static str) {
    ::metrics::counter!("results_broadcast_total", "trigger" => trigger).increment(1);
}
