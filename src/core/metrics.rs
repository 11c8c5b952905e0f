use std::sync::OnceLock;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::core::config::Settings;

static PROM_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

pub(crate) fn init(settings: &Settings) -> anyhow::Result<()> {
    if !settings.telemetry().prometheus_enabled || PROM_HANDLE.get().is_some() {
        return Ok(());
    }

    let handle = PrometheusBuilder::new().install_recorder()?;
    let _ = PROM_HANDLE.set(handle);
    Ok(())
}

pub(crate) fn render() -> Option<String> {
    PROM_HANDLE.get().map(|handle| handle.render())
}

pub(crate) fn record_attempt_started(resumed: bool) {
    let outcome = if resumed { "resumed" } else { "created" };
    metrics::counter!("attempts_started_total", "outcome" => outcome).increment(1);
}

pub(crate) fn record_attempt_completed(score: i32) {
    metrics::counter!("attempts_completed_total").increment(1);
    metrics::histogram!("attempt_score_percent").record(f64::from(score));
}

pub(crate) fn record_answer_saved() {
    metrics::counter!("answers_saved_total").increment(1);
}
