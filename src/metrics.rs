use prometheus::{Encoder, IntCounter, IntGauge, Opts, TextEncoder};
use tracing::warn;

use crate::error::AppError;

#[derive(Clone)]
pub struct Metrics {
    pub messages_sent: IntCounter,
    pub live_connections: IntGauge,
    pub runs_pending: IntGauge,
    pub oldest_due_age_seconds: IntGauge,
}

impl Metrics {
    pub fn new(service: &str) -> Self {
        let registry = prometheus::default_registry();

        let messages_sent = IntCounter::with_opts(
            Opts::new("chat_messages_sent_total", "Total messages persisted")
                .const_label("service", service.to_string()),
        )
        .expect("valid metric opts for chat_messages_sent_total");

        let live_connections = IntGauge::with_opts(
            Opts::new(
                "chat_live_connections",
                "Users with an open event stream on this process",
            )
            .const_label("service", service.to_string()),
        )
        .expect("valid metric opts for chat_live_connections");

        let runs_pending = IntGauge::with_opts(
            Opts::new(
                "workflow_runs_pending",
                "Workflow runs not yet completed",
            )
            .const_label("service", service.to_string()),
        )
        .expect("valid metric opts for workflow_runs_pending");

        let oldest_due_age_seconds = IntGauge::with_opts(
            Opts::new(
                "workflow_oldest_due_age_seconds",
                "Age in seconds of the longest-overdue workflow run",
            )
            .const_label("service", service.to_string()),
        )
        .expect("valid metric opts for workflow_oldest_due_age_seconds");

        for metric in [
            Box::new(messages_sent.clone()) as Box<dyn prometheus::core::Collector>,
            Box::new(live_connections.clone()),
            Box::new(runs_pending.clone()),
            Box::new(oldest_due_age_seconds.clone()),
        ] {
            if let Err(e) = registry.register(metric) {
                warn!("failed to register metric: {}", e);
            }
        }

        Self {
            messages_sent,
            live_connections,
            runs_pending,
            oldest_due_age_seconds,
        }
    }
}

/// Render the default registry in Prometheus text format
pub fn encode() -> Result<String, AppError> {
    let metric_families = prometheus::gather();
    let mut buf = Vec::new();
    TextEncoder::new()
        .encode(&metric_families, &mut buf)
        .map_err(|e| AppError::Config(format!("metrics encode: {e}")))?;
    String::from_utf8(buf).map_err(|e| AppError::Config(format!("metrics encode: {e}")))
}
