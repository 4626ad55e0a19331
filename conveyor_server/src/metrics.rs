//! Prometheus metrics for service observability.

use metrics::counter;

/// Initialize metrics exporter (Prometheus).
pub fn init_metrics() {
    let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
    if let Err(e) = builder.install() {
        tracing::warn!("Failed to install Prometheus exporter: {}", e);
    }
}

/// Record an inbound webhook or bus delivery.
pub fn webhook_received(event_type: &str) {
    counter!("conveyor_webhooks_received_total", "event" => event_type.to_string()).increment(1);
}

/// Record a normalized event entering processing.
pub fn event_received(kind: &str) {
    counter!("conveyor_events_total", "kind" => kind.to_string()).increment(1);
}

/// Record a checker stopping a job.
pub fn pre_check_failed(checker: &'static str) {
    counter!("conveyor_pre_check_failures_total", "checker" => checker).increment(1);
}

/// Record a job handed to a downstream system.
pub fn job_dispatched(job: &'static str) {
    counter!("conveyor_jobs_dispatched_total", "job" => job).increment(1);
}
