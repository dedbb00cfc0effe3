//! Prometheus counters for task traffic, rendered at `GET /metrics`.

use std::time::Duration;

use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder,
};

use crate::backend::ModelSelector;

const DURATION_BUCKETS: &[f64] = &[0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0, 600.0];

/// Per-instance registry so independent states (and tests) never collide.
pub struct GatewayMetrics {
    registry: Registry,
    submitted: IntCounterVec,
    completed: IntCounterVec,
    failed: IntCounterVec,
    polls: IntCounterVec,
    duration: HistogramVec,
}

impl GatewayMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let submitted = IntCounterVec::new(
            Opts::new("gateway_tasks_submitted_total", "Tasks accepted by a backend"),
            &["model"],
        )?;
        let completed = IntCounterVec::new(
            Opts::new("gateway_tasks_completed_total", "Tasks that returned output"),
            &["model"],
        )?;
        let failed = IntCounterVec::new(
            Opts::new("gateway_tasks_failed_total", "Tasks that ended in an error"),
            &["model", "kind"],
        )?;
        let polls = IntCounterVec::new(
            Opts::new("gateway_status_polls_total", "Status requests sent to backends"),
            &["model"],
        )?;
        let duration = HistogramVec::new(
            HistogramOpts::new(
                "gateway_task_duration_seconds",
                "Time from submission to completion",
            )
            .buckets(DURATION_BUCKETS.to_vec()),
            &["model"],
        )?;

        registry.register(Box::new(submitted.clone()))?;
        registry.register(Box::new(completed.clone()))?;
        registry.register(Box::new(failed.clone()))?;
        registry.register(Box::new(polls.clone()))?;
        registry.register(Box::new(duration.clone()))?;

        Ok(Self {
            registry,
            submitted,
            completed,
            failed,
            polls,
            duration,
        })
    }

    pub fn record_submitted(&self, model: ModelSelector) {
        self.submitted.with_label_values(&[model.as_str()]).inc();
    }

    pub fn record_completed(&self, model: ModelSelector, elapsed: Duration) {
        self.completed.with_label_values(&[model.as_str()]).inc();
        self.duration
            .with_label_values(&[model.as_str()])
            .observe(elapsed.as_secs_f64());
    }

    pub fn record_failed(&self, model: ModelSelector, kind: &str) {
        self.failed.with_label_values(&[model.as_str(), kind]).inc();
    }

    pub fn record_poll(&self, model: ModelSelector) {
        self.polls.with_label_values(&[model.as_str()]).inc();
    }

    /// Text exposition format.
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let mut buf = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buf)?;
        String::from_utf8(buf).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_includes_recorded_series() {
        let metrics = GatewayMetrics::new().unwrap();
        metrics.record_submitted(ModelSelector::Llama);
        metrics.record_poll(ModelSelector::Llama);
        metrics.record_poll(ModelSelector::Llama);
        metrics.record_completed(ModelSelector::Llama, Duration::from_millis(1500));
        metrics.record_failed(ModelSelector::Airoboros, "timeout");

        let text = metrics.render().unwrap();
        assert!(text.contains("gateway_tasks_submitted_total{model=\"llama\"} 1"));
        assert!(text.contains("gateway_status_polls_total{model=\"llama\"} 2"));
        assert!(text.contains("gateway_tasks_completed_total{model=\"llama\"} 1"));
        assert!(text.contains("gateway_tasks_failed_total{kind=\"timeout\",model=\"airoboros\"} 1"));
        assert!(text.contains("gateway_task_duration_seconds_count{model=\"llama\"} 1"));
    }

    #[test]
    fn test_independent_registries() {
        assert!(GatewayMetrics::new().is_ok());
        assert!(GatewayMetrics::new().is_ok());
    }
}
