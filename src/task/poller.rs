//! Status polling.
//!
//! Polls `GET {base}/status/{id}` until the backend reports a terminal state.
//! Pending polls are spaced by an exponential backoff capped at `max_interval`,
//! and the whole wait is bounded by `max_wait`.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, error, warn};

use crate::backend::payload::{StatusResponse, TaskStatus};
use crate::backend::{BackendTable, ModelSelector, TaskId};
use crate::config::PollConfig;
use crate::error::GatewayError;
use crate::metrics::GatewayMetrics;
use crate::task::TaskState;

/// Pacing for the poll loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Delay after the first pending poll. Zero polls back-to-back.
    pub initial_interval: Duration,
    pub max_interval: Duration,
    pub max_wait: Duration,
}

impl PollPolicy {
    /// Delay to use after `current`.
    fn next_interval(&self, current: Duration) -> Duration {
        current.saturating_mul(2).min(self.max_interval)
    }
}

impl From<&PollConfig> for PollPolicy {
    fn from(config: &PollConfig) -> Self {
        Self {
            initial_interval: config.initial_interval(),
            max_interval: config.max_interval(),
            max_wait: config.max_wait(),
        }
    }
}

pub struct Poller {
    client: reqwest::Client,
    backends: Arc<BackendTable>,
    metrics: Arc<GatewayMetrics>,
    policy: PollPolicy,
}

impl Poller {
    pub fn new(
        client: reqwest::Client,
        backends: Arc<BackendTable>,
        metrics: Arc<GatewayMetrics>,
        policy: PollPolicy,
    ) -> Self {
        Self {
            client,
            backends,
            metrics,
            policy,
        }
    }

    /// Wait for `task_id` on `model`'s backend and return its output unmodified.
    pub async fn wait(&self, task_id: &TaskId, model: ModelSelector) -> Result<Value, GatewayError> {
        match tokio::time::timeout(self.policy.max_wait, self.poll_until_terminal(task_id, model))
            .await
        {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    model = %model,
                    task_id = %task_id,
                    max_wait_secs = self.policy.max_wait.as_secs(),
                    "Task did not reach a terminal state in time"
                );
                Err(GatewayError::Timeout {
                    waited: self.policy.max_wait,
                })
            }
        }
    }

    async fn poll_until_terminal(
        &self,
        task_id: &TaskId,
        model: ModelSelector,
    ) -> Result<Value, GatewayError> {
        let backend = self.backends.resolve(model);
        let url = backend.status_url(task_id);

        let mut state = TaskState::Submitted;
        let mut interval = self.policy.initial_interval;
        let mut polls: u32 = 0;

        loop {
            state = advance(state, TaskState::Pending, task_id);

            let response = self
                .client
                .get(&url)
                .bearer_auth(&backend.credential)
                .send()
                .await;
            polls += 1;
            self.metrics.record_poll(model);

            let response = match response {
                Ok(response) => response,
                Err(e) => {
                    advance(state, TaskState::Failed, task_id);
                    return Err(GatewayError::Network(e));
                }
            };

            let status = response.status();
            // Anything from 400 up is terminal, including non-standard codes above 599.
            if status.as_u16() >= 400 {
                let body = response.text().await.unwrap_or_default();
                error!(
                    model = %model,
                    task_id = %task_id,
                    status = status.as_u16(),
                    body = %body,
                    "Error fetching task status"
                );
                advance(state, TaskState::Failed, task_id);
                return Err(GatewayError::UpstreamPoll {
                    status: status.as_u16(),
                });
            }

            if status.is_success() {
                let body: StatusResponse = match response.json().await {
                    Ok(body) => body,
                    Err(e) => {
                        advance(state, TaskState::Failed, task_id);
                        return Err(GatewayError::MalformedResponse(e.to_string()));
                    }
                };

                let task_status = TaskStatus::parse(body.status.as_deref().unwrap_or_default());
                if task_status == TaskStatus::Completed {
                    advance(state, TaskState::Completed, task_id);
                    debug!(model = %model, task_id = %task_id, polls, "Task completed");
                    return Ok(body.output);
                }
                if task_status.is_terminal_failure() {
                    error!(
                        model = %model,
                        task_id = %task_id,
                        status = %task_status,
                        error = ?body.error,
                        "Backend reported task failure"
                    );
                    advance(state, TaskState::Failed, task_id);
                    return Err(GatewayError::TaskFailed {
                        status: task_status.to_string(),
                    });
                }

                debug!(model = %model, task_id = %task_id, status = %task_status, polls, "Task pending");
            }

            if !interval.is_zero() {
                tokio::time::sleep(interval).await;
                interval = self.policy.next_interval(interval);
            }
        }
    }
}

fn advance(current: TaskState, next: TaskState, task_id: &TaskId) -> TaskState {
    debug_assert!(
        current.can_transition_to(next),
        "illegal task transition {current} -> {next}"
    );
    if current != next {
        debug!(task_id = %task_id, from = %current, to = %next, "Task state change");
    }
    next
}
