//! Task submission.
//!
//! Builds the fixed generation payload around the caller's prompt and posts it to
//! the selected backend's `run` endpoint. One attempt only; any failure ends the call.

use std::sync::Arc;

use reqwest::StatusCode;
use tracing::{debug, error};

use crate::backend::payload::{GenerationRequest, RunRequest, RunResponse};
use crate::backend::{BackendTable, ModelSelector, TaskId};
use crate::error::GatewayError;
use crate::metrics::GatewayMetrics;

pub struct Dispatcher {
    client: reqwest::Client,
    backends: Arc<BackendTable>,
    metrics: Arc<GatewayMetrics>,
}

impl Dispatcher {
    pub fn new(
        client: reqwest::Client,
        backends: Arc<BackendTable>,
        metrics: Arc<GatewayMetrics>,
    ) -> Self {
        Self {
            client,
            backends,
            metrics,
        }
    }

    /// Submit `prompt` to `model`'s backend and return the task id it assigns.
    pub async fn submit(&self, prompt: &str, model: ModelSelector) -> Result<TaskId, GatewayError> {
        let backend = self.backends.resolve(model);
        let request = GenerationRequest::new(prompt);

        debug!(model = %model, prompt_len = prompt.len(), "Submitting task");

        let response = self
            .client
            .post(backend.run_url())
            .bearer_auth(&backend.credential)
            .json(&RunRequest { input: &request })
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            // The body can carry backend internals; it goes to the log only.
            let body = response.text().await.unwrap_or_default();
            error!(
                model = %model,
                status = status.as_u16(),
                body = %body,
                "Backend rejected task submission"
            );
            return Err(GatewayError::UpstreamSubmit {
                status: status.as_u16(),
            });
        }

        let body: RunResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::MalformedResponse(e.to_string()))?;

        let task_id = body
            .id
            .filter(|id| !id.trim().is_empty())
            .map(TaskId::from)
            .ok_or(GatewayError::MissingTaskId)?;

        self.metrics.record_submitted(model);
        debug!(
            model = %model,
            task_id = %task_id,
            backend_status = body.status.as_deref().unwrap_or("unknown"),
            "Task accepted"
        );

        Ok(task_id)
    }
}
