//! Gateway HTTP API.
//!
//! - GET /                        liveness string
//! - GET /health                  uptime
//! - GET /metrics                 Prometheus exposition
//! - POST /run-task/{model}/      submit a prompt and wait for the output
//! - POST /timed-task/{model}/    same, plus wall-clock response time
//!
//! The task routes require the `x-api-key` header.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use axum::body::Bytes;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::middleware;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tower_http::trace::TraceLayer;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::backend::{BackendTable, ModelSelector};
use crate::config::Config;
use crate::error::GatewayError;
use crate::metrics::GatewayMetrics;
use crate::server::auth::require_api_key;
use crate::task::dispatcher::Dispatcher;
use crate::task::poller::{PollPolicy, Poller};

/// Application state shared across handlers.
pub struct AppState {
    pub dispatcher: Dispatcher,
    pub poller: Poller,
    pub gateway_key: String,
    pub metrics: Arc<GatewayMetrics>,
    pub start_time: Instant,
}

impl AppState {
    /// Wire the dispatcher and poller to the configured backends.
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.backends.request_timeout_secs))
            .user_agent(concat!("runpod-gateway/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("failed to build HTTP client")?;

        let backends = Arc::new(BackendTable::from_config(&config.backends));
        let metrics = Arc::new(
            GatewayMetrics::new().map_err(|e| anyhow::anyhow!("failed to register metrics: {e}"))?,
        );

        Ok(Self {
            dispatcher: Dispatcher::new(client.clone(), backends.clone(), metrics.clone()),
            poller: Poller::new(client, backends, metrics.clone(), PollPolicy::from(&config.poll)),
            gateway_key: config.gateway.api_key.clone(),
            metrics,
            start_time: Instant::now(),
        })
    }

    /// Submit, wait, and record the outcome. Returns the output and the elapsed time.
    pub async fn execute(
        &self,
        prompt: &str,
        model: ModelSelector,
    ) -> Result<(Value, Duration), GatewayError> {
        let request_id = Uuid::new_v4();
        let started = Instant::now();

        let result = async {
            let task_id = self.dispatcher.submit(prompt, model).await?;
            info!(task_id = %task_id, "Task submitted");
            self.poller.wait(&task_id, model).await
        }
        .instrument(info_span!("task", request_id = %request_id, model = %model))
        .await;

        let elapsed = started.elapsed();
        match &result {
            Ok(_) => {
                self.metrics.record_completed(model, elapsed);
                info!(
                    request_id = %request_id,
                    model = %model,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Task complete"
                );
            }
            Err(e) => {
                self.metrics.record_failed(model, e.kind());
                warn!(request_id = %request_id, model = %model, error = %e, "Task failed");
            }
        }

        result.map(|output| (output, elapsed))
    }
}

/// Build the axum router with all API routes.
pub fn build_router(state: Arc<AppState>) -> Router {
    let tasks = Router::new()
        .route("/run-task/{model}", post(run_task))
        .route("/run-task/{model}/", post(run_task))
        .route("/timed-task/{model}", post(timed_task))
        .route("/timed-task/{model}/", post(timed_task))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_api_key));

    Router::new()
        .route("/", get(home))
        .route("/health", get(health))
        .route("/metrics", get(render_metrics))
        .merge(tasks)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ─── Request/Response Types ────────────────────────────────────────────────

/// `?prompt=...`
#[derive(Debug, Deserialize)]
pub struct PromptQuery {
    #[serde(default)]
    pub prompt: Option<String>,
}

/// JSON body accepted when the query string carries no prompt.
#[derive(Debug, Deserialize)]
pub struct PromptBody {
    pub prompt: String,
}

#[derive(Debug, Serialize)]
pub struct RunTaskResponse {
    pub output: Value,
}

#[derive(Debug, Serialize)]
pub struct TimedTaskResponse {
    pub output: Value,
    pub response_time_seconds: f64,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub uptime_secs: u64,
}

/// A query string that does not deserialize (e.g. a repeated `prompt`) is a prompt error.
fn prompt_query(query: Result<Query<PromptQuery>, QueryRejection>) -> Result<PromptQuery, GatewayError> {
    query.map(|Query(q)| q).map_err(|rejection| {
        warn!("Rejected query string: {rejection}");
        GatewayError::MissingPrompt
    })
}

/// Query string wins; otherwise a JSON body with a `prompt` field.
fn resolve_prompt(query: PromptQuery, body: &[u8]) -> Result<String, GatewayError> {
    if let Some(prompt) = query.prompt {
        return Ok(prompt);
    }
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(GatewayError::MissingPrompt);
    }
    serde_json::from_slice::<PromptBody>(body)
        .map(|b| b.prompt)
        .map_err(|_| GatewayError::MissingPrompt)
}

// ─── Route Handlers ────────────────────────────────────────────────────────

async fn home() -> Json<&'static str> {
    Json("API is running")
}

async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}

async fn render_metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.metrics.render() {
        Ok(text) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            text,
        )
            .into_response(),
        Err(e) => {
            warn!("Failed to render metrics: {e}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn run_task(
    State(state): State<Arc<AppState>>,
    Path(model): Path<String>,
    query: Result<Query<PromptQuery>, QueryRejection>,
    body: Bytes,
) -> Result<Json<RunTaskResponse>, GatewayError> {
    let model: ModelSelector = model.parse()?;
    let prompt = resolve_prompt(prompt_query(query)?, &body)?;

    let (output, _) = state.execute(&prompt, model).await?;
    Ok(Json(RunTaskResponse { output }))
}

async fn timed_task(
    State(state): State<Arc<AppState>>,
    Path(model): Path<String>,
    query: Result<Query<PromptQuery>, QueryRejection>,
    body: Bytes,
) -> Result<Json<TimedTaskResponse>, GatewayError> {
    let model: ModelSelector = model.parse()?;
    let prompt = resolve_prompt(prompt_query(query)?, &body)?;

    let (output, elapsed) = state.execute(&prompt, model).await?;
    Ok(Json(TimedTaskResponse {
        output,
        response_time_seconds: elapsed.as_secs_f64(),
    }))
}
