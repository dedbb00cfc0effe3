// Mock RunPod backend shared by the integration tests.
#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::sync::oneshot;

use runpod_gateway::config::{
    Config, ENV_AIROBOROS_API_KEY, ENV_AIROBOROS_ENDPOINT_ID, ENV_API_BASE, ENV_GATEWAY_API_KEY,
    ENV_LLAMA_API_KEY, ENV_LLAMA_ENDPOINT_ID,
};

pub const GATEWAY_KEY: &str = "gateway-secret";
pub const AIROBOROS_ENDPOINT: &str = "airoboros-ep";
pub const AIROBOROS_KEY: &str = "airoboros-key";
pub const LLAMA_ENDPOINT: &str = "llama-ep";
pub const LLAMA_KEY: &str = "llama-key";

/// Scripted responses. Poll responses are served in order; the last one repeats.
#[derive(Clone)]
pub struct BackendScript {
    pub submit: (StatusCode, Value),
    pub polls: Vec<(StatusCode, Value)>,
}

impl BackendScript {
    /// Accepts with `task_id`, reports `pending` IN_PROGRESS polls, then completes with `output`.
    pub fn completes_after(task_id: &str, pending: usize, output: Value) -> Self {
        let mut polls = vec![(StatusCode::OK, json!({"id": task_id, "status": "IN_PROGRESS"})); pending];
        polls.push((
            StatusCode::OK,
            json!({"id": task_id, "status": "COMPLETED", "output": output}),
        ));
        Self {
            submit: (StatusCode::OK, json!({"id": task_id, "status": "IN_QUEUE"})),
            polls,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub endpoint: String,
    pub task_id: Option<String>,
    pub authorization: Option<String>,
    pub body: Option<Value>,
}

struct MockState {
    submit: (StatusCode, Value),
    polls: Mutex<VecDeque<(StatusCode, Value)>>,
    submit_calls: AtomicUsize,
    poll_calls: AtomicUsize,
    calls: Mutex<Vec<RecordedCall>>,
}

pub struct MockBackend {
    /// Value to use as the RunPod API base.
    pub url: String,
    state: Arc<MockState>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl MockBackend {
    pub async fn start(script: BackendScript) -> Self {
        let state = Arc::new(MockState {
            submit: script.submit,
            polls: Mutex::new(script.polls.into()),
            submit_calls: AtomicUsize::new(0),
            poll_calls: AtomicUsize::new(0),
            calls: Mutex::new(Vec::new()),
        });

        let app = Router::new()
            .route("/{endpoint}/run", post(run_handler))
            .route("/{endpoint}/status/{task_id}", get(status_handler))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        tokio::spawn(async move {
            let server = axum::serve(listener, app).with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            });
            if let Err(e) = server.await {
                eprintln!("Mock backend error: {e}");
            }
        });

        Self {
            url: format!("http://{addr}"),
            state,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    pub fn submit_calls(&self) -> usize {
        self.state.submit_calls.load(Ordering::SeqCst)
    }

    pub fn poll_calls(&self) -> usize {
        self.state.poll_calls.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state.calls.lock().unwrap().clone()
    }

    /// Gateway configuration pointing both backends at this mock.
    pub fn config(&self) -> Config {
        let env = HashMap::from([
            (ENV_API_BASE, self.url.clone()),
            (ENV_AIROBOROS_ENDPOINT_ID, AIROBOROS_ENDPOINT.to_string()),
            (ENV_AIROBOROS_API_KEY, AIROBOROS_KEY.to_string()),
            (ENV_LLAMA_ENDPOINT_ID, LLAMA_ENDPOINT.to_string()),
            (ENV_LLAMA_API_KEY, LLAMA_KEY.to_string()),
            (ENV_GATEWAY_API_KEY, GATEWAY_KEY.to_string()),
        ]);
        let mut config = Config::from_lookup(|k| env.get(k).cloned()).unwrap();
        config.poll.initial_interval_ms = 0;
        config.poll.max_interval_ms = 0;
        config.poll.max_wait_secs = 10;
        config
    }
}

impl Drop for MockBackend {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

fn authorization(headers: &HeaderMap) -> Option<String> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

async fn run_handler(
    State(state): State<Arc<MockState>>,
    Path(endpoint): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    state.submit_calls.fetch_add(1, Ordering::SeqCst);
    state.calls.lock().unwrap().push(RecordedCall {
        endpoint,
        task_id: None,
        authorization: authorization(&headers),
        body: Some(body),
    });

    let (status, body) = state.submit.clone();
    (status, Json(body)).into_response()
}

async fn status_handler(
    State(state): State<Arc<MockState>>,
    Path((endpoint, task_id)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response {
    state.poll_calls.fetch_add(1, Ordering::SeqCst);
    state.calls.lock().unwrap().push(RecordedCall {
        endpoint,
        task_id: Some(task_id),
        authorization: authorization(&headers),
        body: None,
    });

    let (status, body) = {
        let mut polls = state.polls.lock().unwrap();
        if polls.len() > 1 {
            polls.pop_front().unwrap()
        } else {
            polls
                .front()
                .cloned()
                .unwrap_or((StatusCode::OK, json!({"status": "IN_QUEUE"})))
        }
    };
    (status, Json(body)).into_response()
}
