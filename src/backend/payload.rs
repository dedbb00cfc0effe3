//! Request/response bodies for the RunPod serverless `run` and `status` endpoints.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const MAX_NEW_TOKENS: u32 = 500;
pub const TEMPERATURE: f64 = 0.3;
pub const TOP_K: u32 = 50;
pub const TOP_P: f64 = 0.7;
pub const REPETITION_PENALTY: f64 = 1.2;
pub const BATCH_SIZE: u32 = 8;
pub const STOP_SEQUENCE: &str = "</s>";

/// Generation parameters sent to the backend. Only the prompt varies per call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationRequest {
    pub prompt: String,
    pub max_new_tokens: u32,
    pub temperature: f64,
    pub top_k: u32,
    pub top_p: f64,
    pub repetition_penalty: f64,
    pub batch_size: u32,
    pub stop: Vec<String>,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            max_new_tokens: MAX_NEW_TOKENS,
            temperature: TEMPERATURE,
            top_k: TOP_K,
            top_p: TOP_P,
            repetition_penalty: REPETITION_PENALTY,
            batch_size: BATCH_SIZE,
            stop: vec![STOP_SEQUENCE.to_string()],
        }
    }
}

/// Body of `POST {base}/run`.
#[derive(Debug, Serialize)]
pub struct RunRequest<'a> {
    pub input: &'a GenerationRequest,
}

/// Body returned by `POST {base}/run`.
#[derive(Debug, Deserialize)]
pub struct RunResponse {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

/// Body returned by `GET {base}/status/{id}`.
#[derive(Debug, Deserialize)]
pub struct StatusResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub output: Value,
    #[serde(default)]
    pub error: Option<Value>,
}

/// Task states reported by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskStatus {
    InQueue,
    InProgress,
    Completed,
    Failed,
    Cancelled,
    TimedOut,
    Other(String),
}

impl TaskStatus {
    /// Case-insensitive; `-` and spaces are treated like `_`.
    pub fn parse(raw: &str) -> Self {
        let normalized: String = raw
            .trim()
            .chars()
            .map(|c| match c {
                '-' | ' ' => '_',
                c => c.to_ascii_uppercase(),
            })
            .collect();

        match normalized.as_str() {
            "IN_QUEUE" => TaskStatus::InQueue,
            "IN_PROGRESS" => TaskStatus::InProgress,
            "COMPLETED" => TaskStatus::Completed,
            "FAILED" => TaskStatus::Failed,
            "CANCELLED" => TaskStatus::Cancelled,
            "TIMED_OUT" => TaskStatus::TimedOut,
            _ => TaskStatus::Other(raw.to_string()),
        }
    }

    /// The backend gave up on the task; further polling cannot succeed.
    pub fn is_terminal_failure(&self) -> bool {
        matches!(
            self,
            TaskStatus::Failed | TaskStatus::Cancelled | TaskStatus::TimedOut
        )
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskStatus::InQueue => f.write_str("IN_QUEUE"),
            TaskStatus::InProgress => f.write_str("IN_PROGRESS"),
            TaskStatus::Completed => f.write_str("COMPLETED"),
            TaskStatus::Failed => f.write_str("FAILED"),
            TaskStatus::Cancelled => f.write_str("CANCELLED"),
            TaskStatus::TimedOut => f.write_str("TIMED_OUT"),
            TaskStatus::Other(raw) => f.write_str(raw),
        }
    }
}
