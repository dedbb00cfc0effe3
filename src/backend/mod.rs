//! Backend selection and the RunPod wire format.
//!
//! - [`payload`]: request/response bodies for the `run` and `status` endpoints
//!
//! A [`ModelSelector`] names one of the two configured backends; the
//! [`BackendTable`] maps it to a base URL and bearer credential.

pub mod payload;

use std::fmt;
use std::str::FromStr;

use crate::config::{BackendsConfig, EndpointConfig};
use crate::error::GatewayError;

/// The closed set of backends this gateway can reach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelSelector {
    Airoboros,
    Llama,
}

impl ModelSelector {
    pub const ALL: [ModelSelector; 2] = [ModelSelector::Airoboros, ModelSelector::Llama];

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelSelector::Airoboros => "airoboros",
            ModelSelector::Llama => "llama",
        }
    }
}

impl fmt::Display for ModelSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelSelector {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ModelSelector::ALL
            .into_iter()
            .find(|model| model.as_str() == s)
            .ok_or_else(|| GatewayError::InvalidModel(s.to_string()))
    }
}

/// Opaque identifier the backend assigns to a submitted task.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TaskId(String);

impl TaskId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for TaskId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for TaskId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A resolved backend: where to send requests and which credential to attach.
#[derive(Clone)]
pub struct Backend {
    /// `{api_base}/{endpoint_id}`, no trailing slash.
    pub base_url: String,
    pub credential: String,
}

impl Backend {
    pub fn new(base_url: impl Into<String>, credential: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            credential: credential.into(),
        }
    }

    fn from_endpoint(api_base: &str, endpoint: &EndpointConfig) -> Self {
        Self::new(
            format!("{}/{}", api_base.trim_end_matches('/'), endpoint.endpoint_id),
            endpoint.api_key.clone(),
        )
    }

    pub fn run_url(&self) -> String {
        format!("{}/run", self.base_url)
    }

    pub fn status_url(&self, task_id: &TaskId) -> String {
        format!("{}/status/{}", self.base_url, task_id)
    }
}

// Credentials stay out of Debug output so they never reach the logs.
impl fmt::Debug for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Backend")
            .field("base_url", &self.base_url)
            .field("credential", &"<redacted>")
            .finish()
    }
}

/// Fixed mapping from selector to backend, built once at startup.
#[derive(Debug, Clone)]
pub struct BackendTable {
    airoboros: Backend,
    llama: Backend,
}

impl BackendTable {
    pub fn new(airoboros: Backend, llama: Backend) -> Self {
        Self { airoboros, llama }
    }

    pub fn from_config(config: &BackendsConfig) -> Self {
        Self::new(
            Backend::from_endpoint(&config.api_base, &config.airoboros),
            Backend::from_endpoint(&config.api_base, &config.llama),
        )
    }

    pub fn resolve(&self, model: ModelSelector) -> &Backend {
        match model {
            ModelSelector::Airoboros => &self.airoboros,
            ModelSelector::Llama => &self.llama,
        }
    }
}
