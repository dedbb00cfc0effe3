//! Runtime configuration for runpod-gateway.
//!
//! Backend credentials and the gateway key come from the environment (optionally
//! seeded from a dotenv file). Listener and polling knobs come from the command line.
//! The resulting [`Config`] is built once at startup and handed to the server state.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default RunPod serverless API base.
pub const DEFAULT_API_BASE: &str = "https://api.runpod.ai/v2";

pub const ENV_AIROBOROS_ENDPOINT_ID: &str = "AIROBOROS_ENDPOINT_ID";
pub const ENV_AIROBOROS_API_KEY: &str = "AIROBOROS_API_KEY";
pub const ENV_LLAMA_ENDPOINT_ID: &str = "LLAMA_ENDPOINT_ID";
pub const ENV_LLAMA_API_KEY: &str = "LLAMA_API_KEY";
pub const ENV_GATEWAY_API_KEY: &str = "MY_API_KEY";
pub const ENV_API_BASE: &str = "RUNPOD_API_BASE";

/// Command-line arguments.
#[derive(Parser, Debug, Clone)]
#[command(name = "runpod-gateway", about = "Authenticated gateway for RunPod text generation")]
pub struct Cli {
    /// HTTP listen address.
    #[arg(long, default_value = "0.0.0.0:8000")]
    pub listen: String,

    /// Dotenv file to load before reading the environment (defaults to `.env` when present).
    #[arg(long)]
    pub env_file: Option<PathBuf>,

    /// Delay before the second status poll, in milliseconds (0 = poll back-to-back).
    #[arg(long, default_value_t = 500)]
    pub poll_interval_ms: u64,

    /// Upper bound for the poll backoff, in milliseconds.
    #[arg(long, default_value_t = 5000)]
    pub poll_max_interval_ms: u64,

    /// Give up on a task after this many seconds.
    #[arg(long, default_value_t = 600)]
    pub max_wait_secs: u64,

    /// Enable verbose logging.
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("required environment variable {0} is not set")]
    MissingVar(&'static str),

    #[error("invalid poll configuration: {0}")]
    InvalidPoll(String),
}

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration.
    pub server: ServerConfig,

    /// Key callers must present in `x-api-key`.
    pub gateway: GatewayAuthConfig,

    /// Backend endpoints and credentials.
    pub backends: BackendsConfig,

    /// Status polling behaviour.
    pub poll: PollConfig,
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address (e.g. "0.0.0.0:8000").
    pub listen: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:8000".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GatewayAuthConfig {
    pub api_key: String,
}

/// One RunPod serverless endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EndpointConfig {
    /// RunPod endpoint id (the path segment after the API base).
    pub endpoint_id: String,

    /// Bearer credential for this endpoint.
    pub api_key: String,
}

/// Both backends plus the shared API base.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendsConfig {
    /// API base URL, without trailing slash.
    pub api_base: String,

    /// Timeout applied to each individual outbound HTTP request, in seconds.
    pub request_timeout_secs: u64,

    pub airoboros: EndpointConfig,

    pub llama: EndpointConfig,
}

impl Default for BackendsConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            request_timeout_secs: 30,
            airoboros: EndpointConfig::default(),
            llama: EndpointConfig::default(),
        }
    }
}

/// Poll loop pacing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollConfig {
    /// First backoff interval in milliseconds; doubles after every pending poll.
    pub initial_interval_ms: u64,

    /// Ceiling for the backoff interval in milliseconds.
    pub max_interval_ms: u64,

    /// Total time a task may take before the gateway gives up, in seconds.
    pub max_wait_secs: u64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            initial_interval_ms: 500,
            max_interval_ms: 5000,
            max_wait_secs: 600,
        }
    }
}

impl PollConfig {
    pub fn initial_interval(&self) -> Duration {
        Duration::from_millis(self.initial_interval_ms)
    }

    pub fn max_interval(&self) -> Duration {
        Duration::from_millis(self.max_interval_ms)
    }

    pub fn max_wait(&self) -> Duration {
        Duration::from_secs(self.max_wait_secs)
    }
}

impl Config {
    /// Build configuration from the process environment.
    ///
    /// Call after any dotenv file has been loaded.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| dotenvy::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup. Empty values count as missing.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let require = |key: &'static str| {
            lookup(key)
                .filter(|value| !value.trim().is_empty())
                .ok_or(ConfigError::MissingVar(key))
        };

        let api_base = lookup(ENV_API_BASE)
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());

        Ok(Self {
            server: ServerConfig::default(),
            gateway: GatewayAuthConfig {
                api_key: require(ENV_GATEWAY_API_KEY)?,
            },
            backends: BackendsConfig {
                api_base: api_base.trim_end_matches('/').to_string(),
                airoboros: EndpointConfig {
                    endpoint_id: require(ENV_AIROBOROS_ENDPOINT_ID)?,
                    api_key: require(ENV_AIROBOROS_API_KEY)?,
                },
                llama: EndpointConfig {
                    endpoint_id: require(ENV_LLAMA_ENDPOINT_ID)?,
                    api_key: require(ENV_LLAMA_API_KEY)?,
                },
                ..BackendsConfig::default()
            },
            poll: PollConfig::default(),
        })
    }

    /// Overlay command-line settings.
    pub fn apply_cli(&mut self, cli: &Cli) {
        self.server.listen = cli.listen.clone();
        self.poll = PollConfig {
            initial_interval_ms: cli.poll_interval_ms,
            max_interval_ms: cli.poll_max_interval_ms,
            max_wait_secs: cli.max_wait_secs,
        };
    }

    /// Reject poll settings that would never terminate or never back off sensibly.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll.max_wait_secs == 0 {
            return Err(ConfigError::InvalidPoll(
                "max_wait_secs must be greater than zero".to_string(),
            ));
        }
        if self.poll.max_interval_ms < self.poll.initial_interval_ms {
            return Err(ConfigError::InvalidPoll(format!(
                "max interval {}ms is below initial interval {}ms",
                self.poll.max_interval_ms, self.poll.initial_interval_ms
            )));
        }
        Ok(())
    }
}
