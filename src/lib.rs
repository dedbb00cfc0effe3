//! runpod-gateway: authenticated relay for RunPod text-generation endpoints.
//!
//! A caller posts a prompt for one of two configured backends; the gateway checks
//! the shared API key, submits a fixed-parameter generation task, polls the
//! backend until the task finishes, and returns the backend's output.

pub mod backend;
pub mod config;
pub mod error;
pub mod metrics;
pub mod server;
pub mod task;
