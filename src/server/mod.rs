//! HTTP server fronting the backends.
//!
//! - [`gateway_api`]: Router, shared state, and route handlers
//! - [`auth`]: `x-api-key` check for the task routes

pub mod auth;
pub mod gateway_api;
