//! Shared-key authentication for the task routes.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use subtle::ConstantTimeEq;
use tracing::warn;

use crate::error::GatewayError;
use crate::server::gateway_api::AppState;

/// Header carrying the gateway key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Check `presented` against the configured key. A missing key is rejected.
pub fn authenticate(expected: &str, presented: Option<&str>) -> Result<(), GatewayError> {
    let Some(presented) = presented else {
        return Err(GatewayError::Unauthorized);
    };

    let presented = presented.as_bytes();
    let expected = expected.as_bytes();

    // Length is not secret; only the comparison of contents is constant-time.
    if presented.len() != expected.len() || presented.ct_eq(expected).unwrap_u8() != 1 {
        return Err(GatewayError::Unauthorized);
    }

    Ok(())
}

/// Middleware guarding the task routes. Rejected requests never reach a handler.
pub async fn require_api_key(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, GatewayError> {
    let presented = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok());

    if let Err(e) = authenticate(&state.gateway_key, presented) {
        warn!(path = %request.uri().path(), "Rejected request with invalid API key");
        return Err(e);
    }

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matching_key_accepted() {
        assert!(authenticate("s3cret", Some("s3cret")).is_ok());
    }

    #[test]
    fn test_wrong_or_missing_key_rejected() {
        for presented in [None, Some(""), Some("s3cre"), Some("s3cret!"), Some("S3CRET")] {
            assert!(matches!(
                authenticate("s3cret", presented),
                Err(GatewayError::Unauthorized)
            ));
        }
    }
}
