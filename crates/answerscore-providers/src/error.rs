//! Provider error types.

use thiserror::Error;

/// Errors that can occur when calling a model backend.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The API returned a 429 rate limit response.
    #[error("rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    /// Authentication failed (missing or invalid token).
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The requested model was not found.
    #[error("model not found: {0}")]
    ModelNotFound(String),

    /// The model exists but is still being loaded by the server.
    #[error("model is loading, ready in about {estimated_secs:.0}s")]
    ModelLoading { estimated_secs: f64 },

    /// The API returned an error response.
    #[error("API error (HTTP {status}): {message}")]
    ApiError { status: u16, message: String },

    /// The response body did not have the expected shape.
    #[error("unexpected response: {0}")]
    InvalidResponse(String),

    /// The request timed out.
    #[error("request timed out after {0}s")]
    Timeout(u64),

    /// A network error occurred.
    #[error("network error: {0}")]
    NetworkError(String),
}

/// Classify a non-success HTTP status. `model` names the model in
/// not-found messages.
pub(crate) fn status_error(status: u16, body: String, model: &str) -> ProviderError {
    match status {
        401 | 403 => ProviderError::AuthenticationFailed(body),
        404 => ProviderError::ModelNotFound(model.to_string()),
        429 => ProviderError::RateLimited {
            retry_after_ms: 1000,
        },
        _ => ProviderError::ApiError {
            status,
            message: body,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_are_classified() {
        assert!(matches!(
            status_error(401, "bad token".into(), "m"),
            ProviderError::AuthenticationFailed(_)
        ));
        assert_eq!(
            status_error(404, String::new(), "bart").to_string(),
            "model not found: bart"
        );
        assert!(matches!(
            status_error(429, String::new(), "m"),
            ProviderError::RateLimited { .. }
        ));
        assert_eq!(
            status_error(500, "boom".into(), "m").to_string(),
            "API error (HTTP 500): boom"
        );
    }
}
