use std::sync::Arc;

use reqwest::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Network error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Unauthenticated - session terminated")]
    Unauthenticated,

    #[error("Server error ({status}): {message}")]
    Remote { status: StatusCode, message: String },

    #[error("Credential renewal failed: {0}")]
    RenewalFailed(Arc<ClientError>),

    #[error("Invalid request body: {0}")]
    InvalidRequest(serde_json::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl ClientError {
    /// Truncate a response body to avoid logging excessive data.
    /// Cuts at a char boundary; servers send arbitrary UTF-8 bodies.
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            return body.to_string();
        }
        let mut cut = MAX_ERROR_BODY_LENGTH;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        format!(
            "{}... (truncated, {} total bytes)",
            &body[..cut],
            body.len()
        )
    }

    /// Build a `Remote` error from a failure status and raw body.
    ///
    /// The server's JSON `message` field is preferred when present; the
    /// raw (truncated) body is the fallback so no failure detail is lost.
    pub(crate) fn remote(status: StatusCode, body: &str) -> Self {
        let message = serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|value| {
                value
                    .get("message")
                    .and_then(|m| m.as_str())
                    .map(str::to_owned)
            })
            .unwrap_or_else(|| Self::truncate_body(body));
        ClientError::Remote { status, message }
    }
}
