use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum ApiError {
    /// The backend answered with a non-success status. Displays as the
    /// backend's `message` so callers can show it directly.
    #[error("{message}")]
    Backend {
        status: reqwest::StatusCode,
        message: String,
    },

    #[error("Not signed in")]
    NotSignedIn,

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Maximum length for error response bodies in log output
const MAX_ERROR_BODY_LENGTH: usize = 500;

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            return body.to_string();
        }
        let mut end = MAX_ERROR_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
    }

    /// Build an error from a failed response body.
    ///
    /// Uses the JSON `message` field verbatim when the backend sent one,
    /// otherwise the caller's generic `fallback`.
    pub fn from_status(status: reqwest::StatusCode, body: &str, fallback: &str) -> Self {
        let message = serde_json::from_str::<ErrorBody>(body)
            .ok()
            .and_then(|b| b.message)
            .filter(|m| !m.is_empty());

        let message = match message {
            Some(message) => message,
            None => {
                debug!(status = %status, body = %Self::truncate_body(body), "Error response without a message");
                fallback.to_string()
            }
        };

        ApiError::Backend { status, message }
    }

    /// HTTP status of a backend error, if this is one.
    pub fn status(&self) -> Option<reqwest::StatusCode> {
        match self {
            ApiError::Backend { status, .. } => Some(*status),
            ApiError::Network(e) => e.status(),
            _ => None,
        }
    }
}
