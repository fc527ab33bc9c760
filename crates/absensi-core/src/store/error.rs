use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Unauthorized - token may be expired")]
    Unauthorized,

    #[error("Document not found: {0}")]
    NotFound(String),

    #[error("Rate limited - please wait before retrying")]
    RateLimited,

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Document store unavailable: {0}")]
    Unavailable(String),

    #[error("Failed to decode document {id}: {source}")]
    Decode {
        id: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl StoreError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
        }
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let truncated = Self::truncate_body(body);
        match status.as_u16() {
            401 => StoreError::Unauthorized,
            403 => StoreError::AccessDenied(truncated),
            404 => StoreError::NotFound(truncated),
            429 => StoreError::RateLimited,
            500..=599 => StoreError::ServerError(truncated),
            _ => StoreError::InvalidResponse(format!("Status {}: {}", status, truncated)),
        }
    }
}
