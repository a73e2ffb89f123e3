use serde::Deserialize;

/// Client-side API error.
///
/// 401 and 404 get their own variants: the session resolver treats the
/// first as "no session" and mutation callers treat the second as
/// already satisfied.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("validation: {message}")]
    Validation { message: String },

    #[error("HTTP {status}: {message}")]
    Server { status: u16, message: String },

    #[error("network: {0}")]
    Network(#[from] reqwest::Error),

    #[error("decode: {0}")]
    Decode(String),

    #[error("credential storage: {0}")]
    Storage(String),
}

impl ApiError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound(_))
    }

    /// Map a non-success HTTP status and its body to an error.
    ///
    /// Bodies shaped like `{"message": "..."}` are unwrapped; anything else
    /// is kept verbatim.
    pub fn from_status(status: u16, body: &str) -> Self {
        let message = extract_message(body);
        match status {
            401 | 419 => ApiError::Unauthorized(message),
            404 => ApiError::NotFound(message),
            422 => ApiError::Validation { message },
            _ => ApiError::Server { status, message },
        }
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

fn extract_message(body: &str) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .map(|b| b.message)
        .unwrap_or_else(|_| body.trim().to_string())
}
