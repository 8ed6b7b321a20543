use thiserror::Error;

/// Every way a backend call can fail. Consumers generally treat all variants
/// as "request failed" and only show the message.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Failed to send the HTTP request: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Request failed: {status} {status_text}{}", detail(.message))]
    Status {
        status: u16,
        status_text: String,
        /// The `detail`/`error` field of the response body, when the backend sent one.
        message: Option<String>,
    },

    #[error("Failed to deserialize the API response: {0}")]
    Deserialization(String),

    #[error("Invalid base URL: {0}")]
    InvalidUrl(String),

    #[error("Failed to encode the request: {0}")]
    Encoding(String),
}

impl ApiError {
    /// The HTTP status code, for failures that got as far as a response.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            ApiError::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

fn detail(message: &Option<String>) -> String {
    match message {
        Some(message) => format!(" ({})", message),
        None => String::new(),
    }
}
