use thiserror::Error;

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Longest server message kept when the body is not a JSON `{message}` object.
const MAX_BODY_EXCERPT: usize = 200;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("network error: {0}")]
    Network(#[source] reqwest::Error),

    #[error("server rejected the note: {message}")]
    Validation { status: u16, message: String },

    #[error("note {id} not found")]
    NotFound { id: String },

    #[error("not authorised ({status}): check the API token")]
    Unauthorized { status: u16 },

    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("unexpected response body: {0}")]
    Decode(#[source] reqwest::Error),

    #[error("invalid service configuration: {0}")]
    InvalidConfig(String),
}

impl ServiceError {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Validation { status, .. }
            | Self::Unauthorized { status }
            | Self::Http { status, .. } => Some(*status),
            Self::NotFound { .. } => Some(404),
            _ => None,
        }
    }

    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network(_))
    }

    /// Short text suitable for a single status line or inline message.
    pub fn user_message(&self) -> String {
        match self {
            Self::Network(_) => "Network error, check your connection".to_string(),
            Self::Validation { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

impl From<reqwest::Error> for ServiceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ServiceError::Decode(err)
        } else {
            ServiceError::Network(err)
        }
    }
}

/// Pulls `message` out of a JSON error body, falling back to the raw text.
pub(crate) fn extract_message(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        if let Some(message) = value.get("message").and_then(|m| m.as_str()) {
            return message.to_string();
        }
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "no response body".to_string();
    }
    trimmed.chars().take(MAX_BODY_EXCERPT).collect()
}
