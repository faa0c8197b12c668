use shared::error::server_message;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request to {url} could not be sent: {reason}")]
    Send { url: String, reason: String },
    #[error("request to {url} timed out")]
    Timeout { url: String },
    #[error("failed to read response body from {url}: {reason}")]
    Body { url: String, reason: String },
}

/// Failure taxonomy surfaced to components. An empty collection is not an
/// error and never appears here.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ViewError {
    #[error("network failure: {0}")]
    NetworkFailure(String),
    #[error("server rejected request with status {status}")]
    ServerRejection {
        status: u16,
        message: Option<String>,
    },
    #[error("action requires an active session")]
    Unauthenticated,
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

impl ViewError {
    pub fn rejection(status: u16, body: &str) -> Self {
        Self::ServerRejection {
            status,
            message: server_message(body),
        }
    }

    /// Message shown inline or in a notification: the server's own message
    /// when it sent one, otherwise `fallback`.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            ViewError::ServerRejection {
                message: Some(message),
                ..
            } => message.clone(),
            ViewError::Unauthenticated => "Please log in to continue.".to_string(),
            _ => fallback.to_string(),
        }
    }

    pub fn requires_login(&self) -> bool {
        matches!(self, ViewError::Unauthenticated)
    }
}

impl From<TransportError> for ViewError {
    fn from(value: TransportError) -> Self {
        ViewError::NetworkFailure(value.to_string())
    }
}
