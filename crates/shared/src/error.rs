use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error payload returned by the site API on non-2xx responses.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ApiErrorBody {
    pub fn human_message(&self) -> Option<&str> {
        self.message
            .as_deref()
            .or(self.error.as_deref())
            .map(str::trim)
            .filter(|m| !m.is_empty())
    }
}

const MAX_PLAIN_MESSAGE_LEN: usize = 200;

/// Extracts the server-supplied human message from a raw response body.
///
/// A JSON body contributes its `message` (else `error`) field. A non-JSON body
/// contributes its trimmed text unless it looks like markup or is too long
/// to show inline. Anything else yields `None`.
pub fn server_message(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }

    match serde_json::from_str::<serde_json::Value>(trimmed) {
        Ok(serde_json::Value::Object(_)) => serde_json::from_str::<ApiErrorBody>(trimmed)
            .ok()
            .and_then(|parsed| parsed.human_message().map(str::to_string)),
        Ok(serde_json::Value::String(text)) => {
            let text = text.trim();
            (!text.is_empty()).then(|| text.to_string())
        }
        Ok(_) => None,
        Err(_) if trimmed.starts_with('<') || trimmed.len() > MAX_PLAIN_MESSAGE_LEN => None,
        Err(_) => Some(trimmed.to_string()),
    }
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("response body is empty")]
    EmptyBody,
    #[error("response body is not valid JSON for this resource: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefers_message_over_error_field() {
        assert_eq!(
            server_message(r#"{"message":"db down","error":"internal"}"#).as_deref(),
            Some("db down")
        );
        assert_eq!(
            server_message(r#"{"error":"internal"}"#).as_deref(),
            Some("internal")
        );
    }

    #[test]
    fn ignores_blank_and_structural_bodies() {
        assert_eq!(server_message(""), None);
        assert_eq!(server_message(r#"{"message":"   "}"#), None);
        assert_eq!(server_message("[1,2]"), None);
        assert_eq!(server_message("<html><body>502</body></html>"), None);
    }

    #[test]
    fn keeps_short_plain_text() {
        assert_eq!(server_message(" Bad Gateway \n").as_deref(), Some("Bad Gateway"));
    }
}
