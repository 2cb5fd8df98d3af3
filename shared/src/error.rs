use serde_json::{Error as JsonError, Value};
use thiserror::Error;
use validator::ValidationErrors;

/// Longest raw error body echoed back to the user.
const MAX_TEXT_BODY_CHARS: usize = 200;

/// Body of a failed HTTP response, parsed as far as it allows.
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorBody {
    Json(Value),
    Text(String),
    Empty,
}

impl ErrorBody {
    /// Classifies a raw response body: JSON when it parses, text otherwise.
    pub fn from_text(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return ErrorBody::Empty;
        }
        match serde_json::from_str::<Value>(trimmed) {
            Ok(value) => ErrorBody::Json(value),
            Err(_) => ErrorBody::Text(trimmed.to_string()),
        }
    }

    /// Message suitable for display, if the body carries one.
    pub fn message(&self) -> Option<String> {
        match self {
            ErrorBody::Json(value) => json_message(value),
            ErrorBody::Text(text) => Some(truncate(text, MAX_TEXT_BODY_CHARS)),
            ErrorBody::Empty => None,
        }
    }
}

fn json_message(value: &Value) -> Option<String> {
    for key in ["message", "error", "detail"] {
        match value.get(key) {
            Some(Value::String(s)) if !s.trim().is_empty() => return Some(s.trim().to_string()),
            // {"error": {"message": "..."}}
            Some(nested @ Value::Object(_)) => {
                if let Some(message) = json_message(nested) {
                    return Some(message);
                }
            }
            _ => {}
        }
    }
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        _ => None,
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(max_chars).collect();
    cut.push('…');
    cut
}

fn http_message(status: &u16, body: &ErrorBody) -> String {
    body.message()
        .unwrap_or_else(|| format!("Request failed with HTTP {}", status))
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Authentication required: {0}")]
    Auth(String),

    #[error("{}", http_message(.status, .body))]
    Http { status: u16, body: ErrorBody },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unexpected response: {0}")]
    Decode(String),

    #[error("Request rejected: {0}")]
    Rejected(String),
}

impl ClientError {
    pub fn http(status: u16, raw_body: &str) -> Self {
        ClientError::Http {
            status,
            body: ErrorBody::from_text(raw_body),
        }
    }

    /// Text shown in the dismissible error banner.
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Auth(_) => "Your session has expired. Please log in again.".to_string(),
            ClientError::Http { status, body } => http_message(status, body),
            ClientError::Network(_) => "Failed to load data. Please try again.".to_string(),
            ClientError::Validation(message) => message.clone(),
            ClientError::Decode(_) => {
                "Received an unexpected response from the server.".to_string()
            }
            ClientError::Rejected(message) => message.clone(),
        }
    }

    /// Auth failures send the user back to the login screen instead of a banner.
    pub fn is_auth(&self) -> bool {
        matches!(self, ClientError::Auth(_))
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<ValidationErrors> for ClientError {
    fn from(errors: ValidationErrors) -> Self {
        Self::Validation(errors.to_string())
    }
}

impl From<JsonError> for ClientError {
    fn from(error: JsonError) -> Self {
        Self::Decode(error.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
