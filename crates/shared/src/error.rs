use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error body returned by the course backend. Depending on the route the text
/// arrives as `error` or as `message`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiError {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ApiError {
    pub fn describe(&self) -> Option<&str> {
        self.error
            .as_deref()
            .or(self.message.as_deref())
            .filter(|text| !text.trim().is_empty())
    }
}

#[derive(Debug, Error)]
#[error("backend returned {status}: {message}")]
pub struct ApiException {
    pub status: u16,
    pub message: String,
}

impl ApiException {
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// Builds the exception from a raw response body, preferring the decoded
    /// error text when the body is a JSON error envelope.
    pub fn from_body(status: u16, body: &str) -> Self {
        let decoded = serde_json::from_str::<ApiError>(body)
            .ok()
            .and_then(|err| err.describe().map(str::to_string));
        let message = decoded.unwrap_or_else(|| {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                "empty response body".to_string()
            } else {
                trimmed.to_string()
            }
        });
        Self::new(status, message)
    }
}
