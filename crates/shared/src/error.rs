use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error body returned by the tutorial backend: `{"detail": ...}`.
///
/// `detail` is usually a string, but request validation failures carry a list
/// of `{loc, msg, type}` objects instead.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub detail: serde_json::Value,
}

impl ErrorBody {
    pub fn parse(raw: &str) -> Option<Self> {
        serde_json::from_str(raw).ok()
    }

    /// User-facing text of the detail, if there is any.
    pub fn message(&self) -> Option<String> {
        match &self.detail {
            serde_json::Value::String(text) if !text.trim().is_empty() => {
                Some(text.trim().to_string())
            }
            serde_json::Value::Array(entries) => {
                let messages = entries
                    .iter()
                    .filter_map(|entry| entry.get("msg").and_then(|msg| msg.as_str()))
                    .collect::<Vec<_>>();
                if messages.is_empty() {
                    None
                } else {
                    Some(messages.join("; "))
                }
            }
            _ => None,
        }
    }
}

/// Extracts the backend detail message from a raw response body.
pub fn detail_from_body(raw: &str) -> Option<String> {
    ErrorBody::parse(raw).and_then(|body| body.message())
}

#[derive(Debug, Error)]
#[error("backend rejected request with status {status}: {}", detail.as_deref().unwrap_or("no detail"))]
pub struct BackendRejection {
    pub status: u16,
    pub detail: Option<String>,
}

impl BackendRejection {
    pub fn from_body(status: u16, raw: &str) -> Self {
        Self {
            status,
            detail: detail_from_body(raw),
        }
    }
}
