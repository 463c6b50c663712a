use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("backend unreachable: {0}")]
    Network(String),
    #[error("model compilation failed: {}", detail.as_deref().unwrap_or("no detail"))]
    Compile { detail: Option<String> },
    #[error("selection failed: {}", detail.as_deref().unwrap_or("no detail"))]
    Selection { detail: Option<String> },
    #[error("{what} not found")]
    NotFound {
        what: String,
        detail: Option<String>,
    },
    #[error("unexpected status {status} from {endpoint}")]
    UnexpectedStatus {
        endpoint: String,
        status: u16,
        detail: Option<String>,
    },
    #[error("invalid response from {endpoint}: {message}")]
    Decode { endpoint: String, message: String },
    #[error("invalid url {url}: {message}")]
    InvalidUrl { url: String, message: String },
}

impl ClientError {
    /// Backend-supplied detail, shown verbatim to the user when present.
    pub fn detail(&self) -> Option<&str> {
        match self {
            Self::Compile { detail }
            | Self::Selection { detail }
            | Self::NotFound { detail, .. }
            | Self::UnexpectedStatus { detail, .. } => detail.as_deref(),
            Self::Network(_) | Self::Decode { .. } | Self::InvalidUrl { .. } => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network(_))
    }

    /// Single message for the user: the backend detail when there is one,
    /// otherwise the caller's fallback.
    pub fn user_message(&self, fallback: &str) -> String {
        match self.detail() {
            Some(detail) => detail.to_string(),
            None if self.is_network() => {
                "Server unreachable; check the API address and retry.".to_string()
            }
            None => fallback.to_string(),
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        let endpoint = err
            .url()
            .map(|url| url.path().to_string())
            .unwrap_or_default();
        if err.is_decode() {
            Self::Decode {
                endpoint,
                message: err.to_string(),
            }
        } else if let Some(status) = err.status() {
            Self::UnexpectedStatus {
                endpoint,
                status: status.as_u16(),
                detail: None,
            }
        } else {
            Self::Network(err.to_string())
        }
    }
}
