use http::StatusCode;
use serde_json::Value;
use thiserror::Error;

/// Unified error type for the proxyfetch client
#[derive(Error, Debug)]
pub enum ClientError {
    // Startup errors
    #[error("Failed to read proxy source {path}: {reason}")]
    ProxySourceUnreadable { path: String, reason: String },

    #[error("No valid proxies found in {0}")]
    NoValidProxies(String),

    #[error("Invalid proxy address: {0}")]
    InvalidProxyAddress(String),

    #[error("Failed to build transport: {0}")]
    TransportBuild(String),

    // Request errors
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Request failed: {0}")]
    Request(String),

    #[error("Request returned status {status}")]
    Status {
        status: StatusCode,
        body: Option<Value>,
    },

    #[error("Failed to get nonce: {0}")]
    Nonce(String),

    // Configuration errors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // Collaborators
    #[error("Captcha recognition failed: {0}")]
    Captcha(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for proxyfetch operations
pub type Result<T> = std::result::Result<T, ClientError>;

impl ClientError {
    /// HTTP status carried by the error, if the server answered at all
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Check if the server rejected the request with 429
    pub fn is_rate_limited(&self) -> bool {
        self.status() == Some(StatusCode::TOO_MANY_REQUESTS)
    }

    /// Check if this error can only happen while starting up and should end the process
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ClientError::ProxySourceUnreadable { .. }
                | ClientError::NoValidProxies(_)
                | ClientError::InvalidConfig(_)
        )
    }
}
