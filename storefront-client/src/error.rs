use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Request failed with status {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("Failed to decode response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Invalid header value: {0}")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),

    #[error("Credential storage error: {0}")]
    Storage(#[from] CredentialError),

    #[error("Request rejected: {0}")]
    Rejected(String),
}

impl ClientError {
    /// HTTP status of the failed answer, if the server answered at all.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::Status { status, .. } => Some(*status),
            ClientError::Transport(err) => err.status(),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(StatusCode::UNAUTHORIZED)
    }
}

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Why a token refresh produced no usable token.
///
/// Cloneable because one pending refresh is awaited by every request that
/// hit a 401 while it was in flight.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RefreshError {
    #[error("Refresh request failed: {0}")]
    Transport(String),

    #[error("Refresh endpoint answered with status {0}")]
    Rejected(u16),

    #[error("Refresh response carried no access token")]
    MissingToken,

    #[error("Refresh response could not be read: {0}")]
    Malformed(String),

    #[error("Refreshed token could not be stored: {0}")]
    Storage(String),
}
