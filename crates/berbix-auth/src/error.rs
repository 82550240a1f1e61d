//! Error types for Berbix client operations

use transport::TransportError;

/// Errors from token exchange and authenticated requests.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Missing secret or invalid environment at client construction
    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Transport(#[from] TransportError),

    /// 2xx token response missing required fields
    #[error("token exchange failed: {0}")]
    TokenExchange(String),

    /// Operation expected a JSON body but the server sent none
    #[error("empty response from {0}")]
    EmptyResponse(&'static str),

    /// Response body present but missing a field the operation returns
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    /// Payload or header could not be built from caller input
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl Error {
    /// HTTP status of the failed request, when there was one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Transport(e) => e.status(),
            _ => None,
        }
    }
}

/// Result alias for client operations.
pub type Result<T> = std::result::Result<T, Error>;
