use reqwest::StatusCode;
use thiserror::Error;

/// Shown for any failure the server did not explain.
pub const GENERIC_FAILURE: &str = "An error has occurred. Please try again later.";

pub type ClientResult<T> = Result<T, ClientError>;

/// Every way a call against the messaging service can fail.
///
/// The first two variants are session failures and are never shown inline;
/// the session guard turns them into a redirect to the login view.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("no session token present")]
    Unauthenticated,

    #[error("session rejected by server")]
    Unauthorized,

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Conflict(String),

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected status {status}")]
    Status {
        status: StatusCode,
        message: Option<String>,
    },

    #[error("could not decode response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("credential storage failed: {0}")]
    Storage(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl ClientError {
    /// True for failures that mean the client is no longer logged in.
    pub fn ends_session(&self) -> bool {
        matches!(self, ClientError::Unauthenticated | ClientError::Unauthorized)
    }

    /// Network, unexpected status and undecodable payloads.
    pub fn is_transport_failure(&self) -> bool {
        matches!(
            self,
            ClientError::Transport(_) | ClientError::Status { .. } | ClientError::Decode(_)
        )
    }

    /// Text for the status line. Server messages are passed through verbatim.
    pub fn user_message(&self) -> String {
        match self {
            ClientError::NotFound(msg) | ClientError::BadRequest(msg) | ClientError::Conflict(msg) => {
                msg.clone()
            }
            _ => GENERIC_FAILURE.to_string(),
        }
    }
}
