//! Browse error types

use std::time::Duration;

use nodecfg_nodes::{NodeError, StatusCode};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BrowseError {
    #[error("Not connected")]
    NotConnected,

    #[error("Remote failure ({status}): {message}")]
    RemoteFailure { status: StatusCode, message: String },

    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    #[error("Invalid node id: {0}")]
    InvalidNodeId(String),
}

impl BrowseError {
    pub fn remote(status: StatusCode, message: impl Into<String>) -> Self {
        BrowseError::RemoteFailure {
            status,
            message: message.into(),
        }
    }

    /// Errors that invalidate the whole session rather than one subtree
    pub fn is_connection_error(&self) -> bool {
        matches!(self, BrowseError::NotConnected)
    }
}

impl From<NodeError> for BrowseError {
    fn from(err: NodeError) -> Self {
        match err {
            NodeError::InvalidNodeId(id) => BrowseError::InvalidNodeId(id),
            other => BrowseError::remote(StatusCode::BAD_UNEXPECTED, other.to_string()),
        }
    }
}
