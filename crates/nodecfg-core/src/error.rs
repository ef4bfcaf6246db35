//! Core error types

use thiserror::Error;

use nodecfg_browse::BrowseError;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Browse error: {0}")]
    Browse(#[from] BrowseError),

    #[error("Node error: {0}")]
    Node(#[from] nodecfg_nodes::NodeError),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl CoreError {
    /// Problems that invalidate the whole session, as opposed to one subtree
    pub fn is_connection_error(&self) -> bool {
        match self {
            CoreError::ConnectionFailed(_) => true,
            CoreError::Browse(err) => err.is_connection_error(),
            _ => false,
        }
    }
}
