//! Node model error types

use thiserror::Error;

use crate::class::NodeClass;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NodeError {
    #[error("Invalid node id: {0}")]
    InvalidNodeId(String),

    #[error("Node {id} is a {class} and cannot be selected")]
    NotSelectable { id: String, class: NodeClass },

    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),
}
