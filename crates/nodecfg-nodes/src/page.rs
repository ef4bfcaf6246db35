//! Browse requests, result pages and read results

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::class::NodeClassMask;
use crate::node::NodeRef;
use crate::node_id::NodeId;
use crate::status::StatusCode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BrowseDirection {
    Forward,
    Inverse,
    Both,
}

/// Which references a browse follows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReferenceFilter {
    /// Hierarchical containment, subtypes included
    Hierarchical,
    All,
}

/// Which fields of each reference the remote should fill in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResultMask(pub u32);

impl ResultMask {
    pub const ALL: ResultMask = ResultMask(0x3F);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowseRequest {
    pub node_id: NodeId,
    pub direction: BrowseDirection,
    pub reference_filter: ReferenceFilter,
    pub node_class_mask: NodeClassMask,
    pub result_mask: ResultMask,
}

impl BrowseRequest {
    /// Forward hierarchical children of `node_id`, restricted to objects,
    /// variables and methods, with every result field
    pub fn children_of(node_id: NodeId) -> Self {
        Self {
            node_id,
            direction: BrowseDirection::Forward,
            reference_filter: ReferenceFilter::Hierarchical,
            node_class_mask: NodeClassMask::BROWSABLE,
            result_mask: ResultMask::ALL,
        }
    }
}

/// Opaque resume marker handed out by a paginated browse
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContinuationToken(Vec<u8>);

impl ContinuationToken {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// One fetch of a browse
#[derive(Debug, Clone)]
pub struct BrowsePage {
    pub status: StatusCode,
    pub references: Vec<NodeRef>,
    pub continuation: Option<ContinuationToken>,
}

impl BrowsePage {
    /// Final page: no continuation
    pub fn last(references: Vec<NodeRef>) -> Self {
        Self {
            status: StatusCode::GOOD,
            references,
            continuation: None,
        }
    }

    pub fn with_continuation(references: Vec<NodeRef>, token: ContinuationToken) -> Self {
        Self {
            status: StatusCode::GOOD,
            references,
            continuation: Some(token),
        }
    }

    pub fn failed(status: StatusCode) -> Self {
        Self {
            status,
            references: Vec::new(),
            continuation: None,
        }
    }

    /// True only for a present, non-empty token
    pub fn has_more(&self) -> bool {
        self.continuation.as_ref().is_some_and(|t| !t.is_empty())
    }
}

/// Current value of a variable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataValue {
    pub value: serde_json::Value,
    pub status: StatusCode,
    pub source_timestamp: Option<DateTime<Utc>>,
}

impl DataValue {
    pub fn good(value: serde_json::Value, source_timestamp: DateTime<Utc>) -> Self {
        Self {
            value,
            status: StatusCode::GOOD,
            source_timestamp: Some(source_timestamp),
        }
    }

    pub fn bad(status: StatusCode) -> Self {
        Self {
            value: serde_json::Value::Null,
            status,
            source_timestamp: None,
        }
    }

    /// Value rendered for display; `null` when absent
    pub fn display_value(&self) -> String {
        match &self.value {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}
