//! Node identifiers
//!
//! Text form: `[ns=<index>;]<kind>=<value>` where kind is one of
//! `i` (numeric), `s` (string), `g` (GUID) or `b` (opaque). A missing
//! `ns=` prefix means namespace 0.

use serde::{Deserialize, Serialize};

use crate::error::NodeError;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Identifier {
    Numeric(u32),
    String(String),
    Guid(String),
    Opaque(String),
}

impl std::fmt::Display for Identifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Identifier::Numeric(value) => write!(f, "i={}", value),
            Identifier::String(value) => write!(f, "s={}", value),
            Identifier::Guid(value) => write!(f, "g={}", value),
            Identifier::Opaque(value) => write!(f, "b={}", value),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NodeId {
    namespace: u16,
    identifier: Identifier,
}

impl NodeId {
    pub fn new(namespace: u16, identifier: Identifier) -> Self {
        Self {
            namespace,
            identifier,
        }
    }

    pub fn numeric(namespace: u16, value: u32) -> Self {
        Self::new(namespace, Identifier::Numeric(value))
    }

    pub fn string(namespace: u16, value: impl Into<String>) -> Self {
        Self::new(namespace, Identifier::String(value.into()))
    }

    /// The well-known root container browsed when no start node is given
    pub fn objects_folder() -> Self {
        Self::numeric(0, 85)
    }

    /// Parse a browse target, treating an empty string as the root container
    pub fn parse_or_root(s: &str) -> Result<Self, NodeError> {
        if s.trim().is_empty() {
            Ok(Self::objects_folder())
        } else {
            s.parse()
        }
    }

    pub fn namespace_index(&self) -> u16 {
        self.namespace
    }

    pub fn identifier(&self) -> &Identifier {
        &self.identifier
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.namespace == 0 {
            write!(f, "{}", self.identifier)
        } else {
            write!(f, "ns={};{}", self.namespace, self.identifier)
        }
    }
}

impl std::str::FromStr for NodeId {
    type Err = NodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || NodeError::InvalidNodeId(s.to_string());
        let text = s.trim();

        let (namespace, rest) = match text.strip_prefix("ns=") {
            Some(stripped) => {
                let (index, rest) = stripped.split_once(';').ok_or_else(invalid)?;
                (index.trim().parse::<u16>().map_err(|_| invalid())?, rest)
            }
            None => (0, text),
        };

        let (kind, value) = rest.split_once('=').ok_or_else(invalid)?;
        if value.is_empty() {
            return Err(invalid());
        }

        let identifier = match kind {
            "i" => Identifier::Numeric(value.parse::<u32>().map_err(|_| invalid())?),
            "s" => Identifier::String(value.to_string()),
            "g" => {
                let guid = uuid::Uuid::parse_str(value).map_err(|_| invalid())?;
                Identifier::Guid(guid.hyphenated().to_string())
            }
            "b" => Identifier::Opaque(value.to_string()),
            _ => return Err(invalid()),
        };

        Ok(Self {
            namespace,
            identifier,
        })
    }
}

impl TryFrom<String> for NodeId {
    type Error = NodeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<NodeId> for String {
    fn from(id: NodeId) -> Self {
        id.to_string()
    }
}
