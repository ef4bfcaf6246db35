//! Node classes
//!
//! The remote namespace tags every node with exactly one class. Only
//! `Variable` nodes hold values and can be selected for export; the
//! browse UI treats everything else as a container that may be expanded.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeClass {
    Object,
    Variable,
    Method,
    ObjectType,
    VariableType,
    ReferenceType,
    DataType,
    View,
}

impl NodeClass {
    pub const ALL: [NodeClass; 8] = [
        NodeClass::Object,
        NodeClass::Variable,
        NodeClass::Method,
        NodeClass::ObjectType,
        NodeClass::VariableType,
        NodeClass::ReferenceType,
        NodeClass::DataType,
        NodeClass::View,
    ];

    /// Bit value used in browse filters
    pub fn bit(&self) -> u32 {
        match self {
            NodeClass::Object => 1,
            NodeClass::Variable => 2,
            NodeClass::Method => 4,
            NodeClass::ObjectType => 8,
            NodeClass::VariableType => 16,
            NodeClass::ReferenceType => 32,
            NodeClass::DataType => 64,
            NodeClass::View => 128,
        }
    }

    /// Only variables may enter a selection
    pub fn is_selectable(&self) -> bool {
        matches!(self, NodeClass::Variable)
    }

    /// Whether the browse UI should offer to expand this node
    pub fn has_children(&self) -> bool {
        !self.is_selectable()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NodeClass::Object => "Object",
            NodeClass::Variable => "Variable",
            NodeClass::Method => "Method",
            NodeClass::ObjectType => "ObjectType",
            NodeClass::VariableType => "VariableType",
            NodeClass::ReferenceType => "ReferenceType",
            NodeClass::DataType => "DataType",
            NodeClass::View => "View",
        }
    }
}

impl std::fmt::Display for NodeClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for NodeClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NodeClass::ALL
            .iter()
            .find(|class| class.as_str().eq_ignore_ascii_case(s.trim()))
            .copied()
            .ok_or_else(|| format!("Unknown node class: {}", s))
    }
}

/// Set of node classes a browse should return
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeClassMask(u32);

impl NodeClassMask {
    pub const NONE: NodeClassMask = NodeClassMask(0);
    pub const ALL: NodeClassMask = NodeClassMask(0xFF);
    /// Objects, variables and methods: what a hierarchy browse shows
    pub const BROWSABLE: NodeClassMask = NodeClassMask(1 | 2 | 4);

    pub fn bits(&self) -> u32 {
        self.0
    }

    pub fn with(self, class: NodeClass) -> Self {
        NodeClassMask(self.0 | class.bit())
    }

    pub fn contains(&self, class: NodeClass) -> bool {
        self.0 & class.bit() != 0
    }
}

impl FromIterator<NodeClass> for NodeClassMask {
    fn from_iter<I: IntoIterator<Item = NodeClass>>(iter: I) -> Self {
        iter.into_iter().fold(NodeClassMask::NONE, NodeClassMask::with)
    }
}
