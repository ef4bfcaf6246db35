//! Browsed and selected nodes

use serde::{Deserialize, Serialize};

use crate::class::NodeClass;
use crate::error::NodeError;
use crate::node_id::NodeId;
use crate::Result;

/// One entry of a browse result
///
/// Two refs with the same `id` are the same node, whatever the other
/// fields say.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeRef {
    #[serde(rename = "nodeId")]
    pub id: String,
    pub display_name: String,
    pub browse_name: String,
    pub node_class: NodeClass,
    /// Only meaningful for variables
    #[serde(default)]
    pub data_type: String,
}

impl NodeRef {
    pub fn new(id: impl Into<String>, browse_name: impl Into<String>, node_class: NodeClass) -> Self {
        let browse_name = browse_name.into();
        Self {
            id: id.into(),
            display_name: browse_name.clone(),
            browse_name,
            node_class,
            data_type: String::new(),
        }
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = display_name.into();
        self
    }

    pub fn with_data_type(mut self, data_type: impl Into<String>) -> Self {
        self.data_type = data_type.into();
        self
    }

    /// Display name, falling back to the browse name when the server sent none
    pub fn label(&self) -> &str {
        if self.display_name.trim().is_empty() {
            &self.browse_name
        } else {
            &self.display_name
        }
    }
}

impl PartialEq for NodeRef {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for NodeRef {}

impl std::hash::Hash for NodeRef {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// A variable picked for export, with its export metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedNode {
    #[serde(rename = "nodeId", alias = "NodeId")]
    pub id: String,
    #[serde(rename = "browseName", alias = "BrowseName", default)]
    pub browse_name: String,
    #[serde(rename = "displayName", alias = "DisplayName", default)]
    pub display_name: String,
    #[serde(rename = "dataType", alias = "DataType", default)]
    pub data_type: String,
    #[serde(
        alias = "Alias",
        default,
        deserialize_with = "deserialize_alias",
        skip_serializing_if = "Option::is_none"
    )]
    pub alias: Option<String>,
    #[serde(rename = "namespaceIndex", alias = "NamespaceIndex", default)]
    pub namespace_index: u16,
}

impl SelectedNode {
    /// Build a selection entry from a browse result
    ///
    /// Fails unless the node is a variable with a parseable id.
    pub fn from_node(node: &NodeRef, alias: Option<String>) -> Result<Self> {
        if !node.node_class.is_selectable() {
            return Err(NodeError::NotSelectable {
                id: node.id.clone(),
                class: node.node_class,
            });
        }

        let node_id: NodeId = node.id.parse()?;

        Ok(Self {
            id: node.id.clone(),
            browse_name: node.browse_name.clone(),
            display_name: node.label().to_string(),
            data_type: node.data_type.clone(),
            alias: normalize_alias(alias),
            namespace_index: node_id.namespace_index(),
        })
    }

    /// Alias if set, display name otherwise
    pub fn export_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.display_name)
    }
}

pub(crate) fn normalize_alias(alias: Option<String>) -> Option<String> {
    alias
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn deserialize_alias<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(normalize_alias(raw))
}
