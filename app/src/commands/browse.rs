//! Browse commands
use nodecfg_core::{DataValue, NodeClass, NodeRef};
use serde::{Deserialize, Serialize};

use super::CommandResult;
use crate::state::AppState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeInfo {
    pub node_id: String,
    pub display_name: String,
    pub browse_name: String,
    pub node_class: NodeClass,
    pub data_type: String,
    pub has_children: bool,
    pub can_be_selected: bool,
    pub is_selected: bool,
}

impl NodeInfo {
    fn from_node(node: NodeRef, is_selected: bool) -> Self {
        Self {
            display_name: node.label().to_string(),
            has_children: node.node_class.has_children(),
            can_be_selected: node.node_class.is_selectable(),
            node_id: node.id,
            browse_name: node.browse_name,
            node_class: node.node_class,
            data_type: node.data_type,
            is_selected,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ValueInfo {
    pub node_id: String,
    pub value: String,
    pub status_code: String,
    pub timestamp: Option<String>,
}

impl ValueInfo {
    fn from_value(node_id: &str, value: DataValue) -> Self {
        Self {
            node_id: node_id.to_string(),
            value: value.display_value(),
            status_code: value.status.to_string(),
            timestamp: value
                .source_timestamp
                .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string()),
        }
    }
}

/// Children of `node_id`; an empty id lists the root folder
pub async fn get_nodes(state: &AppState, caller: &str, node_id: &str) -> CommandResult<Vec<NodeInfo>> {
    let session_id = state.session_id_for(caller);
    let configurator = state.configurator();

    configurator
        .browse(&session_id, node_id)
        .await
        .map(|nodes| {
            nodes
                .into_iter()
                .map(|node| {
                    let is_selected = configurator.sessions().is_selected(&session_id, &node.id);
                    NodeInfo::from_node(node, is_selected)
                })
                .collect()
        })
        .into()
}

pub async fn read_value(state: &AppState, caller: &str, node_id: &str) -> CommandResult<ValueInfo> {
    let session_id = state.session_id_for(caller);

    state
        .configurator()
        .read_value(&session_id, node_id)
        .await
        .map(|value| ValueInfo::from_value(node_id, value))
        .into()
}
