//! Selection commands
use nodecfg_core::{NodeClass, NodeRef, SelectedNode};
use serde::{Deserialize, Serialize};

use super::CommandResult;
use crate::state::AppState;

/// A node as the front end knows it from a previous `get_nodes`
#[derive(Debug, Clone, Deserialize)]
pub struct SelectNodeArgs {
    pub node_id: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub browse_name: String,
    pub node_class: NodeClass,
    #[serde(default)]
    pub data_type: String,
    #[serde(default)]
    pub alias: Option<String>,
}

impl SelectNodeArgs {
    fn into_parts(self) -> (NodeRef, Option<String>) {
        let node = NodeRef::new(self.node_id, self.browse_name, self.node_class)
            .with_display_name(self.display_name)
            .with_data_type(self.data_type);
        (node, self.alias)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SelectionInfo {
    /// Whether the call changed the selection
    pub changed: bool,
    pub count: usize,
}

pub fn select_node(state: &AppState, caller: &str, args: SelectNodeArgs) -> CommandResult<SelectionInfo> {
    let session_id = state.session_id_for(caller);
    let configurator = state.configurator();
    let (node, alias) = args.into_parts();

    configurator
        .select_node(&session_id, &node, alias)
        .map(|changed| SelectionInfo {
            changed,
            count: configurator.sessions().selected_count(&session_id),
        })
        .into()
}

pub fn unselect_node(state: &AppState, caller: &str, node_id: &str) -> CommandResult<SelectionInfo> {
    let session_id = state.session_id_for(caller);
    let configurator = state.configurator();

    CommandResult::ok(SelectionInfo {
        changed: configurator.unselect_node(&session_id, node_id),
        count: configurator.sessions().selected_count(&session_id),
    })
}

pub fn get_selected(state: &AppState, caller: &str) -> CommandResult<Vec<SelectedNode>> {
    let session_id = state.session_id_for(caller);
    CommandResult::ok(state.configurator().selected_nodes(&session_id))
}

pub fn clear_selection(state: &AppState, caller: &str) -> CommandResult<SelectionInfo> {
    let session_id = state.session_id_for(caller);
    let cleared = state.configurator().clear_selection(&session_id);

    CommandResult::ok(SelectionInfo {
        changed: cleared > 0,
        count: 0,
    })
}
