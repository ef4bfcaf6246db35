//! Connection commands
use nodecfg_core::{ConnectionStatus, ServerConnectionConfig};
use serde::{Deserialize, Serialize};

use super::CommandResult;
use crate::state::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct ConnectionInfo {
    pub connected: bool,
    pub status: ConnectionStatus,
    /// Endpoint of the active connection
    pub endpoint: Option<String>,
    pub default_endpoint: String,
    pub recent_endpoints: Vec<String>,
}

fn connection_info_for(state: &AppState, session_id: &str) -> ConnectionInfo {
    let configurator = state.configurator();
    let config = configurator.config();

    ConnectionInfo {
        connected: configurator.is_connected(session_id),
        status: configurator.connection_status(session_id),
        endpoint: configurator.server_config(session_id).map(|s| s.url),
        default_endpoint: config.default_endpoint,
        recent_endpoints: config.recent_endpoints,
    }
}

pub async fn connect(
    state: &AppState,
    caller: &str,
    server: ServerConnectionConfig,
) -> CommandResult<ConnectionInfo> {
    let session_id = state.session_id_for(caller);

    state
        .configurator()
        .connect(&session_id, server)
        .await
        .map(|()| connection_info_for(state, &session_id))
        .into()
}

pub async fn disconnect(state: &AppState, caller: &str) -> CommandResult<ConnectionInfo> {
    let session_id = state.session_id_for(caller);
    state.configurator().disconnect(&session_id).await;
    CommandResult::ok(connection_info_for(state, &session_id))
}

pub fn connection_info(state: &AppState, caller: &str) -> CommandResult<ConnectionInfo> {
    let session_id = state.session_id_for(caller);
    CommandResult::ok(connection_info_for(state, &session_id))
}
