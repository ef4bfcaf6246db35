//! Single value reads

use std::time::Duration;

use nodecfg_nodes::{DataValue, NodeId};

use crate::client::RemoteNamespaceClient;
use crate::error::BrowseError;
use crate::Result;

/// Read the current value of one variable
///
/// A value that comes back with a non-good status is an error, never a
/// default.
pub async fn read_value(
    client: &dyn RemoteNamespaceClient,
    node_id: &str,
    timeout: Duration,
) -> Result<DataValue> {
    if !client.is_connected() {
        return Err(BrowseError::NotConnected);
    }

    let id: NodeId = node_id.parse()?;

    let value = tokio::time::timeout(timeout, client.read_value(&id))
        .await
        .map_err(|_| BrowseError::Timeout(timeout))??;

    if !value.status.is_good() {
        tracing::debug!(node_id = %id, status = %value.status, "Read returned bad status");
        return Err(BrowseError::remote(
            value.status,
            format!("read of {} failed", id),
        ));
    }

    Ok(value)
}
