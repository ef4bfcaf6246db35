//! Remote namespace capability
//!
//! Transport, security handshake and wire encoding all live behind this
//! trait. The browse engine only ever asks for one page at a time.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::watch;

use nodecfg_nodes::{
    BrowsePage, BrowseRequest, ContinuationToken, DataValue, NodeId, ServerConnectionConfig,
};

use crate::status::ConnectionStatus;
use crate::Result;

#[async_trait]
pub trait RemoteNamespaceClient: Send + Sync {
    /// Open a session; `Ok(false)` when the server turned us away
    async fn connect(&self, config: &ServerConnectionConfig) -> Result<bool>;

    async fn disconnect(&self) -> Result<()>;

    /// Fetch one page of `request`, or the page after `continuation`
    async fn browse_page(
        &self,
        request: &BrowseRequest,
        continuation: Option<&ContinuationToken>,
    ) -> Result<BrowsePage>;

    /// Tell the remote a continuation token will not be followed
    async fn release_continuation(&self, _token: &ContinuationToken) -> Result<()> {
        Ok(())
    }

    async fn read_value(&self, node_id: &NodeId) -> Result<DataValue>;

    fn is_connected(&self) -> bool;

    fn status(&self) -> watch::Receiver<ConnectionStatus>;
}

/// Builds one unconnected client per session
pub trait ClientFactory: Send + Sync {
    fn create(&self, config: &ServerConnectionConfig) -> Arc<dyn RemoteNamespaceClient>;
}
