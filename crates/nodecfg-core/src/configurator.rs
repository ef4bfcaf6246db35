//! Configurator
//!
//! The single entry point the request layer talks to. It owns the remote
//! client of every session, the session coordinator and the configuration.
//! Local state only changes once a remote call's outcome is known.
//! Connect and disconnect on one session run one at a time.

use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{watch, Mutex as AsyncMutex};

use nodecfg_browse::{
    browse_children, BrowseError, ClientFactory, ConnectionStatus, RemoteNamespaceClient,
};
use nodecfg_nodes::{DataValue, NodeClass, NodeRef, SelectedNode, ServerConnectionConfig, StatusCode};
use nodecfg_session::{ImportSummary, SessionCoordinator};

use crate::config::Config;
use crate::error::CoreError;
use crate::snapshot::{ConfigurationSnapshot, ExportFormat};
use crate::Result;

#[derive(Clone)]
struct ActiveConnection {
    client: Arc<dyn RemoteNamespaceClient>,
    server: ServerConnectionConfig,
}

pub struct Configurator {
    config: Arc<RwLock<Config>>,
    sessions: SessionCoordinator,
    factory: Arc<dyn ClientFactory>,
    connections: Arc<RwLock<HashMap<String, ActiveConnection>>>,
    connect_locks: Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>,
}

impl Configurator {
    pub fn new(config: Config, factory: Arc<dyn ClientFactory>) -> Self {
        Self {
            config: Arc::new(RwLock::new(config)),
            sessions: SessionCoordinator::new(),
            factory,
            connections: Arc::new(RwLock::new(HashMap::new())),
            connect_locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn config(&self) -> Config {
        self.config.read().clone()
    }

    pub fn sessions(&self) -> &SessionCoordinator {
        &self.sessions
    }

    fn connection(&self, session_id: &str) -> Option<ActiveConnection> {
        self.connections.read().get(session_id).cloned()
    }

    fn connected_client(&self, session_id: &str) -> Result<Arc<dyn RemoteNamespaceClient>> {
        if !self.sessions.is_connected(session_id) {
            return Err(BrowseError::NotConnected.into());
        }
        self.connection(session_id)
            .map(|c| c.client)
            .ok_or_else(|| BrowseError::NotConnected.into())
    }

    fn connect_lock(&self, session_id: &str) -> Arc<AsyncMutex<()>> {
        Arc::clone(
            self.connect_locks
                .lock()
                .entry(session_id.to_string())
                .or_default(),
        )
    }

    // === Connection operations ===

    /// Open a remote session for `session_id`, replacing any existing one
    ///
    /// The existing connection stays in place until the new one is up; a
    /// failed reconnect leaves it untouched.
    pub async fn connect(&self, session_id: &str, server: ServerConnectionConfig) -> Result<()> {
        server.validate()?;

        let lock = self.connect_lock(session_id);
        let _guard = lock.lock().await;

        tracing::info!(
            session_id = %session_id,
            url = %server.url,
            security_mode = server.security_mode.as_str(),
            "Connecting"
        );

        let client = self.factory.create(&server);
        let timeout = server.timeout();

        let outcome = match tokio::time::timeout(timeout, client.connect(&server)).await {
            Ok(Ok(true)) => Ok(()),
            Ok(Ok(false)) => Err(format!("{} refused the connection", server.url)),
            Ok(Err(e)) => Err(e.to_string()),
            Err(_) => {
                if let Err(e) = client.disconnect().await {
                    tracing::debug!(error = %e, "Failed to close abandoned client");
                }
                Err(format!("{} did not answer within {:?}", server.url, timeout))
            }
        };

        if let Err(reason) = outcome {
            tracing::warn!(session_id = %session_id, reason = %reason, "Connection failed");
            return Err(CoreError::ConnectionFailed(reason));
        }

        self.config.write().remember_endpoint(&server.url);
        let previous = self.connections.write().insert(
            session_id.to_string(),
            ActiveConnection {
                client,
                server,
            },
        );
        self.sessions.register_connection(session_id);

        if let Some(previous) = previous {
            tracing::info!(
                session_id = %session_id,
                url = %previous.server.url,
                "Replaced connection"
            );
            if let Err(e) = previous.client.disconnect().await {
                tracing::warn!(session_id = %session_id, error = %e, "Remote disconnect failed");
            }
        }

        Ok(())
    }

    /// Close the session's remote connection; the selection is kept
    ///
    /// Returns whether there was a connection to close.
    pub async fn disconnect(&self, session_id: &str) -> bool {
        let lock = self.connect_lock(session_id);
        let _guard = lock.lock().await;

        let removed = self.connections.write().remove(session_id);
        self.sessions.unregister_connection(session_id);

        match removed {
            Some(connection) => {
                if let Err(e) = connection.client.disconnect().await {
                    tracing::warn!(session_id = %session_id, error = %e, "Remote disconnect failed");
                }
                true
            }
            None => false,
        }
    }

    pub fn is_connected(&self, session_id: &str) -> bool {
        self.sessions.is_connected(session_id)
    }

    pub fn connection_status(&self, session_id: &str) -> ConnectionStatus {
        self.connection(session_id)
            .map(|c| c.client.status().borrow().clone())
            .unwrap_or(ConnectionStatus::Disconnected)
    }

    /// Receiver for the session's connection status, if it has a client
    pub fn watch_status(&self, session_id: &str) -> Option<watch::Receiver<ConnectionStatus>> {
        self.connection(session_id).map(|c| c.client.status())
    }

    /// Connection settings of the active connection, password removed
    pub fn server_config(&self, session_id: &str) -> Option<ServerConnectionConfig> {
        self.connection(session_id).map(|c| c.server.without_secrets())
    }

    // === Browse operations ===

    /// Browse the children of `node_id`
    ///
    /// The traversal runs on its own task, so a caller that stops waiting
    /// does not cut it short; it still ends or times out and releases its
    /// continuation token.
    pub async fn browse(&self, session_id: &str, node_id: &str) -> Result<Vec<NodeRef>> {
        let client = self.connected_client(session_id)?;
        let options = self.config.read().browse_options();

        let target = node_id.to_string();
        let task = tokio::spawn(async move { browse_children(client.as_ref(), &target, options).await });
        let nodes = task.await.map_err(|e| {
            BrowseError::remote(StatusCode::BAD_UNEXPECTED, format!("browse task failed: {}", e))
        })??;

        tracing::debug!(
            session_id = %session_id,
            node_id = %node_id,
            count = nodes.len(),
            "Browsed node"
        );

        Ok(nodes)
    }

    pub async fn read_value(&self, session_id: &str, node_id: &str) -> Result<DataValue> {
        let client = self.connected_client(session_id)?;
        let timeout = self.config.read().read_timeout();

        Ok(nodecfg_browse::read_value(client.as_ref(), node_id, timeout).await?)
    }

    // === Selection operations ===

    /// Select a variable; `Ok(false)` if its id was already selected
    pub fn select_node(&self, session_id: &str, node: &NodeRef, alias: Option<String>) -> Result<bool> {
        let selected = SelectedNode::from_node(node, alias)?;
        Ok(self.sessions.add_selected(session_id, selected))
    }

    /// Select every variable in `nodes`, skipping other node classes
    pub fn select_nodes(&self, session_id: &str, nodes: &[NodeRef]) -> usize {
        let selectable = nodes.iter().filter_map(|node| match SelectedNode::from_node(node, None) {
            Ok(selected) => Some(selected),
            Err(e) => {
                if node.node_class == NodeClass::Variable {
                    tracing::debug!(
                        session_id = %session_id,
                        node_id = %node.id,
                        error = %e,
                        "Skipping unselectable variable"
                    );
                }
                None
            }
        });
        self.sessions.add_selected_many(session_id, selectable)
    }

    pub fn unselect_node(&self, session_id: &str, node_id: &str) -> bool {
        self.sessions.remove_selected(session_id, node_id)
    }

    pub fn selected_nodes(&self, session_id: &str) -> Vec<SelectedNode> {
        self.sessions.list_selected(session_id)
    }

    pub fn clear_selection(&self, session_id: &str) -> usize {
        self.sessions.clear_selected(session_id)
    }

    // === Export / import ===

    pub fn export_snapshot(&self, session_id: &str, name: &str) -> ConfigurationSnapshot {
        let snapshot = ConfigurationSnapshot::new(name, self.sessions.list_selected(session_id));
        match self.connection(session_id) {
            Some(connection) => snapshot.with_server_config(&connection.server),
            None => snapshot,
        }
    }

    pub fn render(&self, session_id: &str, format: ExportFormat) -> Result<String> {
        self.export_snapshot(session_id, "").render(format)
    }

    /// Merge a snapshot into the session's selection
    ///
    /// Entries without an id are skipped.
    pub fn import_snapshot(&self, session_id: &str, snapshot: ConfigurationSnapshot) -> ImportSummary {
        let (nodes, blank): (Vec<_>, Vec<_>) = snapshot
            .selected_nodes
            .into_iter()
            .partition(|node| !node.id.trim().is_empty());

        if !blank.is_empty() {
            tracing::warn!(
                session_id = %session_id,
                count = blank.len(),
                "Skipping imported entries without a node id"
            );
        }

        let mut summary = self.sessions.import_snapshot(session_id, nodes);
        summary.skipped += blank.len();
        summary
    }

    pub fn import_json(&self, session_id: &str, json: &str) -> Result<ImportSummary> {
        let snapshot = ConfigurationSnapshot::from_json(json)?;
        Ok(self.import_snapshot(session_id, snapshot))
    }

    // === Lifecycle ===

    /// Disconnect and drop everything held for a session
    pub async fn end_session(&self, session_id: &str) {
        self.disconnect(session_id).await;
        self.sessions.forget_session(session_id);

        let mut locks = self.connect_locks.lock();
        if locks
            .get(session_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(session_id);
        }
    }
}

impl Clone for Configurator {
    fn clone(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
            sessions: self.sessions.clone(),
            factory: Arc::clone(&self.factory),
            connections: Arc::clone(&self.connections),
            connect_locks: Arc::clone(&self.connect_locks),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nodecfg_browse::{MemoryNamespaceFactory, NamespaceTree};
    use nodecfg_nodes::{NodeClass, StatusCode};
    use std::path::PathBuf;
    use std::time::Duration;

    const SESSION: &str = "session-a";

    fn configurator_with(factory: MemoryNamespaceFactory) -> (Configurator, Arc<MemoryNamespaceFactory>) {
        let factory = Arc::new(factory);
        let configurator = Configurator::new(
            Config::new(PathBuf::from("/tmp/nodecfg-test")),
            factory.clone(),
        );
        (configurator, factory)
    }

    fn configurator() -> (Configurator, Arc<MemoryNamespaceFactory>) {
        configurator_with(MemoryNamespaceFactory::new(NamespaceTree::sample()))
    }

    async fn connected() -> (Configurator, Arc<MemoryNamespaceFactory>) {
        let (configurator, factory) = configurator();
        configurator
            .connect(SESSION, ServerConnectionConfig::new("opc.tcp://plc-7:4840"))
            .await
            .unwrap();
        (configurator, factory)
    }

    #[tokio::test]
    async fn test_connect_and_browse_root() {
        let (configurator, _) = connected().await;

        assert!(configurator.is_connected(SESSION));
        assert_eq!(configurator.connection_status(SESSION), ConnectionStatus::Connected);
        assert_eq!(configurator.config().recent_endpoints[0], "opc.tcp://plc-7:4840");

        let root = configurator.browse(SESSION, "").await.unwrap();
        let names: Vec<&str> = root.iter().map(|n| n.browse_name.as_str()).collect();
        assert_eq!(names, vec!["Boiler", "Line1"]);
    }

    #[tokio::test]
    async fn test_browse_without_connection_issues_no_requests() {
        let (configurator, factory) = configurator();

        let err = configurator.browse(SESSION, "ns=2;s=Boiler").await.unwrap_err();
        assert!(matches!(err, CoreError::Browse(BrowseError::NotConnected)));
        assert!(err.is_connection_error());
        assert!(factory.clients().is_empty());
    }

    #[tokio::test]
    async fn test_refused_connection_registers_nothing() {
        let (configurator, factory) =
            configurator_with(MemoryNamespaceFactory::new(NamespaceTree::sample()).refusing_connections());

        let err = configurator
            .connect(SESSION, ServerConnectionConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::ConnectionFailed(_)));
        assert!(err.is_connection_error());
        assert!(!configurator.is_connected(SESSION));
        assert_eq!(configurator.connection_status(SESSION), ConnectionStatus::Disconnected);
        assert_eq!(factory.clients().len(), 1);
        assert_eq!(configurator.sessions().session_count(), 0);
    }

    #[tokio::test]
    async fn test_invalid_endpoint_is_rejected_before_connecting() {
        let (configurator, factory) = configurator();

        let err = configurator
            .connect(SESSION, ServerConnectionConfig::new("localhost"))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Node(_)));
        assert!(factory.clients().is_empty());
    }

    #[tokio::test]
    async fn test_browse_failure_is_not_a_connection_error() {
        let (configurator, _) = connected().await;

        let err = configurator.browse(SESSION, "ns=9;s=Nowhere").await.unwrap_err();
        assert!(matches!(
            err,
            CoreError::Browse(BrowseError::RemoteFailure { status, .. }) if status == StatusCode::BAD_NODE_ID_UNKNOWN
        ));
        assert!(!err.is_connection_error());
        assert!(configurator.is_connected(SESSION));
    }

    #[tokio::test]
    async fn test_read_value() {
        let (configurator, _) = connected().await;
        let value = configurator.read_value(SESSION, "ns=3;i=1002").await.unwrap();
        assert_eq!(value.value, serde_json::json!(true));
    }

    #[tokio::test]
    async fn test_select_only_variables() {
        let (configurator, _) = connected().await;

        let children = configurator.browse(SESSION, "ns=2;s=Boiler").await.unwrap();
        assert_eq!(children.len(), 3);

        assert_eq!(configurator.select_nodes(SESSION, &children), 2);
        assert_eq!(configurator.select_nodes(SESSION, &children), 0);

        let method = children
            .iter()
            .find(|n| n.node_class == NodeClass::Method)
            .unwrap();
        assert!(matches!(
            configurator.select_node(SESSION, method, None),
            Err(CoreError::Node(_))
        ));

        let selected = configurator.selected_nodes(SESSION);
        assert_eq!(selected[0].id, "ns=2;s=Boiler.Temperature");
        assert_eq!(selected[0].namespace_index, 2);
    }

    #[tokio::test]
    async fn test_selection_survives_reconnect() {
        let (configurator, _) = connected().await;
        let counter = NodeRef::new("ns=3;i=1001", "Counter", NodeClass::Variable);
        assert!(configurator.select_node(SESSION, &counter, Some("PartCount".into())).unwrap());

        assert!(configurator.disconnect(SESSION).await);
        assert!(!configurator.disconnect(SESSION).await);
        assert!(!configurator.is_connected(SESSION));
        assert_eq!(configurator.selected_nodes(SESSION).len(), 1);

        configurator
            .connect(SESSION, ServerConnectionConfig::default())
            .await
            .unwrap();
        assert_eq!(configurator.selected_nodes(SESSION)[0].alias.as_deref(), Some("PartCount"));
    }

    #[tokio::test]
    async fn test_reconnect_replaces_client() {
        let (configurator, factory) = connected().await;
        configurator
            .connect(SESSION, ServerConnectionConfig::new("opc.tcp://plc-8:4840"))
            .await
            .unwrap();

        let clients = factory.clients();
        assert_eq!(clients.len(), 2);
        assert!(!clients[0].is_connected());
        assert!(clients[1].is_connected());
        assert_eq!(
            configurator.server_config(SESSION).unwrap().url,
            "opc.tcp://plc-8:4840"
        );
    }

    #[tokio::test]
    async fn test_export_strips_password() {
        let (configurator, _) = configurator();
        configurator
            .connect(
                SESSION,
                ServerConnectionConfig::new("opc.tcp://plc-7:4840").with_credentials("op", "hunter2"),
            )
            .await
            .unwrap();
        let nodes = configurator.browse(SESSION, "ns=3;s=Line1").await.unwrap();
        configurator.select_nodes(SESSION, &nodes);

        let snapshot = configurator.export_snapshot(SESSION, "Line 1");
        assert_eq!(snapshot.selected_nodes.len(), 2);
        assert_eq!(snapshot.server_config.as_ref().unwrap().username, "op");

        for format in [ExportFormat::Json, ExportFormat::Xml, ExportFormat::Csv] {
            let rendered = configurator.render(SESSION, format).unwrap();
            assert!(!rendered.contains("hunter2"));
            assert!(rendered.contains("ns=3;i=1001"));
        }
    }

    #[tokio::test]
    async fn test_export_import_into_another_session() {
        let (configurator, _) = connected().await;
        let nodes = configurator.browse(SESSION, "ns=3;s=Line1").await.unwrap();
        configurator.select_nodes(SESSION, &nodes);
        let json = configurator.render(SESSION, ExportFormat::Json).unwrap();

        let summary = configurator.import_json("session-b", &json).unwrap();
        assert_eq!(summary, ImportSummary { added: 2, skipped: 0 });
        assert_eq!(
            configurator.selected_nodes("session-b"),
            configurator.selected_nodes(SESSION)
        );

        let again = configurator.import_json("session-b", &json).unwrap();
        assert_eq!(again, ImportSummary { added: 0, skipped: 2 });
        assert!(!configurator.is_connected("session-b"));
    }

    #[test]
    fn test_import_skips_blank_ids() {
        let (configurator, _) = configurator();
        let json = r#"{
            "name": "x",
            "createdDate": "2024-01-01T00:00:00Z",
            "selectedNodes": [
                {"nodeId": "", "displayName": "ghost"},
                {"nodeId": "ns=2;s=Boiler.Pressure", "displayName": "Pressure", "namespaceIndex": 2}
            ]
        }"#;

        let summary = configurator.import_json(SESSION, json).unwrap();
        assert_eq!(summary, ImportSummary { added: 1, skipped: 1 });

        let err = configurator.import_json(SESSION, "{").unwrap_err();
        assert!(matches!(err, CoreError::Serialization(_)));
        assert_eq!(configurator.selected_nodes(SESSION).len(), 1);
    }

    #[tokio::test]
    async fn test_sessions_are_independent() {
        let (configurator, _) = connected().await;
        let counter = NodeRef::new("ns=3;i=1001", "Counter", NodeClass::Variable);
        configurator.select_node(SESSION, &counter, None).unwrap();

        assert!(!configurator.is_connected("session-b"));
        assert!(configurator.selected_nodes("session-b").is_empty());
        assert_eq!(configurator.clear_selection("session-b"), 0);
        assert_eq!(configurator.selected_nodes(SESSION).len(), 1);
    }

    #[tokio::test]
    async fn test_end_session() {
        let (configurator, factory) = connected().await;
        let counter = NodeRef::new("ns=3;i=1001", "Counter", NodeClass::Variable);
        configurator.select_node(SESSION, &counter, None).unwrap();

        configurator.end_session(SESSION).await;
        assert!(!configurator.is_connected(SESSION));
        assert!(configurator.selected_nodes(SESSION).is_empty());
        assert!(!factory.clients()[0].is_connected());
    }

    #[tokio::test]
    async fn test_status_watch() {
        let (configurator, _) = connected().await;
        let mut rx = configurator.watch_status(SESSION).unwrap();
        assert_eq!(*rx.borrow_and_update(), ConnectionStatus::Connected);

        configurator.disconnect(SESSION).await;
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow(), ConnectionStatus::Disconnected);
        assert!(configurator.watch_status(SESSION).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_connects_keep_one_client() {
        let (configurator, factory) = configurator_with(
            MemoryNamespaceFactory::new(NamespaceTree::sample()).with_latency(Duration::from_millis(50)),
        );

        let (a, b) = tokio::join!(
            configurator.connect(SESSION, ServerConnectionConfig::new("opc.tcp://plc-7:4840")),
            configurator.connect(SESSION, ServerConnectionConfig::new("opc.tcp://plc-8:4840")),
        );
        a.unwrap();
        b.unwrap();

        let clients = factory.clients();
        assert_eq!(clients.len(), 2);
        assert_eq!(clients.iter().filter(|c| c.is_connected()).count(), 1);

        assert!(configurator.disconnect(SESSION).await);
        assert!(factory.clients().iter().all(|c| !c.is_connected()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_disconnect_waits_for_connect_in_flight() {
        let (configurator, factory) = configurator_with(
            MemoryNamespaceFactory::new(NamespaceTree::sample()).with_latency(Duration::from_millis(50)),
        );

        let (connected, disconnected) = tokio::join!(
            configurator.connect(SESSION, ServerConnectionConfig::default()),
            configurator.disconnect(SESSION),
        );
        connected.unwrap();
        assert!(disconnected);

        assert!(!configurator.is_connected(SESSION));
        assert!(configurator.server_config(SESSION).is_none());
        assert!(!factory.clients()[0].is_connected());
    }

    #[tokio::test]
    async fn test_failed_reconnect_keeps_connection() {
        let (configurator, factory) = configurator_with(
            MemoryNamespaceFactory::new(NamespaceTree::sample()).refusing_endpoint("opc.tcp://plc-9:4840"),
        );
        configurator
            .connect(SESSION, ServerConnectionConfig::new("opc.tcp://plc-7:4840"))
            .await
            .unwrap();

        let err = configurator
            .connect(SESSION, ServerConnectionConfig::new("opc.tcp://plc-9:4840"))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::ConnectionFailed(_)));

        assert!(configurator.is_connected(SESSION));
        assert_eq!(
            configurator.server_config(SESSION).unwrap().url,
            "opc.tcp://plc-7:4840"
        );
        assert!(factory.clients()[0].is_connected());
        assert_eq!(configurator.browse(SESSION, "").await.unwrap().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandoned_browse_still_completes() {
        let (configurator, factory) = configurator_with(
            MemoryNamespaceFactory::new(NamespaceTree::sample())
                .with_page_size(1)
                .with_latency(Duration::from_secs(1)),
        );
        configurator
            .connect(SESSION, ServerConnectionConfig::default())
            .await
            .unwrap();

        let abandoned = tokio::time::timeout(
            Duration::from_millis(1500),
            configurator.browse(SESSION, "ns=2;s=Boiler"),
        )
        .await;
        assert!(abandoned.is_err());

        tokio::time::sleep(Duration::from_secs(5)).await;
        let client = &factory.clients()[0];
        assert_eq!(client.request_count(), 3);
        assert_eq!(client.open_cursors(), 0);
    }

    #[tokio::test]
    async fn test_select_nodes_skips_malformed_variable_ids() {
        let (configurator, _) = configurator();
        let nodes = vec![
            NodeRef::new("Boiler.Pressure", "Pressure", NodeClass::Variable),
            NodeRef::new("ns=2;s=Boiler.Temperature", "Temperature", NodeClass::Variable),
        ];

        assert_eq!(configurator.select_nodes(SESSION, &nodes), 1);
        assert!(configurator.sessions().is_selected(SESSION, "ns=2;s=Boiler.Temperature"));
        assert!(!configurator.sessions().is_selected(SESSION, "Boiler.Pressure"));
    }
}
