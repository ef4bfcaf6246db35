//! In-process remote namespace
//!
//! Serves a fixed node tree with real pagination so the traversal engine,
//! the session layer and the request glue can run without a server.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use tokio::sync::watch;

use nodecfg_nodes::{
    BrowsePage, BrowseRequest, ContinuationToken, DataValue, NodeClass, NodeClassMask, NodeId,
    NodeRef, ServerConnectionConfig, StatusCode,
};

use crate::client::{ClientFactory, RemoteNamespaceClient};
use crate::error::BrowseError;
use crate::status::{ConnectionStatus, StatusChannel};
use crate::Result;

#[derive(Debug, Clone)]
struct TreeEntry {
    node: NodeRef,
    children: Vec<String>,
    value: Option<serde_json::Value>,
}

/// Node tree served by [`MemoryNamespace`]
///
/// Entries are keyed by their id in canonical form (`i=85`, `ns=2;s=Pump`).
#[derive(Debug, Clone)]
pub struct NamespaceTree {
    entries: HashMap<String, TreeEntry>,
}

impl NamespaceTree {
    /// Tree holding only the root objects folder
    pub fn new() -> Self {
        let root = NodeRef::new(NodeId::objects_folder().to_string(), "Objects", NodeClass::Object);
        let mut entries = HashMap::new();
        entries.insert(
            root.id.clone(),
            TreeEntry {
                node: root,
                children: Vec::new(),
                value: None,
            },
        );
        Self { entries }
    }

    /// Small plant model used by demos and tests
    pub fn sample() -> Self {
        let mut tree = Self::new();
        tree.add_node("i=85", NodeRef::new("ns=2;s=Boiler", "Boiler", NodeClass::Object))
            .add_variable(
                "ns=2;s=Boiler",
                NodeRef::new("ns=2;s=Boiler.Temperature", "Temperature", NodeClass::Variable)
                    .with_data_type("Double"),
                serde_json::json!(78.4),
            )
            .add_variable(
                "ns=2;s=Boiler",
                NodeRef::new("ns=2;s=Boiler.Pressure", "Pressure", NodeClass::Variable)
                    .with_data_type("Double"),
                serde_json::json!(2.1),
            )
            .add_node(
                "ns=2;s=Boiler",
                NodeRef::new("ns=2;s=Boiler.Reset", "Reset", NodeClass::Method),
            )
            .add_node("i=85", NodeRef::new("ns=3;s=Line1", "Line1", NodeClass::Object))
            .add_variable(
                "ns=3;s=Line1",
                NodeRef::new("ns=3;i=1001", "Counter", NodeClass::Variable).with_data_type("Int32"),
                serde_json::json!(1200),
            )
            .add_variable(
                "ns=3;s=Line1",
                NodeRef::new("ns=3;i=1002", "Running", NodeClass::Variable)
                    .with_data_type("Boolean"),
                serde_json::json!(true),
            );
        tree
    }

    /// Attach `node` under `parent`; unknown parents become orphan entries
    pub fn add_node(&mut self, parent: &str, node: NodeRef) -> &mut Self {
        self.insert(parent, node, None)
    }

    pub fn add_variable(&mut self, parent: &str, node: NodeRef, value: serde_json::Value) -> &mut Self {
        self.insert(parent, node, Some(value))
    }

    pub fn set_value(&mut self, id: &str, value: serde_json::Value) -> bool {
        match self.entries.get_mut(id) {
            Some(entry) => {
                entry.value = Some(value);
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn insert(&mut self, parent: &str, node: NodeRef, value: Option<serde_json::Value>) -> &mut Self {
        let id = node.id.clone();
        self.entries
            .entry(parent.to_string())
            .or_insert_with(|| TreeEntry {
                node: NodeRef::new(parent, parent, NodeClass::Object),
                children: Vec::new(),
                value: None,
            })
            .children
            .push(id.clone());

        match self.entries.get_mut(&id) {
            // Placeholder created by an earlier child: fill in the real node
            Some(existing) => {
                existing.node = node;
                existing.value = value;
            }
            None => {
                self.entries.insert(
                    id,
                    TreeEntry {
                        node,
                        children: Vec::new(),
                        value,
                    },
                );
            }
        }
        self
    }

    fn children(&self, id: &NodeId, mask: NodeClassMask) -> Option<Vec<NodeRef>> {
        let entry = self.entries.get(&id.to_string())?;
        Some(
            entry
                .children
                .iter()
                .filter_map(|child| self.entries.get(child))
                .map(|child| child.node.clone())
                .filter(|node| mask.contains(node.node_class))
                .collect(),
        )
    }

    fn value(&self, id: &NodeId) -> Option<DataValue> {
        let entry = self.entries.get(&id.to_string())?;
        if entry.node.node_class != NodeClass::Variable {
            return Some(DataValue::bad(StatusCode::BAD_ATTRIBUTE_ID_INVALID));
        }
        entry
            .value
            .clone()
            .map(|value| DataValue::good(value, Utc::now()))
    }
}

impl Default for NamespaceTree {
    fn default() -> Self {
        Self::new()
    }
}

/// Injected failure for one page number of every traversal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageFault {
    /// Page comes back with this non-good status
    Status(StatusCode),
    /// The request itself fails
    Error,
}

pub struct MemoryNamespace {
    tree: Arc<RwLock<NamespaceTree>>,
    page_size: usize,
    page_fault: Option<(usize, PageFault)>,
    latency: Option<Duration>,
    refuse_connections: bool,
    connected: AtomicBool,
    status: StatusChannel,
    cursors: Mutex<HashMap<Vec<u8>, (NodeId, usize)>>,
    next_token: AtomicU64,
    requests: AtomicUsize,
    released: AtomicUsize,
}

impl MemoryNamespace {
    pub fn new(tree: NamespaceTree) -> Self {
        Self::shared(Arc::new(RwLock::new(tree)))
    }

    pub fn shared(tree: Arc<RwLock<NamespaceTree>>) -> Self {
        Self {
            tree,
            page_size: 100,
            page_fault: None,
            latency: None,
            refuse_connections: false,
            connected: AtomicBool::new(false),
            status: StatusChannel::new(),
            cursors: Mutex::new(HashMap::new()),
            next_token: AtomicU64::new(1),
            requests: AtomicUsize::new(0),
            released: AtomicUsize::new(0),
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Fail the `page`-th page (1-based) of every traversal
    pub fn with_page_fault(mut self, page: usize, fault: PageFault) -> Self {
        self.page_fault = Some((page, fault));
        self
    }

    /// Delay every remote call
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn refusing_connections(mut self) -> Self {
        self.refuse_connections = true;
        self
    }

    /// Browse and read requests received so far
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    pub fn released_count(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    pub fn open_cursors(&self) -> usize {
        self.cursors.lock().len()
    }

    async fn simulate_latency(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait]
impl RemoteNamespaceClient for MemoryNamespace {
    async fn connect(&self, config: &ServerConnectionConfig) -> Result<bool> {
        self.status.set(ConnectionStatus::Connecting);
        self.simulate_latency().await;

        if self.refuse_connections {
            self.status
                .set(ConnectionStatus::Failed(format!("{} refused the session", config.url)));
            return Ok(false);
        }

        self.connected.store(true, Ordering::SeqCst);
        self.status.set(ConnectionStatus::Connected);
        Ok(true)
    }

    async fn disconnect(&self) -> Result<()> {
        self.connected.store(false, Ordering::SeqCst);
        self.cursors.lock().clear();
        self.status.set(ConnectionStatus::Disconnected);
        Ok(())
    }

    async fn browse_page(
        &self,
        request: &BrowseRequest,
        continuation: Option<&ContinuationToken>,
    ) -> Result<BrowsePage> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        self.simulate_latency().await;

        if !self.is_connected() {
            return Err(BrowseError::NotConnected);
        }

        let (node_id, offset) = match continuation {
            None => (request.node_id.clone(), 0),
            Some(token) => {
                let cursor = self.cursors.lock().remove(token.as_bytes());
                match cursor {
                    Some(cursor) => cursor,
                    None => return Ok(BrowsePage::failed(StatusCode::BAD_CONTINUATION_POINT_INVALID)),
                }
            }
        };

        let children = {
            let tree = self.tree.read();
            tree.children(&node_id, request.node_class_mask)
        };
        let children = match children {
            Some(children) => children,
            None => return Ok(BrowsePage::failed(StatusCode::BAD_NODE_ID_UNKNOWN)),
        };

        let page_number = offset / self.page_size + 1;
        if let Some((page, fault)) = self.page_fault {
            if page == page_number {
                return match fault {
                    PageFault::Status(status) => Ok(BrowsePage::failed(status)),
                    PageFault::Error => Err(BrowseError::remote(
                        StatusCode::BAD_UNEXPECTED,
                        format!("connection dropped while browsing {}", node_id),
                    )),
                };
            }
        }

        let end = (offset + self.page_size).min(children.len());
        let references = children[offset.min(end)..end].to_vec();

        if end < children.len() {
            let token = self.next_token.fetch_add(1, Ordering::SeqCst).to_be_bytes().to_vec();
            self.cursors.lock().insert(token.clone(), (node_id, end));
            Ok(BrowsePage::with_continuation(references, ContinuationToken::new(token)))
        } else {
            Ok(BrowsePage::last(references))
        }
    }

    async fn release_continuation(&self, token: &ContinuationToken) -> Result<()> {
        if self.cursors.lock().remove(token.as_bytes()).is_some() {
            self.released.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }

    async fn read_value(&self, node_id: &NodeId) -> Result<DataValue> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        self.simulate_latency().await;

        if !self.is_connected() {
            return Err(BrowseError::NotConnected);
        }

        let value = self.tree.read().value(node_id);
        Ok(value.unwrap_or_else(|| DataValue::bad(StatusCode::BAD_NODE_ID_UNKNOWN)))
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn status(&self) -> watch::Receiver<ConnectionStatus> {
        self.status.subscribe()
    }
}

/// Hands out [`MemoryNamespace`] clients that share one tree
pub struct MemoryNamespaceFactory {
    tree: Arc<RwLock<NamespaceTree>>,
    page_size: usize,
    latency: Option<Duration>,
    refuse_connections: bool,
    refused_endpoints: Vec<String>,
    created: Mutex<Vec<Arc<MemoryNamespace>>>,
}

impl MemoryNamespaceFactory {
    pub fn new(tree: NamespaceTree) -> Self {
        Self {
            tree: Arc::new(RwLock::new(tree)),
            page_size: 100,
            latency: None,
            refuse_connections: false,
            refused_endpoints: Vec::new(),
            created: Mutex::new(Vec::new()),
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn refusing_connections(mut self) -> Self {
        self.refuse_connections = true;
        self
    }

    /// Refuse only clients created for `url`
    pub fn refusing_endpoint(mut self, url: impl Into<String>) -> Self {
        self.refused_endpoints.push(url.into());
        self
    }

    pub fn tree(&self) -> Arc<RwLock<NamespaceTree>> {
        Arc::clone(&self.tree)
    }

    /// Every client created so far, oldest first
    pub fn clients(&self) -> Vec<Arc<MemoryNamespace>> {
        self.created.lock().clone()
    }
}

impl ClientFactory for MemoryNamespaceFactory {
    fn create(&self, config: &ServerConnectionConfig) -> Arc<dyn RemoteNamespaceClient> {
        let mut client = MemoryNamespace::shared(self.tree()).with_page_size(self.page_size);
        if let Some(latency) = self.latency {
            client = client.with_latency(latency);
        }
        if self.refuse_connections || self.refused_endpoints.contains(&config.url) {
            client = client.refusing_connections();
        }
        let client = Arc::new(client);
        self.created.lock().push(Arc::clone(&client));
        client
    }
}
