//! Connection status publication
//!
//! A watch channel: subscribers always see the newest status and never
//! queue up intermediate ones.

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "reason", rename_all = "lowercase")]
pub enum ConnectionStatus {
    Disconnected,
    Connecting,
    Connected,
    Failed(String),
}

impl ConnectionStatus {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionStatus::Connected)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionStatus::Disconnected => "disconnected",
            ConnectionStatus::Connecting => "connecting",
            ConnectionStatus::Connected => "connected",
            ConnectionStatus::Failed(_) => "failed",
        }
    }
}

impl std::fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionStatus::Failed(reason) => write!(f, "failed: {}", reason),
            other => write!(f, "{}", other.as_str()),
        }
    }
}

pub struct StatusChannel {
    tx: watch::Sender<ConnectionStatus>,
}

impl StatusChannel {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(ConnectionStatus::Disconnected);
        Self { tx }
    }

    /// Publish a status; subscribers are only woken when it changed
    pub fn set(&self, status: ConnectionStatus) {
        self.tx.send_if_modified(|current| {
            if *current == status {
                return false;
            }
            tracing::debug!(from = %current, to = %status, "Connection status changed");
            *current = status;
            true
        });
    }

    pub fn current(&self) -> ConnectionStatus {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ConnectionStatus> {
        self.tx.subscribe()
    }
}

impl Default for StatusChannel {
    fn default() -> Self {
        Self::new()
    }
}
