//! Session Coordinator
//!
//! Connection registry and selection store behind one façade, keyed by the
//! caller's session id. The map lock is only held to find or create a
//! session's slot; every operation then runs under that session's own
//! mutex, so sessions never wait on each other and each call is atomic.

use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

use nodecfg_nodes::SelectedNode;

use crate::session::SessionState;

type Slot = Arc<Mutex<SessionState>>;

/// Outcome of importing a configuration into a session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    /// Entries that were new to the session
    pub added: usize,
    /// Entries whose id was already selected
    pub skipped: usize,
}

pub struct SessionCoordinator {
    sessions: Arc<RwLock<HashMap<String, Slot>>>,
}

impl SessionCoordinator {
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    fn slot(&self, session_id: &str) -> Option<Slot> {
        self.sessions.read().get(session_id).cloned()
    }

    fn slot_or_create(&self, session_id: &str) -> Slot {
        if let Some(slot) = self.slot(session_id) {
            return slot;
        }

        Arc::clone(
            self.sessions
                .write()
                .entry(session_id.to_string())
                .or_insert_with(|| {
                    tracing::debug!(session_id = %session_id, "Created session state");
                    Arc::new(Mutex::new(SessionState::new()))
                }),
        )
    }

    // === Connection registry ===

    /// Mark the session connected; safe to repeat
    pub fn register_connection(&self, session_id: &str) {
        if self.slot_or_create(session_id).lock().set_connected(true) {
            tracing::info!(session_id = %session_id, "Registered connection");
        }
    }

    /// Mark the session disconnected; safe to repeat
    ///
    /// The selection is left alone.
    pub fn unregister_connection(&self, session_id: &str) {
        if let Some(slot) = self.slot(session_id) {
            if slot.lock().set_connected(false) {
                tracing::info!(session_id = %session_id, "Unregistered connection");
            }
        }
    }

    /// Unknown sessions are not connected. A session that was registered
    /// and then unregistered looks exactly like one never seen.
    pub fn is_connected(&self, session_id: &str) -> bool {
        self.slot(session_id)
            .map(|slot| slot.lock().connected)
            .unwrap_or(false)
    }

    // === Selection store ===

    /// Add a node unless its id is already selected; returns whether it was added
    pub fn add_selected(&self, session_id: &str, node: SelectedNode) -> bool {
        let node_id = node.id.clone();
        let slot = self.slot_or_create(session_id);
        let added = {
            let mut state = slot.lock();
            let added = state.selection.insert(node);
            if added {
                state.touch();
            }
            added
        };

        tracing::debug!(
            session_id = %session_id,
            node_id = %node_id,
            added,
            "Add selected node"
        );

        added
    }

    /// Add several nodes in one atomic step; returns how many were new
    pub fn add_selected_many<I>(&self, session_id: &str, nodes: I) -> usize
    where
        I: IntoIterator<Item = SelectedNode>,
    {
        self.insert_all(session_id, nodes).added
    }

    pub fn remove_selected(&self, session_id: &str, node_id: &str) -> bool {
        let removed = match self.slot(session_id) {
            Some(slot) => {
                let mut state = slot.lock();
                let removed = state.selection.remove(node_id).is_some();
                if removed {
                    state.touch();
                }
                removed
            }
            None => false,
        };

        tracing::debug!(
            session_id = %session_id,
            node_id = %node_id,
            removed,
            "Remove selected node"
        );

        removed
    }

    /// Current selection in insertion order; empty for unknown sessions
    pub fn list_selected(&self, session_id: &str) -> Vec<SelectedNode> {
        self.slot(session_id)
            .map(|slot| slot.lock().selection.to_vec())
            .unwrap_or_default()
    }

    pub fn selected_count(&self, session_id: &str) -> usize {
        self.slot(session_id)
            .map(|slot| slot.lock().selection.len())
            .unwrap_or(0)
    }

    pub fn is_selected(&self, session_id: &str, node_id: &str) -> bool {
        self.slot(session_id)
            .map(|slot| slot.lock().selection.contains(node_id))
            .unwrap_or(false)
    }

    /// Empty the selection; returns how many entries were dropped
    pub fn clear_selected(&self, session_id: &str) -> usize {
        let cleared = match self.slot(session_id) {
            Some(slot) => {
                let mut state = slot.lock();
                let cleared = state.selection.clear();
                if cleared > 0 {
                    state.touch();
                }
                cleared
            }
            None => 0,
        };

        if cleared > 0 {
            tracing::info!(session_id = %session_id, cleared, "Cleared selection");
        }

        cleared
    }

    /// Add every node of an imported configuration with the same
    /// first-write-wins rule as interactive adds, so importing twice
    /// changes nothing the second time
    pub fn import_snapshot<I>(&self, session_id: &str, nodes: I) -> ImportSummary
    where
        I: IntoIterator<Item = SelectedNode>,
    {
        let summary = self.insert_all(session_id, nodes);

        tracing::info!(
            session_id = %session_id,
            added = summary.added,
            skipped = summary.skipped,
            "Imported configuration"
        );

        summary
    }

    fn insert_all<I>(&self, session_id: &str, nodes: I) -> ImportSummary
    where
        I: IntoIterator<Item = SelectedNode>,
    {
        let mut summary = ImportSummary::default();
        let slot = self.slot_or_create(session_id);
        let mut state = slot.lock();

        for node in nodes {
            if state.selection.insert(node) {
                summary.added += 1;
            } else {
                summary.skipped += 1;
            }
        }

        if summary.added > 0 {
            state.touch();
        }

        summary
    }

    // === Lifecycle ===

    /// Copy of one session's state, if it exists
    pub fn session(&self, session_id: &str) -> Option<SessionState> {
        self.slot(session_id).map(|slot| slot.lock().clone())
    }

    /// Drop everything held for a session the calling layer has ended
    ///
    /// Not linearizable with calls already in flight on the same session:
    /// an add that found the slot before it was dropped still reports
    /// success, but its write lands in the discarded state. Callers end a
    /// session only once nothing else uses it.
    pub fn forget_session(&self, session_id: &str) -> bool {
        let removed = self.sessions.write().remove(session_id).is_some();
        if removed {
            tracing::info!(session_id = %session_id, "Forgot session");
        }
        removed
    }

    pub fn session_count(&self) -> usize {
        self.sessions.read().len()
    }
}

impl Default for SessionCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for SessionCoordinator {
    fn clone(&self) -> Self {
        Self {
            sessions: Arc::clone(&self.sessions),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::time::Duration;

    fn node(id: &str, display_name: &str) -> SelectedNode {
        SelectedNode {
            id: id.to_string(),
            browse_name: display_name.to_string(),
            display_name: display_name.to_string(),
            data_type: "Int32".to_string(),
            alias: None,
            namespace_index: 2,
        }
    }

    fn ids(nodes: &[SelectedNode]) -> Vec<&str> {
        nodes.iter().map(|n| n.id.as_str()).collect()
    }

    #[test]
    fn test_connection_registry() {
        let coordinator = SessionCoordinator::new();

        assert!(!coordinator.is_connected("web-1"));

        coordinator.register_connection("web-1");
        coordinator.register_connection("web-1");
        assert!(coordinator.is_connected("web-1"));

        coordinator.unregister_connection("web-1");
        coordinator.unregister_connection("web-1");
        assert!(!coordinator.is_connected("web-1"));

        // Registered-then-unregistered reads the same as never registered
        assert_eq!(
            coordinator.is_connected("web-1"),
            coordinator.is_connected("never-seen")
        );
    }

    #[test]
    fn test_pure_reads_do_not_create_sessions() {
        let coordinator = SessionCoordinator::new();

        assert!(!coordinator.is_connected("ghost"));
        assert!(coordinator.list_selected("ghost").is_empty());
        assert_eq!(coordinator.selected_count("ghost"), 0);
        assert!(!coordinator.remove_selected("ghost", "ns=2;s=a"));
        assert_eq!(coordinator.clear_selected("ghost"), 0);
        coordinator.unregister_connection("ghost");

        assert_eq!(coordinator.session_count(), 0);
    }

    #[test]
    fn test_empty_session_id_is_an_ordinary_key() {
        let coordinator = SessionCoordinator::new();
        coordinator.register_connection("");
        coordinator.add_selected("", node("ns=2;s=a", "a"));

        assert!(coordinator.is_connected(""));
        assert_eq!(coordinator.selected_count(""), 1);
        assert!(!coordinator.is_connected(" "));
    }

    #[test]
    fn test_duplicate_add_keeps_first_values() {
        let coordinator = SessionCoordinator::new();

        assert!(coordinator.add_selected("s", node("ns=2;s=a", "first a")));
        assert!(coordinator.add_selected("s", node("ns=2;s=b", "b")));
        assert!(!coordinator.add_selected("s", node("ns=2;s=a", "second a")));
        assert!(coordinator.add_selected("s", node("ns=2;s=c", "c")));

        let selected = coordinator.list_selected("s");
        assert_eq!(ids(&selected), vec!["ns=2;s=a", "ns=2;s=b", "ns=2;s=c"]);
        assert_eq!(selected[0].display_name, "first a");
    }

    #[test]
    fn test_concurrent_adds_stay_unique() {
        for _ in 0..50 {
            let coordinator = SessionCoordinator::new();
            std::thread::scope(|scope| {
                for id in ["a", "b", "a", "c"] {
                    let coordinator = &coordinator;
                    scope.spawn(move || {
                        coordinator.add_selected("shared", node(&format!("ns=2;s={}", id), id));
                    });
                }
            });

            let mut selected: Vec<String> = coordinator
                .list_selected("shared")
                .into_iter()
                .map(|n| n.id)
                .collect();
            selected.sort();
            assert_eq!(selected, vec!["ns=2;s=a", "ns=2;s=b", "ns=2;s=c"]);
        }
    }

    #[test]
    fn test_concurrent_add_and_remove() {
        let coordinator = SessionCoordinator::new();
        coordinator.add_selected("s", node("ns=2;s=victim", "victim"));

        std::thread::scope(|scope| {
            for i in 0..8 {
                let coordinator = &coordinator;
                scope.spawn(move || {
                    for j in 0..100 {
                        coordinator.add_selected("s", node(&format!("ns=2;i={}", i * 100 + j), "n"));
                    }
                });
            }

            let coordinator = &coordinator;
            scope.spawn(move || {
                assert!(coordinator.remove_selected("s", "ns=2;s=victim"));
                assert!(!coordinator.is_selected("s", "ns=2;s=victim"));
                assert!(coordinator
                    .list_selected("s")
                    .iter()
                    .all(|n| n.id != "ns=2;s=victim"));
            });
        });

        assert_eq!(coordinator.selected_count("s"), 800);
    }

    #[test]
    fn test_sessions_do_not_block_each_other() {
        let coordinator = SessionCoordinator::new();
        coordinator.add_selected("busy", node("ns=2;s=a", "a"));

        let busy = coordinator.slot("busy").unwrap();
        let _held = busy.lock();

        let (tx, rx) = mpsc::channel();
        let other = coordinator.clone();
        let handle = std::thread::spawn(move || {
            other.register_connection("idle");
            other.add_selected("idle", node("ns=2;s=b", "b"));
            tx.send(other.list_selected("idle").len()).unwrap();
        });

        assert_eq!(rx.recv_timeout(Duration::from_secs(5)), Ok(1));
        handle.join().unwrap();
    }

    #[test]
    fn test_selection_survives_disconnect() {
        let coordinator = SessionCoordinator::new();
        coordinator.register_connection("s");
        coordinator.add_selected("s", node("ns=2;s=a", "a"));

        coordinator.unregister_connection("s");
        assert_eq!(coordinator.selected_count("s"), 1);

        coordinator.register_connection("s");
        assert_eq!(ids(&coordinator.list_selected("s")), vec!["ns=2;s=a"]);
    }

    #[test]
    fn test_clear_selected() {
        let coordinator = SessionCoordinator::new();
        coordinator.add_selected("s", node("ns=2;s=a", "a"));
        coordinator.add_selected("s", node("ns=2;s=b", "b"));
        coordinator.add_selected("other", node("ns=2;s=a", "a"));

        assert_eq!(coordinator.clear_selected("s"), 2);
        assert!(coordinator.list_selected("s").is_empty());
        assert_eq!(coordinator.selected_count("other"), 1);
    }

    #[test]
    fn test_import_is_idempotent() {
        let coordinator = SessionCoordinator::new();
        coordinator.add_selected("s", node("ns=2;s=a", "interactive a"));

        let snapshot = vec![node("ns=2;s=a", "imported a")];
        let summary = coordinator.import_snapshot("s", snapshot.clone());
        assert_eq!(summary, ImportSummary { added: 0, skipped: 1 });
        assert_eq!(coordinator.selected_count("s"), 1);
        assert_eq!(coordinator.list_selected("s")[0].display_name, "interactive a");

        let fresh = vec![
            node("ns=2;s=x", "x"),
            node("ns=2;s=y", "y"),
            node("ns=2;s=z", "z"),
        ];
        let summary = coordinator.import_snapshot("s", fresh.clone());
        assert_eq!(summary, ImportSummary { added: 3, skipped: 0 });
        assert_eq!(coordinator.selected_count("s"), 4);

        let again = coordinator.import_snapshot("s", fresh);
        assert_eq!(again, ImportSummary { added: 0, skipped: 3 });
        assert_eq!(coordinator.selected_count("s"), 4);
    }

    #[test]
    fn test_forget_session() {
        let coordinator = SessionCoordinator::new();
        coordinator.register_connection("s");
        coordinator.add_selected("s", node("ns=2;s=a", "a"));

        assert!(coordinator.forget_session("s"));
        assert!(!coordinator.forget_session("s"));
        assert!(!coordinator.is_connected("s"));
        assert!(coordinator.list_selected("s").is_empty());
        assert_eq!(coordinator.session_count(), 0);
    }

    #[test]
    fn test_write_through_forgotten_slot_is_discarded() {
        let coordinator = SessionCoordinator::new();
        let in_flight = coordinator.slot_or_create("s");

        assert!(coordinator.forget_session("s"));
        assert!(in_flight.lock().selection.insert(node("ns=2;s=a", "a")));

        assert!(coordinator.list_selected("s").is_empty());
        assert!(coordinator.add_selected("s", node("ns=2;s=b", "b")));
        assert_eq!(coordinator.selected_count("s"), 1);
        assert!(!coordinator.is_selected("s", "ns=2;s=a"));
    }

    #[tokio::test]
    async fn test_shared_across_tasks() {
        let coordinator = SessionCoordinator::new();

        let mut handles = Vec::new();
        for i in 0..16 {
            let coordinator = coordinator.clone();
            handles.push(tokio::spawn(async move {
                let session = format!("tab-{}", i % 4);
                coordinator.add_selected(&session, node(&format!("ns=2;i={}", i / 4), "n"));
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(coordinator.session_count(), 4);
        for i in 0..4 {
            assert_eq!(coordinator.selected_count(&format!("tab-{}", i)), 4);
        }
    }
}
