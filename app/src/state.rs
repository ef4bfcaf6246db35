//! Application state management
use nodecfg_core::{ClientFactory, Config, Configurator, MemoryNamespaceFactory, NamespaceTree};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// Thread-safe application state wrapper
///
/// Callers (a browser tab, a web cookie, a batch client) are mapped to
/// session ids minted here, so two callers never share selection state.
pub struct AppState {
    configurator: Configurator,
    caller_sessions: Arc<RwLock<HashMap<String, String>>>,
}

impl AppState {
    pub fn new(config: Config, factory: Arc<dyn ClientFactory>) -> Self {
        Self {
            configurator: Configurator::new(config, factory),
            caller_sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// State backed by the in-process sample namespace
    pub fn offline(config: Config) -> Self {
        Self::new(
            config,
            Arc::new(MemoryNamespaceFactory::new(NamespaceTree::sample())),
        )
    }

    pub fn configurator(&self) -> &Configurator {
        &self.configurator
    }

    /// Session id for `caller`, minted on first use
    pub fn session_id_for(&self, caller: &str) -> String {
        if let Some(id) = self.caller_sessions.read().get(caller).cloned() {
            return id;
        }

        self.caller_sessions
            .write()
            .entry(caller.to_string())
            .or_insert_with(|| {
                let id = Uuid::new_v4().to_string();
                tracing::debug!(caller = %caller, session_id = %id, "Assigned session");
                id
            })
            .clone()
    }

    /// Forget `caller` and everything its session held
    pub async fn end_caller(&self, caller: &str) -> bool {
        let session_id = self.caller_sessions.write().remove(caller);
        match session_id {
            Some(id) => {
                self.configurator.end_session(&id).await;
                tracing::info!(caller = %caller, session_id = %id, "Ended session");
                true
            }
            None => false,
        }
    }

    pub fn caller_count(&self) -> usize {
        self.caller_sessions.read().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_callers_get_distinct_stable_sessions() {
        let state = AppState::offline(Config::new(PathBuf::from("/tmp")));

        let a = state.session_id_for("tab-1");
        let b = state.session_id_for("tab-2");
        assert_ne!(a, b);
        assert_eq!(state.session_id_for("tab-1"), a);
        assert!(Uuid::parse_str(&a).is_ok());
        assert_eq!(state.caller_count(), 2);
    }

    #[tokio::test]
    async fn test_end_caller() {
        let state = AppState::offline(Config::new(PathBuf::from("/tmp")));
        let first = state.session_id_for("tab-1");

        assert!(state.end_caller("tab-1").await);
        assert!(!state.end_caller("tab-1").await);
        assert_ne!(state.session_id_for("tab-1"), first);
    }
}
