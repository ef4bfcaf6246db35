//! Session data structure

use chrono::{DateTime, Utc};

use crate::selection::SelectionSet;

#[derive(Debug, Clone)]
pub struct SessionState {
    /// Whether the calling layer reported a live remote connection
    pub connected: bool,
    /// Variables picked for export
    pub selection: SelectionSet,
    /// When the session was first referenced
    pub created_at: DateTime<Utc>,
    /// Last modification time
    pub updated_at: DateTime<Utc>,
}

impl SessionState {
    pub fn new() -> Self {
        let now = Utc::now();

        Self {
            connected: false,
            selection: SelectionSet::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Set the connected flag, returning whether it changed
    pub fn set_connected(&mut self, connected: bool) -> bool {
        if self.connected == connected {
            return false;
        }
        self.connected = connected;
        self.touch();
        true
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}
