//! Request commands
//!
//! Each command takes the caller key plus typed arguments and answers with a
//! `CommandResult`. Failures carry an `error_kind` so a front end can tell a
//! lost connection apart from a node that could not be browsed.

pub mod browse;
pub mod configuration;
pub mod connection;
pub mod selection;

use nodecfg_core::{BrowseError, CoreError};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotConnected,
    Connection,
    Browse,
    Timeout,
    InvalidInput,
    Import,
    /// Local file could not be read or written
    Io,
}

impl From<&CoreError> for ErrorKind {
    fn from(err: &CoreError) -> Self {
        match err {
            CoreError::Browse(BrowseError::NotConnected) => ErrorKind::NotConnected,
            CoreError::Browse(BrowseError::Timeout(_)) => ErrorKind::Timeout,
            CoreError::Browse(BrowseError::InvalidNodeId(_)) => ErrorKind::InvalidInput,
            CoreError::Browse(BrowseError::RemoteFailure { .. }) => ErrorKind::Browse,
            CoreError::ConnectionFailed(_) => ErrorKind::Connection,
            CoreError::Node(_) | CoreError::Config(_) => ErrorKind::InvalidInput,
            CoreError::Serialization(_) => ErrorKind::Import,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CommandResult<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
    pub error_kind: Option<ErrorKind>,
}

impl<T> CommandResult<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            error_kind: None,
        }
    }

    pub fn err(kind: ErrorKind, error: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error),
            error_kind: Some(kind),
        }
    }
}

impl<T> From<nodecfg_core::Result<T>> for CommandResult<T> {
    fn from(result: nodecfg_core::Result<T>) -> Self {
        match result {
            Ok(data) => CommandResult::ok(data),
            Err(e) => CommandResult::err(ErrorKind::from(&e), e.to_string()),
        }
    }
}

impl<T: Serialize> CommandResult<T> {
    /// Same result with the payload as a JSON value
    pub fn into_value(self) -> CommandResult<serde_json::Value> {
        let data = match self.data.map(serde_json::to_value).transpose() {
            Ok(data) => data,
            Err(e) => return CommandResult::err(ErrorKind::InvalidInput, e.to_string()),
        };

        CommandResult {
            success: self.success,
            data,
            error: self.error,
            error_kind: self.error_kind,
        }
    }
}
