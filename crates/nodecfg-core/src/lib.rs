//! NodeConfigurator Core
//!
//! Coordination layer between the calling application, the remote
//! namespace clients and the per-session selection state.
//! The core owns all state; callers only hold session ids.

mod config;
mod configurator;
mod error;
mod snapshot;

pub use config::Config;
pub use configurator::Configurator;
pub use error::CoreError;
pub use snapshot::{export_file_name, ConfigurationSnapshot, ExportFormat};

// Re-export core components
pub use nodecfg_browse::{
    BrowseError, BrowseOptions, ClientFactory, ConnectionStatus, MemoryNamespace,
    MemoryNamespaceFactory, NamespaceTree, RemoteNamespaceClient,
};
pub use nodecfg_nodes::{
    DataValue, NodeClass, NodeError, NodeId, NodeRef, SelectedNode, ServerConnectionConfig,
    StatusCode,
};
pub use nodecfg_session::{ImportSummary, SessionCoordinator};

pub type Result<T> = std::result::Result<T, CoreError>;

/// Initialize logging
///
/// Logs go to stderr; stdout belongs to command output.
pub fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}
