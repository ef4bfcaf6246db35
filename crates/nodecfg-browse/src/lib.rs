//! NodeConfigurator Browse Engine
//!
//! Drives a remote namespace through the `RemoteNamespaceClient` capability:
//! - `browse_children` follows continuation tokens until the remote is done
//!   and returns one merged, ordered list, or an error and nothing else
//! - `read_value` reads one variable
//! - Connection status is published as a latest-value-wins watch channel
//!
//! `MemoryNamespace` implements the capability in-process for tests and
//! offline use.

mod client;
mod error;
mod memory;
mod read;
mod status;
mod traversal;

pub use client::{ClientFactory, RemoteNamespaceClient};
pub use error::BrowseError;
pub use memory::{MemoryNamespace, MemoryNamespaceFactory, NamespaceTree, PageFault};
pub use read::read_value;
pub use status::{ConnectionStatus, StatusChannel};
pub use traversal::{browse_children, BrowseOptions};

pub type Result<T> = std::result::Result<T, BrowseError>;
