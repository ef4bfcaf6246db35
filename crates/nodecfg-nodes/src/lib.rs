//! NodeConfigurator Node Model
//!
//! Types shared by every layer that talks about the remote namespace:
//! - `NodeId` parsing and namespace extraction
//! - `NodeRef` as returned by a browse, identified by its id alone
//! - `SelectedNode`, which only a Variable can become
//! - Browse pages, continuation tokens and read results

mod class;
mod error;
mod node;
mod node_id;
mod page;
mod server;
mod status;

pub use class::{NodeClass, NodeClassMask};
pub use error::NodeError;
pub use node::{NodeRef, SelectedNode};
pub use node_id::{Identifier, NodeId};
pub use page::{
    BrowseDirection, BrowsePage, BrowseRequest, ContinuationToken, DataValue, ReferenceFilter,
    ResultMask,
};
pub use server::{SecurityMode, SecurityPolicy, ServerConnectionConfig};
pub use status::StatusCode;

pub type Result<T> = std::result::Result<T, NodeError>;
