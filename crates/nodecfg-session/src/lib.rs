//! NodeConfigurator Session State
//!
//! - A session is keyed by an opaque id supplied by the calling layer
//! - Each session carries a connected flag and an ordered, unique-by-id
//!   selection of variables
//! - Sessions never block each other; calls on one session are atomic
//! - Selections outlive disconnects; nothing is persisted

mod coordinator;
mod selection;
mod session;

pub use coordinator::{ImportSummary, SessionCoordinator};
pub use selection::SelectionSet;
pub use session::SessionState;
