//! Workspaces: persisted page arrangements over the shared content store.

pub mod arrange;
mod index;
mod instance;
mod manager;

pub use instance::Workspace;
pub use manager::{WorkspaceManager, validate_id};
