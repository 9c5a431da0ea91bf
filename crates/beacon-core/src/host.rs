//! Host runtime capability interface.
//!
//! The host application implements this trait once and injects it; the core
//! never branches on host type. Everything the descriptor snapshot needs from
//! the surrounding runtime flows through here.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Identity of one loaded component (mod/plugin) at registration time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentDescriptor {
    pub name: String,
    pub id: String,
    pub version: String,
}

impl ComponentDescriptor {
    pub fn new(
        name: impl Into<String>,
        id: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            id: id.into(),
            version: version.into(),
        }
    }
}

/// Narrow view of the host runtime consumed during registration.
pub trait HostEnvironment: Send + Sync {
    /// Absolute path of the active game/content directory.
    fn game_dir(&self) -> PathBuf;

    /// Whether this process runs as a client. Servers are the negation.
    fn is_client(&self) -> bool;

    /// Version string of the running game content.
    fn game_version(&self) -> String;

    /// Snapshot of currently loaded components, in load order.
    fn loaded_components(&self) -> Vec<ComponentDescriptor>;
}
