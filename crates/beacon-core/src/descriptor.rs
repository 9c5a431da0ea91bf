//! Instance descriptor model and pre-registration builder.
//!
//! The builder collects the mutable pre-registration state (disabled
//! features, optional world log path) and is consumed by value exactly once
//! to produce an immutable [`InstanceDescriptor`] snapshot. There is no API
//! to mutate a descriptor after it has been built.

use crate::error::{BeaconError, Result};
use crate::host::{ComponentDescriptor, HostEnvironment};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Reference to a log file, relative to the game directory when contained
/// within it and absolute otherwise. Slashes are normalized to `/` so the
/// published form is identical across platforms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldLogRef {
    pub relative: bool,
    pub path: String,
}

impl WorldLogRef {
    pub fn new(path: &Path, game_dir: &Path) -> Self {
        match path.strip_prefix(game_dir) {
            Ok(rel) => Self {
                relative: true,
                path: normalize_slashes(rel),
            },
            Err(_) => Self {
                relative: false,
                path: normalize_slashes(path),
            },
        }
    }
}

fn normalize_slashes(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Immutable description of one running process, published per scope for
/// discovery by external tooling. Serialized once at registration time and
/// never updated afterward.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceDescriptor {
    /// Omitted when the process id could not be determined.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pid: Option<i64>,
    pub is_server: bool,
    pub game_dir: String,
    pub game_version: String,
    pub disabled_features: Vec<String>,
    pub mods: Vec<ComponentDescriptor>,
    /// Omitted when no world log path was set before registration.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub world_log: Option<WorldLogRef>,
}

/// Collects pre-registration state. Consumed exactly once by
/// [`InstanceRegistry::publish`](crate::registry::InstanceRegistry::publish).
#[derive(Debug, Default)]
pub struct InstanceDescriptorBuilder {
    disabled_features: Vec<String>,
    world_log_path: Option<PathBuf>,
}

impl InstanceDescriptorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a disabled feature. Idempotent: duplicates are ignored,
    /// insertion order is preserved.
    pub fn add_disabled_feature(&mut self, feature: impl Into<String>) {
        let feature = feature.into();
        if !self.disabled_features.contains(&feature) {
            self.disabled_features.push(feature);
        }
    }

    /// Record the world log path. May be set at most once per process
    /// lifetime; a second call fails and leaves the first path in effect.
    pub fn set_world_log_path(&mut self, path: impl Into<PathBuf>) -> Result<()> {
        if self.world_log_path.is_some() {
            return Err(BeaconError::WorldLogAlreadySet);
        }
        self.world_log_path = Some(path.into());
        Ok(())
    }

    /// Consume the builder into an immutable snapshot of the current
    /// process state.
    pub(crate) fn build(self, pid: Option<i64>, env: &dyn HostEnvironment) -> InstanceDescriptor {
        let game_dir = env.game_dir();
        let world_log = self
            .world_log_path
            .map(|path| WorldLogRef::new(&path, &game_dir));

        InstanceDescriptor {
            pid,
            is_server: !env.is_client(),
            game_dir: game_dir.to_string_lossy().replace('\\', "/"),
            game_version: env.game_version(),
            disabled_features: self.disabled_features,
            mods: env.loaded_components(),
            world_log,
        }
    }
}
