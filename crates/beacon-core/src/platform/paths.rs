//! Platform-specific state directory resolution.

use crate::config::{HeartbeatConfig, RegistryConfig};
use crate::error::{BeaconError, Result};
use std::path::{Path, PathBuf};

/// Resolved publication roots for one process.
///
/// The local state directory lives under the game directory and scopes
/// records to the current working context; the global state root is shared
/// by every process on the machine.
#[derive(Debug, Clone)]
pub struct StatePaths {
    local_state_dir: PathBuf,
    global_state_root: PathBuf,
}

impl StatePaths {
    /// Resolve both roots against platform conventions: local scope under
    /// `game_dir`, global scope under the machine-wide data root.
    pub fn resolve(game_dir: &Path) -> Result<Self> {
        Ok(Self {
            local_state_dir: game_dir.join(RegistryConfig::STATE_DIR_NAME),
            global_state_root: global_state_root()?,
        })
    }

    /// Construct from explicit directories. Used by tests and by embedders
    /// with non-standard layouts.
    pub fn from_dirs(
        local_state_dir: impl Into<PathBuf>,
        global_state_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            local_state_dir: local_state_dir.into(),
            global_state_root: global_state_root.into(),
        }
    }

    pub fn local_state_dir(&self) -> &Path {
        &self.local_state_dir
    }

    pub fn global_state_root(&self) -> &Path {
        &self.global_state_root
    }

    /// Path of the heartbeat file: `<local-state-dir>/alive`.
    pub fn heartbeat_file(&self) -> PathBuf {
        self.local_state_dir.join(HeartbeatConfig::FILE_NAME)
    }

    /// Machine-wide instance record directory.
    pub fn global_instances_dir(&self) -> PathBuf {
        self.global_state_root
            .join(RegistryConfig::INSTANCES_DIR_NAME)
    }

    /// Working-context instance record directory.
    pub fn local_instances_dir(&self) -> PathBuf {
        self.local_state_dir
            .join(RegistryConfig::INSTANCES_DIR_NAME)
    }
}

/// Get the machine-wide state root for the current platform.
///
/// # Platform Behavior
/// - **Windows**: `%LOCALAPPDATA%\beacon`, falling back to `%APPDATA%` and
///   then the home directory
/// - **macOS**: `~/Library/Application Support/beacon`
/// - **Linux**: `$XDG_RUNTIME_DIR/beacon`, else `~/.local/share/beacon`
pub fn global_state_root() -> Result<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        for var in ["LOCALAPPDATA", "APPDATA"] {
            if let Some(base) = std::env::var_os(var) {
                return Ok(PathBuf::from(base).join(RegistryConfig::STATE_DIR_NAME));
            }
        }
        let home = home_dir()?;
        Ok(home.join(RegistryConfig::STATE_DIR_NAME))
    }

    #[cfg(target_os = "macos")]
    {
        let home = home_dir()?;
        Ok(home
            .join("Library")
            .join("Application Support")
            .join(RegistryConfig::STATE_DIR_NAME))
    }

    #[cfg(all(unix, not(target_os = "macos")))]
    {
        if let Some(runtime_dir) = std::env::var_os("XDG_RUNTIME_DIR") {
            return Ok(PathBuf::from(runtime_dir).join(RegistryConfig::STATE_DIR_NAME));
        }
        let home = home_dir()?;
        Ok(home
            .join(".local")
            .join("share")
            .join(RegistryConfig::STATE_DIR_NAME))
    }

    #[cfg(not(any(unix, windows)))]
    {
        let home = home_dir()?;
        Ok(home.join(RegistryConfig::STATE_DIR_NAME))
    }
}

fn home_dir() -> Result<PathBuf> {
    dirs::home_dir().ok_or_else(|| BeaconError::Config {
        message: "Could not determine home directory".to_string(),
    })
}
