//! Platform abstraction layer.
//!
//! Centralizes OS-specific behavior so `#[cfg]` blocks live here rather than
//! scattered through the protocol code:
//! - `paths` - state directory resolution per platform convention
//! - `process` - best-effort process identity

pub mod paths;
pub mod process;

pub use paths::{global_state_root, StatePaths};
pub use process::resolve_pid;

/// Returns the current platform name.
pub fn current_platform() -> &'static str {
    #[cfg(target_os = "linux")]
    {
        "linux"
    }
    #[cfg(target_os = "windows")]
    {
        "windows"
    }
    #[cfg(target_os = "macos")]
    {
        "macos"
    }
    #[cfg(not(any(target_os = "linux", target_os = "windows", target_os = "macos")))]
    {
        "unknown"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_current_platform() {
        let platform = current_platform();
        assert!(["linux", "windows", "macos", "unknown"].contains(&platform));
    }
}
