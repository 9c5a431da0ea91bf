//! Centralized configuration for the beacon protocols.
//!
//! These constants define the on-disk contract shared with external discovery
//! tooling. Readers and writers must agree on them, so they live in one place.

use std::time::Duration;

/// Heartbeat protocol configuration.
pub struct HeartbeatConfig;

impl HeartbeatConfig {
    /// Period of the beat timer. The first tick fires immediately.
    pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

    /// How many missed intervals a reader tolerates before treating the
    /// owning process as dead.
    pub const STALE_MULTIPLIER: u32 = 2;

    /// Staleness threshold consumed by readers: a beat older than this means
    /// the owner is gone even if the file still exists.
    pub const STALE_AFTER: Duration = Duration::from_millis(
        Self::TICK_INTERVAL.as_millis() as u64 * Self::STALE_MULTIPLIER as u64,
    );

    /// File name of the heartbeat file under the local state directory.
    pub const FILE_NAME: &'static str = "alive";

    /// Terminal timestamp value meaning "intentionally closed", distinct
    /// from a stale-but-numeric timestamp.
    pub const CLOSED_SENTINEL: i64 = -1;

    /// Byte offset of the owner's process id in the heartbeat file.
    pub const PID_OFFSET: u64 = 0;

    /// Byte offset of the last-beat timestamp in the heartbeat file.
    pub const BEAT_OFFSET: u64 = 8;
}

/// Instance registry configuration.
pub struct RegistryConfig;

impl RegistryConfig {
    /// Directory name holding instance records under each scope root.
    pub const INSTANCES_DIR_NAME: &'static str = "instances";

    /// Name of the per-process state directory, used both under the game
    /// directory (local scope) and under the platform data root (global scope).
    pub const STATE_DIR_NAME: &'static str = "beacon";

    /// Sentinel published in place of a process id that could not be resolved.
    pub const UNKNOWN_PID: i64 = -1;
}
