//! Beacon Core - Cross-process liveness signaling and instance discovery.
//!
//! Cooperating game processes on one machine share no memory or network
//! channel, only a filesystem. This crate lets each process prove it is
//! alive and describe itself so external tooling can discover it:
//!
//! - **Heartbeat**: a fixed-path binary file stamped with "now" once per
//!   second, ending in a terminal `-1` sentinel on clean shutdown.
//! - **Instance registry**: one JSON record per scope (machine-wide and
//!   working-context), each held under a shared advisory lock for the
//!   process lifetime and deleted on clean shutdown.
//!
//! A crashed process skips cleanup by definition; the stale heartbeat
//! timestamp and the present-but-unlocked record file are the designed
//! signals that tell a crash apart from a clean exit. The [`probe`] module
//! implements the reader side of both checks.
//!
//! # Example
//!
//! ```rust,ignore
//! use beacon_core::{BeaconSession, InstanceDescriptorBuilder, StatePaths};
//!
//! #[tokio::main]
//! async fn main() -> beacon_core::Result<()> {
//!     let paths = StatePaths::resolve(&host.game_dir())?;
//!
//!     let mut builder = InstanceDescriptorBuilder::new();
//!     builder.add_disabled_feature("telemetry");
//!
//!     let session = BeaconSession::start(&paths, &host, builder)?;
//!
//!     // ... run normally; the heartbeat ticks in the background ...
//!
//!     session.shutdown();
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod descriptor;
pub mod error;
pub mod heartbeat;
pub mod host;
pub mod platform;
pub mod probe;
pub mod registry;

// Re-export commonly used types
pub use descriptor::{InstanceDescriptor, InstanceDescriptorBuilder, WorldLogRef};
pub use error::{BeaconError, Result};
pub use heartbeat::{Heartbeat, HeartbeatHandle};
pub use host::{ComponentDescriptor, HostEnvironment};
pub use platform::StatePaths;
pub use probe::{
    probe_record, read_heartbeat, HeartbeatReading, HeartbeatStatus, RecordStatus,
};
pub use registry::{InstanceRegistry, RegistrationHandle};

use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

static SESSION_STARTED: AtomicBool = AtomicBool::new(false);

/// Scoped lifetime of both protocols for this process.
///
/// Holds the heartbeat service and the published registration; dropping the
/// session (or calling [`shutdown`](BeaconSession::shutdown)) closes the
/// heartbeat with its terminal sentinel and withdraws the record files.
/// Structural release replaces process-exit hooks and keeps the protocols
/// testable.
pub struct BeaconSession {
    heartbeat: HeartbeatHandle,
    registration: Option<RegistrationHandle>,
}

impl BeaconSession {
    /// Start the heartbeat service and publish the instance records.
    ///
    /// At most one session may be started per process: a second call fails
    /// with [`BeaconError::AlreadyInitialized`], including after the first
    /// session shut down (the published state is keyed by process identity,
    /// so restarting it would overwrite history readers may rely on). A
    /// failed start does not consume the one slot.
    ///
    /// Registration failures are fatal: the heartbeat is torn down again and
    /// the error propagates, leaving the caller to decide whether the
    /// process can continue. Must be called within a tokio runtime.
    pub fn start(
        paths: &StatePaths,
        env: &dyn HostEnvironment,
        builder: InstanceDescriptorBuilder,
    ) -> Result<Self> {
        if SESSION_STARTED.swap(true, Ordering::SeqCst) {
            return Err(BeaconError::AlreadyInitialized);
        }

        debug!(
            platform = platform::current_platform(),
            local = %paths.local_state_dir().display(),
            global = %paths.global_state_root().display(),
            "Starting beacon session"
        );

        let heartbeat = Heartbeat::spawn(paths.heartbeat_file());
        let registration = match registry::InstanceRegistry::publish(paths, env, builder) {
            Ok(handle) => handle,
            Err(e) => {
                heartbeat.close();
                SESSION_STARTED.store(false, Ordering::SeqCst);
                return Err(e);
            }
        };

        Ok(Self {
            heartbeat,
            registration: Some(registration),
        })
    }

    /// Handle to the running heartbeat service.
    pub fn heartbeat(&self) -> &HeartbeatHandle {
        &self.heartbeat
    }

    /// The published registration.
    pub fn registration(&self) -> Option<&RegistrationHandle> {
        self.registration.as_ref()
    }

    /// Release both protocols now instead of at drop time.
    pub fn shutdown(self) {
        // Drop does the work.
    }

    fn release(&mut self) {
        self.heartbeat.close();
        if let Some(registration) = self.registration.take() {
            registration.release();
        }
        debug!("Beacon session shut down");
    }
}

impl Drop for BeaconSession {
    fn drop(&mut self) {
        self.release();
    }
}
