//! Reader-side liveness checks.
//!
//! The consumer half of both protocols, for external discovery tooling:
//! parse another process's heartbeat file and classify it against the
//! documented staleness threshold, or probe an instance record's lock state
//! to tell a live owner from a crashed one. Both operations are read-only
//! and lock-respecting; "file absent" and "file stale" are normal, expected
//! conditions, not errors.

use crate::config::HeartbeatConfig;
use crate::error::{BeaconError, Result};
use fs2::FileExt;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Classification of a heartbeat reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartbeatStatus {
    /// The last beat is within [`HeartbeatConfig::STALE_AFTER`].
    Alive,
    /// The last beat is older than the threshold: the owner is gone even
    /// though the file still exists.
    Stale,
    /// The terminal sentinel was written: the owner closed intentionally.
    Closed,
}

/// Decoded contents of a heartbeat file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeartbeatReading {
    /// Owner's process id, or `-1` when it could not determine one.
    pub pid: i64,
    /// Last-beat epoch millis, or the `-1` closed sentinel.
    pub last_beat: i64,
}

impl HeartbeatReading {
    /// Classify this reading as of `now_millis`.
    pub fn status(&self, now_millis: i64) -> HeartbeatStatus {
        if self.last_beat == HeartbeatConfig::CLOSED_SENTINEL {
            HeartbeatStatus::Closed
        } else if now_millis - self.last_beat > HeartbeatConfig::STALE_AFTER.as_millis() as i64 {
            HeartbeatStatus::Stale
        } else {
            HeartbeatStatus::Alive
        }
    }
}

/// Parse the 16-byte heartbeat layout.
///
/// Returns `Ok(None)` when the file does not exist, which readers treat the
/// same as "never registered".
pub fn read_heartbeat(path: &Path) -> Result<Option<HeartbeatReading>> {
    let mut file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(BeaconError::io_with_path(e, path)),
    };

    let mut pid_buf = [0u8; 8];
    let mut beat_buf = [0u8; 8];
    file.read_exact(&mut pid_buf)
        .and_then(|_| file.read_exact(&mut beat_buf))
        .map_err(|e| BeaconError::io_with_path(e, path))?;

    Ok(Some(HeartbeatReading {
        pid: i64::from_be_bytes(pid_buf),
        last_beat: i64::from_be_bytes(beat_buf),
    }))
}

/// Outcome of probing an instance record file for owner liveness.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordStatus {
    /// No record file: the process never registered or fully cleaned up.
    Absent,
    /// The owner still holds its shared lock.
    Live,
    /// The file exists but is lockable: the owner died without cleanup.
    Orphaned,
}

/// Attempt an exclusive lock on a record file to decide whether its owner is
/// still running. The lock is released immediately; the file is left as-is.
pub fn probe_record(path: &Path) -> Result<RecordStatus> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Ok(RecordStatus::Absent)
        }
        Err(e) => return Err(BeaconError::io_with_path(e, path)),
    };

    match file.try_lock_exclusive() {
        Ok(()) => {
            let _ = file.unlock();
            Ok(RecordStatus::Orphaned)
        }
        Err(e) if e.kind() == fs2::lock_contended_error().kind() => Ok(RecordStatus::Live),
        Err(e) => Err(BeaconError::io_with_path(e, path)),
    }
}
