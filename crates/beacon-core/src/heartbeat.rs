//! Heartbeat file service.
//!
//! Proves liveness to external observers by stamping the current time into a
//! fixed-path binary file once per second. The file layout is two big-endian
//! i64 values: the owner's process id at offset 0, written once, and the
//! last-beat epoch millis at offset 8, rewritten every tick. On clean
//! shutdown the timestamp field is set to the `-1` sentinel; a crash leaves
//! the last real timestamp in place, and readers apply
//! [`HeartbeatConfig::STALE_AFTER`](crate::config::HeartbeatConfig::STALE_AFTER)
//! to tell the two apart.

use crate::config::{HeartbeatConfig, RegistryConfig};
use crate::platform;
use chrono::Utc;
use std::fs::{self, File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, warn};

/// State machine over the one file handle. `Closed` is terminal; `Unopened`
/// retries every tick until the target directory exists.
enum FileState {
    Unopened,
    Open(File),
    Closed,
}

struct HeartbeatInner {
    path: PathBuf,
    pid: i64,
    state: Mutex<FileState>,
    closing: AtomicBool,
}

/// Whether the tick loop should keep running.
#[derive(PartialEq)]
enum TickOutcome {
    Continue,
    Stop,
}

/// The heartbeat service. [`spawn`](Heartbeat::spawn) starts the tick task
/// and hands back an RAII handle; the service itself holds no further API.
pub struct Heartbeat;

impl Heartbeat {
    /// Start the service for this process.
    ///
    /// Resolves the process id best-effort (`-1` when unavailable, never
    /// fatal) and spawns the tick task: fixed 1 second period, first tick
    /// immediate, ticks strictly serialized. Must be called within a tokio
    /// runtime.
    ///
    /// The returned handle closes the service on [`close`](HeartbeatHandle::close)
    /// or on drop, writing the terminal sentinel.
    pub fn spawn(heartbeat_path: impl Into<PathBuf>) -> HeartbeatHandle {
        let pid = match platform::resolve_pid() {
            Some(pid) => pid,
            None => {
                warn!("Failed to resolve process id, publishing sentinel");
                RegistryConfig::UNKNOWN_PID
            }
        };

        let inner = Arc::new(HeartbeatInner {
            path: heartbeat_path.into(),
            pid,
            state: Mutex::new(FileState::Unopened),
            closing: AtomicBool::new(false),
        });

        let task_inner = inner.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(HeartbeatConfig::TICK_INTERVAL);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                if tick(&task_inner) == TickOutcome::Stop {
                    break;
                }
            }
        });

        HeartbeatHandle { inner }
    }
}

fn tick(inner: &HeartbeatInner) -> TickOutcome {
    // Shutdown race guard: a tick scheduled before close() ran must not
    // write past the sentinel.
    if inner.closing.load(Ordering::SeqCst) {
        return TickOutcome::Stop;
    }

    let mut state = match inner.state.lock() {
        Ok(state) => state,
        Err(_) => return TickOutcome::Stop,
    };

    match &mut *state {
        FileState::Closed => TickOutcome::Stop,
        FileState::Unopened => try_create(inner, &mut state),
        FileState::Open(file) => match write_beat(file) {
            Ok(()) => TickOutcome::Continue,
            Err(e) => {
                // Mid-stream write failure is fatal for this file: write the
                // sentinel if we still can, then tear down.
                error!("Failed to write heartbeat file: {}", e);
                close_locked(&mut state);
                TickOutcome::Stop
            }
        },
    }
}

/// Two-phase open: the parent of the state directory must already exist
/// (otherwise the host is still setting up and we silently retry next tick),
/// while the state directory itself is ours to create. Failing to create it
/// stops the service permanently.
fn try_create(inner: &HeartbeatInner, state: &mut FileState) -> TickOutcome {
    let Some(parent) = inner.path.parent() else {
        error!("Heartbeat path has no parent directory: {}", inner.path.display());
        *state = FileState::Closed;
        return TickOutcome::Stop;
    };

    match parent.parent() {
        Some(grandparent) if grandparent.is_dir() => {}
        _ => return TickOutcome::Continue,
    }

    if !parent.is_dir() {
        if let Err(e) = fs::create_dir_all(parent) {
            error!(
                "Failed to create heartbeat directory {}: {}",
                parent.display(),
                e
            );
            *state = FileState::Closed;
            return TickOutcome::Stop;
        }
    }

    match open_and_stamp(&inner.path, inner.pid) {
        Ok(file) => {
            debug!("Created heartbeat file: {}", inner.path.display());
            *state = FileState::Open(file);
            TickOutcome::Continue
        }
        Err(e) => {
            error!(
                "Failed to create heartbeat file {}: {}",
                inner.path.display(),
                e
            );
            *state = FileState::Closed;
            TickOutcome::Stop
        }
    }
}

/// Create/truncate the file, write the pid header, then perform a first beat.
fn open_and_stamp(path: &Path, pid: i64) -> std::io::Result<File> {
    let mut file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .open(path)?;
    file.set_len(0)?;
    file.seek(SeekFrom::Start(HeartbeatConfig::PID_OFFSET))?;
    file.write_all(&pid.to_be_bytes())?;
    write_beat(&mut file)?;
    Ok(file)
}

/// Stamp "now" into the timestamp field and force it to stable storage.
/// An unflushed beat is worthless for crash detection.
fn write_beat(file: &mut File) -> std::io::Result<()> {
    let now = Utc::now().timestamp_millis();
    file.seek(SeekFrom::Start(HeartbeatConfig::BEAT_OFFSET))?;
    file.write_all(&now.to_be_bytes())?;
    file.sync_data()
}

/// Write the terminal sentinel and drop the handle. Failures on this path
/// are logged, never escalated.
fn close_locked(state: &mut FileState) {
    if let FileState::Open(file) = state {
        let result = file
            .seek(SeekFrom::Start(HeartbeatConfig::BEAT_OFFSET))
            .and_then(|_| file.write_all(&HeartbeatConfig::CLOSED_SENTINEL.to_be_bytes()))
            .and_then(|_| file.sync_data());
        if let Err(e) = result {
            warn!("Failed to close heartbeat file: {}", e);
        }
    }
    *state = FileState::Closed;
}

/// Owning handle for a running heartbeat service.
pub struct HeartbeatHandle {
    inner: Arc<HeartbeatInner>,
}

impl HeartbeatHandle {
    /// Transition to `Closed`: stop accepting ticks, write the `-1` sentinel
    /// if the file is open, release the handle. Idempotent.
    pub fn close(&self) {
        if self.inner.closing.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Ok(mut state) = self.inner.state.lock() {
            close_locked(&mut state);
        }
        debug!("Heartbeat closed: {}", self.inner.path.display());
    }

    /// Whether the service has reached its terminal state, either through
    /// [`close`](HeartbeatHandle::close) or by tearing itself down after an
    /// I/O failure.
    pub fn is_closed(&self) -> bool {
        if self.inner.closing.load(Ordering::SeqCst) {
            return true;
        }
        match self.inner.state.lock() {
            Ok(state) => matches!(*state, FileState::Closed),
            Err(_) => true,
        }
    }
}

impl Drop for HeartbeatHandle {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_inner(path: PathBuf, pid: i64) -> HeartbeatInner {
        HeartbeatInner {
            path,
            pid,
            state: Mutex::new(FileState::Unopened),
            closing: AtomicBool::new(false),
        }
    }

    fn read_i64_at(path: &Path, offset: u64) -> i64 {
        use std::io::Read;
        let mut file = File::open(path).unwrap();
        file.seek(SeekFrom::Start(offset)).unwrap();
        let mut buf = [0u8; 8];
        file.read_exact(&mut buf).unwrap();
        i64::from_be_bytes(buf)
    }

    #[test]
    fn test_tick_waits_for_grandparent_directory() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir
            .path()
            .join("game")
            .join("beacon")
            .join("alive");
        let inner = test_inner(path.clone(), 1);

        // game/ does not exist yet: silently retried, no file, not closed
        assert!(tick(&inner) == TickOutcome::Continue);
        assert!(!path.exists());
        assert!(matches!(*inner.state.lock().unwrap(), FileState::Unopened));
    }

    #[test]
    fn test_tick_creates_own_directory_and_file() {
        let temp_dir = TempDir::new().unwrap();
        let game_dir = temp_dir.path().join("game");
        fs::create_dir_all(&game_dir).unwrap();
        let path = game_dir.join("beacon").join("alive");
        let inner = test_inner(path.clone(), 4242);

        assert!(tick(&inner) == TickOutcome::Continue);
        assert!(path.exists());
        assert_eq!(read_i64_at(&path, 0), 4242);
        assert!(read_i64_at(&path, 8) > 0);
    }

    #[test]
    fn test_beats_are_non_decreasing() {
        let temp_dir = TempDir::new().unwrap();
        let game_dir = temp_dir.path().join("game");
        fs::create_dir_all(&game_dir).unwrap();
        let path = game_dir.join("beacon").join("alive");
        let inner = test_inner(path.clone(), 1);

        tick(&inner);
        let first = read_i64_at(&path, 8);
        std::thread::sleep(std::time::Duration::from_millis(5));
        tick(&inner);
        let second = read_i64_at(&path, 8);

        assert!(second >= first);
    }

    #[test]
    fn test_close_writes_sentinel_and_stops_ticks() {
        let temp_dir = TempDir::new().unwrap();
        let game_dir = temp_dir.path().join("game");
        fs::create_dir_all(&game_dir).unwrap();
        let path = game_dir.join("beacon").join("alive");
        let inner = test_inner(path.clone(), 99);

        tick(&inner);
        inner.closing.store(true, Ordering::SeqCst);
        close_locked(&mut inner.state.lock().unwrap());

        assert_eq!(read_i64_at(&path, 0), 99);
        assert_eq!(read_i64_at(&path, 8), HeartbeatConfig::CLOSED_SENTINEL);

        // Ticks after close never touch the file again
        assert!(tick(&inner) == TickOutcome::Stop);
        assert_eq!(read_i64_at(&path, 8), HeartbeatConfig::CLOSED_SENTINEL);
    }

    #[test]
    fn test_crash_leaves_last_timestamp() {
        let temp_dir = TempDir::new().unwrap();
        let game_dir = temp_dir.path().join("game");
        fs::create_dir_all(&game_dir).unwrap();
        let path = game_dir.join("beacon").join("alive");
        let inner = test_inner(path.clone(), 1);

        tick(&inner);
        let last = read_i64_at(&path, 8);
        drop(inner); // no close: simulated crash

        assert_eq!(read_i64_at(&path, 8), last);
        assert_ne!(last, HeartbeatConfig::CLOSED_SENTINEL);
    }

    #[test]
    fn test_directory_creation_failure_is_terminal() {
        let temp_dir = TempDir::new().unwrap();
        let game_dir = temp_dir.path().join("game");
        fs::create_dir_all(&game_dir).unwrap();
        // Occupy the state directory path with a plain file
        fs::write(game_dir.join("beacon"), b"blocker").unwrap();
        let path = game_dir.join("beacon").join("alive");
        let inner = test_inner(path, 1);

        assert!(tick(&inner) == TickOutcome::Stop);
        assert!(matches!(*inner.state.lock().unwrap(), FileState::Closed));
    }

    #[tokio::test(start_paused = true)]
    async fn test_spawned_service_creates_and_closes_file() {
        let temp_dir = TempDir::new().unwrap();
        let game_dir = temp_dir.path().join("game");
        fs::create_dir_all(&game_dir).unwrap();
        let path = game_dir.join("beacon").join("alive");

        let handle = Heartbeat::spawn(path.clone());
        // Let a few virtual-time ticks run
        tokio::time::sleep(std::time::Duration::from_secs(3)).await;
        assert!(path.exists());
        assert!(read_i64_at(&path, 8) > 0);

        handle.close();
        assert!(handle.is_closed());
        assert_eq!(read_i64_at(&path, 8), HeartbeatConfig::CLOSED_SENTINEL);

        // Any tick still in flight stops at the closing flag
        tokio::time::sleep(std::time::Duration::from_secs(2)).await;
        assert_eq!(read_i64_at(&path, 8), HeartbeatConfig::CLOSED_SENTINEL);
    }
}
