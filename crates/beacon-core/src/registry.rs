//! Instance record publication and lifetime.
//!
//! On publish, one JSON record describing this process is written into the
//! global and the local instances directory, and each file is held open
//! under a shared advisory lock for as long as the returned handle lives.
//! The lock mode is the external contract: the owner holds a shared lock so
//! other tooling can also take shared locks to read the record, while a
//! successful exclusive lock from outside means the owner is gone. Clean
//! release deletes the files; a crash leaves them present but unlocked,
//! which is the designed stale signal.

use crate::descriptor::InstanceDescriptorBuilder;
use crate::error::{BeaconError, Result};
use crate::host::HostEnvironment;
use crate::platform::{self, StatePaths};
use chrono::Utc;
use fs2::FileExt;
use rand::Rng;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// One published record: path, open handle, and the shared advisory lock
/// held through the handle.
struct RecordFile {
    path: PathBuf,
    file: File,
}

/// Publishes instance records and owns nothing beyond the publish step; the
/// returned [`RegistrationHandle`] carries the locks.
pub struct InstanceRegistry;

impl InstanceRegistry {
    /// Publish this process's instance record into both scopes.
    ///
    /// Creates the scope directories (failure is fatal), resolves the
    /// process id best-effort, consumes `builder` into one immutable
    /// snapshot, and writes + shared-locks one record file per scope.
    /// Registration is a required side effect: any write or lock failure
    /// fails the whole call, and already-published records are withdrawn.
    pub fn publish(
        paths: &StatePaths,
        env: &dyn HostEnvironment,
        builder: InstanceDescriptorBuilder,
    ) -> Result<RegistrationHandle> {
        publish_with_pid(paths, env, builder, platform::resolve_pid())
    }
}

fn publish_with_pid(
    paths: &StatePaths,
    env: &dyn HostEnvironment,
    builder: InstanceDescriptorBuilder,
    pid: Option<i64>,
) -> Result<RegistrationHandle> {
    let global_dir = paths.global_instances_dir();
    let local_dir = paths.local_instances_dir();
    for dir in [&global_dir, &local_dir] {
        fs::create_dir_all(dir).map_err(|e| BeaconError::Io {
            message: format!("Failed to create instances directory: {}", dir.display()),
            path: Some(dir.to_path_buf()),
            source: Some(e),
        })?;
    }

    let descriptor = builder.build(pid, env);
    let json = serde_json::to_string_pretty(&descriptor)?;
    let file_name = record_file_name(pid);

    // Records accumulate inside the handle so the error path below drops it
    // and withdraws anything already published; a half-registered process
    // never lingers.
    let mut handle = RegistrationHandle {
        records: Vec::with_capacity(2),
    };
    for dir in [global_dir, local_dir] {
        let path = dir.join(&file_name);
        handle.records.push(write_and_lock(&path, &json)?);
    }

    Ok(handle)
}

/// Record file name per scope: `<pid>.json` when the pid is known (one
/// writer per pid on a machine), otherwise a collision-resistant
/// `unknown-<epochMillis>-<random63bit>.json`.
fn record_file_name(pid: Option<i64>) -> String {
    match pid {
        Some(pid) => format!("{}.json", pid),
        None => {
            let millis = Utc::now().timestamp_millis();
            let random: i64 = rand::rng().random_range(0..i64::MAX);
            format!("unknown-{}-{}.json", millis, random)
        }
    }
}

/// Open/create, truncate, write the full document in one pass, then take a
/// shared advisory lock over the whole file.
fn write_and_lock(path: &Path, contents: &str) -> Result<RecordFile> {
    let mut file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .open(path)
        .map_err(|e| BeaconError::io_with_path(e, path))?;
    file.set_len(0)
        .map_err(|e| BeaconError::io_with_path(e, path))?;
    file.write_all(contents.as_bytes())
        .map_err(|e| BeaconError::io_with_path(e, path))?;
    FileExt::try_lock_shared(&file)
        .map_err(|e| BeaconError::io_with_path(e, path))?;

    debug!("Published instance record: {}", path.display());

    Ok(RecordFile {
        path: path.to_path_buf(),
        file,
    })
}

/// Owns the published record files for the process lifetime.
///
/// Releasing (explicitly or on drop) unlocks, closes, and deletes each file,
/// swallowing every error: the shutdown path must never fail.
pub struct RegistrationHandle {
    records: Vec<RecordFile>,
}

impl RegistrationHandle {
    /// Paths of the published record files, global scope first.
    pub fn record_paths(&self) -> Vec<&Path> {
        self.records.iter().map(|r| r.path.as_path()).collect()
    }

    /// Withdraw the records now instead of at drop time.
    pub fn release(self) {
        // Drop does the work.
    }

    fn release_records(&mut self) {
        for record in self.records.drain(..) {
            if let Err(e) = record.file.unlock() {
                warn!(
                    "Failed to unlock instance record {}: {}",
                    record.path.display(),
                    e
                );
            }
            drop(record.file);
            if let Err(e) = fs::remove_file(&record.path) {
                warn!(
                    "Failed to delete instance record {}: {}",
                    record.path.display(),
                    e
                );
            } else {
                debug!("Withdrew instance record: {}", record.path.display());
            }
        }
    }
}

impl Drop for RegistrationHandle {
    fn drop(&mut self) {
        self.release_records();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::ComponentDescriptor;
    use fs2::FileExt;
    use std::collections::HashSet;
    use tempfile::TempDir;

    struct TestHost {
        game_dir: PathBuf,
    }

    impl HostEnvironment for TestHost {
        fn game_dir(&self) -> PathBuf {
            self.game_dir.clone()
        }

        fn is_client(&self) -> bool {
            false
        }

        fn game_version(&self) -> String {
            "1.20.1".to_string()
        }

        fn loaded_components(&self) -> Vec<ComponentDescriptor> {
            vec![ComponentDescriptor::new("Core", "core", "1.0")]
        }
    }

    fn test_setup() -> (TempDir, StatePaths, TestHost) {
        let temp_dir = TempDir::new().unwrap();
        let game_dir = temp_dir.path().join("game");
        std::fs::create_dir_all(&game_dir).unwrap();
        let paths = StatePaths::from_dirs(
            game_dir.join("beacon"),
            temp_dir.path().join("global"),
        );
        (temp_dir, paths, TestHost { game_dir })
    }

    #[test]
    fn test_publish_creates_identical_records_in_both_scopes() {
        let (_temp_dir, paths, host) = test_setup();

        let handle = publish_with_pid(
            &paths,
            &host,
            InstanceDescriptorBuilder::new(),
            Some(4242),
        )
        .unwrap();

        let global = paths.global_instances_dir().join("4242.json");
        let local = paths.local_instances_dir().join("4242.json");
        assert_eq!(
            handle.record_paths(),
            vec![global.as_path(), local.as_path()]
        );

        let global_contents = std::fs::read_to_string(&global).unwrap();
        let local_contents = std::fs::read_to_string(&local).unwrap();
        assert_eq!(global_contents, local_contents);

        let parsed: serde_json::Value = serde_json::from_str(&global_contents).unwrap();
        assert_eq!(parsed["pid"], 4242);
        assert_eq!(parsed["is_server"], true);
        assert_eq!(parsed["game_version"], "1.20.1");
        assert_eq!(parsed["disabled_features"], serde_json::json!([]));
        assert_eq!(parsed["mods"][0]["id"], "core");
    }

    #[test]
    fn test_records_locked_while_handle_lives_and_deleted_on_release() {
        let (_temp_dir, paths, host) = test_setup();

        let handle = publish_with_pid(
            &paths,
            &host,
            InstanceDescriptorBuilder::new(),
            Some(100),
        )
        .unwrap();
        let local = paths.local_instances_dir().join("100.json");

        // Owner holds a shared lock: an exclusive lock attempt must fail
        let probe = File::open(&local).unwrap();
        assert!(probe.try_lock_exclusive().is_err());
        // But a second shared lock (external reader) is allowed
        assert!(probe.try_lock_shared().is_ok());
        probe.unlock().unwrap();
        drop(probe);

        // Clean exit: lock release and deletion happen together
        handle.release();
        assert!(!local.exists());
        assert!(!paths.global_instances_dir().join("100.json").exists());
    }

    #[test]
    fn test_unknown_pid_names_never_collide() {
        let names: HashSet<String> =
            (0..10_000).map(|_| record_file_name(None)).collect();
        assert_eq!(names.len(), 10_000);

        for name in &names {
            let stem = name.strip_suffix(".json").unwrap();
            let mut parts = stem.splitn(3, '-');
            assert_eq!(parts.next(), Some("unknown"));
            let millis: i64 = parts.next().unwrap().parse().unwrap();
            let random: i64 = parts.next().unwrap().parse().unwrap();
            assert!(millis > 0);
            assert!(random >= 0);
        }
    }

    #[test]
    fn test_distinct_pids_produce_distinct_names() {
        assert_ne!(record_file_name(Some(100)), record_file_name(Some(200)));
        assert_eq!(record_file_name(Some(4242)), "4242.json");
    }

    #[test]
    fn test_publish_fails_when_scope_dir_unavailable() {
        let (temp_dir, _paths, host) = test_setup();

        // Occupy the global root with a plain file so directory creation fails
        let blocked_root = temp_dir.path().join("blocked");
        std::fs::write(&blocked_root, b"blocker").unwrap();
        let paths = StatePaths::from_dirs(
            temp_dir.path().join("game").join("beacon"),
            blocked_root,
        );

        let result = publish_with_pid(
            &paths,
            &host,
            InstanceDescriptorBuilder::new(),
            Some(1),
        );
        assert!(matches!(result, Err(BeaconError::Io { .. })));
    }

    #[test]
    fn test_builder_state_flows_into_published_record() {
        let (_temp_dir, paths, host) = test_setup();

        let mut builder = InstanceDescriptorBuilder::new();
        builder.add_disabled_feature("pace-man");
        builder.add_disabled_feature("pace-man");
        builder
            .set_world_log_path(host.game_dir.join("logs").join("latest.log"))
            .unwrap();

        let handle = publish_with_pid(&paths, &host, builder, Some(7)).unwrap();
        let contents =
            std::fs::read_to_string(&handle.record_paths()[0]).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&contents).unwrap();

        assert_eq!(parsed["disabled_features"], serde_json::json!(["pace-man"]));
        assert_eq!(parsed["world_log"]["relative"], true);
        assert_eq!(parsed["world_log"]["path"], "logs/latest.log");
    }
}
