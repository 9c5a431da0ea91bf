//! Reader-side discovery example - classify published instances.
//!
//! Scans an instances directory, probes each record's lock state, and reads
//! the sibling heartbeat file when one exists.
//!
//! Usage:
//!   cargo run --package beacon-core --example probe_instances -- /path/to/game-dir

use beacon_core::{probe_record, read_heartbeat, RecordStatus, StatePaths};
use std::path::PathBuf;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let game_dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));

    let paths = StatePaths::resolve(&game_dir)?;

    match read_heartbeat(&paths.heartbeat_file())? {
        Some(reading) => {
            let now = chrono::Utc::now().timestamp_millis();
            println!(
                "Heartbeat: pid {} last beat {} -> {:?}",
                reading.pid,
                reading.last_beat,
                reading.status(now)
            );
        }
        None => println!("No heartbeat file at {}", paths.heartbeat_file().display()),
    }

    let instances_dir = paths.local_instances_dir();
    if !instances_dir.is_dir() {
        println!("No instances directory at {}", instances_dir.display());
        return Ok(());
    }

    for entry in std::fs::read_dir(&instances_dir)? {
        let path = entry?.path();
        if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
            continue;
        }
        match probe_record(&path)? {
            RecordStatus::Live => println!("  {} -> owner alive", path.display()),
            RecordStatus::Orphaned => {
                println!("  {} -> orphaned (owner crashed)", path.display())
            }
            RecordStatus::Absent => {}
        }
    }

    Ok(())
}
