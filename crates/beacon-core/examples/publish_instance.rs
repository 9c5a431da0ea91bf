//! Publish a beacon for this process - heartbeat plus instance records.
//!
//! Usage:
//!   cargo run --package beacon-core --example publish_instance -- /path/to/game-dir

use beacon_core::{
    BeaconSession, ComponentDescriptor, HostEnvironment, InstanceDescriptorBuilder, Result,
    StatePaths,
};
use std::path::PathBuf;
use std::time::Duration;

struct DemoHost {
    game_dir: PathBuf,
}

impl HostEnvironment for DemoHost {
    fn game_dir(&self) -> PathBuf {
        self.game_dir.clone()
    }

    fn is_client(&self) -> bool {
        true
    }

    fn game_version(&self) -> String {
        "1.20.1".to_string()
    }

    fn loaded_components(&self) -> Vec<ComponentDescriptor> {
        vec![ComponentDescriptor::new("Beacon Demo", "beacon-demo", "0.1")]
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Get game directory from args or use the current directory
    let game_dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));

    let host = DemoHost { game_dir };
    let paths = StatePaths::resolve(&host.game_dir())?;

    let mut builder = InstanceDescriptorBuilder::new();
    builder.add_disabled_feature("telemetry");

    println!("Publishing into:");
    println!("  local:  {}", paths.local_instances_dir().display());
    println!("  global: {}", paths.global_instances_dir().display());

    let session = BeaconSession::start(&paths, &host, builder)?;
    for path in session.registration().into_iter().flat_map(|r| r.record_paths()) {
        println!("Record published: {}", path.display());
    }

    println!("Heartbeat ticking at {} ...", paths.heartbeat_file().display());
    tokio::time::sleep(Duration::from_secs(5)).await;

    println!("Shutting down cleanly (records withdrawn, heartbeat closed)");
    session.shutdown();
    Ok(())
}
