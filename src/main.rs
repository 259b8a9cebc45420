mod blackboard;
mod config;
mod controller_task;
mod input;
mod world;

use std::sync::Arc;

use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use blackboard::{Blackboard, snapshot};
use input::PointerBus;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    info!("Fat Machines host started.");

    let path = std::env::args().nth(1).unwrap_or_else(|| config::DEFAULT_CONFIG_PATH.to_string());
    let settings = config::load_config(&path)?;

    let world = match world::build_world(&settings) {
        Ok(world) => world,
        Err(e) => {
            error!("Failed to build the workshop: {:?}", e);
            return Err(e);
        }
    };

    let bb: Blackboard = Arc::default();
    let bus = PointerBus::new(16);
    let events = bus.subscribe();

    info!("Spawning input replay task...");
    let replay = tokio::spawn(input::replay_script(bus, settings.script.clone()));

    controller_task::controller_task(world.controller, world.freeze, bb.clone(), events, settings.frame_hz).await?;
    replay.await??;

    let state = snapshot(&bb);
    for (name, cells) in &state.placements {
        let cells: Vec<String> = cells.iter().map(ToString::to_string).collect();
        info!(machine = %name, cells = %cells.join(" "), "Final placement");
    }
    for name in &state.unplaced {
        warn!(machine = %name, "Left unplaced");
    }
    if !state.faults.is_empty() {
        warn!(faults = ?state.faults, "Faults raised during the session");
    }
    info!(frames = state.frames, "Fat Machines host finished.");
    Ok(())
}
