use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast::{self, error::RecvError};
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info, warn};

use grid_snap::{FreezeGroup, GridObjectController, PointerEvent, PointerSource, SceneAccess};

use crate::blackboard::{Blackboard, raise_fault, touch_input};

/// Frame-driven controller loop. Applies pointer events as they arrive and,
/// on every tick, runs the freeze group and mirrors status to the blackboard.
/// Returns the controller once the pointer bus closes.
pub async fn controller_task<P: PointerSource>(
    mut controller: GridObjectController<P>,
    mut freeze: Option<FreezeGroup>,
    bb: Blackboard,
    mut events: broadcast::Receiver<Arc<PointerEvent>>,
    frame_hz: u32,
) -> anyhow::Result<GridObjectController<P>> {
    info!(frame_hz, "Controller task started.");
    let mut ticker = time::interval(Duration::from_secs_f64(1.0 / f64::from(frame_hz.max(1))));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Some(group) = &freeze {
                    let dragged = controller.active_entity();
                    let grid = *controller.grid();
                    match group.tick(controller.scene_mut(), &grid, dragged) {
                        Ok(0) => {}
                        Ok(responded) => debug!(responded, "Freeze group responded to collisions"),
                        Err(e) => raise_fault(&bb, &e.to_string()),
                    }
                }
                publish_status(&bb, &mut controller);
            }
            received = events.recv() => {
                match received {
                    Ok(event) => {
                        let held = controller.active_entity();
                        controller.handle_event(*event);
                        touch_input(&bb);

                        // A dropped member rests where it snapped
                        if let (Some(entity), None, Some(group)) = (held, controller.active_entity(), freeze.as_mut()) {
                            let position = controller.scene().position(entity)?;
                            if group.set_home(entity, position) {
                                debug!(name = controller.scene().name(entity), home = %position, "Freeze home updated");
                            }
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Controller fell behind the pointer bus; events were dropped");
                    }
                    Err(RecvError::Closed) => {
                        publish_status(&bb, &mut controller);
                        info!(
                            "Pointer bus closed. Final occupancy:\n{}",
                            controller.tracker().view(controller.grid())
                        );
                        return Ok(controller);
                    }
                }
            }
        }
    }
}

fn publish_status<P: PointerSource>(bb: &Blackboard, controller: &mut GridObjectController<P>) {
    let faults = controller.take_faults();
    let scene = controller.scene();
    let tracker = controller.tracker();

    let mut state = bb.write();
    state.frames += 1;
    state.active = controller.active_entity().map(|id| scene.name(id).to_string());
    state.placements = tracker
        .placements()
        .into_iter()
        .map(|(id, cells)| (scene.name(id).to_string(), cells))
        .collect();
    state.unplaced = controller
        .draggable()
        .iter()
        .filter(|&&id| tracker.is_unplaced(id))
        .map(|&id| scene.name(id).to_string())
        .collect();
    for fault in faults {
        let msg = fault.to_string();
        if !state.faults.contains(&msg) {
            state.faults.push(msg);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blackboard::snapshot;
    use crate::config::{ScriptEvent, ScriptStep, parse_settings};
    use crate::input::{PointerBus, replay_script};
    use crate::world::build_world;
    use grid_snap::{CellCoord, WorldPoint};

    const WORKSHOP: &str = r#"
        frame_hz = 200

        [grid]
        rows = 6
        columns = 6
        cell_size = 1.0

        [camera]
        pixels_per_unit = 50.0

        [[machines]]
        name = "boiler"
        position = { x = 0.2, y = 0.5, z = 0.3 }
        half_extents = { x = 0.4, y = 0.5, z = 0.4 }

        [[machines]]
        name = "press"
        position = { x = 2.4, y = 0.5, z = 2.7 }
        half_extents = { x = 0.4, y = 0.5, z = 0.4 }
    "#;

    fn step(event: ScriptEvent, x: f32, y: f32) -> ScriptStep {
        ScriptStep {
            event,
            x,
            y,
            delay_ms: 0,
        }
    }

    async fn run(settings_toml: &str, steps: Vec<ScriptStep>) -> (GridObjectController<grid_snap::TopDownCamera>, Blackboard) {
        let settings = parse_settings(settings_toml).unwrap();
        let world = build_world(&settings).unwrap();
        let bb: Blackboard = Arc::default();
        let bus = PointerBus::new(16);
        let rx = bus.subscribe();

        let replay = tokio::spawn(replay_script(bus, steps));
        let controller = controller_task(world.controller, world.freeze, bb.clone(), rx, settings.frame_hz)
            .await
            .unwrap();
        replay.await.unwrap().unwrap();
        (controller, bb)
    }

    #[tokio::test]
    async fn test_scripted_drag_lands_on_target_cell() {
        let steps = vec![
            // The boiler snapped to (0, 0), centered at screen (25, 25)
            step(ScriptEvent::Pressed, 25.0, 25.0),
            step(ScriptEvent::Held, 100.0, 50.0),
            step(ScriptEvent::Held, 225.0, 75.0),
            step(ScriptEvent::Released, 0.0, 0.0),
        ];
        let (controller, bb) = run(WORKSHOP, steps).await;

        let boiler = controller.scene().find("boiler").unwrap();
        assert_eq!(controller.tracker().cells_of(boiler).unwrap(), &[CellCoord::new(4, 1)]);
        assert!(controller.scene().position(boiler).unwrap().distance(WorldPoint::new(4.5, 0.5, 1.5)) < 1e-5);

        let state = snapshot(&bb);
        assert!(state.frames >= 1);
        assert_eq!(state.active, None);
        assert_eq!(state.cells_of("boiler"), Some(&[CellCoord::new(4, 1)][..]));
        assert_eq!(state.cells_of("press"), Some(&[CellCoord::new(2, 2)][..]));
        assert!(state.unplaced.is_empty());
        assert!(state.faults.is_empty());
    }

    #[tokio::test]
    async fn test_failed_snap_is_mirrored_as_fault() {
        // A 1x2 grid: the second machine has nowhere to go once dropped on the first
        let cramped = r#"
            [grid]
            rows = 1
            columns = 2
            cell_size = 1.0

            [camera]
            pixels_per_unit = 10.0

            [snap]
            search_radius = 0

            [[machines]]
            name = "lathe"
            position = { x = 0.5, y = 0.0, z = 0.5 }
            half_extents = { x = 0.4, y = 0.4, z = 0.4 }

            [[machines]]
            name = "drill"
            position = { x = 1.5, y = 0.0, z = 0.5 }
            half_extents = { x = 0.4, y = 0.4, z = 0.4 }
        "#;
        let steps = vec![
            step(ScriptEvent::Pressed, 15.0, 5.0),
            step(ScriptEvent::Held, 5.0, 5.0),
            step(ScriptEvent::Released, 0.0, 0.0),
        ];
        let (controller, bb) = run(cramped, steps).await;

        let drill = controller.scene().find("drill").unwrap();
        assert!(controller.tracker().is_unplaced(drill));

        let state = snapshot(&bb);
        assert_eq!(state.unplaced, vec!["drill".to_string()]);
        assert_eq!(state.faults.len(), 1);
        assert_eq!(state.cells_of("lathe"), Some(&[CellCoord::new(0, 0)][..]));
    }
}
