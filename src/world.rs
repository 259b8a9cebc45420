//! Builds a ready-to-run controller from [`Settings`].

use anyhow::{Context, ensure};
use tracing::{info, warn};

use grid_snap::{
    ControllerBuilder, EntityId, FreezeGroup, Grid, GridObjectController, Scene, TopDownCamera,
};

use crate::config::Settings;

pub struct World {
    pub controller: GridObjectController<TopDownCamera>,
    pub freeze: Option<FreezeGroup>,
}

/// Spawns every machine, wires the controller and snaps the draggable
/// machines onto the grid. The freeze group's homes are taken after snapping.
pub fn build_world(settings: &Settings) -> anyhow::Result<World> {
    let mut scene = Scene::new();
    let mut draggable = Vec::new();
    for machine in &settings.machines {
        let root = scene.spawn_root(&machine.name, machine.position, machine.half_extents);
        for (index, offset) in machine.pivots.iter().enumerate() {
            scene.spawn_child(root, format!("{}/pivot{}", machine.name, index + 1), *offset, None)?;
        }
        if machine.draggable {
            draggable.push(root);
        }
    }

    let mut builder = ControllerBuilder::new(scene).resolver(settings.snap.resolver());
    if let Some(grid) = &settings.grid {
        builder = builder.grid(Grid::new(grid.origin, grid.cell_size, grid.rows, grid.columns)?);
    }
    if let Some(camera) = &settings.camera {
        ensure!(
            camera.pixels_per_unit.is_finite() && camera.pixels_per_unit > 0.0,
            "camera.pixels_per_unit must be positive, got {}",
            camera.pixels_per_unit
        );
        builder = builder.pointer_source(TopDownCamera::new(camera.pixels_per_unit, camera.view_origin));
    }
    for entity in draggable {
        builder = builder.draggable(entity);
    }

    let mut controller = builder.build()?;
    info!(grid = %controller.grid(), machines = settings.machines.len(), "Controller built");

    let placed = controller.initialize();
    if placed < controller.draggable().len() {
        warn!(placed, total = controller.draggable().len(), "Some machines could not be placed");
    }

    let freeze = settings
        .freeze
        .as_ref()
        .map(|freeze| -> anyhow::Result<FreezeGroup> {
            let members = freeze
                .members
                .iter()
                .map(|name| {
                    controller
                        .scene()
                        .find(name)
                        .with_context(|| format!("freeze member '{name}' is not a machine"))
                })
                .collect::<anyhow::Result<Vec<EntityId>>>()?;
            Ok(FreezeGroup::new(controller.scene(), &members, freeze.threshold)?)
        })
        .transpose()?;

    Ok(World { controller, freeze })
}
