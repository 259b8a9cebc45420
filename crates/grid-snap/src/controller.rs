//! The grid object controller: pointer input in, snapped placements out.
//!
//! [`GridObjectController`] ties a [`Scene`], a [`Grid`], the occupancy
//! tracker, the snap resolver and a drag session together behind one
//! event-driven entry point. Nothing it does returns an error to the caller:
//! failures are logged and kept as faults so the next frame runs normally.

use tracing::{debug, error, info, warn};

use crate::drag::{DragSession, RayHit};
use crate::error::PlacementError;
use crate::grid::Grid;
use crate::occupancy::OccupancyTracker;
use crate::point_types::{ScreenPoint, WorldPoint};
use crate::scene::{EntityId, Scene, SceneAccess};
use crate::snap::SnapResolver;

/// Turns a screen position into a hit in the scene.
pub trait PointerSource {
    /// Casts a ray from the pointer. `None` means the ray hit nothing.
    fn cast_ray(&self, scene: &Scene, screen: ScreenPoint) -> Option<RayHit>;
}

/// Orthographic camera looking straight down at the x/z plane.
///
/// Screen x maps to world +x and screen y to world +z, `pixels_per_unit`
/// pixels per world unit, with screen (0, 0) over `view_origin`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TopDownCamera {
    /// Screen pixels per world unit.
    pub pixels_per_unit: f32,
    /// World point under screen (0, 0); its y is the ground height.
    pub view_origin: WorldPoint,
}

impl TopDownCamera {
    /// Creates a camera.
    pub const fn new(pixels_per_unit: f32, view_origin: WorldPoint) -> Self {
        Self {
            pixels_per_unit,
            view_origin,
        }
    }

    /// Ground point under a screen position.
    pub fn ground_point(&self, screen: ScreenPoint) -> WorldPoint {
        WorldPoint::new(
            self.view_origin.x + screen.x / self.pixels_per_unit,
            self.view_origin.y,
            self.view_origin.z + screen.y / self.pixels_per_unit,
        )
    }
}

impl PointerSource for TopDownCamera {
    /// Hits the top face of the tallest visual under the pointer, or the ground.
    fn cast_ray(&self, scene: &Scene, screen: ScreenPoint) -> Option<RayHit> {
        let ground = self.ground_point(screen);
        let top = scene
            .ids()
            .filter_map(|id| scene.visual_bounds(id).map(|bounds| (id, bounds)))
            .filter(|(_, bounds)| bounds.contains_xz(ground))
            .max_by(|(_, a), (_, b)| a.max().y.total_cmp(&b.max().y));

        Some(match top {
            Some((id, bounds)) => RayHit::on(id, WorldPoint::new(ground.x, bounds.max().y, ground.z)),
            None => RayHit::ground(ground),
        })
    }
}

/// Edge-triggered pointer input for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    /// Button went down at a screen position.
    Pressed(ScreenPoint),
    /// Button is held with the pointer at a screen position.
    Held(ScreenPoint),
    /// Button went up.
    Released,
}

/// Builds a [`GridObjectController`], checking that required pieces are present.
#[derive(Debug)]
pub struct ControllerBuilder<P> {
    scene: Scene,
    grid: Option<Grid>,
    pointer: Option<P>,
    resolver: SnapResolver,
    draggable: Vec<EntityId>,
}

impl<P: PointerSource> ControllerBuilder<P> {
    /// Starts a builder over a scene.
    pub fn new(scene: Scene) -> Self {
        Self {
            scene,
            grid: None,
            pointer: None,
            resolver: SnapResolver::default(),
            draggable: Vec::new(),
        }
    }

    /// Sets the grid.
    pub fn grid(mut self, grid: Grid) -> Self {
        self.grid = Some(grid);
        self
    }

    /// Sets the pointer source.
    pub fn pointer_source(mut self, pointer: P) -> Self {
        self.pointer = Some(pointer);
        self
    }

    /// Replaces the default snap resolver.
    pub fn resolver(mut self, resolver: SnapResolver) -> Self {
        self.resolver = resolver;
        self
    }

    /// Adds an entity to the draggable set. Order is kept.
    pub fn draggable(mut self, entity: EntityId) -> Self {
        if !self.draggable.contains(&entity) {
            self.draggable.push(entity);
        }
        self
    }

    /// Finishes the controller.
    ///
    /// # Errors
    ///
    /// Returns `PlacementError::MissingConfiguration` if the grid or the pointer
    /// source was not set, and `PlacementError::UnknownEntity` if a draggable id
    /// is not in the scene.
    pub fn build(self) -> Result<GridObjectController<P>, PlacementError> {
        let Some(grid) = self.grid else {
            error!("Grid reference is missing!");
            return Err(PlacementError::MissingConfiguration("grid"));
        };
        let Some(pointer) = self.pointer else {
            error!("Pointer source reference is missing!");
            return Err(PlacementError::MissingConfiguration("pointer source"));
        };
        if let Some(&unknown) = self.draggable.iter().find(|id| id.0 >= self.scene.len()) {
            return Err(PlacementError::UnknownEntity(unknown));
        }

        Ok(GridObjectController {
            grid,
            scene: self.scene,
            tracker: OccupancyTracker::new(),
            resolver: self.resolver,
            pointer,
            draggable: self.draggable,
            session: DragSession::new(),
            faults: Vec::new(),
        })
    }
}

/// Drags scene entities with a pointer and keeps them snapped to a grid.
#[derive(Debug)]
pub struct GridObjectController<P> {
    grid: Grid,
    scene: Scene,
    tracker: OccupancyTracker,
    resolver: SnapResolver,
    pointer: P,
    draggable: Vec<EntityId>,
    session: DragSession,
    faults: Vec<PlacementError>,
}

impl<P: PointerSource> GridObjectController<P> {
    /// Pulls every draggable entity inside the grid and snaps it, in the
    /// draggable set's order.
    ///
    /// # Returns
    /// * `usize` - How many entities were placed
    pub fn initialize(&mut self) -> usize {
        let mut placed = 0;
        for index in 0..self.draggable.len() {
            let entity = self.draggable[index];
            let result = self.ensure_within_grid(entity).and_then(|()| {
                self.resolver
                    .resolve(&mut self.scene, &mut self.tracker, &self.grid, entity)
            });
            match result {
                Ok(_) => placed += 1,
                Err(err) => self.report(err),
            }
        }
        info!(placed, total = self.draggable.len(), occupied = self.tracker.occupied_count(), "Initialized grid objects");
        placed
    }

    /// Applies one pointer event.
    pub fn handle_event(&mut self, event: PointerEvent) {
        let result = match event {
            PointerEvent::Pressed(screen) => self.on_pressed(screen),
            PointerEvent::Held(screen) => self.on_held(screen),
            PointerEvent::Released => self.on_released(),
        };
        if let Err(err) = result {
            self.report(err);
        }
    }

    fn on_pressed(&mut self, screen: ScreenPoint) -> Result<(), PlacementError> {
        let Some(hit) = self.pointer.cast_ray(&self.scene, screen) else {
            debug!(x = screen.x, y = screen.y, "Raycast hit nothing");
            return Ok(());
        };
        self.session
            .pointer_down(&mut self.scene, &mut self.tracker, &self.grid, &self.draggable, &hit)?;
        Ok(())
    }

    fn on_held(&mut self, screen: ScreenPoint) -> Result<(), PlacementError> {
        if self.session.active_entity().is_none() {
            return Ok(());
        }
        if let Some(hit) = self.pointer.cast_ray(&self.scene, screen) {
            self.session.pointer_move(&mut self.scene, &self.grid, &hit)?;
        }
        Ok(())
    }

    fn on_released(&mut self) -> Result<(), PlacementError> {
        self.session
            .pointer_up(&mut self.scene, &mut self.tracker, &self.grid, &self.resolver)?;
        Ok(())
    }

    fn ensure_within_grid(&mut self, entity: EntityId) -> Result<(), PlacementError> {
        let position = self.scene.position(entity)?;
        let adjusted = self.grid.clamp_inside(position);
        self.scene.set_position(entity, adjusted)?;
        debug!(name = self.scene.name(entity), position = %adjusted, "Adjusted to stay inside grid");
        Ok(())
    }

    fn report(&mut self, err: PlacementError) {
        match &err {
            PlacementError::NoFreeCellInRadius { entity, .. } => {
                warn!(name = self.scene.name(*entity), %err, "Entity left unplaced")
            }
            _ => error!(%err, "Placement failed"),
        }
        self.faults.push(err);
    }

    /// Faults recorded since the last [`take_faults`](Self::take_faults).
    pub fn faults(&self) -> &[PlacementError] {
        &self.faults
    }

    /// Drains the recorded faults.
    pub fn take_faults(&mut self) -> Vec<PlacementError> {
        core::mem::take(&mut self.faults)
    }

    /// The grid.
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// The scene.
    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    /// Mutable access to the scene, for collaborators that move entities.
    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    /// The occupancy tracker.
    pub fn tracker(&self) -> &OccupancyTracker {
        &self.tracker
    }

    /// The draggable set, in order.
    pub fn draggable(&self) -> &[EntityId] {
        &self.draggable
    }

    /// Whether a drag is running.
    pub fn is_dragging(&self) -> bool {
        self.session.active_entity().is_some()
    }

    /// The entity being dragged, if any.
    pub fn active_entity(&self) -> Option<EntityId> {
        self.session.active_entity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::point_types::CellCoord;

    // 10 px per unit, screen (0,0) over world (0,0,0)
    fn camera() -> TopDownCamera {
        TopDownCamera::new(10.0, WorldPoint::ZERO)
    }

    fn grid() -> Grid {
        Grid::new(WorldPoint::ZERO, 1.0, 6, 6).unwrap()
    }

    fn workshop() -> (Scene, EntityId, EntityId, EntityId) {
        let mut scene = Scene::new();
        let boiler = scene.spawn_root("boiler", WorldPoint::new(0.2, 0.5, 0.3), Some(WorldPoint::new(0.4, 0.5, 0.4)));
        let pipe = scene
            .spawn_child(boiler, "pipe", WorldPoint::new(1.0, 0.0, 0.0), Some(WorldPoint::new(0.4, 0.2, 0.2)))
            .unwrap();
        let pump = scene.spawn_root("pump", WorldPoint::new(8.0, 0.5, 4.5), Some(WorldPoint::new(0.4, 0.4, 0.4)));
        (scene, boiler, pipe, pump)
    }

    fn controller() -> (GridObjectController<TopDownCamera>, EntityId, EntityId, EntityId) {
        let (scene, boiler, pipe, pump) = workshop();
        let controller = ControllerBuilder::new(scene)
            .grid(grid())
            .pointer_source(camera())
            .draggable(boiler)
            .draggable(pump)
            .build()
            .unwrap();
        (controller, boiler, pipe, pump)
    }

    #[test]
    fn test_build_requires_grid_and_pointer() {
        let (scene, ..) = workshop();
        let err = ControllerBuilder::<TopDownCamera>::new(scene.clone())
            .pointer_source(camera())
            .build()
            .unwrap_err();
        assert_eq!(err, PlacementError::MissingConfiguration("grid"));

        let err = ControllerBuilder::<TopDownCamera>::new(scene.clone()).grid(grid()).build().unwrap_err();
        assert_eq!(err, PlacementError::MissingConfiguration("pointer source"));

        let err = ControllerBuilder::new(scene)
            .grid(grid())
            .pointer_source(camera())
            .draggable(EntityId(77))
            .build()
            .unwrap_err();
        assert_eq!(err, PlacementError::UnknownEntity(EntityId(77)));
    }

    #[test]
    fn test_camera_hits_tallest_visual() {
        let (scene, boiler, pipe, _) = workshop();
        let cam = camera();

        // Over the boiler body only
        let hit = cam.cast_ray(&scene, ScreenPoint::new(2.0, 3.0)).unwrap();
        assert_eq!(hit.node, Some(boiler));
        assert!((hit.point.y - 1.0).abs() < 1e-6);

        // Over the pipe only
        let hit = cam.cast_ray(&scene, ScreenPoint::new(13.0, 3.0)).unwrap();
        assert_eq!(hit.node, Some(pipe));

        // Empty floor
        let hit = cam.cast_ray(&scene, ScreenPoint::new(40.0, 40.0)).unwrap();
        assert_eq!(hit, RayHit::ground(WorldPoint::new(4.0, 0.0, 4.0)));
    }

    #[test]
    fn test_initialize_clamps_then_snaps_in_order() {
        let (mut controller, boiler, _, pump) = controller();
        assert_eq!(controller.initialize(), 2);

        // Boiler root (0.2, 0.3) -> (0,0); pipe (1.2, 0.3) -> (1,0)
        assert_eq!(controller.tracker().cells_of(boiler), Some(&[CellCoord::new(0, 0), CellCoord::new(1, 0)][..]));
        let boiler_pos = controller.scene().position(boiler).unwrap();
        assert!(boiler_pos.distance(WorldPoint::new(0.5, 0.5, 0.5)) < 1e-5);

        // Pump starts at x = 8, is pulled to the grid edge x = 6, then snapped into column 5
        assert_eq!(controller.tracker().cells_of(pump), Some(&[CellCoord::new(5, 4)][..]));
        let pump_pos = controller.scene().position(pump).unwrap();
        assert!(pump_pos.distance(WorldPoint::new(5.5, 0.5, 4.5)) < 1e-5);
        assert!(controller.faults().is_empty());
    }

    #[test]
    fn test_drag_cycle_through_events() {
        let (mut controller, boiler, _, _) = controller();
        controller.initialize();

        // Grab the pipe; the boiler is the draggable ancestor
        controller.handle_event(PointerEvent::Pressed(ScreenPoint::new(15.0, 5.0)));
        assert_eq!(controller.active_entity(), Some(boiler));
        assert_eq!(controller.tracker().cells_of(boiler), None);

        controller.handle_event(PointerEvent::Held(ScreenPoint::new(35.0, 35.0)));
        let dragged = controller.scene().position(boiler).unwrap();
        assert!(dragged.distance(WorldPoint::new(2.5, 0.5, 3.5)) < 1e-5);

        controller.handle_event(PointerEvent::Released);
        assert!(!controller.is_dragging());
        assert_eq!(controller.tracker().cells_of(boiler), Some(&[CellCoord::new(2, 3), CellCoord::new(3, 3)][..]));
        assert!(controller.faults().is_empty());
    }

    #[test]
    fn test_press_on_floor_and_release_while_idle() {
        let (mut controller, ..) = controller();
        controller.initialize();
        let occupied = controller.tracker().occupied_count();

        controller.handle_event(PointerEvent::Pressed(ScreenPoint::new(45.0, 15.0)));
        assert!(!controller.is_dragging());
        controller.handle_event(PointerEvent::Held(ScreenPoint::new(10.0, 10.0)));
        controller.handle_event(PointerEvent::Released);

        assert_eq!(controller.tracker().occupied_count(), occupied);
        assert!(controller.faults().is_empty());
    }

    #[test]
    fn test_failed_snap_is_recorded_not_raised() {
        let mut scene = Scene::new();
        let mut draggable = Vec::new();
        // A 1x1 grid fits one entity; radius 0 leaves the second nowhere to go
        for i in 0..2 {
            draggable.push(scene.spawn_root(format!("crate{i}"), WorldPoint::new(0.5, 0.0, 0.5), None));
        }
        let mut builder = ControllerBuilder::new(scene)
            .grid(Grid::new(WorldPoint::ZERO, 1.0, 1, 1).unwrap())
            .pointer_source(camera())
            .resolver(SnapResolver::new(0, Default::default()));
        for id in &draggable {
            builder = builder.draggable(*id);
        }
        let mut controller = builder.build().unwrap();

        assert_eq!(controller.initialize(), 1);
        assert_eq!(controller.faults().len(), 1);
        assert!(controller.tracker().is_unplaced(draggable[1]));

        let faults = controller.take_faults();
        assert!(matches!(faults[0], PlacementError::NoFreeCellInRadius { pivot: 0, .. }));
        assert!(controller.faults().is_empty());
    }
}
