//! The pointer drag lifecycle: pick, move inside the grid, release and snap.

use tracing::{debug, info};

use crate::error::PlacementError;
use crate::grid::Grid;
use crate::occupancy::OccupancyTracker;
use crate::point_types::WorldPoint;
use crate::scene::{EntityId, SceneAccess};
use crate::snap::{SnapOutcome, SnapResolver};

/// Where a pointer ray met the scene.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    /// World-space hit point.
    pub point: WorldPoint,
    /// Node that was hit, or `None` for the ground.
    pub node: Option<EntityId>,
}

impl RayHit {
    /// A hit on a scene node.
    pub const fn on(node: EntityId, point: WorldPoint) -> Self {
        Self { point, node: Some(node) }
    }

    /// A hit on the ground, not on any node.
    pub const fn ground(point: WorldPoint) -> Self {
        Self { point, node: None }
    }
}

/// State of a [`DragSession`].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum DragState {
    /// Nothing is held.
    #[default]
    Idle,
    /// An entity follows the pointer.
    Dragging {
        /// The held entity.
        entity: EntityId,
        /// Entity position minus the hit point at pick time.
        pointer_offset: WorldPoint,
    },
}

/// Where `entity` may stand when moved toward `target`: its height is kept and
/// its combined extents, which need not be centered on its pivot, stay inside
/// the grid. Nothing is moved.
pub(crate) fn clamp_extents_inside<S: SceneAccess + ?Sized>(
    scene: &S,
    grid: &Grid,
    entity: EntityId,
    target: WorldPoint,
) -> Result<WorldPoint, PlacementError> {
    let current = scene.position(entity)?;
    let bounds = scene.combined_extents(entity)?;
    let center_offset = bounds.center - current;
    let mut clamped = grid.clamp_footprint(target + center_offset, bounds.half_extents) - center_offset;
    clamped.y = current.y;
    Ok(clamped)
}

/// Finds the nearest node, starting at `node` and walking up its parents, that
/// is in the draggable set.
pub fn find_draggable<S: SceneAccess + ?Sized>(scene: &S, draggables: &[EntityId], node: EntityId) -> Option<EntityId> {
    let mut current = Some(node);
    while let Some(id) = current {
        if draggables.contains(&id) {
            return Some(id);
        }
        current = scene.parent(id);
    }
    None
}

/// Single-pointer drag session: `Idle -> Dragging -> Idle`.
#[derive(Debug, Clone, Default)]
pub struct DragSession {
    state: DragState,
}

impl DragSession {
    /// Creates an idle session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state.
    pub fn state(&self) -> DragState {
        self.state
    }

    /// The entity being dragged, if any.
    pub fn active_entity(&self) -> Option<EntityId> {
        match self.state {
            DragState::Idle => None,
            DragState::Dragging { entity, .. } => Some(entity),
        }
    }

    /// Pointer pressed over `hit`.
    ///
    /// Picks the draggable ancestor of the hit node, records the pointer offset,
    /// frees the entity's cells and pulls its position inside the grid. Cells
    /// are not recomputed until release.
    ///
    /// # Returns
    /// * `Ok(Some(entity))` - A drag started
    /// * `Ok(None)` - Nothing draggable was hit, or a drag is already running
    pub fn pointer_down<S: SceneAccess + ?Sized>(
        &mut self,
        scene: &mut S,
        tracker: &mut OccupancyTracker,
        grid: &Grid,
        draggables: &[EntityId],
        hit: &RayHit,
    ) -> Result<Option<EntityId>, PlacementError> {
        if let DragState::Dragging { entity, .. } = self.state {
            debug!(name = scene.name(entity), "Pointer pressed while already dragging; ignored");
            return Ok(None);
        }

        let Some(node) = hit.node else {
            debug!(point = %hit.point, "Pointer pressed over empty ground");
            return Ok(None);
        };
        let Some(entity) = find_draggable(scene, draggables, node) else {
            debug!(name = scene.name(node), "Hit object is not draggable");
            return Ok(None);
        };

        let position = scene.position(entity)?;
        let pointer_offset = position - hit.point;
        tracker.release(entity);
        scene.set_position(entity, grid.clamp_inside(position))?;

        self.state = DragState::Dragging { entity, pointer_offset };
        info!(name = scene.name(entity), "Object selected");
        Ok(Some(entity))
    }

    /// Pointer moved to `hit` while held.
    ///
    /// Moves the dragged entity to the hit point plus the pick offset, keeping
    /// its height and keeping its combined extents inside the grid.
    ///
    /// # Returns
    /// * `Ok(Some(position))` - The entity's new position
    /// * `Ok(None)` - No drag is running
    pub fn pointer_move<S: SceneAccess + ?Sized>(
        &mut self,
        scene: &mut S,
        grid: &Grid,
        hit: &RayHit,
    ) -> Result<Option<WorldPoint>, PlacementError> {
        let DragState::Dragging { entity, pointer_offset } = self.state else {
            return Ok(None);
        };

        let clamped = clamp_extents_inside(scene, grid, entity, hit.point + pointer_offset)?;
        scene.set_position(entity, clamped)?;

        debug!(name = scene.name(entity), position = %clamped, "Moving");
        Ok(Some(clamped))
    }

    /// Pointer released.
    ///
    /// Snaps the dragged entity and returns to idle. The session is idle
    /// afterwards even if the snap fails.
    ///
    /// # Returns
    /// * `Ok(Some(outcome))` - The entity was snapped
    /// * `Ok(None)` - No drag was running
    pub fn pointer_up<S: SceneAccess + ?Sized>(
        &mut self,
        scene: &mut S,
        tracker: &mut OccupancyTracker,
        grid: &Grid,
        resolver: &SnapResolver,
    ) -> Result<Option<SnapOutcome>, PlacementError> {
        let DragState::Dragging { entity, .. } = core::mem::take(&mut self.state) else {
            return Ok(None);
        };

        info!(name = scene.name(entity), "Object released");
        resolver.resolve(scene, tracker, grid, entity).map(Some)
    }
}
