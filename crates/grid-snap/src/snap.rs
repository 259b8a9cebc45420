//! Snap resolution: moving a multi-pivot entity onto free grid cells as one rigid body.

use std::collections::HashSet;

use tracing::{debug, info, warn};

use crate::error::PlacementError;
use crate::grid::Grid;
use crate::occupancy::OccupancyTracker;
use crate::point_types::{CellCoord, WorldPoint};
use crate::scene::{EntityId, SceneAccess};

/// Radius, in cells, of the square neighborhood searched around each pivot.
pub const DEFAULT_SEARCH_RADIUS: u32 = 2;

/// What to do when a pivot finds no free cell within the search radius.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverflowPolicy {
    /// Fail the whole snap. The entity stays where it is, its previous cells stay
    /// released and the tracker flags it unplaced.
    #[default]
    Abort,
    /// Grow the neighborhood one ring at a time up to `max_radius`, then abort.
    ExpandRadius {
        /// Largest radius searched before giving up.
        max_radius: u32,
    },
}

/// Result of a successful snap.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapOutcome {
    /// Chosen cell per pivot, root first.
    pub cells: Vec<CellCoord>,
    /// Translation applied to the entity: the mean of the per-pivot deltas.
    pub mean_delta: WorldPoint,
}

/// Finds the nearest distinct free cell for every pivot of an entity and
/// translates the entity by the mean of the pivot-to-cell deltas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapResolver {
    search_radius: u32,
    overflow: OverflowPolicy,
}

impl Default for SnapResolver {
    fn default() -> Self {
        Self::new(DEFAULT_SEARCH_RADIUS, OverflowPolicy::Abort)
    }
}

impl SnapResolver {
    /// Creates a resolver.
    ///
    /// # Arguments
    /// * `search_radius` - Radius of the square neighborhood searched around each pivot's cell
    /// * `overflow` - Policy when that neighborhood holds no free cell
    pub const fn new(search_radius: u32, overflow: OverflowPolicy) -> Self {
        Self { search_radius, overflow }
    }

    /// The base search radius.
    pub fn search_radius(&self) -> u32 {
        self.search_radius
    }

    /// The overflow policy.
    pub fn overflow(&self) -> OverflowPolicy {
        self.overflow
    }

    /// Snaps an entity to the grid.
    ///
    /// The entity's previous cells are released first so they can be chosen
    /// again. Pivots are placed in order, root first; each takes the free cell
    /// whose center is closest to it, skipping cells taken by earlier pivots in
    /// this pass. The entity is then moved by the mean delta and the cells are
    /// committed.
    ///
    /// # Errors
    ///
    /// Returns `PlacementError::NoFreeCellInRadius` if some pivot cannot be
    /// placed. Nothing is moved or committed in that case and the entity is
    /// flagged unplaced.
    pub fn resolve<S: SceneAccess + ?Sized>(
        &self,
        scene: &mut S,
        tracker: &mut OccupancyTracker,
        grid: &Grid,
        entity: EntityId,
    ) -> Result<SnapOutcome, PlacementError> {
        tracker.release(entity);

        let pivots = scene.pivots(entity)?;
        let mut cells = Vec::with_capacity(pivots.len());
        let mut reserved = HashSet::with_capacity(pivots.len());
        let mut total_delta = WorldPoint::ZERO;

        for (index, &pivot) in pivots.iter().enumerate() {
            let target = grid.world_to_cell(pivot);
            let Some((cell, center)) = self.search(grid, tracker, &reserved, pivot, target) else {
                tracker.mark_unplaced(entity);
                let err = PlacementError::NoFreeCellInRadius {
                    entity,
                    pivot: index,
                    cell: target,
                    radius: self.max_radius(),
                };
                warn!(name = scene.name(entity), %err, "Snap aborted");
                return Err(err);
            };

            debug!(name = scene.name(entity), pivot = index, over = %target, chosen = %cell, "Pivot placed");
            total_delta += center - pivot;
            reserved.insert(cell);
            cells.push(cell);
        }

        let mean_delta = total_delta / pivots.len() as f32;
        let position = scene.position(entity)?;
        scene.set_position(entity, position + mean_delta)?;
        tracker.commit(entity, cells.clone());

        info!(
            name = scene.name(entity),
            pivots = pivots.len(),
            average_delta = %mean_delta,
            "Snapped to grid"
        );
        Ok(SnapOutcome { cells, mean_delta })
    }

    fn max_radius(&self) -> u32 {
        match self.overflow {
            OverflowPolicy::Abort => self.search_radius,
            OverflowPolicy::ExpandRadius { max_radius } => max_radius.max(self.search_radius),
        }
    }

    fn search(
        &self,
        grid: &Grid,
        tracker: &OccupancyTracker,
        reserved: &HashSet<CellCoord>,
        pivot: WorldPoint,
        target: CellCoord,
    ) -> Option<(CellCoord, WorldPoint)> {
        // A larger radius only needs its outer ring: every cell inside was
        // already found taken at the previous radius.
        nearest_free_cell(grid, tracker, reserved, pivot, target, self.search_radius).or_else(|| {
            (self.search_radius.saturating_add(1)..=self.max_radius())
                .find_map(|radius| scan_square(grid, tracker, reserved, pivot, target, radius, Some(radius - 1)))
        })
    }
}

/// Scans the square of cells within `radius` of `target` (increasing x, then
/// increasing z) and returns the free cell whose center is closest to `pivot`,
/// along with that center at the pivot's height. Ties go to the first cell scanned.
///
/// Cells whose coordinates would fall outside `i32` are not candidates.
pub fn nearest_free_cell(
    grid: &Grid,
    tracker: &OccupancyTracker,
    reserved: &HashSet<CellCoord>,
    pivot: WorldPoint,
    target: CellCoord,
    radius: u32,
) -> Option<(CellCoord, WorldPoint)> {
    scan_square(grid, tracker, reserved, pivot, target, radius, None)
}

/// Same scan as [`nearest_free_cell`], skipping the cells within `skip_within`
/// of `target` when given.
fn scan_square(
    grid: &Grid,
    tracker: &OccupancyTracker,
    reserved: &HashSet<CellCoord>,
    pivot: WorldPoint,
    target: CellCoord,
    radius: u32,
    skip_within: Option<u32>,
) -> Option<(CellCoord, WorldPoint)> {
    let r = i64::from(radius);
    let (tx, tz) = (i64::from(target.x), i64::from(target.z));
    let (x_lo, x_hi) = axis_range(tx, r);
    let (z_lo, z_hi) = axis_range(tz, r);
    let mut best: Option<(CellCoord, WorldPoint, f32)> = None;

    for x in x_lo..=x_hi {
        let zs = match skip_within.map(i64::from) {
            Some(inner) if (x - tx).abs() <= inner => (z_lo..=tz - inner - 1).chain(tz + inner + 1..=z_hi),
            _ => (z_lo..=z_hi).chain(1..=0),
        };
        for z in zs {
            // Both axes were clamped to i32 by `axis_range`
            let cell = CellCoord::new(x as i32, z as i32);
            if !tracker.is_free(cell, reserved) {
                continue;
            }
            let center = grid.cell_center(cell, pivot.y);
            let distance = pivot.distance(center);
            if best.is_none_or(|(_, _, best_distance)| distance < best_distance) {
                best = Some((cell, center, distance));
            }
        }
    }

    best.map(|(cell, center, _)| (cell, center))
}

fn axis_range(center: i64, radius: i64) -> (i64, i64) {
    (
        (center - radius).max(i64::from(i32::MIN)),
        (center + radius).min(i64::from(i32::MAX)),
    )
}
