//! Occupancy tracking: which cells are claimed, and by whom.

use std::collections::{HashMap, HashSet};
use std::fmt;

use tracing::{debug, warn};

use crate::grid::Grid;
use crate::point_types::CellCoord;
use crate::scene::EntityId;

/// Cells claimed by committed snaps, and the per-entity cell lists behind them.
///
/// This is the only place occupancy is mutated. An entity's cells are listed in
/// pivot order, root first.
#[derive(Debug, Clone, Default)]
pub struct OccupancyTracker {
    occupied: HashSet<CellCoord>,
    cells_by_entity: HashMap<EntityId, Vec<CellCoord>>,
    unplaced: HashSet<EntityId>,
}

impl OccupancyTracker {
    /// Creates an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Frees every cell the entity last committed. No-op for unknown entities.
    pub fn release(&mut self, entity: EntityId) {
        if let Some(cells) = self.cells_by_entity.remove(&entity) {
            for cell in &cells {
                self.occupied.remove(cell);
            }
            debug!(%entity, released = cells.len(), "Released cells");
        }
    }

    /// Whether a cell is neither occupied nor already reserved in the resolution in progress.
    pub fn is_free(&self, cell: CellCoord, in_flight: &HashSet<CellCoord>) -> bool {
        !self.occupied.contains(&cell) && !in_flight.contains(&cell)
    }

    /// Replaces the entity's cells with `cells` and marks them occupied.
    ///
    /// Any cells the entity still held are released first, so committing twice
    /// never leaves stale claims behind.
    pub fn commit(&mut self, entity: EntityId, cells: Vec<CellCoord>) {
        self.release(entity);
        for &cell in &cells {
            if !self.occupied.insert(cell) {
                warn!(%entity, %cell, "Committing a cell that is already occupied");
            }
        }
        self.unplaced.remove(&entity);
        self.cells_by_entity.insert(entity, cells);
    }

    /// Flags an entity whose resolution was aborted. Cleared by the next commit.
    pub fn mark_unplaced(&mut self, entity: EntityId) {
        self.unplaced.insert(entity);
    }

    /// Whether the entity's last resolution was aborted.
    pub fn is_unplaced(&self, entity: EntityId) -> bool {
        self.unplaced.contains(&entity)
    }

    /// The cells the entity last committed.
    pub fn cells_of(&self, entity: EntityId) -> Option<&[CellCoord]> {
        self.cells_by_entity.get(&entity).map(Vec::as_slice)
    }

    /// Whether any entity has claimed the cell.
    pub fn is_occupied(&self, cell: CellCoord) -> bool {
        self.occupied.contains(&cell)
    }

    /// The entity that has claimed the cell, if any.
    pub fn owner_of(&self, cell: CellCoord) -> Option<EntityId> {
        self.cells_by_entity
            .iter()
            .find(|(_, cells)| cells.contains(&cell))
            .map(|(&entity, _)| entity)
    }

    /// Number of occupied cells.
    pub fn occupied_count(&self) -> usize {
        self.occupied.len()
    }

    /// Number of entities with committed cells.
    pub fn entity_count(&self) -> usize {
        self.cells_by_entity.len()
    }

    /// Committed placements, sorted by entity id.
    pub fn placements(&self) -> Vec<(EntityId, Vec<CellCoord>)> {
        let mut placements: Vec<_> = self
            .cells_by_entity
            .iter()
            .map(|(&entity, cells)| (entity, cells.clone()))
            .collect();
        placements.sort_by_key(|(entity, _)| *entity);
        placements
    }

    /// A printable picture of the grid's occupancy.
    pub fn view<'a>(&'a self, grid: &'a Grid) -> OccupancyView<'a> {
        OccupancyView { tracker: self, grid }
    }
}

/// Text rendering of occupancy over a grid's in-range cells. Highest row first.
pub struct OccupancyView<'a> {
    tracker: &'a OccupancyTracker,
    grid: &'a Grid,
}

impl fmt::Display for OccupancyView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} ({} occupied)", self.grid, self.tracker.occupied_count())?;
        for z in (0..self.grid.rows() as i32).rev() {
            for x in 0..self.grid.columns() as i32 {
                let glyph = if self.tracker.is_occupied(CellCoord::new(x, z)) { '#' } else { '.' };
                write!(f, "{glyph}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
