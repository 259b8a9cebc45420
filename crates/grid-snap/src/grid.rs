//! The placement grid: a rectangle of square cells lying in the world x/z plane.

use crate::error::PlacementError;
use crate::point_types::{CellCoord, WorldPoint};

/// A rectangular grid of square cells.
///
/// Cell `(0, 0)` has its lower corner at `origin`; columns grow along +x and
/// rows along +z. The grid is immutable once built.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Grid {
    /// World position of the lower corner of cell (0, 0)
    origin: WorldPoint,
    /// Edge length of one cell in world units
    cell_size: f32,
    /// Number of rows (z extent in cells)
    rows: u32,
    /// Number of columns (x extent in cells)
    columns: u32,
}

impl Grid {
    /// Creates a new Grid.
    ///
    /// # Arguments
    /// * `origin` - World position of the lower corner of cell (0, 0)
    /// * `cell_size` - Edge length of a cell, must be positive and finite
    /// * `rows` - Number of rows along z
    /// * `columns` - Number of columns along x
    ///
    /// # Returns
    /// * `Result<Self, PlacementError>` - The grid or an error if the cell size is invalid
    pub fn new(origin: WorldPoint, cell_size: f32, rows: u32, columns: u32) -> Result<Self, PlacementError> {
        if !cell_size.is_finite() {
            return Err(PlacementError::InvalidCellSize("Cell size must be finite"));
        }
        if cell_size <= 0.0 {
            return Err(PlacementError::InvalidCellSize("Cell size must be positive"));
        }

        Ok(Grid {
            origin,
            cell_size,
            rows,
            columns,
        })
    }

    /// World position of the lower corner of cell (0, 0).
    pub fn origin(&self) -> WorldPoint {
        self.origin
    }

    /// Edge length of one cell.
    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// Number of rows.
    pub fn rows(&self) -> u32 {
        self.rows
    }

    /// Number of columns.
    pub fn columns(&self) -> u32 {
        self.columns
    }

    /// Converts a world position to the cell containing it.
    ///
    /// Positions outside the grid map to cells outside `0..columns` / `0..rows`;
    /// no bounds are enforced. A point exactly on a cell boundary belongs to the
    /// cell on its positive side.
    pub fn world_to_cell(&self, p: WorldPoint) -> CellCoord {
        let x = ((p.x - self.origin.x) / self.cell_size).floor() as i32;
        let z = ((p.z - self.origin.z) / self.cell_size).floor() as i32;
        CellCoord::new(x, z)
    }

    /// Returns the center of a cell in world coordinates at height `y`.
    ///
    /// The height is taken as given; the origin's y is not added.
    pub fn cell_center(&self, cell: CellCoord, y: f32) -> WorldPoint {
        let half = self.cell_size / 2.0;
        WorldPoint::new(
            cell.x as f32 * self.cell_size + self.origin.x + half,
            y,
            cell.z as f32 * self.cell_size + self.origin.z + half,
        )
    }

    /// Returns the world-space center of the cell at `(column, row)`, at the origin's height.
    pub fn world_midpoint(&self, column: u32, row: u32) -> WorldPoint {
        self.origin
            + WorldPoint::new(
                (column as f32 + 0.5) * self.cell_size,
                0.0,
                (row as f32 + 0.5) * self.cell_size,
            )
    }

    /// Whether the cell lies within the configured rows and columns.
    pub fn contains_cell(&self, cell: CellCoord) -> bool {
        cell.x >= 0 && cell.z >= 0 && (cell.x as i64) < self.columns as i64 && (cell.z as i64) < self.rows as i64
    }

    /// Gets the world coordinates of the grid's footprint.
    ///
    /// # Returns
    /// * `(WorldPoint, WorldPoint)` - The minimum and maximum corners. Both carry the origin's y.
    pub fn world_bounds(&self) -> (WorldPoint, WorldPoint) {
        let min_p = self.origin;
        let max_p = self.origin
            + WorldPoint::new(
                self.columns as f32 * self.cell_size,
                0.0,
                self.rows as f32 * self.cell_size,
            );
        (min_p, max_p)
    }

    /// Clamps a position so that a box with the given half-extents centered on
    /// it stays inside the grid footprint. Only x and z are touched.
    ///
    /// If the box is wider than the grid on an axis, that axis is pinned to the
    /// grid's center line.
    pub fn clamp_footprint(&self, position: WorldPoint, half_extents: WorldPoint) -> WorldPoint {
        let (min_p, max_p) = self.world_bounds();
        WorldPoint::new(
            clamp_axis(position.x, min_p.x + half_extents.x, max_p.x - half_extents.x),
            position.y,
            clamp_axis(position.z, min_p.z + half_extents.z, max_p.z - half_extents.z),
        )
    }

    /// Clamps a bare position into the grid footprint. Only x and z are touched.
    pub fn clamp_inside(&self, position: WorldPoint) -> WorldPoint {
        self.clamp_footprint(position, WorldPoint::ZERO)
    }

    /// Iterates over the centers of every in-range cell, column-major.
    pub fn midpoints(&self) -> impl Iterator<Item = WorldPoint> + '_ {
        (0..self.columns).flat_map(move |x| (0..self.rows).map(move |z| self.world_midpoint(x, z)))
    }

    /// The boundary lines of the grid as `(start, end)` segments.
    ///
    /// Lines parallel to z come first (`columns + 1` of them), then lines
    /// parallel to x (`rows + 1`).
    pub fn line_segments(&self) -> Vec<(WorldPoint, WorldPoint)> {
        let width = self.columns as f32 * self.cell_size;
        let depth = self.rows as f32 * self.cell_size;
        let mut segments = Vec::with_capacity((self.columns + self.rows + 2) as usize);

        for x in 0..=self.columns {
            let offset = x as f32 * self.cell_size;
            segments.push((
                self.origin + WorldPoint::new(offset, 0.0, 0.0),
                self.origin + WorldPoint::new(offset, 0.0, depth),
            ));
        }
        for z in 0..=self.rows {
            let offset = z as f32 * self.cell_size;
            segments.push((
                self.origin + WorldPoint::new(0.0, 0.0, offset),
                self.origin + WorldPoint::new(width, 0.0, offset),
            ));
        }
        segments
    }
}

fn clamp_axis(value: f32, lo: f32, hi: f32) -> f32 {
    if lo > hi {
        (lo + hi) / 2.0
    } else {
        value.clamp(lo, hi)
    }
}

impl std::fmt::Display for Grid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Grid ({}x{}, cell size: {:.3}, origin: {})",
            self.columns, self.rows, self.cell_size, self.origin
        )
    }
}
