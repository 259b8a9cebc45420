//! This module defines the error types used by the `grid-snap` crate.

use crate::point_types::CellCoord;
use crate::scene::EntityId;

/// Error type for placement operations.
///
/// This enum encapsulates everything that can go wrong while configuring the
/// grid, resolving snaps, or building a controller.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PlacementError {
    /// Error for an invalid cell size.
    /// This variant is returned when a grid is created with a cell size that is
    /// not a positive, finite number.
    #[error("Invalid cell size: {0}")]
    InvalidCellSize(&'static str),
    /// A required collaborator was not supplied at startup.
    /// The payload names the missing piece (for example `"grid"`).
    #[error("Missing configuration: {0}")]
    MissingConfiguration(&'static str),
    /// No free cell exists around a pivot within the search radius.
    /// The entity's previous cells have already been released when this is returned.
    #[error("No free cell within radius {radius} of {cell} for pivot {pivot} of entity {entity}")]
    NoFreeCellInRadius {
        /// Entity being resolved.
        entity: EntityId,
        /// Index of the pivot that could not be placed (0 is the root).
        pivot: usize,
        /// Cell the pivot was over.
        cell: CellCoord,
        /// Largest radius that was searched.
        radius: u32,
    },
    /// The id does not refer to a node in the scene.
    #[error("Unknown entity: {0}")]
    UnknownEntity(EntityId),
}
