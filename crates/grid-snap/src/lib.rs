#![warn(missing_docs)]
#![doc = "Grid placement for draggable multi-pivot objects."]
#![doc = ""]
#![doc = "Objects are dragged with a pointer, kept inside a rectangular grid while"]
#![doc = "they move, and on release snapped so that every pivot sits on its own free"]
#![doc = "cell. The whole object is moved by one rigid translation: the mean of the"]
#![doc = "pivot-to-cell deltas."]

pub mod controller;
pub mod drag;
pub mod error;
pub mod freeze;
pub mod grid;
pub mod occupancy;
pub mod point_types;
pub mod scene;
pub mod snap;

pub use controller::{ControllerBuilder, GridObjectController, PointerEvent, PointerSource, TopDownCamera};
pub use drag::{DragSession, DragState, RayHit};
pub use error::PlacementError;
pub use freeze::FreezeGroup;
pub use grid::Grid;
pub use occupancy::OccupancyTracker;
pub use point_types::{CellCoord, ScreenPoint, WorldPoint};
pub use scene::{Aabb, EntityId, Scene, SceneAccess};
pub use snap::{OverflowPolicy, SnapOutcome, SnapResolver, DEFAULT_SEARCH_RADIUS};
