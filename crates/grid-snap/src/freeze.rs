//! Proximity collision response for a tagged group of entities.
//!
//! Each member remembers a home position. When another member comes closer
//! than the threshold, a member at rest jumps back home and a member being
//! dragged is nudged further along its drag direction, never past the grid's
//! edge.

use tracing::debug;

use crate::drag::clamp_extents_inside;
use crate::error::PlacementError;
use crate::grid::Grid;
use crate::point_types::WorldPoint;
use crate::scene::{EntityId, SceneAccess};

/// How far a dragged member is pushed per colliding tick.
pub const PUSH_DISTANCE: f32 = 0.5;

/// Collision state for one member.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionFreeze {
    /// The member.
    pub entity: EntityId,
    /// Position restored on collision while at rest.
    pub home: WorldPoint,
}

/// A set of entities that react to coming near one another.
#[derive(Debug, Clone, PartialEq)]
pub struct FreezeGroup {
    threshold: f32,
    members: Vec<CollisionFreeze>,
}

impl FreezeGroup {
    /// Creates a group, recording each member's current position as its home.
    pub fn new<S: SceneAccess + ?Sized>(scene: &S, members: &[EntityId], threshold: f32) -> Result<Self, PlacementError> {
        let members = members
            .iter()
            .map(|&entity| {
                Ok(CollisionFreeze {
                    entity,
                    home: scene.position(entity)?,
                })
            })
            .collect::<Result<Vec<_>, PlacementError>>()?;
        Ok(Self { threshold, members })
    }

    /// Distance under which two members collide.
    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// The members, in tick order.
    pub fn members(&self) -> &[CollisionFreeze] {
        &self.members
    }

    /// Records a new home for a member. Returns `false` if it is not in the group.
    pub fn set_home(&mut self, entity: EntityId, home: WorldPoint) -> bool {
        match self.members.iter_mut().find(|m| m.entity == entity) {
            Some(member) => {
                member.home = home;
                true
            }
            None => false,
        }
    }

    /// Runs one frame of collision checks, members in order. Positions moved
    /// earlier in the tick are seen by later members.
    ///
    /// # Arguments
    /// * `scene` - Where positions are read and written
    /// * `grid` - Bounds a pushed member's combined extents stay within
    /// * `dragged` - The entity currently held by the pointer, if any
    ///
    /// # Returns
    /// * `Result<usize, PlacementError>` - Number of members that responded to a collision
    pub fn tick<S: SceneAccess + ?Sized>(
        &self,
        scene: &mut S,
        grid: &Grid,
        dragged: Option<EntityId>,
    ) -> Result<usize, PlacementError> {
        let mut responded = 0;
        for member in &self.members {
            let position = scene.position(member.entity)?;
            let mut colliding = false;
            for other in &self.members {
                if other.entity != member.entity && position.distance(scene.position(other.entity)?) < self.threshold {
                    colliding = true;
                    break;
                }
            }
            if !colliding {
                continue;
            }

            let response = if dragged == Some(member.entity) {
                let pushed = position + (position - member.home).normalized() * PUSH_DISTANCE;
                clamp_extents_inside(scene, grid, member.entity, pushed)?
            } else {
                member.home
            };
            scene.set_position(member.entity, response)?;
            debug!(name = scene.name(member.entity), position = %response, "Collision response");
            responded += 1;
        }
        Ok(responded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::Scene;

    fn cubes() -> (Scene, EntityId, EntityId) {
        let mut scene = Scene::new();
        let a = scene.spawn_root("cube_a", WorldPoint::new(0.0, 0.0, 0.0), None);
        let b = scene.spawn_root("cube_b", WorldPoint::new(3.0, 0.0, 0.0), None);
        (scene, a, b)
    }

    fn floor() -> Grid {
        Grid::new(WorldPoint::new(-5.0, 0.0, -5.0), 1.0, 10, 10).unwrap()
    }

    #[test]
    fn test_apart_members_are_untouched() {
        let (mut scene, a, b) = cubes();
        let grid = floor();
        let group = FreezeGroup::new(&scene, &[a, b], 1.0).unwrap();
        assert_eq!(group.tick(&mut scene, &grid, None).unwrap(), 0);
        assert_eq!(scene.position(b).unwrap(), WorldPoint::new(3.0, 0.0, 0.0));
    }

    #[test]
    fn test_resting_member_returns_home() {
        let (mut scene, a, b) = cubes();
        let grid = floor();
        let group = FreezeGroup::new(&scene, &[a, b], 1.0).unwrap();

        // Something else shoved b next to a
        scene.set_position(b, WorldPoint::new(0.5, 0.0, 0.0)).unwrap();
        // Both collide; each goes home, which for a is where it already is
        assert_eq!(group.tick(&mut scene, &grid, None).unwrap(), 2);
        assert_eq!(scene.position(a).unwrap(), WorldPoint::new(0.0, 0.0, 0.0));
        assert_eq!(scene.position(b).unwrap(), WorldPoint::new(3.0, 0.0, 0.0));
    }

    #[test]
    fn test_dragged_member_is_pushed_along_drag() {
        let (mut scene, a, b) = cubes();
        let grid = floor();
        let group = FreezeGroup::new(&scene, &[a, b], 1.0).unwrap();

        // b is dragged toward a, ending 0.6 away
        scene.set_position(b, WorldPoint::new(0.6, 0.0, 0.0)).unwrap();
        group.tick(&mut scene, &grid, Some(b)).unwrap();

        // Pushed 0.5 further along its drag direction (-x)
        let position = scene.position(b).unwrap();
        assert!(position.distance(WorldPoint::new(0.1, 0.0, 0.0)) < 1e-6);
    }

    #[test]
    fn test_set_home() {
        let (mut scene, a, b) = cubes();
        let grid = floor();
        let mut group = FreezeGroup::new(&scene, &[a, b], 1.0).unwrap();
        assert!(group.set_home(b, WorldPoint::new(5.0, 0.0, 5.0)));
        assert!(!group.set_home(EntityId(9), WorldPoint::ZERO));

        scene.set_position(b, WorldPoint::new(0.2, 0.0, 0.0)).unwrap();
        group.tick(&mut scene, &grid, None).unwrap();
        assert_eq!(scene.position(b).unwrap(), WorldPoint::new(5.0, 0.0, 5.0));
    }

    #[test]
    fn test_push_keeps_extents_on_grid() {
        let grid = Grid::new(WorldPoint::ZERO, 1.0, 6, 6).unwrap();
        let mut scene = Scene::new();
        let a = scene.spawn_root("crate_a", WorldPoint::new(1.0, 0.0, 2.0), Some(WorldPoint::new(0.4, 0.4, 0.4)));
        let b = scene.spawn_root("crate_b", WorldPoint::new(3.0, 0.0, 2.0), Some(WorldPoint::new(0.4, 0.4, 0.4)));
        let group = FreezeGroup::new(&scene, &[a, b], 1.0).unwrap();

        // b is dragged flush against the left edge, 0.6 from a
        scene.set_position(b, WorldPoint::new(0.4, 0.0, 2.0)).unwrap();
        assert_eq!(group.tick(&mut scene, &grid, Some(b)).unwrap(), 2);

        // The push toward -x stops at the edge
        let position = scene.position(b).unwrap();
        assert!(position.distance(WorldPoint::new(0.4, 0.0, 2.0)) < 1e-6);
        let bounds = scene.combined_extents(b).unwrap();
        assert!(bounds.min().x >= -1e-6);
        assert_eq!(scene.position(a).unwrap(), WorldPoint::new(1.0, 0.0, 2.0));
    }
}
