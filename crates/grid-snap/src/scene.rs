//! A minimal scene graph: an arena of nodes with parent links.
//!
//! The placement core never walks a live engine hierarchy. It reads and writes
//! transforms through [`SceneAccess`], which [`Scene`] implements.

use core::fmt;

use crate::error::PlacementError;
use crate::point_types::WorldPoint;

/// Identity of a node in a [`Scene`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub usize);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Axis-aligned box given by its center and half-extents.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Aabb {
    /// Center of the box.
    pub center: WorldPoint,
    /// Half the size of the box along each axis.
    pub half_extents: WorldPoint,
}

impl Aabb {
    /// Creates a box from its center and half-extents.
    pub const fn new(center: WorldPoint, half_extents: WorldPoint) -> Self {
        Self { center, half_extents }
    }

    /// Minimum corner.
    pub fn min(&self) -> WorldPoint {
        self.center - self.half_extents
    }

    /// Maximum corner.
    pub fn max(&self) -> WorldPoint {
        self.center + self.half_extents
    }

    /// Grows this box to also cover `other`.
    pub fn encapsulate(&mut self, other: &Aabb) {
        let (a_min, a_max) = (self.min(), self.max());
        let (b_min, b_max) = (other.min(), other.max());
        let min = WorldPoint::new(a_min.x.min(b_min.x), a_min.y.min(b_min.y), a_min.z.min(b_min.z));
        let max = WorldPoint::new(a_max.x.max(b_max.x), a_max.y.max(b_max.y), a_max.z.max(b_max.z));
        self.center = (min + max) / 2.0;
        self.half_extents = (max - min) / 2.0;
    }

    /// Whether a point lies inside the box when projected onto the x/z plane.
    pub fn contains_xz(&self, p: WorldPoint) -> bool {
        let (min, max) = (self.min(), self.max());
        p.x >= min.x && p.x <= max.x && p.z >= min.z && p.z <= max.z
    }
}

/// Transform capability the placement core consumes.
pub trait SceneAccess {
    /// World position of a node.
    fn position(&self, id: EntityId) -> Result<WorldPoint, PlacementError>;

    /// Moves a node (and with it, its whole subtree) to a world position.
    fn set_position(&mut self, id: EntityId, position: WorldPoint) -> Result<(), PlacementError>;

    /// World positions of the node's pivots: the node itself first, then its
    /// direct children in a stable order.
    fn pivots(&self, id: EntityId) -> Result<Vec<WorldPoint>, PlacementError>;

    /// Combined visual bounds of the node and all of its descendants.
    ///
    /// A subtree with no visuals yields a zero-size box at the node's position.
    fn combined_extents(&self, id: EntityId) -> Result<Aabb, PlacementError>;

    /// Parent of a node, if any.
    fn parent(&self, id: EntityId) -> Option<EntityId>;

    /// Display name of a node.
    fn name(&self, id: EntityId) -> &str;
}

#[derive(Debug, Clone)]
struct Node {
    name: String,
    parent: Option<EntityId>,
    children: Vec<EntityId>,
    /// Offset from the parent; the world position for roots
    local: WorldPoint,
    /// Half-extents of this node's own visual, centered on the node
    visual: Option<WorldPoint>,
}

/// Arena-backed scene. Ids are indices and are never reused.
#[derive(Debug, Clone, Default)]
pub struct Scene {
    nodes: Vec<Node>,
}

impl Scene {
    /// Creates an empty scene.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a root node at a world position.
    pub fn spawn_root(&mut self, name: impl Into<String>, position: WorldPoint, visual: Option<WorldPoint>) -> EntityId {
        let id = EntityId(self.nodes.len());
        self.nodes.push(Node {
            name: name.into(),
            parent: None,
            children: Vec::new(),
            local: position,
            visual,
        });
        id
    }

    /// Adds a child node at an offset from its parent.
    pub fn spawn_child(
        &mut self,
        parent: EntityId,
        name: impl Into<String>,
        offset: WorldPoint,
        visual: Option<WorldPoint>,
    ) -> Result<EntityId, PlacementError> {
        self.node(parent)?;
        let id = EntityId(self.nodes.len());
        self.nodes.push(Node {
            name: name.into(),
            parent: Some(parent),
            children: Vec::new(),
            local: offset,
            visual,
        });
        self.nodes[parent.0].children.push(id);
        Ok(id)
    }

    /// Number of nodes in the scene.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the scene has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Direct children of a node, in insertion order.
    pub fn children(&self, id: EntityId) -> &[EntityId] {
        self.nodes.get(id.0).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    /// The node followed by each of its ancestors up to the root.
    pub fn ancestors(&self, id: EntityId) -> impl Iterator<Item = EntityId> + '_ {
        let start = self.nodes.get(id.0).map(|_| id);
        core::iter::successors(start, move |current| self.nodes[current.0].parent)
    }

    /// All node ids, in creation order.
    pub fn ids(&self) -> impl Iterator<Item = EntityId> + use<> {
        (0..self.nodes.len()).map(EntityId)
    }

    /// World-space box of the node's own visual, if it has one.
    pub fn visual_bounds(&self, id: EntityId) -> Option<Aabb> {
        let half = self.nodes.get(id.0)?.visual?;
        self.position(id).ok().map(|center| Aabb::new(center, half))
    }

    /// Looks up a node by name. First match wins.
    pub fn find(&self, name: &str) -> Option<EntityId> {
        self.nodes.iter().position(|n| n.name == name).map(EntityId)
    }

    fn node(&self, id: EntityId) -> Result<&Node, PlacementError> {
        self.nodes.get(id.0).ok_or(PlacementError::UnknownEntity(id))
    }

    fn subtree_extents(&self, id: EntityId, acc: &mut Option<Aabb>) -> Result<(), PlacementError> {
        let node = self.node(id)?;
        if let Some(half) = node.visual {
            let bounds = Aabb::new(self.position(id)?, half);
            match acc {
                Some(combined) => combined.encapsulate(&bounds),
                None => *acc = Some(bounds),
            }
        }
        for &child in &node.children {
            self.subtree_extents(child, acc)?;
        }
        Ok(())
    }
}

impl SceneAccess for Scene {
    fn position(&self, id: EntityId) -> Result<WorldPoint, PlacementError> {
        let mut position = WorldPoint::ZERO;
        for node in self.ancestors(id) {
            position += self.nodes[node.0].local;
        }
        self.node(id)?;
        Ok(position)
    }

    fn set_position(&mut self, id: EntityId, position: WorldPoint) -> Result<(), PlacementError> {
        let parent_position = match self.node(id)?.parent {
            Some(parent) => self.position(parent)?,
            None => WorldPoint::ZERO,
        };
        self.nodes[id.0].local = position - parent_position;
        Ok(())
    }

    fn pivots(&self, id: EntityId) -> Result<Vec<WorldPoint>, PlacementError> {
        let root = self.position(id)?;
        let children = &self.node(id)?.children;
        let mut pivots = Vec::with_capacity(children.len() + 1);
        pivots.push(root);
        for &child in children {
            pivots.push(root + self.nodes[child.0].local);
        }
        Ok(pivots)
    }

    fn combined_extents(&self, id: EntityId) -> Result<Aabb, PlacementError> {
        let mut combined = None;
        self.subtree_extents(id, &mut combined)?;
        match combined {
            Some(bounds) => Ok(bounds),
            None => Ok(Aabb::new(self.position(id)?, WorldPoint::ZERO)),
        }
    }

    fn parent(&self, id: EntityId) -> Option<EntityId> {
        self.nodes.get(id.0).and_then(|n| n.parent)
    }

    fn name(&self, id: EntityId) -> &str {
        self.nodes.get(id.0).map_or("<unknown>", |n| n.name.as_str())
    }
}
