// SPDX-License-Identifier: MIT OR Apache-2.0
//! Blocks: the nodes a user places, selects and manipulates.

use crate::math::Transform;
use glam::Mat4;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Stable identifier of a block.
///
/// Generated ids follow the `block-<n>` pattern; users may rename them freely.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockId(String);

impl BlockId {
    /// Wrap an arbitrary id string
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The generated id for sequence number `n`
    pub fn numbered(n: u64) -> Self {
        Self(format!("block-{n}"))
    }

    /// The id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Sequence number if this id follows the generated pattern
    pub fn sequence_number(&self) -> Option<u64> {
        self.0.strip_prefix("block-")?.parse().ok()
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BlockId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Identifier of a component definition
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ComponentId(String);

impl ComponentId {
    /// Wrap an arbitrary id string
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh random id
    pub fn generate() -> Self {
        Self(format!("component-{}", Uuid::new_v4()))
    }

    /// The id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ComponentId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Role of a component group in the scene
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentRole {
    /// The group the component was created from
    Master,
    /// A copy placed from the definition
    Instance,
}

/// Geometry of a leaf block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PrimitiveShape {
    /// Unit cuboid scaled by the block transform
    #[default]
    Cuboid,
    /// Player spawn marker
    SpawnMarker,
}

/// What kind of scene node a block is
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockKind {
    /// Leaf geometry
    Primitive(PrimitiveShape),
    /// Plain container of child blocks
    Group,
    /// Container whose children were built from a component definition
    ComponentInstance {
        /// Definition this instance refers to
        component_id: ComponentId,
        /// Master or instance
        role: ComponentRole,
    },
}

/// Packed `0xRRGGBB` outline color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OutlineColor(pub u32);

/// A node in the scene.
///
/// Root blocks store a world transform; children store a transform relative
/// to their parent.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    /// Stable id
    pub id: BlockId,
    /// Display name override
    pub name: Option<String>,
    /// Transform (world for roots, parent-local for children)
    pub transform: Transform,
    /// Node kind
    pub kind: BlockKind,
    /// Child blocks (empty for primitives)
    pub children: Vec<Block>,
    /// Opaque gameplay generator payload
    pub generator: Option<serde_json::Value>,
    /// Set while this block is an exploded member of a component being edited
    pub edit_session: Option<ComponentId>,
    /// Currently applied outline, if any
    pub outline: Option<OutlineColor>,
}

impl Block {
    fn with_kind(id: BlockId, transform: Transform, kind: BlockKind, children: Vec<Block>) -> Self {
        Self {
            id,
            name: None,
            transform,
            kind,
            children,
            generator: None,
            edit_session: None,
            outline: None,
        }
    }

    /// A cuboid block
    pub fn cuboid(id: BlockId, transform: Transform) -> Self {
        Self::with_kind(id, transform, BlockKind::Primitive(PrimitiveShape::Cuboid), Vec::new())
    }

    /// A spawn marker block
    pub fn spawn_marker(id: BlockId, transform: Transform) -> Self {
        Self::with_kind(id, transform, BlockKind::Primitive(PrimitiveShape::SpawnMarker), Vec::new())
    }

    /// A plain group
    pub fn group(id: BlockId, transform: Transform, children: Vec<Block>) -> Self {
        Self::with_kind(id, transform, BlockKind::Group, children)
    }

    /// A component master or instance
    pub fn component_group(
        id: BlockId,
        transform: Transform,
        component_id: ComponentId,
        role: ComponentRole,
        children: Vec<Block>,
    ) -> Self {
        Self::with_kind(
            id,
            transform,
            BlockKind::ComponentInstance { component_id, role },
            children,
        )
    }

    /// Name shown in panels
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(self.id.as_str())
    }

    /// True for groups and component instances
    pub fn is_container(&self) -> bool {
        !matches!(self.kind, BlockKind::Primitive(_))
    }

    /// True for leaf geometry
    pub fn is_primitive(&self) -> bool {
        matches!(self.kind, BlockKind::Primitive(_))
    }

    /// Component reference, if this block is a component master or instance
    pub fn component(&self) -> Option<(&ComponentId, ComponentRole)> {
        match &self.kind {
            BlockKind::ComponentInstance { component_id, role } => Some((component_id, *role)),
            _ => None,
        }
    }

    /// Whether this block is a generator
    pub fn is_generator(&self) -> bool {
        self.generator.is_some()
    }

    /// Transform relative to the parent as a matrix
    pub fn local_matrix(&self) -> Mat4 {
        self.transform.to_matrix()
    }

    /// Find a block by id in this subtree
    pub fn find(&self, id: &BlockId) -> Option<&Block> {
        if &self.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(id))
    }

    /// Find a block by id in this subtree (mutable)
    pub fn find_mut(&mut self, id: &BlockId) -> Option<&mut Block> {
        if &self.id == id {
            return Some(self);
        }
        self.children.iter_mut().find_map(|child| child.find_mut(id))
    }

    /// World matrix of a descendant (or self) given this block's parent matrix
    pub fn world_matrix_of(&self, id: &BlockId, parent: Mat4) -> Option<Mat4> {
        let world = parent * self.local_matrix();
        if &self.id == id {
            return Some(world);
        }
        self.children
            .iter()
            .find_map(|child| child.world_matrix_of(id, world))
    }

    /// Whether `id` appears anywhere in this subtree
    pub fn contains_id(&self, id: &BlockId) -> bool {
        self.find(id).is_some()
    }

    /// Every id in this subtree, depth first
    pub fn subtree_ids(&self) -> Vec<BlockId> {
        let mut ids = Vec::new();
        self.collect_ids(&mut ids);
        ids
    }

    fn collect_ids(&self, out: &mut Vec<BlockId>) {
        out.push(self.id.clone());
        for child in &self.children {
            child.collect_ids(out);
        }
    }

    /// World matrices of every primitive in this subtree
    pub fn leaf_world_matrices(&self, parent: Mat4) -> Vec<(BlockId, Mat4)> {
        let mut out = Vec::new();
        self.collect_leaves(parent, &mut out);
        out
    }

    fn collect_leaves(&self, parent: Mat4, out: &mut Vec<(BlockId, Mat4)>) {
        let world = parent * self.local_matrix();
        if self.is_primitive() {
            out.push((self.id.clone(), world));
        }
        for child in &self.children {
            child.collect_leaves(world, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn test_block_id_sequence_number() {
        assert_eq!(BlockId::numbered(7).sequence_number(), Some(7));
        assert_eq!(BlockId::new("door").sequence_number(), None);
        assert_eq!(BlockId::new("block-x").sequence_number(), None);
    }

    #[test]
    fn test_nested_world_matrix() {
        let child = Block::cuboid(BlockId::new("child"), Transform::from_position(Vec3::X));
        let group = Block::group(
            BlockId::new("group"),
            Transform::from_position(Vec3::new(0.0, 2.0, 0.0)),
            vec![child],
        );

        let world = group
            .world_matrix_of(&BlockId::new("child"), Mat4::IDENTITY)
            .unwrap();
        let position = world.transform_point3(Vec3::ZERO);
        assert!(position.abs_diff_eq(Vec3::new(1.0, 2.0, 0.0), 1e-6));
        assert_eq!(group.subtree_ids().len(), 2);
        assert_eq!(group.leaf_world_matrices(Mat4::IDENTITY).len(), 1);
    }

    #[test]
    fn test_component_accessor() {
        let block = Block::component_group(
            BlockId::numbered(1),
            Transform::IDENTITY,
            ComponentId::new("component-a"),
            ComponentRole::Instance,
            Vec::new(),
        );
        let (component_id, role) = block.component().unwrap();
        assert_eq!(component_id.as_str(), "component-a");
        assert_eq!(role, ComponentRole::Instance);
        assert!(block.is_container());
    }
}
