// SPDX-License-Identifier: MIT OR Apache-2.0
//! Conversion between live blocks and the plain node tree.
//!
//! Component masters and instances are always written by reference: their
//! members are rebuilt from the definition on load, never stored inline.
//! Groups expand recursively with children in parent-local space.

use crate::block::{Block, BlockId, BlockKind, ComponentId, ComponentRole, PrimitiveShape};
use crate::error::SceneError;
use crate::math::{Transform, MIN_SCALE};
use crate::scenario::SavedComponent;
use crate::store::BlockStore;
use glam::Vec3;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// `{x, y, z}` triple as written to disk
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector3Data {
    /// X component
    pub x: f32,
    /// Y component
    pub y: f32,
    /// Z component
    pub z: f32,
}

impl From<Vec3> for Vector3Data {
    fn from(v: Vec3) -> Self {
        Self { x: v.x, y: v.y, z: v.z }
    }
}

impl From<Vector3Data> for Vec3 {
    fn from(v: Vector3Data) -> Self {
        Vec3::new(v.x, v.y, v.z)
    }
}

/// Transform as written to disk
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransformData {
    /// Position
    pub position: Vector3Data,
    /// Euler rotation in radians
    pub rotation: Vector3Data,
    /// Scale
    pub scale: Vector3Data,
}

impl From<&Transform> for TransformData {
    fn from(t: &Transform) -> Self {
        Self {
            position: t.position.into(),
            rotation: t.rotation.into(),
            scale: t.scale.into(),
        }
    }
}

impl TransformData {
    /// Convert to a transform
    pub fn to_transform(&self) -> Transform {
        Transform {
            position: self.position.into(),
            rotation: self.rotation.into(),
            scale: self.scale.into(),
        }
    }

    /// The transform as loaded into a scene, with scale raised to [`MIN_SCALE`]
    pub fn loaded_transform(&self) -> Transform {
        self.to_transform().with_scale_floor(MIN_SCALE)
    }
}

/// Node discriminator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    /// Leaf geometry
    Block,
    /// Plain container
    Group,
    /// Reference to a component definition
    Component,
}

/// One node of the interchange tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedNode {
    /// Node discriminator
    #[serde(rename = "type")]
    pub node_type: NodeType,
    /// World transform for roots, local for descendants
    pub transform: TransformData,
    /// Block id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<BlockId>,
    /// Display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Children of a group
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<SerializedNode>,
    /// Referenced definition of a component node
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component_id: Option<ComponentId>,
    /// Leaf is a spawn marker
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_spawn_point: bool,
    /// Leaf is a gameplay generator
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_generator: bool,
    /// Opaque generator payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generator_config: Option<serde_json::Value>,
}

impl SerializedNode {
    fn new(node_type: NodeType, transform: &Transform) -> Self {
        Self {
            node_type,
            transform: transform.into(),
            id: None,
            name: None,
            children: Vec::new(),
            component_id: None,
            is_spawn_point: false,
            is_generator: false,
            generator_config: None,
        }
    }

    /// Structural equality with a tolerance on every transform component
    pub fn approx_eq(&self, other: &SerializedNode, epsilon: f32) -> bool {
        self.node_type == other.node_type
            && self.id == other.id
            && self.name == other.name
            && self.component_id == other.component_id
            && self.is_spawn_point == other.is_spawn_point
            && self.is_generator == other.is_generator
            && self.generator_config == other.generator_config
            && self
                .transform
                .to_transform()
                .approx_eq(&other.transform.to_transform(), epsilon)
            && self.children.len() == other.children.len()
            && self
                .children
                .iter()
                .zip(&other.children)
                .all(|(a, b)| a.approx_eq(b, epsilon))
    }

    /// Every id mentioned in this subtree
    pub fn subtree_ids(&self) -> Vec<BlockId> {
        let mut ids = Vec::new();
        self.collect_ids(&mut ids);
        ids
    }

    fn collect_ids(&self, out: &mut Vec<BlockId>) {
        if let Some(id) = &self.id {
            out.push(id.clone());
        }
        for child in &self.children {
            child.collect_ids(out);
        }
    }
}

/// How ids in a node tree are treated when instantiating it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IdPolicy {
    /// Keep stored ids where they are free; allocate otherwise
    #[default]
    Preserve,
    /// Always allocate new ids (paste, duplicate)
    Fresh,
}

/// Serialize a block with its own stored transform
pub fn serialize_block(block: &Block) -> SerializedNode {
    serialize_object(block, &block.transform)
}

/// Serialize a block using `transform` for the block itself.
///
/// Descendants are always written in their parent's local space.
pub fn serialize_object(block: &Block, transform: &Transform) -> SerializedNode {
    let mut node = match &block.kind {
        BlockKind::ComponentInstance { component_id, .. } => {
            let mut node = SerializedNode::new(NodeType::Component, transform);
            node.component_id = Some(component_id.clone());
            node
        }
        BlockKind::Group => {
            let mut node = SerializedNode::new(NodeType::Group, transform);
            node.children = block.children.iter().map(serialize_block).collect();
            node
        }
        BlockKind::Primitive(shape) => {
            let mut node = SerializedNode::new(NodeType::Block, transform);
            node.is_spawn_point = *shape == PrimitiveShape::SpawnMarker;
            node.is_generator = block.generator.is_some();
            node.generator_config = block.generator.clone();
            node
        }
    };
    node.id = Some(block.id.clone());
    node.name = block.name.clone();
    node
}

/// Serialize every root block in store order
pub fn serialize_scene(store: &BlockStore) -> Vec<SerializedNode> {
    store.iter().map(serialize_block).collect()
}

/// Builds blocks from nodes against a store's id space
struct NodeBuilder<'a> {
    store: &'a mut BlockStore,
    definitions: &'a IndexMap<ComponentId, SavedComponent>,
    policy: IdPolicy,
    claimed: HashSet<BlockId>,
}

impl NodeBuilder<'_> {
    fn resolve_id(&mut self, stored: Option<&BlockId>) -> BlockId {
        if self.policy == IdPolicy::Preserve {
            if let Some(id) = stored {
                if !self.store.contains_id(id) && !self.claimed.contains(id) {
                    self.claimed.insert(id.clone());
                    return id.clone();
                }
                tracing::warn!("Block id {} already in use, assigning a new one", id);
            }
        }
        loop {
            let id = self.store.allocate_id();
            if !self.claimed.contains(&id) {
                self.claimed.insert(id.clone());
                return id;
            }
        }
    }

    fn build_node(&mut self, node: &SerializedNode) -> Block {
        match node.node_type {
            NodeType::Block => self.build_child_object(node),
            NodeType::Group => self.build_group_from_node(node),
            NodeType::Component => self.build_component_from_node(node),
        }
    }

    fn build_child_object(&mut self, node: &SerializedNode) -> Block {
        let id = self.resolve_id(node.id.as_ref());
        let transform = node.transform.loaded_transform();
        let mut block = if node.is_spawn_point {
            Block::spawn_marker(id, transform)
        } else {
            Block::cuboid(id, transform)
        };
        if node.is_generator {
            block.generator = Some(
                node.generator_config
                    .clone()
                    .unwrap_or_else(|| serde_json::Value::Object(serde_json::Map::new())),
            );
        }
        block.name = node.name.clone();
        block
    }

    fn build_group_from_node(&mut self, node: &SerializedNode) -> Block {
        let id = self.resolve_id(node.id.as_ref());
        let children = node.children.iter().map(|child| self.build_node(child)).collect();
        let mut block = Block::group(id, node.transform.loaded_transform(), children);
        block.name = node.name.clone();
        block
    }

    fn build_component_from_node(&mut self, node: &SerializedNode) -> Block {
        let Some(component_id) = node.component_id.clone() else {
            tracing::warn!("Component node without a component id, loading it as a group");
            return self.build_group_from_node(node);
        };

        let id = self.resolve_id(node.id.as_ref());
        let definitions = self.definitions;
        let children = match definitions.get(&component_id) {
            Some(definition) => {
                let mut members = definition.build_members(self.store);
                for member in &mut members {
                    if self.claimed.contains(&member.id) {
                        member.id = self.resolve_id(None);
                    } else {
                        self.claimed.insert(member.id.clone());
                    }
                }
                members
            }
            None => {
                tracing::warn!(
                    "Component definition {} not found, inserting an empty placeholder",
                    component_id
                );
                Vec::new()
            }
        };

        let mut block = Block::component_group(
            id,
            node.transform.loaded_transform(),
            component_id,
            ComponentRole::Instance,
            children,
        );
        block.name = node.name.clone();
        block
    }
}

/// Build a block tree from a node without inserting it
pub fn build_block(
    store: &mut BlockStore,
    node: &SerializedNode,
    definitions: &IndexMap<ComponentId, SavedComponent>,
    policy: IdPolicy,
) -> Block {
    if policy == IdPolicy::Preserve {
        for id in node.subtree_ids() {
            store.reserve_id(&id);
        }
    }
    let mut builder = NodeBuilder {
        store,
        definitions,
        policy,
        claimed: HashSet::new(),
    };
    builder.build_node(node)
}

/// Build a root block from a node and insert it into the store
pub fn instantiate_root_node(
    store: &mut BlockStore,
    node: &SerializedNode,
    definitions: &IndexMap<ComponentId, SavedComponent>,
    policy: IdPolicy,
) -> Result<BlockId, SceneError> {
    let block = build_block(store, node, definitions, policy);
    let id = block.id.clone();
    store.insert(block)?;
    Ok(id)
}

/// Build and insert a list of root nodes, in order.
///
/// With [`IdPolicy::Preserve`] every id in every node is reserved first, so
/// component members rebuilt from definitions never take an id that a later
/// node still has to claim.
pub fn instantiate_scene(
    store: &mut BlockStore,
    nodes: &[SerializedNode],
    definitions: &IndexMap<ComponentId, SavedComponent>,
    policy: IdPolicy,
) -> Result<Vec<BlockId>, SceneError> {
    if policy == IdPolicy::Preserve {
        for id in nodes.iter().flat_map(SerializedNode::subtree_ids) {
            store.reserve_id(&id);
        }
    }
    nodes
        .iter()
        .map(|node| instantiate_root_node(store, node, definitions, policy))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::ComponentMemberTransform;
    use glam::Mat4;

    fn sample_scene(store: &mut BlockStore) {
        let a = Block::cuboid(
            BlockId::new("a"),
            Transform {
                position: Vec3::new(1.0, 0.5, 0.0),
                rotation: Vec3::new(0.0, 0.4, 0.0),
                scale: Vec3::new(1.0, 2.0, 1.0),
            },
        );
        let b = Block::spawn_marker(BlockId::new("b"), Transform::from_position(Vec3::new(-1.0, 0.0, 0.0)));
        let mut group = Block::group(
            BlockId::new("g"),
            Transform {
                position: Vec3::new(0.0, 1.0, 4.0),
                rotation: Vec3::new(0.2, 0.0, 0.1),
                scale: Vec3::ONE,
            },
            vec![a, b],
        );
        group.name = Some("Tower".into());
        store.insert(group).unwrap();

        let mut generator = Block::cuboid(BlockId::new("gen"), Transform::from_position(Vec3::new(5.0, 0.0, 0.0)));
        generator.generator = Some(serde_json::json!({ "rate": 2 }));
        store.insert(generator).unwrap();

        store
            .insert(Block::component_group(
                BlockId::new("c1"),
                Transform::from_position(Vec3::new(0.0, 0.0, -3.0)),
                ComponentId::new("pillar"),
                ComponentRole::Instance,
                vec![Block::cuboid(BlockId::new("c1-0"), Transform::from_position(Vec3::Y))],
            ))
            .unwrap();
    }

    fn pillar_definitions() -> IndexMap<ComponentId, SavedComponent> {
        let member = ComponentMemberTransform::from(&Transform::from_position(Vec3::Y));
        let mut defs = IndexMap::new();
        defs.insert(
            ComponentId::new("pillar"),
            SavedComponent::new(ComponentId::new("pillar"), "Pillar", vec![member]),
        );
        defs
    }

    fn leaf_worlds(store: &BlockStore) -> Vec<Mat4> {
        store
            .iter()
            .flat_map(|b| b.leaf_world_matrices(Mat4::IDENTITY))
            .map(|(_, m)| m)
            .collect()
    }

    #[test]
    fn test_component_serialized_by_reference() {
        let mut store = BlockStore::new();
        sample_scene(&mut store);
        let nodes = serialize_scene(&store);
        let component = &nodes[2];
        assert_eq!(component.node_type, NodeType::Component);
        assert_eq!(component.component_id, Some(ComponentId::new("pillar")));
        assert!(component.children.is_empty());
    }

    #[test]
    fn test_wire_format() {
        let mut store = BlockStore::new();
        sample_scene(&mut store);
        let json = serde_json::to_value(serialize_scene(&store)).unwrap();
        assert_eq!(json[0]["type"], "group");
        assert_eq!(json[0]["children"][1]["isSpawnPoint"], true);
        assert_eq!(json[1]["isGenerator"], true);
        assert_eq!(json[1]["generatorConfig"]["rate"], 2);
        assert_eq!(json[2]["componentId"], "pillar");
        assert_eq!(json[0]["transform"]["position"]["z"], 4.0);
        assert!(json[1].get("children").is_none());
    }

    #[test]
    fn test_round_trip_is_stable() {
        let mut store = BlockStore::new();
        sample_scene(&mut store);
        let defs = pillar_definitions();
        let first = serialize_scene(&store);

        let mut loaded = BlockStore::new();
        for node in &first {
            instantiate_root_node(&mut loaded, node, &defs, IdPolicy::Preserve).unwrap();
        }
        let second = serialize_scene(&loaded);

        assert_eq!(first.len(), second.len());
        for (a, b) in first.iter().zip(&second) {
            assert!(a.approx_eq(b, 1e-5));
        }

        let before = leaf_worlds(&store);
        let after = leaf_worlds(&loaded);
        assert_eq!(before.len(), after.len());
        for (a, b) in before.iter().zip(&after) {
            assert!(a.abs_diff_eq(*b, 1e-5));
        }
    }

    #[test]
    fn test_missing_definition_yields_placeholder() {
        let mut store = BlockStore::new();
        sample_scene(&mut store);
        let nodes = serialize_scene(&store);

        let mut loaded = BlockStore::new();
        let id = instantiate_root_node(&mut loaded, &nodes[2], &IndexMap::new(), IdPolicy::Preserve).unwrap();
        let block = loaded.get(&id).unwrap();
        assert_eq!(block.component().map(|(c, _)| c.as_str()), Some("pillar"));
        assert!(block.children.is_empty());
    }

    #[test]
    fn test_fresh_policy_never_reuses_ids() {
        let mut store = BlockStore::new();
        sample_scene(&mut store);
        let nodes = serialize_scene(&store);
        let id = instantiate_root_node(&mut store, &nodes[0], &IndexMap::new(), IdPolicy::Fresh).unwrap();
        assert_ne!(id, BlockId::new("g"));
        assert_eq!(store.len(), 4);
    }

    #[test]
    fn test_preserve_policy_resolves_collisions() {
        let mut store = BlockStore::new();
        sample_scene(&mut store);
        let nodes = serialize_scene(&store);
        // Same ids are taken, so every block gets a new one
        let id = instantiate_root_node(&mut store, &nodes[0], &IndexMap::new(), IdPolicy::Preserve).unwrap();
        assert_ne!(id, BlockId::new("g"));
        let block = store.get(&id).unwrap();
        assert!(block.children.iter().all(|c| c.id != BlockId::new("a")));
    }

    #[test]
    fn test_component_first_keeps_later_ids() {
        let mut store = BlockStore::new();
        store
            .insert(Block::component_group(
                BlockId::new("c1"),
                Transform::IDENTITY,
                ComponentId::new("pillar"),
                ComponentRole::Instance,
                vec![Block::cuboid(BlockId::new("c1-0"), Transform::from_position(Vec3::Y))],
            ))
            .unwrap();
        store.create_cuboid(Transform::from_position(Vec3::X));
        store.create_cuboid(Transform::from_position(Vec3::Z));
        let first = serialize_scene(&store);

        let mut loaded = BlockStore::new();
        let ids = instantiate_scene(&mut loaded, &first, &pillar_definitions(), IdPolicy::Preserve).unwrap();
        let second = serialize_scene(&loaded);

        assert_eq!(ids, store.ids());
        let before: Vec<_> = first.iter().map(|n| n.id.clone()).collect();
        let after: Vec<_> = second.iter().map(|n| n.id.clone()).collect();
        assert_eq!(before, after);
        let member_id = &loaded.get(&ids[0]).unwrap().children[0].id;
        assert!(!ids.contains(member_id));
    }

    #[test]
    fn test_load_raises_tiny_scale() {
        let mut node = SerializedNode::new(NodeType::Block, &Transform::IDENTITY);
        node.transform.scale = Vector3Data { x: 0.01, y: 2.0, z: 0.0 };
        let mut store = BlockStore::new();
        let id = instantiate_root_node(&mut store, &node, &IndexMap::new(), IdPolicy::Preserve).unwrap();
        assert_eq!(store.transform(&id).unwrap().scale, Vec3::new(MIN_SCALE, 2.0, MIN_SCALE));
    }
}
