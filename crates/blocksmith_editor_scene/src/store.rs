// SPDX-License-Identifier: MIT OR Apache-2.0
//! The block store.
//!
//! The store is the only place blocks are created and destroyed. Other
//! components may write transforms and outlines, but lifecycle stays here.

use crate::block::{Block, BlockId, OutlineColor};
use crate::error::SceneError;
use crate::math::{Aabb, Ray, Transform};
use glam::Mat4;
use indexmap::IndexMap;

/// Nearest block hit by a ray
#[derive(Debug, Clone, PartialEq)]
pub struct RayHit {
    /// Root block that owns the hit geometry
    pub block_id: BlockId,
    /// Distance along the ray
    pub distance: f32,
}

/// Authoritative map of root blocks
#[derive(Debug, Clone)]
pub struct BlockStore {
    blocks: IndexMap<BlockId, Block>,
    next_id: u64,
}

impl BlockStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            blocks: IndexMap::new(),
            next_id: 1,
        }
    }

    /// Number of root blocks
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Whether the store holds no blocks
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Iterate root blocks in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &Block> {
        self.blocks.values()
    }

    /// Root block ids in insertion order
    pub fn ids(&self) -> Vec<BlockId> {
        self.blocks.keys().cloned().collect()
    }

    /// Get a root block
    pub fn get(&self, id: &BlockId) -> Option<&Block> {
        self.blocks.get(id)
    }

    /// Get a mutable root block
    pub fn get_mut(&mut self, id: &BlockId) -> Option<&mut Block> {
        self.blocks.get_mut(id)
    }

    /// Whether `id` is a root block
    pub fn contains_root(&self, id: &BlockId) -> bool {
        self.blocks.contains_key(id)
    }

    /// Whether `id` is used by any block, root or nested
    pub fn contains_id(&self, id: &BlockId) -> bool {
        self.blocks.contains_key(id) || self.blocks.values().any(|b| b.contains_id(id))
    }

    /// Position of a root block in insertion order
    pub fn index_of(&self, id: &BlockId) -> Option<usize> {
        self.blocks.get_index_of(id)
    }

    /// Find a block anywhere in the tree
    pub fn find(&self, id: &BlockId) -> Option<&Block> {
        self.blocks.values().find_map(|b| b.find(id))
    }

    /// Find a block anywhere in the tree (mutable)
    pub fn find_mut(&mut self, id: &BlockId) -> Option<&mut Block> {
        self.blocks.values_mut().find_map(|b| b.find_mut(id))
    }

    /// Id of the root block whose subtree contains `id`
    pub fn root_of(&self, id: &BlockId) -> Option<&BlockId> {
        self.blocks
            .values()
            .find(|b| b.contains_id(id))
            .map(|b| &b.id)
    }

    /// Hand out an unused `block-<n>` id
    pub fn allocate_id(&mut self) -> BlockId {
        loop {
            let id = BlockId::numbered(self.next_id);
            self.next_id += 1;
            if !self.contains_id(&id) {
                return id;
            }
        }
    }

    /// Make sure `allocate_id` never hands out `id` later on
    pub fn reserve_id(&mut self, id: &BlockId) {
        if let Some(n) = id.sequence_number() {
            self.next_id = self.next_id.max(n + 1);
        }
    }

    fn note_ids(&mut self, block: &Block) {
        for id in block.subtree_ids() {
            self.reserve_id(&id);
        }
    }

    /// Insert a root block.
    ///
    /// Fails without side effects if any id in the subtree is already in use.
    pub fn insert(&mut self, block: Block) -> Result<&Block, SceneError> {
        let index = self.blocks.len();
        self.insert_at(index, block)
    }

    /// Insert a root block at a position in the iteration order
    pub fn insert_at(&mut self, index: usize, block: Block) -> Result<&Block, SceneError> {
        let ids = block.subtree_ids();
        for (i, id) in ids.iter().enumerate() {
            if self.contains_id(id) || ids[..i].contains(id) {
                return Err(SceneError::DuplicateId(id.clone()));
            }
        }
        self.note_ids(&block);
        let id = block.id.clone();
        let index = index.min(self.blocks.len());
        self.blocks.shift_insert(index, id.clone(), block);
        self.blocks
            .get(&id)
            .ok_or(SceneError::UnknownBlock(id))
    }

    /// Create a cuboid at the given world transform
    pub fn create_cuboid(&mut self, transform: Transform) -> BlockId {
        let id = self.allocate_id();
        self.blocks.insert(id.clone(), Block::cuboid(id.clone(), transform));
        tracing::debug!("Created block {}", id);
        id
    }

    /// Remove a root block, returning it
    pub fn remove(&mut self, id: &BlockId) -> Option<Block> {
        let removed = self.blocks.shift_remove(id);
        if removed.is_some() {
            tracing::debug!("Removed block {}", id);
        }
        removed
    }

    /// Remove every block
    pub fn clear(&mut self) {
        self.blocks.clear();
        self.next_id = 1;
    }

    /// Change a block's id.
    ///
    /// Works for nested blocks too. Fails if the new id is already in use.
    pub fn rename(&mut self, id: &BlockId, new_id: BlockId) -> Result<(), SceneError> {
        if id == &new_id {
            return Ok(());
        }
        if self.contains_id(&new_id) {
            return Err(SceneError::DuplicateId(new_id));
        }

        if let Some(index) = self.blocks.get_index_of(id) {
            let Some(mut block) = self.blocks.shift_remove(id) else {
                return Err(SceneError::UnknownBlock(id.clone()));
            };
            block.id = new_id.clone();
            self.blocks.shift_insert(index, new_id, block);
            return Ok(());
        }

        let block = self
            .find_mut(id)
            .ok_or_else(|| SceneError::UnknownBlock(id.clone()))?;
        block.id = new_id;
        Ok(())
    }

    /// Set a block's display name
    pub fn set_name(&mut self, id: &BlockId, name: Option<String>) -> bool {
        match self.find_mut(id) {
            Some(block) => {
                block.name = name.filter(|n| !n.trim().is_empty());
                true
            }
            None => false,
        }
    }

    /// Transform of a root block (world space)
    pub fn transform(&self, id: &BlockId) -> Option<Transform> {
        self.blocks.get(id).map(|b| b.transform)
    }

    /// Write a root block's world transform
    pub fn set_transform(&mut self, id: &BlockId, transform: Transform) -> bool {
        match self.blocks.get_mut(id) {
            Some(block) => {
                block.transform = transform;
                true
            }
            None => false,
        }
    }

    /// World matrix of any block in the tree
    pub fn world_matrix(&self, id: &BlockId) -> Option<Mat4> {
        self.blocks
            .values()
            .find_map(|b| b.world_matrix_of(id, Mat4::IDENTITY))
    }

    /// Apply an outline color to any block in the tree
    pub fn set_outline(&mut self, id: &BlockId, outline: Option<OutlineColor>) -> bool {
        match self.find_mut(id) {
            Some(block) => {
                block.outline = outline;
                true
            }
            None => false,
        }
    }

    /// World-space bounds of a root block's geometry
    pub fn bounds(&self, id: &BlockId) -> Option<Aabb> {
        let block = self.blocks.get(id)?;
        block
            .leaf_world_matrices(Mat4::IDENTITY)
            .iter()
            .map(|(_, world)| Aabb::from_unit_cube(world))
            .reduce(|a, b| a.union(&b))
    }

    /// Nearest root block hit by `ray` among those accepted by `filter`
    pub fn raycast(&self, ray: &Ray, filter: impl Fn(&BlockId) -> bool) -> Option<RayHit> {
        let mut best: Option<RayHit> = None;
        for block in self.blocks.values().filter(|b| filter(&b.id)) {
            for (_, world) in block.leaf_world_matrices(Mat4::IDENTITY) {
                let Some(distance) = ray.intersect_unit_cube(&world) else {
                    continue;
                };
                if best.as_ref().map_or(true, |b| distance < b.distance) {
                    best = Some(RayHit {
                        block_id: block.id.clone(),
                        distance,
                    });
                }
            }
        }
        best
    }
}

impl Default for BlockStore {
    fn default() -> Self {
        Self::new()
    }
}
