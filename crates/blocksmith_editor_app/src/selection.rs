// SPDX-License-Identifier: MIT OR Apache-2.0
//! Selection authority.
//!
//! Every selection change funnels through one routine that keeps outlines,
//! the single-selection highlight and listeners consistent with the selected
//! id set.

use crate::listeners::{ListenerId, Listeners};
use crate::settings::OutlinePalette;
use blocksmith_editor_scene::{Aabb, Block, BlockId, BlockKind, BlockStore, ComponentRole, OutlineColor, Transform};

/// Selection payload handed to listeners
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// Nothing selected
    None,
    /// Exactly one block selected
    Single(BlockId),
    /// Several blocks selected
    Multiple(Vec<BlockId>),
}

impl Selection {
    fn from_ids(ids: &[BlockId]) -> Self {
        match ids {
            [] => Self::None,
            [id] => Self::Single(id.clone()),
            _ => Self::Multiple(ids.to_vec()),
        }
    }
}

/// Decides the outline color of a block
pub trait OutlinePolicy {
    /// Outline for `block` given whether it is selected
    fn resolve(&self, block: &Block, selected: bool) -> Option<OutlineColor>;
}

/// Component blocks show their role color, other blocks the selected color
#[derive(Debug, Clone, Default)]
pub struct RoleOutlinePolicy {
    /// Colors to apply
    pub palette: OutlinePalette,
}

impl OutlinePolicy for RoleOutlinePolicy {
    fn resolve(&self, block: &Block, selected: bool) -> Option<OutlineColor> {
        if block.edit_session.is_some() {
            return Some(self.palette.component_master);
        }
        match &block.kind {
            BlockKind::ComponentInstance { role, .. } => Some(match role {
                ComponentRole::Master => self.palette.component_master,
                ComponentRole::Instance => self.palette.component_instance,
            }),
            _ if selected => Some(self.palette.selected),
            _ => None,
        }
    }
}

/// Bounding-box visual around a single selected block
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Highlight {
    /// World bounds of the block
    pub bounds: Aabb,
}

/// Tracks the selected block ids
pub struct SelectionManager {
    ids: Vec<BlockId>,
    policy: Box<dyn OutlinePolicy>,
    highlight: Option<Highlight>,
    highlight_rebuilds: u64,
    listeners: Listeners<Selection>,
}

impl std::fmt::Debug for SelectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SelectionManager")
            .field("ids", &self.ids)
            .field("highlight", &self.highlight)
            .field("listeners", &self.listeners)
            .finish()
    }
}

impl SelectionManager {
    /// Create an empty selection using the given outline policy
    pub fn new(policy: Box<dyn OutlinePolicy>) -> Self {
        Self {
            ids: Vec::new(),
            policy,
            highlight: None,
            highlight_rebuilds: 0,
            listeners: Listeners::new(),
        }
    }

    /// Create an empty selection using [`RoleOutlinePolicy`]
    pub fn with_palette(palette: OutlinePalette) -> Self {
        Self::new(Box::new(RoleOutlinePolicy { palette }))
    }

    /// Selected ids
    pub fn ids(&self) -> &[BlockId] {
        &self.ids
    }

    /// Current payload
    pub fn selection(&self) -> Selection {
        Selection::from_ids(&self.ids)
    }

    /// Number of selected blocks
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether nothing is selected
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Whether `id` is selected
    pub fn contains(&self, id: &BlockId) -> bool {
        self.ids.contains(id)
    }

    /// The selected id when exactly one block is selected
    pub fn single(&self) -> Option<&BlockId> {
        match self.ids.as_slice() {
            [id] => Some(id),
            _ => None,
        }
    }

    /// Current highlight visual
    pub fn highlight(&self) -> Option<&Highlight> {
        self.highlight.as_ref()
    }

    /// How many times the highlight visual was rebuilt
    pub fn highlight_rebuilds(&self) -> u64 {
        self.highlight_rebuilds
    }

    /// Subscribe to selection changes
    pub fn add_listener(&mut self, listener: impl FnMut(&Selection) + 'static) -> ListenerId {
        self.listeners.add(listener)
    }

    /// Unsubscribe from selection changes
    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }

    /// Select exactly `id`
    pub fn set_selection_single(&mut self, store: &mut BlockStore, id: &BlockId) {
        self.apply_selection(store, vec![id.clone()]);
    }

    /// Add `id` if absent, remove it if present
    pub fn toggle_selection(&mut self, store: &mut BlockStore, id: &BlockId) {
        let mut next = self.ids.clone();
        match next.iter().position(|selected| selected == id) {
            Some(index) => {
                next.remove(index);
            }
            None => next.push(id.clone()),
        }
        self.apply_selection(store, next);
    }

    /// Select exactly `ids`
    pub fn set_selection_by_ids(&mut self, store: &mut BlockStore, ids: &[BlockId]) {
        self.apply_selection(store, ids.to_vec());
    }

    /// Select nothing
    pub fn clear_selection(&mut self, store: &mut BlockStore) {
        self.apply_selection(store, Vec::new());
    }

    /// Forget a block that is being deleted
    pub fn remove_id(&mut self, store: &BlockStore, id: &BlockId) {
        if !self.contains(id) {
            return;
        }
        self.ids.retain(|selected| selected != id);
        self.rebuild_highlight(store);
        self.notify();
    }

    /// Replace an id after a rename
    pub fn rename_id(&mut self, id: &BlockId, new_id: &BlockId) {
        for selected in &mut self.ids {
            if selected == id {
                *selected = new_id.clone();
            }
        }
    }

    /// Drop ids that no longer exist in the store
    pub fn retain_existing(&mut self, store: &BlockStore) {
        let before = self.ids.len();
        self.ids.retain(|id| store.contains_id(id));
        if self.ids.len() != before {
            self.rebuild_highlight(store);
            self.notify();
        }
    }

    /// Recompute the outline of one block, e.g. after its role changed
    pub fn refresh_outline(&self, store: &mut BlockStore, id: &BlockId) {
        let selected = self.contains(id);
        let color = store.find(id).and_then(|block| self.policy.resolve(block, selected));
        store.set_outline(id, color);
    }

    /// Write many root transforms, refreshing the highlight at most once
    pub fn apply_transforms_for_ids(&mut self, store: &mut BlockStore, updates: &[(BlockId, Transform)]) -> usize {
        let mut written = 0;
        let mut touches_highlight = false;
        for (id, transform) in updates {
            if store.set_transform(id, *transform) {
                written += 1;
                touches_highlight |= self.single() == Some(id);
            }
        }
        if touches_highlight {
            self.rebuild_highlight(store);
        }
        written
    }

    /// Rebuild the highlight from the current selection
    pub fn refresh_highlight(&mut self, store: &BlockStore) {
        self.rebuild_highlight(store);
    }

    fn apply_selection(&mut self, store: &mut BlockStore, next: Vec<BlockId>) {
        let mut unique: Vec<BlockId> = Vec::with_capacity(next.len());
        for id in next {
            if store.contains_id(&id) && !unique.contains(&id) {
                unique.push(id);
            }
        }

        let leaving: Vec<BlockId> = self.ids.iter().filter(|id| !unique.contains(id)).cloned().collect();
        let entering: Vec<BlockId> = unique.iter().filter(|id| !self.ids.contains(id)).cloned().collect();
        let changed = self.ids != unique;
        self.ids = unique;

        for id in leaving.iter().chain(entering.iter()) {
            self.refresh_outline(store, id);
        }

        self.rebuild_highlight(store);
        if changed {
            self.notify();
        }
    }

    fn rebuild_highlight(&mut self, store: &BlockStore) {
        self.highlight = self
            .single()
            .and_then(|id| store.bounds(id))
            .map(|bounds| Highlight { bounds });
        if self.highlight.is_some() {
            self.highlight_rebuilds += 1;
        }
    }

    fn notify(&mut self) {
        let payload = self.selection();
        self.listeners.notify(&payload);
    }
}

impl Default for SelectionManager {
    fn default() -> Self {
        Self::with_palette(OutlinePalette::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blocksmith_editor_scene::ComponentId;
    use glam::Vec3;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn store_with(n: usize) -> (BlockStore, Vec<BlockId>) {
        let mut store = BlockStore::new();
        let ids = (0..n)
            .map(|i| store.create_cuboid(Transform::from_position(Vec3::new(i as f32 * 2.0, 0.0, 0.0))))
            .collect();
        (store, ids)
    }

    #[test]
    fn test_payload_shapes() {
        let (mut store, ids) = store_with(2);
        let payloads = Rc::new(RefCell::new(Vec::new()));
        let mut selection = SelectionManager::default();
        let sink = payloads.clone();
        selection.add_listener(move |s| sink.borrow_mut().push(s.clone()));

        selection.set_selection_single(&mut store, &ids[0]);
        selection.toggle_selection(&mut store, &ids[1]);
        selection.clear_selection(&mut store);

        assert_eq!(
            *payloads.borrow(),
            vec![
                Selection::Single(ids[0].clone()),
                Selection::Multiple(ids.clone()),
                Selection::None,
            ]
        );
    }

    #[test]
    fn test_set_by_ids_dedupes_and_drops_unknown() {
        let (mut store, ids) = store_with(2);
        let mut selection = SelectionManager::default();
        selection.set_selection_by_ids(
            &mut store,
            &[ids[0].clone(), ids[0].clone(), BlockId::new("ghost"), ids[1].clone()],
        );
        assert_eq!(selection.ids(), ids.as_slice());
    }

    #[test]
    fn test_outlines_follow_selection() {
        let (mut store, ids) = store_with(2);
        let palette = OutlinePalette::default();
        let mut selection = SelectionManager::with_palette(palette);

        selection.set_selection_single(&mut store, &ids[0]);
        assert_eq!(store.get(&ids[0]).unwrap().outline, Some(palette.selected));

        selection.set_selection_single(&mut store, &ids[1]);
        assert_eq!(store.get(&ids[0]).unwrap().outline, None);
        assert_eq!(store.get(&ids[1]).unwrap().outline, Some(palette.selected));
    }

    #[test]
    fn test_role_color_wins_over_selected() {
        let mut store = BlockStore::new();
        let id = BlockId::new("inst");
        store
            .insert(Block::component_group(
                id.clone(),
                Transform::IDENTITY,
                ComponentId::new("c"),
                ComponentRole::Instance,
                vec![Block::cuboid(BlockId::new("m"), Transform::IDENTITY)],
            ))
            .unwrap();
        let palette = OutlinePalette::default();
        let mut selection = SelectionManager::with_palette(palette);

        selection.set_selection_single(&mut store, &id);
        assert_eq!(store.get(&id).unwrap().outline, Some(palette.component_instance));
        selection.clear_selection(&mut store);
        assert_eq!(store.get(&id).unwrap().outline, Some(palette.component_instance));
    }

    #[test]
    fn test_highlight_only_for_single_selection() {
        let (mut store, ids) = store_with(2);
        let mut selection = SelectionManager::default();

        selection.set_selection_single(&mut store, &ids[1]);
        let bounds = selection.highlight().unwrap().bounds;
        assert!(bounds.center().abs_diff_eq(Vec3::new(2.0, 0.0, 0.0), 1e-5));

        selection.toggle_selection(&mut store, &ids[0]);
        assert!(selection.highlight().is_none());
    }

    #[test]
    fn test_batch_transform_rebuilds_highlight_once() {
        let (mut store, ids) = store_with(1);
        let mut selection = SelectionManager::default();
        selection.set_selection_single(&mut store, &ids[0]);
        let before = selection.highlight_rebuilds();

        let updates: Vec<_> = (0..10)
            .map(|i| (ids[0].clone(), Transform::from_position(Vec3::splat(i as f32))))
            .collect();
        assert_eq!(selection.apply_transforms_for_ids(&mut store, &updates), 10);
        assert_eq!(selection.highlight_rebuilds(), before + 1);
    }

    #[test]
    fn test_remove_id() {
        let (mut store, ids) = store_with(2);
        let mut selection = SelectionManager::default();
        selection.set_selection_by_ids(&mut store, &ids);
        store.remove(&ids[0]);
        selection.remove_id(&store, &ids[0]);
        assert_eq!(selection.selection(), Selection::Single(ids[1].clone()));
        assert!(selection.highlight().is_some());
    }
}
