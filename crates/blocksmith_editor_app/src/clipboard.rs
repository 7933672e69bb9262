// SPDX-License-Identifier: MIT OR Apache-2.0
//! Copy, paste and duplicate of root blocks.
//!
//! Copied blocks are held as serialized nodes so later edits to the
//! originals never leak into the clipboard. Pasting builds fresh ids.

use crate::state::EditorState;
use blocksmith_editor_scene::serializer::{build_block, serialize_block};
use blocksmith_editor_scene::{BlockId, IdPolicy, SerializedNode};
use glam::Vec3;

/// Serialized root blocks waiting to be pasted
#[derive(Debug, Clone, Default)]
pub struct Clipboard {
    nodes: Vec<SerializedNode>,
    pastes: u32,
}

impl Clipboard {
    /// Whether nothing was copied
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of copied root blocks
    pub fn len(&self) -> usize {
        self.nodes.len()
    }
}

impl EditorState {
    /// Copy the selected root blocks, returning how many were copied
    pub fn copy_selection(&mut self) -> usize {
        if self.components.is_editing() {
            return 0;
        }
        let nodes: Vec<SerializedNode> = self
            .selection
            .ids()
            .iter()
            .filter_map(|id| self.store.get(id))
            .map(serialize_block)
            .collect();
        if nodes.is_empty() {
            return 0;
        }
        tracing::debug!("Copied {} blocks", nodes.len());
        self.clipboard = Clipboard { nodes, pastes: 0 };
        self.clipboard.len()
    }

    /// Paste the clipboard, each paste shifted one step further from the
    /// originals, and select the new blocks
    pub fn paste(&mut self) -> Vec<BlockId> {
        self.settle();
        if self.components.is_editing() || self.clipboard.is_empty() {
            return Vec::new();
        }
        self.clipboard.pastes += 1;
        let offset = self.settings.paste_offset * self.clipboard.pastes as f32;
        let nodes = self.clipboard.nodes.clone();
        self.place_copies(&nodes, offset)
    }

    /// Copy the selected root blocks in place, shifted once. The clipboard
    /// is left untouched.
    pub fn duplicate_selected(&mut self) -> Vec<BlockId> {
        self.settle();
        if self.components.is_editing() {
            return Vec::new();
        }
        let nodes: Vec<SerializedNode> = self
            .selection
            .ids()
            .iter()
            .filter_map(|id| self.store.get(id))
            .map(serialize_block)
            .collect();
        self.place_copies(&nodes, self.settings.paste_offset)
    }

    fn place_copies(&mut self, nodes: &[SerializedNode], offset: Vec3) -> Vec<BlockId> {
        let mut ids = Vec::with_capacity(nodes.len());
        for node in nodes {
            let mut block = build_block(&mut self.store, node, self.components.definitions(), IdPolicy::Fresh);
            block.transform.position += offset;
            match self.store.insert(block) {
                Ok(block) => ids.push(block.id.clone()),
                Err(e) => tracing::warn!("Skipping pasted block: {}", e),
            }
        }
        if ids.is_empty() {
            return ids;
        }
        self.components.rebuild_runtime(&self.store);
        self.record_added(&ids);
        self.selection.set_selection_by_ids(&mut self.store, &ids);
        tracing::info!("Pasted {} blocks", ids.len());
        ids
    }
}

#[cfg(test)]
mod tests {
    use blocksmith_editor_scene::Transform;
    use glam::Vec3;

    use crate::state::EditorState;

    #[test]
    fn test_paste_offsets_accumulate() {
        let mut state = EditorState::headless();
        let original = state.add_block(Transform::from_position(Vec3::new(1.0, 0.0, 1.0)));
        assert_eq!(state.copy_selection(), 1);

        let first = state.paste();
        let second = state.paste();
        assert_eq!(first.len(), 1);
        assert_ne!(first[0], original);
        assert_ne!(first[0], second[0]);
        let step = state.settings().paste_offset;
        assert_eq!(
            state.store().transform(&first[0]).unwrap().position,
            Vec3::new(1.0, 0.0, 1.0) + step
        );
        assert_eq!(
            state.store().transform(&second[0]).unwrap().position,
            Vec3::new(1.0, 0.0, 1.0) + step * 2.0
        );
        assert_eq!(state.selection().ids(), second.as_slice());
    }

    #[test]
    fn test_paste_is_undoable() {
        let mut state = EditorState::headless();
        state.add_block(Transform::IDENTITY);
        state.copy_selection();
        state.paste();
        assert_eq!(state.store().len(), 2);
        state.undo().unwrap();
        assert_eq!(state.store().len(), 1);
    }

    #[test]
    fn test_duplicate_keeps_clipboard() {
        let mut state = EditorState::headless();
        state.add_block(Transform::IDENTITY);
        let copy = state.duplicate_selected();
        assert_eq!(copy.len(), 1);
        assert_eq!(state.store().len(), 2);
        assert!(state.paste().is_empty());
    }

    #[test]
    fn test_pasted_group_gets_fresh_nested_ids() {
        let mut state = EditorState::headless();
        let a = state.add_block(Transform::from_position(Vec3::X));
        let b = state.add_block(Transform::from_position(Vec3::NEG_X));
        state.select(&[a.clone(), b]);
        let group = state.group_selection().unwrap();
        state.copy_selection();
        let pasted = state.paste();

        let copy = state.store().get(&pasted[0]).unwrap();
        assert_eq!(copy.children.len(), 2);
        assert!(!copy.contains_id(&a));
        assert!(state.store().get(&group).unwrap().contains_id(&a));
    }
}
