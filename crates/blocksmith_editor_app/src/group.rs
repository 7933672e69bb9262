// SPDX-License-Identifier: MIT OR Apache-2.0
//! Grouping and ungrouping of root blocks.
//!
//! Both directions preserve every block's world transform and id. Grouping
//! converts world transforms into the new parent's space, ungrouping composes
//! the parent chain back into world space.

use crate::selection::SelectionManager;
use blocksmith_editor_scene::{Block, BlockId, BlockStore, Transform};
use glam::{Mat4, Vec3};

/// Group the selected root blocks under a new group at their centroid.
///
/// Returns the new group id, or `None` if nothing groupable is selected.
pub fn group_selection(store: &mut BlockStore, selection: &mut SelectionManager) -> Option<BlockId> {
    let ids: Vec<BlockId> = selection
        .ids()
        .iter()
        .filter(|id| store.contains_root(id))
        .cloned()
        .collect();
    if ids.is_empty() {
        return None;
    }

    let centroid = ids
        .iter()
        .filter_map(|id| store.transform(id))
        .map(|t| t.position)
        .sum::<Vec3>()
        / ids.len() as f32;

    let group_id = group_by_ids_with_world_matrix(store, &ids, Mat4::from_translation(centroid), None)?;
    selection.set_selection_single(store, &group_id);
    tracing::debug!("Grouped {} blocks into {}", ids.len(), group_id);
    Some(group_id)
}

/// Group root blocks under a new group placed exactly at `basis`.
///
/// The group takes `preferred_id` when it is free. Returns `None` without
/// touching the store if any id is not a root block.
pub fn group_by_ids_with_world_matrix(
    store: &mut BlockStore,
    ids: &[BlockId],
    basis: Mat4,
    preferred_id: Option<&BlockId>,
) -> Option<BlockId> {
    if ids.is_empty() {
        return None;
    }
    for (i, id) in ids.iter().enumerate() {
        if !store.contains_root(id) || ids[..i].contains(id) {
            return None;
        }
    }

    let group_id = match preferred_id {
        Some(id) if !store.contains_id(id) => id.clone(),
        _ => store.allocate_id(),
    };
    let index = ids.iter().filter_map(|id| store.index_of(id)).min().unwrap_or(0);
    let to_local = basis.inverse();

    let children: Vec<Block> = ids
        .iter()
        .filter_map(|id| store.remove(id))
        .map(|mut child| {
            child.transform = Transform::from_matrix(&(to_local * child.transform.to_matrix()));
            child
        })
        .collect();

    let group = Block::group(group_id.clone(), Transform::from_matrix(&basis), children);
    if let Err(e) = store.insert_at(index, group) {
        tracing::error!("Failed to insert group {}: {}", group_id, e);
        return None;
    }
    Some(group_id)
}

/// Move a root container's children to the root, keeping their world transforms.
///
/// The children take the container's place in the root order. Returns the
/// restored ids, or `None` if `id` is not a root container.
pub fn ungroup_block(store: &mut BlockStore, id: &BlockId) -> Option<Vec<BlockId>> {
    if !store.get(id).is_some_and(Block::is_container) {
        return None;
    }
    let index = store.index_of(id)?;
    let group = store.remove(id)?;
    let parent = group.transform.to_matrix();

    let mut restored = Vec::with_capacity(group.children.len());
    for (offset, mut child) in group.children.into_iter().enumerate() {
        child.transform = Transform::from_matrix(&(parent * child.transform.to_matrix()));
        let child_id = child.id.clone();
        match store.insert_at(index + offset, child) {
            Ok(_) => restored.push(child_id),
            Err(e) => tracing::error!("Failed to restore {} from {}: {}", child_id, id, e),
        }
    }
    Some(restored)
}

/// Ungroup every selected container and select the restored children.
///
/// Returns an empty list, leaving the selection alone, if no container is
/// selected.
pub fn ungroup_selected(store: &mut BlockStore, selection: &mut SelectionManager) -> Vec<BlockId> {
    let containers: Vec<BlockId> = selection
        .ids()
        .iter()
        .filter(|id| store.get(id).is_some_and(Block::is_container))
        .cloned()
        .collect();
    if containers.is_empty() {
        return Vec::new();
    }

    let mut restored = Vec::new();
    for id in &containers {
        if let Some(children) = ungroup_block(store, id) {
            restored.extend(children);
        }
    }
    selection.set_selection_by_ids(store, &restored);
    tracing::debug!("Ungrouped {} containers into {} blocks", containers.len(), restored.len());
    restored
}

#[cfg(test)]
mod tests {
    use super::*;

    fn world(store: &BlockStore, id: &BlockId) -> Transform {
        Transform::from_matrix(&store.world_matrix(id).unwrap())
    }

    fn scattered_store() -> (BlockStore, Vec<BlockId>) {
        let mut store = BlockStore::new();
        let transforms = [
            Transform {
                position: Vec3::new(1.0, 0.5, -2.0),
                rotation: Vec3::new(0.1, 0.7, 0.0),
                scale: Vec3::new(1.0, 2.0, 1.0),
            },
            Transform {
                position: Vec3::new(-3.0, 1.0, 4.0),
                rotation: Vec3::new(0.0, -0.3, 0.2),
                scale: Vec3::splat(0.5),
            },
        ];
        let ids = transforms.iter().map(|t| store.create_cuboid(*t)).collect();
        (store, ids)
    }

    #[test]
    fn test_group_then_ungroup_restores_world_transforms() {
        let (mut store, ids) = scattered_store();
        let originals: Vec<Transform> = ids.iter().map(|id| world(&store, id)).collect();
        let mut selection = SelectionManager::default();
        selection.set_selection_by_ids(&mut store, &ids);

        let group_id = group_selection(&mut store, &mut selection).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(selection.single(), Some(&group_id));
        let group = store.get(&group_id).unwrap();
        assert!(group.transform.position.abs_diff_eq(Vec3::new(-1.0, 0.75, 1.0), 1e-5));
        for (id, original) in ids.iter().zip(&originals) {
            assert!(world(&store, id).approx_eq_composed(original, 1e-5));
        }

        let restored = ungroup_selected(&mut store, &mut selection);
        assert_eq!(restored, ids);
        assert_eq!(selection.ids(), ids.as_slice());
        for (id, original) in ids.iter().zip(&originals) {
            assert!(store.get(id).unwrap().transform.approx_eq_composed(original, 1e-5));
        }
    }

    #[test]
    fn test_group_with_basis_and_preferred_id() {
        let (mut store, ids) = scattered_store();
        let basis = Transform {
            position: Vec3::new(0.0, 3.0, 0.0),
            rotation: Vec3::new(0.0, 1.0, 0.0),
            scale: Vec3::ONE,
        }
        .to_matrix();
        let preferred = BlockId::new("pillar");

        let group_id = group_by_ids_with_world_matrix(&mut store, &ids, basis, Some(&preferred)).unwrap();
        assert_eq!(group_id, preferred);
        assert!(store.get(&group_id).unwrap().transform.to_matrix().abs_diff_eq(basis, 1e-5));
    }

    #[test]
    fn test_group_with_missing_id_has_no_side_effects() {
        let (mut store, ids) = scattered_store();
        let mut request = ids.clone();
        request.push(BlockId::new("gone"));
        assert!(group_by_ids_with_world_matrix(&mut store, &request, Mat4::IDENTITY, None).is_none());
        assert_eq!(store.ids(), ids);
    }

    #[test]
    fn test_ungroup_non_group_is_noop() {
        let (mut store, ids) = scattered_store();
        let mut selection = SelectionManager::default();
        selection.set_selection_single(&mut store, &ids[0]);
        assert!(ungroup_selected(&mut store, &mut selection).is_empty());
        assert_eq!(selection.single(), Some(&ids[0]));
    }

    #[test]
    fn test_group_keeps_root_position() {
        let mut store = BlockStore::new();
        let a = store.create_cuboid(Transform::IDENTITY);
        let b = store.create_cuboid(Transform::from_position(Vec3::X));
        let c = store.create_cuboid(Transform::from_position(Vec3::Y));
        let group = group_by_ids_with_world_matrix(&mut store, &[b.clone(), c.clone()], Mat4::IDENTITY, None).unwrap();
        assert_eq!(store.ids(), vec![a, group.clone()]);

        ungroup_block(&mut store, &group).unwrap();
        assert_eq!(store.ids()[1..], [b, c]);
    }
}
