// SPDX-License-Identifier: MIT OR Apache-2.0
//! Reusable components.
//!
//! A component definition is a named list of member transforms. The group a
//! component is created from becomes its master; placing the component builds
//! instances. Editing explodes one master or instance into free primitives
//! whose transforms, taken relative to the basis captured at edit start, are
//! propagated to the definition and to every other live instance.

use crate::group::{group_by_ids_with_world_matrix, ungroup_block};
use crate::selection::SelectionManager;
use blocksmith_editor_scene::{
    Block, BlockId, BlockKind, BlockStore, ComponentId, ComponentMemberTransform, ComponentRole, EditorStore,
    PrimitiveShape, SavedComponent, StoreError, Transform,
};
use glam::{Mat4, Vec3};
use indexmap::IndexMap;
use std::collections::HashMap;

/// Live bookkeeping for one component id
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuntimeComponent {
    /// The master group, if it exists
    pub master_id: Option<BlockId>,
    /// Live instance groups
    pub instance_ids: Vec<BlockId>,
    /// Whether an edit session is active
    pub editing: bool,
    /// World matrix of the edited group when the session started
    pub editing_basis: Option<Mat4>,
    /// Exploded members being edited, in member order
    pub master_child_ids: Vec<BlockId>,
    /// Id of the edited group when it was an instance
    pub editing_source_id: Option<BlockId>,
    /// Id of the edited group
    pub editing_group_id: Option<BlockId>,
}

impl RuntimeComponent {
    /// Every live group of this component except the one being edited
    fn live_groups(&self) -> Vec<BlockId> {
        self.master_id
            .iter()
            .chain(self.instance_ids.iter())
            .filter(|id| self.editing_group_id.as_ref() != Some(*id))
            .cloned()
            .collect()
    }

    /// Drop group references to a removed block. Exploded members are kept
    /// so a session with a deleted member cannot be finished until it returns.
    fn forget(&mut self, id: &BlockId) {
        self.instance_ids.retain(|instance| instance != id);
        if self.master_id.as_ref() == Some(id) {
            self.master_id = None;
        }
        if self.editing_source_id.as_ref() == Some(id) {
            self.editing_source_id = None;
        }
    }
}

/// Component library and runtime registry
#[derive(Debug, Default)]
pub struct ComponentManager {
    definitions: IndexMap<ComponentId, SavedComponent>,
    runtime: IndexMap<ComponentId, RuntimeComponent>,
    group_components: HashMap<BlockId, ComponentId>,
}

impl ComponentManager {
    /// Create an empty manager
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the library with the definitions held by `persistence`
    pub fn load_library(&mut self, persistence: &dyn EditorStore) -> Result<usize, StoreError> {
        let components = persistence.load_components()?;
        self.definitions = components.into_iter().map(|c| (c.id.clone(), c)).collect();
        tracing::info!("Loaded {} component definitions", self.definitions.len());
        Ok(self.definitions.len())
    }

    /// Add definitions to the library, replacing same-id entries, and persist them
    pub fn merge_definitions(
        &mut self,
        definitions: &[SavedComponent],
        persistence: &mut dyn EditorStore,
    ) -> Result<(), StoreError> {
        for definition in definitions {
            persistence.add_component(definition)?;
            self.definitions.insert(definition.id.clone(), definition.clone());
        }
        Ok(())
    }

    /// All definitions in library order
    pub fn definitions(&self) -> &IndexMap<ComponentId, SavedComponent> {
        &self.definitions
    }

    /// One definition
    pub fn definition(&self, id: &ComponentId) -> Option<&SavedComponent> {
        self.definitions.get(id)
    }

    /// Runtime bookkeeping for a component
    pub fn runtime(&self, id: &ComponentId) -> Option<&RuntimeComponent> {
        self.runtime.get(id)
    }

    /// Component a group id is registered for
    pub fn component_of_group(&self, id: &BlockId) -> Option<&ComponentId> {
        self.group_components.get(id)
    }

    /// Component whose edit session is active
    pub fn active_edit(&self) -> Option<&ComponentId> {
        self.runtime
            .iter()
            .find(|(_, runtime)| runtime.editing)
            .map(|(id, _)| id)
    }

    /// Whether any edit session is active
    pub fn is_editing(&self) -> bool {
        self.active_edit().is_some()
    }

    /// Whether `id` may be picked: always outside an edit session, otherwise
    /// only the exploded members of the edited component.
    pub fn is_block_within_active_edit(&self, id: &BlockId) -> bool {
        let mut editing = self.runtime.values().filter(|r| r.editing).peekable();
        if editing.peek().is_none() {
            return true;
        }
        editing.any(|r| r.master_child_ids.contains(id))
    }

    fn register(&mut self, component_id: &ComponentId, group_id: &BlockId, role: ComponentRole) {
        let runtime = self.runtime.entry(component_id.clone()).or_default();
        match role {
            ComponentRole::Master => runtime.master_id = Some(group_id.clone()),
            ComponentRole::Instance => {
                if !runtime.instance_ids.contains(group_id) {
                    runtime.instance_ids.push(group_id.clone());
                }
            }
        }
        self.group_components.insert(group_id.clone(), component_id.clone());
    }

    /// Promote the selected group into a component master.
    ///
    /// The selection must be a single plain group whose children are all
    /// cuboids. Returns `Ok(None)` without changes otherwise.
    pub fn create_component_from_selected_group(
        &mut self,
        store: &mut BlockStore,
        selection: &SelectionManager,
        persistence: &mut dyn EditorStore,
        label: Option<&str>,
    ) -> Result<Option<ComponentId>, StoreError> {
        let Some(group_id) = selection.single().cloned() else {
            return Ok(None);
        };
        let Some(group) = store.get(&group_id) else {
            return Ok(None);
        };
        let eligible = group.kind == BlockKind::Group
            && !group.children.is_empty()
            && group
                .children
                .iter()
                .all(|c| c.kind == BlockKind::Primitive(PrimitiveShape::Cuboid) && c.generator.is_none());
        if !eligible {
            return Ok(None);
        }

        let component_id = ComponentId::generate();
        let label = match label {
            Some(label) => label.to_string(),
            None => format!("Component {}", self.definitions.len() + 1),
        };
        let members = group
            .children
            .iter()
            .map(|child| ComponentMemberTransform::from(&child.transform))
            .collect();
        let definition = SavedComponent::new(component_id.clone(), label, members);
        persistence.add_component(&definition)?;
        self.definitions.insert(component_id.clone(), definition);

        if let Some(group) = store.get_mut(&group_id) {
            group.kind = BlockKind::ComponentInstance {
                component_id: component_id.clone(),
                role: ComponentRole::Master,
            };
        }
        self.register(&component_id, &group_id, ComponentRole::Master);
        selection.refresh_outline(store, &group_id);

        tracing::info!("Created component {} from group {}", component_id, group_id);
        Ok(Some(component_id))
    }

    /// Build an instance of a component at `transform` without inserting it
    pub fn build_instance(
        &self,
        store: &mut BlockStore,
        component_id: &ComponentId,
        transform: Transform,
    ) -> Option<Block> {
        let definition = self.definitions.get(component_id)?;
        let id = store.allocate_id();
        let members = definition.build_members(store);
        Some(Block::component_group(
            id,
            transform,
            component_id.clone(),
            ComponentRole::Instance,
            members,
        ))
    }

    /// Place a new instance of a component at `transform`
    pub fn instantiate_component(
        &mut self,
        store: &mut BlockStore,
        selection: &SelectionManager,
        component_id: &ComponentId,
        transform: Transform,
    ) -> Option<BlockId> {
        let block = self.build_instance(store, component_id, transform)?;
        let id = block.id.clone();
        if let Err(e) = store.insert(block) {
            tracing::error!("Failed to place component {}: {}", component_id, e);
            return None;
        }
        self.register(component_id, &id, ComponentRole::Instance);
        selection.refresh_outline(store, &id);
        tracing::debug!("Placed instance {} of component {}", id, component_id);
        Some(id)
    }

    /// Place a new instance of a component at a world position
    pub fn place_component_at(
        &mut self,
        store: &mut BlockStore,
        selection: &SelectionManager,
        component_id: &ComponentId,
        position: Vec3,
    ) -> Option<BlockId> {
        self.instantiate_component(store, selection, component_id, Transform::from_position(position))
    }

    /// Explode the selected master or instance of `component_id` for editing.
    ///
    /// Returns false, leaving everything untouched, if the selection is not a
    /// non-empty root group of that component or another edit is active.
    pub fn start_editing_component(
        &mut self,
        store: &mut BlockStore,
        selection: &mut SelectionManager,
        component_id: &ComponentId,
    ) -> bool {
        if self.is_editing() {
            return false;
        }
        let Some(group_id) = selection.single().cloned() else {
            return false;
        };
        let Some(group) = store.get(&group_id) else {
            return false;
        };
        let Some((group_component, role)) = group.component() else {
            return false;
        };
        if group_component != component_id || group.children.is_empty() {
            return false;
        }
        let basis = group.transform.to_matrix();

        let Some(children) = ungroup_block(store, &group_id) else {
            return false;
        };
        for child_id in &children {
            if let Some(child) = store.get_mut(child_id) {
                child.edit_session = Some(component_id.clone());
            }
        }
        self.group_components.remove(&group_id);

        let runtime = self.runtime.entry(component_id.clone()).or_default();
        runtime.editing = true;
        runtime.editing_basis = Some(basis);
        runtime.master_child_ids = children.clone();
        runtime.editing_group_id = Some(group_id.clone());
        runtime.editing_source_id = (role == ComponentRole::Instance).then(|| group_id.clone());

        selection.set_selection_by_ids(store, &children);
        for child_id in &children {
            selection.refresh_outline(store, child_id);
        }
        tracing::info!("Editing component {} ({} members)", component_id, children.len());
        true
    }

    /// Write the exploded members back to the definition and every other
    /// live instance. Returns true if anything was propagated.
    pub fn sync_active_component_edits(
        &mut self,
        store: &mut BlockStore,
        persistence: &mut dyn EditorStore,
    ) -> Result<bool, StoreError> {
        let editing: Vec<ComponentId> = self
            .runtime
            .iter()
            .filter(|(_, r)| r.editing)
            .map(|(id, _)| id.clone())
            .collect();

        let mut synced = false;
        for component_id in editing {
            let Some(runtime) = self.runtime.get(&component_id) else {
                continue;
            };
            let Some(basis) = runtime.editing_basis else {
                continue;
            };
            if runtime.master_child_ids.is_empty() {
                continue;
            }
            let to_local = basis.inverse();
            let Some(members) = runtime
                .master_child_ids
                .iter()
                .map(|id| store.world_matrix(id))
                .collect::<Option<Vec<Mat4>>>()
            else {
                tracing::warn!("Skipping sync of {}: an edited member is missing", component_id);
                continue;
            };
            let members: Vec<Transform> = members
                .iter()
                .map(|world| Transform::from_matrix(&(to_local * *world)))
                .collect();
            let targets = runtime.live_groups();

            let Some(definition) = self.definitions.get_mut(&component_id) else {
                continue;
            };
            definition.members = members.iter().map(ComponentMemberTransform::from).collect();
            persistence.add_component(definition)?;
            let definition = definition.clone();

            for target in targets {
                let child_count = match store.find(&target) {
                    Some(group) => group.children.len(),
                    None => continue,
                };
                let rebuilt = (child_count != members.len()).then(|| definition.build_members(store));
                let Some(group) = store.find_mut(&target) else {
                    continue;
                };
                match rebuilt {
                    Some(children) => group.children = children,
                    None => {
                        for (child, member) in group.children.iter_mut().zip(&members) {
                            child.transform = *member;
                        }
                    }
                }
            }
            synced = true;
        }
        Ok(synced)
    }

    /// Sync, then collapse the exploded members back into a group at the
    /// captured basis. Returns false if the members could not be regrouped.
    pub fn finish_editing_component(
        &mut self,
        store: &mut BlockStore,
        selection: &mut SelectionManager,
        persistence: &mut dyn EditorStore,
        component_id: &ComponentId,
    ) -> Result<bool, StoreError> {
        match self.runtime.get(component_id) {
            Some(runtime) if runtime.editing => {}
            _ => return Ok(false),
        }
        self.sync_active_component_edits(store, persistence)?;

        let Some(runtime) = self.runtime.get(component_id) else {
            return Ok(false);
        };
        let basis = runtime.editing_basis.unwrap_or(Mat4::IDENTITY);
        let children = runtime.master_child_ids.clone();
        let preferred = runtime.editing_group_id.clone();
        let role = if runtime.editing_source_id.is_some() {
            ComponentRole::Instance
        } else {
            ComponentRole::Master
        };

        let Some(group_id) = group_by_ids_with_world_matrix(store, &children, basis, preferred.as_ref()) else {
            tracing::warn!("Could not regroup members of component {}", component_id);
            return Ok(false);
        };
        if let Some(group) = store.get_mut(&group_id) {
            group.kind = BlockKind::ComponentInstance {
                component_id: component_id.clone(),
                role,
            };
            for child in &mut group.children {
                child.edit_session = None;
                child.outline = None;
            }
        }

        if let Some(runtime) = self.runtime.get_mut(component_id) {
            if let Some(previous) = preferred.filter(|p| p != &group_id) {
                runtime.forget(&previous);
            }
            runtime.editing = false;
            runtime.editing_basis = None;
            runtime.master_child_ids.clear();
            runtime.editing_source_id = None;
            runtime.editing_group_id = None;
        }
        self.register(component_id, &group_id, role);

        selection.set_selection_single(store, &group_id);
        selection.refresh_outline(store, &group_id);
        tracing::info!("Finished editing component {}", component_id);
        Ok(true)
    }

    /// Abandon an edit session without regrouping
    fn abandon_edit(&mut self, store: &mut BlockStore, component_id: &ComponentId) {
        if let Some(runtime) = self.runtime.get_mut(component_id) {
            for child in &runtime.master_child_ids {
                if let Some(block) = store.find_mut(child) {
                    block.edit_session = None;
                }
            }
            *runtime = RuntimeComponent {
                master_id: runtime.master_id.clone(),
                instance_ids: runtime.instance_ids.clone(),
                ..RuntimeComponent::default()
            };
        }
    }

    /// Deletion bookkeeping for a block (and its subtree) leaving the scene
    pub fn handle_block_removed(&mut self, block: &Block) {
        for id in block.subtree_ids() {
            for runtime in self.runtime.values_mut() {
                runtime.forget(&id);
            }
            self.group_components.remove(&id);
        }
    }

    /// Rename bookkeeping after a block id changed
    pub fn handle_block_renamed(&mut self, id: &BlockId, new_id: &BlockId) {
        let rename = |slot: &mut BlockId| {
            if slot == id {
                *slot = new_id.clone();
            }
        };
        for runtime in self.runtime.values_mut() {
            runtime.master_id.iter_mut().for_each(rename);
            runtime.instance_ids.iter_mut().for_each(rename);
            runtime.master_child_ids.iter_mut().for_each(rename);
            runtime.editing_source_id.iter_mut().for_each(rename);
            runtime.editing_group_id.iter_mut().for_each(rename);
        }
        if let Some(component_id) = self.group_components.remove(id) {
            self.group_components.insert(new_id.clone(), component_id);
        }
    }

    /// Finish any edit of `component_id`, drop its definition, and return the
    /// ids of every block that belonged to it. The caller deletes them.
    pub fn dispose_component(
        &mut self,
        store: &mut BlockStore,
        selection: &mut SelectionManager,
        persistence: &mut dyn EditorStore,
        component_id: &ComponentId,
    ) -> Result<Vec<BlockId>, StoreError> {
        if self.runtime.get(component_id).is_some_and(|r| r.editing)
            && !self.finish_editing_component(store, selection, persistence, component_id)?
        {
            self.abandon_edit(store, component_id);
        }

        let mut ids = Vec::new();
        if let Some(runtime) = self.runtime.shift_remove(component_id) {
            ids.extend(runtime.master_id);
            ids.extend(runtime.instance_ids);
        }
        ids.retain(|id| store.contains_id(id));
        self.group_components.retain(|_, c| c != component_id);

        persistence.remove_component(component_id)?;
        self.definitions.shift_remove(component_id);
        tracing::info!("Disposed component {} ({} blocks)", component_id, ids.len());
        Ok(ids)
    }

    /// Rebuild master and instance registrations from the blocks in `store`.
    ///
    /// Edit session state is kept.
    pub fn rebuild_runtime(&mut self, store: &BlockStore) {
        for runtime in self.runtime.values_mut() {
            runtime.master_id = None;
            runtime.instance_ids.clear();
        }
        self.group_components.clear();

        let mut found = Vec::new();
        for block in store.iter() {
            collect_components(block, &mut found);
        }
        for (group_id, component_id, role) in found {
            self.register(&component_id, &group_id, role);
        }
        self.runtime
            .retain(|_, runtime| runtime.editing || runtime.master_id.is_some() || !runtime.instance_ids.is_empty());
    }

    /// Drop every runtime registration, ending any edit session
    pub fn reset_runtime(&mut self) {
        self.runtime.clear();
        self.group_components.clear();
    }
}

fn collect_components(block: &Block, out: &mut Vec<(BlockId, ComponentId, ComponentRole)>) {
    if let Some((component_id, role)) = block.component() {
        out.push((block.id.clone(), component_id.clone(), role));
    }
    for child in &block.children {
        collect_components(child, out);
    }
}
