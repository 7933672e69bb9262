// SPDX-License-Identifier: MIT OR Apache-2.0
//! Editor state management.
//!
//! [`EditorState`] owns the block store, every manager and handler, and the
//! host capabilities (camera, platform, persistence). Scene commands go
//! through it so that they land in the undo history, and every command first
//! settles any gesture in progress so it always starts from a resting mode.

use crate::clipboard::Clipboard;
use crate::component::ComponentManager;
use crate::drag::DragHandler;
use crate::error::Result;
use crate::group;
use crate::history::{History, HistoryCommand, HistoryError, RootEntry, TransformChange};
use crate::listeners::ListenerId;
use crate::modal::{ModalSensitivity, TransformHandler};
use crate::mode::{Mode, ModeManager, TransformKind};
use crate::picking::{BoxSelect, SelectionHandler};
use crate::platform::{HeadlessPlatform, PlatformHooks};
use crate::selection::{Selection, SelectionManager};
use crate::settings::EditorSettings;
use blocksmith_editor_scene::serializer::{instantiate_scene, serialize_scene};
use blocksmith_editor_scene::{
    Block, BlockId, BlockStore, ComponentId, EditorStore, IdPolicy, MemoryStore, OrbitCamera, ScenarioFile,
    ScenarioId, ScenarioSummary, SceneError, SerializedNode, Transform, Viewport, TRANSFORM_EPSILON,
};
use glam::Vec3;
use std::collections::HashSet;

/// Name of a scene that was never saved
pub const UNTITLED_SCENE: &str = "Untitled";

/// Counts describing the loaded scene
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SceneSummary {
    /// Root blocks
    pub roots: usize,
    /// Leaf geometry blocks at any depth
    pub leaves: usize,
    /// Component masters and instances at any depth
    pub component_groups: usize,
    /// Definitions in the component library
    pub definitions: usize,
}

/// The editor aggregate
pub struct EditorState {
    pub(crate) store: BlockStore,
    pub(crate) selection: SelectionManager,
    pub(crate) modes: ModeManager,
    pub(crate) components: ComponentManager,
    pub(crate) drag: DragHandler,
    pub(crate) transform: TransformHandler,
    pub(crate) picking: SelectionHandler,
    pub(crate) history: History,
    pub(crate) clipboard: Clipboard,
    pub(crate) settings: EditorSettings,
    pub(crate) viewport: Box<dyn Viewport>,
    pub(crate) platform: Box<dyn PlatformHooks>,
    pub(crate) persistence: Box<dyn EditorStore>,
    pub(crate) typing: bool,
    scene_name: String,
}

impl EditorState {
    /// Create an empty editor on the given host capabilities
    pub fn new(
        settings: EditorSettings,
        viewport: Box<dyn Viewport>,
        platform: Box<dyn PlatformHooks>,
        persistence: Box<dyn EditorStore>,
    ) -> Self {
        Self {
            store: BlockStore::new(),
            selection: SelectionManager::with_palette(settings.palette),
            modes: ModeManager::new(),
            components: ComponentManager::new(),
            drag: DragHandler::new(settings.drag_vertical_sensitivity),
            transform: TransformHandler::new(ModalSensitivity::from(&settings)),
            picking: SelectionHandler::new(settings.drag_on_select, settings.box_select_min_size),
            history: History::with_max_depth(settings.history_depth),
            clipboard: Clipboard::default(),
            settings,
            viewport,
            platform,
            persistence,
            typing: false,
            scene_name: UNTITLED_SCENE.to_string(),
        }
    }

    /// Editor with default settings, an orbit camera, no platform and an
    /// in-memory store
    pub fn headless() -> Self {
        Self::new(
            EditorSettings::default(),
            Box::new(OrbitCamera::new()),
            Box::new(HeadlessPlatform),
            Box::new(MemoryStore::new()),
        )
    }

    /// Load the component library from the persistence back end
    pub fn load_component_library(&mut self) -> Result<usize> {
        Ok(self.components.load_library(self.persistence.as_ref())?)
    }

    // Accessors

    /// Scene blocks
    pub fn store(&self) -> &BlockStore {
        &self.store
    }

    /// Selection authority
    pub fn selection(&self) -> &SelectionManager {
        &self.selection
    }

    /// Current mode
    pub fn mode(&self) -> &Mode {
        self.modes.mode()
    }

    /// Mode owner
    pub fn mode_manager(&self) -> &ModeManager {
        &self.modes
    }

    /// Component library and runtime registry
    pub fn components(&self) -> &ComponentManager {
        &self.components
    }

    /// Undo history
    pub fn history(&self) -> &History {
        &self.history
    }

    /// Active settings
    pub fn settings(&self) -> &EditorSettings {
        &self.settings
    }

    /// Camera used for picking and gesture math
    pub fn viewport(&self) -> &dyn Viewport {
        self.viewport.as_ref()
    }

    /// Replace the camera, e.g. after the host moved its own
    pub fn set_viewport(&mut self, viewport: Box<dyn Viewport>) {
        self.viewport = viewport;
    }

    /// Drag handler
    pub fn drag_handler(&self) -> &DragHandler {
        &self.drag
    }

    /// Modal transform handler
    pub fn transform_handler(&self) -> &TransformHandler {
        &self.transform
    }

    /// Box selection in progress
    pub fn box_select(&self) -> Option<&BoxSelect> {
        self.picking.box_select()
    }

    /// Name of the loaded scene
    pub fn scene_name(&self) -> &str {
        &self.scene_name
    }

    /// Whether a text field has focus
    pub fn is_typing(&self) -> bool {
        self.typing
    }

    /// Set by the host when a text field gains or loses focus
    pub fn set_typing(&mut self, typing: bool) {
        self.typing = typing;
    }

    /// Apply new settings to every handler
    pub fn apply_settings(&mut self, settings: EditorSettings) {
        self.settle();
        self.drag.set_vertical_sensitivity(settings.drag_vertical_sensitivity);
        self.transform.set_sensitivity(ModalSensitivity::from(&settings));
        self.picking = SelectionHandler::new(settings.drag_on_select, settings.box_select_min_size);
        self.settings = settings;
    }

    /// Counts for status bars and logs
    pub fn summary(&self) -> SceneSummary {
        fn walk(block: &Block, summary: &mut SceneSummary) {
            if block.is_primitive() {
                summary.leaves += 1;
            }
            if block.component().is_some() {
                summary.component_groups += 1;
            }
            for child in &block.children {
                walk(child, summary);
            }
        }

        let mut summary = SceneSummary {
            roots: self.store.len(),
            definitions: self.components.definitions().len(),
            ..SceneSummary::default()
        };
        for block in self.store.iter() {
            walk(block, &mut summary);
        }
        summary
    }

    // Listeners

    /// Subscribe to selection changes
    pub fn add_selection_listener(&mut self, listener: impl FnMut(&Selection) + 'static) -> ListenerId {
        self.selection.add_listener(listener)
    }

    /// Unsubscribe from selection changes
    pub fn remove_selection_listener(&mut self, id: ListenerId) -> bool {
        self.selection.remove_listener(id)
    }

    /// Subscribe to mode changes
    pub fn add_mode_listener(&mut self, listener: impl FnMut(&Mode) + 'static) -> ListenerId {
        self.modes.add_listener(listener)
    }

    /// Unsubscribe from mode changes
    pub fn remove_mode_listener(&mut self, id: ListenerId) -> bool {
        self.modes.remove_listener(id)
    }

    /// Subscribe to committed drags
    pub fn add_drag_commit_listener(&mut self, listener: impl FnMut(&[TransformChange]) + 'static) -> ListenerId {
        self.drag.add_commit_listener(listener)
    }

    /// Unsubscribe from committed drags
    pub fn remove_drag_commit_listener(&mut self, id: ListenerId) -> bool {
        self.drag.remove_commit_listener(id)
    }

    // Gestures

    /// Cancel any gesture so a command starts from a resting mode
    pub(crate) fn settle(&mut self) {
        self.cancel_interaction();
    }

    pub(crate) fn begin_transform(&mut self, kind: TransformKind) -> bool {
        self.transform.begin(
            kind,
            &mut self.modes,
            &self.store,
            &self.selection,
            self.platform.as_mut(),
        )
    }

    pub(crate) fn commit_transform(&mut self) {
        let changes = self.transform.commit(&mut self.modes, &self.store, self.platform.as_mut());
        self.record_transform_changes(changes);
    }

    pub(crate) fn commit_drag(&mut self) {
        let changes = self.drag.commit(&mut self.modes, &self.store);
        self.record_transform_changes(changes);
    }

    fn record_transform_changes(&mut self, changes: Vec<TransformChange>) {
        if let Some(command) = HistoryCommand::from_changes(changes) {
            self.history.push(command);
            self.sync_component_edits();
        }
    }

    fn sync_component_edits(&mut self) {
        if !self.components.is_editing() {
            return;
        }
        if let Err(e) = self
            .components
            .sync_active_component_edits(&mut self.store, self.persistence.as_mut())
        {
            tracing::error!("Failed to sync component edits: {}", e);
        }
    }

    // Selection

    /// Replace the selection
    pub fn select(&mut self, ids: &[BlockId]) {
        self.selection.set_selection_by_ids(&mut self.store, ids);
    }

    /// Select nothing
    pub fn clear_selection(&mut self) {
        self.selection.clear_selection(&mut self.store);
    }

    // Blocks

    /// Add a cuboid at a world transform and select it
    pub fn add_block(&mut self, transform: Transform) -> BlockId {
        self.settle();
        let transform = transform.with_scale_floor(self.settings.effective_min_scale());
        let id = self.store.create_cuboid(transform);
        self.record_added(std::slice::from_ref(&id));
        self.select_if_pickable(&id);
        id
    }

    /// Add a spawn marker at a world position and select it
    pub fn add_spawn_point(&mut self, position: Vec3) -> Result<BlockId> {
        self.settle();
        let id = self.store.allocate_id();
        self.store
            .insert(Block::spawn_marker(id.clone(), Transform::from_position(position)))?;
        self.record_added(std::slice::from_ref(&id));
        self.select_if_pickable(&id);
        Ok(id)
    }

    fn select_if_pickable(&mut self, id: &BlockId) {
        if self.components.is_block_within_active_edit(id) {
            self.selection.set_selection_single(&mut self.store, id);
        }
    }

    pub(crate) fn root_entries(&self, ids: &[BlockId]) -> Vec<RootEntry> {
        let mut entries: Vec<RootEntry> = ids
            .iter()
            .filter_map(|id| {
                Some(RootEntry {
                    index: self.store.index_of(id)?,
                    block: self.store.get(id)?.clone(),
                })
            })
            .collect();
        entries.sort_by_key(|entry| entry.index);
        entries
    }

    pub(crate) fn record_added(&mut self, ids: &[BlockId]) {
        let entries = self.root_entries(ids);
        if !entries.is_empty() {
            self.history.push(HistoryCommand::Add { entries });
        }
    }

    fn remove_root(&mut self, id: &BlockId) -> Option<Block> {
        let block = self.store.remove(id)?;
        self.components.handle_block_removed(&block);
        self.selection.remove_id(&self.store, id);
        Some(block)
    }

    /// Delete the selected root blocks, returning their ids
    pub fn delete_selected(&mut self) -> Vec<BlockId> {
        self.settle();
        let ids: Vec<BlockId> = self
            .selection
            .ids()
            .iter()
            .filter(|id| self.store.contains_root(id))
            .cloned()
            .collect();
        let entries = self.root_entries(&ids);
        if entries.is_empty() {
            return Vec::new();
        }
        for entry in &entries {
            self.remove_root(&entry.block.id);
        }
        tracing::info!("Deleted {} blocks", entries.len());
        self.history.push(HistoryCommand::Delete { entries });
        self.sync_component_edits();
        ids
    }

    /// Set one block's transform from a property panel.
    ///
    /// `transform` is world space for root blocks and parent-local space for
    /// nested ones. Returns false if the block is unknown or nothing changed.
    pub fn apply_property_edit(&mut self, id: &BlockId, transform: Transform) -> bool {
        self.settle();
        let Some(before) = self.store.find(id).map(|block| block.transform) else {
            return false;
        };
        let after = transform.with_scale_floor(self.settings.effective_min_scale());
        if !after.differs_from(&before, TRANSFORM_EPSILON) {
            return false;
        }
        self.write_transforms(&[(id.clone(), after)]);
        self.record_transform_changes(vec![TransformChange {
            id: id.clone(),
            before,
            after,
        }]);
        true
    }

    fn write_transforms(&mut self, updates: &[(BlockId, Transform)]) {
        let (roots, nested): (Vec<_>, Vec<_>) = updates
            .iter()
            .cloned()
            .partition(|(id, _)| self.store.contains_root(id));
        self.selection.apply_transforms_for_ids(&mut self.store, &roots);
        if nested.is_empty() {
            return;
        }
        for (id, transform) in &nested {
            if let Some(block) = self.store.find_mut(id) {
                block.transform = *transform;
            }
        }
        self.selection.refresh_highlight(&self.store);
    }

    /// Set a block's display name; blank names clear it
    pub fn set_block_name(&mut self, id: &BlockId, name: Option<String>) -> bool {
        self.store.set_name(id, name)
    }

    /// Change a block's id everywhere it is referenced
    pub fn rename_block_id(&mut self, id: &BlockId, new_id: BlockId) -> Result<()> {
        self.settle();
        self.store.rename(id, new_id.clone())?;
        self.selection.rename_id(id, &new_id);
        self.components.handle_block_renamed(id, &new_id);
        self.history.rename_block(id, &new_id);
        tracing::debug!("Renamed block {} to {}", id, new_id);
        Ok(())
    }

    // Grouping

    /// Group the selected root blocks
    pub fn group_selection(&mut self) -> Option<BlockId> {
        self.settle();
        if self.components.is_editing() {
            return None;
        }
        let ids: Vec<BlockId> = self
            .selection
            .ids()
            .iter()
            .filter(|id| self.store.contains_root(id))
            .cloned()
            .collect();
        let children = self.root_entries(&ids);
        let group_id = group::group_selection(&mut self.store, &mut self.selection)?;
        let group = self.root_entries(std::slice::from_ref(&group_id)).pop()?;
        self.history.push(HistoryCommand::Group { group, children });
        Some(group_id)
    }

    /// Ungroup every selected container
    pub fn ungroup_selected(&mut self) -> Vec<BlockId> {
        self.settle();
        if self.components.is_editing() {
            return Vec::new();
        }
        let containers: Vec<BlockId> = self
            .selection
            .ids()
            .iter()
            .filter(|id| self.store.get(id).is_some_and(Block::is_container))
            .cloned()
            .collect();
        let groups = self.root_entries(&containers);
        let restored = group::ungroup_selected(&mut self.store, &mut self.selection);
        if restored.is_empty() && groups.is_empty() {
            return restored;
        }
        self.components.rebuild_runtime(&self.store);
        let children = self.root_entries(&restored);
        self.history.push(HistoryCommand::Ungroup { groups, children });
        restored
    }

    // Components

    /// Promote the selected group into a new component
    pub fn create_component(&mut self, label: Option<&str>) -> Result<Option<ComponentId>> {
        self.settle();
        if self.components.is_editing() {
            return Ok(None);
        }
        Ok(self.components.create_component_from_selected_group(
            &mut self.store,
            &self.selection,
            self.persistence.as_mut(),
            label,
        )?)
    }

    /// Place an instance of a component at a world position and select it
    pub fn place_component(&mut self, component_id: &ComponentId, position: Vec3) -> Option<BlockId> {
        self.settle();
        if self.components.is_editing() {
            return None;
        }
        let id = self
            .components
            .place_component_at(&mut self.store, &self.selection, component_id, position)?;
        self.record_added(std::slice::from_ref(&id));
        self.selection.set_selection_single(&mut self.store, &id);
        Some(id)
    }

    /// Explode the selected group of `component_id` for editing.
    ///
    /// History recorded before the session is dropped, as it refers to the
    /// group that no longer exists while its members are loose.
    pub fn start_component_edit(&mut self, component_id: &ComponentId) -> bool {
        self.settle();
        if self.modes.mode() != &Mode::Idle {
            return false;
        }
        if !self
            .components
            .start_editing_component(&mut self.store, &mut self.selection, component_id)
        {
            return false;
        }
        self.history.clear();
        self.modes.set_mode(Mode::ComponentEditing {
            component_id: component_id.clone(),
        });
        true
    }

    /// Start editing the component of the single selected group
    pub fn edit_selected_component(&mut self) -> bool {
        let component_id = self
            .selection
            .single()
            .and_then(|id| self.store.get(id))
            .and_then(|block| block.component())
            .map(|(component_id, _)| component_id.clone());
        match component_id {
            Some(component_id) => self.start_component_edit(&component_id),
            None => false,
        }
    }

    /// Regroup the members of the active edit session.
    ///
    /// Returns false, staying in the session, if a member is missing.
    pub fn finish_component_edit(&mut self) -> Result<bool> {
        self.settle();
        let Some(component_id) = self.components.active_edit().cloned() else {
            return Ok(false);
        };
        let finished = self.components.finish_editing_component(
            &mut self.store,
            &mut self.selection,
            self.persistence.as_mut(),
            &component_id,
        )?;
        if finished {
            self.history.clear();
            self.modes.set_mode(Mode::Idle);
        }
        Ok(finished)
    }

    /// Remove a component with all its groups and its stored definition
    pub fn dispose_component(&mut self, component_id: &ComponentId) -> Result<Vec<BlockId>> {
        self.settle();
        let ids = self.components.dispose_component(
            &mut self.store,
            &mut self.selection,
            self.persistence.as_mut(),
            component_id,
        )?;
        for id in &ids {
            if self.remove_root(id).is_none() {
                if let Some(block) = detach_nested(&mut self.store, id) {
                    self.components.handle_block_removed(&block);
                }
            }
        }
        self.selection.retain_existing(&self.store);
        self.history.clear();
        if matches!(self.modes.mode(), Mode::ComponentEditing { .. }) && !self.components.is_editing() {
            self.modes.set_mode(Mode::Idle);
        }
        Ok(ids)
    }

    // History

    /// Undo the last command
    pub fn undo(&mut self) -> Result<()> {
        self.settle();
        let command = self.history.undo()?.clone();
        self.apply_command(&command, false)?;
        tracing::info!("Undo: {}", command.description());
        Ok(())
    }

    /// Redo the last undone command
    pub fn redo(&mut self) -> Result<()> {
        self.settle();
        let command = self.history.redo()?.clone();
        self.apply_command(&command, true)?;
        tracing::info!("Redo: {}", command.description());
        Ok(())
    }

    /// Forget every recorded command
    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    fn apply_command(&mut self, command: &HistoryCommand, forward: bool) -> std::result::Result<(), HistoryError> {
        let applied = match (command, forward) {
            (HistoryCommand::Add { entries }, true) | (HistoryCommand::Delete { entries }, false) => {
                self.restore_entries(entries)
            }
            (HistoryCommand::Add { entries }, false) | (HistoryCommand::Delete { entries }, true) => {
                self.remove_entries(entries);
                Ok(())
            }
            (HistoryCommand::Transform(change), _) => self.apply_changes(std::slice::from_ref(change), forward),
            (HistoryCommand::MultiTransform { changes }, _) => self.apply_changes(changes, forward),
            (HistoryCommand::Group { group, children }, true) => {
                self.remove_entries(children);
                self.restore_entries(std::slice::from_ref(group))
            }
            (HistoryCommand::Group { group, children }, false) => {
                self.remove_entries(std::slice::from_ref(group));
                self.restore_entries(children)
            }
            (HistoryCommand::Ungroup { groups, children }, true) => {
                self.remove_entries(groups);
                self.restore_entries(children)
            }
            (HistoryCommand::Ungroup { groups, children }, false) => {
                self.remove_entries(children);
                self.restore_entries(groups)
            }
        };

        self.components.rebuild_runtime(&self.store);
        self.selection.retain_existing(&self.store);
        self.sync_component_edits();
        applied
    }

    fn restore_entries(&mut self, entries: &[RootEntry]) -> std::result::Result<(), HistoryError> {
        let mut ordered: Vec<&RootEntry> = entries.iter().collect();
        ordered.sort_by_key(|entry| entry.index);
        for entry in ordered {
            self.store.insert_at(entry.index, entry.block.clone())?;
            self.selection.refresh_outline(&mut self.store, &entry.block.id);
        }
        Ok(())
    }

    fn remove_entries(&mut self, entries: &[RootEntry]) {
        for entry in entries {
            self.remove_root(&entry.block.id);
        }
    }

    fn apply_changes(&mut self, changes: &[TransformChange], forward: bool) -> std::result::Result<(), HistoryError> {
        if let Some(missing) = changes.iter().find(|c| !self.store.contains_id(&c.id)) {
            return Err(SceneError::UnknownBlock(missing.id.clone()).into());
        }
        let updates: Vec<(BlockId, Transform)> = changes
            .iter()
            .map(|c| (c.id.clone(), if forward { c.after } else { c.before }))
            .collect();
        self.write_transforms(&updates);
        Ok(())
    }

    // Scenarios

    /// Build a scenario document from the scene.
    ///
    /// An active component edit is finished first so the document never
    /// contains loose members. Only definitions the scene references are
    /// included.
    pub fn export_scenario(&mut self, name: &str) -> Result<ScenarioFile> {
        self.settle();
        if self.components.is_editing() && !self.finish_component_edit()? {
            tracing::warn!("Exporting with an unfinished component edit");
        }
        let blocks = serialize_scene(&self.store);
        let mut referenced = HashSet::new();
        for node in &blocks {
            collect_component_refs(node, &mut referenced);
        }
        let definitions = self
            .components
            .definitions()
            .values()
            .filter(|definition| referenced.contains(&definition.id))
            .cloned()
            .collect();
        Ok(ScenarioFile::new(name, blocks, definitions))
    }

    /// Replace the scene with a scenario document.
    ///
    /// Its definitions are merged into the library first; selection and
    /// history start empty.
    pub fn import_scenario(&mut self, scenario: &ScenarioFile) -> Result<()> {
        self.settle();
        self.components
            .merge_definitions(&scenario.component_definitions, self.persistence.as_mut())?;
        self.reset_scene();

        instantiate_scene(
            &mut self.store,
            &scenario.blocks,
            self.components.definitions(),
            IdPolicy::Preserve,
        )?;
        self.components.rebuild_runtime(&self.store);
        for id in self.store.ids() {
            self.selection.refresh_outline(&mut self.store, &id);
        }
        self.scene_name = scenario.name.clone();
        tracing::info!(
            "Loaded scenario '{}' ({} blocks, {} definitions)",
            scenario.name,
            self.store.len(),
            scenario.component_definitions.len()
        );
        Ok(())
    }

    /// Export and store the scene under `name`
    pub fn save_scenario(&mut self, name: &str) -> Result<ScenarioId> {
        let scenario = self.export_scenario(name)?;
        let id = self.persistence.save_scenario(name, &scenario)?;
        self.scene_name = name.to_string();
        tracing::info!("Saved scenario '{}' as {}", name, id);
        Ok(id)
    }

    /// Load a stored scenario
    pub fn load_scenario(&mut self, id: &ScenarioId) -> Result<()> {
        let scenario = self.persistence.load_scenario(id)?;
        self.import_scenario(&scenario)
    }

    /// Stored scenarios
    pub fn list_scenarios(&self) -> Result<Vec<ScenarioSummary>> {
        Ok(self.persistence.list_scenarios()?)
    }

    /// Remove a stored scenario
    pub fn remove_scenario(&mut self, id: &ScenarioId) -> Result<()> {
        Ok(self.persistence.remove_scenario(id)?)
    }

    /// Start over with an empty scene. The component library is kept.
    pub fn new_scene(&mut self) {
        self.settle();
        if self.components.is_editing() {
            if let Err(e) = self.finish_component_edit() {
                tracing::warn!("Discarding component edit: {}", e);
            }
        }
        self.reset_scene();
        self.scene_name = UNTITLED_SCENE.to_string();
        tracing::info!("New scene");
    }

    fn reset_scene(&mut self) {
        self.selection.clear_selection(&mut self.store);
        self.store.clear();
        self.components.reset_runtime();
        self.history.clear();
        if self.modes.mode() != &Mode::Idle {
            self.modes.set_mode(Mode::Idle);
        }
    }
}

impl Drop for EditorState {
    fn drop(&mut self) {
        // Never leave the cursor captured
        self.cancel_interaction();
        self.transform.release_pointer_lock(self.platform.as_mut());
    }
}

fn collect_component_refs(node: &SerializedNode, out: &mut HashSet<ComponentId>) {
    if let Some(component_id) = &node.component_id {
        out.insert(component_id.clone());
    }
    for child in &node.children {
        collect_component_refs(child, out);
    }
}

/// Remove a nested block from whatever root contains it
fn detach_nested(store: &mut BlockStore, id: &BlockId) -> Option<Block> {
    fn detach(block: &mut Block, id: &BlockId) -> Option<Block> {
        if let Some(index) = block.children.iter().position(|child| &child.id == id) {
            return Some(block.children.remove(index));
        }
        block.children.iter_mut().find_map(|child| detach(child, id))
    }

    let root = store.root_of(id)?.clone();
    detach(store.get_mut(&root)?, id)
}
