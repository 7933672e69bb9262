// SPDX-License-Identifier: MIT OR Apache-2.0
//! Persistence of component definitions and scenarios.
//!
//! The editor treats storage as a synchronous key-value collaborator: every
//! call either succeeds or returns an error, writes are never dropped.

use crate::block::ComponentId;
use crate::error::StoreError;
use crate::scenario::{SavedComponent, ScenarioFile, ScenarioId, ScenarioSummary};
use indexmap::IndexMap;
use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Components file name inside a [`DirectoryStore`] root
pub const COMPONENTS_FILE_NAME: &str = "components.json";

/// Scenario directory name inside a [`DirectoryStore`] root
pub const SCENARIOS_DIR_NAME: &str = "scenarios";

/// Storage collaborator used by the editor
pub trait EditorStore {
    /// All saved component definitions
    fn load_components(&self) -> Result<Vec<SavedComponent>, StoreError>;

    /// Insert or replace a component definition
    fn add_component(&mut self, component: &SavedComponent) -> Result<(), StoreError>;

    /// Remove a component definition; unknown ids are ignored
    fn remove_component(&mut self, id: &ComponentId) -> Result<(), StoreError>;

    /// Saved scenarios, oldest first
    fn list_scenarios(&self) -> Result<Vec<ScenarioSummary>, StoreError>;

    /// Save a scenario under `name`, returning its storage id
    fn save_scenario(&mut self, name: &str, scenario: &ScenarioFile) -> Result<ScenarioId, StoreError>;

    /// Load a saved scenario
    fn load_scenario(&self, id: &ScenarioId) -> Result<ScenarioFile, StoreError>;

    /// Remove a saved scenario; unknown ids are ignored
    fn remove_scenario(&mut self, id: &ScenarioId) -> Result<(), StoreError>;
}

#[derive(Debug, Default)]
struct MemoryContents {
    components: IndexMap<ComponentId, SavedComponent>,
    scenarios: IndexMap<ScenarioId, ScenarioFile>,
}

/// In-memory store. Clones share the same contents.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    contents: Arc<RwLock<MemoryContents>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

impl EditorStore for MemoryStore {
    fn load_components(&self) -> Result<Vec<SavedComponent>, StoreError> {
        Ok(self.contents.read().components.values().cloned().collect())
    }

    fn add_component(&mut self, component: &SavedComponent) -> Result<(), StoreError> {
        self.contents
            .write()
            .components
            .insert(component.id.clone(), component.clone());
        Ok(())
    }

    fn remove_component(&mut self, id: &ComponentId) -> Result<(), StoreError> {
        self.contents.write().components.shift_remove(id);
        Ok(())
    }

    fn list_scenarios(&self) -> Result<Vec<ScenarioSummary>, StoreError> {
        Ok(self
            .contents
            .read()
            .scenarios
            .iter()
            .map(|(id, scenario)| scenario.summary(id.clone()))
            .collect())
    }

    fn save_scenario(&mut self, name: &str, scenario: &ScenarioFile) -> Result<ScenarioId, StoreError> {
        let id = ScenarioId::generate();
        let mut stored = scenario.clone();
        stored.name = name.to_string();
        self.contents.write().scenarios.insert(id.clone(), stored);
        Ok(id)
    }

    fn load_scenario(&self, id: &ScenarioId) -> Result<ScenarioFile, StoreError> {
        self.contents
            .read()
            .scenarios
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::ScenarioNotFound(id.to_string()))
    }

    fn remove_scenario(&mut self, id: &ScenarioId) -> Result<(), StoreError> {
        self.contents.write().scenarios.shift_remove(id);
        Ok(())
    }
}

/// Store backed by JSON files under a root directory
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    root: PathBuf,
}

impl DirectoryStore {
    /// Open (and create if needed) a store rooted at `root`
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        std::fs::create_dir_all(root.join(SCENARIOS_DIR_NAME))?;
        tracing::info!("Opened editor store at {:?}", root);
        Ok(Self { root })
    }

    /// Root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn components_path(&self) -> PathBuf {
        self.root.join(COMPONENTS_FILE_NAME)
    }

    fn scenario_path(&self, id: &ScenarioId) -> PathBuf {
        self.root
            .join(SCENARIOS_DIR_NAME)
            .join(format!("{}.json", id.as_str()))
    }

    fn write_components(&self, components: &[SavedComponent]) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(components)?;
        std::fs::write(self.components_path(), json)?;
        Ok(())
    }
}

impl EditorStore for DirectoryStore {
    fn load_components(&self) -> Result<Vec<SavedComponent>, StoreError> {
        let path = self.components_path();
        if !path.exists() {
            return Ok(Vec::new());
        }
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    fn add_component(&mut self, component: &SavedComponent) -> Result<(), StoreError> {
        let mut components = self.load_components()?;
        match components.iter_mut().find(|c| c.id == component.id) {
            Some(existing) => *existing = component.clone(),
            None => components.push(component.clone()),
        }
        self.write_components(&components)
    }

    fn remove_component(&mut self, id: &ComponentId) -> Result<(), StoreError> {
        let mut components = self.load_components()?;
        components.retain(|c| &c.id != id);
        self.write_components(&components)
    }

    fn list_scenarios(&self) -> Result<Vec<ScenarioSummary>, StoreError> {
        let mut summaries = Vec::new();
        for entry in std::fs::read_dir(self.root.join(SCENARIOS_DIR_NAME))? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let id = ScenarioId::new(stem);
            match self.load_scenario(&id) {
                Ok(scenario) => summaries.push(scenario.summary(id)),
                Err(e) => tracing::warn!("Skipping unreadable scenario {:?}: {}", path, e),
            }
        }
        summaries.sort_by_key(|s| s.created_at);
        Ok(summaries)
    }

    fn save_scenario(&mut self, name: &str, scenario: &ScenarioFile) -> Result<ScenarioId, StoreError> {
        let id = ScenarioId::generate();
        let mut stored = scenario.clone();
        stored.name = name.to_string();
        std::fs::write(self.scenario_path(&id), stored.to_json()?)?;
        tracing::info!("Saved scenario '{}' as {}", name, id);
        Ok(id)
    }

    fn load_scenario(&self, id: &ScenarioId) -> Result<ScenarioFile, StoreError> {
        let path = self.scenario_path(id);
        if !path.exists() {
            return Err(StoreError::ScenarioNotFound(id.to_string()));
        }
        let content = std::fs::read_to_string(path)?;
        Ok(ScenarioFile::from_json(&content)?)
    }

    fn remove_scenario(&mut self, id: &ScenarioId) -> Result<(), StoreError> {
        let path = self.scenario_path(id);
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }
}
