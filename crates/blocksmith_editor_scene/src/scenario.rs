// SPDX-License-Identifier: MIT OR Apache-2.0
//! Scenario interchange format and component definitions.
//!
//! A scenario is the portable, versioned JSON document produced by the editor
//! and consumed by the game runtime:
//!
//! ```json
//! { "version": 1, "name": "...", "createdAt": "2026-01-01T00:00:00Z",
//!   "blocks": [ ... ], "componentDefinitions": [ ... ] }
//! ```

use crate::block::{Block, ComponentId};
use crate::error::SceneError;
use crate::math::{Transform, MIN_SCALE};
use crate::serializer::{SerializedNode, Vector3Data};
use crate::store::BlockStore;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Current scenario format version
pub const SCENARIO_FORMAT_VERSION: u32 = 1;

/// Local-space transform of one member of a component
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComponentMemberTransform {
    /// Position relative to the component root
    pub position: Vector3Data,
    /// Rotation relative to the component root
    pub rotation: Vector3Data,
    /// Scale relative to the component root
    pub scale: Vector3Data,
}

impl From<&Transform> for ComponentMemberTransform {
    fn from(t: &Transform) -> Self {
        Self {
            position: t.position.into(),
            rotation: t.rotation.into(),
            scale: t.scale.into(),
        }
    }
}

impl ComponentMemberTransform {
    /// Convert to a transform
    pub fn to_transform(&self) -> Transform {
        Transform {
            position: self.position.into(),
            rotation: self.rotation.into(),
            scale: self.scale.into(),
        }
    }
}

/// A component definition: a named list of member transforms
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedComponent {
    /// Unique identifier
    pub id: ComponentId,
    /// Display label
    pub label: String,
    /// Member transforms, in child order
    pub members: Vec<ComponentMemberTransform>,
}

impl SavedComponent {
    /// Create a definition
    pub fn new(id: ComponentId, label: impl Into<String>, members: Vec<ComponentMemberTransform>) -> Self {
        Self {
            id,
            label: label.into(),
            members,
        }
    }

    /// Member transforms as transforms
    pub fn member_transforms(&self) -> Vec<Transform> {
        self.members.iter().map(ComponentMemberTransform::to_transform).collect()
    }

    /// Build one cuboid per member with freshly allocated ids
    pub fn build_members(&self, store: &mut BlockStore) -> Vec<Block> {
        self.members
            .iter()
            .map(|member| Block::cuboid(store.allocate_id(), member.to_transform().with_scale_floor(MIN_SCALE)))
            .collect()
    }
}

/// Identifier of a saved scenario
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScenarioId(String);

impl ScenarioId {
    /// Wrap an id string
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh random id
    pub fn generate() -> Self {
        Self(format!("scenario-{}", Uuid::new_v4()))
    }

    /// The id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Listing entry for a saved scenario
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioSummary {
    /// Storage id
    pub id: ScenarioId,
    /// Scenario name
    pub name: String,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

/// A complete scenario document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioFile {
    /// Format version
    pub version: u32,
    /// Scenario name
    pub name: String,
    /// Creation time (ISO 8601)
    pub created_at: DateTime<Utc>,
    /// Root nodes in world space
    pub blocks: Vec<SerializedNode>,
    /// Definitions referenced by component nodes
    #[serde(default)]
    pub component_definitions: Vec<SavedComponent>,
}

impl ScenarioFile {
    /// Create a scenario stamped with the current time
    pub fn new(
        name: impl Into<String>,
        blocks: Vec<SerializedNode>,
        component_definitions: Vec<SavedComponent>,
    ) -> Self {
        Self {
            version: SCENARIO_FORMAT_VERSION,
            name: name.into(),
            created_at: Utc::now(),
            blocks,
            component_definitions,
        }
    }

    /// Encode as pretty-printed JSON
    pub fn to_json(&self) -> Result<String, SceneError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Decode from JSON, rejecting unknown format versions
    pub fn from_json(s: &str) -> Result<Self, SceneError> {
        let scenario: Self = serde_json::from_str(s)?;
        if scenario.version != SCENARIO_FORMAT_VERSION {
            return Err(SceneError::UnsupportedVersion(scenario.version));
        }
        Ok(scenario)
    }

    /// Listing entry for this scenario under the given id
    pub fn summary(&self, id: ScenarioId) -> ScenarioSummary {
        ScenarioSummary {
            id,
            name: self.name.clone(),
            created_at: self.created_at,
        }
    }
}
