// SPDX-License-Identifier: MIT OR Apache-2.0
//! Editor settings, stored as RON.

use blocksmith_editor_scene::{OutlineColor, MIN_SCALE};
use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Settings errors
#[derive(Debug, Error)]
pub enum SettingsError {
    /// Filesystem error
    #[error("File error: {0}")]
    Io(#[from] std::io::Error),

    /// The settings file could not be parsed
    #[error("Parse error: {0}")]
    Parse(#[from] ron::error::SpannedError),

    /// The settings could not be encoded
    #[error("Encode error: {0}")]
    Encode(#[from] ron::Error),
}

/// Outline colors applied to blocks
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutlinePalette {
    /// Plain selected block
    pub selected: OutlineColor,
    /// Component master (and members being edited)
    pub component_master: OutlineColor,
    /// Component instance
    pub component_instance: OutlineColor,
}

impl Default for OutlinePalette {
    fn default() -> Self {
        Self {
            selected: OutlineColor(0xffa500),
            component_master: OutlineColor(0xa855f7),
            component_instance: OutlineColor(0x22c55e),
        }
    }
}

/// User-tunable editor behaviour
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorSettings {
    /// World units per pixel for vertical (Y-locked) dragging
    pub drag_vertical_sensitivity: f32,
    /// World units per pixel for modal move
    pub move_sensitivity: f32,
    /// Radians per pixel for modal rotate
    pub rotate_sensitivity: f32,
    /// Scale ratio per pixel for modal scale
    pub scale_sensitivity: f32,
    /// Smallest scale component reachable by interactive scaling
    pub min_scale: f32,
    /// Smallest box-select rectangle side, in normalized device units
    pub box_select_min_size: f32,
    /// Outline colors
    pub palette: OutlinePalette,
    /// Maximum undo depth
    pub history_depth: usize,
    /// Offset applied to each successive paste
    pub paste_offset: Vec3,
    /// Whether pressing on a block immediately starts dragging it
    pub drag_on_select: bool,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            drag_vertical_sensitivity: 0.02,
            move_sensitivity: 0.01,
            rotate_sensitivity: 0.01,
            scale_sensitivity: 0.01,
            min_scale: MIN_SCALE,
            box_select_min_size: 0.01,
            palette: OutlinePalette::default(),
            history_depth: 100,
            paste_offset: Vec3::new(1.0, 0.0, 1.0),
            drag_on_select: true,
        }
    }
}

impl EditorSettings {
    /// Load settings; fields missing from the file keep their defaults
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let content = std::fs::read_to_string(path)?;
        let settings: EditorSettings = ron::from_str(&content)?;
        tracing::info!("Loaded editor settings from {:?}", path);
        Ok(settings)
    }

    /// Save settings as pretty-printed RON
    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        let config = ron::ser::PrettyConfig::default()
            .depth_limit(3)
            .separate_tuple_members(true);
        let content = ron::ser::to_string_pretty(self, config)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Scale floor actually applied; never below [`MIN_SCALE`]
    pub fn effective_min_scale(&self) -> f32 {
        self.min_scale.max(MIN_SCALE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("editor.ron");

        let mut settings = EditorSettings::default();
        settings.move_sensitivity = 0.05;
        settings.drag_on_select = false;
        settings.save(&path).unwrap();

        let loaded = EditorSettings::load(&path).unwrap();
        assert_eq!(loaded, settings);
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("editor.ron");
        std::fs::write(&path, "(history_depth: 5)").unwrap();

        let loaded = EditorSettings::load(&path).unwrap();
        assert_eq!(loaded.history_depth, 5);
        assert_eq!(loaded.palette, OutlinePalette::default());
    }

    #[test]
    fn test_scale_floor_never_below_minimum() {
        let settings = EditorSettings {
            min_scale: 0.0,
            ..EditorSettings::default()
        };
        assert_eq!(settings.effective_min_scale(), MIN_SCALE);
    }
}
