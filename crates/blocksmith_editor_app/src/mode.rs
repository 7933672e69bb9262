// SPDX-License-Identifier: MIT OR Apache-2.0
//! Editor interaction mode.
//!
//! Exactly one [`Mode`] is active at any time. Only the interaction handlers
//! (and [`crate::EditorState`] for component edit sessions) change it; every
//! other piece of code reads it through [`ModeManager::mode`] or subscribes to
//! transitions.

use crate::listeners::{ListenerId, Listeners};
use blocksmith_editor_scene::{BlockId, ComponentId};
use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Kind of modal transform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransformKind {
    /// Move - G key
    Translate,
    /// Rotate - R key
    Rotate,
    /// Scale - F key
    Scale,
}

impl TransformKind {
    /// Get the name of this kind
    pub fn name(&self) -> &'static str {
        match self {
            Self::Translate => "Translate",
            Self::Rotate => "Rotate",
            Self::Scale => "Scale",
        }
    }

    /// Get the hotkey for this kind
    pub fn hotkey(&self) -> char {
        match self {
            Self::Translate => 'g',
            Self::Rotate => 'r',
            Self::Scale => 'f',
        }
    }

    /// Kind started by a hotkey, if any
    pub fn from_hotkey(key: char) -> Option<Self> {
        match key.to_ascii_lowercase() {
            'g' => Some(Self::Translate),
            'r' => Some(Self::Rotate),
            'f' => Some(Self::Scale),
            _ => None,
        }
    }
}

/// Single world axis used to constrain a drag or transform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    /// World X
    X,
    /// World Y
    Y,
    /// World Z
    Z,
}

impl Axis {
    /// Unit vector along the axis
    pub fn unit(&self) -> Vec3 {
        match self {
            Self::X => Vec3::X,
            Self::Y => Vec3::Y,
            Self::Z => Vec3::Z,
        }
    }

    /// Axis selected by a key, if any
    pub fn from_key(key: char) -> Option<Self> {
        match key.to_ascii_lowercase() {
            'x' => Some(Self::X),
            'y' => Some(Self::Y),
            'z' => Some(Self::Z),
            _ => None,
        }
    }

    /// Constraint after pressing this axis key while `current` is active.
    ///
    /// Pressing the active axis again clears the constraint.
    pub fn toggle(self, current: Option<Axis>) -> Option<Axis> {
        if current == Some(self) {
            None
        } else {
            Some(self)
        }
    }
}

/// What pointer and keyboard input means right now
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Mode {
    /// Nothing in progress
    #[default]
    Idle,
    /// Box selection in progress
    Selecting,
    /// Press-drag-release move in progress
    Dragging {
        /// Blocks being moved
        block_ids: Vec<BlockId>,
    },
    /// Modal transform in progress
    Transforming {
        /// Move, rotate or scale
        kind: TransformKind,
        /// Active axis constraint
        axis: Option<Axis>,
    },
    /// A component instance is exploded for editing
    ComponentEditing {
        /// Component being edited
        component_id: ComponentId,
    },
}

impl Mode {
    /// Short name for logs and status bars
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Selecting => "selecting",
            Self::Dragging { .. } => "dragging",
            Self::Transforming { .. } => "transforming",
            Self::ComponentEditing { .. } => "component-editing",
        }
    }

    /// Whether no gesture is in progress (idle or inside a component edit)
    pub fn is_resting(&self) -> bool {
        matches!(self, Self::Idle | Self::ComponentEditing { .. })
    }

    /// The mode to return to after a gesture started from this mode ends
    pub fn resting(&self) -> Mode {
        match self {
            Self::ComponentEditing { .. } => self.clone(),
            _ => Self::Idle,
        }
    }
}

/// Owner of the current mode
#[derive(Debug, Default)]
pub struct ModeManager {
    mode: Mode,
    listeners: Listeners<Mode>,
}

impl ModeManager {
    /// Create a manager in [`Mode::Idle`]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current mode
    pub fn mode(&self) -> &Mode {
        &self.mode
    }

    /// Replace the mode and notify listeners synchronously
    pub(crate) fn set_mode(&mut self, next: Mode) {
        if self.mode != next {
            tracing::debug!("Mode {} -> {}", self.mode.name(), next.name());
        }
        self.mode = next;
        self.listeners.notify(&self.mode);
    }

    /// Whether a modal transform is in progress
    pub fn is_transforming(&self) -> bool {
        matches!(self.mode, Mode::Transforming { .. })
    }

    /// Axis constraint of the modal transform in progress
    pub fn transform_axis(&self) -> Option<Axis> {
        match self.mode {
            Mode::Transforming { axis, .. } => axis,
            _ => None,
        }
    }

    /// Change the axis of the modal transform in progress.
    ///
    /// Does nothing outside [`Mode::Transforming`].
    pub(crate) fn set_transform_axis(&mut self, axis: Option<Axis>) {
        if let Mode::Transforming { kind, .. } = self.mode {
            self.set_mode(Mode::Transforming { kind, axis });
        }
    }

    /// Subscribe to mode changes
    pub fn add_listener(&mut self, listener: impl FnMut(&Mode) + 'static) -> ListenerId {
        self.listeners.add(listener)
    }

    /// Unsubscribe from mode changes
    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }
}
