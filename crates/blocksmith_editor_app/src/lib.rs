// SPDX-License-Identifier: MIT OR Apache-2.0
//! Interaction layer of the Blocksmith editor.
//!
//! This crate turns host input into scene edits:
//! - Mode tracking and input routing
//! - Click, box and drag selection
//! - Modal grab/rotate/scale transforms with axis locks
//! - Grouping and reusable components with live edit propagation
//! - Undo/redo, clipboard and settings
//!
//! ## Architecture
//!
//! [`EditorState`] owns the scene and every handler. A host feeds it
//! [`InputEvent`]s and reads back the scene, the selection and the mode;
//! the camera, pointer capture and storage are injected capabilities so
//! the whole editor runs headless.

pub mod clipboard;
pub mod component;
pub mod drag;
pub mod error;
pub mod group;
pub mod history;
pub mod input;
pub mod listeners;
pub mod modal;
pub mod mode;
pub mod picking;
pub mod platform;
pub mod selection;
pub mod settings;
pub mod state;

pub use clipboard::Clipboard;
pub use component::{ComponentManager, RuntimeComponent};
pub use drag::DragHandler;
pub use error::{EditorError, Result};
pub use history::{History, HistoryCommand, HistoryError, TransformChange};
pub use input::{Dispatch, InputEvent, Key, KeyEvent, Modifiers, PointerButton, PointerEvent};
pub use listeners::ListenerId;
pub use modal::{ModalSensitivity, TransformHandler};
pub use mode::{Axis, Mode, ModeManager, TransformKind};
pub use picking::{BoxSelect, SelectionHandler};
pub use platform::{HeadlessPlatform, PlatformHooks, PointerLockError};
pub use selection::{Highlight, OutlinePolicy, RoleOutlinePolicy, Selection, SelectionManager};
pub use settings::{EditorSettings, OutlinePalette, SettingsError};
pub use state::{EditorState, SceneSummary};
