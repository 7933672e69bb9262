// SPDX-License-Identifier: MIT OR Apache-2.0
//! Errors surfaced by editor commands.

use crate::history::HistoryError;
use crate::settings::SettingsError;
use blocksmith_editor_scene::{SceneError, StoreError};
use thiserror::Error;

/// Editor command errors
#[derive(Debug, Error)]
pub enum EditorError {
    /// Scene construction or (de)serialization failed
    #[error(transparent)]
    Scene(#[from] SceneError),

    /// The persistence back end failed
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Settings could not be read or written
    #[error(transparent)]
    Settings(#[from] SettingsError),

    /// Undo or redo failed
    #[error(transparent)]
    History(#[from] HistoryError),
}

/// Result type for editor commands
pub type Result<T> = std::result::Result<T, EditorError>;
