// SPDX-License-Identifier: MIT OR Apache-2.0
//! Error types for the scene crate.

use crate::block::BlockId;
use thiserror::Error;

/// Errors raised while building or (de)serializing a scene
#[derive(Debug, Error)]
pub enum SceneError {
    /// JSON encoding or decoding failed
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// A block id is already in use somewhere in the scene
    #[error("Block id already in use: {0}")]
    DuplicateId(BlockId),

    /// No block with this id exists
    #[error("Block not found: {0}")]
    UnknownBlock(BlockId),

    /// The scenario file declares a format version this build cannot read
    #[error("Unsupported scenario version: {0}")]
    UnsupportedVersion(u32),
}

/// Errors raised by persistence back ends
#[derive(Debug, Error)]
pub enum StoreError {
    /// Filesystem error
    #[error("File error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding or decoding failed
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// Stored scenario data could not be interpreted
    #[error("Scene error: {0}")]
    Scene(#[from] SceneError),

    /// No scenario with this id is stored
    #[error("Scenario not found: {0}")]
    ScenarioNotFound(String),
}
