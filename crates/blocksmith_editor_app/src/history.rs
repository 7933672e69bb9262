// SPDX-License-Identifier: MIT OR Apache-2.0
//! Undo/redo history.
//!
//! Every entry is a tagged command carrying enough before/after data to be
//! applied in either direction. Entries live in one list with a cursor: the
//! entries before the cursor can be undone, those after it redone.

use blocksmith_editor_scene::serializer::serialize_block;
use blocksmith_editor_scene::{Block, BlockId, SceneError, Transform};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use thiserror::Error;

/// Maximum undo history depth
const MAX_HISTORY: usize = 100;

/// History errors
#[derive(Debug, Error)]
pub enum HistoryError {
    /// Nothing to undo
    #[error("Nothing to undo")]
    NothingToUndo,

    /// Nothing to redo
    #[error("Nothing to redo")]
    NothingToRedo,

    /// The scene no longer matches the recorded command
    #[error("Scene conflict: {0}")]
    Conflict(#[from] SceneError),
}

/// Result type for history operations
pub type Result<T> = std::result::Result<T, HistoryError>;

/// A committed transform change of one block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformChange {
    /// Changed block
    pub id: BlockId,
    /// Transform before the change
    pub before: Transform,
    /// Transform after the change
    pub after: Transform,
}

/// A root block together with its position in the root order
#[derive(Debug, Clone, PartialEq)]
pub struct RootEntry {
    /// Index in the root order
    pub index: usize,
    /// The block and its subtree
    pub block: Block,
}

/// An undoable editor command
#[derive(Debug, Clone, PartialEq)]
pub enum HistoryCommand {
    /// Root blocks were added
    Add {
        /// Added blocks
        entries: Vec<RootEntry>,
    },
    /// Root blocks were deleted
    Delete {
        /// Deleted blocks
        entries: Vec<RootEntry>,
    },
    /// One block's transform changed
    Transform(TransformChange),
    /// Several blocks' transforms changed together
    MultiTransform {
        /// Changes in application order
        changes: Vec<TransformChange>,
    },
    /// Root blocks were moved into a new group
    Group {
        /// The new group
        group: RootEntry,
        /// The blocks as they were before grouping
        children: Vec<RootEntry>,
    },
    /// Containers were dissolved into root blocks
    Ungroup {
        /// The containers as they were before ungrouping
        groups: Vec<RootEntry>,
        /// The restored blocks
        children: Vec<RootEntry>,
    },
}

impl HistoryCommand {
    /// Build a transform command from committed changes, if any
    pub fn from_changes(mut changes: Vec<TransformChange>) -> Option<Self> {
        match changes.len() {
            0 => None,
            1 => changes.pop().map(Self::Transform),
            _ => Some(Self::MultiTransform { changes }),
        }
    }

    /// Human-readable description
    pub fn description(&self) -> String {
        match self {
            Self::Add { entries } => format!("Add {} block(s)", entries.len()),
            Self::Delete { entries } => format!("Delete {} block(s)", entries.len()),
            Self::Transform(change) => format!("Transform {}", change.id),
            Self::MultiTransform { changes } => format!("Transform {} blocks", changes.len()),
            Self::Group { group, .. } => format!("Group into {}", group.block.id),
            Self::Ungroup { groups, .. } => format!("Ungroup {} container(s)", groups.len()),
        }
    }

    /// Approximate memory footprint in bytes
    pub fn memory_size(&self) -> usize {
        let size = match self {
            Self::Add { entries } | Self::Delete { entries } => entries_size(entries),
            Self::Transform(change) => bincode::serialized_size(change).unwrap_or(0),
            Self::MultiTransform { changes } => bincode::serialized_size(changes).unwrap_or(0),
            Self::Group { group, children } => entries_size(std::slice::from_ref(group)) + entries_size(children),
            Self::Ungroup { groups, children } => entries_size(groups) + entries_size(children),
        };
        size as usize
    }

    /// Replace every reference to `id` with `new_id`
    pub fn rename_block(&mut self, id: &BlockId, new_id: &BlockId) {
        match self {
            Self::Add { entries } | Self::Delete { entries } => rename_entries(entries, id, new_id),
            Self::Transform(change) => rename_change(change, id, new_id),
            Self::MultiTransform { changes } => {
                for change in changes {
                    rename_change(change, id, new_id);
                }
            }
            Self::Group { group, children } => {
                rename_in_tree(&mut group.block, id, new_id);
                rename_entries(children, id, new_id);
            }
            Self::Ungroup { groups, children } => {
                rename_entries(groups, id, new_id);
                rename_entries(children, id, new_id);
            }
        }
    }
}

fn entries_size(entries: &[RootEntry]) -> u64 {
    entries
        .iter()
        .map(|e| bincode::serialized_size(&serialize_block(&e.block)).unwrap_or(0))
        .sum()
}

fn rename_change(change: &mut TransformChange, id: &BlockId, new_id: &BlockId) {
    if &change.id == id {
        change.id = new_id.clone();
    }
}

fn rename_entries(entries: &mut [RootEntry], id: &BlockId, new_id: &BlockId) {
    for entry in entries {
        rename_in_tree(&mut entry.block, id, new_id);
    }
}

fn rename_in_tree(block: &mut Block, id: &BlockId, new_id: &BlockId) {
    if let Some(found) = block.find_mut(id) {
        found.id = new_id.clone();
    }
}

/// A recorded command
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    /// Sequence number
    pub sequence: u64,
    /// Human-readable description
    pub description: String,
    /// The command
    pub command: HistoryCommand,
}

/// History statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HistoryStats {
    /// Entries that can be undone
    pub undo_count: usize,
    /// Entries that can be redone
    pub redo_count: usize,
    /// Total memory used by history (bytes)
    pub memory_used: usize,
    /// Maximum history depth
    pub max_depth: usize,
}

/// Undo/redo history manager
#[derive(Debug)]
pub struct History {
    entries: VecDeque<HistoryEntry>,
    cursor: usize,
    next_sequence: u64,
    max_depth: usize,
}

impl History {
    /// Create a new history manager
    pub fn new() -> Self {
        Self::with_max_depth(MAX_HISTORY)
    }

    /// Create with custom maximum depth
    pub fn with_max_depth(max_depth: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            cursor: 0,
            next_sequence: 1,
            max_depth: max_depth.max(1),
        }
    }

    /// Record a command, discarding anything that could have been redone
    pub fn push(&mut self, command: HistoryCommand) {
        self.entries.truncate(self.cursor);
        let description = command.description();
        tracing::debug!("History: {}", description);
        self.entries.push_back(HistoryEntry {
            sequence: self.next_sequence,
            description,
            command,
        });
        self.next_sequence += 1;

        while self.entries.len() > self.max_depth {
            self.entries.pop_front();
        }
        self.cursor = self.entries.len();
    }

    /// Step back, returning the command to invert
    pub fn undo(&mut self) -> Result<&HistoryCommand> {
        if self.cursor == 0 {
            return Err(HistoryError::NothingToUndo);
        }
        self.cursor -= 1;
        self.entries
            .get(self.cursor)
            .map(|e| &e.command)
            .ok_or(HistoryError::NothingToUndo)
    }

    /// Step forward, returning the command to re-apply
    pub fn redo(&mut self) -> Result<&HistoryCommand> {
        if self.cursor >= self.entries.len() {
            return Err(HistoryError::NothingToRedo);
        }
        self.cursor += 1;
        self.entries
            .get(self.cursor - 1)
            .map(|e| &e.command)
            .ok_or(HistoryError::NothingToRedo)
    }

    /// Check if undo is available
    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    /// Check if redo is available
    pub fn can_redo(&self) -> bool {
        self.cursor < self.entries.len()
    }

    /// Number of entries that can be undone
    pub fn undo_depth(&self) -> usize {
        self.cursor
    }

    /// Number of entries that can be redone
    pub fn redo_depth(&self) -> usize {
        self.entries.len() - self.cursor
    }

    /// Clear all history
    pub fn clear(&mut self) {
        self.entries.clear();
        self.cursor = 0;
    }

    /// Rewrite recorded references after a block id changed
    pub fn rename_block(&mut self, id: &BlockId, new_id: &BlockId) {
        for entry in &mut self.entries {
            entry.command.rename_block(id, new_id);
        }
    }

    /// Get history statistics
    pub fn stats(&self) -> HistoryStats {
        HistoryStats {
            undo_count: self.undo_depth(),
            redo_count: self.redo_depth(),
            memory_used: self.entries.iter().map(|e| e.command.memory_size()).sum(),
            max_depth: self.max_depth,
        }
    }

    /// Get description of next undo operation
    pub fn undo_description(&self) -> Option<&str> {
        self.cursor
            .checked_sub(1)
            .and_then(|i| self.entries.get(i))
            .map(|e| e.description.as_str())
    }

    /// Get description of next redo operation
    pub fn redo_description(&self) -> Option<&str> {
        self.entries.get(self.cursor).map(|e| e.description.as_str())
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}
