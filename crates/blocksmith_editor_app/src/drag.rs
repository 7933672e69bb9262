// SPDX-License-Identifier: MIT OR Apache-2.0
//! Press-drag-release moving of the selection.
//!
//! Free and X/Z-locked drags follow the pointer across the ground plane.
//! Y-locked drags accumulate raw pointer motion and map it onto the camera's
//! right/up vectors, since the ground plane says nothing about height.

use crate::history::TransformChange;
use crate::listeners::{ListenerId, Listeners};
use crate::mode::{Axis, Mode, ModeManager};
use crate::selection::SelectionManager;
use blocksmith_editor_scene::{BlockId, BlockStore, Transform, Viewport, TRANSFORM_EPSILON};
use glam::{Vec2, Vec3};

#[derive(Debug, Clone)]
struct DragTarget {
    id: BlockId,
    /// Transform at drag start, used for commit diffs and cancel
    origin: Transform,
    /// Position the current delta is applied to; re-captured on axis switches
    basis: Vec3,
}

#[derive(Debug, Clone)]
struct DragSession {
    targets: Vec<DragTarget>,
    axis: Option<Axis>,
    start_ground: Option<Vec3>,
    accumulated: Vec2,
    last_ndc: Vec2,
    resting: Mode,
}

/// Drag gesture state
#[derive(Debug)]
pub struct DragHandler {
    session: Option<DragSession>,
    vertical_sensitivity: f32,
    commit_listeners: Listeners<[TransformChange]>,
}

impl DragHandler {
    /// Create an idle handler
    pub fn new(vertical_sensitivity: f32) -> Self {
        Self {
            session: None,
            vertical_sensitivity,
            commit_listeners: Listeners::new(),
        }
    }

    /// Whether a drag is in progress
    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    /// Axis lock of the drag in progress
    pub fn axis(&self) -> Option<Axis> {
        self.session.as_ref().and_then(|s| s.axis)
    }

    /// Change the vertical drag sensitivity
    pub fn set_vertical_sensitivity(&mut self, sensitivity: f32) {
        self.vertical_sensitivity = sensitivity;
    }

    /// Subscribe to committed drags
    pub fn add_commit_listener(&mut self, listener: impl FnMut(&[TransformChange]) + 'static) -> ListenerId {
        self.commit_listeners.add(listener)
    }

    /// Unsubscribe from committed drags
    pub fn remove_commit_listener(&mut self, id: ListenerId) -> bool {
        self.commit_listeners.remove(id)
    }

    /// Begin dragging the root blocks `ids` from the pointer position `ndc`.
    ///
    /// Returns false if none of the ids is a root block.
    pub fn start(
        &mut self,
        modes: &mut ModeManager,
        store: &BlockStore,
        viewport: &dyn Viewport,
        ids: &[BlockId],
        ndc: Vec2,
    ) -> bool {
        let targets: Vec<DragTarget> = ids
            .iter()
            .filter_map(|id| {
                store.transform(id).map(|origin| DragTarget {
                    id: id.clone(),
                    origin,
                    basis: origin.position,
                })
            })
            .collect();
        if targets.is_empty() {
            return false;
        }

        let block_ids = targets.iter().map(|t| t.id.clone()).collect();
        self.session = Some(DragSession {
            targets,
            axis: None,
            start_ground: viewport.screen_ray(ndc).intersect_horizontal_plane(0.0),
            accumulated: Vec2::ZERO,
            last_ndc: ndc,
            resting: modes.mode().resting(),
        });
        modes.set_mode(Mode::Dragging { block_ids });
        true
    }

    /// Follow the pointer. `movement` is the raw pointer delta in pixels.
    pub fn update(
        &mut self,
        store: &mut BlockStore,
        selection: &mut SelectionManager,
        viewport: &dyn Viewport,
        ndc: Vec2,
        movement: Vec2,
    ) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        session.last_ndc = ndc;

        let delta = if session.axis == Some(Axis::Y) {
            session.accumulated += movement;
            let s = self.vertical_sensitivity;
            let v = viewport.camera_right() * (session.accumulated.x * s)
                + viewport.camera_up() * (-session.accumulated.y * s);
            Vec3::new(0.0, v.y, 0.0)
        } else {
            let Some(ground) = viewport.screen_ray(ndc).intersect_horizontal_plane(0.0) else {
                return;
            };
            let Some(start) = session.start_ground else {
                session.start_ground = Some(ground);
                return;
            };
            let d = ground - start;
            match session.axis {
                Some(Axis::X) => Vec3::new(d.x, 0.0, 0.0),
                Some(Axis::Z) => Vec3::new(0.0, 0.0, d.z),
                _ => Vec3::new(d.x, 0.0, d.z),
            }
        };

        let updates: Vec<(BlockId, Transform)> = session
            .targets
            .iter()
            .map(|t| {
                let mut transform = store.transform(&t.id).unwrap_or(t.origin);
                transform.position = t.basis + delta;
                (t.id.clone(), transform)
            })
            .collect();
        selection.apply_transforms_for_ids(store, &updates);
    }

    /// Toggle an axis lock mid-drag without moving anything.
    ///
    /// The current positions become the new basis; the ground start point is
    /// re-derived from the last pointer position, or dropped when switching
    /// to Y where pointer motion accumulates from zero instead.
    pub fn toggle_axis(&mut self, store: &BlockStore, viewport: &dyn Viewport, axis: Axis) -> Option<Axis> {
        let session = self.session.as_mut()?;
        session.axis = axis.toggle(session.axis);
        for target in &mut session.targets {
            if let Some(current) = store.transform(&target.id) {
                target.basis = current.position;
            }
        }
        session.accumulated = Vec2::ZERO;
        session.start_ground = if session.axis == Some(Axis::Y) {
            None
        } else {
            viewport
                .screen_ray(session.last_ndc)
                .intersect_horizontal_plane(0.0)
        };
        session.axis
    }

    /// End the drag, returning the targets that actually moved
    pub fn commit(&mut self, modes: &mut ModeManager, store: &BlockStore) -> Vec<TransformChange> {
        let Some(session) = self.session.take() else {
            return Vec::new();
        };
        let changes: Vec<TransformChange> = session
            .targets
            .iter()
            .filter_map(|t| {
                let after = store.transform(&t.id)?;
                after.differs_from(&t.origin, TRANSFORM_EPSILON).then(|| TransformChange {
                    id: t.id.clone(),
                    before: t.origin,
                    after,
                })
            })
            .collect();
        modes.set_mode(session.resting);
        if !changes.is_empty() {
            tracing::debug!("Drag committed for {} blocks", changes.len());
            self.commit_listeners.notify(&changes);
        }
        changes
    }

    /// End the drag, snapping every target back to its origin
    pub fn cancel(&mut self, modes: &mut ModeManager, store: &mut BlockStore, selection: &mut SelectionManager) {
        let Some(session) = self.session.take() else {
            return;
        };
        let updates: Vec<(BlockId, Transform)> = session.targets.iter().map(|t| (t.id.clone(), t.origin)).collect();
        selection.apply_transforms_for_ids(store, &updates);
        modes.set_mode(session.resting);
        tracing::debug!("Drag cancelled");
    }
}
