// SPDX-License-Identifier: MIT OR Apache-2.0
//! Modal move / rotate / scale.
//!
//! A session starts from a hotkey, previews while the pointer moves under
//! pointer lock, and ends with a click or Enter (commit) or Escape / lock loss
//! (cancel). Every update recomputes all targets from their captured origins,
//! so coalesced or dropped pointer events cannot accumulate drift.

use crate::history::TransformChange;
use crate::mode::{Axis, Mode, ModeManager, TransformKind};
use crate::platform::{PlatformHooks, PointerLockGuard};
use crate::selection::SelectionManager;
use crate::settings::EditorSettings;
use blocksmith_editor_scene::{BlockId, BlockStore, Transform, Viewport, TRANSFORM_EPSILON};
use glam::{Vec2, Vec3};

/// Smallest uniform ratio a scale gesture can produce
const MIN_SCALE_RATIO: f32 = 0.01;

/// Pointer-to-world conversion factors
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModalSensitivity {
    /// World units per pixel
    pub translate: f32,
    /// Radians per pixel
    pub rotate: f32,
    /// Scale ratio per pixel
    pub scale: f32,
    /// Smallest scale component
    pub min_scale: f32,
}

impl From<&EditorSettings> for ModalSensitivity {
    fn from(settings: &EditorSettings) -> Self {
        Self {
            translate: settings.move_sensitivity,
            rotate: settings.rotate_sensitivity,
            scale: settings.scale_sensitivity,
            min_scale: settings.effective_min_scale(),
        }
    }
}

impl Default for ModalSensitivity {
    fn default() -> Self {
        Self::from(&EditorSettings::default())
    }
}

/// Transform of a target after an accumulated pointer delta.
///
/// `delta` is in pixels with y pointing down. Camera right/up are only used by
/// translation.
pub fn apply_modal_delta(
    kind: TransformKind,
    axis: Option<Axis>,
    origin: &Transform,
    delta: Vec2,
    camera_right: Vec3,
    camera_up: Vec3,
    sensitivity: &ModalSensitivity,
) -> Transform {
    let mut result = *origin;
    match kind {
        TransformKind::Translate => {
            let world = (camera_right * delta.x - camera_up * delta.y) * sensitivity.translate;
            let offset = match axis {
                None => Vec3::new(world.x, 0.0, world.z),
                Some(axis) => axis.unit() * world.dot(axis.unit()),
            };
            result.position = origin.position + offset;
        }
        TransformKind::Rotate => {
            let s = sensitivity.rotate;
            match axis {
                None | Some(Axis::Y) => result.rotation.y = origin.rotation.y + delta.x * s,
                Some(Axis::X) => result.rotation.x = origin.rotation.x + delta.y * s,
                Some(Axis::Z) => result.rotation.z = origin.rotation.z + delta.x * s,
            }
        }
        TransformKind::Scale => {
            let ratio = (1.0 - delta.y * sensitivity.scale).max(MIN_SCALE_RATIO);
            result.scale = match axis {
                None => origin.scale * ratio,
                Some(axis) => origin.scale * (Vec3::ONE + axis.unit() * (ratio - 1.0)),
            };
            result = result.with_scale_floor(sensitivity.min_scale);
        }
    }
    result
}

#[derive(Debug, Clone)]
struct ModalSession {
    kind: TransformKind,
    axis: Option<Axis>,
    targets: Vec<(BlockId, Transform)>,
    delta: Vec2,
    resting: Mode,
}

/// Modal transform state
#[derive(Debug)]
pub struct TransformHandler {
    session: Option<ModalSession>,
    lock: PointerLockGuard,
    sensitivity: ModalSensitivity,
}

impl TransformHandler {
    /// Create an idle handler
    pub fn new(sensitivity: ModalSensitivity) -> Self {
        Self {
            session: None,
            lock: PointerLockGuard::new(),
            sensitivity,
        }
    }

    /// Whether a session is in progress
    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    /// Whether the pointer lock is held
    pub fn has_pointer_lock(&self) -> bool {
        self.lock.is_held()
    }

    /// Accumulated pointer delta of the session in progress
    pub fn delta(&self) -> Option<Vec2> {
        self.session.as_ref().map(|s| s.delta)
    }

    /// Replace the conversion factors
    pub fn set_sensitivity(&mut self, sensitivity: ModalSensitivity) {
        self.sensitivity = sensitivity;
    }

    /// Start a session on the selected root blocks.
    ///
    /// Returns false, changing nothing, when no root block is selected.
    pub fn begin(
        &mut self,
        kind: TransformKind,
        modes: &mut ModeManager,
        store: &BlockStore,
        selection: &SelectionManager,
        platform: &mut dyn PlatformHooks,
    ) -> bool {
        if self.session.is_some() {
            return false;
        }
        let targets: Vec<(BlockId, Transform)> = selection
            .ids()
            .iter()
            .filter_map(|id| store.transform(id).map(|t| (id.clone(), t)))
            .collect();
        if targets.is_empty() {
            return false;
        }

        tracing::debug!("{} started on {} blocks", kind.name(), targets.len());
        self.session = Some(ModalSession {
            kind,
            axis: None,
            targets,
            delta: Vec2::ZERO,
            resting: modes.mode().resting(),
        });
        modes.set_mode(Mode::Transforming { kind, axis: None });
        platform.set_orbit_enabled(false);
        self.lock.acquire(platform);
        true
    }

    /// Accumulate pointer motion and recompute every target
    pub fn update(
        &mut self,
        store: &mut BlockStore,
        selection: &mut SelectionManager,
        viewport: &dyn Viewport,
        movement: Vec2,
    ) {
        if let Some(session) = self.session.as_mut() {
            session.delta += movement;
        }
        self.apply(store, selection, viewport);
    }

    /// Toggle an axis constraint; pressing the active axis clears it
    pub fn toggle_axis(
        &mut self,
        axis: Axis,
        modes: &mut ModeManager,
        store: &mut BlockStore,
        selection: &mut SelectionManager,
        viewport: &dyn Viewport,
    ) -> Option<Axis> {
        let session = self.session.as_mut()?;
        session.axis = axis.toggle(session.axis);
        let next = session.axis;
        modes.set_transform_axis(next);
        self.apply(store, selection, viewport);
        next
    }

    fn apply(&self, store: &mut BlockStore, selection: &mut SelectionManager, viewport: &dyn Viewport) {
        let Some(session) = self.session.as_ref() else {
            return;
        };
        let right = viewport.camera_right();
        let up = viewport.camera_up();
        let updates: Vec<(BlockId, Transform)> = session
            .targets
            .iter()
            .map(|(id, origin)| {
                let next = apply_modal_delta(
                    session.kind,
                    session.axis,
                    origin,
                    session.delta,
                    right,
                    up,
                    &self.sensitivity,
                );
                (id.clone(), next)
            })
            .collect();
        selection.apply_transforms_for_ids(store, &updates);
    }

    /// End the session keeping the preview, returning targets that changed
    pub fn commit(
        &mut self,
        modes: &mut ModeManager,
        store: &BlockStore,
        platform: &mut dyn PlatformHooks,
    ) -> Vec<TransformChange> {
        let Some(session) = self.session.take() else {
            return Vec::new();
        };
        let changes: Vec<TransformChange> = session
            .targets
            .iter()
            .filter_map(|(id, origin)| {
                let after = store.transform(id)?;
                after.differs_from(origin, TRANSFORM_EPSILON).then(|| TransformChange {
                    id: id.clone(),
                    before: *origin,
                    after,
                })
            })
            .collect();
        self.finish(modes, platform, session.resting);
        tracing::debug!("{} committed for {} blocks", session.kind.name(), changes.len());
        changes
    }

    /// End the session restoring every target's origin
    pub fn cancel(
        &mut self,
        modes: &mut ModeManager,
        store: &mut BlockStore,
        selection: &mut SelectionManager,
        platform: &mut dyn PlatformHooks,
    ) {
        let Some(session) = self.session.take() else {
            return;
        };
        selection.apply_transforms_for_ids(store, &session.targets);
        self.finish(modes, platform, session.resting);
        tracing::debug!("{} cancelled", session.kind.name());
    }

    /// The host revoked the pointer lock: cancel like Escape
    pub fn pointer_lock_lost(
        &mut self,
        modes: &mut ModeManager,
        store: &mut BlockStore,
        selection: &mut SelectionManager,
        platform: &mut dyn PlatformHooks,
    ) {
        self.lock.mark_lost();
        self.cancel(modes, store, selection, platform);
    }

    /// Release the pointer lock without touching anything else
    pub fn release_pointer_lock(&mut self, platform: &mut dyn PlatformHooks) {
        self.lock.release(platform);
    }

    fn finish(&mut self, modes: &mut ModeManager, platform: &mut dyn PlatformHooks, resting: Mode) {
        self.lock.release(platform);
        platform.set_orbit_enabled(true);
        modes.set_mode(resting);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::testing::RecordingPlatform;
    use blocksmith_editor_scene::{OrbitCamera, MIN_SCALE};
    use proptest::prelude::*;

    struct Fixture {
        modes: ModeManager,
        store: BlockStore,
        selection: SelectionManager,
        camera: OrbitCamera,
        platform: RecordingPlatform,
        handler: TransformHandler,
        id: BlockId,
    }

    fn fixture() -> Fixture {
        let mut store = BlockStore::new();
        let id = store.create_cuboid(Transform::from_position(Vec3::new(1.0, 2.0, 3.0)));
        let mut selection = SelectionManager::default();
        selection.set_selection_single(&mut store, &id);
        Fixture {
            modes: ModeManager::new(),
            store,
            selection,
            camera: OrbitCamera::looking_at(Vec3::ZERO, 0.4, 0.5, 10.0),
            platform: RecordingPlatform::new(true),
            handler: TransformHandler::new(ModalSensitivity::default()),
            id,
        }
    }

    impl Fixture {
        fn begin(&mut self, kind: TransformKind) -> bool {
            self.handler
                .begin(kind, &mut self.modes, &self.store, &self.selection, &mut self.platform)
        }

        fn pointer(&mut self, dx: f32, dy: f32) {
            self.handler
                .update(&mut self.store, &mut self.selection, &self.camera, Vec2::new(dx, dy));
        }

        fn axis(&mut self, axis: Axis) -> Option<Axis> {
            self.handler
                .toggle_axis(axis, &mut self.modes, &mut self.store, &mut self.selection, &self.camera)
        }

        fn commit(&mut self) -> Vec<TransformChange> {
            self.handler.commit(&mut self.modes, &self.store, &mut self.platform)
        }

        fn transform(&self) -> Transform {
            self.store.transform(&self.id).unwrap()
        }
    }

    #[test]
    fn test_begin_requires_selection() {
        let mut f = fixture();
        f.selection.clear_selection(&mut f.store);
        assert!(!f.begin(TransformKind::Translate));
        assert_eq!(f.modes.mode(), &Mode::Idle);
        assert_eq!(f.platform.log.borrow().lock_requests, 0);
    }

    #[test]
    fn test_session_locks_pointer_and_disables_orbit() {
        let mut f = fixture();
        assert!(f.begin(TransformKind::Rotate));
        assert!(f.handler.has_pointer_lock());
        assert_eq!(f.platform.log.borrow().orbit_enabled, Some(false));

        f.commit();
        assert!(!f.handler.has_pointer_lock());
        assert_eq!(f.platform.log.borrow().lock_exits, 1);
        assert_eq!(f.platform.log.borrow().orbit_enabled, Some(true));
        assert_eq!(f.modes.mode(), &Mode::Idle);
    }

    #[test]
    fn test_refused_lock_keeps_session_working() {
        let mut f = fixture();
        f.platform.grant_lock = false;
        assert!(f.begin(TransformKind::Translate));
        assert!(!f.handler.has_pointer_lock());
        f.pointer(25.0, 0.0);
        assert_eq!(f.commit().len(), 1);
        assert_eq!(f.platform.log.borrow().lock_exits, 0);
    }

    #[test]
    fn test_free_translate_stays_on_ground_plane() {
        let mut f = fixture();
        f.begin(TransformKind::Translate);
        f.pointer(40.0, -30.0);
        let t = f.transform();
        assert_eq!(t.position.y, 2.0);
        assert!(t.position.x != 1.0 || t.position.z != 3.0);
    }

    #[test]
    fn test_axis_switch_x_then_y_moves_only_y() {
        let mut f = fixture();
        let before = f.transform();
        f.begin(TransformKind::Translate);
        f.pointer(35.0, -20.0);
        assert_eq!(f.axis(Axis::X), Some(Axis::X));
        assert_eq!(f.modes.transform_axis(), Some(Axis::X));
        assert_eq!(f.axis(Axis::Y), Some(Axis::Y));
        assert_eq!(f.modes.transform_axis(), Some(Axis::Y));

        let changes = f.commit();
        assert_eq!(changes.len(), 1);
        let after = f.transform();
        assert_ne!(after.position.y, before.position.y);
        assert_eq!(after.position.x, before.position.x);
        assert_eq!(after.position.z, before.position.z);
        assert_eq!(after.rotation, before.rotation);
        assert_eq!(after.scale, before.scale);
    }

    #[test]
    fn test_pressing_same_axis_clears_lock() {
        let mut f = fixture();
        f.begin(TransformKind::Scale);
        f.axis(Axis::Z);
        assert_eq!(f.axis(Axis::Z), None);
        assert_eq!(f.modes.transform_axis(), None);
    }

    #[test]
    fn test_rotation_axis_mapping() {
        let s = ModalSensitivity::default();
        let origin = Transform::IDENTITY;
        let delta = Vec2::new(10.0, 20.0);
        let rotate = |axis| {
            apply_modal_delta(TransformKind::Rotate, axis, &origin, delta, Vec3::X, Vec3::Y, &s).rotation
        };
        assert_eq!(rotate(None), Vec3::new(0.0, 10.0 * s.rotate, 0.0));
        assert_eq!(rotate(Some(Axis::X)), Vec3::new(20.0 * s.rotate, 0.0, 0.0));
        assert_eq!(rotate(Some(Axis::Y)), Vec3::new(0.0, 10.0 * s.rotate, 0.0));
        assert_eq!(rotate(Some(Axis::Z)), Vec3::new(0.0, 0.0, 10.0 * s.rotate));
    }

    #[test]
    fn test_axis_scale_touches_one_component() {
        let s = ModalSensitivity::default();
        let origin = Transform::IDENTITY;
        let scaled = apply_modal_delta(
            TransformKind::Scale,
            Some(Axis::X),
            &origin,
            Vec2::new(0.0, -50.0),
            Vec3::X,
            Vec3::Y,
            &s,
        );
        assert!((scaled.scale.x - 1.5).abs() < 1e-5);
        assert_eq!((scaled.scale.y, scaled.scale.z), (1.0, 1.0));
    }

    #[test]
    fn test_cancel_restores_origin() {
        let mut f = fixture();
        let before = f.transform();
        f.begin(TransformKind::Scale);
        f.pointer(0.0, 60.0);
        assert_ne!(f.transform(), before);
        f.handler
            .cancel(&mut f.modes, &mut f.store, &mut f.selection, &mut f.platform);
        assert_eq!(f.transform(), before);
        assert_eq!(f.platform.log.borrow().lock_exits, 1);
    }

    #[test]
    fn test_lock_loss_cancels() {
        let mut f = fixture();
        let before = f.transform();
        f.begin(TransformKind::Translate);
        f.pointer(80.0, 0.0);
        f.handler
            .pointer_lock_lost(&mut f.modes, &mut f.store, &mut f.selection, &mut f.platform);
        assert_eq!(f.transform(), before);
        assert!(!f.handler.is_active());
        // The host already released the lock
        assert_eq!(f.platform.log.borrow().lock_exits, 0);
        assert_eq!(f.modes.mode(), &Mode::Idle);
    }

    #[test]
    fn test_zero_motion_commit_is_noop() {
        let mut f = fixture();
        let before = f.transform();
        f.begin(TransformKind::Rotate);
        f.pointer(0.0, 0.0);
        assert!(f.commit().is_empty());
        assert_eq!(f.transform(), before);
        assert_eq!(f.modes.mode(), &Mode::Idle);
    }

    proptest! {
        #[test]
        fn prop_scale_never_below_floor(
            deltas in prop::collection::vec((-500.0f32..500.0, -500.0f32..500.0), 1..20),
            axis in prop::option::of(prop_oneof![Just(Axis::X), Just(Axis::Y), Just(Axis::Z)]),
            start in 0.1f32..5.0,
        ) {
            let s = ModalSensitivity::default();
            let origin = Transform { scale: Vec3::splat(start), ..Transform::IDENTITY };
            let mut delta = Vec2::ZERO;
            for (dx, dy) in deltas {
                delta += Vec2::new(dx, dy);
                let t = apply_modal_delta(TransformKind::Scale, axis, &origin, delta, Vec3::X, Vec3::Y, &s);
                prop_assert!(t.scale.min_element() >= MIN_SCALE);
            }
        }

        #[test]
        fn prop_x_locked_translate_changes_only_x(
            dx in -500.0f32..500.0,
            dy in -500.0f32..500.0,
            yaw in -3.0f32..3.0,
            pitch in -1.2f32..1.2,
        ) {
            let camera = OrbitCamera::looking_at(Vec3::ZERO, yaw, pitch, 10.0);
            let origin = Transform::from_position(Vec3::new(1.0, 2.0, 3.0));
            let t = apply_modal_delta(
                TransformKind::Translate,
                Some(Axis::X),
                &origin,
                Vec2::new(dx, dy),
                camera.camera_right(),
                camera.camera_up(),
                &ModalSensitivity::default(),
            );
            prop_assert_eq!(t.position.y, 2.0);
            prop_assert_eq!(t.position.z, 3.0);
        }
    }
}
