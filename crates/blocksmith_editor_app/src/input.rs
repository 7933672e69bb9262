// SPDX-License-Identifier: MIT OR Apache-2.0
//! Input events and the router that hands them to the handler owning the
//! current mode.
//!
//! The router is the only place pointer and key events enter the editor. It
//! never queues: an event whose handler is not engaged is dropped, so nothing
//! from a cancelled session leaks into the next one.

use crate::mode::{Axis, Mode, TransformKind};
use crate::picking::{PickContext, PickOutcome};
use crate::state::EditorState;
use glam::Vec2;

/// Pointer button
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    /// Left button, reserved for selection and gestures
    Primary,
    /// Right button, owned by the orbit camera
    Secondary,
    /// Middle button, owned by the orbit camera
    Middle,
}

/// Keyboard modifiers held during an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    /// Shift
    pub shift: bool,
    /// Control
    pub ctrl: bool,
    /// Meta / command
    pub meta: bool,
    /// Alt / option
    pub alt: bool,
}

impl Modifiers {
    /// Whether a click should toggle selection membership
    pub fn is_additive(&self) -> bool {
        self.shift || self.ctrl || self.meta
    }

    /// Whether shortcuts should be read as commands (copy, undo, ...)
    pub fn is_command(&self) -> bool {
        self.ctrl || self.meta
    }
}

/// Pointer event
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    /// Button that changed (or is held, for moves)
    pub button: PointerButton,
    /// Pointer position in normalized device coordinates
    pub ndc: Vec2,
    /// Raw movement since the last event, in pixels (y down)
    pub movement: Vec2,
    /// Held modifiers
    pub modifiers: Modifiers,
}

impl PointerEvent {
    /// Primary-button event at `ndc` with no movement
    pub fn primary(ndc: Vec2) -> Self {
        Self {
            button: PointerButton::Primary,
            ndc,
            movement: Vec2::ZERO,
            modifiers: Modifiers::default(),
        }
    }

    /// Pointer motion by `movement` pixels ending at `ndc`
    pub fn moved(ndc: Vec2, movement: Vec2) -> Self {
        Self {
            movement,
            ..Self::primary(ndc)
        }
    }
}

/// Key identity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    /// A printable key
    Char(char),
    /// Escape
    Escape,
    /// Enter / return
    Enter,
    /// Space bar
    Space,
    /// Tab
    Tab,
    /// Delete or backspace
    Delete,
    /// Anything else
    Other,
}

/// Key-down event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    /// Pressed key
    pub key: Key,
    /// Held modifiers
    pub modifiers: Modifiers,
}

impl KeyEvent {
    /// Key press without modifiers
    pub fn plain(key: Key) -> Self {
        Self {
            key,
            modifiers: Modifiers::default(),
        }
    }

    /// Character key press without modifiers
    pub fn char(c: char) -> Self {
        Self::plain(Key::Char(c))
    }

    /// Character key press with control held
    pub fn ctrl(c: char) -> Self {
        Self {
            key: Key::Char(c),
            modifiers: Modifiers {
                ctrl: true,
                ..Modifiers::default()
            },
        }
    }
}

/// Everything the host forwards to the editor
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    /// A button was pressed over the canvas
    PointerDown(PointerEvent),
    /// The pointer moved
    PointerMove(PointerEvent),
    /// A button was released
    PointerUp(PointerEvent),
    /// The platform cancelled the pointer sequence (left the canvas, touch cancel)
    PointerCancel,
    /// A key was pressed
    KeyDown(KeyEvent),
    /// The window lost focus
    WindowBlur,
    /// The platform revoked pointer lock
    PointerLockLost,
}

/// Where the router sent an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Nobody wanted it
    Ignored,
    /// Left to the host's orbit camera
    Camera,
    /// Selection changed by a click
    Selection,
    /// Box selection
    BoxSelect,
    /// Drag handler
    Drag,
    /// Modal transform handler
    Transform,
    /// An editor command ran
    Command,
    /// Dropped because a text field has focus
    Suppressed,
}

impl EditorState {
    /// Route one input event according to the current mode
    pub fn handle_input(&mut self, event: &InputEvent) -> Dispatch {
        match event {
            InputEvent::PointerDown(pointer) => self.pointer_down(pointer),
            InputEvent::PointerMove(pointer) => self.pointer_move(pointer),
            InputEvent::PointerUp(pointer) => self.pointer_up(pointer),
            InputEvent::PointerCancel | InputEvent::WindowBlur => self.cancel_interaction(),
            InputEvent::PointerLockLost => {
                if !self.transform.is_active() {
                    return Dispatch::Ignored;
                }
                self.transform.pointer_lock_lost(
                    &mut self.modes,
                    &mut self.store,
                    &mut self.selection,
                    self.platform.as_mut(),
                );
                Dispatch::Transform
            }
            InputEvent::KeyDown(key) => self.key_down(key),
        }
    }

    /// Cancel whatever gesture is in progress, restoring every target.
    ///
    /// A component edit session is left alone.
    pub fn cancel_interaction(&mut self) -> Dispatch {
        match self.modes.mode() {
            Mode::Dragging { .. } => {
                self.drag.cancel(&mut self.modes, &mut self.store, &mut self.selection);
                Dispatch::Drag
            }
            Mode::Transforming { .. } => {
                self.transform.cancel(
                    &mut self.modes,
                    &mut self.store,
                    &mut self.selection,
                    self.platform.as_mut(),
                );
                Dispatch::Transform
            }
            Mode::Selecting => {
                self.picking.cancel(&mut self.modes);
                Dispatch::BoxSelect
            }
            Mode::Idle | Mode::ComponentEditing { .. } => Dispatch::Ignored,
        }
    }

    fn pointer_down(&mut self, event: &PointerEvent) -> Dispatch {
        match self.modes.mode() {
            // A click confirms the modal transform and never starts anything
            Mode::Transforming { .. } => {
                self.commit_transform();
                Dispatch::Transform
            }
            Mode::Dragging { .. } => Dispatch::Ignored,
            Mode::Idle | Mode::Selecting | Mode::ComponentEditing { .. } => {
                let cx = PickContext {
                    store: &mut self.store,
                    selection: &mut self.selection,
                    modes: &mut self.modes,
                    components: &self.components,
                    drag: &mut self.drag,
                    viewport: self.viewport.as_ref(),
                };
                match self.picking.pointer_down(event, cx) {
                    PickOutcome::NotHandled if event.button != PointerButton::Primary => Dispatch::Camera,
                    PickOutcome::NotHandled => Dispatch::Ignored,
                    PickOutcome::Hit { dragging: true, .. } => Dispatch::Drag,
                    PickOutcome::Hit { .. } => Dispatch::Selection,
                    PickOutcome::BoxStarted => Dispatch::BoxSelect,
                }
            }
        }
    }

    fn pointer_move(&mut self, event: &PointerEvent) -> Dispatch {
        match self.modes.mode() {
            Mode::Dragging { .. } => {
                self.drag.update(
                    &mut self.store,
                    &mut self.selection,
                    self.viewport.as_ref(),
                    event.ndc,
                    event.movement,
                );
                Dispatch::Drag
            }
            Mode::Transforming { .. } => {
                self.transform.update(
                    &mut self.store,
                    &mut self.selection,
                    self.viewport.as_ref(),
                    event.movement,
                );
                Dispatch::Transform
            }
            Mode::Selecting => {
                self.picking.pointer_move(event.ndc);
                Dispatch::BoxSelect
            }
            Mode::Idle | Mode::ComponentEditing { .. } => Dispatch::Camera,
        }
    }

    fn pointer_up(&mut self, event: &PointerEvent) -> Dispatch {
        match self.modes.mode() {
            Mode::Dragging { .. } => {
                self.commit_drag();
                Dispatch::Drag
            }
            Mode::Selecting => {
                self.picking.pointer_move(event.ndc);
                let cx = PickContext {
                    store: &mut self.store,
                    selection: &mut self.selection,
                    modes: &mut self.modes,
                    components: &self.components,
                    drag: &mut self.drag,
                    viewport: self.viewport.as_ref(),
                };
                self.picking.pointer_up(cx);
                Dispatch::BoxSelect
            }
            // Modal transforms commit on click or Enter, not on release
            Mode::Transforming { .. } => Dispatch::Ignored,
            Mode::Idle | Mode::ComponentEditing { .. } => Dispatch::Camera,
        }
    }

    fn key_down(&mut self, event: &KeyEvent) -> Dispatch {
        if self.typing {
            return Dispatch::Suppressed;
        }

        match event.key {
            Key::Escape => match self.modes.mode() {
                Mode::ComponentEditing { .. } => {
                    self.finish_component_edit_logged();
                    Dispatch::Command
                }
                _ => self.cancel_interaction(),
            },
            Key::Enter | Key::Space if self.modes.is_transforming() => {
                self.commit_transform();
                Dispatch::Transform
            }
            Key::Tab if self.modes.mode().is_resting() => {
                if self.components.is_editing() {
                    self.finish_component_edit_logged();
                } else if !self.edit_selected_component() {
                    return Dispatch::Ignored;
                }
                Dispatch::Command
            }
            Key::Delete if self.modes.mode().is_resting() => {
                self.delete_selected();
                Dispatch::Command
            }
            Key::Char(c) => self.char_key(c.to_ascii_lowercase(), event.modifiers),
            _ => Dispatch::Ignored,
        }
    }

    fn char_key(&mut self, c: char, modifiers: Modifiers) -> Dispatch {
        let mode = self.modes.mode().clone();

        if let Some(axis) = Axis::from_key(c).filter(|_| !modifiers.is_command()) {
            return match mode {
                Mode::Transforming { .. } => {
                    self.transform.toggle_axis(
                        axis,
                        &mut self.modes,
                        &mut self.store,
                        &mut self.selection,
                        self.viewport.as_ref(),
                    );
                    Dispatch::Transform
                }
                Mode::Dragging { .. } => {
                    self.drag.toggle_axis(&self.store, self.viewport.as_ref(), axis);
                    Dispatch::Drag
                }
                // Plain z, y and x do nothing outside a gesture
                _ => Dispatch::Ignored,
            };
        }

        if modifiers.is_command() {
            if !mode.is_resting() {
                return Dispatch::Ignored;
            }
            return self.command_key(c, modifiers);
        }

        if let Some(kind) = TransformKind::from_hotkey(c) {
            let startable = matches!(mode, Mode::Idle | Mode::Selecting | Mode::ComponentEditing { .. });
            if !startable || self.selection.is_empty() {
                return Dispatch::Ignored;
            }
            if mode == Mode::Selecting {
                self.picking.cancel(&mut self.modes);
            }
            return if self.begin_transform(kind) {
                Dispatch::Transform
            } else {
                Dispatch::Ignored
            };
        }

        Dispatch::Ignored
    }

    fn command_key(&mut self, c: char, modifiers: Modifiers) -> Dispatch {
        match c {
            'z' if modifiers.shift => self.redo_logged(),
            'z' => self.undo_logged(),
            'y' => self.redo_logged(),
            'c' => {
                self.copy_selection();
            }
            'v' => {
                self.paste();
            }
            'd' => {
                self.duplicate_selected();
            }
            'g' if modifiers.shift => {
                self.ungroup_selected();
            }
            'g' => {
                self.group_selection();
            }
            _ => return Dispatch::Ignored,
        }
        Dispatch::Command
    }

    fn undo_logged(&mut self) {
        if let Err(e) = self.undo() {
            tracing::debug!("Undo: {}", e);
        }
    }

    fn redo_logged(&mut self) {
        if let Err(e) = self.redo() {
            tracing::debug!("Redo: {}", e);
        }
    }

    fn finish_component_edit_logged(&mut self) {
        match self.finish_component_edit() {
            Ok(true) => {}
            Ok(false) => tracing::warn!("Component edit could not be finished"),
            Err(e) => tracing::error!("Failed to finish component edit: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blocksmith_editor_scene::{BlockId, Transform};
    use glam::Vec3;
    use proptest::prelude::*;

    fn state_with_block() -> (EditorState, BlockId) {
        let mut state = EditorState::headless();
        let id = state.add_block(Transform::from_position(Vec3::new(0.0, 0.5, 0.0)));
        state.clear_history();
        (state, id)
    }

    fn block_ndc(state: &EditorState, id: &BlockId) -> Vec2 {
        let position = state.store().transform(id).unwrap().position;
        state.viewport().project(position).truncate()
    }

    #[test]
    fn test_g_x_y_click_changes_only_y() {
        let (mut state, id) = state_with_block();
        let before = state.store().transform(&id).unwrap();

        assert_eq!(state.handle_input(&InputEvent::KeyDown(KeyEvent::char('g'))), Dispatch::Transform);
        assert!(state.mode().name() == "transforming");
        state.handle_input(&InputEvent::PointerMove(PointerEvent::moved(Vec2::ZERO, Vec2::new(40.0, -25.0))));
        state.handle_input(&InputEvent::KeyDown(KeyEvent::char('x')));
        assert_eq!(state.mode_manager().transform_axis(), Some(Axis::X));
        state.handle_input(&InputEvent::KeyDown(KeyEvent::char('y')));
        assert_eq!(state.mode_manager().transform_axis(), Some(Axis::Y));
        state.handle_input(&InputEvent::PointerMove(PointerEvent::moved(Vec2::ZERO, Vec2::new(5.0, -30.0))));
        assert_eq!(
            state.handle_input(&InputEvent::PointerDown(PointerEvent::primary(Vec2::ZERO))),
            Dispatch::Transform
        );

        let after = state.store().transform(&id).unwrap();
        assert_eq!(after.position.x, before.position.x);
        assert_eq!(after.position.z, before.position.z);
        assert_ne!(after.position.y, before.position.y);
        assert_eq!(after.rotation, before.rotation);
        assert_eq!(after.scale, before.scale);
        assert_eq!(state.mode(), &Mode::Idle);
        assert_eq!(state.history().undo_depth(), 1);
    }

    #[test]
    fn test_drag_then_pointer_cancel_reverts_without_history() {
        let (mut state, id) = state_with_block();
        let before = state.store().transform(&id).unwrap();
        let start = block_ndc(&state, &id);

        assert_eq!(state.handle_input(&InputEvent::PointerDown(PointerEvent::primary(start))), Dispatch::Drag);
        state.handle_input(&InputEvent::PointerMove(PointerEvent::moved(
            start + Vec2::new(0.2, -0.1),
            Vec2::new(30.0, 10.0),
        )));
        assert_ne!(state.store().transform(&id).unwrap(), before);

        assert_eq!(state.handle_input(&InputEvent::PointerCancel), Dispatch::Drag);
        assert_eq!(state.store().transform(&id).unwrap(), before);
        assert_eq!(state.history().undo_depth(), 0);
        assert_eq!(state.mode(), &Mode::Idle);
    }

    #[test]
    fn test_drag_release_commits_history() {
        let (mut state, id) = state_with_block();
        let start = block_ndc(&state, &id);
        state.handle_input(&InputEvent::PointerDown(PointerEvent::primary(start)));
        state.handle_input(&InputEvent::PointerMove(PointerEvent::moved(
            start + Vec2::new(0.2, 0.0),
            Vec2::new(30.0, 0.0),
        )));
        assert_eq!(state.handle_input(&InputEvent::PointerUp(PointerEvent::primary(start))), Dispatch::Drag);
        assert_eq!(state.history().undo_depth(), 1);
        assert_eq!(state.mode(), &Mode::Idle);
    }

    #[test]
    fn test_zero_motion_click_records_nothing() {
        let (mut state, id) = state_with_block();
        let before = state.store().transform(&id).unwrap();
        let start = block_ndc(&state, &id);
        state.handle_input(&InputEvent::PointerDown(PointerEvent::primary(start)));
        state.handle_input(&InputEvent::PointerUp(PointerEvent::primary(start)));
        state.handle_input(&InputEvent::KeyDown(KeyEvent::char('r')));
        state.handle_input(&InputEvent::KeyDown(KeyEvent::plain(Key::Enter)));

        assert_eq!(state.store().transform(&id).unwrap(), before);
        assert_eq!(state.history().undo_depth(), 0);
    }

    #[test]
    fn test_escape_cancels_transform() {
        let (mut state, id) = state_with_block();
        let before = state.store().transform(&id).unwrap();
        state.handle_input(&InputEvent::KeyDown(KeyEvent::char('f')));
        state.handle_input(&InputEvent::PointerMove(PointerEvent::moved(Vec2::ZERO, Vec2::new(0.0, -80.0))));
        assert_ne!(state.store().transform(&id).unwrap(), before);

        assert_eq!(state.handle_input(&InputEvent::KeyDown(KeyEvent::plain(Key::Escape))), Dispatch::Transform);
        assert_eq!(state.store().transform(&id).unwrap(), before);
        assert_eq!(state.mode(), &Mode::Idle);
    }

    #[test]
    fn test_transform_needs_selection() {
        let (mut state, _) = state_with_block();
        state.clear_selection();
        assert_eq!(state.handle_input(&InputEvent::KeyDown(KeyEvent::char('g'))), Dispatch::Ignored);
        assert_eq!(state.mode(), &Mode::Idle);
    }

    #[test]
    fn test_typing_suppresses_shortcuts() {
        let (mut state, _) = state_with_block();
        state.set_typing(true);
        assert_eq!(state.handle_input(&InputEvent::KeyDown(KeyEvent::char('g'))), Dispatch::Suppressed);
        assert_eq!(state.handle_input(&InputEvent::KeyDown(KeyEvent::plain(Key::Delete))), Dispatch::Suppressed);
        assert_eq!(state.mode(), &Mode::Idle);
        assert_eq!(state.store().len(), 1);
    }

    #[test]
    fn test_secondary_button_goes_to_camera() {
        let (mut state, id) = state_with_block();
        let ndc = block_ndc(&state, &id);
        let event = PointerEvent {
            button: PointerButton::Secondary,
            ..PointerEvent::primary(ndc)
        };
        assert_eq!(state.handle_input(&InputEvent::PointerDown(event)), Dispatch::Camera);
        assert_eq!(state.handle_input(&InputEvent::PointerMove(event)), Dispatch::Camera);
    }

    #[test]
    fn test_ctrl_z_undoes_delete() {
        let (mut state, _) = state_with_block();
        assert_eq!(state.handle_input(&InputEvent::KeyDown(KeyEvent::plain(Key::Delete))), Dispatch::Command);
        assert!(state.store().is_empty());
        state.handle_input(&InputEvent::KeyDown(KeyEvent::ctrl('z')));
        assert_eq!(state.store().len(), 1);
        state.handle_input(&InputEvent::KeyDown(KeyEvent::ctrl('y')));
        assert!(state.store().is_empty());
    }

    #[test]
    fn test_lock_loss_cancels_transform() {
        let (mut state, id) = state_with_block();
        let before = state.store().transform(&id).unwrap();
        state.handle_input(&InputEvent::KeyDown(KeyEvent::char('g')));
        state.handle_input(&InputEvent::PointerMove(PointerEvent::moved(Vec2::ZERO, Vec2::new(50.0, 0.0))));
        assert_eq!(state.handle_input(&InputEvent::PointerLockLost), Dispatch::Transform);
        assert_eq!(state.store().transform(&id).unwrap(), before);
        assert_eq!(state.mode(), &Mode::Idle);
    }

    fn arb_event() -> impl Strategy<Value = InputEvent> {
        let ndc = (-1.0f32..1.0, -1.0f32..1.0).prop_map(|(x, y)| Vec2::new(x, y));
        let movement = (-60.0f32..60.0, -60.0f32..60.0).prop_map(|(x, y)| Vec2::new(x, y));
        let button = prop_oneof![
            4 => Just(PointerButton::Primary),
            1 => Just(PointerButton::Secondary),
        ];
        let pointer = (button, ndc, movement, any::<bool>()).prop_map(|(button, ndc, movement, shift)| PointerEvent {
            button,
            ndc,
            movement,
            modifiers: Modifiers {
                shift,
                ..Modifiers::default()
            },
        });
        let key = prop_oneof![
            Just(Key::Char('g')),
            Just(Key::Char('r')),
            Just(Key::Char('f')),
            Just(Key::Char('x')),
            Just(Key::Char('y')),
            Just(Key::Char('z')),
            Just(Key::Escape),
            Just(Key::Enter),
        ]
        .prop_map(KeyEvent::plain);
        prop_oneof![
            3 => pointer.clone().prop_map(InputEvent::PointerDown),
            4 => pointer.clone().prop_map(InputEvent::PointerMove),
            3 => pointer.prop_map(InputEvent::PointerUp),
            3 => key.prop_map(InputEvent::KeyDown),
            1 => Just(InputEvent::PointerCancel),
            1 => Just(InputEvent::PointerLockLost),
        ]
    }

    proptest! {
        #[test]
        fn prop_exactly_one_interaction_is_engaged(events in prop::collection::vec(arb_event(), 1..60)) {
            let mut state = EditorState::headless();
            state.add_block(Transform::from_position(Vec3::new(-1.5, 0.5, 0.0)));
            state.add_block(Transform::from_position(Vec3::new(1.5, 0.5, 0.0)));

            for event in &events {
                state.handle_input(event);
                let mode = state.mode().clone();
                let drag = state.drag_handler().is_active();
                let transform = state.transform_handler().is_active();
                let boxing = state.box_select().is_some();

                prop_assert_eq!(drag, matches!(mode, Mode::Dragging { .. }));
                prop_assert_eq!(transform, matches!(mode, Mode::Transforming { .. }));
                prop_assert_eq!(boxing, mode == Mode::Selecting);
                prop_assert!(usize::from(drag) + usize::from(transform) + usize::from(boxing) <= 1);
            }
        }
    }
}
