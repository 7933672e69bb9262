// SPDX-License-Identifier: MIT OR Apache-2.0
//! Pointer-down selection: ray picking, additive toggling and box select.

use crate::component::ComponentManager;
use crate::drag::DragHandler;
use crate::input::{PointerButton, PointerEvent};
use crate::mode::{Mode, ModeManager};
use crate::selection::SelectionManager;
use blocksmith_editor_scene::{BlockId, BlockStore, Viewport};
use glam::Vec2;

/// Box selection in progress, in normalized device coordinates
#[derive(Debug, Clone, PartialEq)]
pub struct BoxSelect {
    /// Corner where the press happened
    pub start: Vec2,
    /// Corner under the pointer
    pub current: Vec2,
    /// Whether the result is added to the existing selection
    pub additive: bool,
    resting: Mode,
}

impl BoxSelect {
    /// Lower-left and upper-right corners
    pub fn rect(&self) -> (Vec2, Vec2) {
        (self.start.min(self.current), self.start.max(self.current))
    }
}

/// What a pointer-down did
#[derive(Debug, Clone, PartialEq)]
pub enum PickOutcome {
    /// The event is not for the selection handler
    NotHandled,
    /// A block was hit
    Hit {
        /// Root block that was hit
        block_id: BlockId,
        /// Whether a drag started
        dragging: bool,
    },
    /// Nothing was hit and a box select started
    BoxStarted,
}

/// Borrowed editor parts the selection handler works on
pub struct PickContext<'a> {
    /// Scene blocks
    pub store: &'a mut BlockStore,
    /// Selection authority
    pub selection: &'a mut SelectionManager,
    /// Mode owner
    pub modes: &'a mut ModeManager,
    /// Components, for edit-session scoping
    pub components: &'a ComponentManager,
    /// Drag handler to hand presses over to
    pub drag: &'a mut DragHandler,
    /// Camera capability
    pub viewport: &'a dyn Viewport,
}

/// Pointer-down selection handler
#[derive(Debug, Clone)]
pub struct SelectionHandler {
    box_select: Option<BoxSelect>,
    drag_on_select: bool,
    min_box_size: f32,
}

impl SelectionHandler {
    /// Create a handler
    pub fn new(drag_on_select: bool, min_box_size: f32) -> Self {
        Self {
            box_select: None,
            drag_on_select,
            min_box_size,
        }
    }

    /// Box selection in progress
    pub fn box_select(&self) -> Option<&BoxSelect> {
        self.box_select.as_ref()
    }

    /// Choose whether presses on blocks start drags
    pub fn set_drag_on_select(&mut self, enabled: bool) {
        self.drag_on_select = enabled;
    }

    /// Handle a pointer-down outside modal modes.
    ///
    /// Only the primary button selects; the others belong to the camera.
    pub fn pointer_down(&mut self, event: &PointerEvent, cx: PickContext<'_>) -> PickOutcome {
        if event.button != PointerButton::Primary || self.box_select.is_some() {
            return PickOutcome::NotHandled;
        }

        let ray = cx.viewport.screen_ray(event.ndc);
        let components = cx.components;
        let hit = cx
            .store
            .raycast(&ray, |id| components.is_block_within_active_edit(id));
        let additive = event.modifiers.is_additive();

        match hit {
            Some(hit) if additive => {
                cx.selection.toggle_selection(cx.store, &hit.block_id);
                PickOutcome::Hit {
                    block_id: hit.block_id,
                    dragging: false,
                }
            }
            Some(hit) => {
                // Pressing a block that is part of the selection drags all of it
                if !cx.selection.contains(&hit.block_id) {
                    cx.selection.set_selection_single(cx.store, &hit.block_id);
                }
                let dragging = self.drag_on_select
                    && cx
                        .drag
                        .start(cx.modes, cx.store, cx.viewport, cx.selection.ids(), event.ndc);
                PickOutcome::Hit {
                    block_id: hit.block_id,
                    dragging,
                }
            }
            None => {
                if !additive {
                    cx.selection.clear_selection(cx.store);
                }
                self.box_select = Some(BoxSelect {
                    start: event.ndc,
                    current: event.ndc,
                    additive,
                    resting: cx.modes.mode().resting(),
                });
                cx.modes.set_mode(Mode::Selecting);
                PickOutcome::BoxStarted
            }
        }
    }

    /// Track the pointer during a box select
    pub fn pointer_move(&mut self, ndc: Vec2) {
        if let Some(box_select) = self.box_select.as_mut() {
            box_select.current = ndc;
        }
    }

    /// Finish a box select, returning the blocks it selected
    pub fn pointer_up(&mut self, cx: PickContext<'_>) -> Vec<BlockId> {
        let Some(box_select) = self.box_select.take() else {
            return Vec::new();
        };
        let (min, max) = box_select.rect();
        let size = max - min;

        let mut chosen = Vec::new();
        if size.x >= self.min_box_size && size.y >= self.min_box_size {
            chosen = cx
                .store
                .ids()
                .into_iter()
                .filter(|id| cx.components.is_block_within_active_edit(id))
                .filter(|id| {
                    cx.store.bounds(id).is_some_and(|bounds| {
                        let p = cx.viewport.project(bounds.center());
                        p.z < 1.0 && p.x >= min.x && p.x <= max.x && p.y >= min.y && p.y <= max.y
                    })
                })
                .collect();

            let mut next = if box_select.additive {
                cx.selection.ids().to_vec()
            } else {
                Vec::new()
            };
            next.extend(chosen.iter().cloned());
            cx.selection.set_selection_by_ids(cx.store, &next);
            tracing::debug!("Box selected {} blocks", chosen.len());
        }

        cx.modes.set_mode(box_select.resting);
        chosen
    }

    /// Abandon a box select
    pub fn cancel(&mut self, modes: &mut ModeManager) {
        if let Some(box_select) = self.box_select.take() {
            modes.set_mode(box_select.resting);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::Modifiers;
    use blocksmith_editor_scene::{OrbitCamera, Transform};
    use glam::Vec3;

    struct Fixture {
        store: BlockStore,
        selection: SelectionManager,
        modes: ModeManager,
        components: ComponentManager,
        drag: DragHandler,
        camera: OrbitCamera,
        handler: SelectionHandler,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                store: BlockStore::new(),
                selection: SelectionManager::default(),
                modes: ModeManager::new(),
                components: ComponentManager::new(),
                drag: DragHandler::new(0.02),
                camera: OrbitCamera::looking_at(Vec3::ZERO, 0.0, 0.6, 15.0),
                handler: SelectionHandler::new(true, 0.01),
            }
        }

        fn cx(&mut self) -> PickContext<'_> {
            PickContext {
                store: &mut self.store,
                selection: &mut self.selection,
                modes: &mut self.modes,
                components: &self.components,
                drag: &mut self.drag,
                viewport: &self.camera,
            }
        }

        fn press(&mut self, ndc: Vec2, modifiers: Modifiers) -> PickOutcome {
            let event = PointerEvent {
                button: PointerButton::Primary,
                ndc,
                movement: Vec2::ZERO,
                modifiers,
            };
            let mut handler = self.handler.clone();
            let outcome = handler.pointer_down(&event, self.cx());
            self.handler = handler;
            outcome
        }

        fn ndc_of(&self, world: Vec3) -> Vec2 {
            self.camera.project(world).truncate()
        }
    }

    fn shift() -> Modifiers {
        Modifiers {
            shift: true,
            ..Modifiers::default()
        }
    }

    #[test]
    fn test_click_selects_and_starts_drag() {
        let mut f = Fixture::new();
        let id = f.store.create_cuboid(Transform::IDENTITY);
        let outcome = f.press(f.ndc_of(Vec3::ZERO), Modifiers::default());
        assert_eq!(
            outcome,
            PickOutcome::Hit {
                block_id: id.clone(),
                dragging: true
            }
        );
        assert_eq!(f.selection.single(), Some(&id));
        assert!(matches!(f.modes.mode(), Mode::Dragging { .. }));
    }

    #[test]
    fn test_shift_click_toggles() {
        let mut f = Fixture::new();
        let a = f.store.create_cuboid(Transform::from_position(Vec3::new(-3.0, 0.0, 0.0)));
        let b = f.store.create_cuboid(Transform::from_position(Vec3::new(3.0, 0.0, 0.0)));
        f.press(f.ndc_of(Vec3::new(-3.0, 0.0, 0.0)), shift());
        f.press(f.ndc_of(Vec3::new(3.0, 0.0, 0.0)), shift());
        assert_eq!(f.selection.ids(), &[a.clone(), b]);
        f.press(f.ndc_of(Vec3::new(3.0, 0.0, 0.0)), shift());
        assert_eq!(f.selection.ids(), &[a]);
        assert_eq!(f.modes.mode(), &Mode::Idle);
    }

    #[test]
    fn test_miss_clears_and_starts_box() {
        let mut f = Fixture::new();
        let id = f.store.create_cuboid(Transform::IDENTITY);
        f.selection.set_selection_single(&mut f.store, &id);
        let outcome = f.press(Vec2::new(0.9, 0.9), Modifiers::default());
        assert_eq!(outcome, PickOutcome::BoxStarted);
        assert!(f.selection.is_empty());
        assert_eq!(f.modes.mode(), &Mode::Selecting);
    }

    #[test]
    fn test_box_select_picks_projected_centers() {
        let mut f = Fixture::new();
        let inside = f.store.create_cuboid(Transform::from_position(Vec3::new(-1.0, 0.0, 0.0)));
        let also_inside = f.store.create_cuboid(Transform::from_position(Vec3::new(1.0, 0.0, 0.0)));
        let _outside = f.store.create_cuboid(Transform::from_position(Vec3::new(40.0, 0.0, 0.0)));

        f.press(Vec2::new(-0.95, -0.95), Modifiers::default());
        f.handler.pointer_move(Vec2::new(0.6, 0.6));
        let mut handler = f.handler.clone();
        let chosen = handler.pointer_up(f.cx());
        f.handler = handler;

        assert_eq!(chosen, vec![inside.clone(), also_inside.clone()]);
        assert_eq!(f.selection.ids(), &[inside, also_inside]);
        assert_eq!(f.modes.mode(), &Mode::Idle);
    }

    #[test]
    fn test_tiny_box_selects_nothing() {
        let mut f = Fixture::new();
        f.store.create_cuboid(Transform::IDENTITY);
        f.press(Vec2::new(0.9, 0.9), Modifiers::default());
        let mut handler = f.handler.clone();
        assert!(handler.pointer_up(f.cx()).is_empty());
        assert!(f.selection.is_empty());
    }

    #[test]
    fn test_secondary_button_is_not_handled() {
        let mut f = Fixture::new();
        f.store.create_cuboid(Transform::IDENTITY);
        let event = PointerEvent {
            button: PointerButton::Secondary,
            ndc: Vec2::ZERO,
            movement: Vec2::ZERO,
            modifiers: Modifiers::default(),
        };
        let mut handler = f.handler.clone();
        assert_eq!(handler.pointer_down(&event, f.cx()), PickOutcome::NotHandled);
        assert!(f.selection.is_empty());
    }
}
