use glam::Vec2;
use winit::event::{ElementState, MouseButton, Touch, TouchPhase};

/// Stable identifier for one press-drag-release gesture.
///
/// The mouse is pointer 0; platform touch identifiers are offset by one so
/// they can never collide with it. Identifiers are reusable across
/// gestures, matching the platform contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PointerId(pub u64);

pub(crate) const MOUSE_POINTER: PointerId = PointerId(0);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerEventKind {
    Start,
    Move,
    End,
}

/// A normalized pointer event in drawing-surface pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    pub kind: PointerEventKind,
    pub pointer: PointerId,
    pub position: Vec2,
}

/// Translates raw window input into start/move/end pointer events.
///
/// Events accumulate in window coordinates; the loop drains and rescales
/// them into logical viewport coordinates once per frame, so pointer
/// handling stays interleaved between frames rather than racing them.
#[derive(Debug, Default)]
pub(crate) struct PointerCollector {
    cursor_position: Option<Vec2>,
    mouse_is_down: bool,
    pending: Vec<PointerEvent>,
}

impl PointerCollector {
    pub(crate) fn handle_cursor_moved(&mut self, x: f32, y: f32) {
        let position = Vec2::new(x, y);
        self.cursor_position = Some(position);
        if self.mouse_is_down {
            self.pending.push(PointerEvent {
                kind: PointerEventKind::Move,
                pointer: MOUSE_POINTER,
                position,
            });
        }
    }

    pub(crate) fn handle_cursor_left(&mut self) {
        // Keep the last known position while a drag is active so the
        // release still lands somewhere sensible.
        if !self.mouse_is_down {
            self.cursor_position = None;
        }
    }

    pub(crate) fn handle_mouse_input(&mut self, button: MouseButton, state: ElementState) {
        if button != MouseButton::Left {
            return;
        }
        match state {
            ElementState::Pressed => {
                if self.mouse_is_down {
                    return;
                }
                let Some(position) = self.cursor_position else {
                    return;
                };
                self.mouse_is_down = true;
                self.pending.push(PointerEvent {
                    kind: PointerEventKind::Start,
                    pointer: MOUSE_POINTER,
                    position,
                });
            }
            ElementState::Released => {
                if !self.mouse_is_down {
                    return;
                }
                self.mouse_is_down = false;
                let position = self.cursor_position.unwrap_or(Vec2::ZERO);
                self.pending.push(PointerEvent {
                    kind: PointerEventKind::End,
                    pointer: MOUSE_POINTER,
                    position,
                });
            }
        }
    }

    pub(crate) fn handle_touch(&mut self, touch: &Touch) {
        let kind = match touch.phase {
            TouchPhase::Started => PointerEventKind::Start,
            TouchPhase::Moved => PointerEventKind::Move,
            TouchPhase::Ended | TouchPhase::Cancelled => PointerEventKind::End,
        };
        self.pending.push(PointerEvent {
            kind,
            pointer: PointerId(touch.id + 1),
            position: Vec2::new(touch.location.x as f32, touch.location.y as f32),
        });
    }

    pub(crate) fn drain_into(&mut self, out: &mut Vec<PointerEvent>) {
        out.append(&mut self.pending);
    }
}
