use std::time::{Duration, Instant};

use glam::Vec2;
use tracing::debug;

use super::pointer::{PointerEvent, PointerEventKind, PointerId};
use super::tween::TweenScheduler;
use super::viewport::ViewportMapper;
use super::world::{
    color_from_hsla, Entity, EntityRegistry, Halo, RenderPart, ShapeOutline, TouchMarker,
};
use crate::physics::{BodyDesc, ColliderDesc, ColliderMaterial, PhysicsWorld};

/// Hue step between consecutive pointer identifiers, in degrees.
const HUE_PER_POINTER: f32 = 30.0;

/// Sizing and animation parameters for pointer-spawned bodies, in
/// viewport ratio units.
#[derive(Debug, Clone)]
pub struct TouchStyle {
    /// Marker (and spawned entity) radius, `vm` percent.
    pub radius_pct: f32,
    /// Target cruising speed handed to spawned entities, `vm` percent.
    pub target_speed_pct: f32,
    /// Stroke width on spawned entities, `vm` percent.
    pub stroke_width_pct: f32,
    /// Halo blur radius on spawned entities, `vm` percent.
    pub halo_blur_pct: f32,
    /// Restitution for spawned entities.
    pub restitution: f32,
    /// Number of discrete shrink steps after absorption.
    pub shrink_steps: u32,
    /// Delay between shrink steps.
    pub shrink_step_interval: Duration,
    /// Final scale of an absorbed entity relative to its spawn size.
    pub shrink_target_ratio: f32,
}

impl Default for TouchStyle {
    fn default() -> Self {
        Self {
            radius_pct: 7.0,
            target_speed_pct: 0.3,
            stroke_width_pct: 0.5,
            halo_blur_pct: 1.5,
            restitution: 1.0,
            shrink_steps: 100,
            shrink_step_interval: Duration::from_millis(16),
            shrink_target_ratio: 0.3,
        }
    }
}

/// Pointer-lifecycle state machine: a static marker per pressed pointer,
/// absorbed into the simulation as a dynamic entity on release.
///
/// Unknown pointer identifiers on move/end are silently ignored.
#[derive(Debug, Clone)]
pub struct TouchInputController {
    style: TouchStyle,
}

impl TouchInputController {
    pub fn new(style: TouchStyle) -> Self {
        Self { style }
    }

    pub fn style(&self) -> &TouchStyle {
        &self.style
    }

    pub fn handle(
        &self,
        event: PointerEvent,
        registry: &mut EntityRegistry,
        physics: &mut PhysicsWorld,
        viewport: &ViewportMapper,
        tweens: &mut TweenScheduler,
    ) {
        match event.kind {
            PointerEventKind::Start => {
                self.on_start(event.pointer, event.position, registry, physics, viewport)
            }
            PointerEventKind::Move => self.on_move(event.pointer, event.position, registry, physics),
            PointerEventKind::End => self.on_end(
                event.pointer,
                event.position,
                registry,
                physics,
                viewport,
                tweens,
            ),
        }
    }

    fn on_start(
        &self,
        pointer: PointerId,
        position: Vec2,
        registry: &mut EntityRegistry,
        physics: &mut PhysicsWorld,
        viewport: &ViewportMapper,
    ) {
        // A reused identifier that never released leaves a stale marker;
        // discard it before spawning the new one.
        if let Some(stale) = registry.take_marker(pointer) {
            debug!(pointer = pointer.0, "discarding stale touch marker");
            physics.remove_body(&stale.body);
        }

        let radius = viewport.vm(self.style.radius_pct);
        let tag = registry.allocate_id();
        let body = physics.create_body(
            &BodyDesc::fixed(ColliderDesc::Ball { radius })
                .with_position(position)
                .with_tag(tag.0),
        );
        registry.insert_marker(TouchMarker {
            pointer,
            body,
            radius,
            fill: pointer_fill(pointer),
            position,
        });
    }

    fn on_move(
        &self,
        pointer: PointerId,
        position: Vec2,
        registry: &mut EntityRegistry,
        physics: &mut PhysicsWorld,
    ) {
        if let Some(marker) = registry.marker_mut(pointer) {
            marker.position = position;
            let body = marker.body;
            physics.set_position(&body, position);
        }
    }

    fn on_end(
        &self,
        pointer: PointerId,
        position: Vec2,
        registry: &mut EntityRegistry,
        physics: &mut PhysicsWorld,
        viewport: &ViewportMapper,
        tweens: &mut TweenScheduler,
    ) {
        let Some(marker) = registry.take_marker(pointer) else {
            return;
        };
        physics.remove_body(&marker.body);

        let id = registry.allocate_id();
        let body = physics.create_body(
            &BodyDesc::dynamic(ColliderDesc::Ball {
                radius: marker.radius,
            })
            .with_position(position)
            .with_material(ColliderMaterial {
                restitution: self.style.restitution,
                friction: 0.0,
                density: 1.0,
            })
            .with_tag(id.0),
        );

        let entity = Entity::new(
            id,
            body,
            vec![RenderPart::new(ShapeOutline::Circle {
                radius: marker.radius,
            })],
            marker.fill,
        )
        .with_stroke(
            pointer_accent(pointer),
            viewport.vm(self.style.stroke_width_pct),
        )
        .with_halo(Halo {
            blur_px: viewport.vm(self.style.halo_blur_pct),
            color: pointer_accent(pointer),
        })
        .with_target_speed(viewport.vm(self.style.target_speed_pct));
        registry.insert(entity);

        tweens.schedule(
            id,
            self.style.shrink_steps,
            self.style.shrink_target_ratio,
            self.style.shrink_step_interval,
            Instant::now(),
        );
    }
}

fn pointer_hue(pointer: PointerId) -> f32 {
    (pointer.0 as f32 * HUE_PER_POINTER).rem_euclid(360.0)
}

fn pointer_fill(pointer: PointerId) -> [u8; 4] {
    color_from_hsla(pointer_hue(pointer), 100.0, 50.0, 1.0)
}

fn pointer_accent(pointer: PointerId) -> [u8; 4] {
    color_from_hsla(pointer_hue(pointer), 100.0, 70.0, 1.0)
}
