use glam::Vec2;

use super::viewport::ViewportMapper;
use super::world::EntityRegistry;
use crate::physics::PhysicsWorld;

/// Velocities at or above this magnitude receive speed correction;
/// anything below is left alone to avoid division instability near zero.
pub const SPEED_EPSILON: f32 = 1e-5;

/// Per-second convergence rate toward the target speed. The corrective
/// force is this gain times the speed error times the body's mass, so
/// the resulting acceleration is mass-independent.
pub const STEERING_GAIN: f32 = 3.0;

/// Mass-normalized corrective acceleration steering `velocity` toward
/// `target_speed` along its current direction. `None` when the velocity
/// is below the epsilon threshold (the boundary itself counts as having
/// speed).
///
/// This is an asymptotic controller: the integrator converges on the
/// target over several steps instead of having its velocity overwritten.
pub fn speed_correction(velocity: Vec2, target_speed: f32) -> Option<Vec2> {
    let speed = velocity.length();
    if speed < SPEED_EPSILON {
        return None;
    }
    let yaw = velocity.y.atan2(velocity.x);
    let direction = Vec2::new(yaw.cos(), yaw.sin());
    Some(direction * STEERING_GAIN * (target_speed - speed))
}

/// Per-step speed normalization and off-screen recovery for every entity
/// in the registry. Runs before integration.
#[derive(Debug, Default)]
pub struct SteeringController;

impl SteeringController {
    pub fn apply(
        &self,
        registry: &EntityRegistry,
        physics: &mut PhysicsWorld,
        viewport: &ViewportMapper,
    ) {
        let view_bounds = viewport.bounds();
        let view_center = viewport.center();

        for entity in registry.entities() {
            // Recovery only fires when the body has left the viewport
            // entirely; a partially visible body is never teleported.
            if let Some(bounds) = physics.body_bounds(&entity.body) {
                if !view_bounds.overlaps(&bounds) {
                    let position = physics.position(&entity.body);
                    physics.translate(&entity.body, view_center - position);
                }
            }

            let velocity = physics.velocity(&entity.body);
            match speed_correction(velocity, entity.target_speed) {
                Some(accel) => {
                    let force = accel * physics.mass(&entity.body);
                    physics.set_force(&entity.body, force);
                }
                // Skipped entities still need last step's force cleared,
                // without waking a sleeping body.
                None => physics.clear_forces(&entity.body),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::world::{Entity, RenderPart, ShapeOutline};
    use crate::physics::{BodyDesc, ColliderDesc, ColliderMaterial};

    const WHITE: [u8; 4] = [255, 255, 255, 255];

    fn frictionless() -> ColliderMaterial {
        ColliderMaterial {
            restitution: 1.0,
            friction: 0.0,
            density: 1.0,
        }
    }

    #[test]
    fn sub_epsilon_velocity_yields_no_correction() {
        assert!(speed_correction(Vec2::ZERO, 2.0).is_none());
        assert!(speed_correction(Vec2::new(1e-6, 0.0), 2.0).is_none());
    }

    #[test]
    fn velocity_exactly_at_epsilon_counts_as_having_speed() {
        assert!(speed_correction(Vec2::new(SPEED_EPSILON, 0.0), 2.0).is_some());
    }

    #[test]
    fn correction_is_parallel_to_velocity() {
        let velocity = Vec2::new(3.0, 4.0);
        let accel = speed_correction(velocity, 10.0).expect("correction");
        let cross = velocity.x * accel.y - velocity.y * accel.x;
        assert!(cross.abs() < 1e-5, "cross product was {cross}");
        // Below target: the correction points with the motion.
        assert!(accel.dot(velocity) > 0.0);
    }

    #[test]
    fn correction_opposes_motion_when_above_target() {
        let velocity = Vec2::new(0.0, 5.0);
        let accel = speed_correction(velocity, 1.0).expect("correction");
        assert!(accel.dot(velocity) < 0.0);
    }

    #[test]
    fn repeated_correction_converges_monotonically_without_turning() {
        // Euler-integrate v' = v + a·dt.
        let target = 2.0;
        let dt = 0.1;
        let mut velocity = Vec2::new(0.3, 0.1);
        let initial_heading = velocity.normalize();
        let mut previous_error = (velocity.length() - target).abs();

        for _ in 0..200 {
            let accel = speed_correction(velocity, target).expect("correction");
            velocity += accel * dt;
            let error = (velocity.length() - target).abs();
            assert!(
                error <= previous_error + 1e-6,
                "error grew: {previous_error} -> {error}"
            );
            previous_error = error;
            let heading = velocity.normalize();
            assert!(heading.dot(initial_heading) > 0.999);
        }
        assert!(previous_error < 0.01, "final error {previous_error}");
    }

    #[test]
    fn applied_correction_drives_a_simulated_body_toward_target() {
        let mut registry = EntityRegistry::default();
        let mut physics = PhysicsWorld::new(Vec2::ZERO);
        physics.set_dt(1.0 / 60.0);
        let viewport = ViewportMapper::new(1080.0, 540.0);
        let target = 4.0;

        let body = physics.create_body(
            &BodyDesc::dynamic(ColliderDesc::Ball { radius: 5.0 })
                .with_position(viewport.center())
                .with_velocity(Vec2::new(0.5, 0.0))
                .with_material(frictionless())
                .with_can_sleep(false),
        );
        let id = registry.allocate_id();
        registry.insert(
            Entity::new(
                id,
                body,
                vec![RenderPart::new(ShapeOutline::Circle { radius: 5.0 })],
                WHITE,
            )
            .with_target_speed(target),
        );

        let controller = SteeringController;
        let mut events = Vec::new();
        for _ in 0..300 {
            controller.apply(&registry, &mut physics, &viewport);
            physics.step_into(&mut events);
        }
        let speed = physics.velocity(&body).length();
        assert!(
            (speed - target).abs() < 0.2,
            "speed {speed} did not converge to {target}"
        );
    }

    #[test]
    fn fully_offscreen_entity_recovers_to_viewport() {
        let mut registry = EntityRegistry::default();
        let mut physics = PhysicsWorld::new(Vec2::ZERO);
        let viewport = ViewportMapper::new(1080.0, 540.0);

        let body = physics.create_body(
            &BodyDesc::dynamic(ColliderDesc::Ball { radius: 5.0 })
                .with_position(Vec2::new(-500.0, -500.0))
                .with_material(frictionless()),
        );
        let id = registry.allocate_id();
        registry.insert(Entity::new(
            id,
            body,
            vec![RenderPart::new(ShapeOutline::Circle { radius: 5.0 })],
            WHITE,
        ));

        SteeringController.apply(&registry, &mut physics, &viewport);

        let bounds = physics.body_bounds(&body).expect("bounds");
        assert!(viewport.bounds().overlaps(&bounds));
        assert_eq!(physics.position(&body), viewport.center());
    }

    #[test]
    fn partially_visible_entity_is_never_teleported() {
        let mut registry = EntityRegistry::default();
        let mut physics = PhysicsWorld::new(Vec2::ZERO);
        let viewport = ViewportMapper::new(1080.0, 540.0);

        // Straddling the left edge: bounds overlap even though the center
        // is outside.
        let start = Vec2::new(-2.0, 270.0);
        let body = physics.create_body(
            &BodyDesc::dynamic(ColliderDesc::Ball { radius: 5.0 })
                .with_position(start)
                .with_material(frictionless()),
        );
        let id = registry.allocate_id();
        registry.insert(Entity::new(
            id,
            body,
            vec![RenderPart::new(ShapeOutline::Circle { radius: 5.0 })],
            WHITE,
        ));

        SteeringController.apply(&registry, &mut physics, &viewport);
        assert_eq!(physics.position(&body), start);
    }
}
