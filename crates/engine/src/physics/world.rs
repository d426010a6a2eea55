use std::sync::Mutex;

use glam::Vec2;
use rapier2d::prelude::{
    nalgebra, ActiveEvents, CCDSolver, ColliderBuilder, ColliderHandle, ColliderSet,
    CollisionEvent, ContactPair, DefaultBroadPhase, EventHandler, ImpulseJointSet,
    IntegrationParameters, IslandManager, MultibodyJointSet, NarrowPhase, PhysicsPipeline,
    QueryPipeline, Real, RigidBodyBuilder, RigidBodySet, SharedShape,
};
use tracing::warn;

use super::body::{BodyDesc, ColliderDesc, PhysicsBody};
use super::events::{Bounds, CollisionPair};

fn vec2_to_na(v: Vec2) -> nalgebra::Vector2<f32> {
    nalgebra::Vector2::new(v.x, v.y)
}

fn na_to_vec2(v: &nalgebra::Vector2<f32>) -> Vec2 {
    Vec2::new(v.x, v.y)
}

fn shared_shape(desc: &ColliderDesc) -> SharedShape {
    match desc {
        ColliderDesc::Ball { radius } => SharedShape::ball(*radius),
        ColliderDesc::Cuboid {
            half_width,
            half_height,
        } => SharedShape::cuboid(*half_width, *half_height),
        ColliderDesc::ConvexPolygon { points } => {
            let na_points: Vec<nalgebra::Point2<Real>> = points
                .iter()
                .map(|p| nalgebra::Point2::new(p.x, p.y))
                .collect();
            SharedShape::convex_hull(&na_points).unwrap_or_else(|| {
                warn!(
                    point_count = points.len(),
                    "degenerate convex polygon; substituting bounding cuboid"
                );
                let bounds = points_bounds(points);
                let half = bounds.size() * 0.5;
                SharedShape::cuboid(half.x.max(f32::EPSILON), half.y.max(f32::EPSILON))
            })
        }
    }
}

fn points_bounds(points: &[Vec2]) -> Bounds {
    let mut min = Vec2::splat(f32::MAX);
    let mut max = Vec2::splat(f32::MIN);
    for p in points {
        min = min.min(*p);
        max = max.max(*p);
    }
    Bounds::new(min, max)
}

struct DirectEventCollector {
    collisions: Mutex<Vec<CollisionEvent>>,
}

impl DirectEventCollector {
    fn new() -> Self {
        Self {
            collisions: Mutex::new(Vec::new()),
        }
    }

    fn drain_collisions(&self) -> Vec<CollisionEvent> {
        match self.collisions.lock() {
            Ok(mut guard) => std::mem::take(&mut *guard),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }
}

impl EventHandler for DirectEventCollector {
    fn handle_collision_event(
        &self,
        _bodies: &RigidBodySet,
        _colliders: &ColliderSet,
        event: CollisionEvent,
        _contact_pair: Option<&ContactPair>,
    ) {
        if let Ok(mut guard) = self.collisions.lock() {
            guard.push(event);
        }
    }

    fn handle_contact_force_event(
        &self,
        _dt: Real,
        _bodies: &RigidBodySet,
        _colliders: &ColliderSet,
        _contact_pair: &ContactPair,
        _total_force_magnitude: Real,
    ) {
        // Contact force events are unused; the trait requires this method.
    }
}

/// Facade over the rapier2d simulation.
///
/// Owns every piece of engine state and exposes the narrow surface the
/// sandbox components are written against: body create/remove, per-step
/// event drain, and position/velocity/force/shape accessors on opaque
/// [`PhysicsBody`] handles. No physics happens outside the engine.
pub struct PhysicsWorld {
    gravity: nalgebra::Vector2<f32>,
    integration_parameters: IntegrationParameters,
    physics_pipeline: PhysicsPipeline,
    island_manager: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
    query_pipeline: QueryPipeline,
    event_collector: DirectEventCollector,
}

impl PhysicsWorld {
    pub fn new(gravity: Vec2) -> Self {
        Self {
            gravity: vec2_to_na(gravity),
            integration_parameters: IntegrationParameters::default(),
            physics_pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
            event_collector: DirectEventCollector::new(),
        }
    }

    /// Set the fixed integration timestep in seconds.
    pub fn set_dt(&mut self, dt: f32) {
        self.integration_parameters.dt = dt;
    }

    /// Create a rigid body plus collider and return the handle pair.
    pub fn create_body(&mut self, desc: &BodyDesc) -> PhysicsBody {
        let rb = RigidBodyBuilder::new(desc.body_type.to_rapier())
            .translation(vec2_to_na(desc.position))
            .rotation(desc.rotation)
            .linvel(vec2_to_na(desc.velocity))
            .linear_damping(desc.linear_damping)
            .angular_damping(desc.angular_damping)
            .can_sleep(desc.can_sleep)
            .user_data(desc.tag as u128)
            .build();
        let body_handle = self.bodies.insert(rb);

        let collider = ColliderBuilder::new(shared_shape(&desc.collider))
            .restitution(desc.material.restitution)
            .friction(desc.material.friction)
            .density(desc.material.density)
            .sensor(desc.sensor)
            .active_events(ActiveEvents::COLLISION_EVENTS)
            .build();
        let collider_handle =
            self.colliders
                .insert_with_parent(collider, body_handle, &mut self.bodies);

        PhysicsBody {
            body_handle,
            collider_handle,
        }
    }

    /// Remove a body and its collider from the simulation.
    pub fn remove_body(&mut self, body: &PhysicsBody) {
        self.bodies.remove(
            body.body_handle,
            &mut self.island_manager,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            true,
        );
    }

    /// Advance the simulation by one timestep, appending every collision
    /// transition (solid contacts and sensor intersections alike) that
    /// occurred during the step.
    pub fn step_into(&mut self, collision_events: &mut Vec<CollisionPair>) {
        self.physics_pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            Some(&mut self.query_pipeline),
            &(),
            &self.event_collector,
        );

        for event in self.event_collector.drain_collisions() {
            let (h1, h2, started) = match event {
                CollisionEvent::Started(h1, h2, _) => (h1, h2, true),
                CollisionEvent::Stopped(h1, h2, _) => (h1, h2, false),
            };
            if let (Some(a), Some(b)) = (self.collider_tag(h1), self.collider_tag(h2)) {
                collision_events.push(CollisionPair { a, b, started });
            }
        }
    }

    fn collider_tag(&self, handle: ColliderHandle) -> Option<u64> {
        let collider = self.colliders.get(handle)?;
        let body = self.bodies.get(collider.parent()?)?;
        Some(body.user_data as u64)
    }

    pub fn position(&self, body: &PhysicsBody) -> Vec2 {
        self.bodies
            .get(body.body_handle)
            .map(|rb| na_to_vec2(&rb.position().translation.vector))
            .unwrap_or(Vec2::ZERO)
    }

    pub fn rotation(&self, body: &PhysicsBody) -> f32 {
        self.bodies
            .get(body.body_handle)
            .map(|rb| rb.position().rotation.angle())
            .unwrap_or(0.0)
    }

    /// Set the position of the body instantly; velocity is unchanged.
    pub fn set_position(&mut self, body: &PhysicsBody, position: Vec2) {
        if let Some(rb) = self.bodies.get_mut(body.body_handle) {
            rb.set_translation(vec2_to_na(position), true);
        }
    }

    /// Move the body by a delta relative to its current position without
    /// imparting any velocity.
    pub fn translate(&mut self, body: &PhysicsBody, delta: Vec2) {
        if let Some(rb) = self.bodies.get_mut(body.body_handle) {
            let current = *rb.translation();
            rb.set_translation(current + vec2_to_na(delta), true);
        }
    }

    pub fn velocity(&self, body: &PhysicsBody) -> Vec2 {
        self.bodies
            .get(body.body_handle)
            .map(|rb| na_to_vec2(rb.linvel()))
            .unwrap_or(Vec2::ZERO)
    }

    pub fn set_velocity(&mut self, body: &PhysicsBody, velocity: Vec2) {
        if let Some(rb) = self.bodies.get_mut(body.body_handle) {
            rb.set_linvel(vec2_to_na(velocity), true);
        }
    }

    /// Replace the force applied to the body for the upcoming step.
    ///
    /// Forces accumulate across steps in the underlying engine; resetting
    /// first mirrors the per-step force semantics the steering controller
    /// is written against.
    pub fn set_force(&mut self, body: &PhysicsBody, force: Vec2) {
        if let Some(rb) = self.bodies.get_mut(body.body_handle) {
            rb.reset_forces(true);
            rb.add_force(vec2_to_na(force), true);
        }
    }

    /// Clear applied forces without waking the body.
    pub fn clear_forces(&mut self, body: &PhysicsBody) {
        if let Some(rb) = self.bodies.get_mut(body.body_handle) {
            rb.reset_forces(false);
        }
    }

    pub fn mass(&self, body: &PhysicsBody) -> f32 {
        self.bodies
            .get(body.body_handle)
            .map(|rb| rb.mass())
            .unwrap_or(0.0)
    }

    pub fn is_sleeping(&self, body: &PhysicsBody) -> bool {
        self.bodies
            .get(body.body_handle)
            .map(|rb| rb.is_sleeping())
            .unwrap_or(false)
    }

    /// World-space bounding region of the body's collider.
    ///
    /// Computed against the parent body's pose rather than the collider's
    /// cached position, which only syncs during a step; bounds stay
    /// accurate immediately after a teleport.
    pub fn body_bounds(&self, body: &PhysicsBody) -> Option<Bounds> {
        let collider = self.colliders.get(body.collider_handle)?;
        let rb = self.bodies.get(collider.parent()?)?;
        let aabb = collider.shape().compute_aabb(rb.position());
        Some(Bounds::new(
            Vec2::new(aabb.mins.x, aabb.mins.y),
            Vec2::new(aabb.maxs.x, aabb.maxs.y),
        ))
    }

    /// Uniformly scale the body's collider shape about its local origin.
    pub fn scale_body(&mut self, body: &PhysicsBody, factor: f32) {
        if !(factor > 0.0 && factor.is_finite()) {
            return;
        }
        let Some(collider) = self.colliders.get_mut(body.collider_handle) else {
            return;
        };
        let scaled = {
            let shape = collider.shape();
            if let Some(ball) = shape.as_ball() {
                Some(SharedShape::ball(ball.radius * factor))
            } else if let Some(cuboid) = shape.as_cuboid() {
                Some(SharedShape::cuboid(
                    cuboid.half_extents.x * factor,
                    cuboid.half_extents.y * factor,
                ))
            } else if let Some(polygon) = shape.as_convex_polygon() {
                let points: Vec<nalgebra::Point2<Real>> = polygon
                    .points()
                    .iter()
                    .map(|p| nalgebra::Point2::new(p.x * factor, p.y * factor))
                    .collect();
                SharedShape::convex_hull(&points)
            } else {
                None
            }
        };
        if let Some(shape) = scaled {
            collider.set_shape(shape);
        }
    }

    /// Replace the collider shape outright; used when statics are resized
    /// after a viewport change.
    pub fn set_collider_shape(&mut self, body: &PhysicsBody, desc: &ColliderDesc) {
        if let Some(collider) = self.colliders.get_mut(body.collider_handle) {
            collider.set_shape(shared_shape(desc));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::body::{BodyDesc, ColliderDesc, ColliderMaterial};
    use super::*;

    fn world() -> PhysicsWorld {
        let mut world = PhysicsWorld::new(Vec2::ZERO);
        world.set_dt(1.0 / 60.0);
        world
    }

    fn ball_desc(radius: f32) -> BodyDesc {
        BodyDesc::dynamic(ColliderDesc::Ball { radius })
    }

    #[test]
    fn created_body_reports_position_and_velocity() {
        let mut world = world();
        let body = world.create_body(
            &ball_desc(2.0)
                .with_position(Vec2::new(10.0, 20.0))
                .with_velocity(Vec2::new(1.0, -1.0)),
        );
        assert_eq!(world.position(&body), Vec2::new(10.0, 20.0));
        assert_eq!(world.velocity(&body), Vec2::new(1.0, -1.0));
    }

    #[test]
    fn translate_moves_without_changing_velocity() {
        let mut world = world();
        let body =
            world.create_body(&ball_desc(1.0).with_velocity(Vec2::new(3.0, 0.0)));
        world.translate(&body, Vec2::new(5.0, -2.0));
        assert_eq!(world.position(&body), Vec2::new(5.0, -2.0));
        assert_eq!(world.velocity(&body), Vec2::new(3.0, 0.0));
    }

    #[test]
    fn body_bounds_cover_the_ball() {
        let mut world = world();
        let body =
            world.create_body(&ball_desc(2.0).with_position(Vec2::new(10.0, 10.0)));
        let bounds = world.body_bounds(&body).expect("bounds");
        assert!(bounds.min.x <= 8.0 && bounds.max.x >= 12.0);
        assert!(bounds.min.y <= 8.0 && bounds.max.y >= 12.0);
    }

    #[test]
    fn convex_polygon_body_reports_expected_bounds() {
        let mut world = world();
        let triangle = ColliderDesc::ConvexPolygon {
            points: vec![
                Vec2::new(-3.0, -2.0),
                Vec2::new(3.0, -2.0),
                Vec2::new(0.0, 4.0),
            ],
        };
        let body = world.create_body(
            &BodyDesc::dynamic(triangle).with_position(Vec2::new(10.0, 10.0)),
        );
        let bounds = world.body_bounds(&body).expect("bounds");
        assert!((bounds.min.x - 7.0).abs() < 0.01);
        assert!((bounds.max.x - 13.0).abs() < 0.01);
        assert!((bounds.max.y - 14.0).abs() < 0.01);

        world.scale_body(&body, 0.5);
        let scaled = world.body_bounds(&body).expect("bounds");
        assert!((scaled.size().x - 3.0).abs() < 0.01);
    }

    #[test]
    fn scale_body_shrinks_bounds() {
        let mut world = world();
        let body = world.create_body(&ball_desc(4.0));
        world.scale_body(&body, 0.5);
        let bounds = world.body_bounds(&body).expect("bounds");
        let size = bounds.size();
        assert!((size.x - 4.0).abs() < 0.1, "width was {}", size.x);
    }

    #[test]
    fn scale_body_ignores_non_positive_factors() {
        let mut world = world();
        let body = world.create_body(&ball_desc(4.0));
        world.scale_body(&body, 0.0);
        world.scale_body(&body, -1.0);
        let size = world.body_bounds(&body).expect("bounds").size();
        assert!((size.x - 8.0).abs() < 0.1);
    }

    #[test]
    fn removed_body_reads_back_as_inert_defaults() {
        let mut world = world();
        let body = world.create_body(&ball_desc(1.0).with_position(Vec2::new(7.0, 7.0)));
        world.remove_body(&body);
        assert_eq!(world.position(&body), Vec2::ZERO);
        assert_eq!(world.velocity(&body), Vec2::ZERO);
        assert!(world.body_bounds(&body).is_none());
    }

    #[test]
    fn sensor_overlap_emits_started_pair_with_tags() {
        let mut world = world();
        let _sensor = world.create_body(
            &BodyDesc::fixed(ColliderDesc::rectangle(100.0, 100.0))
                .with_sensor(true)
                .with_tag(1),
        );
        let _ball = world.create_body(
            &ball_desc(2.0)
                .with_position(Vec2::new(0.0, 0.0))
                .with_tag(2),
        );

        let mut events = Vec::new();
        for _ in 0..3 {
            world.step_into(&mut events);
        }
        assert!(
            events
                .iter()
                .any(|pair| pair.started && pair.other(1) == Some(2)),
            "expected a started sensor pair, got {events:?}"
        );
    }

    #[test]
    fn sensor_exit_emits_stopped_pair() {
        let mut world = world();
        let _sensor = world.create_body(
            &BodyDesc::fixed(ColliderDesc::rectangle(20.0, 20.0))
                .with_sensor(true)
                .with_tag(1),
        );
        let ball = world.create_body(&ball_desc(1.0).with_tag(2));

        let mut events = Vec::new();
        for _ in 0..3 {
            world.step_into(&mut events);
        }
        events.clear();

        world.set_position(&ball, Vec2::new(500.0, 500.0));
        for _ in 0..3 {
            world.step_into(&mut events);
        }
        assert!(
            events
                .iter()
                .any(|pair| !pair.started && pair.other(1) == Some(2)),
            "expected a stopped sensor pair, got {events:?}"
        );
    }

    #[test]
    fn set_force_accelerates_along_force_direction() {
        let mut world = world();
        let body = world.create_body(
            &ball_desc(1.0).with_material(ColliderMaterial {
                restitution: 0.0,
                friction: 0.0,
                density: 1.0,
            }),
        );
        let mut events = Vec::new();
        for _ in 0..10 {
            world.set_force(&body, Vec2::new(50.0, 0.0));
            world.step_into(&mut events);
        }
        let velocity = world.velocity(&body);
        assert!(velocity.x > 0.0, "velocity was {velocity:?}");
        assert!(velocity.y.abs() < 1e-4);
    }
}
