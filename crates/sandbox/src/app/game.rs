use std::f32::consts::TAU;
use std::sync::Arc;
use std::time::Duration;

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{info, warn};

use engine::{
    BodyDesc, ColliderDesc, ColliderMaterial, CollisionPair, CollisionSensorBridge, Entity,
    PhysicsBody, PointerEvent, RenderPart, ShapeOutline, SimContext, Simulation, SpriteRef,
    SpriteTexture, SteeringController, TouchInputController, TouchStyle, ViewportMapper,
};

use super::config::SandboxConfig;

const DUMMY_FILL: [u8; 4] = [255, 255, 255, 255];
const FALLBACK_SPRITE_SIZE: u32 = 20;

/// A static rectangle in viewport ratio units: center x/y in `vw`/`vh`
/// percent, size in `vw`/`vh` percent.
#[derive(Debug, Clone, Copy)]
struct RatioRect {
    center_x: f32,
    center_y: f32,
    width: f32,
    height: f32,
}

impl RatioRect {
    fn center(&self, viewport: &ViewportMapper) -> Vec2 {
        Vec2::new(viewport.vw(self.center_x), viewport.vh(self.center_y))
    }

    fn collider(&self, viewport: &ViewportMapper) -> ColliderDesc {
        ColliderDesc::rectangle(viewport.vw(self.width), viewport.vh(self.height))
    }
}

/// Invisible border walls framing the viewport from the outside.
const WALL_RECTS: [RatioRect; 4] = [
    RatioRect {
        center_x: 50.0,
        center_y: -25.0,
        width: 100.0,
        height: 50.0,
    },
    RatioRect {
        center_x: 50.0,
        center_y: 125.0,
        width: 100.0,
        height: 50.0,
    },
    RatioRect {
        center_x: -25.0,
        center_y: 50.0,
        width: 50.0,
        height: 100.0,
    },
    RatioRect {
        center_x: 125.0,
        center_y: 50.0,
        width: 50.0,
        height: 100.0,
    },
];

/// The sensor zone covers the left half of the viewport.
const SENSOR_RECT: RatioRect = RatioRect {
    center_x: 25.0,
    center_y: 50.0,
    width: 50.0,
    height: 100.0,
};

fn wall_material() -> ColliderMaterial {
    ColliderMaterial {
        restitution: 1.0,
        friction: 0.0,
        density: 1.0,
    }
}

/// The drift sandbox: border walls, a left-half sensor zone, a swarm of
/// sprite-textured squares steered toward a cruising speed, and pointer
/// gestures that spawn and absorb haloed circles.
pub(crate) struct DriftSandbox {
    config: SandboxConfig,
    rng: ChaCha8Rng,
    steering: SteeringController,
    touch: TouchInputController,
    sensor: Option<CollisionSensorBridge>,
    sensor_zone: Option<PhysicsBody>,
    walls: Vec<PhysicsBody>,
    sprite: Option<Arc<SpriteTexture>>,
}

impl DriftSandbox {
    pub(crate) fn new(config: SandboxConfig) -> Self {
        let rng = ChaCha8Rng::seed_from_u64(config.rng_seed);
        let touch = TouchInputController::new(TouchStyle {
            radius_pct: config.touch_radius_pct,
            target_speed_pct: config.target_speed_pct,
            stroke_width_pct: config.touch_stroke_width_pct,
            halo_blur_pct: config.touch_halo_blur_pct,
            restitution: config.dummy_restitution,
            shrink_steps: config.shrink_steps,
            shrink_step_interval: Duration::from_millis(config.shrink_step_interval_ms),
            shrink_target_ratio: config.shrink_target_ratio,
        });
        Self {
            config,
            rng,
            steering: SteeringController,
            touch,
            sensor: None,
            sensor_zone: None,
            walls: Vec::new(),
            sprite: None,
        }
    }

    fn resolve_sprite(&mut self) -> Arc<SpriteTexture> {
        if let Some(path) = &self.config.sprite_path {
            match SpriteTexture::load_png(path) {
                Ok(texture) => return Arc::new(texture),
                Err(error) => {
                    warn!(error = %error, "sprite load failed; using built-in dot");
                }
            }
        }
        Arc::new(SpriteTexture::dot(FALLBACK_SPRITE_SIZE, DUMMY_FILL))
    }

    fn spawn_dummy(&mut self, ctx: &mut SimContext) {
        let size = ctx.viewport.vm(
            self.config.dummy_size_min_pct + self.rng.gen::<f32>() * self.config.dummy_size_span_pct,
        );
        let position = Vec2::new(
            ctx.viewport.vw(self.rng.gen::<f32>() * 100.0),
            ctx.viewport.vh(self.rng.gen::<f32>() * 100.0),
        );
        let target_speed = ctx.viewport.vm(self.config.target_speed_pct);
        let heading = self.rng.gen::<f32>() * TAU;
        let velocity = Vec2::new(heading.cos(), heading.sin()) * target_speed * 0.5;

        let id = ctx.registry.allocate_id();
        let body = ctx.physics.create_body(
            &BodyDesc::dynamic(ColliderDesc::rectangle(size, size))
                .with_position(position)
                .with_velocity(velocity)
                .with_material(ColliderMaterial {
                    restitution: self.config.dummy_restitution,
                    friction: 0.0,
                    density: 1.0,
                })
                .with_can_sleep(false)
                .with_tag(id.0),
        );

        let mut entity = Entity::new(
            id,
            body,
            vec![RenderPart::new(ShapeOutline::rectangle(size, size))],
            DUMMY_FILL,
        )
        .with_target_speed(target_speed);
        if let Some(texture) = &self.sprite {
            let scale = size / texture.width() as f32;
            entity = entity.with_sprite(SpriteRef {
                texture: Arc::clone(texture),
                x_scale: scale,
                y_scale: scale,
            });
        }
        ctx.registry.insert(entity);
    }
}

impl Simulation for DriftSandbox {
    fn setup(&mut self, ctx: &mut SimContext) {
        self.sprite = Some(self.resolve_sprite());

        for rect in WALL_RECTS {
            let tag = ctx.registry.allocate_id();
            let body = ctx.physics.create_body(
                &BodyDesc::fixed(rect.collider(ctx.viewport))
                    .with_position(rect.center(ctx.viewport))
                    .with_material(wall_material())
                    .with_tag(tag.0),
            );
            self.walls.push(body);
        }

        let sensor_tag = ctx.registry.allocate_id();
        let zone = ctx.physics.create_body(
            &BodyDesc::fixed(SENSOR_RECT.collider(ctx.viewport))
                .with_position(SENSOR_RECT.center(ctx.viewport))
                .with_sensor(true)
                .with_tag(sensor_tag.0),
        );
        self.sensor = Some(CollisionSensorBridge::new(sensor_tag.0));
        self.sensor_zone = Some(zone);

        for _ in 0..self.config.dummy_count {
            self.spawn_dummy(ctx);
        }
        info!(
            dummy_count = self.config.dummy_count,
            wall_count = self.walls.len(),
            "sandbox_ready"
        );
    }

    fn before_step(&mut self, ctx: &mut SimContext) {
        self.steering.apply(ctx.registry, ctx.physics, ctx.viewport);
    }

    fn handle_collisions(&mut self, ctx: &mut SimContext, events: &[CollisionPair]) {
        if let Some(sensor) = &self.sensor {
            sensor.consume(ctx.registry, events);
        }
    }

    fn pointer(&mut self, ctx: &mut SimContext, event: PointerEvent) {
        self.touch
            .handle(event, ctx.registry, ctx.physics, ctx.viewport, ctx.tweens);
    }

    fn resized(&mut self, ctx: &mut SimContext) {
        for (body, rect) in self.walls.iter().zip(WALL_RECTS) {
            ctx.physics.set_position(body, rect.center(ctx.viewport));
            ctx.physics
                .set_collider_shape(body, &rect.collider(ctx.viewport));
        }
        if let Some(zone) = &self.sensor_zone {
            ctx.physics
                .set_position(zone, SENSOR_RECT.center(ctx.viewport));
            ctx.physics
                .set_collider_shape(zone, &SENSOR_RECT.collider(ctx.viewport));
        }
    }
}
