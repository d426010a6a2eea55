use std::collections::HashMap;
use std::sync::Arc;

use glam::Vec2;
use pixels::{Error as PixelsError, Pixels, SurfaceTexture};
use winit::window::Window;

use super::raster::Raster;
use crate::app::world::{
    Color, Entity, EntityRegistry, HaloPolicy, OutlineVertex, ShapeOutline,
};
use crate::physics::PhysicsWorld;

pub const CLEAR_COLOR: Color = [20, 22, 28, 255];
const WIREFRAME_COLOR: Color = [187, 187, 187, 255];
const WIREFRAME_WIDTH: f32 = 1.0;
const SLEEPING_DIM: f32 = 0.5;

/// Offscreen halo buffers are sized to this multiple of the entity's
/// bounding box.
const HALO_BUFFER_FACTOR: f32 = 1.5;

/// Global rendering flags, toggled at runtime from the loop.
#[derive(Debug, Clone, Copy, Default)]
pub struct RenderOptions {
    /// Bypass fills and halo compositing, stroking raw outlines instead.
    pub wireframes: bool,
    /// Dim bodies the engine reports as sleeping.
    pub show_sleeping: bool,
    /// Trace internal edges of compound outlines.
    pub show_internal_edges: bool,
    /// Force one halo policy for every entity.
    pub halo_policy_override: Option<HaloPolicy>,
}

#[derive(Debug, Clone, Copy)]
struct BodyPose {
    position: Vec2,
    rotation: f32,
}

struct CachedHalo {
    raster: Raster,
    generation: u64,
}

/// Classifies and draws entities each frame: plain fills and sprites
/// directly into the frame, halo-carrying bodies through an offscreen
/// compositing buffer.
pub struct Renderer {
    window: Arc<Window>,
    pixels: Pixels<'static>,
    frame: Raster,
    halo_cache: HashMap<u64, CachedHalo>,
}

impl Renderer {
    pub fn new(
        window: Arc<Window>,
        buffer_width: u32,
        buffer_height: u32,
    ) -> Result<Self, PixelsError> {
        let size = window.inner_size();
        let pixels = Self::build_pixels(
            Arc::clone(&window),
            size.width.max(1),
            size.height.max(1),
            buffer_width,
            buffer_height,
        )?;
        Ok(Self {
            window,
            pixels,
            frame: Raster::new(buffer_width, buffer_height),
            halo_cache: HashMap::new(),
        })
    }

    fn build_pixels(
        window: Arc<Window>,
        surface_width: u32,
        surface_height: u32,
        buffer_width: u32,
        buffer_height: u32,
    ) -> Result<Pixels<'static>, PixelsError> {
        let surface = SurfaceTexture::new(surface_width, surface_height, window);
        Pixels::new(buffer_width, buffer_height, surface)
    }

    /// Rebuild the surface and logical buffer after a window resize.
    pub fn resize(
        &mut self,
        surface_width: u32,
        surface_height: u32,
        buffer_width: u32,
        buffer_height: u32,
    ) -> Result<(), PixelsError> {
        if surface_width == 0 || surface_height == 0 || buffer_width == 0 || buffer_height == 0 {
            return Ok(());
        }
        self.pixels = Self::build_pixels(
            Arc::clone(&self.window),
            surface_width,
            surface_height,
            buffer_width,
            buffer_height,
        )?;
        self.frame = Raster::new(buffer_width, buffer_height);
        Ok(())
    }

    pub fn render(
        &mut self,
        registry: &EntityRegistry,
        physics: &PhysicsWorld,
        options: &RenderOptions,
    ) -> Result<(), PixelsError> {
        if self.frame.width() == 0 || self.frame.height() == 0 {
            return Ok(());
        }
        self.halo_cache
            .retain(|id, _| registry.find(crate::app::world::EntityId(*id)).is_some());

        let frame = &mut self.frame;
        let halo_cache = &mut self.halo_cache;
        frame.clear(CLEAR_COLOR);

        if options.wireframes {
            draw_wireframes(frame, registry, physics, options);
        } else {
            let mut shadow_group: Vec<(&Entity, BodyPose, bool)> = Vec::new();
            for entity in registry.entities() {
                if !entity.visible {
                    continue;
                }
                let pose = BodyPose {
                    position: physics.position(&entity.body),
                    rotation: physics.rotation(&entity.body),
                };
                let sleeping = physics.is_sleeping(&entity.body);
                if is_shadow_candidate(entity) {
                    shadow_group.push((entity, pose, sleeping));
                } else {
                    draw_plain_entity(frame, entity, pose, sleeping, options);
                }
            }
            for (entity, pose, sleeping) in shadow_group {
                draw_shadow_entity(frame, halo_cache, entity, pose, sleeping, options);
            }
            for marker in registry.markers() {
                frame.fill_circle(marker.position, marker.radius, marker.fill, 1.0);
            }
        }

        self.pixels.frame_mut().copy_from_slice(self.frame.as_bytes());
        self.pixels.render()
    }
}

/// An entity joins the shadow group when it has no pre-rendered sprite
/// texture and it (or any part) carries a halo. Everything else draws
/// plain, including sprite carriers that also have a halo.
fn is_shadow_candidate(entity: &Entity) -> bool {
    entity.sprite.is_none() && entity.has_halo()
}

fn entity_alpha(entity: &Entity, sleeping: bool, options: &RenderOptions) -> f32 {
    let dim = if options.show_sleeping && sleeping {
        SLEEPING_DIM
    } else {
        1.0
    };
    entity.opacity * dim
}

fn transform_vertices(
    vertices: &[OutlineVertex],
    rotation: f32,
    scale: f32,
    translation: Vec2,
) -> Vec<Vec2> {
    let (sin, cos) = rotation.sin_cos();
    vertices
        .iter()
        .map(|v| {
            let p = v.position * scale;
            Vec2::new(p.x * cos - p.y * sin, p.x * sin + p.y * cos) + translation
        })
        .collect()
}

/// Edges of the transformed outline, honoring the internal-edge flags:
/// the edge leaving vertex `k` is traced only when that vertex is not
/// internal, unless internal edges are explicitly enabled.
fn outline_segments(
    points: &[Vec2],
    vertices: &[OutlineVertex],
    show_internal_edges: bool,
) -> Vec<(Vec2, Vec2)> {
    let mut segments = Vec::with_capacity(points.len());
    for k in 0..points.len() {
        if vertices[k].is_internal && !show_internal_edges {
            continue;
        }
        segments.push((points[k], points[(k + 1) % points.len()]));
    }
    segments
}

fn draw_plain_entity(
    frame: &mut Raster,
    entity: &Entity,
    pose: BodyPose,
    sleeping: bool,
    options: &RenderOptions,
) {
    let alpha = entity_alpha(entity, sleeping, options);
    if alpha <= 0.0 {
        return;
    }

    if let Some(sprite) = &entity.sprite {
        frame.blit_sprite(
            &sprite.texture,
            pose.position,
            pose.rotation,
            sprite.x_scale * entity.visual_scale(),
            sprite.y_scale * entity.visual_scale(),
            alpha,
        );
        return;
    }

    let scale = entity.visual_scale();
    for part in entity.parts() {
        match &part.outline {
            ShapeOutline::Circle { radius } => {
                let radius = radius * scale;
                frame.fill_circle(pose.position, radius, entity.fill, alpha);
                if let Some(stroke) = entity.stroke {
                    frame.stroke_circle(pose.position, radius, entity.stroke_width, stroke, alpha);
                }
            }
            ShapeOutline::Polygon { vertices } => {
                let points = transform_vertices(vertices, pose.rotation, scale, pose.position);
                frame.fill_polygon(&points, entity.fill, alpha);
                if let Some(stroke) = entity.stroke {
                    let segments =
                        outline_segments(&points, vertices, options.show_internal_edges);
                    frame.stroke_segments(&segments, entity.stroke_width, stroke, alpha);
                }
            }
        }
    }
}

/// Side length of the offscreen halo buffer for an entity.
fn halo_buffer_size(entity: &Entity) -> (u32, u32) {
    let mut half = Vec2::ZERO;
    for part in entity.parts() {
        half = half.max(part.outline.local_half_extent());
    }
    half = (half * entity.visual_scale() + Vec2::splat(entity.stroke_width))
        * HALO_BUFFER_FACTOR;
    (
        (half.x * 2.0).ceil().max(1.0) as u32,
        (half.y * 2.0).ceil().max(1.0) as u32,
    )
}

/// Trace the entity into a fresh offscreen raster: blurred halo beneath
/// the stroke pass, crisp stroke, fill on top. The halo state never leaks
/// past the buffer, so subsequent draws are unaffected.
fn bake_halo_raster(entity: &Entity, rotation: f32, options: &RenderOptions) -> Raster {
    let (width, height) = halo_buffer_size(entity);
    let mut raster = Raster::new(width, height);
    let center = Vec2::new(width as f32 * 0.5, height as f32 * 0.5);
    let scale = entity.visual_scale();

    for part in entity.parts() {
        let stroke = entity.stroke.filter(|_| entity.stroke_width > 0.0);
        match &part.outline {
            ShapeOutline::Circle { radius } => {
                let radius = radius * scale;
                if let Some(stroke_color) = stroke {
                    let mut stroke_layer = Raster::new(width, height);
                    stroke_layer.stroke_circle(
                        center,
                        radius,
                        entity.stroke_width,
                        stroke_color,
                        1.0,
                    );
                    if let Some(halo) = entity.part_halo(part) {
                        let shadow = stroke_layer.blurred_tint(halo.blur_px, halo.color);
                        raster.blit(&shadow, 0, 0, 1.0);
                    }
                    raster.blit(&stroke_layer, 0, 0, 1.0);
                }
                raster.fill_circle(center, radius, entity.fill, 1.0);
            }
            ShapeOutline::Polygon { vertices } => {
                let points = transform_vertices(vertices, rotation, scale, center);
                if let Some(stroke_color) = stroke {
                    let segments =
                        outline_segments(&points, vertices, options.show_internal_edges);
                    let mut stroke_layer = Raster::new(width, height);
                    stroke_layer.stroke_segments(
                        &segments,
                        entity.stroke_width,
                        stroke_color,
                        1.0,
                    );
                    if let Some(halo) = entity.part_halo(part) {
                        let shadow = stroke_layer.blurred_tint(halo.blur_px, halo.color);
                        raster.blit(&shadow, 0, 0, 1.0);
                    }
                    raster.blit(&stroke_layer, 0, 0, 1.0);
                }
                raster.fill_polygon(&points, entity.fill, 1.0);
            }
        }
    }
    raster
}

fn draw_shadow_entity(
    frame: &mut Raster,
    halo_cache: &mut HashMap<u64, CachedHalo>,
    entity: &Entity,
    pose: BodyPose,
    sleeping: bool,
    options: &RenderOptions,
) {
    let alpha = entity_alpha(entity, sleeping, options);
    if alpha <= 0.0 {
        return;
    }

    let policy = options.halo_policy_override.unwrap_or(entity.halo_policy);
    match policy {
        HaloPolicy::EveryFrame => {
            let raster = bake_halo_raster(entity, pose.rotation, options);
            blit_centered(frame, &raster, pose.position, alpha);
        }
        HaloPolicy::CacheOnce => {
            let stale = halo_cache
                .get(&entity.id.0)
                .map(|cached| cached.generation != entity.halo_generation())
                .unwrap_or(true);
            if stale {
                // Baked without pose rotation; the cached raster is only
                // the default for rotation-invariant outlines.
                let raster = bake_halo_raster(entity, 0.0, options);
                halo_cache.insert(
                    entity.id.0,
                    CachedHalo {
                        raster,
                        generation: entity.halo_generation(),
                    },
                );
            }
            if let Some(cached) = halo_cache.get(&entity.id.0) {
                blit_centered(frame, &cached.raster, pose.position, alpha);
            }
        }
    }
}

fn blit_centered(frame: &mut Raster, raster: &Raster, position: Vec2, alpha: f32) {
    let left = (position.x - raster.width() as f32 * 0.5).round() as i32;
    let top = (position.y - raster.height() as f32 * 0.5).round() as i32;
    frame.blit(raster, left, top, alpha);
}

fn draw_wireframes(
    frame: &mut Raster,
    registry: &EntityRegistry,
    physics: &PhysicsWorld,
    options: &RenderOptions,
) {
    for entity in registry.entities() {
        if !entity.visible {
            continue;
        }
        let pose = BodyPose {
            position: physics.position(&entity.body),
            rotation: physics.rotation(&entity.body),
        };
        let scale = entity.visual_scale();
        for part in entity.parts() {
            match &part.outline {
                ShapeOutline::Circle { radius } => {
                    frame.stroke_circle(
                        pose.position,
                        radius * scale,
                        WIREFRAME_WIDTH,
                        WIREFRAME_COLOR,
                        1.0,
                    );
                }
                ShapeOutline::Polygon { vertices } => {
                    let points = transform_vertices(vertices, pose.rotation, scale, pose.position);
                    let segments =
                        outline_segments(&points, vertices, options.show_internal_edges);
                    frame.stroke_segments(&segments, WIREFRAME_WIDTH, WIREFRAME_COLOR, 1.0);
                }
            }
        }
    }
    for marker in registry.markers() {
        frame.stroke_circle(
            marker.position,
            marker.radius,
            WIREFRAME_WIDTH,
            WIREFRAME_COLOR,
            1.0,
        );
    }
}
