use std::collections::HashMap;
use std::sync::Arc;

use glam::Vec2;

use super::pointer::PointerId;
use super::rendering::SpriteTexture;
use crate::physics::PhysicsBody;

/// RGBA color, 8 bits per channel.
pub type Color = [u8; 4];

/// Build a color from HSLA components: hue in degrees, saturation and
/// lightness in percent, alpha 0–1.
pub fn color_from_hsla(hue: f32, saturation: f32, lightness: f32, alpha: f32) -> Color {
    let h = hue.rem_euclid(360.0);
    let s = (saturation / 100.0).clamp(0.0, 1.0);
    let l = (lightness / 100.0).clamp(0.0, 1.0);

    let c = (1.0 - (2.0 * l - 1.0).abs()) * s;
    let x = c * (1.0 - ((h / 60.0).rem_euclid(2.0) - 1.0).abs());
    let m = l - c / 2.0;
    let (r, g, b) = match h {
        h if h < 60.0 => (c, x, 0.0),
        h if h < 120.0 => (x, c, 0.0),
        h if h < 180.0 => (0.0, c, x),
        h if h < 240.0 => (0.0, x, c),
        h if h < 300.0 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    [
        ((r + m) * 255.0).round() as u8,
        ((g + m) * 255.0).round() as u8,
        ((b + m) * 255.0).round() as u8,
        (alpha.clamp(0.0, 1.0) * 255.0).round() as u8,
    ]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityId(pub u64);

#[derive(Debug, Default)]
pub struct EntityIdAllocator {
    next: u64,
}

impl EntityIdAllocator {
    pub fn allocate(&mut self) -> EntityId {
        let id = EntityId(self.next);
        self.next = self.next.saturating_add(1);
        id
    }
}

/// Blur radius and color applied by the halo-compositing render pass.
/// Fixed at entity creation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Halo {
    pub blur_px: f32,
    pub color: Color,
}

/// One vertex of a polygon outline. Internal edges belong to compound
/// shapes and are skipped when tracing unless explicitly enabled.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutlineVertex {
    pub position: Vec2,
    pub is_internal: bool,
}

/// Render-side geometry of one body part, in body-local coordinates.
#[derive(Debug, Clone, PartialEq)]
pub enum ShapeOutline {
    Circle { radius: f32 },
    Polygon { vertices: Vec<OutlineVertex> },
}

impl ShapeOutline {
    pub fn rectangle(width: f32, height: f32) -> Self {
        let hw = width * 0.5;
        let hh = height * 0.5;
        let corners = [
            Vec2::new(-hw, -hh),
            Vec2::new(hw, -hh),
            Vec2::new(hw, hh),
            Vec2::new(-hw, hh),
        ];
        ShapeOutline::Polygon {
            vertices: corners
                .iter()
                .map(|&position| OutlineVertex {
                    position,
                    is_internal: false,
                })
                .collect(),
        }
    }

    /// Half-extent of the local bounding box, before scaling.
    pub fn local_half_extent(&self) -> Vec2 {
        match self {
            ShapeOutline::Circle { radius } => Vec2::splat(*radius),
            ShapeOutline::Polygon { vertices } => {
                let mut extent = Vec2::ZERO;
                for v in vertices {
                    extent = extent.max(v.position.abs());
                }
                extent
            }
        }
    }
}

/// One drawable part of an entity. Compound entities carry several; the
/// part halo, when set, overrides the entity-level halo for that part.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderPart {
    pub outline: ShapeOutline,
    pub halo: Option<Halo>,
}

impl RenderPart {
    pub fn new(outline: ShapeOutline) -> Self {
        Self {
            outline,
            halo: None,
        }
    }
}

/// Sprite reference with per-axis scale factors.
#[derive(Debug, Clone)]
pub struct SpriteRef {
    pub texture: Arc<SpriteTexture>,
    pub x_scale: f32,
    pub y_scale: f32,
}

/// Sensor-driven visibility state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorContact {
    Normal,
    Touching,
}

/// How the halo raster for an entity is produced.
///
/// `CacheOnce` bakes on first draw and reuses the raster until the halo
/// generation changes; right for circles, whose raster is rotation
/// invariant. `EveryFrame` recomputes, required when the traced outline
/// depends on the body pose.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HaloPolicy {
    CacheOnce,
    EveryFrame,
}

/// A free-floating body in the sandbox.
#[derive(Debug, Clone)]
pub struct Entity {
    pub id: EntityId,
    pub body: PhysicsBody,
    parts: Vec<RenderPart>,
    pub fill: Color,
    pub stroke: Option<Color>,
    pub stroke_width: f32,
    pub opacity: f32,
    pub visible: bool,
    pub sprite: Option<SpriteRef>,
    halo: Option<Halo>,
    pub target_speed: f32,
    pub contact: SensorContact,
    visual_scale: f32,
    pub halo_policy: HaloPolicy,
    halo_generation: u64,
}

impl Entity {
    pub fn new(id: EntityId, body: PhysicsBody, parts: Vec<RenderPart>, fill: Color) -> Self {
        let halo_policy = if parts
            .iter()
            .all(|part| matches!(part.outline, ShapeOutline::Circle { .. }))
        {
            HaloPolicy::CacheOnce
        } else {
            HaloPolicy::EveryFrame
        };
        Self {
            id,
            body,
            parts,
            fill,
            stroke: None,
            stroke_width: 0.0,
            opacity: 1.0,
            visible: true,
            sprite: None,
            halo: None,
            target_speed: 0.0,
            contact: SensorContact::Normal,
            visual_scale: 1.0,
            halo_policy,
            halo_generation: 0,
        }
    }

    pub fn with_stroke(mut self, color: Color, width: f32) -> Self {
        self.stroke = Some(color);
        self.stroke_width = width;
        self
    }

    pub fn with_sprite(mut self, sprite: SpriteRef) -> Self {
        self.sprite = Some(sprite);
        self
    }

    /// The halo is fixed here and never mutated afterwards.
    pub fn with_halo(mut self, halo: Halo) -> Self {
        self.halo = Some(halo);
        self
    }

    pub fn with_target_speed(mut self, target_speed: f32) -> Self {
        self.target_speed = target_speed;
        self
    }

    pub fn with_halo_policy(mut self, policy: HaloPolicy) -> Self {
        self.halo_policy = policy;
        self
    }

    pub fn parts(&self) -> &[RenderPart] {
        &self.parts
    }

    pub fn halo(&self) -> Option<Halo> {
        self.halo
    }

    /// Entity-level halo merged with a part's override, matching compound
    /// part precedence.
    pub fn part_halo(&self, part: &RenderPart) -> Option<Halo> {
        part.halo.or(self.halo)
    }

    /// True when this entity or any of its parts carries a halo.
    pub fn has_halo(&self) -> bool {
        self.halo.is_some() || self.parts.iter().any(|part| part.halo.is_some())
    }

    pub fn visual_scale(&self) -> f32 {
        self.visual_scale
    }

    /// Current generation of the baked halo raster; bumped whenever the
    /// raster would be stale.
    pub fn halo_generation(&self) -> u64 {
        self.halo_generation
    }

    /// Apply one multiplicative scale step, invalidating any cached halo.
    pub fn apply_scale_step(&mut self, factor: f32) {
        self.visual_scale *= factor;
        self.halo_generation = self.halo_generation.saturating_add(1);
    }
}

/// A transient static circle tracking an active pointer press.
#[derive(Debug, Clone)]
pub struct TouchMarker {
    pub pointer: PointerId,
    pub body: PhysicsBody,
    pub radius: f32,
    pub fill: Color,
    pub position: Vec2,
}

/// Owns the live set of free-floating entities and the per-pointer touch
/// markers. Single-threaded; mutated only between physics steps.
#[derive(Debug, Default)]
pub struct EntityRegistry {
    allocator: EntityIdAllocator,
    entities: Vec<Entity>,
    markers: HashMap<PointerId, TouchMarker>,
}

impl EntityRegistry {
    /// Allocate an id usable as an entity id or as a collision tag for
    /// scenery bodies; the id space is shared so tags never collide.
    pub fn allocate_id(&mut self) -> EntityId {
        self.allocator.allocate()
    }

    pub fn insert(&mut self, entity: Entity) -> EntityId {
        let id = entity.id;
        self.entities.push(entity);
        id
    }

    pub fn remove(&mut self, id: EntityId) -> Option<Entity> {
        let index = self.entities.iter().position(|entity| entity.id == id)?;
        Some(self.entities.remove(index))
    }

    pub fn find(&self, id: EntityId) -> Option<&Entity> {
        self.entities.iter().find(|entity| entity.id == id)
    }

    pub fn find_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.iter_mut().find(|entity| entity.id == id)
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn entities_mut(&mut self) -> &mut [Entity] {
        &mut self.entities
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn insert_marker(&mut self, marker: TouchMarker) {
        self.markers.insert(marker.pointer, marker);
    }

    pub fn take_marker(&mut self, pointer: PointerId) -> Option<TouchMarker> {
        self.markers.remove(&pointer)
    }

    pub fn marker(&self, pointer: PointerId) -> Option<&TouchMarker> {
        self.markers.get(&pointer)
    }

    pub fn marker_mut(&mut self, pointer: PointerId) -> Option<&mut TouchMarker> {
        self.markers.get_mut(&pointer)
    }

    pub fn markers(&self) -> impl Iterator<Item = &TouchMarker> {
        self.markers.values()
    }

    pub fn marker_count(&self) -> usize {
        self.markers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::{BodyDesc, ColliderDesc, PhysicsWorld};

    fn test_body(world: &mut PhysicsWorld) -> PhysicsBody {
        world.create_body(&BodyDesc::dynamic(ColliderDesc::Ball { radius: 1.0 }))
    }

    fn circle_entity(registry: &mut EntityRegistry, world: &mut PhysicsWorld) -> Entity {
        let id = registry.allocate_id();
        let body = test_body(world);
        Entity::new(
            id,
            body,
            vec![RenderPart::new(ShapeOutline::Circle { radius: 1.0 })],
            [255, 255, 255, 255],
        )
    }

    #[test]
    fn allocator_never_reuses_ids() {
        let mut allocator = EntityIdAllocator::default();
        assert_eq!(allocator.allocate().0, 0);
        assert_eq!(allocator.allocate().0, 1);
        assert_eq!(allocator.allocate().0, 2);
    }

    #[test]
    fn hsla_primaries_convert_exactly() {
        assert_eq!(color_from_hsla(0.0, 100.0, 50.0, 1.0), [255, 0, 0, 255]);
        assert_eq!(color_from_hsla(120.0, 100.0, 50.0, 1.0), [0, 255, 0, 255]);
        assert_eq!(color_from_hsla(240.0, 100.0, 50.0, 1.0), [0, 0, 255, 255]);
    }

    #[test]
    fn hsla_hue_wraps_past_full_circle() {
        assert_eq!(
            color_from_hsla(360.0, 100.0, 50.0, 1.0),
            color_from_hsla(0.0, 100.0, 50.0, 1.0)
        );
        assert_eq!(
            color_from_hsla(390.0, 100.0, 50.0, 0.5),
            color_from_hsla(30.0, 100.0, 50.0, 0.5)
        );
    }

    #[test]
    fn rectangle_outline_is_centered() {
        let outline = ShapeOutline::rectangle(10.0, 4.0);
        assert_eq!(outline.local_half_extent(), Vec2::new(5.0, 2.0));
        match outline {
            ShapeOutline::Polygon { vertices } => {
                assert_eq!(vertices.len(), 4);
                assert!(vertices.iter().all(|v| !v.is_internal));
            }
            other => panic!("unexpected outline: {other:?}"),
        }
    }

    #[test]
    fn circle_entities_default_to_cache_once_polygons_to_every_frame() {
        let mut registry = EntityRegistry::default();
        let mut world = PhysicsWorld::new(Vec2::ZERO);

        let circle = circle_entity(&mut registry, &mut world);
        assert_eq!(circle.halo_policy, HaloPolicy::CacheOnce);

        let id = registry.allocate_id();
        let body = test_body(&mut world);
        let square = Entity::new(
            id,
            body,
            vec![RenderPart::new(ShapeOutline::rectangle(4.0, 4.0))],
            [255, 255, 255, 255],
        );
        assert_eq!(square.halo_policy, HaloPolicy::EveryFrame);
    }

    #[test]
    fn halo_policy_can_be_overridden_per_entity() {
        let mut registry = EntityRegistry::default();
        let mut world = PhysicsWorld::new(Vec2::ZERO);
        let entity =
            circle_entity(&mut registry, &mut world).with_halo_policy(HaloPolicy::EveryFrame);
        assert_eq!(entity.halo_policy, HaloPolicy::EveryFrame);
    }

    #[test]
    fn part_halo_overrides_entity_halo() {
        let mut registry = EntityRegistry::default();
        let mut world = PhysicsWorld::new(Vec2::ZERO);
        let entity_halo = Halo {
            blur_px: 4.0,
            color: [255, 0, 0, 255],
        };
        let part_halo = Halo {
            blur_px: 8.0,
            color: [0, 255, 0, 255],
        };

        let mut entity = circle_entity(&mut registry, &mut world).with_halo(entity_halo);
        assert_eq!(entity.part_halo(&entity.parts()[0].clone()), Some(entity_halo));

        entity.parts[0].halo = Some(part_halo);
        assert_eq!(entity.part_halo(&entity.parts()[0].clone()), Some(part_halo));
        assert!(entity.has_halo());
    }

    #[test]
    fn scale_steps_compound_and_invalidate_halo() {
        let mut registry = EntityRegistry::default();
        let mut world = PhysicsWorld::new(Vec2::ZERO);
        let mut entity = circle_entity(&mut registry, &mut world);
        let generation = entity.halo_generation();

        entity.apply_scale_step(0.5);
        entity.apply_scale_step(0.5);
        assert!((entity.visual_scale() - 0.25).abs() < 1e-6);
        assert_eq!(entity.halo_generation(), generation + 2);
    }

    #[test]
    fn registry_insert_remove_find_round_trip() {
        let mut registry = EntityRegistry::default();
        let mut world = PhysicsWorld::new(Vec2::ZERO);
        let entity = circle_entity(&mut registry, &mut world);
        let id = registry.insert(entity);

        assert_eq!(registry.entity_count(), 1);
        assert!(registry.find(id).is_some());
        assert!(registry.remove(id).is_some());
        assert_eq!(registry.entity_count(), 0);
        assert!(registry.remove(id).is_none());
    }

    #[test]
    fn one_marker_per_pointer_id() {
        let mut registry = EntityRegistry::default();
        let mut world = PhysicsWorld::new(Vec2::ZERO);
        let body = test_body(&mut world);
        let pointer = PointerId(3);

        registry.insert_marker(TouchMarker {
            pointer,
            body,
            radius: 10.0,
            fill: [255, 0, 0, 255],
            position: Vec2::new(1.0, 1.0),
        });
        registry.insert_marker(TouchMarker {
            pointer,
            body,
            radius: 12.0,
            fill: [0, 255, 0, 255],
            position: Vec2::new(2.0, 2.0),
        });

        assert_eq!(registry.marker_count(), 1);
        assert_eq!(registry.marker(pointer).expect("marker").radius, 12.0);
        assert!(registry.take_marker(pointer).is_some());
        assert!(registry.take_marker(pointer).is_none());
    }
}
