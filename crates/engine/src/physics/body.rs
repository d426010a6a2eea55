use glam::Vec2;
use rapier2d::prelude::{ColliderHandle, RigidBodyHandle, RigidBodyType};

/// The kind of rigid body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyType {
    Dynamic,
    Fixed,
}

impl BodyType {
    pub(crate) fn to_rapier(self) -> RigidBodyType {
        match self {
            BodyType::Dynamic => RigidBodyType::Dynamic,
            BodyType::Fixed => RigidBodyType::Fixed,
        }
    }
}

/// Shape description for a collider, in body-local coordinates.
#[derive(Debug, Clone)]
pub enum ColliderDesc {
    Ball { radius: f32 },
    Cuboid { half_width: f32, half_height: f32 },
    ConvexPolygon { points: Vec<Vec2> },
}

impl ColliderDesc {
    pub fn rectangle(width: f32, height: f32) -> Self {
        ColliderDesc::Cuboid {
            half_width: width * 0.5,
            half_height: height * 0.5,
        }
    }
}

/// Physical material properties for a collider.
#[derive(Debug, Clone, Copy)]
pub struct ColliderMaterial {
    pub restitution: f32,
    pub friction: f32,
    pub density: f32,
}

impl Default for ColliderMaterial {
    fn default() -> Self {
        Self {
            restitution: 0.3,
            friction: 0.5,
            density: 1.0,
        }
    }
}

/// Builder for describing a rigid body before creation.
///
/// The `tag` is stored in the body's user data and comes back on every
/// collision event involving the body.
#[derive(Debug, Clone)]
pub struct BodyDesc {
    pub body_type: BodyType,
    pub position: Vec2,
    pub rotation: f32,
    pub velocity: Vec2,
    pub linear_damping: f32,
    pub angular_damping: f32,
    pub can_sleep: bool,
    pub sensor: bool,
    pub collider: ColliderDesc,
    pub material: ColliderMaterial,
    pub tag: u64,
}

impl BodyDesc {
    pub fn dynamic(collider: ColliderDesc) -> Self {
        Self {
            body_type: BodyType::Dynamic,
            position: Vec2::ZERO,
            rotation: 0.0,
            velocity: Vec2::ZERO,
            linear_damping: 0.0,
            angular_damping: 0.0,
            can_sleep: true,
            sensor: false,
            collider,
            material: ColliderMaterial::default(),
            tag: 0,
        }
    }

    pub fn fixed(collider: ColliderDesc) -> Self {
        Self {
            body_type: BodyType::Fixed,
            ..Self::dynamic(collider)
        }
    }

    pub fn with_position(mut self, position: Vec2) -> Self {
        self.position = position;
        self
    }

    pub fn with_rotation(mut self, rotation: f32) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_velocity(mut self, velocity: Vec2) -> Self {
        self.velocity = velocity;
        self
    }

    pub fn with_linear_damping(mut self, damping: f32) -> Self {
        self.linear_damping = damping;
        self
    }

    pub fn with_angular_damping(mut self, damping: f32) -> Self {
        self.angular_damping = damping;
        self
    }

    pub fn with_can_sleep(mut self, can_sleep: bool) -> Self {
        self.can_sleep = can_sleep;
        self
    }

    pub fn with_sensor(mut self, sensor: bool) -> Self {
        self.sensor = sensor;
        self
    }

    pub fn with_material(mut self, material: ColliderMaterial) -> Self {
        self.material = material;
        self
    }

    pub fn with_tag(mut self, tag: u64) -> Self {
        self.tag = tag;
        self
    }
}

/// Handle pair referencing the engine-native body and collider.
///
/// Components hold this instead of augmenting the engine's own objects;
/// all operations go through [`super::PhysicsWorld`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhysicsBody {
    pub(crate) body_handle: RigidBodyHandle,
    pub(crate) collider_handle: ColliderHandle,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dynamic_desc_defaults_are_inert() {
        let desc = BodyDesc::dynamic(ColliderDesc::Ball { radius: 2.0 });
        assert_eq!(desc.body_type, BodyType::Dynamic);
        assert_eq!(desc.position, Vec2::ZERO);
        assert_eq!(desc.velocity, Vec2::ZERO);
        assert!(!desc.sensor);
        assert!(desc.can_sleep);
        assert_eq!(desc.tag, 0);
    }

    #[test]
    fn fixed_desc_keeps_collider_and_flips_body_type() {
        let desc = BodyDesc::fixed(ColliderDesc::rectangle(10.0, 4.0));
        assert_eq!(desc.body_type, BodyType::Fixed);
        match desc.collider {
            ColliderDesc::Cuboid {
                half_width,
                half_height,
            } => {
                assert!((half_width - 5.0).abs() < f32::EPSILON);
                assert!((half_height - 2.0).abs() < f32::EPSILON);
            }
            other => panic!("unexpected collider: {other:?}"),
        }
    }

    #[test]
    fn builder_methods_apply_in_any_order() {
        let desc = BodyDesc::dynamic(ColliderDesc::Ball { radius: 1.0 })
            .with_tag(42)
            .with_sensor(true)
            .with_position(Vec2::new(3.0, -1.0))
            .with_velocity(Vec2::new(0.5, 0.25));
        assert_eq!(desc.tag, 42);
        assert!(desc.sensor);
        assert_eq!(desc.position, Vec2::new(3.0, -1.0));
        assert_eq!(desc.velocity, Vec2::new(0.5, 0.25));
    }
}
