//! Physics-engine adapter over rapier2d.
//!
//! A capability boundary: the rest of the crate talks to opaque
//! [`PhysicsBody`] handles through [`PhysicsWorld`] and never touches the
//! engine's own types.

mod body;
mod events;
mod world;

pub use body::{BodyDesc, BodyType, ColliderDesc, ColliderMaterial, PhysicsBody};
pub use events::{Bounds, CollisionPair};
pub use world::PhysicsWorld;
