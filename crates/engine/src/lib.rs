//! Engine side of the Driftbox sandbox: viewport mapping, a physics
//! adapter, the entity registry, steering/sensor/touch behaviors, the
//! shrink-tween scheduler, the CPU raster render pipeline, and the frame
//! loop that sequences them.

pub mod app;
pub mod physics;

pub use app::{
    color_from_hsla, run_app, speed_correction, AppError, CollisionSensorBridge, Color, Entity,
    EntityId, EntityRegistry, Halo, HaloPolicy, LoopConfig, LoopMetricsSnapshot, OutlineVertex,
    PointerEvent, PointerEventKind, PointerId, RenderOptions, RenderPart, SensorContact,
    ShapeOutline, SimContext, Simulation, SpriteError, SpriteRef, SpriteTexture,
    SteeringController, TouchInputController, TouchMarker, TouchStyle, TweenScheduler,
    ViewportMapper, LOGICAL_HEIGHT, NORMAL_OPACITY, SPEED_EPSILON, STEERING_GAIN,
    TOUCHING_OPACITY,
};
pub use physics::{
    BodyDesc, BodyType, Bounds, ColliderDesc, ColliderMaterial, CollisionPair, PhysicsBody,
    PhysicsWorld,
};
