mod loop_runner;
mod metrics;
mod pointer;
mod rendering;
mod sensor;
mod steering;
mod touch;
mod tween;
mod viewport;
mod world;

pub use loop_runner::{run_app, AppError, LoopConfig, SimContext, Simulation};
pub use metrics::LoopMetricsSnapshot;
pub use pointer::{PointerEvent, PointerEventKind, PointerId};
pub use rendering::{RenderOptions, Renderer, SpriteError, SpriteTexture, CLEAR_COLOR};
pub use sensor::{CollisionSensorBridge, NORMAL_OPACITY, TOUCHING_OPACITY};
pub use steering::{speed_correction, SteeringController, SPEED_EPSILON, STEERING_GAIN};
pub use touch::{TouchInputController, TouchStyle};
pub use tween::TweenScheduler;
pub use viewport::{ViewportMapper, LOGICAL_HEIGHT};
pub use world::{
    color_from_hsla, Color, Entity, EntityId, EntityRegistry, Halo, HaloPolicy, OutlineVertex,
    RenderPart, SensorContact, ShapeOutline, SpriteRef, TouchMarker,
};
