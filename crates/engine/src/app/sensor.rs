use super::world::{EntityId, EntityRegistry, SensorContact};
use crate::physics::CollisionPair;

/// Opacity while overlapping the sensor zone.
pub const TOUCHING_OPACITY: f32 = 0.5;

/// Opacity outside the sensor zone.
pub const NORMAL_OPACITY: f32 = 1.0;

/// Toggles entity visual state when collision events against a static
/// sensor zone start or end.
///
/// The engine reports discrete transitions, so no overlap counting is
/// needed; redundant events are absorbed by the state check, keeping the
/// opacity write idempotent.
#[derive(Debug, Clone, Copy)]
pub struct CollisionSensorBridge {
    sensor_tag: u64,
}

impl CollisionSensorBridge {
    pub fn new(sensor_tag: u64) -> Self {
        Self { sensor_tag }
    }

    pub fn sensor_tag(&self) -> u64 {
        self.sensor_tag
    }

    pub fn consume(&self, registry: &mut EntityRegistry, events: &[CollisionPair]) {
        for pair in events {
            let Some(other) = pair.other(self.sensor_tag) else {
                continue;
            };
            let Some(entity) = registry.find_mut(EntityId(other)) else {
                continue;
            };
            match (pair.started, entity.contact) {
                (true, SensorContact::Normal) => {
                    entity.contact = SensorContact::Touching;
                    entity.opacity = TOUCHING_OPACITY;
                }
                (false, SensorContact::Touching) => {
                    entity.contact = SensorContact::Normal;
                    entity.opacity = NORMAL_OPACITY;
                }
                _ => {}
            }
        }
    }
}
