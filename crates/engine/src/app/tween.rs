use std::time::{Duration, Instant};

use tracing::debug;

use super::world::{EntityId, EntityRegistry};
use crate::physics::PhysicsWorld;

/// A scheduled shrink animation: a fixed number of discrete steps, each
/// multiplying the entity's visual and collision scale by a constant
/// factor so the cumulative scale lands exactly on the target ratio.
#[derive(Debug, Clone)]
struct ShrinkTween {
    entity: EntityId,
    remaining: u32,
    factor: f32,
    interval: Duration,
    due: Instant,
}

/// Deferred task queue driving shrink tweens.
///
/// Pumped from the event loop by wall clock, independently of the
/// physics-step cadence; steps may drift relative to simulation ticks.
/// One tween per entity: scheduling over an in-flight tween cancels and
/// restarts it, and removing the entity drops the tween on the next pump.
#[derive(Debug, Default)]
pub struct TweenScheduler {
    tweens: Vec<ShrinkTween>,
}

impl TweenScheduler {
    /// Start a shrink from the entity's current scale toward
    /// `current × target_ratio` over `steps` steps spaced `interval` apart.
    pub fn schedule(
        &mut self,
        entity: EntityId,
        steps: u32,
        target_ratio: f32,
        interval: Duration,
        now: Instant,
    ) {
        if !(target_ratio > 0.0 && target_ratio.is_finite()) {
            return;
        }
        let steps = steps.max(1);
        let factor = target_ratio.powf(1.0 / steps as f32);
        self.cancel(entity);
        self.tweens.push(ShrinkTween {
            entity,
            remaining: steps,
            factor,
            interval,
            due: now + interval,
        });
    }

    /// Drop the tween for `entity`, if any. Returns whether one existed.
    pub fn cancel(&mut self, entity: EntityId) -> bool {
        let before = self.tweens.len();
        self.tweens.retain(|tween| tween.entity != entity);
        before != self.tweens.len()
    }

    pub fn has_tween(&self, entity: EntityId) -> bool {
        self.tweens.iter().any(|tween| tween.entity == entity)
    }

    pub fn len(&self) -> usize {
        self.tweens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tweens.is_empty()
    }

    /// Apply every step that has come due. A pump that falls behind runs
    /// several steps for the same tween to catch up.
    pub fn run_due(
        &mut self,
        now: Instant,
        registry: &mut EntityRegistry,
        physics: &mut PhysicsWorld,
    ) {
        self.tweens.retain_mut(|tween| {
            while tween.remaining > 0 && tween.due <= now {
                let Some(entity) = registry.find_mut(tween.entity) else {
                    debug!(entity = tween.entity.0, "tween target gone; dropping");
                    return false;
                };
                physics.scale_body(&entity.body, tween.factor);
                entity.apply_scale_step(tween.factor);
                tween.remaining -= 1;
                tween.due += tween.interval;
            }
            tween.remaining > 0
        });
    }
}
