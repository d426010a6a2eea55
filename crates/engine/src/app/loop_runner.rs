use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use glam::Vec2;
use pixels::Error as PixelsError;
use thiserror::Error;
use tracing::{info, warn};
use winit::dpi::{LogicalSize, PhysicalSize};
use winit::error::{EventLoopError, OsError};
use winit::event::{ElementState, Event, KeyEvent, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::WindowBuilder;

use super::metrics::MetricsAccumulator;
use super::pointer::{PointerCollector, PointerEvent};
use super::rendering::{RenderOptions, Renderer};
use super::tween::TweenScheduler;
use super::viewport::ViewportMapper;
use super::world::EntityRegistry;
use crate::physics::{CollisionPair, PhysicsWorld};

#[derive(Debug, Clone)]
pub struct LoopConfig {
    pub window_title: String,
    pub window_width: u32,
    pub window_height: u32,
    pub target_tps: u32,
    pub gravity: Vec2,
    pub max_frame_delta: Duration,
    pub max_ticks_per_frame: u32,
    pub metrics_log_interval: Duration,
    pub max_render_fps: Option<u32>,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            window_title: "Driftbox".to_string(),
            window_width: 1080,
            window_height: 720,
            target_tps: 60,
            gravity: Vec2::ZERO,
            max_frame_delta: Duration::from_millis(250),
            max_ticks_per_frame: 5,
            metrics_log_interval: Duration::from_secs(1),
            max_render_fps: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("failed to create event loop: {0}")]
    CreateEventLoop(#[source] EventLoopError),
    #[error("failed to create application window: {0}")]
    CreateWindow(#[source] OsError),
    #[error("failed to initialize renderer: {0}")]
    CreateRenderer(#[source] PixelsError),
    #[error("event loop failed: {0}")]
    EventLoopRun(#[source] EventLoopError),
}

/// Everything a simulation hook may touch, borrowed for the duration of
/// the call. Single-threaded: hooks never run concurrently with each
/// other or with a physics step.
pub struct SimContext<'a> {
    pub registry: &'a mut EntityRegistry,
    pub physics: &'a mut PhysicsWorld,
    pub viewport: &'a ViewportMapper,
    pub tweens: &'a mut TweenScheduler,
    pub options: &'a mut RenderOptions,
}

/// The concrete sandbox driven by the loop.
pub trait Simulation {
    /// Called once before the first frame.
    fn setup(&mut self, ctx: &mut SimContext);
    /// Called before each physics step, prior to integration.
    fn before_step(&mut self, ctx: &mut SimContext);
    /// Called after each physics step with that step's collision
    /// transitions.
    fn handle_collisions(&mut self, ctx: &mut SimContext, events: &[CollisionPair]);
    /// Called for each normalized pointer event, between frames.
    fn pointer(&mut self, ctx: &mut SimContext, event: PointerEvent);
    /// Called after the viewport recomputed its logical size.
    fn resized(&mut self, ctx: &mut SimContext);
}

pub fn run_app(config: LoopConfig, mut simulation: Box<dyn Simulation>) -> Result<(), AppError> {
    let event_loop = EventLoop::new().map_err(AppError::CreateEventLoop)?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title(config.window_title.clone())
            .with_inner_size(LogicalSize::new(
                config.window_width as f64,
                config.window_height as f64,
            ))
            .build(&event_loop)
            .map_err(AppError::CreateWindow)?,
    );

    let surface_size = window.inner_size();
    let mut viewport = ViewportMapper::from_surface(surface_size.width, surface_size.height);
    let mut renderer = Renderer::new(
        Arc::clone(&window),
        viewport.width().ceil() as u32,
        viewport.height().ceil() as u32,
    )
    .map_err(AppError::CreateRenderer)?;

    event_loop.set_control_flow(ControlFlow::Poll);

    let target_tps = config.target_tps.max(1);
    let max_frame_delta =
        normalize_non_zero_duration(config.max_frame_delta, Duration::from_millis(250));
    let max_ticks_per_frame = config.max_ticks_per_frame.max(1);
    let metrics_log_interval =
        normalize_non_zero_duration(config.metrics_log_interval, Duration::from_secs(1));
    let fixed_dt = Duration::from_secs_f64(1.0 / target_tps as f64);
    let effective_render_cap = normalize_render_fps_cap(config.max_render_fps);
    let render_frame_target = target_frame_duration(effective_render_cap);

    let mut physics = PhysicsWorld::new(config.gravity);
    physics.set_dt(fixed_dt.as_secs_f32());
    let mut registry = EntityRegistry::default();
    let mut tweens = TweenScheduler::default();
    let mut options = RenderOptions::default();
    let mut pointer_collector = PointerCollector::default();
    let mut pointer_events: Vec<PointerEvent> = Vec::new();
    let mut collision_events: Vec<CollisionPair> = Vec::new();
    let mut render_toggles = RenderToggles::default();

    {
        let mut ctx = SimContext {
            registry: &mut registry,
            physics: &mut physics,
            viewport: &viewport,
            tweens: &mut tweens,
            options: &mut options,
        };
        simulation.setup(&mut ctx);
    }
    info!(
        entity_count = registry.entity_count(),
        viewport_width = viewport.width(),
        viewport_height = viewport.height(),
        "simulation_ready"
    );
    info!(
        target_tps,
        max_frame_delta_ms = max_frame_delta.as_millis() as u64,
        max_ticks_per_frame,
        metrics_log_interval_ms = metrics_log_interval.as_millis() as u64,
        render_fps_cap = %format_render_cap(effective_render_cap),
        "loop_config"
    );

    let mut accumulator = Duration::ZERO;
    let mut last_frame_instant = Instant::now();
    let mut last_present_instant = Instant::now();
    let mut metrics_accumulator = MetricsAccumulator::new(metrics_log_interval);

    let window_for_loop = Arc::clone(&window);
    event_loop
        .run(move |event, window_target| match event {
            Event::WindowEvent { window_id, event } if window_id == window_for_loop.id() => {
                match event {
                    WindowEvent::CloseRequested => {
                        info!(reason = "window_close", "shutdown_requested");
                        window_target.exit();
                    }
                    WindowEvent::Resized(new_size) => {
                        viewport.resize(new_size.width, new_size.height);
                        if let Err(error) = renderer.resize(
                            new_size.width,
                            new_size.height,
                            viewport.width().ceil() as u32,
                            viewport.height().ceil() as u32,
                        ) {
                            warn!(error = %error, "renderer_resize_failed");
                            window_target.exit();
                            return;
                        }
                        let mut ctx = SimContext {
                            registry: &mut registry,
                            physics: &mut physics,
                            viewport: &viewport,
                            tweens: &mut tweens,
                            options: &mut options,
                        };
                        simulation.resized(&mut ctx);
                        info!(
                            viewport_width = viewport.width(),
                            viewport_height = viewport.height(),
                            "viewport_resized"
                        );
                    }
                    WindowEvent::ScaleFactorChanged { .. } => {
                        let size = window_for_loop.inner_size();
                        viewport.resize(size.width, size.height);
                        if let Err(error) = renderer.resize(
                            size.width,
                            size.height,
                            viewport.width().ceil() as u32,
                            viewport.height().ceil() as u32,
                        ) {
                            warn!(error = %error, "renderer_resize_failed");
                            window_target.exit();
                            return;
                        }
                        let mut ctx = SimContext {
                            registry: &mut registry,
                            physics: &mut physics,
                            viewport: &viewport,
                            tweens: &mut tweens,
                            options: &mut options,
                        };
                        simulation.resized(&mut ctx);
                    }
                    WindowEvent::CursorMoved { position, .. } => {
                        pointer_collector
                            .handle_cursor_moved(position.x as f32, position.y as f32);
                    }
                    WindowEvent::CursorLeft { .. } => {
                        pointer_collector.handle_cursor_left();
                    }
                    WindowEvent::MouseInput { state, button, .. } => {
                        pointer_collector.handle_mouse_input(button, state);
                    }
                    WindowEvent::Touch(touch) => {
                        pointer_collector.handle_touch(&touch);
                    }
                    WindowEvent::KeyboardInput { event, .. } => {
                        if is_quit_key(&event) && event.state == ElementState::Pressed {
                            info!(reason = "escape_key", "shutdown_requested");
                            window_target.exit();
                            return;
                        }
                        render_toggles.handle(&event, &mut options);
                    }
                    WindowEvent::RedrawRequested => {
                        // Pointer callbacks run here, strictly between
                        // simulation steps.
                        pointer_collector.drain_into(&mut pointer_events);
                        if !pointer_events.is_empty() {
                            let window_size = window_for_loop.inner_size();
                            let mut ctx = SimContext {
                                registry: &mut registry,
                                physics: &mut physics,
                                viewport: &viewport,
                                tweens: &mut tweens,
                                options: &mut options,
                            };
                            for event in pointer_events.drain(..) {
                                let event =
                                    scale_to_viewport(event, window_size, ctx.viewport);
                                simulation.pointer(&mut ctx, event);
                            }
                        }

                        let now = Instant::now();
                        let raw_frame_dt = now.saturating_duration_since(last_frame_instant);
                        last_frame_instant = now;

                        let clamped_frame_dt = clamp_frame_delta(raw_frame_dt, max_frame_delta);
                        accumulator = accumulator.saturating_add(clamped_frame_dt);

                        let step_plan = plan_sim_steps(accumulator, fixed_dt, max_ticks_per_frame);
                        for _ in 0..step_plan.ticks_to_run {
                            {
                                let mut ctx = SimContext {
                                    registry: &mut registry,
                                    physics: &mut physics,
                                    viewport: &viewport,
                                    tweens: &mut tweens,
                                    options: &mut options,
                                };
                                simulation.before_step(&mut ctx);
                            }
                            collision_events.clear();
                            physics.step_into(&mut collision_events);
                            {
                                let mut ctx = SimContext {
                                    registry: &mut registry,
                                    physics: &mut physics,
                                    viewport: &viewport,
                                    tweens: &mut tweens,
                                    options: &mut options,
                                };
                                simulation.handle_collisions(&mut ctx, &collision_events);
                            }
                            metrics_accumulator.record_tick();
                        }
                        accumulator = step_plan.remaining_accumulator;

                        if step_plan.dropped_backlog > Duration::ZERO {
                            warn!(
                                dropped_backlog_ms = step_plan.dropped_backlog.as_millis() as u64,
                                max_ticks_per_frame, "sim_clamp_triggered"
                            );
                        }

                        // Shrink steps run by wall clock, not frame-locked.
                        tweens.run_due(Instant::now(), &mut registry, &mut physics);

                        // Single authoritative FPS cap sleep point.
                        let elapsed_since_last_present =
                            Instant::now().saturating_duration_since(last_present_instant);
                        let cap_sleep =
                            compute_cap_sleep(elapsed_since_last_present, render_frame_target);
                        if cap_sleep > Duration::ZERO {
                            thread::sleep(cap_sleep);
                        }

                        if let Err(error) = renderer.render(&registry, &physics, &options) {
                            warn!(error = %error, "renderer_draw_failed");
                            window_target.exit();
                            return;
                        }
                        last_present_instant = Instant::now();
                        metrics_accumulator.record_frame(raw_frame_dt);

                        if let Some(snapshot) = metrics_accumulator.maybe_snapshot(now) {
                            info!(
                                fps = snapshot.fps,
                                tps = snapshot.tps,
                                frame_time_ms = snapshot.frame_time_ms,
                                entity_count = registry.entity_count(),
                                marker_count = registry.marker_count(),
                                pending_tweens = tweens.len(),
                                "loop_metrics"
                            );
                        }
                    }
                    _ => {}
                }
            }
            Event::AboutToWait => {
                window_for_loop.request_redraw();
            }
            Event::LoopExiting => {
                info!("shutdown");
            }
            _ => {}
        })
        .map_err(AppError::EventLoopRun)
}

/// Edge-triggered render flag toggles.
#[derive(Debug, Default)]
struct RenderToggles {
    wireframe_is_down: bool,
    sleeping_is_down: bool,
    internal_edges_is_down: bool,
}

impl RenderToggles {
    fn handle(&mut self, key_event: &KeyEvent, options: &mut RenderOptions) {
        let pressed = key_event.state == ElementState::Pressed;
        match key_event.physical_key {
            PhysicalKey::Code(KeyCode::F2) => {
                if pressed && !self.wireframe_is_down {
                    options.wireframes = !options.wireframes;
                    info!(wireframes = options.wireframes, "render_toggle");
                }
                self.wireframe_is_down = pressed;
            }
            PhysicalKey::Code(KeyCode::F3) => {
                if pressed && !self.sleeping_is_down {
                    options.show_sleeping = !options.show_sleeping;
                    info!(show_sleeping = options.show_sleeping, "render_toggle");
                }
                self.sleeping_is_down = pressed;
            }
            PhysicalKey::Code(KeyCode::F4) => {
                if pressed && !self.internal_edges_is_down {
                    options.show_internal_edges = !options.show_internal_edges;
                    info!(
                        show_internal_edges = options.show_internal_edges,
                        "render_toggle"
                    );
                }
                self.internal_edges_is_down = pressed;
            }
            _ => {}
        }
    }
}

fn is_quit_key(key_event: &KeyEvent) -> bool {
    matches!(key_event.physical_key, PhysicalKey::Code(KeyCode::Escape))
}

/// Rescale a pointer event from window coordinates into logical viewport
/// coordinates.
fn scale_to_viewport(
    event: PointerEvent,
    window_size: PhysicalSize<u32>,
    viewport: &ViewportMapper,
) -> PointerEvent {
    if window_size.width == 0 || window_size.height == 0 {
        return event;
    }
    let scale = Vec2::new(
        viewport.width() / window_size.width as f32,
        viewport.height() / window_size.height as f32,
    );
    PointerEvent {
        position: event.position * scale,
        ..event
    }
}

#[derive(Debug, Clone, Copy)]
struct StepPlan {
    ticks_to_run: u32,
    remaining_accumulator: Duration,
    dropped_backlog: Duration,
}

fn plan_sim_steps(
    mut accumulator: Duration,
    fixed_dt: Duration,
    max_ticks_per_frame: u32,
) -> StepPlan {
    let mut ticks_to_run = 0u32;

    while accumulator >= fixed_dt && ticks_to_run < max_ticks_per_frame {
        accumulator = accumulator.saturating_sub(fixed_dt);
        ticks_to_run = ticks_to_run.saturating_add(1);
    }

    if accumulator >= fixed_dt {
        StepPlan {
            ticks_to_run,
            remaining_accumulator: Duration::ZERO,
            dropped_backlog: accumulator,
        }
    } else {
        StepPlan {
            ticks_to_run,
            remaining_accumulator: accumulator,
            dropped_backlog: Duration::ZERO,
        }
    }
}

fn clamp_frame_delta(frame_dt: Duration, max_frame_delta: Duration) -> Duration {
    frame_dt.min(max_frame_delta)
}

fn normalize_non_zero_duration(value: Duration, fallback: Duration) -> Duration {
    if value.is_zero() {
        fallback
    } else {
        value
    }
}

fn normalize_render_fps_cap(cap: Option<u32>) -> Option<u32> {
    cap.filter(|value| *value > 0)
}

fn target_frame_duration(max_render_fps: Option<u32>) -> Option<Duration> {
    max_render_fps.map(|fps| Duration::from_secs_f64(1.0 / fps as f64))
}

fn compute_cap_sleep(elapsed: Duration, target: Option<Duration>) -> Duration {
    match target {
        Some(frame_target) if elapsed < frame_target => frame_target - elapsed,
        _ => Duration::ZERO,
    }
}

fn format_render_cap(cap: Option<u32>) -> String {
    match cap {
        Some(value) => value.to_string(),
        None => "off".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::pointer::{PointerEventKind, PointerId};

    #[test]
    fn clamp_frame_delta_caps_large_frame() {
        let max_frame_delta = Duration::from_millis(250);
        let raw_frame_dt = Duration::from_millis(600);

        assert_eq!(
            clamp_frame_delta(raw_frame_dt, max_frame_delta),
            max_frame_delta
        );
    }

    #[test]
    fn plan_sim_steps_runs_expected_ticks_without_drop() {
        let fixed_dt = Duration::from_millis(16);
        let result = plan_sim_steps(Duration::from_millis(48), fixed_dt, 5);

        assert_eq!(result.ticks_to_run, 3);
        assert_eq!(result.remaining_accumulator, Duration::ZERO);
        assert_eq!(result.dropped_backlog, Duration::ZERO);
    }

    #[test]
    fn plan_sim_steps_drops_backlog_when_tick_cap_hit() {
        let fixed_dt = Duration::from_millis(16);
        let result = plan_sim_steps(Duration::from_millis(120), fixed_dt, 3);

        assert_eq!(result.ticks_to_run, 3);
        assert_eq!(result.remaining_accumulator, Duration::ZERO);
        assert_eq!(result.dropped_backlog, Duration::from_millis(72));
    }

    #[test]
    fn pointer_events_rescale_into_viewport_space() {
        let viewport = ViewportMapper::new(1080.0, 540.0);
        let event = PointerEvent {
            kind: PointerEventKind::Start,
            pointer: PointerId(0),
            position: Vec2::new(1080.0, 540.0),
        };
        let scaled = scale_to_viewport(event, PhysicalSize::new(2160, 1080), &viewport);
        assert_eq!(scaled.position, Vec2::new(540.0, 270.0));
        assert_eq!(scaled.kind, PointerEventKind::Start);
        assert_eq!(scaled.pointer, PointerId(0));
    }

    #[test]
    fn zero_window_size_leaves_pointer_events_unscaled() {
        let viewport = ViewportMapper::new(1080.0, 540.0);
        let event = PointerEvent {
            kind: PointerEventKind::Move,
            pointer: PointerId(1),
            position: Vec2::new(5.0, 5.0),
        };
        let scaled = scale_to_viewport(event, PhysicalSize::new(0, 0), &viewport);
        assert_eq!(scaled.position, Vec2::new(5.0, 5.0));
    }

    #[test]
    fn target_frame_duration_none_when_cap_off() {
        assert_eq!(target_frame_duration(None), None);
    }

    #[test]
    fn compute_cap_sleep_zero_when_over_budget() {
        let sleep = compute_cap_sleep(Duration::from_millis(20), target_frame_duration(Some(60)));
        assert_eq!(sleep, Duration::ZERO);
    }

    #[test]
    fn compute_cap_sleep_positive_when_under_budget() {
        let sleep = compute_cap_sleep(Duration::from_millis(5), target_frame_duration(Some(60)));
        assert!(sleep > Duration::ZERO);
    }

    #[test]
    fn normalize_render_fps_cap_disables_zero() {
        assert_eq!(normalize_render_fps_cap(Some(0)), None);
        assert_eq!(normalize_render_fps_cap(Some(60)), Some(60));
    }

    #[test]
    fn normalize_non_zero_duration_replaces_zero() {
        let fallback = Duration::from_secs(1);
        assert_eq!(normalize_non_zero_duration(Duration::ZERO, fallback), fallback);
        assert_eq!(
            normalize_non_zero_duration(Duration::from_millis(5), fallback),
            Duration::from_millis(5)
        );
    }
}
