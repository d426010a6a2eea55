use glam::Vec2;

use crate::physics::Bounds;

/// Fixed logical height of the drawing surface, in pixels.
pub const LOGICAL_HEIGHT: f32 = 540.0;

/// Narrowest supported logical width (9:16, tall phones).
const LOGICAL_WIDTH_MIN: f32 = LOGICAL_HEIGHT * 16.0 / 9.0;

/// Widest supported logical width (9:21, fold-style screens).
const LOGICAL_WIDTH_MAX: f32 = LOGICAL_HEIGHT * 21.0 / 9.0;

/// Converts scale-independent ratio units to pixel coordinates for the
/// current logical surface size.
///
/// `vw`/`vh`/`vm` take a percentage of the width, the height, and their
/// average respectively. Values outside 0–100 extrapolate linearly. The
/// mapper has no side effects; repositioning dependents after a resize is
/// the caller's responsibility.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportMapper {
    width: f32,
    height: f32,
}

impl ViewportMapper {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Derive the logical size from the host surface's reported dimensions:
    /// height is fixed, width follows the surface aspect ratio clamped
    /// between the two supported bounds.
    pub fn from_surface(surface_width: u32, surface_height: u32) -> Self {
        let (width, height) = sized_for_surface(surface_width, surface_height);
        Self { width, height }
    }

    /// Recompute the logical size for a new surface size.
    pub fn resize(&mut self, surface_width: u32, surface_height: u32) {
        *self = Self::from_surface(surface_width, surface_height);
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn height(&self) -> f32 {
        self.height
    }

    /// Horizontal percentage of the logical width.
    pub fn vw(&self, ratio: f32) -> f32 {
        self.width * ratio / 100.0
    }

    /// Vertical percentage of the logical height.
    pub fn vh(&self, ratio: f32) -> f32 {
        self.height * ratio / 100.0
    }

    /// Average of `vw` and `vh`.
    pub fn vm(&self, ratio: f32) -> f32 {
        (self.vw(ratio) + self.vh(ratio)) / 2.0
    }

    /// The viewport rectangle in logical pixels.
    pub fn bounds(&self) -> Bounds {
        Bounds::new(Vec2::ZERO, Vec2::new(self.width, self.height))
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.width * 0.5, self.height * 0.5)
    }
}

fn sized_for_surface(surface_width: u32, surface_height: u32) -> (f32, f32) {
    if surface_height == 0 {
        return (LOGICAL_WIDTH_MIN, LOGICAL_HEIGHT);
    }
    let aspect = surface_width as f32 / surface_height as f32;
    let width = (aspect * LOGICAL_HEIGHT).clamp(LOGICAL_WIDTH_MIN, LOGICAL_WIDTH_MAX);
    (width, LOGICAL_HEIGHT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ratio_functions_scale_each_dimension() {
        let mapper = ViewportMapper::new(1000.0, 600.0);
        assert_eq!(mapper.vw(50.0), 500.0);
        assert_eq!(mapper.vh(50.0), 300.0);
        assert_eq!(mapper.vm(50.0), 400.0);
    }

    #[test]
    fn out_of_range_ratios_extrapolate_linearly() {
        let mapper = ViewportMapper::new(1000.0, 600.0);
        assert_eq!(mapper.vw(125.0), 1250.0);
        assert_eq!(mapper.vh(-25.0), -150.0);
    }

    #[test]
    fn surface_policy_fixes_height_and_follows_aspect() {
        let mapper = ViewportMapper::from_surface(1920, 1080);
        assert_eq!(mapper.height(), LOGICAL_HEIGHT);
        assert!((mapper.width() - 960.0).abs() < 0.001);
    }

    #[test]
    fn surface_policy_clamps_at_both_aspect_bounds() {
        let narrow = ViewportMapper::from_surface(500, 2000);
        assert!((narrow.width() - LOGICAL_WIDTH_MIN).abs() < 0.001);

        let wide = ViewportMapper::from_surface(4000, 1000);
        assert!((wide.width() - LOGICAL_WIDTH_MAX).abs() < 0.001);
    }

    #[test]
    fn zero_height_surface_falls_back_to_min_width() {
        let mapper = ViewportMapper::from_surface(1280, 0);
        assert!((mapper.width() - LOGICAL_WIDTH_MIN).abs() < 0.001);
        assert_eq!(mapper.height(), LOGICAL_HEIGHT);
    }

    #[test]
    fn resize_recomputes_from_policy() {
        let mut mapper = ViewportMapper::from_surface(1920, 1080);
        let before = mapper.width();
        mapper.resize(2560, 1080);
        assert!(mapper.width() > before);
        assert_eq!(mapper.height(), LOGICAL_HEIGHT);
    }

    #[test]
    fn bounds_and_center_cover_the_logical_rect() {
        let mapper = ViewportMapper::new(1080.0, 540.0);
        let bounds = mapper.bounds();
        assert_eq!(bounds.min, Vec2::ZERO);
        assert_eq!(bounds.max, Vec2::new(1080.0, 540.0));
        assert_eq!(mapper.center(), Vec2::new(540.0, 270.0));
    }
}
