use glam::Vec2;

use super::sprite::SpriteTexture;
use crate::app::world::Color;

/// An RGBA raster buffer with the drawing primitives the render pipeline
/// needs: path fills, width strokes, blur, and alpha-compositing blits.
/// All sampling is nearest-neighbor; nothing here smooths edges.
#[derive(Debug, Clone, PartialEq)]
pub struct Raster {
    width: u32,
    height: u32,
    rgba: Vec<u8>,
}

impl Raster {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            rgba: vec![0; (width as usize) * (height as usize) * 4],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.rgba
    }

    pub fn clear(&mut self, color: Color) {
        for chunk in self.rgba.chunks_exact_mut(4) {
            chunk.copy_from_slice(&color);
        }
    }

    pub fn pixel(&self, x: i32, y: i32) -> Option<Color> {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return None;
        }
        let offset = (y as usize * self.width as usize + x as usize) * 4;
        Some([
            self.rgba[offset],
            self.rgba[offset + 1],
            self.rgba[offset + 2],
            self.rgba[offset + 3],
        ])
    }

    fn blend_pixel(&mut self, x: i32, y: i32, color: Color, coverage: f32) {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return;
        }
        let alpha = (color[3] as f32 / 255.0) * coverage.clamp(0.0, 1.0);
        if alpha <= 0.0 {
            return;
        }
        let offset = (y as usize * self.width as usize + x as usize) * 4;
        for channel in 0..3 {
            let src = color[channel] as f32;
            let dst = self.rgba[offset + channel] as f32;
            self.rgba[offset + channel] = (src * alpha + dst * (1.0 - alpha)).round() as u8;
        }
        let dst_alpha = self.rgba[offset + 3] as f32 / 255.0;
        let out_alpha = alpha + dst_alpha * (1.0 - alpha);
        self.rgba[offset + 3] = (out_alpha * 255.0).round() as u8;
    }

    fn fill_span(&mut self, y: i32, x_start: f32, x_end: f32, color: Color, coverage: f32) {
        let start = (x_start - 0.5).ceil() as i32;
        let end = (x_end - 0.5).floor() as i32;
        for x in start..=end {
            self.blend_pixel(x, y, color, coverage);
        }
    }

    /// Even-odd scanline polygon fill over pixel centers.
    pub fn fill_polygon(&mut self, points: &[Vec2], color: Color, alpha: f32) {
        if points.len() < 3 {
            return;
        }
        let y_min = points.iter().fold(f32::MAX, |acc, p| acc.min(p.y));
        let y_max = points.iter().fold(f32::MIN, |acc, p| acc.max(p.y));
        let y_start = (y_min.floor() as i32).max(0);
        let y_end = (y_max.ceil() as i32).min(self.height as i32 - 1);

        let mut crossings: Vec<f32> = Vec::with_capacity(points.len());
        for y in y_start..=y_end {
            let scan_y = y as f32 + 0.5;
            crossings.clear();
            for i in 0..points.len() {
                let a = points[i];
                let b = points[(i + 1) % points.len()];
                if (a.y <= scan_y) != (b.y <= scan_y) {
                    let t = (scan_y - a.y) / (b.y - a.y);
                    crossings.push(a.x + t * (b.x - a.x));
                }
            }
            crossings.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
            for pair in crossings.chunks_exact(2) {
                self.fill_span(y, pair[0], pair[1], color, alpha);
            }
        }
    }

    pub fn fill_circle(&mut self, center: Vec2, radius: f32, color: Color, alpha: f32) {
        if radius <= 0.0 {
            return;
        }
        let y_start = ((center.y - radius).floor() as i32).max(0);
        let y_end = ((center.y + radius).ceil() as i32).min(self.height as i32 - 1);
        for y in y_start..=y_end {
            let dy = y as f32 + 0.5 - center.y;
            let under = radius * radius - dy * dy;
            if under <= 0.0 {
                continue;
            }
            let half = under.sqrt();
            self.fill_span(y, center.x - half, center.x + half, color, alpha);
        }
    }

    pub fn stroke_circle(
        &mut self,
        center: Vec2,
        radius: f32,
        width: f32,
        color: Color,
        alpha: f32,
    ) {
        if radius <= 0.0 || width <= 0.0 {
            return;
        }
        let outer = radius + width * 0.5;
        let inner = radius - width * 0.5;
        let y_start = ((center.y - outer).floor() as i32).max(0);
        let y_end = ((center.y + outer).ceil() as i32).min(self.height as i32 - 1);
        let x_start = ((center.x - outer).floor() as i32).max(0);
        let x_end = ((center.x + outer).ceil() as i32).min(self.width as i32 - 1);
        for y in y_start..=y_end {
            for x in x_start..=x_end {
                let d = (Vec2::new(x as f32 + 0.5, y as f32 + 0.5) - center).length();
                if d <= outer && d >= inner.max(0.0) {
                    self.blend_pixel(x, y, color, alpha);
                }
            }
        }
    }

    /// Stroke a set of segments with round caps.
    pub fn stroke_segments(
        &mut self,
        segments: &[(Vec2, Vec2)],
        width: f32,
        color: Color,
        alpha: f32,
    ) {
        if width <= 0.0 {
            return;
        }
        let half = width * 0.5;
        for &(a, b) in segments {
            let delta = b - a;
            let length = delta.length();
            if length > f32::EPSILON {
                let normal = Vec2::new(-delta.y, delta.x) / length * half;
                self.fill_polygon(
                    &[a + normal, b + normal, b - normal, a - normal],
                    color,
                    alpha,
                );
            }
            self.fill_circle(a, half, color, alpha);
            self.fill_circle(b, half, color, alpha);
        }
    }

    /// A copy of this raster's alpha channel, box-blurred and tinted: the
    /// result's color is `tint` everywhere, its alpha the blurred source
    /// coverage. Stands in for the surface `shadowBlur`/`shadowColor`
    /// state around a stroke pass.
    pub fn blurred_tint(&self, blur_radius: f32, tint: Color) -> Raster {
        let radius = blur_radius.round().max(0.0) as i32;
        let width = self.width as usize;
        let height = self.height as usize;
        let mut alpha: Vec<f32> = self
            .rgba
            .chunks_exact(4)
            .map(|px| px[3] as f32 / 255.0)
            .collect();

        if radius > 0 {
            alpha = box_blur_horizontal(&alpha, width, height, radius);
            alpha = box_blur_vertical(&alpha, width, height, radius);
        }

        let mut out = Raster::new(self.width, self.height);
        let tint_alpha = tint[3] as f32 / 255.0;
        for (index, coverage) in alpha.iter().enumerate() {
            let offset = index * 4;
            out.rgba[offset] = tint[0];
            out.rgba[offset + 1] = tint[1];
            out.rgba[offset + 2] = tint[2];
            out.rgba[offset + 3] = (coverage * tint_alpha * 255.0).round().min(255.0) as u8;
        }
        out
    }

    /// Composite `src` over this raster at an integer offset.
    pub fn blit(&mut self, src: &Raster, left: i32, top: i32, global_alpha: f32) {
        for y in 0..src.height as i32 {
            for x in 0..src.width as i32 {
                let Some(color) = src.pixel(x, y) else {
                    continue;
                };
                if color[3] == 0 {
                    continue;
                }
                self.blend_pixel(left + x, top + y, color, global_alpha);
            }
        }
    }

    /// Blit a sprite centered at `center`, rotated and scaled, sampling
    /// nearest-neighbor so small textures stay crisp.
    pub fn blit_sprite(
        &mut self,
        sprite: &SpriteTexture,
        center: Vec2,
        rotation: f32,
        x_scale: f32,
        y_scale: f32,
        global_alpha: f32,
    ) {
        if x_scale <= 0.0 || y_scale <= 0.0 {
            return;
        }
        let half_w = sprite.width() as f32 * x_scale * 0.5;
        let half_h = sprite.height() as f32 * y_scale * 0.5;
        let reach = (half_w * half_w + half_h * half_h).sqrt();
        let x_start = ((center.x - reach).floor() as i32).max(0);
        let x_end = ((center.x + reach).ceil() as i32).min(self.width as i32 - 1);
        let y_start = ((center.y - reach).floor() as i32).max(0);
        let y_end = ((center.y + reach).ceil() as i32).min(self.height as i32 - 1);

        let (sin, cos) = rotation.sin_cos();
        for y in y_start..=y_end {
            for x in x_start..=x_end {
                let offset = Vec2::new(x as f32 + 0.5, y as f32 + 0.5) - center;
                // Inverse-rotate into sprite-local space.
                let local = Vec2::new(
                    offset.x * cos + offset.y * sin,
                    -offset.x * sin + offset.y * cos,
                );
                let sx = (local.x / x_scale + sprite.width() as f32 * 0.5).floor() as i32;
                let sy = (local.y / y_scale + sprite.height() as f32 * 0.5).floor() as i32;
                if let Some(color) = sprite.sample(sx, sy) {
                    self.blend_pixel(x, y, color, global_alpha);
                }
            }
        }
    }
}

fn box_blur_horizontal(alpha: &[f32], width: usize, height: usize, radius: i32) -> Vec<f32> {
    let mut out = vec![0.0; alpha.len()];
    let norm = (radius * 2 + 1) as f32;
    for y in 0..height {
        let row = y * width;
        for x in 0..width as i32 {
            let mut sum = 0.0;
            for dx in -radius..=radius {
                let sx = (x + dx).clamp(0, width as i32 - 1) as usize;
                sum += alpha[row + sx];
            }
            out[row + x as usize] = sum / norm;
        }
    }
    out
}

fn box_blur_vertical(alpha: &[f32], width: usize, height: usize, radius: i32) -> Vec<f32> {
    let mut out = vec![0.0; alpha.len()];
    let norm = (radius * 2 + 1) as f32;
    for x in 0..width {
        for y in 0..height as i32 {
            let mut sum = 0.0;
            for dy in -radius..=radius {
                let sy = (y + dy).clamp(0, height as i32 - 1) as usize;
                sum += alpha[sy * width + x];
            }
            out[y as usize * width + x] = sum / norm;
        }
    }
    out
}
