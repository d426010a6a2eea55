use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::app::world::Color;

#[derive(Debug, Error)]
pub enum SpriteError {
    #[error("failed to read sprite image at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode sprite image at {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

/// A pre-rendered RGBA texture blitted in place of path drawing.
#[derive(Debug, Clone, PartialEq)]
pub struct SpriteTexture {
    width: u32,
    height: u32,
    rgba: Vec<u8>,
}

impl SpriteTexture {
    pub fn load_png(path: &Path) -> Result<Self, SpriteError> {
        let reader = image::ImageReader::open(path).map_err(|source| SpriteError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let decoded = reader.decode().map_err(|source| SpriteError::Decode {
            path: path.to_path_buf(),
            source,
        })?;
        let rgba = decoded.to_rgba8();
        Ok(Self {
            width: rgba.width(),
            height: rgba.height(),
            rgba: rgba.into_raw(),
        })
    }

    /// Procedural round dot on a transparent background; the built-in
    /// stand-in when no sprite file is configured.
    pub fn dot(size: u32, color: Color) -> Self {
        let size = size.max(1);
        let mut rgba = vec![0u8; (size * size * 4) as usize];
        let center = (size as f32 - 1.0) * 0.5;
        let radius = size as f32 * 0.5 - 0.5;
        for y in 0..size {
            for x in 0..size {
                let dx = x as f32 - center;
                let dy = y as f32 - center;
                if dx * dx + dy * dy <= radius * radius {
                    let offset = ((y * size + x) * 4) as usize;
                    rgba[offset..offset + 4].copy_from_slice(&color);
                }
            }
        }
        Self {
            width: size,
            height: size,
            rgba,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn rgba(&self) -> &[u8] {
        &self.rgba
    }

    /// Nearest-neighbor sample; `None` outside the texture.
    pub(crate) fn sample(&self, x: i32, y: i32) -> Option<Color> {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return None;
        }
        let offset = ((y as u32 * self.width + x as u32) * 4) as usize;
        Some([
            self.rgba[offset],
            self.rgba[offset + 1],
            self.rgba[offset + 2],
            self.rgba[offset + 3],
        ])
    }
}
