mod raster;
mod renderer;
mod sprite;

pub use raster::Raster;
pub use renderer::{RenderOptions, Renderer, CLEAR_COLOR};
pub use sprite::{SpriteError, SpriteTexture};
