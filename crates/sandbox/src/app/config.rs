use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

pub const CONFIG_ENV_VAR: &str = "DRIFTBOX_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "driftbox.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {} at {}: {source}", .path.display(), .source.path())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_path_to_error::Error<serde_json::Error>,
    },
}

/// Tunables for the sandbox scene. Sizes and speeds are viewport ratio
/// percents (`vw`/`vh`/`vm`), resolved against the mapper at spawn time.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SandboxConfig {
    pub dummy_count: usize,
    pub dummy_size_min_pct: f32,
    pub dummy_size_span_pct: f32,
    pub dummy_restitution: f32,
    pub target_speed_pct: f32,
    pub touch_radius_pct: f32,
    pub touch_stroke_width_pct: f32,
    pub touch_halo_blur_pct: f32,
    pub shrink_steps: u32,
    pub shrink_step_interval_ms: u64,
    pub shrink_target_ratio: f32,
    pub rng_seed: u64,
    pub sprite_path: Option<PathBuf>,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            dummy_count: 100,
            dummy_size_min_pct: 5.0,
            dummy_size_span_pct: 6.0,
            dummy_restitution: 1.0,
            target_speed_pct: 0.3,
            touch_radius_pct: 7.0,
            touch_stroke_width_pct: 0.5,
            touch_halo_blur_pct: 1.5,
            shrink_steps: 100,
            shrink_step_interval_ms: 16,
            shrink_target_ratio: 0.3,
            rng_seed: 7,
            sprite_path: None,
        }
    }
}

/// Where a loaded config came from, for the startup log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    Defaults,
    File(PathBuf),
}

/// Load the config from `DRIFTBOX_CONFIG` (or `driftbox.json` next to the
/// working directory). A missing file is not an error; defaults apply.
pub fn load() -> Result<(SandboxConfig, ConfigSource), ConfigError> {
    let path = std::env::var_os(CONFIG_ENV_VAR)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
    if !path.exists() {
        return Ok((SandboxConfig::default(), ConfigSource::Defaults));
    }
    let config = load_from(&path)?;
    Ok((config, ConfigSource::File(path)))
}

pub fn load_from(path: &Path) -> Result<SandboxConfig, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let mut deserializer = serde_json::Deserializer::from_str(&raw);
    serde_path_to_error::deserialize(&mut deserializer).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
