use engine::LoopConfig;
use tracing::info;
use tracing_subscriber::EnvFilter;

use super::config::{self, ConfigError, ConfigSource};
use super::game::DriftSandbox;

pub(crate) struct AppWiring {
    pub(crate) loop_config: LoopConfig,
    pub(crate) game: DriftSandbox,
}

pub(crate) fn build_app() -> Result<AppWiring, ConfigError> {
    init_tracing();
    info!("=== Driftbox Startup ===");

    let (sandbox_config, source) = config::load()?;
    match &source {
        ConfigSource::Defaults => info!("config_defaults"),
        ConfigSource::File(path) => info!(path = %path.display(), "config_loaded"),
    }
    info!(
        dummy_count = sandbox_config.dummy_count,
        rng_seed = sandbox_config.rng_seed,
        shrink_steps = sandbox_config.shrink_steps,
        "sandbox_config"
    );

    Ok(AppWiring {
        loop_config: LoopConfig::default(),
        game: DriftSandbox::new(sandbox_config),
    })
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}
