mod bootstrap;
mod config;
mod game;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Config(#[from] config::ConfigError),
    #[error(transparent)]
    App(#[from] engine::AppError),
}

pub fn run() -> Result<(), RunError> {
    let wiring = bootstrap::build_app()?;
    engine::run_app(wiring.loop_config, Box::new(wiring.game))?;
    Ok(())
}
