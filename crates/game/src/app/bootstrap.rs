use skirmish_engine::LoopConfig;
use thiserror::Error;
use tracing::info;
use tracing_subscriber::EnvFilter;

use super::config::{self, ConfigError};
use super::skirmish::{ScenarioError, SkirmishSimulation};

#[derive(Debug, Error)]
pub(crate) enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Scenario(#[from] ScenarioError),
}

pub(crate) struct AppWiring {
    pub(crate) config: LoopConfig,
    pub(crate) simulation: SkirmishSimulation,
}

pub(crate) fn build_app() -> Result<AppWiring, StartupError> {
    init_tracing();
    info!("=== Skirmish Startup ===");

    let game_config = config::load_config()?;
    let simulation = SkirmishSimulation::from_config(&game_config)?;

    Ok(AppWiring {
        config: game_config.loop_settings.to_loop_config(),
        simulation,
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
