//! NodeConfigurator - Request Layer
//!
//! Maps callers to sessions and exposes the configurator as commands.
//! The `nodecfg` binary serves those commands as line-delimited JSON over
//! stdin/stdout against the in-process sample namespace.

pub mod batch;
pub mod commands;
mod state;

pub use state::AppState;

use nodecfg_core::{Config, CoreError};

/// Environment variable naming a JSON config file
pub const CONFIG_ENV: &str = "NODECFG_CONFIG";

pub fn load_config() -> nodecfg_core::Result<Config> {
    match std::env::var(CONFIG_ENV) {
        Ok(path) => {
            let text = std::fs::read_to_string(&path)
                .map_err(|e| CoreError::Config(format!("{}: {}", path, e)))?;
            Config::from_json(&text)
        }
        Err(_) => Ok(Config::default()),
    }
}

pub async fn run() -> std::process::ExitCode {
    nodecfg_core::init_logging();

    let config = match load_config() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Failed to load configuration");
            return std::process::ExitCode::FAILURE;
        }
    };

    let state = AppState::offline(config);
    tracing::info!("NodeConfigurator started");

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    match batch::run(&state, stdin, std::io::stdout()).await {
        Ok(()) => {
            tracing::info!("NodeConfigurator stopped");
            std::process::ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "Command stream failed");
            std::process::ExitCode::FAILURE
        }
    }
}
