//! Command handlers and the shared engine bootstrap.

pub mod config_cmd;
pub mod resolve;
pub mod topology;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use topofuse_config::{Config, config_path, load_config};
use topofuse_core::adapter::from_config;
use topofuse_core::{FusionEngine, IdentityResolver, ResponseCache, SourceAdapter, SystemClock};

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

pub async fn dispatch(cmd: Command, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Topology(args) => topology::handle(args, global).await,
        Command::Resolve(args) => resolve::handle(args, global).await,
        Command::Config(args) => config_cmd::handle(&args, global),
    }
}

/// Config path from `--config`, else the platform default.
pub fn active_config_path(global: &GlobalOpts) -> PathBuf {
    global.config.clone().unwrap_or_else(config_path)
}

pub fn load(global: &GlobalOpts) -> Result<Config, CliError> {
    let path = active_config_path(global);
    load_config(Some(&path)).map_err(|e| CliError::config_load(&path, e))
}

/// Build the engine the config describes. `--timeout` overrides the
/// configured deadline.
pub fn build_engine(config: &Config, global: &GlobalOpts) -> Result<FusionEngine, CliError> {
    let sources = config.source_configs()?;
    if sources.is_empty() {
        return Err(CliError::NoSources {
            path: active_config_path(global).display().to_string(),
        });
    }
    let adapters = sources
        .iter()
        .map(from_config)
        .collect::<Result<Vec<Arc<dyn SourceAdapter>>, _>>()?;

    let mut engine_config = config.engine_config()?;
    if let Some(secs) = global.timeout {
        if secs == 0 {
            return Err(CliError::Validation {
                field: "--timeout".into(),
                reason: "must be greater than zero".into(),
            });
        }
        engine_config.deadline = Duration::from_secs(secs);
    }

    let resolver = IdentityResolver::from_config(&config.identity_config()?, Arc::new(SystemClock))?;
    debug!(sources = adapters.len(), "engine configured");

    Ok(FusionEngine::new(
        engine_config,
        adapters,
        Arc::new(resolver),
        ResponseCache::in_memory(),
    )?)
}
