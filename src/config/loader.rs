//! Configuration loader with environment variable support

use super::Config;
use crate::error::Result;
use config::{Environment, File};
use std::path::Path;

/// Prefix for environment overrides, e.g. `EMBEDDINGS__CLIENT__URI`
pub const ENV_PREFIX: &str = "EMBEDDINGS";

fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
}

/// Load configuration from a TOML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let config = config::Config::builder()
        .add_source(File::from(path.as_ref()))
        .build()?;

    Ok(config.try_deserialize()?)
}

/// Load configuration from a TOML file with environment variable overrides
pub fn load_config_with_env<P: AsRef<Path>>(path: P) -> Result<Config> {
    let config = config::Config::builder()
        .add_source(File::from(path.as_ref()))
        .add_source(environment())
        .build()?;

    Ok(config.try_deserialize()?)
}

/// Load defaults overridden by environment variables
pub fn load_env_only() -> Result<Config> {
    let config = config::Config::builder()
        .add_source(environment())
        .build()?;

    Ok(config.try_deserialize()?)
}
