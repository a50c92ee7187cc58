//! Configuration validation

use super::*;
use crate::error::{EmbeddingsError, Result};

const LOG_FORMATS: [&str; 3] = ["json", "compact", "pretty"];

/// Validate complete configuration
pub fn validate_config(config: &Config) -> Result<()> {
    validate_client_config(&config.client)?;
    validate_logging_config(&config.logging)?;
    Ok(())
}

/// Validate client configuration
fn validate_client_config(config: &ClientConfig) -> Result<()> {
    if config.uri.is_empty() {
        return Err(EmbeddingsError::Config(
            "Client URI cannot be empty".to_string()
        ));
    }

    if let Err(e) = url::Url::parse(&config.uri) {
        return Err(EmbeddingsError::Config(
            format!("Client URI '{}' is not a valid URI: {}", config.uri, e)
        ));
    }

    // Model names are checked by the backend; only reject the empty name.
    if config.model.trim().is_empty() {
        return Err(EmbeddingsError::Config(
            "Model name cannot be empty".to_string()
        ));
    }

    if config.timeout_secs > 300 {
        return Err(EmbeddingsError::Config(
            "Client timeout too large (max: 300 seconds)".to_string()
        ));
    }

    Ok(())
}

/// Validate logging configuration
fn validate_logging_config(config: &LoggingConfig) -> Result<()> {
    if config.level.is_empty() {
        return Err(EmbeddingsError::Config(
            "Log level cannot be empty".to_string()
        ));
    }

    if !LOG_FORMATS.contains(&config.format.as_str()) {
        return Err(EmbeddingsError::Config(
            format!("Log format must be one of {:?}, got '{}'", LOG_FORMATS, config.format)
        ));
    }

    Ok(())
}
