//! Configuration validation.

use super::error::{ConfigError, ConfigResult};
use super::schema::{CourierConfig, LogOutput, LoggingConfig};

/// Validates the entire configuration.
pub fn validate_config(config: &CourierConfig) -> ConfigResult<()> {
    validate_logging_config(&config.logging)?;
    Ok(())
}

fn validate_logging_config(logging: &LoggingConfig) -> ConfigResult<()> {
    if logging.output == LogOutput::File && logging.file_path.is_none() {
        return Err(ConfigError::validation(
            "logging.output is 'file' but logging.file_path is not set",
        ));
    }

    if let Some(module) = logging
        .filters
        .keys()
        .find(|module| module.is_empty() || module.contains(char::is_whitespace))
    {
        return Err(ConfigError::validation(format!(
            "Invalid module name in logging.filters: {module:?}"
        )));
    }

    Ok(())
}
