//! Configuration for the Courier runtime.
//!
//! Sources are layered with figment; see [`ConfigLoader`] for the order.

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, load_config, load_config_from_file};
pub use schema::{
    CourierConfig, LogFormat, LogLevel, LogOutput, LogRotation, LoggingConfig, RegistryConfig,
};
pub use validation::validate_config;
