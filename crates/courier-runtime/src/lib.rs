//! Courier Runtime - Orchestration layer for Courier.
//!
//! This crate provides:
//! - Layered configuration (`courier.toml`, `COURIER_*` environment variables)
//! - Logging configuration on `tracing-subscriber`
//! - Bot session management and periodic bot registry refresh (`CourierRuntime`)
//!
//! ```ignore
//! use courier_runtime::CourierRuntime;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let runtime = CourierRuntime::builder().build()?;
//!
//!     // Hosts hand over sessions as their connections come up
//!     runtime.connect_bot(bot).await;
//!
//!     // Refresh now and every `registry.refresh_interval_secs`, until Ctrl+C
//!     runtime.run().await;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod logging;
pub mod runtime;

// Re-exports
pub use config::{
    ConfigError, ConfigLoader, ConfigResult, CourierConfig, LoggingConfig, RegistryConfig,
};
pub use logging::LoggingBuilder;
pub use runtime::{CourierRuntime, RuntimeBuilder};

// Re-export tracing for use by other crates
pub use tracing;
pub use tracing_subscriber;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use tracing::{Level, debug, error, info, instrument, span, trace, warn};
}
