//! # Courier
//!
//! Protocol-agnostic outbound messaging for bots connected to several chat
//! platforms at once.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐     ┌─────────────┐     ┌──────────────┐     ┌─────────┐
//! │ Message +    │────▶│ BotRegistry │────▶│ Bot::render  │────▶│ Receipt │──▶ revoke
//! │ Target/Event │     │  (get_bot)  │     │ send_rendered│     │         │
//! └──────────────┘     └─────────────┘     └──────────────┘     └─────────┘
//! ```
//!
//! - **Core**: message model, targets, rendering, registry and the send pipeline
//! - **Adapters**: QQ open platform, OneBot v11 and a local console
//! - **Runtime**: configuration, logging and periodic registry refresh
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use courier::prelude::*;
//! use courier::qq::QqBot;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let runtime = CourierRuntime::builder().build()?;
//!     runtime.connect_bot(Arc::new(QqBot::new("3344", caller))).await;
//!     runtime.start().await;
//!
//!     let target = Target::QqGuildChannel { channel_id: 2233 };
//!     let receipt = runtime
//!         .courier()
//!         .send_to(Message::from("hello ") + MessageSegment::MentionAll, &target, None)
//!         .await?;
//!     receipt.revoke().await?;
//!
//!     runtime.run().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `runtime` *(default)*: [`CourierRuntime`](runtime::CourierRuntime)
//! - `qq`, `onebot`, `console` *(default)*: platform adapters
//! - `toml-config` / `yaml-config`: configuration file formats
//! - `json-log`: JSON log lines
//! - `testing`: scripted API caller for adapter tests

pub use courier_core as core;

#[cfg(feature = "runtime")]
pub use courier_runtime as runtime;

#[cfg(feature = "console")]
pub use courier_adapter_console as console;
#[cfg(feature = "onebot")]
pub use courier_adapter_onebot as onebot;
#[cfg(feature = "qq")]
pub use courier_adapter_qq as qq;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use courier::prelude::*;
/// ```
pub mod prelude {
    // Core model and send pipeline
    pub use courier_core::prelude::*;

    // Runtime - main entry point
    #[cfg(feature = "runtime")]
    pub use courier_runtime::CourierRuntime;
}
