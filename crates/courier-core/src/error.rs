//! Unified error types for the Courier core.
//!
//! Two layers of failure exist:
//!
//! - [`ApiError`]: an opaque transport failure reported by an adapter's
//!   [`ApiCaller`](crate::ApiCaller). Courier never retries these.
//! - [`CourierError`]: everything the delivery layer reports to callers,
//!   including transport failures wrapped with the adapter kind and target
//!   they occurred on.

use thiserror::Error;

use crate::target::{AdapterKind, Target};

// =============================================================================
// API Errors
// =============================================================================

/// Error type for raw API calls made through a transport.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// The bot is not connected.
    #[error("bot is not connected")]
    NotConnected,
    /// The API call timed out.
    #[error("API call timed out")]
    Timeout,
    /// The API returned an error.
    #[error("API error ({retcode}): {message}")]
    ApiError { retcode: i64, message: String },
    /// Failed to serialize/deserialize.
    #[error("serialization error: {0}")]
    SerializationError(String),
    /// The transport itself failed.
    #[error("transport error: {0}")]
    Transport(String),
    /// The transport cannot issue API calls.
    #[error("API calls are not supported by this transport")]
    NotSupported,
    /// Other error.
    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}

// =============================================================================
// Courier Errors
// =============================================================================

/// Errors reported by rendering, target extraction, bot selection and delivery.
#[derive(Debug, Clone, Error)]
pub enum CourierError {
    /// A segment has no rendering on the chosen adapter.
    #[error("segment '{segment}' is not supported by adapter '{adapter}'")]
    UnsupportedSegment {
        /// The segment variant name.
        segment: &'static str,
        /// The adapter that cannot render it.
        adapter: AdapterKind,
    },

    /// The message is expressible segment by segment but violates an
    /// adapter-specific constraint as a whole.
    #[error("cannot render message for adapter '{adapter}': {reason}")]
    Render {
        adapter: AdapterKind,
        reason: String,
    },

    /// The event's shape matches no registered event kind.
    #[error("cannot extract a target from event '{event}'")]
    UnresolvedTarget {
        /// Name of the event kind.
        event: &'static str,
    },

    /// A bot-scoped target was requested without a receiving bot.
    #[error("event '{event}' needs the receiving bot to build its target")]
    MissingBotContext { event: &'static str },

    /// `get_bot` was called before any registry refresh completed.
    #[error("bot registry has not been refreshed yet")]
    RegistryNotReady,

    /// No connected bot can reach the target.
    #[error("no connected bot can deliver to {target}")]
    NoCapableBot { target: Target },

    /// An explicitly supplied bot belongs to an adapter that cannot address the target.
    #[error("bot on adapter '{adapter}' cannot deliver to {target}")]
    TargetMismatch {
        target: Target,
        adapter: AdapterKind,
    },

    /// The adapter has no recall capability.
    #[error("adapter '{adapter}' does not support revoking messages")]
    RevokeUnsupported { adapter: AdapterKind },

    /// A local image could not be read.
    #[error("failed to read local file '{path}': {reason}")]
    Io { path: String, reason: String },

    /// A topology query made during a registry refresh failed.
    #[error("{adapter} bot '{bot_id}' could not list its targets: {source}")]
    Topology {
        adapter: AdapterKind,
        bot_id: String,
        #[source]
        source: ApiError,
    },

    /// A transport call failed.
    #[error("{adapter} API call failed for {target}: {source}")]
    Api {
        adapter: AdapterKind,
        target: Target,
        #[source]
        source: ApiError,
    },
}

impl CourierError {
    /// Creates an unsupported-segment error.
    pub fn unsupported(segment: &'static str, adapter: AdapterKind) -> Self {
        Self::UnsupportedSegment { segment, adapter }
    }

    /// Creates a render constraint error.
    pub fn render(adapter: AdapterKind, reason: impl Into<String>) -> Self {
        Self::Render {
            adapter,
            reason: reason.into(),
        }
    }

    /// Wraps a transport failure with its delivery context.
    pub fn api(adapter: AdapterKind, target: &Target, source: ApiError) -> Self {
        Self::Api {
            adapter,
            target: target.clone(),
            source,
        }
    }

    /// Wraps a topology query failure.
    pub fn topology(adapter: AdapterKind, bot_id: impl Into<String>, source: ApiError) -> Self {
        Self::Topology {
            adapter,
            bot_id: bot_id.into(),
            source,
        }
    }

    /// Returns the underlying transport failure, if this is one.
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            Self::Api { source, .. } | Self::Topology { source, .. } => Some(source),
            _ => None,
        }
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for API calls.
pub type ApiResult<T> = Result<T, ApiError>;

/// Result type for delivery operations.
pub type CourierResult<T> = Result<T, CourierError>;
