//! The transport capability consumed by adapters.
//!
//! Courier does not own any wire transport. Each adapter bot holds an
//! `Arc<dyn ApiCaller>` supplied by the host, and every platform operation
//! (send, delete, topology listing, DM channel resolution) goes through
//! [`ApiCaller::call`] as a named action with JSON parameters.
//!
//! | Caller | Use |
//! |--------|-----|
//! | [`FnApiCaller`] | Wraps a host closure that already encapsulates URL, auth and timeouts. |
//! | [`DisabledApiCaller`] | Receive-only sessions; every call fails with [`ApiError::NotSupported`]. |

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde_json::Value;
use tracing::debug;

use crate::error::{ApiError, ApiResult};

// =============================================================================
// ApiCaller trait
// =============================================================================

/// Transport-specific API call mechanism.
///
/// Implementations own their timeout and connection policy; Courier awaits
/// the returned future and never retries a failed call.
#[async_trait]
pub trait ApiCaller: Send + Sync {
    /// Makes an API call and returns the response data.
    ///
    /// # Arguments
    /// * `action` – Protocol action name (e.g. `"post_messages"`).
    /// * `params` – JSON parameters for the action.
    async fn call(&self, _action: &str, _params: Value) -> ApiResult<Value> {
        Err(ApiError::NotSupported)
    }
}

/// A shared, type-erased [`ApiCaller`].
pub type BoxedApiCaller = Arc<dyn ApiCaller>;

// =============================================================================
// DisabledApiCaller
// =============================================================================

/// [`ApiCaller`] for sessions that cannot issue API calls.
pub struct DisabledApiCaller;

#[async_trait]
impl ApiCaller for DisabledApiCaller {}

// =============================================================================
// FnApiCaller
// =============================================================================

/// Host-supplied call function: `(action, params) -> response`.
pub type CallFn = Arc<dyn Fn(String, Value) -> BoxFuture<'static, ApiResult<Value>> + Send + Sync>;

/// [`ApiCaller`] that delegates every call to a host closure.
///
/// The closure captures everything transport-specific, so the caller itself
/// is stateless apart from the function.
pub struct FnApiCaller {
    call: CallFn,
}

impl FnApiCaller {
    /// Creates a new `FnApiCaller`.
    pub fn new(call: CallFn) -> Self {
        Self { call }
    }
}

#[async_trait]
impl ApiCaller for FnApiCaller {
    async fn call(&self, action: &str, params: Value) -> ApiResult<Value> {
        debug!(action = %action, "Calling platform API");
        (self.call)(action.to_string(), params).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;
    use serde_json::json;

    #[tokio::test]
    async fn test_disabled_caller() {
        let err = DisabledApiCaller.call("guilds", json!({})).await.unwrap_err();
        assert!(matches!(err, ApiError::NotSupported));
    }

    #[tokio::test]
    async fn test_fn_caller_forwards_action() {
        let caller = FnApiCaller::new(Arc::new(|action: String, params: Value| {
            async move { Ok::<_, ApiError>(json!({ "action": action, "params": params })) }
                .boxed()
        }));
        let result = caller.call("guilds", json!({ "limit": 1 })).await.unwrap();
        assert_eq!(result["action"], "guilds");
        assert_eq!(result["params"]["limit"], 1);
    }
}
