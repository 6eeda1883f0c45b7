//! Test support for adapter crates.
//!
//! [`ScriptedCaller`] is an [`ApiCaller`] that expects an exact sequence of
//! `(action, params)` calls and answers each with a scripted result:
//!
//! ```rust,ignore
//! let caller = ScriptedCaller::new();
//! caller.should_call("post_messages", json!({ "channel_id": "2233", ... }), json!({ "id": "1" }));
//! let bot = QqBot::new("bot", caller.clone());
//! // ... drive the bot ...
//! caller.assert_done();
//! ```
//!
//! Any call that does not match the next expectation panics, which fails the
//! calling test.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use crate::error::{ApiError, ApiResult};
use crate::transport::ApiCaller;

struct Expectation {
    action: String,
    /// `None` accepts any parameters.
    params: Option<Value>,
    result: ApiResult<Value>,
}

/// An [`ApiCaller`] replaying a fixed script of expected calls.
#[derive(Default)]
pub struct ScriptedCaller {
    expected: Mutex<VecDeque<Expectation>>,
    calls: Mutex<Vec<(String, Value)>>,
}

impl ScriptedCaller {
    /// Creates a caller with an empty script.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Expects `action` with exactly `params`, answering with `result`.
    pub fn should_call(&self, action: &str, params: Value, result: Value) -> &Self {
        self.push(action, Some(params), Ok(result))
    }

    /// Expects `action` with any parameters, answering with `result`.
    pub fn should_call_any(&self, action: &str, result: Value) -> &Self {
        self.push(action, None, Ok(result))
    }

    /// Expects `action` with exactly `params`, failing with `error`.
    pub fn should_fail(&self, action: &str, params: Value, error: ApiError) -> &Self {
        self.push(action, Some(params), Err(error))
    }

    /// Every call received so far, in order.
    pub fn calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().clone()
    }

    /// Number of calls received so far.
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// Number of calls received for `action`.
    pub fn count_of(&self, action: &str) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|(called, _)| called == action)
            .count()
    }

    /// Panics if any expected call was not made.
    #[track_caller]
    pub fn assert_done(&self) {
        let expected = self.expected.lock();
        if !expected.is_empty() {
            let pending: Vec<_> = expected.iter().map(|e| e.action.as_str()).collect();
            panic!("expected calls were not made: {pending:?}");
        }
    }

    fn push(&self, action: &str, params: Option<Value>, result: ApiResult<Value>) -> &Self {
        self.expected.lock().push_back(Expectation {
            action: action.to_string(),
            params,
            result,
        });
        self
    }
}

#[async_trait]
impl ApiCaller for ScriptedCaller {
    async fn call(&self, action: &str, params: Value) -> ApiResult<Value> {
        self.calls.lock().push((action.to_string(), params.clone()));

        let next = self.expected.lock().pop_front();
        let Some(expectation) = next else {
            panic!("unexpected call to '{action}' with {params}");
        };

        assert_eq!(
            expectation.action, action,
            "unexpected action (params: {params})"
        );
        if let Some(expected) = &expectation.params {
            assert_eq!(expected, &params, "unexpected params for '{action}'");
        }
        expectation.result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_script_replayed_in_order() {
        let caller = ScriptedCaller::new();
        caller
            .should_call("guilds", json!({}), json!([{ "id": "1" }]))
            .should_fail("get_channels", json!({ "guild_id": "1" }), ApiError::Timeout);

        let guilds = caller.call("guilds", json!({})).await.unwrap();
        assert_eq!(guilds[0]["id"], "1");

        let err = caller
            .call("get_channels", json!({ "guild_id": "1" }))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Timeout));

        caller.assert_done();
        assert_eq!(caller.call_count(), 2);
        assert_eq!(caller.count_of("guilds"), 1);
    }

    #[tokio::test]
    #[should_panic(expected = "unexpected call")]
    async fn test_unexpected_call_panics() {
        let caller = ScriptedCaller::new();
        let _ = caller.call("guilds", json!({})).await;
    }

    #[test]
    #[should_panic(expected = "expected calls were not made")]
    fn test_pending_expectation_panics() {
        let caller = ScriptedCaller::new();
        caller.should_call_any("guilds", json!([]));
        caller.assert_done();
    }
}
