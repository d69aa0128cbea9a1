//! Outbound API calls.
//!
//! An [`OutboundCall`] is a `(method, params)` pair ready to be sent. How it
//! travels is decided by an [`ApiCaller`] implementation; the runtime holds an
//! `Arc<dyn ApiCaller>` and never knows which one is in use.
//!
//! | Caller | Strategy |
//! |--------|----------|
//! | `HttpApiCaller` (courier-transport) | `GET <base><token>/<method>?<params>` |
//! | test doubles | record calls, return canned results |

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::ApiResult;

/// Parameter mapping of an outbound call.
pub type Params = Map<String, Value>;

/// A platform API call ready to be sent.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundCall {
    /// Method name, e.g. `"sendMessage"`.
    pub method: String,
    /// Call parameters.
    pub params: Params,
}

impl OutboundCall {
    /// Creates a new call.
    pub fn new(method: impl Into<String>, params: Params) -> Self {
        Self {
            method: method.into(),
            params,
        }
    }

    /// Returns a parameter by name.
    pub fn param(&self, name: &str) -> Option<&Value> {
        self.params.get(name)
    }
}

/// Transport-specific API call mechanism.
#[async_trait]
pub trait ApiCaller: Send + Sync {
    /// Invokes `method` with `params` and returns the decoded `result` field.
    ///
    /// # Errors
    /// Returns an [`ApiError`](crate::ApiError) on network failure, timeout,
    /// a non-JSON body, or a platform-reported error.
    async fn call(&self, method: &str, params: Params) -> ApiResult<Value>;

    /// Sends a prepared [`OutboundCall`].
    async fn send(&self, call: OutboundCall) -> ApiResult<Value> {
        self.call(&call.method, call.params).await
    }
}

/// Shared API caller.
pub type BoxedApiCaller = Arc<dyn ApiCaller>;
