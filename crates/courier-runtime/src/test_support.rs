use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use courier_core::{ApiCaller, ApiError, ApiResult, OutboundCall, Params};

/// Records every call and answers `true`, or fails when told to.
#[derive(Default)]
pub struct RecordingCaller {
    pub calls: Mutex<Vec<OutboundCall>>,
    pub fail: bool,
}

impl RecordingCaller {
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            fail: true,
            ..Self::default()
        })
    }

    pub fn methods(&self) -> Vec<String> {
        self.calls.lock().iter().map(|c| c.method.clone()).collect()
    }
}

#[async_trait]
impl ApiCaller for RecordingCaller {
    async fn call(&self, method: &str, params: Params) -> ApiResult<Value> {
        self.calls.lock().push(OutboundCall::new(method, params));
        if self.fail {
            return Err(ApiError::Platform {
                code: 400,
                description: "Bad Request".into(),
            });
        }
        Ok(Value::Bool(true))
    }
}
