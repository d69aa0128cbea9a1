//! Outbound HTTP API caller.
//!
//! Every call is a `GET <base_url><token>/<method>` with the parameters
//! encoded in the query string. The response body is the platform's JSON
//! envelope; its `result` field is returned on success.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, ClientBuilder, Url};
use serde_json::Value;
use tracing::{debug, info};

use courier_core::{ApiCaller, ApiError, ApiResult, Params, Token};

/// Connection establishment timeout.
///
/// No whole-request timeout: a `getUpdates` long poll
/// keeps the request open for as long as the configured poll timeout.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP API caller.
pub struct HttpApiCaller {
    client: Client,
    base_url: String,
    token: Token,
}

impl HttpApiCaller {
    /// Creates a caller for `base_url` (e.g. `https://api.telegram.org/bot`).
    pub fn new(base_url: impl Into<String>, token: Token) -> ApiResult<Self> {
        let client = ClientBuilder::new()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| ApiError::InvalidRequest(format!("failed to build HTTP client: {e}")))?;

        Ok(Self::with_client(client, base_url, token))
    }

    /// Creates a caller reusing an existing client.
    pub fn with_client(client: Client, base_url: impl Into<String>, token: Token) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            token,
        }
    }

    /// Builds the request URL for `method`.
    fn endpoint(&self, method: &str, params: &Params) -> ApiResult<Url> {
        let raw = format!("{}{}/{}", self.base_url, self.token.expose(), method);
        let mut url = Url::parse(&raw)
            .map_err(|e| ApiError::InvalidRequest(format!("{}: {e}", self.token.mask(&raw))))?;

        if !params.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in params {
                pairs.append_pair(key, &query_value(value));
            }
        }

        Ok(url)
    }
}

#[async_trait]
impl ApiCaller for HttpApiCaller {
    async fn call(&self, method: &str, params: Params) -> ApiResult<Value> {
        let url = self.endpoint(method, &params)?;
        let masked = self.token.mask(url.as_str());

        let response = self.client.get(url).send().await.map_err(|e| {
            debug!(method = %method, url = %masked, error = %e, "Request failed");
            if e.is_timeout() {
                ApiError::Timeout
            } else {
                ApiError::Network(self.token.mask(&e.to_string()))
            }
        })?;

        let status = response.status();
        info!(method = %method, url = %masked, status = status.as_u16(), "GET");

        let body = response
            .bytes()
            .await
            .map_err(|e| ApiError::Network(self.token.mask(&e.to_string())))?;
        let envelope: Value = serde_json::from_slice(&body)?;

        extract_result(envelope, i64::from(status.as_u16()))
    }
}

/// Encodes one parameter value for the query string.
///
/// Strings go verbatim, nested values as compact JSON.
fn query_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Unwraps the platform envelope `{ ok, result, error_code, description }`.
fn extract_result(envelope: Value, status: i64) -> ApiResult<Value> {
    let Value::Object(mut map) = envelope else {
        return Err(ApiError::InvalidResponse(
            "response body is not a JSON object".into(),
        ));
    };

    if map.get("ok").and_then(Value::as_bool) == Some(false) {
        let code = map
            .get("error_code")
            .and_then(Value::as_i64)
            .unwrap_or(status);
        let description = map
            .get("description")
            .and_then(Value::as_str)
            .unwrap_or("unknown platform error")
            .to_string();
        return Err(ApiError::Platform { code, description });
    }

    Ok(map.remove("result").unwrap_or(Value::Null))
}
