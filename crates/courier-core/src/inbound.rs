//! Raw records handed from a transport to the event core.

use std::collections::HashMap;

use serde_json::Value;

/// Metadata of an HTTP request that did not carry updates.
///
/// The webhook server forwards every such request so that side-channel
/// signals (see [`Notification`](crate::Notification)) can be read from its
/// query string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestMeta {
    /// HTTP method, upper case.
    pub method: String,
    /// Request path.
    pub path: String,
    /// Decoded query parameters.
    pub query: HashMap<String, String>,
}

impl RequestMeta {
    /// Creates request metadata.
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            query: HashMap::new(),
        }
    }

    /// Adds a query parameter.
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }
}

/// A raw inbound record.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    /// JSON carrying one update or an array of updates.
    Updates(Value),
    /// A request without updates.
    Request(RequestMeta),
}

/// Flattens an update payload into individual update values.
///
/// Arrays yield their items in order, objects yield themselves, anything
/// else yields nothing.
pub fn split_updates(value: Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items,
        Value::Object(_) => vec![value],
        _ => Vec::new(),
    }
}
