//! Push transport: the webhook HTTP server.
//!
//! The server answers every request with an empty `200 OK`, whatever its
//! method or path. A `POST` to the configured webhook path with a JSON body
//! becomes [`Inbound::Updates`]; everything else becomes
//! [`Inbound::Request`] so that notifications can be read from the query.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router,
    body::Bytes,
    extract::{Query, State},
    http::{Method, StatusCode, Uri},
};
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tracing::{debug, error, info, trace, warn};

use courier_core::{Inbound, RequestMeta, TransportError, TransportResult};

use crate::InboundSink;

/// Handle to a running listener.
///
/// Dropping the handle stops the listener.
pub struct ListenerHandle {
    /// Unique identifier for this listener.
    pub id: String,
    local_addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl ListenerHandle {
    fn new(id: impl Into<String>, local_addr: SocketAddr, shutdown_tx: oneshot::Sender<()>) -> Self {
        Self {
            id: id.into(),
            local_addr,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    /// Returns the address the OS actually bound (resolves port `0`).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stops the listener.
    pub fn stop(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

struct ServerState {
    path: String,
    sink: InboundSink,
}

/// Webhook HTTP server.
pub struct WebhookServer {
    host: String,
    port: u16,
    path: String,
}

impl WebhookServer {
    /// Creates a server description. Nothing is bound until [`listen`](Self::listen).
    pub fn new(host: impl Into<String>, port: u16, path: impl Into<String>) -> Self {
        let path = path.into();
        let path = if path.starts_with('/') {
            path
        } else {
            format!("/{path}")
        };

        Self {
            host: host.into(),
            port,
            path,
        }
    }

    /// Returns the webhook path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Binds the socket and starts serving.
    ///
    /// # Errors
    /// Returns [`TransportError::Bind`] when the address cannot be bound.
    pub async fn listen(&self, sink: InboundSink) -> TransportResult<ListenerHandle> {
        let addr = format!("{}:{}", self.host, self.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| TransportError::Bind {
                addr: addr.clone(),
                reason: e.to_string(),
            })?;
        let actual_addr = listener.local_addr()?;

        let state = Arc::new(ServerState {
            path: self.path.clone(),
            sink,
        });
        let router = Router::new().fallback(handle_request).with_state(state);

        info!(addr = %actual_addr, path = %self.path, "Webhook server listening");

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        tokio::spawn(async move {
            let server = axum::serve(listener, router).with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
                info!(addr = %actual_addr, "Webhook server shutting down");
            });

            if let Err(e) = server.await {
                error!(error = %e, "Webhook server error");
            }
        });

        Ok(ListenerHandle::new(
            format!("webhook-{actual_addr}"),
            actual_addr,
            shutdown_tx,
        ))
    }
}

async fn handle_request(
    State(state): State<Arc<ServerState>>,
    method: Method,
    uri: Uri,
    body: Bytes,
) -> StatusCode {
    trace!(method = %method, uri = %uri, len = body.len(), "Received HTTP request");

    if method == Method::POST && uri.path() == state.path {
        match serde_json::from_slice::<Value>(&body) {
            Ok(value) => {
                forward(&state.sink, Inbound::Updates(value));
                return StatusCode::OK;
            }
            Err(e) => debug!(error = %e, "Webhook body is not JSON"),
        }
    }

    forward(&state.sink, Inbound::Request(request_meta(&method, &uri)));
    StatusCode::OK
}

fn request_meta(method: &Method, uri: &Uri) -> RequestMeta {
    let query = Query::<HashMap<String, String>>::try_from_uri(uri)
        .map(|Query(query)| query)
        .unwrap_or_else(|e| {
            debug!(error = %e, uri = %uri, "Ignoring malformed query string");
            HashMap::new()
        });

    RequestMeta {
        method: method.as_str().to_string(),
        path: uri.path().to_string(),
        query,
    }
}

fn forward(sink: &InboundSink, inbound: Inbound) {
    if sink.send(inbound).is_err() {
        warn!("Inbound channel closed, dropping request");
    }
}
