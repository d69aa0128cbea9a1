//! Pull transport: the `getUpdates` long-poll loop.

use std::time::Duration;

use serde_json::Value;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use courier_core::{BoxedApiCaller, Inbound, Params};

use crate::InboundSink;

/// Poll loop settings.
#[derive(Debug, Clone)]
pub struct PollerConfig {
    /// Long-poll timeout passed to the platform, in seconds.
    pub timeout_secs: u64,
    /// Pause between rounds.
    pub interval: Duration,
    /// Pass `offset = last seen id + 1` so the platform stops redelivering.
    pub track_offset: bool,
    /// Call `deleteWebhook` before the first round.
    pub delete_webhook: bool,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 60,
            interval: Duration::from_millis(100),
            track_offset: true,
            delete_webhook: true,
        }
    }
}

/// Long-poll loop forwarding every received item to an [`InboundSink`].
pub struct Poller {
    caller: BoxedApiCaller,
    config: PollerConfig,
    offset: Option<i64>,
}

impl Poller {
    /// Creates a poller.
    pub fn new(caller: BoxedApiCaller, config: PollerConfig) -> Self {
        Self {
            caller,
            config,
            offset: None,
        }
    }

    /// Spawns the loop on the current runtime.
    pub fn spawn(self, sink: InboundSink, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(sink, cancel))
    }

    /// Runs rounds until `cancel` fires or the sink closes.
    ///
    /// Cancellation also aborts a long poll that is in flight.
    pub async fn run(mut self, sink: InboundSink, cancel: CancellationToken) {
        if self.config.delete_webhook {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return,
                result = self.caller.call("deleteWebhook", Params::new()) => {
                    if let Err(e) = result {
                        warn!(error = %e, "Failed to unregister webhook before polling");
                    }
                }
            }
        }

        info!(
            timeout_secs = self.config.timeout_secs,
            interval_ms = self.config.interval.as_millis() as u64,
            "Polling started"
        );

        loop {
            let items = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                items = self.poll_once() => items,
            };

            for item in items {
                if sink.send(Inbound::Updates(item)).is_err() {
                    debug!("Inbound channel closed, stopping poller");
                    return;
                }
            }

            if cancel.is_cancelled() {
                break;
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.config.interval) => {}
            }
        }

        info!("Polling stopped");
    }

    /// Performs one `getUpdates` round. Failures yield no items.
    async fn poll_once(&mut self) -> Vec<Value> {
        let mut params = Params::new();
        params.insert("timeout".into(), Value::from(self.config.timeout_secs));
        if let Some(offset) = self.offset {
            params.insert("offset".into(), Value::from(offset));
        }

        let items = match self.caller.call("getUpdates", params).await {
            Ok(Value::Array(items)) => items,
            Ok(other) => {
                warn!(result = %other, "getUpdates returned a non-array result");
                return Vec::new();
            }
            Err(e) => {
                warn!(error = %e, "Poll round failed");
                return Vec::new();
            }
        };

        if self.config.track_offset {
            let max_id = items
                .iter()
                .filter_map(|item| item.get("update_id").and_then(Value::as_i64))
                .max();
            if let Some(max_id) = max_id {
                self.offset = Some(self.offset.map_or(max_id + 1, |o| o.max(max_id + 1)));
            }
        }

        debug!(count = items.len(), "Poll round complete");
        items
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Arc;

    use async_trait::async_trait;
    use courier_core::{ApiCaller, ApiError, ApiResult};
    use parking_lot::Mutex;
    use serde_json::json;
    use tokio::sync::mpsc;

    /// Replays canned responses, then hangs like an idle long poll.
    struct ScriptedCaller {
        responses: Mutex<VecDeque<ApiResult<Value>>>,
        calls: Mutex<Vec<(String, Params)>>,
    }

    impl ScriptedCaller {
        fn new(responses: Vec<ApiResult<Value>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
                calls: Mutex::new(Vec::new()),
            })
        }

        fn methods(&self) -> Vec<String> {
            self.calls.lock().iter().map(|(m, _)| m.clone()).collect()
        }
    }

    #[async_trait]
    impl ApiCaller for ScriptedCaller {
        async fn call(&self, method: &str, params: Params) -> ApiResult<Value> {
            self.calls.lock().push((method.to_string(), params));
            if method != "getUpdates" {
                return Ok(Value::Bool(true));
            }
            let next = self.responses.lock().pop_front();
            match next {
                Some(response) => response,
                None => std::future::pending().await,
            }
        }
    }

    fn config() -> PollerConfig {
        PollerConfig {
            timeout_secs: 30,
            interval: Duration::from_millis(1),
            track_offset: true,
            delete_webhook: true,
        }
    }

    #[tokio::test]
    async fn test_items_forwarded_in_order() {
        let caller = ScriptedCaller::new(vec![Ok(json!([
            {"update_id": 3},
            {"update_id": 1},
            {"update_id": 2}
        ]))]);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let handle = Poller::new(caller.clone(), config()).spawn(tx, cancel.clone());

        let mut ids = Vec::new();
        for _ in 0..3 {
            let Some(Inbound::Updates(item)) = rx.recv().await else {
                panic!("expected an update");
            };
            ids.push(item["update_id"].as_i64().unwrap());
        }
        assert_eq!(ids, vec![3, 1, 2]);

        cancel.cancel();
        handle.await.unwrap();
        assert_eq!(caller.methods()[0], "deleteWebhook");
    }

    #[tokio::test]
    async fn test_failed_round_continues_and_offset_advances() {
        let caller = ScriptedCaller::new(vec![
            Err(ApiError::Network("connection reset".into())),
            Ok(json!([{"update_id": 10}, {"update_id": 12}])),
            Ok(json!([])),
        ]);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let handle = Poller::new(caller.clone(), config()).spawn(tx, cancel.clone());

        rx.recv().await.unwrap();
        rx.recv().await.unwrap();

        // Wait until the poller parks on the fourth (pending) round.
        while caller.methods().len() < 5 {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        cancel.cancel();
        handle.await.unwrap();

        let calls = caller.calls.lock();
        assert!(calls[1].1.get("offset").is_none());
        assert!(calls[2].1.get("offset").is_none());
        assert_eq!(calls[3].1["offset"], 13);
        assert_eq!(calls[3].1["timeout"], 30);
    }

    #[tokio::test]
    async fn test_cancel_aborts_pending_poll() {
        let caller = ScriptedCaller::new(Vec::new());
        let (tx, _rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let handle = Poller::new(caller.clone(), config()).spawn(tx, cancel.clone());

        while caller.methods().len() < 2 {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        cancel.cancel();

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("poller did not stop")
            .unwrap();
        assert_eq!(caller.methods().len(), 2);
    }

    #[tokio::test]
    async fn test_cancelled_before_start_makes_no_calls() {
        let caller = ScriptedCaller::new(Vec::new());
        let (tx, _rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        cancel.cancel();

        Poller::new(caller.clone(), config()).run(tx, cancel).await;
        assert!(caller.methods().is_empty());
    }
}
