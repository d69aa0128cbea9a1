//! Turning handler responses into API calls.
//!
//! A reply function wraps a user handler: it is called with each item of a
//! stream, feeds the item to the handler, resolves the [`Response`] against
//! the item and sends the resulting call.
//!
//! ```text
//! item ─▶ handler ─▶ Response ─▶ Reply ─▶ resolve ─▶ OutboundCall ─▶ ApiCaller
//!                        │          │          │
//!                     Nothing    unknown    resolve error
//!                     (debug)    (warn)     (warn)
//! ```
//!
//! Handlers are synchronous or async. Neither a missing reply nor a
//! resolution failure is an error for the caller; only the API call's own
//! failure is returned.

use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::{FutureExt, Stream, StreamExt};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use courier_core::{ApiResult, BoxedApiCaller};
use courier_framework::{AsTrigger, ResolveContext, Response, Trigger};

/// A reply function: answers one item and reports the API call's result.
pub type ReplyFn<T> = Arc<dyn Fn(T) -> BoxFuture<'static, ApiResult<()>> + Send + Sync>;

/// Resolves responses and sends them through the bot's caller.
#[derive(Clone)]
pub struct Replier {
    caller: BoxedApiCaller,
    public_url: Option<Arc<str>>,
}

impl Replier {
    /// Creates a replier sending through `caller`.
    pub fn new(caller: BoxedApiCaller, public_url: Option<&str>) -> Self {
        Self {
            caller,
            public_url: public_url.map(Arc::from),
        }
    }

    /// Answers `trigger` with `response`.
    pub async fn respond(&self, trigger: Trigger<'_>, response: Response) -> ApiResult<()> {
        if matches!(response, Response::Nothing) {
            debug!(trigger = %trigger.describe(), "Handler returned nothing, not replying");
            return Ok(());
        }

        let Some(reply) = response.into_reply(trigger) else {
            warn!("Don't know how to reply to {}", trigger.describe());
            return Ok(());
        };

        let ctx = ResolveContext {
            public_url: self.public_url.as_deref(),
        };
        let call = match reply.resolve(trigger, &ctx) {
            Ok(call) => call,
            Err(e) => {
                warn!(reply = reply.name(), trigger = %trigger.describe(), error = %e, "Cannot resolve reply");
                return Ok(());
            }
        };

        debug!(method = %call.method, trigger = %trigger.describe(), "Sending reply");
        self.caller.send(call).await.map(|_| ())
    }

    /// Wraps a synchronous handler.
    pub fn reply_fn<T, F, R>(&self, handler: F) -> ReplyFn<T>
    where
        T: AsTrigger + Send + Sync + 'static,
        F: Fn(&T) -> R + Send + Sync + 'static,
        R: Into<Response>,
    {
        let replier = self.clone();
        Arc::new(move |item: T| {
            let response: Response = handler(&item).into();
            let replier = replier.clone();
            async move { replier.respond(item.as_trigger(), response).await }.boxed()
        })
    }

    /// Wraps an async handler. The handler gets its own copy of the item.
    pub fn reply_fn_async<T, F, Fut, R>(&self, handler: F) -> ReplyFn<T>
    where
        T: AsTrigger + Clone + Send + Sync + 'static,
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: Into<Response>,
    {
        let replier = self.clone();
        let handler = Arc::new(handler);
        Arc::new(move |item: T| {
            let replier = replier.clone();
            let handler = handler.clone();
            async move {
                let response: Response = handler(item.clone()).await.into();
                replier.respond(item.as_trigger(), response).await
            }
            .boxed()
        })
    }
}

/// Feeds every item of `stream` to `reply`, one at a time, on a new task.
///
/// Failed API calls are logged and do not stop the loop.
pub fn spawn_replies<S, T>(stream: S, reply: ReplyFn<T>) -> JoinHandle<()>
where
    S: Stream<Item = T> + Send + 'static,
    T: Send + 'static,
{
    tokio::spawn(async move {
        let mut stream = Box::pin(stream);
        while let Some(item) = stream.next().await {
            if let Err(e) = reply(item).await {
                warn!(error = %e, "Reply failed");
            }
        }
        debug!("Reply stream ended");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::RecordingCaller;
    use courier_core::{Notification, RequestMeta, SCORE_ID_PARAM, ScoreToken, Update};
    use courier_framework::replies;
    use futures::stream;
    use serde_json::{Value, json};

    fn message(id: i64, text: &str) -> Update {
        Update::from_value(json!({
            "update_id": id,
            "message": {"message_id": id, "chat": {"id": 5}, "text": text}
        }))
        .unwrap()
    }

    fn other(id: i64) -> Update {
        Update::from_value(json!({"update_id": id, "poll": {"id": "p"}})).unwrap()
    }

    fn score_notification() -> Notification {
        let meta = RequestMeta::new("GET", "/")
            .with_query(SCORE_ID_PARAM, ScoreToken::new(42, 7, -9).encode())
            .with_query("score", "300");
        Notification::from_request(&meta).unwrap().unwrap()
    }

    #[tokio::test]
    async fn test_plain_string_becomes_text() {
        let caller = RecordingCaller::shared();
        let replier = Replier::new(caller.clone(), None);

        let reply = replier.reply_fn(|_: &Update| "pong");
        reply(message(1, "ping")).await.unwrap();

        let calls = caller.calls.lock();
        assert_eq!(calls[0].method, "sendMessage");
        assert_eq!(calls[0].params["chat_id"], 5);
        assert_eq!(calls[0].params["text"], "pong");
    }

    #[tokio::test]
    async fn test_nothing_sends_nothing() {
        let caller = RecordingCaller::shared();
        let replier = Replier::new(caller.clone(), None);

        let reply = replier.reply_fn(|_: &Update| ());
        reply(message(1, "hi")).await.unwrap();
        assert!(caller.calls.lock().is_empty());
    }

    #[tokio::test]
    async fn test_unrecognized_update_is_not_an_error() {
        let caller = RecordingCaller::shared();
        let replier = Replier::new(caller.clone(), None);

        let reply = replier.reply_fn(|_: &Update| "hello");
        assert!(reply(other(9)).await.is_ok());
        assert!(caller.calls.lock().is_empty());
    }

    #[tokio::test]
    async fn test_resolve_error_is_not_an_error() {
        let caller = RecordingCaller::shared();
        let replier = Replier::new(caller.clone(), None);

        // A message has no callback query to acknowledge.
        let reply = replier.reply_fn(|_: &Update| replies::callback(Default::default()));
        assert!(reply(message(1, "hi")).await.is_ok());
        assert!(caller.calls.lock().is_empty());
    }

    #[tokio::test]
    async fn test_api_failure_is_returned() {
        let caller = RecordingCaller::failing();
        let replier = Replier::new(caller.clone(), None);

        let reply = replier.reply_fn(|_: &Update| "pong");
        assert!(reply(message(1, "ping")).await.is_err());
        assert_eq!(caller.methods(), vec!["sendMessage"]);
    }

    #[tokio::test]
    async fn test_async_handler_sends_score() {
        let caller = RecordingCaller::shared();
        let replier = Replier::new(caller.clone(), None);

        let reply = replier.reply_fn_async(|_: Notification| async {
            let mut params = courier_core::Params::new();
            params.insert("edit_message".into(), Value::Bool(true));
            replies::send_score(params)
        });
        reply(score_notification()).await.unwrap();

        let calls = caller.calls.lock();
        assert_eq!(calls[0].method, "setGameScore");
        assert_eq!(calls[0].params["user_id"], 42);
        assert_eq!(calls[0].params["chat_id"], -9);
        assert_eq!(calls[0].params["score"], "300");
        assert_eq!(calls[0].params["edit_message"], true);
    }

    #[tokio::test]
    async fn test_spawn_replies_keeps_order_and_survives_failures() {
        let caller = RecordingCaller::failing();
        let replier = Replier::new(caller.clone(), None);

        let reply = replier.reply_fn(|update: &Update| update.update_id.to_string());
        spawn_replies(stream::iter(vec![message(1, "a"), message(2, "b")]), reply)
            .await
            .unwrap();

        let texts: Vec<Value> = caller
            .calls
            .lock()
            .iter()
            .map(|c| c.params["text"].clone())
            .collect();
        assert_eq!(texts, vec![json!("1"), json!("2")]);
    }
}
