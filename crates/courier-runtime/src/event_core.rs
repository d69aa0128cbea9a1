//! The event core: deduplication, history and fan-out.
//!
//! Every raw [`Inbound`] record passes through [`EventCore::ingest`]. Updates
//! are decoded, deduplicated by `update_id`, appended to the history and
//! broadcast to subscribers. Request metadata is decoded into notifications.
//!
//! ```text
//! Inbound ─▶ ingest ─┬─ Updates ─▶ decode ─▶ accept ─▶ history + broadcast
//!                    └─ Request ─▶ Notification::from_request ─▶ broadcast
//! ```

use std::collections::HashMap;

use futures::StreamExt;
use futures::stream::{self, BoxStream};
use parking_lot::Mutex;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, trace, warn};

use courier_core::{Inbound, Notification, Update, split_updates};

/// Broadcast buffer per subscriber before it starts lagging.
pub const STREAM_CAPACITY: usize = 1024;

#[derive(Default)]
struct History {
    updates: Vec<Update>,
    index: HashMap<i64, usize>,
}

/// Deduplicating update history with live subscribers.
pub struct EventCore {
    history: Mutex<History>,
    updates_tx: broadcast::Sender<Update>,
    notifications_tx: broadcast::Sender<Notification>,
    notifications: bool,
}

impl EventCore {
    /// Creates an empty core.
    ///
    /// With `notifications` off, request metadata is ignored and the
    /// notification stream is empty.
    pub fn new(notifications: bool) -> Self {
        let (updates_tx, _) = broadcast::channel(STREAM_CAPACITY);
        let (notifications_tx, _) = broadcast::channel(STREAM_CAPACITY);
        Self {
            history: Mutex::new(History::default()),
            updates_tx,
            notifications_tx,
            notifications,
        }
    }

    /// Whether notifications are decoded.
    pub fn notifications_enabled(&self) -> bool {
        self.notifications
    }

    /// Handles one raw record from a transport.
    pub fn ingest(&self, inbound: Inbound) {
        match inbound {
            Inbound::Updates(value) => {
                for item in split_updates(value) {
                    match Update::from_value(item) {
                        Ok(update) => {
                            self.accept(update);
                        }
                        Err(e) => warn!(error = %e, "Dropping malformed update"),
                    }
                }
            }
            Inbound::Request(meta) => {
                if !self.notifications {
                    trace!(path = %meta.path, "Ignoring request, notifications disabled");
                    return;
                }
                match Notification::from_request(&meta) {
                    Some(Ok(notification)) => self.publish(notification),
                    Some(Err(e)) => warn!(error = %e, "Dropping malformed notification"),
                    None => trace!(method = %meta.method, path = %meta.path, "Request carries no notification"),
                }
            }
        }
    }

    /// Accepts an update unless its id was seen before.
    ///
    /// Returns `true` if the update was new. Appending and broadcasting
    /// happen under the history lock, so a concurrent
    /// [`subscribe_history`](Self::subscribe_history) sees each update
    /// exactly once.
    pub fn accept(&self, update: Update) -> bool {
        let mut history = self.history.lock();
        let id = update.update_id;

        if history.index.contains_key(&id) {
            trace!(update_id = id, "Dropping duplicate update");
            return false;
        }

        let position = history.updates.len();
        history.index.insert(id, position);
        history.updates.push(update.clone());

        debug!(update_id = id, kind = update.kind.name(), "Update accepted");
        // No receivers is fine: nobody is listening yet.
        let _ = self.updates_tx.send(update);
        true
    }

    /// Broadcasts a notification.
    pub fn publish(&self, notification: Notification) {
        debug!(kind = ?notification.kind(), "Notification received");
        let _ = self.notifications_tx.send(notification);
    }

    /// Live updates from now on.
    ///
    /// Each subscriber buffers up to [`STREAM_CAPACITY`] items. One that falls
    /// further behind skips the oldest items with a warning and keeps going,
    /// so it may miss ids that other subscribers and the history still see.
    pub fn subscribe(&self) -> BoxStream<'static, Update> {
        receiver_stream(self.updates_tx.subscribe())
    }

    /// Every accepted update so far, in acceptance order, then live ones.
    ///
    /// The live part lags the same way as [`EventCore::subscribe`].
    pub fn subscribe_history(&self) -> BoxStream<'static, Update> {
        let (snapshot, rx) = {
            let history = self.history.lock();
            (history.updates.clone(), self.updates_tx.subscribe())
        };
        stream::iter(snapshot).chain(receiver_stream(rx)).boxed()
    }

    /// Live notifications; empty when notifications are disabled.
    pub fn subscribe_notifications(&self) -> BoxStream<'static, Notification> {
        if !self.notifications {
            return stream::empty().boxed();
        }
        receiver_stream(self.notifications_tx.subscribe())
    }

    /// A copy of the accepted updates.
    pub fn history(&self) -> Vec<Update> {
        self.history.lock().updates.clone()
    }

    /// Number of accepted updates.
    pub fn len(&self) -> usize {
        self.history.lock().updates.len()
    }

    /// Whether nothing was accepted yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `update_id` was accepted.
    pub fn contains(&self, update_id: i64) -> bool {
        self.history.lock().index.contains_key(&update_id)
    }
}

fn receiver_stream<T>(rx: broadcast::Receiver<T>) -> BoxStream<'static, T>
where
    T: Clone + Send + 'static,
{
    stream::unfold(rx, |mut rx| async move {
        loop {
            match rx.recv().await {
                Ok(item) => return Some((item, rx)),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Subscriber lagged behind, skipping items");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    })
    .boxed()
}
