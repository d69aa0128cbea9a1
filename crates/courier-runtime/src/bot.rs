//! The bot runtime.
//!
//! A [`Bot`] owns one inbound transport, the [`EventCore`] fed by it and the
//! API caller used for outbound calls. It is cheap to clone; the last clone
//! to be dropped runs the shutdown hooks.
//!
//! # Start-up
//!
//! ```text
//! polling:  deleteWebhook ─▶ getUpdates loop ──────────────┐
//!                                                          ▼
//! webhook:  bind server ─▶ open tunnel ─▶ setWebhook ─▶ InboundSink ─▶ ingest task ─▶ EventCore
//!                          (no public_url)
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use courier_runtime::{Bot, config::load_config};
//! use courier_core::Token;
//!
//! let bot = Bot::start(load_config()?, Token::new(token)).await?;
//! let reply = bot.reply(|_: &Update| "pong");
//! spawn_replies(bot.subscribe().matching(text("ping")), reply);
//! bot.run_until_signal().await;
//! ```

use std::fmt;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use futures::stream::BoxStream;
use serde_json::Value;
use tokio::signal;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use courier_core::{
    ApiResult, BoxedApiCaller, Inbound, Notification, Params, Token, Update,
};
use courier_framework::{AsTrigger, Response};
use courier_transport::{
    HttpApiCaller, InboundSink, NgrokTunnel, Poller, PollerConfig, Tunnel, WebhookServer,
};

use crate::config::{ConfigError, CourierConfig, TransportMode, WebhookConfig, validate_config};
use crate::event_core::EventCore;
use crate::error::RuntimeResult;
use crate::hooks::ShutdownHooks;
use crate::reply::{Replier, ReplyFn};

struct BotInner {
    core: Arc<EventCore>,
    caller: BoxedApiCaller,
    replier: Replier,
    public_url: Option<String>,
    local_addr: Option<SocketAddr>,
    hooks: ShutdownHooks,
}

/// A running bot.
#[derive(Clone)]
pub struct Bot {
    inner: Arc<BotInner>,
}

impl fmt::Debug for Bot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bot")
            .field("public_url", &self.inner.public_url)
            .field("local_addr", &self.inner.local_addr)
            .field("accepted", &self.inner.core.len())
            .finish()
    }
}

impl Bot {
    /// Starts a bot talking to the platform over HTTP.
    ///
    /// # Errors
    /// Fails if the configuration or token is invalid, the webhook server
    /// cannot bind, or the tunnel cannot be opened. Nothing after start-up
    /// stops the bot.
    pub async fn start(config: CourierConfig, token: Token) -> RuntimeResult<Self> {
        if token.is_empty() {
            return Err(ConfigError::validation("bot token is empty").into());
        }
        let caller = HttpApiCaller::new(config.api.base_url.clone(), token)?;
        Self::start_with_caller(config, Arc::new(caller)).await
    }

    /// Starts a bot with a custom API caller.
    ///
    /// Exactly one transport is started, chosen by `config.transport`.
    pub async fn start_with_caller(
        config: CourierConfig,
        caller: BoxedApiCaller,
    ) -> RuntimeResult<Self> {
        validate_config(&config)?;

        let hooks = ShutdownHooks::new();
        let (sink, rx) = mpsc::unbounded_channel();

        let (core, public_url, local_addr) = match config.transport {
            TransportMode::Polling => {
                start_polling(&config, &caller, sink, &hooks);
                (Arc::new(EventCore::new(false)), None, None)
            }
            TransportMode::Webhook => {
                let (public_url, local_addr) =
                    start_webhook(&config.webhook, &caller, sink, &hooks).await?;
                (Arc::new(EventCore::new(true)), Some(public_url), Some(local_addr))
            }
        };

        spawn_ingest(core.clone(), rx);
        info!(mode = %config.transport, public_url = ?public_url, "Bot started");

        Ok(Self::assemble(core, caller, public_url, local_addr, hooks))
    }

    /// Creates a bot without a transport.
    ///
    /// Inbound records are supplied through [`Bot::ingest`]. Notifications
    /// are enabled and the public URL comes from `config.webhook.public_url`.
    pub fn with_caller(config: &CourierConfig, caller: BoxedApiCaller) -> Self {
        Self::assemble(
            Arc::new(EventCore::new(true)),
            caller,
            config.webhook.public_url.clone(),
            None,
            ShutdownHooks::new(),
        )
    }

    fn assemble(
        core: Arc<EventCore>,
        caller: BoxedApiCaller,
        public_url: Option<String>,
        local_addr: Option<SocketAddr>,
        hooks: ShutdownHooks,
    ) -> Self {
        let replier = Replier::new(caller.clone(), public_url.as_deref());
        Self {
            inner: Arc::new(BotInner {
                core,
                caller,
                replier,
                public_url,
                local_addr,
                hooks,
            }),
        }
    }

    /// Feeds one raw inbound record to the event core.
    pub fn ingest(&self, inbound: Inbound) {
        self.inner.core.ingest(inbound);
    }

    /// Live deduplicated updates, from now on. A subscriber that falls more
    /// than [`STREAM_CAPACITY`](crate::event_core::STREAM_CAPACITY) items
    /// behind skips the oldest ones.
    pub fn subscribe(&self) -> BoxStream<'static, Update> {
        self.inner.core.subscribe()
    }

    /// Every accepted update, then live ones.
    pub fn subscribe_history(&self) -> BoxStream<'static, Update> {
        self.inner.core.subscribe_history()
    }

    /// Live notifications. Empty in polling mode.
    pub fn subscribe_notifications(&self) -> BoxStream<'static, Notification> {
        self.inner.core.subscribe_notifications()
    }

    /// Calls an API method and returns its `result`.
    ///
    /// # Errors
    /// Returns the caller's [`ApiError`](courier_core::ApiError); the bot
    /// keeps running.
    pub async fn send(&self, method: &str, params: Params) -> ApiResult<Value> {
        self.inner.caller.call(method, params).await
    }

    /// Wraps `handler` into a reply function for updates or notifications.
    pub fn reply<T, F, R>(&self, handler: F) -> ReplyFn<T>
    where
        T: AsTrigger + Send + Sync + 'static,
        F: Fn(&T) -> R + Send + Sync + 'static,
        R: Into<Response>,
    {
        self.inner.replier.reply_fn(handler)
    }

    /// Like [`reply`](Self::reply), for async handlers.
    pub fn reply_async<T, F, Fut, R>(&self, handler: F) -> ReplyFn<T>
    where
        T: AsTrigger + Clone + Send + Sync + 'static,
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: Into<Response>,
    {
        self.inner.replier.reply_fn_async(handler)
    }

    /// The externally reachable base URL, if known.
    pub fn public_url(&self) -> Option<&str> {
        self.inner.public_url.as_deref()
    }

    /// The address the webhook server bound, in webhook mode.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.inner.local_addr
    }

    /// A copy of the accepted updates.
    pub fn history(&self) -> Vec<Update> {
        self.inner.core.history()
    }

    /// The event core.
    pub fn core(&self) -> &Arc<EventCore> {
        &self.inner.core
    }

    /// Registers a cleanup action run once at shutdown.
    pub fn on_shutdown<F>(&self, name: impl Into<String>, hook: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.inner.hooks.register(name, hook);
    }

    /// Stops the transport and runs every shutdown hook.
    ///
    /// Safe to call more than once.
    pub fn shutdown(&self) {
        if self.inner.hooks.has_run() {
            return;
        }
        info!("Shutting down bot");
        self.inner.hooks.run();
    }

    /// Whether [`shutdown`](Self::shutdown) has run.
    pub fn is_shut_down(&self) -> bool {
        self.inner.hooks.has_run()
    }

    /// Runs until Ctrl+C or SIGTERM, then shuts down.
    pub async fn run_until_signal(&self) {
        info!("Bot is running. Press Ctrl+C to stop.");
        wait_for_shutdown().await;
        self.shutdown();
    }

    /// Runs until `shutdown` completes, then shuts down.
    pub async fn run_until<F>(&self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        shutdown.await;
        self.shutdown();
    }
}

fn start_polling(
    config: &CourierConfig,
    caller: &BoxedApiCaller,
    sink: InboundSink,
    hooks: &ShutdownHooks,
) {
    let poller = Poller::new(
        caller.clone(),
        PollerConfig {
            timeout_secs: config.polling.timeout_secs,
            interval: config.polling.interval(),
            track_offset: config.polling.track_offset,
            delete_webhook: true,
        },
    );

    let cancel = CancellationToken::new();
    poller.spawn(sink, cancel.clone());
    hooks.register("poller", move || cancel.cancel());
}

/// Brings up the push transport. Hooks registered before a failure run when
/// `hooks` is dropped by the caller.
async fn start_webhook(
    config: &WebhookConfig,
    caller: &BoxedApiCaller,
    sink: InboundSink,
    hooks: &ShutdownHooks,
) -> RuntimeResult<(String, SocketAddr)> {
    let server = WebhookServer::new(config.host.clone(), config.port, config.path.clone());
    let listener = server.listen(sink).await?;
    let local_addr = listener.local_addr();
    hooks.register("server", move || listener.stop());

    let public_url = match &config.public_url {
        Some(url) => url.clone(),
        None => {
            let mut tunnel = NgrokTunnel::open(&config.tunnel_command, local_addr.port()).await?;
            let url = tunnel.public_url().to_string();
            hooks.register("tunnel", move || tunnel.close());
            url
        }
    };

    let webhook_url = format!("{}{}", public_url.trim_end_matches('/'), server.path());
    let mut params = Params::new();
    params.insert("url".into(), Value::String(webhook_url.clone()));
    match caller.call("setWebhook", params).await {
        Ok(_) => info!(url = %webhook_url, "Webhook registered"),
        Err(e) => warn!(url = %webhook_url, error = %e, "Failed to register webhook"),
    }

    Ok((public_url, local_addr))
}

/// Drains the inbound channel into the core until every sender is gone.
fn spawn_ingest(core: Arc<EventCore>, mut rx: mpsc::UnboundedReceiver<Inbound>) {
    tokio::spawn(async move {
        while let Some(inbound) = rx.recv().await {
            core.ingest(inbound);
        }
        debug!("Inbound channel closed, ingest task finished");
    });
}

/// Waits for Ctrl+C or, on unix, SIGTERM.
async fn wait_for_shutdown() {
    #[cfg(unix)]
    {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = signal::ctrl_c() => {
                        info!("Received Ctrl+C, shutting down");
                    }
                    _ = sigterm.recv() => {
                        info!("Received SIGTERM, shutting down");
                    }
                }
                return;
            }
            Err(e) => warn!(error = %e, "Failed to register SIGTERM handler, waiting for Ctrl+C only"),
        }
    }

    if let Err(e) = signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl+C, shutting down");
        return;
    }
    info!("Received Ctrl+C, shutting down");
}
