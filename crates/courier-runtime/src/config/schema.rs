//! Configuration schema definitions.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration structure.
///
/// The bot token is not part of it: it is passed to
/// [`Bot::start`](crate::Bot::start) and never read from a file.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CourierConfig {
    /// Platform API settings.
    #[serde(default)]
    pub api: ApiConfig,

    /// Which inbound transport to run.
    #[serde(default)]
    pub transport: TransportMode,

    /// Poll mode settings.
    #[serde(default)]
    pub polling: PollingConfig,

    /// Push mode settings.
    #[serde(default)]
    pub webhook: WebhookConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Platform API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL; the token and method name are appended to it.
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
        }
    }
}

fn default_base_url() -> String {
    "https://api.telegram.org/bot".to_string()
}

/// Inbound transport strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportMode {
    /// The platform pushes updates to our HTTP server.
    #[default]
    Webhook,
    /// We long-poll `getUpdates`.
    Polling,
}

impl fmt::Display for TransportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Webhook => f.write_str("webhook"),
            Self::Polling => f.write_str("polling"),
        }
    }
}

/// Poll mode settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    /// Long-poll timeout passed to `getUpdates`, in seconds.
    #[serde(default = "default_poll_timeout_secs")]
    pub timeout_secs: u64,

    /// Pause between rounds, in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub interval_ms: u64,

    /// Acknowledge received updates through the `offset` parameter.
    #[serde(default = "default_true")]
    pub track_offset: bool,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_poll_timeout_secs(),
            interval_ms: default_poll_interval_ms(),
            track_offset: true,
        }
    }
}

impl PollingConfig {
    /// Pause between rounds.
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

fn default_poll_timeout_secs() -> u64 {
    60
}

fn default_poll_interval_ms() -> u64 {
    100
}

fn default_true() -> bool {
    true
}

/// Push mode settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    /// Host address to bind to.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on. `0` lets the OS choose.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Path the platform posts updates to.
    #[serde(default = "default_webhook_path")]
    pub path: String,

    /// Externally reachable base URL. When unset a tunnel is opened.
    #[serde(default)]
    pub public_url: Option<String>,

    /// Open a tunnel when no public URL is configured.
    #[serde(default = "default_true")]
    pub tunnel: bool,

    /// Tunnel executable.
    #[serde(default = "default_tunnel_command")]
    pub tunnel_command: String,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            path: default_webhook_path(),
            public_url: None,
            tunnel: true,
            tunnel_command: default_tunnel_command(),
        }
    }
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_webhook_path() -> String {
    "/webhook".to_string()
}

fn default_tunnel_command() -> String {
    "ngrok".to_string()
}

// =============================================================================
// Logging
// =============================================================================

/// Log verbosity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Everything.
    Trace,
    /// Debugging detail.
    Debug,
    /// Normal operation.
    #[default]
    Info,
    /// Recoverable problems.
    Warn,
    /// Failures.
    Error,
}

impl LogLevel {
    /// Returns the level name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    /// Converts to a [`tracing::Level`].
    pub fn to_tracing_level(self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Log line layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Single-line, abbreviated.
    #[default]
    Compact,
    /// Single-line with all fields.
    Full,
    /// Multi-line, human friendly.
    Pretty,
    /// Newline-delimited JSON (`json-log` feature).
    #[cfg(feature = "json-log")]
    Json,
}

/// Log destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    /// Standard output.
    #[default]
    Stdout,
    /// Standard error.
    Stderr,
    /// A file, see [`LoggingConfig::file_path`].
    File,
}

/// Which span lifecycle events are logged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpanEventConfig {
    /// Span creation.
    #[serde(default)]
    pub new: bool,
    /// Span entry.
    #[serde(default)]
    pub enter: bool,
    /// Span exit.
    #[serde(default)]
    pub exit: bool,
    /// Span close.
    #[serde(default)]
    pub close: bool,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Base level; `RUST_LOG` takes precedence when set.
    #[serde(default)]
    pub level: LogLevel,

    /// Line layout.
    #[serde(default)]
    pub format: LogFormat,

    /// Destination.
    #[serde(default)]
    pub output: LogOutput,

    /// Per-module overrides, e.g. `courier_transport = "debug"`.
    #[serde(default)]
    pub filters: HashMap<String, LogLevel>,

    /// Span lifecycle events.
    #[serde(default)]
    pub span_events: SpanEventConfig,

    /// Include thread ids.
    #[serde(default)]
    pub thread_ids: bool,

    /// Include file and line.
    #[serde(default)]
    pub file_location: bool,

    /// Log file for [`LogOutput::File`].
    #[serde(default)]
    pub file_path: Option<PathBuf>,

    /// Daily log files to keep.
    #[serde(default = "default_max_files")]
    pub max_files: u32,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::default(),
            format: LogFormat::default(),
            output: LogOutput::default(),
            filters: HashMap::new(),
            span_events: SpanEventConfig::default(),
            thread_ids: false,
            file_location: false,
            file_path: None,
            max_files: default_max_files(),
        }
    }
}

fn default_max_files() -> u32 {
    5
}
