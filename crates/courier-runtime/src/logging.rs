//! Logging utilities for the Courier runtime.
//!
//! A unified setup built on `tracing` and `tracing-subscriber`, driven by
//! [`LoggingConfig`] or configured by hand.
//!
//! # Configuration-Based Initialization
//!
//! ```rust,ignore
//! use courier_runtime::config::load_config;
//! use courier_runtime::logging;
//!
//! let config = load_config()?;
//! logging::init_from_config(&config.logging);
//! ```
//!
//! # Manual Initialization
//!
//! ```rust,ignore
//! use courier_runtime::logging::{LoggingBuilder, SpanEvents};
//!
//! LoggingBuilder::new()
//!     .directive("courier_transport=debug")
//!     .span_events(SpanEvents::LIFECYCLE)
//!     .init();
//! ```
//!
//! The bot token never reaches these layers: `Token` is redacted in `Debug`
//! and `Display`, and outbound URLs are masked before they are logged.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use tracing::warn;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

use crate::config::{LogFormat, LogOutput, LoggingConfig, SpanEventConfig};

/// Span lifecycle events to log.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpanEvents {
    /// Log when a span is created.
    pub new: bool,
    /// Log when a span is entered.
    pub enter: bool,
    /// Log when a span is exited.
    pub exit: bool,
    /// Log when a span is closed.
    pub close: bool,
}

impl SpanEvents {
    /// No span events.
    pub const NONE: Self = Self {
        new: false,
        enter: false,
        exit: false,
        close: false,
    };

    /// Creation and close only.
    pub const LIFECYCLE: Self = Self {
        new: true,
        enter: false,
        exit: false,
        close: true,
    };

    /// Every span event.
    pub const FULL: Self = Self {
        new: true,
        enter: true,
        exit: true,
        close: true,
    };

    fn to_fmt_span(self) -> fmt::format::FmtSpan {
        let mut span = fmt::format::FmtSpan::NONE;
        if self.new {
            span |= fmt::format::FmtSpan::NEW;
        }
        if self.enter {
            span |= fmt::format::FmtSpan::ENTER;
        }
        if self.exit {
            span |= fmt::format::FmtSpan::EXIT;
        }
        if self.close {
            span |= fmt::format::FmtSpan::CLOSE;
        }
        span
    }
}

impl From<&SpanEventConfig> for SpanEvents {
    fn from(config: &SpanEventConfig) -> Self {
        Self {
            new: config.new,
            enter: config.enter,
            exit: config.exit,
            close: config.close,
        }
    }
}

/// Initializes logging from a [`LoggingConfig`].
///
/// Calling it again after a subscriber is installed is a no-op.
pub fn init_from_config(config: &LoggingConfig) {
    let _ = LoggingBuilder::from_config(config).try_init();
}

/// A builder for configuring logging.
#[derive(Debug)]
pub struct LoggingBuilder {
    directives: Vec<String>,
    level: tracing::Level,
    span_events: SpanEvents,
    format: LogFormat,
    output: LogOutput,
    with_target: bool,
    with_thread_ids: bool,
    with_file: bool,
    with_line_number: bool,
    file_path: Option<PathBuf>,
    max_files: usize,
}

impl Default for LoggingBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl LoggingBuilder {
    /// Creates a builder logging `info` and above to stdout.
    pub fn new() -> Self {
        Self {
            directives: Vec::new(),
            level: tracing::Level::INFO,
            span_events: SpanEvents::NONE,
            format: LogFormat::Compact,
            output: LogOutput::Stdout,
            with_target: true,
            with_thread_ids: false,
            with_file: false,
            with_line_number: false,
            file_path: None,
            max_files: 5,
        }
    }

    /// Creates a builder from a [`LoggingConfig`].
    pub fn from_config(config: &LoggingConfig) -> Self {
        let mut builder = Self::new()
            .with_level(config.level.to_tracing_level())
            .format(config.format)
            .output(config.output)
            .span_events(SpanEvents::from(&config.span_events))
            .with_thread_ids(config.thread_ids)
            .with_file(config.file_location)
            .with_line_number(config.file_location)
            .max_files(config.max_files as usize);

        builder.file_path.clone_from(&config.file_path);

        for (module, level) in &config.filters {
            builder = builder.directive(&format!("{module}={level}"));
        }

        builder
    }

    /// Sets the base log level.
    pub fn with_level(mut self, level: tracing::Level) -> Self {
        self.level = level;
        self
    }

    /// Adds a filter directive such as `courier_runtime=debug`.
    pub fn directive(mut self, directive: &str) -> Self {
        self.directives.push(directive.to_string());
        self
    }

    /// Sets which span events are logged.
    pub fn span_events(mut self, events: SpanEvents) -> Self {
        self.span_events = events;
        self
    }

    /// Sets the output format.
    pub fn format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Sets the output destination.
    pub fn output(mut self, output: LogOutput) -> Self {
        self.output = output;
        self
    }

    /// Includes the target (module path).
    pub fn with_target(mut self, enabled: bool) -> Self {
        self.with_target = enabled;
        self
    }

    /// Includes thread ids.
    pub fn with_thread_ids(mut self, enabled: bool) -> Self {
        self.with_thread_ids = enabled;
        self
    }

    /// Includes file names.
    pub fn with_file(mut self, enabled: bool) -> Self {
        self.with_file = enabled;
        self
    }

    /// Includes line numbers.
    pub fn with_line_number(mut self, enabled: bool) -> Self {
        self.with_line_number = enabled;
        self
    }

    /// Sets the log file for [`LogOutput::File`].
    pub fn file_path(mut self, path: PathBuf) -> Self {
        self.file_path = Some(path);
        self
    }

    /// Sets how many daily log files are kept. `0` keeps all of them.
    pub fn max_files(mut self, count: usize) -> Self {
        self.max_files = count;
        self
    }

    /// `RUST_LOG` wins over the configured level; directives are added on top.
    fn build_filter(&self) -> EnvFilter {
        let base = self.level.to_string().to_lowercase();
        let mut filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&base));

        for directive in &self.directives {
            if let Ok(d) = directive.parse() {
                filter = filter.add_directive(d);
            }
        }

        filter
    }

    fn build_writer(&self) -> BoxMakeWriter {
        match self.output {
            LogOutput::Stdout => BoxMakeWriter::new(std::io::stdout),
            LogOutput::Stderr => BoxMakeWriter::new(std::io::stderr),
            LogOutput::File => {
                let Some(path) = &self.file_path else {
                    warn!(
                        "File output requested but no file path configured, falling back to stdout"
                    );
                    return BoxMakeWriter::new(std::io::stdout);
                };

                let dir = path.parent().unwrap_or_else(|| Path::new("."));
                let prefix = path
                    .file_name()
                    .unwrap_or_else(|| OsStr::new("courier.log"))
                    .to_string_lossy()
                    .into_owned();

                let mut appender = RollingFileAppender::builder()
                    .rotation(Rotation::DAILY)
                    .filename_prefix(prefix);
                if self.max_files > 0 {
                    appender = appender.max_log_files(self.max_files);
                }

                match appender.build(dir) {
                    Ok(appender) => BoxMakeWriter::new(appender),
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "Cannot open log file, falling back to stdout");
                        BoxMakeWriter::new(std::io::stdout)
                    }
                }
            }
        }
    }

    fn build_layer(&self) -> Box<dyn Layer<Registry> + Send + Sync> {
        let writer = self.build_writer();
        let span_events = self.span_events.to_fmt_span();

        let layer = fmt::layer()
            .with_span_events(span_events)
            .with_target(self.with_target)
            .with_thread_ids(self.with_thread_ids)
            .with_file(self.with_file)
            .with_line_number(self.with_line_number)
            .with_writer(writer);

        match self.format {
            LogFormat::Compact => layer.compact().boxed(),
            LogFormat::Full => layer.boxed(),
            LogFormat::Pretty => layer.pretty().boxed(),
            #[cfg(feature = "json-log")]
            LogFormat::Json => layer.json().boxed(),
        }
    }

    /// Installs the subscriber, ignoring failure.
    pub fn init(self) {
        let _ = self.try_init();
    }

    /// Installs the subscriber.
    ///
    /// # Errors
    /// Fails if a global subscriber is already set.
    pub fn try_init(self) -> Result<(), TryInitError> {
        let filter = self.build_filter();
        tracing_subscriber::registry()
            .with(self.build_layer())
            .with(filter)
            .try_init()
    }
}
