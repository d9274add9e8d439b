//! Logging setup built on `tracing-subscriber`.
//!
//! The subscriber is assembled from the `[logging]` section: an [`EnvFilter`]
//! for levels (with `RUST_LOG` taking precedence), and one `fmt` layer whose
//! layout and destination come from [`LogFormat`] and [`LogOutput`].
//!
//! ```rust,ignore
//! use tgbridge_runtime::{config::load_config, logging};
//!
//! let config = load_config()?;
//! logging::init_from_config(&config.logging);
//! ```
//!
//! Tests and tools can build one by hand:
//!
//! ```rust,ignore
//! use tgbridge_runtime::logging::LoggingBuilder;
//! use tgbridge_runtime::config::LogLevel;
//!
//! LoggingBuilder::new()
//!     .level(LogLevel::Debug)
//!     .directive("tgbridge_transport=trace")
//!     .init();
//! ```

use std::path::{Path, PathBuf};

use tracing::warn;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

use crate::config::{LogFormat, LogLevel, LogOutput, LoggingConfig, SpanEventConfig};

const DEFAULT_LOG_FILE: &str = "tgbridge.log";

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Initializes logging from the `[logging]` section.
///
/// Does nothing if a global subscriber is already installed.
pub fn init_from_config(config: &LoggingConfig) {
    LoggingBuilder::from_config(config).init();
}

/// Maps configured span events onto `fmt` span events.
pub fn fmt_span(events: &SpanEventConfig) -> FmtSpan {
    [
        (events.new, FmtSpan::NEW),
        (events.enter, FmtSpan::ENTER),
        (events.exit, FmtSpan::EXIT),
        (events.close, FmtSpan::CLOSE),
    ]
    .into_iter()
    .filter(|(enabled, _)| *enabled)
    .fold(FmtSpan::NONE, |acc, (_, span)| acc | span)
}

/// Builds and installs the global subscriber.
#[derive(Debug, Clone)]
pub struct LoggingBuilder {
    config: LoggingConfig,
    directives: Vec<String>,
    with_target: bool,
}

impl Default for LoggingBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl LoggingBuilder {
    /// Starts from the default `[logging]` section: `info`, compact, stdout.
    pub fn new() -> Self {
        Self {
            config: LoggingConfig::default(),
            directives: Vec::new(),
            with_target: true,
        }
    }

    /// Starts from a loaded `[logging]` section.
    pub fn from_config(config: &LoggingConfig) -> Self {
        Self {
            config: config.clone(),
            ..Self::new()
        }
    }

    /// Sets the base level.
    pub fn level(mut self, level: LogLevel) -> Self {
        self.config.level = level;
        self
    }

    /// Adds a raw filter directive such as `tgbridge_core=trace`.
    pub fn directive(mut self, directive: impl Into<String>) -> Self {
        self.directives.push(directive.into());
        self
    }

    /// Sets which span events are logged.
    pub fn span_events(mut self, events: SpanEventConfig) -> Self {
        self.config.span_events = events;
        self
    }

    /// Sets the line layout.
    pub fn format(mut self, format: LogFormat) -> Self {
        self.config.format = format;
        self
    }

    /// Sets the destination.
    pub fn output(mut self, output: LogOutput) -> Self {
        self.config.output = output;
        self
    }

    /// Sets the log file and switches output to it.
    pub fn file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.output = LogOutput::File;
        self.config.file_path = Some(path.into());
        self
    }

    /// Includes the target (module path). On by default.
    pub fn with_target(mut self, enabled: bool) -> Self {
        self.with_target = enabled;
        self
    }

    /// Includes thread ids.
    pub fn with_thread_ids(mut self, enabled: bool) -> Self {
        self.config.thread_ids = enabled;
        self
    }

    /// Includes the source file and line number.
    pub fn with_file_location(mut self, enabled: bool) -> Self {
        self.config.file_location = enabled;
        self
    }

    /// Returns the filter plus the directives that failed to parse.
    fn filter(&self) -> (EnvFilter, Vec<(String, String)>) {
        let mut filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.config.level.as_str()));
        let mut rejected = Vec::new();

        let per_module = self
            .config
            .filters
            .iter()
            .map(|(module, level)| format!("{module}={level}"));
        for directive in per_module.chain(self.directives.iter().cloned()) {
            match directive.parse() {
                Ok(parsed) => filter = filter.add_directive(parsed),
                Err(e) => rejected.push((directive, e.to_string())),
            }
        }

        (filter, rejected)
    }

    /// Returns the writer, plus a warning when it had to fall back to stdout.
    fn writer(&self) -> (BoxMakeWriter, Option<String>) {
        match self.config.output {
            LogOutput::Stdout => (BoxMakeWriter::new(std::io::stdout), None),
            LogOutput::Stderr => (BoxMakeWriter::new(std::io::stderr), None),
            LogOutput::File => {
                let Some(path) = &self.config.file_path else {
                    return (
                        BoxMakeWriter::new(std::io::stdout),
                        Some("file output requested but no file_path configured".into()),
                    );
                };
                match open_log_file(path) {
                    Ok(appender) => (BoxMakeWriter::new(appender), None),
                    Err(e) => (
                        BoxMakeWriter::new(std::io::stdout),
                        Some(format!("cannot open log file {}: {e}", path.display())),
                    ),
                }
            }
        }
    }

    fn effective_format(&self) -> LogFormat {
        match self.config.format {
            #[cfg(not(feature = "json-log"))]
            LogFormat::Json => LogFormat::Full,
            other => other,
        }
    }

    fn layer(&self, writer: BoxMakeWriter) -> BoxedLayer {
        let base = fmt::layer()
            .with_writer(writer)
            .with_span_events(fmt_span(&self.config.span_events))
            .with_target(self.with_target)
            .with_thread_ids(self.config.thread_ids)
            .with_file(self.config.file_location)
            .with_line_number(self.config.file_location);

        match self.effective_format() {
            LogFormat::Compact => base.compact().boxed(),
            LogFormat::Pretty => base.pretty().boxed(),
            #[cfg(feature = "json-log")]
            LogFormat::Json => base.json().boxed(),
            _ => base.boxed(),
        }
    }

    /// Installs the subscriber, ignoring a second initialization.
    pub fn init(self) {
        let _ = self.try_init();
    }

    /// Installs the subscriber.
    ///
    /// Problems with the configuration itself (bad directives, unwritable
    /// log file, unavailable JSON format) are logged once the subscriber is
    /// up rather than failing.
    ///
    /// # Errors
    ///
    /// Fails if a global subscriber is already installed.
    pub fn try_init(self) -> Result<(), TryInitError> {
        let (filter, rejected) = self.filter();
        let (writer, writer_warning) = self.writer();

        tracing_subscriber::registry()
            .with(self.layer(writer))
            .with(filter)
            .try_init()?;

        for (directive, error) in rejected {
            warn!(directive = %directive, error = %error, "Ignoring invalid log directive");
        }
        if let Some(reason) = writer_warning {
            warn!("{reason}, logging to stdout instead");
        }
        if self.effective_format() != self.config.format {
            warn!(
                "JSON log format requested but the json-log feature is disabled, \
                 using full format"
            );
        }
        Ok(())
    }
}

fn open_log_file(path: &Path) -> Result<RollingFileAppender, tracing_appender::rolling::InitError> {
    let directory = path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(DEFAULT_LOG_FILE);

    RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(file_name)
        .build(directory)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_keeps_config() {
        let mut config = LoggingConfig {
            level: LogLevel::Debug,
            format: LogFormat::Pretty,
            thread_ids: true,
            ..Default::default()
        };
        config
            .filters
            .insert("tgbridge_transport".into(), LogLevel::Trace);

        let builder = LoggingBuilder::from_config(&config).with_file_location(true);
        assert_eq!(builder.config.level, LogLevel::Debug);
        assert_eq!(builder.config.format, LogFormat::Pretty);
        assert!(builder.config.thread_ids);
        assert!(builder.config.file_location);
        assert!(builder.with_target);
    }

    #[test]
    fn test_invalid_directives_are_reported() {
        let mut config = LoggingConfig::default();
        config.filters.insert("tgbridge_core".into(), LogLevel::Warn);

        let builder = LoggingBuilder::from_config(&config)
            .directive("tgbridge_runtime=debug")
            .directive("tgbridge_transport=loud");
        let (_, rejected) = builder.filter();

        assert_eq!(rejected.len(), 1);
        assert_eq!(rejected[0].0, "tgbridge_transport=loud");
    }

    #[test]
    fn test_span_event_mapping() {
        assert_eq!(fmt_span(&SpanEventConfig::default()), FmtSpan::NONE);

        let lifecycle = SpanEventConfig {
            new: true,
            close: true,
            ..Default::default()
        };
        assert_eq!(fmt_span(&lifecycle), FmtSpan::NEW | FmtSpan::CLOSE);

        let all = SpanEventConfig {
            new: true,
            enter: true,
            exit: true,
            close: true,
        };
        assert_eq!(fmt_span(&all), FmtSpan::FULL);
    }

    #[test]
    fn test_file_output_without_path_falls_back() {
        let (_, warning) = LoggingBuilder::new().output(LogOutput::File).writer();
        assert!(warning.is_some_and(|w| w.contains("file_path")));

        let (_, warning) = LoggingBuilder::new().output(LogOutput::Stderr).writer();
        assert!(warning.is_none());
    }

    #[cfg(not(feature = "json-log"))]
    #[test]
    fn test_json_falls_back_without_feature() {
        let builder = LoggingBuilder::new().format(LogFormat::Json);
        assert_eq!(builder.effective_format(), LogFormat::Full);
    }
}
