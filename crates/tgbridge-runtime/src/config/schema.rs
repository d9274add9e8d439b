//! Configuration schema definitions.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tgbridge_transport::{DEFAULT_SERVER, HttpTransportConfig};

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Telegram bot settings.
    #[serde(default)]
    pub telegram: TelegramConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

// =============================================================================
// Telegram
// =============================================================================

/// Telegram bot settings.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct TelegramConfig {
    /// Whether the bot runs at all.
    #[serde(default = "default_true")]
    pub enable: bool,

    /// Bot API server.
    #[serde(default = "default_server")]
    pub server: String,

    /// Bot token. Required when `enable` is set.
    #[serde(default)]
    pub token: String,

    /// Long-poll timeout for `getUpdates`, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Chats allowed to talk to the bot. Updates from other chats are
    /// ignored; an empty list ignores everything.
    #[serde(default)]
    pub acl: Vec<i64>,

    /// Reply to every message with its own text instead of dispatching it.
    #[serde(default)]
    pub echo_bot: bool,

    /// Capacity of the inbound event queue.
    #[serde(default = "default_queue_len")]
    pub rx_queue_len: usize,

    /// Capacity of the outbound call queue.
    #[serde(default = "default_queue_len")]
    pub tx_queue_len: usize,

    /// Pause between failed handshakes, in milliseconds.
    #[serde(default = "default_handshake_retry_ms")]
    pub handshake_retry_ms: u64,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            enable: true,
            server: default_server(),
            token: String::new(),
            timeout_secs: default_timeout_secs(),
            acl: Vec::new(),
            echo_bot: false,
            rx_queue_len: default_queue_len(),
            tx_queue_len: default_queue_len(),
            handshake_retry_ms: default_handshake_retry_ms(),
        }
    }
}

impl TelegramConfig {
    /// Returns the long-poll timeout.
    pub fn poll_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Returns the handshake retry pause.
    pub fn handshake_retry(&self) -> Duration {
        Duration::from_millis(self.handshake_retry_ms)
    }

    /// Builds the transport settings.
    pub fn to_transport_config(&self) -> HttpTransportConfig {
        HttpTransportConfig::new(self.token.clone())
            .server(self.server.clone())
            .poll_timeout(self.poll_timeout())
            .tx_queue_len(self.tx_queue_len)
            .handshake_retry(self.handshake_retry())
    }
}

impl fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("enable", &self.enable)
            .field("server", &self.server)
            .field("token", &"<redacted>")
            .field("timeout_secs", &self.timeout_secs)
            .field("acl", &self.acl)
            .field("echo_bot", &self.echo_bot)
            .field("rx_queue_len", &self.rx_queue_len)
            .field("tx_queue_len", &self.tx_queue_len)
            .field("handshake_retry_ms", &self.handshake_retry_ms)
            .finish()
    }
}

fn default_true() -> bool {
    true
}

fn default_server() -> String {
    DEFAULT_SERVER.to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_queue_len() -> usize {
    5
}

fn default_handshake_retry_ms() -> u64 {
    5000
}

// =============================================================================
// Logging
// =============================================================================

/// Log verbosity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Everything.
    Trace,
    /// Internal steps.
    Debug,
    /// Received and sent messages.
    #[default]
    Info,
    /// Dropped records and failed handlers.
    Warn,
    /// Errors only.
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

    /// Converts to a `tracing` level.
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
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Single-line, abbreviated.
    #[default]
    Compact,
    /// Single-line with all fields.
    Full,
    /// Multi-line, human oriented.
    Pretty,
    /// JSON lines. Needs the `json-log` feature.
    Json,
}

/// Where log lines go.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    /// Standard output.
    #[default]
    Stdout,
    /// Standard error.
    Stderr,
    /// The file at `file_path`.
    File,
}

/// Which span lifecycle events are logged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpanEventConfig {
    /// Span created.
    #[serde(default)]
    pub new: bool,
    /// Span entered.
    #[serde(default)]
    pub enter: bool,
    /// Span exited.
    #[serde(default)]
    pub exit: bool,
    /// Span closed.
    #[serde(default)]
    pub close: bool,
}

/// Logging settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Base level.
    #[serde(default)]
    pub level: LogLevel,

    /// Line layout.
    #[serde(default)]
    pub format: LogFormat,

    /// Destination.
    #[serde(default)]
    pub output: LogOutput,

    /// Log file, used when `output = "file"`.
    #[serde(default)]
    pub file_path: Option<PathBuf>,

    /// Per-module levels, e.g. `tgbridge_transport = "debug"`.
    #[serde(default)]
    pub filters: BTreeMap<String, LogLevel>,

    /// Span lifecycle events.
    #[serde(default)]
    pub span_events: SpanEventConfig,

    /// Include thread ids.
    #[serde(default)]
    pub thread_ids: bool,

    /// Include source file and line.
    #[serde(default)]
    pub file_location: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_follow_bot_api() {
        let config = BridgeConfig::default();
        assert!(config.telegram.enable);
        assert_eq!(config.telegram.server, "https://api.telegram.org");
        assert_eq!(config.telegram.timeout_secs, 60);
        assert_eq!(config.telegram.rx_queue_len, 5);
        assert_eq!(config.telegram.tx_queue_len, 5);
        assert!(config.telegram.acl.is_empty());
        assert_eq!(config.logging.level, LogLevel::Info);
    }

    #[test]
    fn test_transport_config_mapping() {
        let telegram = TelegramConfig {
            token: "1:abc".into(),
            timeout_secs: 30,
            tx_queue_len: 9,
            handshake_retry_ms: 250,
            ..Default::default()
        };
        let transport = telegram.to_transport_config();
        assert_eq!(transport.token, "1:abc");
        assert_eq!(transport.poll_timeout, Duration::from_secs(30));
        assert_eq!(transport.tx_queue_len, 9);
        assert_eq!(transport.handshake_retry, Duration::from_millis(250));
    }

    #[test]
    fn test_debug_hides_token() {
        let telegram = TelegramConfig {
            token: "1:TOPSECRET".into(),
            ..Default::default()
        };
        assert!(!format!("{telegram:?}").contains("TOPSECRET"));
    }

    #[cfg(feature = "toml-config")]
    #[test]
    fn test_toml_snippet() {
        use figment::Figment;
        use figment::providers::{Format, Serialized, Toml};

        let config: BridgeConfig = Figment::from(Serialized::defaults(BridgeConfig::default()))
            .merge(Toml::string(
                r#"
                [telegram]
                token = "1:abc"
                acl = [42, -100]
                echo_bot = true

                [logging]
                level = "debug"
                format = "pretty"

                [logging.filters]
                tgbridge_transport = "trace"
                "#,
            ))
            .extract()
            .unwrap();

        assert_eq!(config.telegram.token, "1:abc");
        assert_eq!(config.telegram.acl, vec![42, -100]);
        assert!(config.telegram.echo_bot);
        assert_eq!(config.telegram.timeout_secs, 60);
        assert_eq!(config.logging.level, LogLevel::Debug);
        assert_eq!(config.logging.format, LogFormat::Pretty);
        assert_eq!(
            config.logging.filters.get("tgbridge_transport"),
            Some(&LogLevel::Trace)
        );
    }

    #[cfg(feature = "yaml-config")]
    #[test]
    fn test_yaml_snippet() {
        use figment::Figment;
        use figment::providers::{Format, Serialized, Yaml};

        let config: BridgeConfig = Figment::from(Serialized::defaults(BridgeConfig::default()))
            .merge(Yaml::string(
                "telegram:\n  enable: false\n  rx_queue_len: 2\nlogging:\n  output: stderr\n",
            ))
            .extract()
            .unwrap();

        assert!(!config.telegram.enable);
        assert_eq!(config.telegram.rx_queue_len, 2);
        assert_eq!(config.logging.output, LogOutput::Stderr);
    }
}
