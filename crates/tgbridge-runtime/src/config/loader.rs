//! Layered configuration loading on top of `figment`.
//!
//! Sources are merged in this order, later ones winning:
//!
//! 1. built-in defaults (`BridgeConfig::default()`)
//! 2. overrides passed to [`ConfigLoader::merge`]
//! 3. profile overlay, e.g. `tgbridge.production.toml`
//! 4. base file, e.g. `tgbridge.toml`
//! 5. environment, e.g. `TGBRIDGE_TELEGRAM__TOKEN=123:abc`
//!
//! Environment keys nest on `__`, so `TGBRIDGE_LOGGING__LEVEL=debug` sets
//! `logging.level`. TOML files need the `toml-config` feature and YAML files
//! need `yaml-config`.
//!
//! ```rust,ignore
//! use tgbridge_runtime::config::ConfigLoader;
//!
//! let config = ConfigLoader::new()
//!     .profile("production")
//!     .search_path("/etc/tgbridge")
//!     .load()?;
//! ```

use std::ffi::OsStr;
use std::fmt;
use std::path::{Path, PathBuf};

use figment::Figment;
#[cfg(any(feature = "yaml-config", feature = "toml-config"))]
use figment::providers::Format;
#[cfg(feature = "toml-config")]
use figment::providers::Toml;
#[cfg(feature = "yaml-config")]
use figment::providers::Yaml;
use figment::providers::{Env, Serialized};
use tracing::{debug, info, trace, warn};

use super::error::{ConfigError, ConfigResult};
use super::schema::BridgeConfig;

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "TGBRIDGE_";

/// Environment variable selecting the profile.
pub const PROFILE_ENV: &str = "TGBRIDGE_PROFILE";

/// File stems tried in every search directory, in order.
const FILE_STEMS: [&str; 2] = ["tgbridge", "config"];

/// Extensions of the enabled formats, in order.
const EXTENSIONS: &[&str] = &[
    #[cfg(feature = "toml-config")]
    "toml",
    #[cfg(feature = "yaml-config")]
    "yaml",
    #[cfg(feature = "yaml-config")]
    "yml",
];

/// Deployment profile; selects `tgbridge.<profile>.<ext>` overlays.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Profile {
    /// `development` or `dev`; the default.
    #[default]
    Development,
    /// `production` or `prod`.
    Production,
    /// Any other name, lowercased.
    Named(String),
}

impl Profile {
    /// Name used in overlay file names.
    pub fn name(&self) -> &str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
            Self::Named(name) => name,
        }
    }

    /// Profile from `TGBRIDGE_PROFILE`, or development when unset.
    pub fn current() -> Self {
        std::env::var(PROFILE_ENV)
            .map(|name| Self::from(name.as_str()))
            .unwrap_or_default()
    }
}

impl From<&str> for Profile {
    fn from(name: &str) -> Self {
        let name = name.trim().to_ascii_lowercase();
        match name.as_str() {
            "dev" | "development" => Self::Development,
            "prod" | "production" => Self::Production,
            _ => Self::Named(name),
        }
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Collects configuration sources and extracts a [`BridgeConfig`].
pub struct ConfigLoader {
    overrides: Figment,
    profile: Profile,
    search_paths: Vec<PathBuf>,
    file: Option<PathBuf>,
    env: bool,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Loader with the profile from the environment and no search paths.
    ///
    /// With no search paths set, the current directory and the user config
    /// directory are searched.
    pub fn new() -> Self {
        Self {
            overrides: Figment::new(),
            profile: Profile::current(),
            search_paths: Vec::new(),
            file: None,
            env: true,
        }
    }

    /// Overrides the profile.
    pub fn profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = Profile::from(profile.into().as_str());
        self
    }

    /// Appends a directory to search for config files.
    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.search_paths.push(path.as_ref().to_path_buf());
        self
    }

    /// Appends the working directory.
    pub fn with_current_dir(mut self) -> Self {
        self.search_paths.extend(std::env::current_dir().ok());
        self
    }

    /// Appends `<user config dir>/tgbridge`.
    pub fn with_user_config_dir(mut self) -> Self {
        self.search_paths.extend(user_config_dir());
        self
    }

    /// Loads exactly this file instead of searching.
    pub fn file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.file = Some(path.as_ref().to_path_buf());
        self
    }

    /// Ignores `TGBRIDGE_*` variables.
    pub fn without_env(mut self) -> Self {
        self.env = false;
        self
    }

    /// Layers settings above the defaults and below any file.
    pub fn merge(mut self, config: BridgeConfig) -> Self {
        self.overrides = self.overrides.merge(Serialized::defaults(config));
        self
    }

    /// Merges every source and extracts the configuration.
    ///
    /// The result is not validated; see
    /// [`validate_config`](super::validate_config).
    ///
    /// # Errors
    ///
    /// Fails when an explicit file is missing or has an unsupported
    /// extension, or when the merged values do not fit the schema.
    pub fn load(self) -> ConfigResult<BridgeConfig> {
        let files = match &self.file {
            Some(path) if !path.exists() => return Err(ConfigError::FileNotFound(path.clone())),
            Some(path) => vec![path.clone()],
            None => self.discover(),
        };
        if files.is_empty() {
            warn!("No configuration file found, using defaults");
        }

        let mut figment =
            Figment::from(Serialized::defaults(BridgeConfig::default())).merge(self.overrides);
        for path in &files {
            info!(path = %path.display(), "Merging configuration file");
            figment = merge_file(figment, path)?;
        }
        if self.env {
            figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));
        }

        let config: BridgeConfig = figment.extract()?;
        debug!(
            profile = %self.profile,
            enabled = config.telegram.enable,
            level = %config.logging.level,
            "Configuration loaded"
        );
        Ok(config)
    }

    /// Finds the first base file, preceded by its profile overlay if present.
    fn discover(&self) -> Vec<PathBuf> {
        let dirs: Vec<PathBuf> = if self.search_paths.is_empty() {
            std::env::current_dir()
                .ok()
                .into_iter()
                .chain(user_config_dir())
                .collect()
        } else {
            self.search_paths.clone()
        };

        for dir in &dirs {
            for stem in FILE_STEMS {
                for ext in EXTENSIONS {
                    let base = dir.join(format!("{stem}.{ext}"));
                    if !base.is_file() {
                        continue;
                    }
                    let overlay = dir.join(format!("{stem}.{}.{ext}", self.profile));
                    return if overlay.is_file() {
                        debug!(path = %overlay.display(), "Found profile overlay");
                        vec![overlay, base]
                    } else {
                        vec![base]
                    };
                }
            }
        }

        trace!(dirs = ?dirs, extensions = ?EXTENSIONS, "Nothing to load in search paths");
        Vec::new()
    }
}

fn user_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("tgbridge"))
}

#[cfg_attr(
    not(any(feature = "toml-config", feature = "yaml-config")),
    allow(unused_variables)
)]
fn merge_file(figment: Figment, path: &Path) -> ConfigResult<Figment> {
    match path.extension().and_then(OsStr::to_str).unwrap_or_default() {
        #[cfg(feature = "toml-config")]
        "toml" => Ok(figment.merge(Toml::file(path))),
        #[cfg(feature = "yaml-config")]
        "yaml" | "yml" => Ok(figment.merge(Yaml::file(path))),
        other => Err(ConfigError::UnsupportedFormat(other.to_string())),
    }
}

/// Loads from the working and user config directories plus the environment.
pub fn load_config() -> ConfigResult<BridgeConfig> {
    ConfigLoader::new().load()
}

/// Loads one file plus the environment.
pub fn load_config_from_file<P: AsRef<Path>>(path: P) -> ConfigResult<BridgeConfig> {
    ConfigLoader::new().file(path).load()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{LogLevel, TelegramConfig};

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("tgbridge-{name}-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_defaults_without_files() {
        let dir = scratch_dir("empty");
        let config = ConfigLoader::new()
            .without_env()
            .search_path(&dir)
            .load()
            .unwrap();

        assert_eq!(config.logging.level, LogLevel::Info);
        assert_eq!(config.telegram, TelegramConfig::default());
    }

    #[test]
    fn test_overrides_apply_over_defaults() {
        let mut overrides = BridgeConfig::default();
        overrides.telegram.token = "1:abc".into();
        overrides.logging.level = LogLevel::Warn;

        let config = ConfigLoader::new()
            .without_env()
            .search_path(scratch_dir("empty"))
            .merge(overrides)
            .load()
            .unwrap();

        assert_eq!(config.telegram.token, "1:abc");
        assert_eq!(config.logging.level, LogLevel::Warn);
    }

    #[test]
    fn test_explicit_file_errors() {
        let dir = scratch_dir("explicit");
        let missing = ConfigLoader::new()
            .without_env()
            .file(dir.join("absent.toml"))
            .load();
        assert!(matches!(missing, Err(ConfigError::FileNotFound(_))));

        let ini = dir.join("tgbridge.ini");
        std::fs::write(&ini, "token=1").unwrap();
        let unsupported = ConfigLoader::new().without_env().file(&ini).load();
        assert!(matches!(unsupported, Err(ConfigError::UnsupportedFormat(ext)) if ext == "ini"));

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_profile_names() {
        assert_eq!(Profile::from("prod"), Profile::Production);
        assert_eq!(Profile::from(" DEV "), Profile::Development);
        assert_eq!(Profile::from("Staging"), Profile::Named("staging".into()));
        assert_eq!(Profile::Production.to_string(), "production");
    }

    #[cfg(feature = "toml-config")]
    #[test]
    fn test_base_file_wins_over_profile_overlay() {
        let dir = scratch_dir("overlay");
        std::fs::write(
            dir.join("tgbridge.toml"),
            "[telegram]\ntoken = \"9:base\"\nacl = [1]\n",
        )
        .unwrap();
        std::fs::write(
            dir.join("tgbridge.staging.toml"),
            "[telegram]\ntoken = \"9:staging\"\necho_bot = true\n",
        )
        .unwrap();

        let config = ConfigLoader::new()
            .without_env()
            .profile("staging")
            .search_path(&dir)
            .load()
            .unwrap();

        assert_eq!(config.telegram.token, "9:base");
        assert_eq!(config.telegram.acl, vec![1]);
        assert!(config.telegram.echo_bot);

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
