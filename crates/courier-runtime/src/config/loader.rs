//! Configuration loader using figment.
//!
//! # Feature Flags
//!
//! - `toml-config` *(default)*: enables TOML configuration files (`courier.toml`, `config.toml`)
//! - `yaml-config`: enables YAML configuration files (`courier.yaml`, `courier.yml`, etc.)
//!
//! # Configuration Priority (lowest to highest)
//!
//! 1. Built-in defaults
//! 2. Profile-specific config file (`courier.{profile}.toml`)
//! 3. Main config file (`courier.toml` / `config.toml`)
//! 4. Environment variables (`COURIER_*`)
//! 5. Programmatic overrides ([`ConfigLoader::merge`])
//!
//! # Environment Variable Mapping
//!
//! Environment variables use the `COURIER_` prefix with `__` as separator:
//!
//! - `COURIER_TRANSPORT=polling` → `transport = "polling"`
//! - `COURIER_WEBHOOK__PORT=9001` → `webhook.port = 9001`
//! - `COURIER_LOGGING__LEVEL=debug` → `logging.level = "debug"`
//!
//! `COURIER_TOKEN` is not a configuration key; the demo reads it directly.
//!
//! # Example
//!
//! ```rust,ignore
//! use courier_runtime::config::ConfigLoader;
//!
//! let config = ConfigLoader::new()
//!     .file("./courier.toml")
//!     .load()?;
//! ```

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
use super::schema::CourierConfig;

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "COURIER_";

/// Keys under [`ENV_PREFIX`] that are not configuration.
const RESERVED_ENV_KEYS: [&str; 2] = ["TOKEN", "PROFILE"];

/// Configuration profile for environment-specific settings.
#[derive(Debug, Clone, Default)]
pub enum Profile {
    /// Development profile (default).
    #[default]
    Development,
    /// Production profile.
    Production,
    /// Custom profile name.
    Custom(String),
}

impl Profile {
    /// Returns the profile name as a string.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
            Self::Custom(name) => name,
        }
    }

    /// Parses a profile name.
    pub fn parse(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            "development" | "dev" => Self::Development,
            other => Self::Custom(other.to_string()),
        }
    }

    /// Reads `COURIER_PROFILE`, defaulting to Development.
    pub fn from_env() -> Self {
        std::env::var("COURIER_PROFILE")
            .map(|p| Self::parse(&p))
            .unwrap_or_default()
    }
}

impl std::fmt::Display for Profile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Configuration loader with figment-based multi-source support.
pub struct ConfigLoader {
    overrides: Vec<CourierConfig>,
    profile: Profile,
    search_paths: Vec<PathBuf>,
    load_env: bool,
    config_file: Option<PathBuf>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Creates a new configuration loader with defaults.
    pub fn new() -> Self {
        Self {
            overrides: Vec::new(),
            profile: Profile::from_env(),
            search_paths: Vec::new(),
            load_env: true,
            config_file: None,
        }
    }

    /// Sets the configuration profile.
    pub fn profile(mut self, profile: impl AsRef<str>) -> Self {
        self.profile = Profile::parse(profile.as_ref());
        self
    }

    /// Adds a search path for configuration files.
    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.search_paths.push(path.as_ref().to_path_buf());
        self
    }

    /// Sets a specific configuration file to load.
    pub fn file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_file = Some(path.as_ref().to_path_buf());
        self
    }

    /// Enables loading environment variables (default: true).
    pub fn with_env(mut self) -> Self {
        self.load_env = true;
        self
    }

    /// Disables loading environment variables.
    pub fn without_env(mut self) -> Self {
        self.load_env = false;
        self
    }

    /// Merges additional configuration programmatically. Overrides win over
    /// every other source; later calls win over earlier ones.
    pub fn merge(mut self, config: CourierConfig) -> Self {
        self.overrides.push(config);
        self
    }

    /// Loads and returns the configuration.
    pub fn load(self) -> ConfigResult<CourierConfig> {
        let profile = self.profile.clone();
        let figment = self.build_figment()?;

        let config: CourierConfig = figment.extract()?;

        debug!(
            profile = %profile,
            transport = %config.transport,
            logging_level = %config.logging.level,
            "Configuration loaded successfully"
        );

        Ok(config)
    }

    fn build_figment(mut self) -> ConfigResult<Figment> {
        let mut figment = Figment::from(Serialized::defaults(CourierConfig::default()));

        if let Some(path) = self.config_file.take() {
            if !path.exists() {
                return Err(ConfigError::FileNotFound(path));
            }
            info!(path = %path.display(), "Loading configuration file");
            figment = Self::merge_config_file(figment, &path)?;
        } else {
            figment = self.load_config_files(figment);
        }

        if self.load_env {
            trace!("Loading environment variables with {ENV_PREFIX} prefix");
            figment = figment.merge(
                Env::prefixed(ENV_PREFIX)
                    .ignore(&RESERVED_ENV_KEYS)
                    .split("__"),
            );
        }

        for config in self.overrides.drain(..) {
            figment = figment.merge(Serialized::defaults(config));
        }

        Ok(figment)
    }

    /// Merges a single config file into the figment, dispatching on file extension.
    fn merge_config_file(figment: Figment, path: &Path) -> ConfigResult<Figment> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        match ext {
            #[cfg(feature = "toml-config")]
            "toml" => Ok(figment.merge(Toml::file(path))),
            #[cfg(feature = "yaml-config")]
            "yaml" | "yml" => Ok(figment.merge(Yaml::file(path))),
            _ => Err(ConfigError::ParseError(format!(
                "Unsupported or disabled configuration file format: .{ext}"
            ))),
        }
    }

    fn resolve_search_paths(&self) -> Vec<PathBuf> {
        if !self.search_paths.is_empty() {
            return self.search_paths.clone();
        }

        let mut paths = Vec::new();
        if let Ok(cwd) = std::env::current_dir() {
            paths.push(cwd);
        }
        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("courier"));
        }
        paths
    }

    /// Tries `search_paths × base_names`, merging a profile-specific variant
    /// before each base file. Stops at the first base file found.
    #[cfg(any(feature = "toml-config", feature = "yaml-config"))]
    fn load_format_files<F>(
        &self,
        mut figment: Figment,
        search_paths: &[PathBuf],
        base_names: &[&str],
        merge_fn: F,
    ) -> (Figment, bool)
    where
        F: Fn(Figment, &Path) -> Figment,
    {
        for search_path in search_paths {
            for base_name in base_names {
                let Some((stem, ext)) = base_name.rsplit_once('.') else {
                    continue;
                };

                let profile_path =
                    search_path.join(format!("{stem}.{}.{ext}", self.profile.as_str()));
                if profile_path.exists() {
                    debug!(path = %profile_path.display(), "Loading profile-specific config");
                    figment = merge_fn(figment, &profile_path);
                }

                let base_path = search_path.join(base_name);
                if base_path.exists() {
                    info!(path = %base_path.display(), "Loading configuration file");
                    figment = merge_fn(figment, &base_path);
                    return (figment, true);
                }
            }
        }
        (figment, false)
    }

    #[allow(unused_mut)]
    fn load_config_files(&self, mut figment: Figment) -> Figment {
        let search_paths = self.resolve_search_paths();
        let mut found = false;

        #[cfg(feature = "toml-config")]
        {
            let (f, ok) = self.load_format_files(
                figment,
                &search_paths,
                &["courier.toml", "config.toml"],
                |fig, path| fig.merge(Toml::file(path)),
            );
            figment = f;
            found |= ok;
        }

        #[cfg(feature = "yaml-config")]
        {
            let (f, ok) = self.load_format_files(
                figment,
                &search_paths,
                &["courier.yaml", "courier.yml", "config.yaml", "config.yml"],
                |fig, path| fig.merge(Yaml::file(path)),
            );
            figment = f;
            found |= ok;
        }

        if !found {
            warn!(paths = ?search_paths, "No configuration file found, using defaults");
        }
        figment
    }
}

/// Loads configuration from the default locations.
pub fn load_config() -> ConfigResult<CourierConfig> {
    ConfigLoader::new().load()
}

/// Loads configuration from `path`, with environment overrides.
pub fn load_config_from_file(path: impl AsRef<Path>) -> ConfigResult<CourierConfig> {
    ConfigLoader::new().file(path).load()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TransportMode;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("courier-{name}-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_default_config() {
        let dir = scratch_dir("empty");
        let config = ConfigLoader::new()
            .search_path(&dir)
            .without_env()
            .load()
            .unwrap();

        assert_eq!(config.logging.level.as_str(), "info");
        assert_eq!(config.transport, TransportMode::Webhook);
        assert_eq!(config.api.base_url, "https://api.telegram.org/bot");
        assert_eq!(config.webhook.port, 3000);
        assert_eq!(config.polling.timeout_secs, 60);
    }

    #[test]
    fn test_missing_file_is_error() {
        let result = ConfigLoader::new()
            .file("/definitely/not/here/courier.toml")
            .without_env()
            .load();
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[cfg(feature = "toml-config")]
    #[test]
    fn test_file_and_profile_layers() {
        let dir = scratch_dir("layers");
        std::fs::write(
            dir.join("courier.toml"),
            "transport = \"polling\"\n[polling]\ninterval_ms = 250\n",
        )
        .unwrap();
        std::fs::write(
            dir.join("courier.staging.toml"),
            "[webhook]\nport = 9001\n[polling]\ninterval_ms = 5\n",
        )
        .unwrap();

        let config = ConfigLoader::new()
            .profile("staging")
            .search_path(&dir)
            .without_env()
            .load()
            .unwrap();

        assert_eq!(config.transport, TransportMode::Polling);
        assert_eq!(config.webhook.port, 9001);
        // The main file is merged after the profile file.
        assert_eq!(config.polling.interval_ms, 250);
    }

    #[test]
    fn test_merge_overrides_defaults() {
        let dir = scratch_dir("merge");
        let mut base = CourierConfig::default();
        base.webhook.public_url = Some("https://bot.example.org".into());

        let config = ConfigLoader::new()
            .search_path(&dir)
            .without_env()
            .merge(base)
            .load()
            .unwrap();
        assert_eq!(
            config.webhook.public_url.as_deref(),
            Some("https://bot.example.org")
        );
    }

    #[cfg(feature = "toml-config")]
    #[test]
    fn test_merge_wins_over_file() {
        let dir = scratch_dir("merge-file");
        std::fs::write(dir.join("courier.toml"), "[webhook]\nport = 9001\n").unwrap();

        let mut overrides = CourierConfig::default();
        overrides.webhook.port = 4242;

        let config = ConfigLoader::new()
            .search_path(&dir)
            .without_env()
            .merge(overrides)
            .load()
            .unwrap();
        assert_eq!(config.webhook.port, 4242);
    }

    #[test]
    fn test_profile_parse() {
        assert!(matches!(Profile::parse("prod"), Profile::Production));
        assert!(matches!(Profile::parse("Dev"), Profile::Development));
        assert_eq!(Profile::parse("staging").as_str(), "staging");
    }
}
