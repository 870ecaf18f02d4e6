//! Configuration management.
//!
//! Configuration comes from an optional TOML file, then environment
//! variables (a `.env` file is honored by the binary):
//!
//! | Variable | Overrides |
//! |----------|-----------|
//! | `FOLIO_STORE_URL` | `store.url` |
//! | `FOLIO_STORE_AUTH` | `store.auth_token` |
//! | `FOLIO_LEGACY_DIR` | `legacy.dir` |
//! | `FOLIO_GEO_ENDPOINT` | `geolocation.endpoint` |
//! | `FOLIO_LOG_FORMAT` | `logging.format` |
//! | `FOLIO_LOG_FILTER` | `logging.filter` |

use secrecy::SecretString;
use serde::Deserialize;
use std::path::PathBuf;

/// Default portfolio subtree.
pub const DEFAULT_PORTFOLIO_PATH: &str = "portfolio_items";
/// Default work experience subtree.
pub const DEFAULT_EXPERIENCE_PATH: &str = "work_experiences";
/// Default profile path.
pub const DEFAULT_PROFILE_PATH: &str = "profile";
/// Default visit counter path.
pub const DEFAULT_VISIT_COUNTER_PATH: &str = "analytics/total_visitors";
/// Default visit log subtree.
pub const DEFAULT_VISIT_LOG_PATH: &str = "analytics/visit_logs";
/// Default geolocation endpoint.
pub const DEFAULT_GEO_ENDPOINT: &str = "https://ipapi.co/json/";

/// Main configuration for folio.
#[derive(Debug, Clone, Default)]
pub struct FolioConfig {
    /// Remote store connection.
    pub store: StoreConfig,
    /// Store paths for each collection.
    pub paths: PathsConfig,
    /// Legacy local store.
    pub legacy: LegacyConfig,
    /// Geolocation lookup.
    pub geolocation: GeolocationConfig,
    /// Logging settings.
    pub logging: LoggingSettings,
}

/// Remote store connection settings.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Base URL of the store (e.g. `https://my-site-default-rtdb.firebaseio.com`).
    pub url: Option<String>,
    /// Auth token appended to every request.
    pub auth_token: Option<SecretString>,
    /// Transport timeout per request, in seconds.
    pub timeout_secs: u64,
    /// Attempts before a conflicting transaction gives up.
    pub max_transaction_attempts: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: None,
            auth_token: None,
            timeout_secs: 30,
            max_transaction_attempts: 25,
        }
    }
}

/// Paths of the collections inside the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathsConfig {
    /// Portfolio items subtree.
    pub portfolio: String,
    /// Work experiences subtree.
    pub experience: String,
    /// Profile singleton.
    pub profile: String,
    /// Aggregate visit counter.
    pub visit_counter: String,
    /// Append-only visit log.
    pub visit_logs: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            portfolio: DEFAULT_PORTFOLIO_PATH.to_string(),
            experience: DEFAULT_EXPERIENCE_PATH.to_string(),
            profile: DEFAULT_PROFILE_PATH.to_string(),
            visit_counter: DEFAULT_VISIT_COUNTER_PATH.to_string(),
            visit_logs: DEFAULT_VISIT_LOG_PATH.to_string(),
        }
    }
}

/// Legacy local store settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyConfig {
    /// Directory of the file-backed local store.
    pub dir: PathBuf,
    /// Key holding legacy portfolio items.
    pub portfolio_key: String,
}

impl Default for LegacyConfig {
    fn default() -> Self {
        Self {
            dir: crate::storage::FileLocalStore::default_path()
                .unwrap_or_else(|| PathBuf::from(".folio/legacy")),
            portfolio_key: DEFAULT_PORTFOLIO_PATH.to_string(),
        }
    }
}

/// Geolocation lookup settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeolocationConfig {
    /// Lookup endpoint returning the caller's location as JSON.
    pub endpoint: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for GeolocationConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_GEO_ENDPOINT.to_string(),
            timeout_secs: 10,
        }
    }
}

/// Logging settings as written in the config file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct LoggingSettings {
    /// Output format: "pretty" or "json".
    pub format: Option<String>,
    /// `EnvFilter` directives, e.g. `folio_sync=debug`.
    pub filter: Option<String>,
    /// Optional log file (appended to).
    pub file: Option<PathBuf>,
}

/// Configuration file structure (for TOML parsing).
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFile {
    /// Store section.
    pub store: Option<ConfigFileStore>,
    /// Paths section.
    pub paths: Option<ConfigFilePaths>,
    /// Legacy section.
    pub legacy: Option<ConfigFileLegacy>,
    /// Geolocation section.
    pub geolocation: Option<ConfigFileGeolocation>,
    /// Logging section.
    pub logging: Option<LoggingSettings>,
}

/// Store section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileStore {
    /// Base URL.
    pub url: Option<String>,
    /// Auth token.
    pub auth_token: Option<String>,
    /// Request timeout in seconds.
    pub timeout_secs: Option<u64>,
    /// Transaction attempts.
    pub max_transaction_attempts: Option<u32>,
}

/// Paths section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFilePaths {
    /// Portfolio subtree.
    pub portfolio: Option<String>,
    /// Experience subtree.
    pub experience: Option<String>,
    /// Profile path.
    pub profile: Option<String>,
    /// Visit counter path.
    pub visit_counter: Option<String>,
    /// Visit log subtree.
    pub visit_logs: Option<String>,
}

/// Legacy section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileLegacy {
    /// Local store directory.
    pub dir: Option<String>,
    /// Portfolio key.
    pub portfolio_key: Option<String>,
}

/// Geolocation section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileGeolocation {
    /// Endpoint URL.
    pub endpoint: Option<String>,
    /// Timeout in seconds.
    pub timeout_secs: Option<u64>,
}

impl FolioConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a file path, then applies env overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_file(path: &std::path::Path) -> crate::Result<Self> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| crate::Error::OperationFailed {
                operation: "read_config_file".to_string(),
                cause: format!("{}: {e}", path.display()),
            })?;

        Self::parse_toml(&contents).map(Self::with_env_overrides)
    }

    /// Parses configuration from TOML text (no env overrides).
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid configuration.
    pub fn parse_toml(contents: &str) -> crate::Result<Self> {
        let file: ConfigFile =
            toml::from_str(contents).map_err(|e| crate::Error::OperationFailed {
                operation: "parse_config_file".to_string(),
                cause: e.to_string(),
            })?;

        Ok(Self::from_config_file(file))
    }

    /// Loads configuration from the default location.
    ///
    /// Checks `{config_dir}/folio/config.toml`, falling back to defaults.
    /// Env overrides are applied either way.
    #[must_use]
    pub fn load_default() -> Self {
        let from_file = directories::ProjectDirs::from("", "", "folio")
            .map(|dirs| dirs.config_dir().join("config.toml"))
            .filter(|path| path.exists())
            .and_then(|path| match Self::load_from_file(&path) {
                Ok(config) => Some(config),
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "Ignoring unreadable config file"
                    );
                    None
                },
            });

        from_file.unwrap_or_else(|| Self::default().with_env_overrides())
    }

    /// Applies environment variable overrides.
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(url) = non_empty_env("FOLIO_STORE_URL") {
            self.store.url = Some(url);
        }
        if let Some(token) = non_empty_env("FOLIO_STORE_AUTH") {
            self.store.auth_token = Some(SecretString::from(token));
        }
        if let Some(dir) = non_empty_env("FOLIO_LEGACY_DIR") {
            self.legacy.dir = PathBuf::from(dir);
        }
        if let Some(endpoint) = non_empty_env("FOLIO_GEO_ENDPOINT") {
            self.geolocation.endpoint = endpoint;
        }
        if let Some(format) = non_empty_env("FOLIO_LOG_FORMAT") {
            self.logging.format = Some(format);
        }
        if let Some(filter) = non_empty_env("FOLIO_LOG_FILTER") {
            self.logging.filter = Some(filter);
        }
        self
    }

    /// Sets the store URL.
    #[must_use]
    pub fn with_store_url(mut self, url: impl Into<String>) -> Self {
        self.store.url = Some(url.into());
        self
    }

    /// Sets the legacy store directory.
    #[must_use]
    pub fn with_legacy_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.legacy.dir = dir.into();
        self
    }

    /// Converts a `ConfigFile` to `FolioConfig`.
    fn from_config_file(file: ConfigFile) -> Self {
        let mut config = Self::default();

        if let Some(store) = file.store {
            config.store.url = store.url;
            config.store.auth_token = store.auth_token.map(SecretString::from);
            if let Some(v) = store.timeout_secs {
                config.store.timeout_secs = v;
            }
            if let Some(v) = store.max_transaction_attempts {
                config.store.max_transaction_attempts = v.max(1);
            }
        }
        if let Some(paths) = file.paths {
            let apply = |target: &mut String, value: Option<String>| {
                if let Some(v) = value.filter(|v| !v.trim().is_empty()) {
                    *target = v.trim_matches('/').to_string();
                }
            };
            apply(&mut config.paths.portfolio, paths.portfolio);
            apply(&mut config.paths.experience, paths.experience);
            apply(&mut config.paths.profile, paths.profile);
            apply(&mut config.paths.visit_counter, paths.visit_counter);
            apply(&mut config.paths.visit_logs, paths.visit_logs);
        }
        if let Some(legacy) = file.legacy {
            if let Some(dir) = legacy.dir {
                config.legacy.dir = PathBuf::from(dir);
            }
            if let Some(key) = legacy.portfolio_key {
                config.legacy.portfolio_key = key;
            }
        }
        if let Some(geo) = file.geolocation {
            if let Some(endpoint) = geo.endpoint {
                config.geolocation.endpoint = endpoint;
            }
            if let Some(v) = geo.timeout_secs {
                config.geolocation.timeout_secs = v;
            }
        }
        if let Some(logging) = file.logging {
            config.logging = logging;
        }

        config
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}
