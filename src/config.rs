use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::auth::TOKEN_FILE_NAME;
use crate::sheet::{RetryPolicy, DEFAULT_API_BASE_URL, DEFAULT_SHEET_NAME};

/// Environment variable holding a bearer token that overrides the stored one.
pub const ACCESS_TOKEN_ENV: &str = "VOCASYNC_ACCESS_TOKEN";

/// Source of a configuration value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigSource {
    Default,
    File,
    Environment,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::Default => write!(f, "default"),
            ConfigSource::File => write!(f, "file"),
            ConfigSource::Environment => write!(f, "environment"),
        }
    }
}

/// A configuration value with its source
#[derive(Debug, Clone, Serialize)]
pub struct ConfigValue<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    pub fn new(value: T, source: ConfigSource) -> Self {
        Self { value, source }
    }
}

/// Where the word table lives
#[derive(Debug, Clone, Serialize)]
pub struct SheetConfig {
    pub spreadsheet_id: ConfigValue<Option<String>>,
    pub sheet_name: ConfigValue<String>,
    pub api_base_url: ConfigValue<String>,
}

/// Backoff and pacing of sheet calls
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub rate_limit_base_delay_ms: u64,
    pub request_spacing_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            max_retries: policy.max_retries,
            base_delay_ms: policy.base_delay.as_millis() as u64,
            rate_limit_base_delay_ms: policy.rate_limit_base_delay.as_millis() as u64,
            request_spacing_ms: policy.request_spacing.as_millis() as u64,
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            base_delay: Duration::from_millis(self.base_delay_ms),
            rate_limit_base_delay: Duration::from_millis(self.rate_limit_base_delay_ms),
            request_spacing: Duration::from_millis(self.request_spacing_ms),
        }
    }
}

/// How reachability of the sheet is determined
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectivityConfig {
    /// URL probed to decide whether the client is online
    pub probe_url: String,
    /// Seconds between probes in `watch`
    pub probe_interval_secs: u64,
}

impl Default for ConnectivityConfig {
    fn default() -> Self {
        Self {
            probe_url: DEFAULT_API_BASE_URL.to_string(),
            probe_interval_secs: 30,
        }
    }
}

/// Application configuration with source tracking
#[derive(Debug, Clone, Serialize)]
pub struct Config {
    /// Directory for the token file and, by default, the database
    pub data_dir: ConfigValue<PathBuf>,
    /// Path to the SQLite cache
    pub database_path: ConfigValue<PathBuf>,
    /// Config file path used (if any)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_file: Option<PathBuf>,
    pub sheet: SheetConfig,
    pub retry: RetryConfig,
    pub connectivity: ConnectivityConfig,
}

/// Internal struct for deserializing config file
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ConfigFile {
    data_dir: Option<PathBuf>,
    database_path: Option<PathBuf>,
    sheet: Option<SheetFile>,
    retry: Option<RetryConfig>,
    connectivity: Option<ConnectivityConfig>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct SheetFile {
    spreadsheet_id: Option<String>,
    sheet_name: Option<String>,
    api_base_url: Option<String>,
}

impl Config {
    /// Load configuration with priority: env vars > config file > defaults
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let mut data_dir = ConfigValue::new(Self::default_data_dir(), ConfigSource::Default);
        let mut database_path: Option<ConfigValue<PathBuf>> = None;
        let mut spreadsheet_id = ConfigValue::new(None, ConfigSource::Default);
        let mut sheet_name = ConfigValue::new(DEFAULT_SHEET_NAME.to_string(), ConfigSource::Default);
        let mut api_base_url =
            ConfigValue::new(DEFAULT_API_BASE_URL.to_string(), ConfigSource::Default);
        let mut config_file = None;
        let mut retry = RetryConfig::default();
        let mut connectivity = ConnectivityConfig::default();

        let path = config_path.unwrap_or_else(Self::default_config_path);
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::ReadError(path.clone(), e))?;
            let file_config: ConfigFile = serde_yaml::from_str(&contents)
                .map_err(|e| ConfigError::ParseError(path.clone(), e))?;

            config_file = Some(path.clone());
            let resolve = |p: PathBuf| {
                if p.is_relative() {
                    path.parent().map(|dir| dir.join(&p)).unwrap_or(p)
                } else {
                    p
                }
            };

            if let Some(dir) = file_config.data_dir {
                data_dir = ConfigValue::new(resolve(dir), ConfigSource::File);
            }
            if let Some(db_path) = file_config.database_path {
                database_path = Some(ConfigValue::new(resolve(db_path), ConfigSource::File));
            }
            if let Some(sheet) = file_config.sheet {
                if let Some(id) = sheet.spreadsheet_id {
                    spreadsheet_id = ConfigValue::new(Some(id), ConfigSource::File);
                }
                if let Some(name) = sheet.sheet_name {
                    sheet_name = ConfigValue::new(name, ConfigSource::File);
                }
                if let Some(url) = sheet.api_base_url {
                    api_base_url = ConfigValue::new(url, ConfigSource::File);
                }
            }
            if let Some(retry_config) = file_config.retry {
                retry = retry_config;
            }
            if let Some(connectivity_config) = file_config.connectivity {
                connectivity = connectivity_config;
            }
        }

        if let Ok(db_path) = std::env::var("VOCASYNC_DATABASE_PATH") {
            database_path = Some(ConfigValue::new(
                PathBuf::from(db_path),
                ConfigSource::Environment,
            ));
        }
        if let Ok(id) = std::env::var("VOCASYNC_SPREADSHEET_ID") {
            spreadsheet_id = ConfigValue::new(Some(id), ConfigSource::Environment);
        }
        if let Ok(name) = std::env::var("VOCASYNC_SHEET_NAME") {
            sheet_name = ConfigValue::new(name, ConfigSource::Environment);
        }
        if let Ok(url) = std::env::var("VOCASYNC_API_BASE_URL") {
            api_base_url = ConfigValue::new(url, ConfigSource::Environment);
        }

        // The database follows data_dir unless set explicitly.
        let database_path = database_path.unwrap_or_else(|| {
            ConfigValue::new(
                data_dir.value.join("vocasync.db"),
                data_dir.source.clone(),
            )
        });
        spreadsheet_id.value = spreadsheet_id.value.filter(|id| !id.trim().is_empty());

        Ok(Self {
            data_dir,
            database_path,
            config_file,
            sheet: SheetConfig {
                spreadsheet_id,
                sheet_name,
                api_base_url,
            },
            retry,
            connectivity,
        })
    }

    /// File holding the stored bearer token.
    pub fn token_path(&self) -> PathBuf {
        self.data_dir.value.join(TOKEN_FILE_NAME)
    }

    /// Bearer token from the environment, if set.
    pub fn access_token_override() -> Option<String> {
        std::env::var(ACCESS_TOKEN_ENV)
            .ok()
            .filter(|t| !t.trim().is_empty())
    }

    /// Default config directory (platform-specific):
    /// - Linux: ~/.config/vocasync/
    /// - macOS: ~/Library/Application Support/vocasync/
    /// - Windows: %APPDATA%/vocasync/
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("vocasync")
    }

    /// Default data directory (platform-specific):
    /// - Linux: ~/.local/share/vocasync/
    /// - macOS: ~/Library/Application Support/vocasync/
    /// - Windows: %APPDATA%/vocasync/
    pub fn default_data_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("vocasync")
    }

    /// Default config file path (platform-specific config dir + config.yaml)
    pub fn default_config_path() -> PathBuf {
        Self::default_config_dir().join("config.yaml")
    }
}

#[derive(Debug)]
pub enum ConfigError {
    ReadError(PathBuf, std::io::Error),
    ParseError(PathBuf, serde_yaml::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ReadError(path, e) => {
                write!(f, "Failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::ParseError(path, e) => {
                write!(f, "Failed to parse config file '{}': {}", path.display(), e)
            }
        }
    }
}

impl std::error::Error for ConfigError {}
