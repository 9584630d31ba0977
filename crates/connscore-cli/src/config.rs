//! Configuration file management.
//!
//! Settings come from a TOML file and are then overridden by command-line
//! flags. The result is validated once and converted into the runtime types
//! the collector takes.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use connscore_core::{
    DEFAULT_BASE_URL, DEFAULT_RETRY_DELAY, DEFAULT_TIMEOUT, FetchConfig, Pacing, RetryPolicy,
};

use crate::cli::{Cli, HistoricalArgs};

/// Longest accepted base delay between historical requests (one day).
pub const MAX_DELAY_SECS: f64 = 86_400.0;

/// Configuration file structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding the CSV and JSON files.
    pub data_dir: Option<PathBuf>,
    /// Enable debug logging.
    pub debug: bool,
    /// Save pages that fail extraction.
    pub save_html_on_failure: bool,
    pub fetch: FetchSettings,
    pub daily: DailySettings,
    pub historical: HistoricalSettings,
}

/// `[fetch]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchSettings {
    pub proxy_url: Option<String>,
    pub user_agent: Option<String>,
    pub timeout_secs: u64,
    pub base_url: String,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            proxy_url: None,
            user_agent: None,
            timeout_secs: DEFAULT_TIMEOUT.as_secs(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

/// `[daily]` section, also used by single-date runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DailySettings {
    pub retries: u32,
    pub retry_delay_secs: u64,
}

impl Default for DailySettings {
    fn default() -> Self {
        Self {
            retries: 1,
            retry_delay_secs: DEFAULT_RETRY_DELAY.as_secs(),
        }
    }
}

/// `[historical]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoricalSettings {
    pub delay_secs: f64,
    pub jitter: bool,
    pub batch_size: u32,
    pub cooldown_secs: u64,
    pub max_consecutive_failures: u32,
    pub failure_pause_secs: u64,
    pub skip_existing: bool,
}

impl Default for HistoricalSettings {
    fn default() -> Self {
        let pacing = Pacing::default();
        Self {
            delay_secs: pacing.delay.as_secs_f64(),
            jitter: pacing.jitter,
            batch_size: pacing.batch_size,
            cooldown_secs: pacing.cooldown.as_secs(),
            max_consecutive_failures: pacing.max_consecutive_failures,
            failure_pause_secs: pacing.failure_pause.as_secs(),
            skip_existing: true,
        }
    }
}

impl Config {
    /// Load from `path`, or from the default location when `path` is `None`.
    ///
    /// A missing default file yields the defaults; a missing explicit file is
    /// an error.
    pub fn load_from(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => {
                let path = default_config_path();
                if path.exists() {
                    Self::load(&path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Load configuration from a file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Read {
            path: path.as_ref().to_path_buf(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.as_ref().to_path_buf(),
            source: e,
        })
    }

    /// Apply global command-line flags on top of the file settings.
    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(retries) = cli.retries {
            self.daily.retries = retries;
        }
        if let Some(delay) = cli.retry_delay {
            self.daily.retry_delay_secs = delay;
        }
        if let Some(proxy) = &cli.proxy {
            self.fetch.proxy_url = Some(proxy.clone());
        }
        if let Some(agent) = &cli.user_agent {
            self.fetch.user_agent = Some(agent.clone());
        }
        if let Some(timeout) = cli.timeout {
            self.fetch.timeout_secs = timeout;
        }
        if let Some(dir) = &cli.data_dir {
            self.data_dir = Some(dir.clone());
        }
        self.debug |= cli.debug;
        self.save_html_on_failure |= cli.save_html;
    }

    /// Apply `historical` subcommand flags.
    pub fn apply_historical(&mut self, args: &HistoricalArgs) {
        if let Some(delay) = args.delay {
            self.historical.delay_secs = delay;
        }
        if args.no_jitter {
            self.historical.jitter = false;
        }
        if let Some(size) = args.batch_size {
            self.historical.batch_size = size;
        }
        if let Some(cooldown) = args.cooldown {
            self.historical.cooldown_secs = cooldown;
        }
        if args.refetch {
            self.historical.skip_existing = false;
        }
    }

    /// Check every setting, reporting all problems at once.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        if self.daily.retries == 0 {
            errors.push(ValidationError::new("daily.retries", "must be at least 1"));
        }
        if self.fetch.timeout_secs == 0 {
            errors.push(ValidationError::new(
                "fetch.timeout_secs",
                "must be greater than 0",
            ));
        }
        if !self.fetch.base_url.starts_with("http://") && !self.fetch.base_url.starts_with("https://")
        {
            errors.push(ValidationError::new(
                "fetch.base_url",
                format!(
                    "URL must start with http:// or https://, got: {}",
                    self.fetch.base_url
                ),
            ));
        }
        if self.fetch.proxy_url.as_deref().is_some_and(|p| !is_proxy_url(p)) {
            errors.push(ValidationError::new(
                "fetch.proxy_url",
                "expected scheme://[user:password@]host:port with an http, https or socks5 scheme",
            ));
        }
        if self.historical.batch_size == 0 {
            errors.push(ValidationError::new(
                "historical.batch_size",
                "must be at least 1",
            ));
        }
        if !(0.0..=MAX_DELAY_SECS).contains(&self.historical.delay_secs) {
            errors.push(ValidationError::new(
                "historical.delay_secs",
                format!(
                    "must be between 0 and {} seconds, got {}",
                    MAX_DELAY_SECS, self.historical.delay_secs
                ),
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    /// Data directory, falling back to `./data`.
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir
            .clone()
            .unwrap_or_else(connscore_store::default_data_dir)
    }

    /// Fetcher settings, with the proxy resolved from the environment when
    /// none is configured.
    pub fn fetch_config(&self) -> FetchConfig {
        FetchConfig {
            proxy_url: self.fetch.proxy_url.clone(),
            user_agent: self.fetch.user_agent.clone(),
            timeout: Duration::from_secs(self.fetch.timeout_secs),
            base_url: self.fetch.base_url.clone(),
        }
        .with_env_proxy()
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.daily.retries,
            Duration::from_secs(self.daily.retry_delay_secs),
        )
    }

    pub fn pacing(&self) -> Result<Pacing, ConfigError> {
        let h = &self.historical;
        let delay = Duration::try_from_secs_f64(h.delay_secs).map_err(|e| {
            ConfigError::Validation(vec![ValidationError::new(
                "historical.delay_secs",
                format!("{}: {}", h.delay_secs, e),
            )])
        })?;
        Ok(Pacing {
            delay,
            jitter: h.jitter,
            batch_size: h.batch_size,
            cooldown: Duration::from_secs(h.cooldown_secs),
            max_consecutive_failures: h.max_consecutive_failures,
            failure_pause: Duration::from_secs(h.failure_pause_secs),
        })
    }
}

fn is_proxy_url(url: &str) -> bool {
    let Some((scheme, rest)) = url.split_once("://") else {
        return false;
    };
    let host = rest.rsplit_once('@').map_or(rest, |(_, host)| host);
    let host = host.split('/').next().unwrap_or_default();
    matches!(scheme, "http" | "https" | "socks5" | "socks5h")
        && !host.is_empty()
        && !host.contains(char::is_whitespace)
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Configuration validation failed:\n{}", format_validation_errors(.0))]
    Validation(Vec<ValidationError>),
}

/// A single validation error with context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// The field path (e.g., `daily.retries`).
    pub field: String,
    /// Description of the validation failure.
    pub message: String,
}

impl ValidationError {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn format_validation_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| format!("  - {}", e))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Default configuration file path.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("connscore")
        .join("config.toml")
}
