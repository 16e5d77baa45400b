mod schema;

pub use schema::{Config, FetchConfig, OutputConfig};

use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::regatta::results::RetryPolicy;

pub const DEFAULT_BASE_URL: &str = "https://www.regattacentral.com";
pub const DEFAULT_ATHLETES_PATH: &str = "athletes.csv";
pub const DEFAULT_PRESTIGE_PATH: &str = "prestige-scores.csv";

const DEFAULT_EVENT_TIMEOUT: Duration = Duration::from_secs(15);
const DEFAULT_LINEUP_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_RETRY_ATTEMPTS: u32 = 3;
const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(2);
const DEFAULT_EVENT_DELAY: Duration = Duration::from_secs(1);
const DEFAULT_LINEUP_CONCURRENCY: usize = 8;
const DEFAULT_USER_AGENT: &str = concat!("regatta-prestige/", env!("CARGO_PKG_VERSION"));

/// Get the config directory path (~/.config/regatta-prestige/)
pub fn get_config_dir() -> PathBuf {
    dirs::config_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join(".config")))
        .unwrap_or_else(|| PathBuf::from("."))
        .join("regatta-prestige")
}

/// Get the default config file path (~/.config/regatta-prestige/config.yaml)
pub fn get_config_path() -> PathBuf {
    get_config_dir().join("config.yaml")
}

/// Load configuration from a YAML file
///
/// An explicit `path` must exist. Without one, the default location is tried
/// and a missing file yields the built-in defaults.
///
/// # Errors
///
/// Returns an error if:
/// - An explicitly given config file does not exist
/// - The config file cannot be read
/// - The YAML cannot be parsed
pub fn load_config(path: Option<PathBuf>) -> Result<Config> {
    let explicit = path.is_some();
    let config_path = path.unwrap_or_else(get_config_path);

    if !config_path.exists() {
        if explicit {
            anyhow::bail!("Config file not found at {}", config_path.display());
        }
        return Ok(Config::default());
    }

    let config_content = fs::read_to_string(&config_path)
        .with_context(|| format!("Failed to read config file at {}", config_path.display()))?;

    parse_config(&config_content)
        .with_context(|| format!("Failed to parse config: invalid YAML in {}", config_path.display()))
}

pub fn parse_config(yaml: &str) -> Result<Config> {
    serde_saphyr::from_str(yaml).map_err(|e| anyhow::anyhow!("{}", e))
}

impl Config {
    pub fn base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .map(|url| url.trim_end_matches('/'))
            .unwrap_or(DEFAULT_BASE_URL)
    }

    pub fn athletes_path(&self) -> PathBuf {
        self.output
            .as_ref()
            .and_then(|o| o.athletes.as_deref())
            .unwrap_or(DEFAULT_ATHLETES_PATH)
            .into()
    }

    pub fn prestige_path(&self) -> PathBuf {
        self.output
            .as_ref()
            .and_then(|o| o.prestige.as_deref())
            .unwrap_or(DEFAULT_PRESTIGE_PATH)
            .into()
    }
}

/// Network settings with every default filled in and every duration parsed.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchSettings {
    pub event_timeout: Duration,
    pub lineup_timeout: Duration,
    pub retry: RetryPolicy,
    pub event_delay: Duration,
    pub lineup_concurrency: usize,
    pub user_agent: String,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            event_timeout: DEFAULT_EVENT_TIMEOUT,
            lineup_timeout: DEFAULT_LINEUP_TIMEOUT,
            retry: RetryPolicy::new(DEFAULT_RETRY_ATTEMPTS, DEFAULT_RETRY_DELAY),
            event_delay: DEFAULT_EVENT_DELAY,
            lineup_concurrency: DEFAULT_LINEUP_CONCURRENCY,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

fn parse_duration_field(value: &Option<String>, default: Duration) -> Result<Duration> {
    match value {
        Some(s) => humantime::parse_duration(s.trim())
            .with_context(|| format!("invalid duration '{}'", s)),
        None => Ok(default),
    }
}

impl FetchConfig {
    /// Fill defaults and parse durations. Call `validate_fetch` first for a full error list.
    pub fn resolve(&self) -> Result<FetchSettings> {
        let defaults = FetchSettings::default();
        let attempts = self.retry_attempts.unwrap_or(DEFAULT_RETRY_ATTEMPTS);
        let delay = parse_duration_field(&self.retry_delay, DEFAULT_RETRY_DELAY)?;

        Ok(FetchSettings {
            event_timeout: parse_duration_field(&self.event_timeout, defaults.event_timeout)?,
            lineup_timeout: parse_duration_field(&self.lineup_timeout, defaults.lineup_timeout)?,
            retry: RetryPolicy::new(attempts, delay),
            event_delay: parse_duration_field(&self.event_delay, defaults.event_delay)?,
            lineup_concurrency: self.lineup_concurrency.unwrap_or(defaults.lineup_concurrency),
            user_agent: self.user_agent.clone().unwrap_or(defaults.user_agent),
        })
    }
}

/// Validate fetch configuration at startup.
/// Returns all validation errors at once (not just the first).
pub fn validate_fetch(config: &FetchConfig) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();

    let durations = [
        ("event_timeout", &config.event_timeout),
        ("lineup_timeout", &config.lineup_timeout),
        ("retry_delay", &config.retry_delay),
        ("event_delay", &config.event_delay),
    ];
    for (field, value) in durations {
        if let Some(s) = value {
            if let Err(e) = humantime::parse_duration(s.trim()) {
                errors.push(format!("fetch.{}: invalid duration '{}' - {}", field, s, e));
            }
        }
    }

    if config.retry_attempts == Some(0) {
        errors.push("fetch.retry_attempts: must be at least 1".to_string());
    }

    if config.lineup_concurrency == Some(0) {
        errors.push("fetch.lineup_concurrency: must be at least 1".to_string());
    }

    if let Some(ref ua) = config.user_agent {
        if ua.trim().is_empty() {
            errors.push("fetch.user_agent: must not be empty".to_string());
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
