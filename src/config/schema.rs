use serde::{Deserialize, Serialize};

use crate::athletes::filter::FilterConfig;
use crate::scoring::ScoringConfig;

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Upstream origin used for relative listing links and servlet URLs
    #[serde(default)]
    pub base_url: Option<String>,

    /// Results listing page: an http(s) URL or a path to a saved HTML file
    #[serde(default)]
    pub listing: Option<String>,

    #[serde(default)]
    pub fetch: Option<FetchConfig>,

    #[serde(default)]
    pub scoring: Option<ScoringConfig>,

    /// Pre-filter is applied only when this section is present (or `--filter` is passed)
    #[serde(default)]
    pub filter: Option<FilterConfig>,

    #[serde(default)]
    pub output: Option<OutputConfig>,
}

/// Network behaviour. Durations use humantime syntax ("15s", "500ms").
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct FetchConfig {
    #[serde(default)]
    pub event_timeout: Option<String>,
    #[serde(default)]
    pub lineup_timeout: Option<String>,
    /// Total attempts per event, including the first
    #[serde(default)]
    pub retry_attempts: Option<u32>,
    #[serde(default)]
    pub retry_delay: Option<String>,
    /// Pause after each successful event fetch
    #[serde(default)]
    pub event_delay: Option<String>,
    #[serde(default)]
    pub lineup_concurrency: Option<usize>,
    #[serde(default)]
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    #[serde(default)]
    pub athletes: Option<String>,
    #[serde(default)]
    pub prestige: Option<String>,
}
