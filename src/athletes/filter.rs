use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::types::AthleteRecord;

fn default_max_age() -> u32 {
    18
}

fn default_gender_token() -> String {
    "women".to_string()
}

fn default_coxed_marker() -> String {
    "+".to_string()
}

/// Recruiting pre-filter: young athletes, one gender, coxed-boat experience.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct FilterConfig {
    /// Athletes must be strictly younger than this
    #[serde(default = "default_max_age")]
    pub max_age: u32,

    /// Case-insensitive token an event name must contain
    #[serde(default = "default_gender_token")]
    pub gender_token: String,

    /// Token marking a coxed boat class in the event name
    #[serde(default = "default_coxed_marker")]
    pub coxed_marker: String,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            max_age: default_max_age(),
            gender_token: default_gender_token(),
            coxed_marker: default_coxed_marker(),
        }
    }
}

fn age_below(record: &AthleteRecord, max_age: u32) -> bool {
    record
        .age
        .as_deref()
        .and_then(|age| age.trim().parse::<u32>().ok())
        .is_some_and(|age| age < max_age)
}

/// Apply the pre-filter, returning the surviving records.
///
/// Athletes without a parseable age are dropped. Entries outside the gender
/// token are dropped next, and finally athletes with no remaining coxed event.
pub fn filter_athletes(
    records: &BTreeMap<String, AthleteRecord>,
    config: &FilterConfig,
) -> BTreeMap<String, AthleteRecord> {
    let gender = config.gender_token.to_lowercase();

    records
        .iter()
        .filter(|(_, record)| age_below(record, config.max_age))
        .filter_map(|(key, record)| {
            let races: Vec<_> = record
                .races
                .iter()
                .filter(|entry| entry.event.to_lowercase().contains(&gender))
                .cloned()
                .collect();
            let coxed = races
                .iter()
                .any(|entry| entry.event.contains(&config.coxed_marker));
            coxed.then(|| {
                let mut kept = record.clone();
                kept.races = races;
                (key.clone(), kept)
            })
        })
        .collect()
}
