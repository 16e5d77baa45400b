use std::collections::BTreeMap;

use super::config::ScoringConfig;
use super::factors::{boats_beaten, classify_age_group, classify_event_type, numeric_place};
use crate::athletes::types::{AthleteRecord, RaceEntry};

#[derive(Debug, Clone, PartialEq)]
pub struct ScoreBreakdown {
    pub event_type: Option<String>, // None when no token matched (weight 0)
    pub age_group: String,
    pub type_weight: f64,
    pub age_weight: f64,
    pub numeric_place: u64,
    pub boats_beaten: u64,
}

impl ScoreBreakdown {
    pub fn multiplier(&self) -> f64 {
        self.type_weight * self.age_weight
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RowScore {
    pub score: f64,
    pub breakdown: ScoreBreakdown,
}

/// Score one race result. None when the place has no digits (not scoreable).
pub fn score_result(
    event: &str,
    place: &str,
    field_size: usize,
    config: &ScoringConfig,
) -> Option<RowScore> {
    let numeric_place = numeric_place(place);
    if numeric_place == 0 {
        return None;
    }

    let types = config.event_types();
    let groups = config.age_groups();
    let default_group = config.default_age_group();

    let event_type = classify_event_type(event, &types);
    let age_group = classify_age_group(event, &groups, &default_group);
    let breakdown = ScoreBreakdown {
        event_type: event_type.map(|t| t.token.clone()),
        age_group: age_group.token.clone(),
        type_weight: event_type.map_or(0.0, |t| t.weight),
        age_weight: age_group.weight,
        numeric_place,
        boats_beaten: boats_beaten(field_size, numeric_place),
    };

    Some(RowScore {
        score: breakdown.boats_beaten as f64 * breakdown.multiplier(),
        breakdown,
    })
}

pub fn score_entry(entry: &RaceEntry, config: &ScoringConfig) -> Option<RowScore> {
    score_result(&entry.event, &entry.place, entry.field_size, config)
}

/// Summed prestige for one athlete
#[derive(Debug, Clone, PartialEq)]
pub struct AthleteScore {
    pub name: String,
    pub clubs: String,
    pub score: f64,
    pub scored_entries: usize,
}

/// Total each athlete's scoreable entries, best first.
///
/// Athletes without a single scoreable entry are left out. Ties sort by name.
pub fn score_athletes(
    records: &BTreeMap<String, AthleteRecord>,
    config: &ScoringConfig,
) -> Vec<AthleteScore> {
    let mut scores: Vec<AthleteScore> = records
        .values()
        .filter_map(|record| {
            let row_scores: Vec<f64> = record
                .races
                .iter()
                .filter_map(|entry| score_entry(entry, config))
                .map(|row| row.score)
                .collect();
            if row_scores.is_empty() {
                return None;
            }
            Some(AthleteScore {
                name: record.key.clone(),
                clubs: record.clubs_joined(),
                score: row_scores.iter().sum(),
                scored_entries: row_scores.len(),
            })
        })
        .collect();

    scores.sort_by(|a, b| {
        // Primary: score descending
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            // Tie-breaker: name ascending
            .then_with(|| a.name.cmp(&b.name))
    });
    scores
}
