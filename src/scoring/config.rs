use serde::{Deserialize, Serialize};

/// Prestige scoring configuration.
///
/// Every section is optional; a missing section falls back to the built-in
/// table for that section only.
///
/// Example YAML:
/// ```yaml
/// scoring:
///   event_types:
///     - { token: "8+", weight: 3.0 }
///     - { token: "4+", weight: 2.5 }
///   age_groups:
///     - { token: "u16", weight: 0.5 }
///     - { token: "u17", weight: 0.7 }
///   default_age_group: { token: "u19", weight: 1.0 }
/// ```
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ScoringConfig {
    /// Boat-class tokens, tested in order against the lowercased event name.
    /// The first token found wins; unmatched events weigh 0.
    #[serde(default)]
    pub event_types: Option<Vec<WeightedToken>>,

    /// Narrower age groups, tested in order; first match wins
    #[serde(default)]
    pub age_groups: Option<Vec<WeightedToken>>,

    /// Age group applied when none of `age_groups` matches
    #[serde(default)]
    pub default_age_group: Option<WeightedToken>,
}

/// A case-insensitive substring token with its weight
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct WeightedToken {
    pub token: String,
    pub weight: f64,
}

impl WeightedToken {
    pub fn new(token: &str, weight: f64) -> Self {
        Self {
            token: token.to_string(),
            weight,
        }
    }
}

/// Longer tokens precede the shorter ones they contain ("4x+" before "4x"),
/// so an event name matching several resolves to its most specific class.
pub fn default_event_types() -> Vec<WeightedToken> {
    vec![
        WeightedToken::new("8+", 3.0),
        WeightedToken::new("4x+", 2.0),
        WeightedToken::new("4+", 2.5),
        WeightedToken::new("4x", 2.0),
        WeightedToken::new("4-", 2.0),
    ]
}

pub fn default_age_groups() -> Vec<WeightedToken> {
    vec![WeightedToken::new("u16", 0.5), WeightedToken::new("u17", 0.7)]
}

pub fn default_default_age_group() -> WeightedToken {
    WeightedToken::new("u19", 1.0)
}

impl ScoringConfig {
    /// Config with every section filled from the built-in tables
    pub fn builtin() -> Self {
        Self {
            event_types: Some(default_event_types()),
            age_groups: Some(default_age_groups()),
            default_age_group: Some(default_default_age_group()),
        }
    }

    pub fn event_types(&self) -> Vec<WeightedToken> {
        self.event_types.clone().unwrap_or_else(default_event_types)
    }

    pub fn age_groups(&self) -> Vec<WeightedToken> {
        self.age_groups.clone().unwrap_or_else(default_age_groups)
    }

    pub fn default_age_group(&self) -> WeightedToken {
        self.default_age_group
            .clone()
            .unwrap_or_else(default_default_age_group)
    }
}
