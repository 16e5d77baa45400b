use std::collections::BTreeSet;

/// One athlete's participation in one race
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RaceEntry {
    pub event: String,
    pub race: String,
    pub place: String,
    pub bow: String,
    /// Club the boat raced for, as the results listed it
    pub club: String,
    pub finish: String,
    pub margin: String,
    pub seat: Option<u32>,
    pub field_size: usize,
}

/// Everything known about one athlete identity.
///
/// The identity key is the trimmed display name, so two different people
/// with the same name share a record.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AthleteRecord {
    pub key: String,
    pub names: BTreeSet<String>,
    pub clubs: BTreeSet<String>,
    /// Last age seen for this athlete
    pub age: Option<String>,
    /// Discovery order, not chronological
    pub races: Vec<RaceEntry>,
}

impl AthleteRecord {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Default::default()
        }
    }

    /// Club variants joined for display and export
    pub fn clubs_joined(&self) -> String {
        self.clubs.iter().cloned().collect::<Vec<_>>().join(", ")
    }
}
