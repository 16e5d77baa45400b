use std::fmt;

/// One event of one competition (`job_id` + `event_id` upstream).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventRef {
    pub job_id: String,
    pub event_id: String,
}

impl EventRef {
    pub fn new(job_id: impl Into<String>, event_id: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            event_id: event_id.into(),
        }
    }
}

impl fmt::Display for EventRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "job_id={} event_id={}", self.job_id, self.event_id)
    }
}

/// Lineup lookup key. Boat ids are only unique within a competition.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BoatRef {
    pub job_id: String,
    pub boat_id: String,
}

impl BoatRef {
    pub fn new(job_id: impl Into<String>, boat_id: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            boat_id: boat_id.into(),
        }
    }
}

/// One boat's result in one race, with alternate upstream fields already resolved.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawResultRow {
    pub event: String,
    pub race: String,
    pub boat_id: Option<String>,
    pub boat_label: String,
    pub club: String,
    /// Raw place text; may be non-numeric or the disqualification sentinel
    pub place: String,
    pub bow: String,
    pub finish: String,
    pub margin: String,
    /// Boats with a recorded place in this race (same for every row of the race)
    pub field_size: usize,
}

/// One seat of a lineup, or the pseudo-member synthesized from a boat label.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CrewMember {
    pub seat: Option<u32>,
    pub name: String,
    pub age: Option<String>,
    pub club: Option<String>,
}

/// Normalized contents of one event payload.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParsedEvent {
    pub name: String,
    pub rows: Vec<RawResultRow>,
    /// Distinct boats that need a lineup, in first-seen order
    pub boats: Vec<BoatRef>,
}
