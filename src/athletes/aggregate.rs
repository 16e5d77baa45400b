use std::collections::{BTreeMap, HashSet};

use super::types::{AthleteRecord, RaceEntry};
use crate::regatta::types::{CrewMember, RawResultRow};

/// Place code upstream uses for disqualified, did-not-start and unscored boats
pub const DISQUALIFIED_PLACE: &str = "999";

/// Maps a crew member to the key their race history is filed under
pub trait IdentityKey {
    fn key(&self, member: &CrewMember) -> String;
}

/// Trimmed display name. Namesakes collapse into one record.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrimmedName;

impl IdentityKey for TrimmedName {
    fn key(&self, member: &CrewMember) -> String {
        member.name.trim().to_string()
    }
}

/// Athlete key plus the fields that identify one race result
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct DedupKey {
    athlete: String,
    event: String,
    race: String,
    place: String,
    bow: String,
    club: String,
    finish: String,
}

/// Rows without a finish time or with the disqualification code never count
pub fn is_countable(row: &RawResultRow) -> bool {
    !row.finish.is_empty() && row.place.trim() != DISQUALIFIED_PLACE
}

/// Accumulates reconciled rows into one record per athlete.
///
/// Built by a single serial fold; concurrent fetches hand their results over
/// before anything is added here.
#[derive(Debug, Default)]
pub struct AthleteAggregator<K = TrimmedName> {
    identity: K,
    records: BTreeMap<String, AthleteRecord>,
    seen: HashSet<DedupKey>,
    duplicates: usize,
    excluded_rows: usize,
}

impl AthleteAggregator<TrimmedName> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<K: IdentityKey> AthleteAggregator<K> {
    pub fn with_identity(identity: K) -> Self {
        Self {
            identity,
            records: BTreeMap::new(),
            seen: HashSet::new(),
            duplicates: 0,
            excluded_rows: 0,
        }
    }

    /// Credit one row to its reconciled members. Returns the number of new entries.
    pub fn add(&mut self, row: &RawResultRow, members: &[CrewMember]) -> usize {
        if !is_countable(row) {
            self.excluded_rows += 1;
            return 0;
        }

        let mut added = 0;
        for member in members {
            let key = self.identity.key(member);
            if key.is_empty() {
                continue;
            }

            let dedup = DedupKey {
                athlete: key.clone(),
                event: row.event.clone(),
                race: row.race.clone(),
                place: row.place.clone(),
                bow: row.bow.clone(),
                club: row.club.clone(),
                finish: row.finish.clone(),
            };
            if !self.seen.insert(dedup) {
                self.duplicates += 1;
                continue;
            }

            let record = self
                .records
                .entry(key.clone())
                .or_insert_with(|| AthleteRecord::new(key));
            record.names.insert(member.name.clone());
            if let Some(club) = member.club.as_deref().filter(|c| !c.is_empty()) {
                record.clubs.insert(club.to_string());
            }
            if let Some(age) = member.age.as_deref().filter(|a| !a.is_empty()) {
                record.age = Some(age.to_string());
            }
            record.races.push(RaceEntry {
                event: row.event.clone(),
                race: row.race.clone(),
                place: row.place.clone(),
                bow: row.bow.clone(),
                club: row.club.clone(),
                finish: row.finish.clone(),
                margin: row.margin.clone(),
                seat: member.seat,
                field_size: row.field_size,
            });
            added += 1;
        }
        added
    }

    pub fn records(&self) -> &BTreeMap<String, AthleteRecord> {
        &self.records
    }

    pub fn into_records(self) -> BTreeMap<String, AthleteRecord> {
        self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Repeated (athlete, race) sightings skipped so far
    pub fn duplicates(&self) -> usize {
        self.duplicates
    }

    /// Rows skipped for a missing finish or the disqualification code
    pub fn excluded_rows(&self) -> usize {
        self.excluded_rows
    }
}

/// Fold reconciled rows into athlete records keyed by trimmed name
pub fn aggregate<'a, I>(rows: I) -> BTreeMap<String, AthleteRecord>
where
    I: IntoIterator<Item = (&'a RawResultRow, &'a [CrewMember])>,
{
    let mut aggregator = AthleteAggregator::new();
    for (row, members) in rows {
        aggregator.add(row, members);
    }
    aggregator.into_records()
}
