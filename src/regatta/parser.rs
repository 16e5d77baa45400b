use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::HashSet;

use super::types::{BoatRef, ParsedEvent, RawResultRow};

// Candidate upstream field names per concept, highest priority first.
// The first non-empty value wins; reordering changes scoring outcomes.
pub const EVENT_NAME_FIELDS: &[&str] = &["long_desc", "event_label"];
pub const RACE_NAME_FIELDS: &[&str] = &["stageName", "displayNumber", "raceName"];
pub const CLUB_FIELDS: &[&str] = &["orgName", "longName"];
pub const PLACE_FIELDS: &[&str] = &["place", "orderOfFinishPlace", "finishPlace", "officialPlace"];
pub const FINISH_FIELDS: &[&str] = &[
    "finishTimeString",
    "adjustedTimeString",
    "rawTimeString",
    "officialTimeString",
];
pub const MARGIN_FIELDS: &[&str] = &["marginString", "adjustedTimeDeltaString", "officialMarginString"];

pub const DEFAULT_RACE_NAME: &str = "Final";

#[derive(Debug, Deserialize)]
struct EventPayload {
    #[serde(flatten)]
    fields: Map<String, Value>,
    #[serde(default)]
    races: Option<Vec<RacePayload>>,
}

#[derive(Debug, Deserialize)]
struct RacePayload {
    #[serde(flatten)]
    fields: Map<String, Value>,
    #[serde(default)]
    results: Option<Vec<Map<String, Value>>>,
}

/// Text of a loosely typed JSON value, or None when it carries nothing.
///
/// Null, false, zero and "" count as empty, matching how the upstream
/// service leaves fields unset. Whitespace is a value and is kept as-is.
fn non_empty_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) if n.as_f64() != Some(0.0) => Some(n.to_string()),
        Value::Bool(true) => Some("true".to_string()),
        _ => None,
    }
}

/// Raw text of a value, keeping zeros (lane numbers start at 0 on some courses)
fn plain_text(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

/// First non-empty value among `candidates`, in order
pub fn first_non_empty(fields: &Map<String, Value>, candidates: &[&str]) -> Option<String> {
    candidates
        .iter()
        .filter_map(|name| fields.get(*name))
        .find_map(non_empty_text)
}

/// Parse one event results payload into normalized rows.
///
/// Rows keep payload order. Field size is counted per race after all of its
/// results are resolved and then stamped onto every row of that race.
pub fn parse_event(payload: &str, job_id: &str) -> Result<ParsedEvent> {
    let payload: EventPayload =
        serde_json::from_str(payload).context("Malformed event results payload")?;

    let name = first_non_empty(&payload.fields, EVENT_NAME_FIELDS).unwrap_or_default();
    let mut rows = Vec::new();
    let mut boats = Vec::new();
    let mut seen_boats = HashSet::new();

    for race in payload.races.unwrap_or_default() {
        let race_name = first_non_empty(&race.fields, RACE_NAME_FIELDS)
            .unwrap_or_else(|| DEFAULT_RACE_NAME.to_string());

        let race_rows: Vec<RawResultRow> = race
            .results
            .unwrap_or_default()
            .iter()
            .map(|result| RawResultRow {
                event: name.clone(),
                race: race_name.clone(),
                boat_id: result.get("boatId").and_then(non_empty_text),
                boat_label: result.get("boatLabel").and_then(non_empty_text).unwrap_or_default(),
                club: first_non_empty(result, CLUB_FIELDS).unwrap_or_default(),
                place: first_non_empty(result, PLACE_FIELDS).unwrap_or_default(),
                bow: plain_text(result.get("lane")),
                finish: first_non_empty(result, FINISH_FIELDS).unwrap_or_default(),
                margin: first_non_empty(result, MARGIN_FIELDS).unwrap_or_default(),
                field_size: 0,
            })
            .collect();

        let field_size = race_rows.iter().filter(|row| !row.place.is_empty()).count();

        for mut row in race_rows {
            row.field_size = field_size;
            if let Some(ref boat_id) = row.boat_id {
                let boat = BoatRef::new(job_id, boat_id.clone());
                if seen_boats.insert(boat.clone()) {
                    boats.push(boat);
                }
            }
            rows.push(row);
        }
    }

    Ok(ParsedEvent { name, rows, boats })
}
