use anyhow::{Context, Result};
use atomic_write_file::AtomicWriteFile;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use crate::athletes::types::{AthleteRecord, RaceEntry};
use crate::scoring::AthleteScore;

/// One line of the athlete race export
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AthleteRow {
    pub athlete_name: String,
    pub age: String,
    pub club: String,
    pub seat: String,
    pub event: String,
    pub race: String,
    pub place: String,
    pub bow: String,
    pub finish: String,
    pub margin: String,
    #[serde(default)]
    pub num_boats: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrestigeRow {
    pub athlete_name: String,
    pub prestige_score: f64,
}

/// Flatten records into export rows: one per (athlete, race entry)
pub fn athlete_rows(records: &BTreeMap<String, AthleteRecord>) -> Vec<AthleteRow> {
    records
        .values()
        .flat_map(|record| {
            let age = record.age.clone().unwrap_or_default();
            let clubs = record.clubs_joined();
            record.races.iter().map(move |entry| AthleteRow {
                athlete_name: record.key.clone(),
                age: age.clone(),
                club: clubs.clone(),
                seat: entry.seat.map(|s| s.to_string()).unwrap_or_default(),
                event: entry.event.clone(),
                race: entry.race.clone(),
                place: entry.place.clone(),
                bow: entry.bow.clone(),
                finish: entry.finish.clone(),
                margin: entry.margin.clone(),
                num_boats: entry.field_size,
            })
        })
        .collect()
}

pub fn write_athletes_csv<W: Write>(writer: W, records: &BTreeMap<String, AthleteRecord>) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    let rows = athlete_rows(records);
    if rows.is_empty() {
        // Header only, so downstream tools still see the columns
        wtr.write_record([
            "athlete_name", "age", "club", "seat", "event", "race", "place", "bow", "finish",
            "margin", "num_boats",
        ])?;
    }
    for row in rows {
        wtr.serialize(row).context("Failed to write athlete row")?;
    }
    wtr.flush().context("Failed to flush athlete export")?;
    Ok(())
}

fn round_score(score: f64) -> f64 {
    (score * 1000.0).round() / 1000.0
}

pub fn write_prestige_csv<W: Write>(writer: W, scores: &[AthleteScore]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    if scores.is_empty() {
        wtr.write_record(["athlete_name", "prestige_score"])?;
    }
    for score in scores {
        wtr.serialize(PrestigeRow {
            athlete_name: score.name.clone(),
            prestige_score: round_score(score.score),
        })
        .context("Failed to write prestige row")?;
    }
    wtr.flush().context("Failed to flush prestige export")?;
    Ok(())
}

/// Write `contents` to `path` atomically; a failed run never leaves a partial file
fn save_atomic<F>(path: &Path, contents: F) -> Result<()>
where
    F: FnOnce(&mut AtomicWriteFile) -> Result<()>,
{
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }

    let mut file = AtomicWriteFile::open(path)
        .with_context(|| format!("Failed to open atomic write file at {}", path.display()))?;
    contents(&mut file)?;
    file.commit()
        .with_context(|| format!("Failed to save {}", path.display()))?;
    Ok(())
}

pub fn save_athletes(path: &Path, records: &BTreeMap<String, AthleteRecord>) -> Result<()> {
    save_atomic(path, |file| write_athletes_csv(file, records))
}

pub fn save_prestige(path: &Path, scores: &[AthleteScore]) -> Result<()> {
    save_atomic(path, |file| write_prestige_csv(file, scores))
}

/// Rebuild athlete records from an athlete export.
///
/// Club variants are split back apart on ", ". The age column is the
/// athlete's last-seen age, so the last non-empty value wins here as well.
pub fn read_athletes<R: Read>(reader: R) -> Result<BTreeMap<String, AthleteRecord>> {
    let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let mut records: BTreeMap<String, AthleteRecord> = BTreeMap::new();

    for (i, row) in rdr.deserialize::<AthleteRow>().enumerate() {
        // Header is line 1
        let row = row.with_context(|| format!("Invalid athlete export row at line {}", i + 2))?;
        let key = row.athlete_name.trim().to_string();
        if key.is_empty() {
            continue;
        }

        let record = records
            .entry(key.clone())
            .or_insert_with(|| AthleteRecord::new(key));
        record.names.insert(row.athlete_name.clone());
        for club in row.club.split(", ").filter(|c| !c.is_empty()) {
            record.clubs.insert(club.to_string());
        }
        let seat = row.seat.trim().parse::<u32>().ok();
        if !row.age.trim().is_empty() {
            record.age = Some(row.age.trim().to_string());
        }
        record.races.push(RaceEntry {
            event: row.event,
            race: row.race,
            place: row.place,
            bow: row.bow,
            club: String::new(),
            finish: row.finish,
            margin: row.margin,
            seat,
            field_size: row.num_boats,
        });
    }

    Ok(records)
}

pub fn load_athletes(path: &Path) -> Result<BTreeMap<String, AthleteRecord>> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open athlete export at {}", path.display()))?;
    read_athletes(file).with_context(|| format!("Failed to load athlete export {}", path.display()))
}
