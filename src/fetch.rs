use anyhow::Result;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use crate::athletes::{filter_athletes, reconcile, AthleteAggregator, AthleteRecord, FilterConfig, IdentityKey};
use crate::config::FetchSettings;
use crate::regatta::{fetch_event, parse_event, BoatRef, Endpoints, EventRef, LineupCache, Transport};
use crate::scoring::{score_athletes, AthleteScore, ScoringConfig};

/// An event left out of the run, with the reason
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedEvent {
    pub event: EventRef,
    pub reason: String,
}

/// Counters for the end-of-run summary
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunReport {
    pub events_total: usize,
    pub events_parsed: usize,
    pub skipped: Vec<SkippedEvent>,
    pub rows: usize,
    /// Rows that could not be credited to anyone
    pub dropped_rows: usize,
    /// Rows without a finish time or with the disqualification code
    pub excluded_rows: usize,
    /// Athlete entries already recorded earlier in the run
    pub duplicates: usize,
    pub lineups_fetched: usize,
    pub athletes: usize,
}

#[derive(Debug)]
pub struct RunOutcome {
    pub records: BTreeMap<String, AthleteRecord>,
    pub report: RunReport,
}

/// Fetch, parse, reconcile and fold every event into `aggregator`.
///
/// Events are fetched one after another with a pause after each successful
/// fetch; the lineups of one event are fetched in parallel. Lineups land in a
/// run-wide cache, so a boat is never fetched twice. An event that fails to
/// fetch or parse is skipped and reported. Fails only when every event did.
pub async fn run_events<T, K>(
    transport: &T,
    endpoints: &Endpoints,
    events: &[EventRef],
    settings: &FetchSettings,
    aggregator: &mut AthleteAggregator<K>,
) -> Result<RunReport>
where
    T: Transport,
    K: IdentityKey,
{
    let mut report = RunReport {
        events_total: events.len(),
        ..Default::default()
    };
    let mut lineups = LineupCache::new();
    let excluded_before = aggregator.excluded_rows();
    let duplicates_before = aggregator.duplicates();

    for (i, event) in events.iter().enumerate() {
        let body = match fetch_event(
            transport,
            endpoints,
            event,
            &settings.retry,
            settings.event_timeout,
        )
        .await
        {
            Ok(body) => body,
            Err(e) => {
                warn!(job_id = %event.job_id, event_id = %event.event_id, error = %e, "skipping event");
                report.skipped.push(SkippedEvent {
                    event: event.clone(),
                    reason: e.to_string(),
                });
                continue;
            }
        };

        match parse_event(&body, &event.job_id) {
            Ok(parsed) => {
                report.events_parsed += 1;
                report.lineups_fetched += lineups
                    .resolve_all(
                        transport,
                        endpoints,
                        &parsed.boats,
                        settings.lineup_concurrency,
                        settings.lineup_timeout,
                    )
                    .await;

                for row in &parsed.rows {
                    let lineup = row
                        .boat_id
                        .as_ref()
                        .and_then(|boat_id| lineups.get(&BoatRef::new(event.job_id.clone(), boat_id.clone())));
                    let members = reconcile(row, lineup);
                    if members.is_empty() {
                        report.dropped_rows += 1;
                        continue;
                    }
                    aggregator.add(row, &members);
                }
                report.rows += parsed.rows.len();

                info!(
                    event = %parsed.name,
                    job_id = %event.job_id,
                    event_id = %event.event_id,
                    rows = parsed.rows.len(),
                    boats = parsed.boats.len(),
                    "processed event"
                );
            }
            Err(e) => {
                warn!(job_id = %event.job_id, event_id = %event.event_id, error = %e, "skipping malformed event payload");
                report.skipped.push(SkippedEvent {
                    event: event.clone(),
                    reason: format!("{:#}", e),
                });
            }
        }

        // Rate limit between successful fetches
        if i + 1 < events.len() && !settings.event_delay.is_zero() {
            debug!(delay = ?settings.event_delay, "pausing before next event");
            tokio::time::sleep(settings.event_delay).await;
        }
    }

    report.athletes = aggregator.len();
    report.excluded_rows = aggregator.excluded_rows() - excluded_before;
    report.duplicates = aggregator.duplicates() - duplicates_before;

    if report.events_parsed == 0 && !events.is_empty() {
        anyhow::bail!(
            "All {} events failed. Check your network connection and the listing.",
            events.len()
        );
    }

    Ok(report)
}

/// Run the whole pipeline with the default identity (trimmed display name)
pub async fn fetch_and_aggregate<T: Transport>(
    transport: &T,
    endpoints: &Endpoints,
    events: &[EventRef],
    settings: &FetchSettings,
) -> Result<RunOutcome> {
    let mut aggregator = AthleteAggregator::new();
    let report = run_events(transport, endpoints, events, settings, &mut aggregator).await?;
    Ok(RunOutcome {
        records: aggregator.into_records(),
        report,
    })
}

/// Apply the optional pre-filter, then score. Returns the records that were
/// scored (what the athlete export should contain) and the ranking.
pub fn filter_and_score(
    records: BTreeMap<String, AthleteRecord>,
    scoring: &ScoringConfig,
    filter: Option<&FilterConfig>,
) -> (BTreeMap<String, AthleteRecord>, Vec<AthleteScore>) {
    let records = match filter {
        Some(filter) => {
            let kept = filter_athletes(&records, filter);
            debug!(before = records.len(), after = kept.len(), "applied athlete pre-filter");
            kept
        }
        None => records,
    };
    let scores = score_athletes(&records, scoring);
    (records, scores)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::regatta::client::fake::FakeTransport;
    use crate::regatta::{FetchError, RetryPolicy};
    use serde_json::json;
    use std::time::Duration;

    fn settings() -> FetchSettings {
        FetchSettings {
            retry: RetryPolicy::new(2, Duration::ZERO),
            event_delay: Duration::ZERO,
            ..FetchSettings::default()
        }
    }

    fn endpoints() -> Endpoints {
        Endpoints::new("https://rc.test")
    }

    fn lineup_html(lines: &[&str]) -> String {
        let body: String = lines.iter().map(|l| format!("<div>{}</div>\n", l)).collect();
        format!("<html><body>{}</body></html>", body)
    }

    /// Two clubs share boat id 100 upstream; Lakeside's crew has no lineup
    fn setup() -> (FakeTransport, Vec<EventRef>) {
        let transport = FakeTransport::new();
        let eights = EventRef::new("9168", "1");
        let fours = EventRef::new("9168", "2");
        let broken = EventRef::new("9168", "3");
        let malformed = EventRef::new("9168", "4");

        transport.respond(
            endpoints().event_results(&eights),
            Ok(json!({
                "long_desc": "Women's U17 8+",
                "races": [{
                    "stageName": "Final",
                    "results": [
                        { "boatId": 100, "boatLabel": "Riverside A", "orgName": "Riverside", "place": "1", "lane": 3, "finishTimeString": "6:50.0" },
                        { "boatId": 101, "boatLabel": "Harbour A", "orgName": "Harbour", "place": "2", "lane": 4, "finishTimeString": "6:55.0" },
                        { "boatLabel": "Lakeside A", "orgName": "Lakeside", "place": "3", "lane": 2, "finishTimeString": "7:01.0" },
                        { "boatId": 102, "boatLabel": "Dockside", "orgName": "Dockside", "place": "999", "lane": 1, "finishTimeString": "9:99" },
                        { "boatLabel": "", "orgName": "Ghost", "place": "4", "finishTimeString": "7:30.0" }
                    ]
                }]
            })
            .to_string()),
        );
        transport.respond(
            endpoints().event_results(&fours),
            Ok(json!({
                "event_label": "Women's U17 4+",
                "races": [{
                    "results": [
                        { "boatId": 100, "boatLabel": "Riverside B", "orgName": "Riverside", "place": "1", "finishTimeString": "7:40.0" },
                        { "boatId": 101, "boatLabel": "Harbour B", "orgName": "Harbour", "place": "2", "finishTimeString": "7:45.0" }
                    ]
                }]
            })
            .to_string()),
        );
        transport.respond(endpoints().event_results(&broken), Err(FetchError::Status(500)));
        transport.respond(endpoints().event_results(&malformed), Ok("<html>maintenance</html>".to_string()));

        // Boat 100 is stale: it lists a Riverside and a Harbour rower
        transport.respond(
            endpoints().lineup(&BoatRef::new("9168", "100")),
            Ok(lineup_html(&[
                "1: Ada Lovelace - 16 (Riverside)",
                "2: Hana Harbour - 17 (Harbour)",
            ])),
        );
        transport.respond(
            endpoints().lineup(&BoatRef::new("9168", "101")),
            Ok(lineup_html(&["1: Bea Brown - 15 (Harbour)"])),
        );
        transport.respond(
            endpoints().lineup(&BoatRef::new("9168", "102")),
            Ok(lineup_html(&["1: Dee Dock - 16 (Dockside)"])),
        );

        (transport, vec![eights, fours, broken, malformed])
    }

    #[tokio::test]
    async fn test_full_run() {
        let (transport, events) = setup();
        let outcome = fetch_and_aggregate(&transport, &endpoints(), &events, &settings())
            .await
            .unwrap();
        let report = &outcome.report;

        assert_eq!(report.events_total, 4);
        assert_eq!(report.events_parsed, 2);
        assert_eq!(report.skipped.len(), 2);
        assert_eq!(report.skipped[0].event, EventRef::new("9168", "3"));
        assert!(report.skipped[0].reason.contains("2 attempts"));
        assert_eq!(report.rows, 7);
        assert_eq!(report.dropped_rows, 1);
        assert_eq!(report.excluded_rows, 1);
        assert_eq!(report.duplicates, 0);

        // Each lineup fetched once even though boats 100/101 race in both events
        assert_eq!(report.lineups_fetched, 3);
        assert_eq!(transport.calls_to(&endpoints().lineup(&BoatRef::new("9168", "100"))), 1);

        let records = &outcome.records;
        let names: Vec<_> = records.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["Ada Lovelace", "Bea Brown", "Lakeside A"]);

        // Reused boat id: only the Riverside rower is credited to Riverside's result
        assert_eq!(records["Ada Lovelace"].races.len(), 2);
        assert!(!records.contains_key("Hana Harbour"));
        assert_eq!(records["Bea Brown"].races.len(), 2);
        // Synthetic crew from the boat label
        assert_eq!(records["Lakeside A"].races[0].seat, None);
        assert_eq!(records["Lakeside A"].age, None);
        // Disqualified boat contributes nothing
        assert!(!records.contains_key("Dee Dock"));
    }

    #[tokio::test]
    async fn test_scores_after_run() {
        let (transport, events) = setup();
        let outcome = fetch_and_aggregate(&transport, &endpoints(), &events, &settings())
            .await
            .unwrap();
        let (records, scores) = filter_and_score(outcome.records, &ScoringConfig::default(), None);
        assert_eq!(records.len(), 3);

        // Five placed boats in the eights final, the 999 and unlabelled ones included
        // Ada: 8+ u17 (2.1) * (5 - 1) + 4+ u17 (1.75) * (2 - 1)
        let ada = scores.iter().find(|s| s.name == "Ada Lovelace").unwrap();
        assert!((ada.score - (2.1 * 4.0 + 1.75)).abs() < 1e-9);
        assert_eq!(scores[0].name, "Ada Lovelace");
    }

    #[tokio::test]
    async fn test_filter_drops_unknown_ages() {
        let (transport, events) = setup();
        let outcome = fetch_and_aggregate(&transport, &endpoints(), &events, &settings())
            .await
            .unwrap();
        let (records, scores) = filter_and_score(
            outcome.records,
            &ScoringConfig::default(),
            Some(&FilterConfig::default()),
        );
        // Lakeside A has no age, so only lineup athletes survive
        assert_eq!(records.keys().collect::<Vec<_>>(), vec!["Ada Lovelace", "Bea Brown"]);
        assert_eq!(scores.len(), 2);
    }

    #[tokio::test]
    async fn test_all_events_failing_is_error() {
        let transport = FakeTransport::new();
        let events = vec![EventRef::new("1", "1"), EventRef::new("1", "2")];
        let err = fetch_and_aggregate(&transport, &endpoints(), &events, &settings())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("All 2 events failed"));
    }

    #[tokio::test]
    async fn test_rerunning_same_events_into_one_aggregator_adds_nothing() {
        let (transport, events) = setup();
        let mut aggregator = AthleteAggregator::new();
        run_events(&transport, &endpoints(), &events, &settings(), &mut aggregator)
            .await
            .unwrap();
        let first: usize = aggregator.records().values().map(|r| r.races.len()).sum();
        let report = run_events(&transport, &endpoints(), &events, &settings(), &mut aggregator)
            .await
            .unwrap();
        let second: usize = aggregator.records().values().map(|r| r.races.len()).sum();
        assert_eq!(first, second);
        assert_eq!(report.duplicates, first);
        assert_eq!(report.excluded_rows, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_only_after_successful_fetches() {
        let transport = FakeTransport::new();
        let events = vec![
            EventRef::new("1", "1"),
            EventRef::new("1", "2"),
            EventRef::new("1", "3"),
        ];
        let payload = json!({
            "long_desc": "Women's U17 8+",
            "races": [{ "results": [{ "boatLabel": "Crew", "place": "1", "finishTimeString": "7:00.0" }] }]
        })
        .to_string();
        transport.respond(endpoints().event_results(&events[0]), Ok(payload.clone()));
        transport.respond(endpoints().event_results(&events[1]), Err(FetchError::Status(500)));
        transport.respond(endpoints().event_results(&events[2]), Ok(payload));

        let settings = FetchSettings {
            retry: RetryPolicy::new(2, Duration::from_millis(200)),
            event_delay: Duration::from_millis(100),
            ..FetchSettings::default()
        };

        let start = tokio::time::Instant::now();
        let outcome = fetch_and_aggregate(&transport, &endpoints(), &events, &settings)
            .await
            .unwrap();
        let elapsed = start.elapsed();

        // 100ms after the first event, one 200ms retry wait, nothing after the failure or the last event
        assert!(elapsed >= Duration::from_millis(300), "elapsed {:?}", elapsed);
        assert!(elapsed < Duration::from_millis(400), "elapsed {:?}", elapsed);
        assert_eq!(outcome.report.events_parsed, 2);
        assert_eq!(transport.calls_to(&endpoints().event_results(&events[1])), 2);
    }
}
