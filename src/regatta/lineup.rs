use futures::stream::{FuturesUnordered, StreamExt};
use regex::Regex;
use scraper::Html;
use std::collections::HashMap;
use std::sync::LazyLock;
use std::time::Duration;
use tracing::{debug, warn};

use super::client::{Endpoints, Transport};
use super::types::{BoatRef, CrewMember};

/// `SEAT: NAME - AGE (CLUB)`, anchored at the start of a trimmed line
static LINEUP_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d+):\s*(.+?)\s*-\s*(\d+)\s*\((.+?)\)").expect("lineup pattern is valid")
});

/// Parse one line of lineup text; anything that doesn't match is ignored
pub fn parse_lineup_line(line: &str) -> Option<CrewMember> {
    let caps = LINEUP_LINE.captures(line.trim())?;
    Some(CrewMember {
        seat: caps[1].parse().ok(),
        name: caps[2].trim().to_string(),
        age: Some(caps[3].to_string()),
        club: Some(caps[4].trim().to_string()),
    })
}

/// Parse the lineup servlet's HTML into crew members, in listing order
pub fn parse_lineup_html(html: &str) -> Vec<CrewMember> {
    let document = Html::parse_document(html);
    let text = document.root_element().text().collect::<Vec<_>>().join("\n");
    text.lines().filter_map(parse_lineup_line).collect()
}

/// Fetch one lineup. Failures yield an empty crew; they are never retried.
pub async fn fetch_lineup<T: Transport>(
    transport: &T,
    endpoints: &Endpoints,
    boat: BoatRef,
    timeout: Duration,
) -> (BoatRef, Vec<CrewMember>) {
    let url = endpoints.lineup(&boat);
    match transport.get_text(&url, timeout).await {
        Ok(body) => {
            let crew = parse_lineup_html(&body);
            debug!(job_id = %boat.job_id, boat_id = %boat.boat_id, seats = crew.len(), "fetched lineup");
            (boat, crew)
        }
        Err(e) => {
            warn!(job_id = %boat.job_id, boat_id = %boat.boat_id, error = %e, "lineup unavailable");
            (boat, Vec::new())
        }
    }
}

/// Run-scoped lineup store. Each boat is fetched at most once per run.
#[derive(Debug, Default)]
pub struct LineupCache {
    lineups: HashMap<BoatRef, Vec<CrewMember>>,
    fetched: usize,
}

impl LineupCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, boat: &BoatRef) -> Option<&[CrewMember]> {
        self.lineups.get(boat).map(Vec::as_slice)
    }

    pub fn contains(&self, boat: &BoatRef) -> bool {
        self.lineups.contains_key(boat)
    }

    pub fn len(&self) -> usize {
        self.lineups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lineups.is_empty()
    }

    /// Network fetches issued so far
    pub fn fetched(&self) -> usize {
        self.fetched
    }

    /// Fetch every boat not yet cached, at most `concurrency` at a time.
    ///
    /// Results are collected per task and merged into the cache only after
    /// the whole batch has finished. Returns the number of fetches issued.
    pub async fn resolve_all<T: Transport>(
        &mut self,
        transport: &T,
        endpoints: &Endpoints,
        boats: &[BoatRef],
        concurrency: usize,
        timeout: Duration,
    ) -> usize {
        let mut pending: Vec<BoatRef> = Vec::new();
        for boat in boats {
            if !self.contains(boat) && !pending.contains(boat) {
                pending.push(boat.clone());
            }
        }
        if pending.is_empty() {
            return 0;
        }

        let issued = pending.len();
        let mut futures = FuturesUnordered::new();
        let mut pending_iter = pending.into_iter();
        let mut resolved = Vec::with_capacity(issued);

        // Fill initial batch
        for _ in 0..concurrency.max(1) {
            if let Some(boat) = pending_iter.next() {
                futures.push(fetch_lineup(transport, endpoints, boat, timeout));
            }
        }

        // Collect results and feed new tasks
        while let Some(result) = futures.next().await {
            resolved.push(result);
            if let Some(boat) = pending_iter.next() {
                futures.push(fetch_lineup(transport, endpoints, boat, timeout));
            }
        }

        for (boat, crew) in resolved {
            self.lineups.insert(boat, crew);
        }
        self.fetched += issued;
        issued
    }

    /// Lineup for a single boat, fetching it on first use
    pub async fn resolve<T: Transport>(
        &mut self,
        transport: &T,
        endpoints: &Endpoints,
        boat: &BoatRef,
        timeout: Duration,
    ) -> Vec<CrewMember> {
        self.resolve_all(transport, endpoints, std::slice::from_ref(boat), 1, timeout)
            .await;
        self.get(boat).map(<[CrewMember]>::to_vec).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::regatta::client::fake::FakeTransport;
    use crate::regatta::error::FetchError;

    const LINEUP_HTML: &str = r#"<html><body>
<div class="lineup">
<p>Cox: Sam Small - 15 (Riverside RC)</p>
<p>1: Ada Lovelace - 16 (Riverside RC)</p>
<p>2:   Grace Hopper  -  17 ( Harbour Club )</p>
<p>Coach: Someone</p>
<p>3: Mary-Ann Smith - 15 (Riverside RC)</p>
</div>
</body></html>"#;

    fn endpoints() -> Endpoints {
        Endpoints::new("https://rc.test")
    }

    #[test]
    fn test_parse_lineup_line() {
        let member = parse_lineup_line("  4: Jo Bloggs - 16 (Lake Crew)  ").unwrap();
        assert_eq!(member.seat, Some(4));
        assert_eq!(member.name, "Jo Bloggs");
        assert_eq!(member.age.as_deref(), Some("16"));
        assert_eq!(member.club.as_deref(), Some("Lake Crew"));
    }

    #[test]
    fn test_parse_lineup_line_rejects_other_text() {
        assert!(parse_lineup_line("Coach: Someone").is_none());
        assert!(parse_lineup_line("1: No Age Given (Club)").is_none());
        assert!(parse_lineup_line("").is_none());
    }

    #[test]
    fn test_parse_lineup_html() {
        let crew = parse_lineup_html(LINEUP_HTML);
        let names: Vec<_> = crew.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["Ada Lovelace", "Grace Hopper", "Mary-Ann Smith"]);
        assert_eq!(crew[1].club.as_deref(), Some("Harbour Club"));
        assert_eq!(crew[2].seat, Some(3));
    }

    #[tokio::test]
    async fn test_fetch_failure_yields_empty_lineup() {
        let transport = FakeTransport::new();
        let boat = BoatRef::new("1", "9");
        transport.respond(endpoints().lineup(&boat), Err(FetchError::Status(500)));

        let (returned, crew) =
            fetch_lineup(&transport, &endpoints(), boat.clone(), Duration::from_secs(1)).await;
        assert_eq!(returned, boat);
        assert!(crew.is_empty());
        // Lineups are not retried
        assert_eq!(transport.total_calls(), 1);
    }

    #[tokio::test]
    async fn test_same_boat_fetched_once_per_run() {
        let transport = FakeTransport::new();
        let boat = BoatRef::new("9168", "42");
        transport.respond(endpoints().lineup(&boat), Ok(LINEUP_HTML.to_string()));
        let mut cache = LineupCache::new();

        let first = cache
            .resolve(&transport, &endpoints(), &boat, Duration::from_secs(1))
            .await;
        let second = cache
            .resolve(&transport, &endpoints(), &boat, Duration::from_secs(1))
            .await;

        assert_eq!(first, second);
        assert_eq!(first.len(), 3);
        assert_eq!(transport.calls_to(&endpoints().lineup(&boat)), 1);
        assert_eq!(cache.fetched(), 1);
    }

    #[tokio::test]
    async fn test_resolve_all_dedupes_and_skips_cached() {
        let transport = FakeTransport::new();
        let boats: Vec<_> = (1..=20).map(|i| BoatRef::new("7", i.to_string())).collect();
        for boat in &boats {
            transport.respond(endpoints().lineup(boat), Ok(LINEUP_HTML.to_string()));
        }
        let mut cache = LineupCache::new();

        let mut requested = boats.clone();
        requested.extend(boats.iter().take(5).cloned());
        let issued = cache
            .resolve_all(&transport, &endpoints(), &requested, 8, Duration::from_secs(1))
            .await;
        assert_eq!(issued, 20);
        assert_eq!(cache.len(), 20);

        let issued = cache
            .resolve_all(&transport, &endpoints(), &boats[..10], 8, Duration::from_secs(1))
            .await;
        assert_eq!(issued, 0);
        assert_eq!(transport.total_calls(), 20);
    }

    #[tokio::test]
    async fn test_failed_lineup_is_cached_as_empty() {
        let transport = FakeTransport::new();
        let boat = BoatRef::new("7", "404");
        let mut cache = LineupCache::new();

        cache
            .resolve_all(&transport, &endpoints(), &[boat.clone()], 4, Duration::from_secs(1))
            .await;
        assert_eq!(cache.get(&boat), Some(&[][..]));
    }
}
