use anyhow::{Context, Result};
use regex::Regex;
use scraper::{Html, Selector};
use std::collections::HashSet;
use std::path::Path;
use std::sync::LazyLock;
use tracing::info;

use super::client::{Endpoints, Transport};
use super::results::RetryPolicy;
use super::types::EventRef;

static LINK_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("link selector is valid"));
static JOB_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[?&;]job_id=(\d+)").expect("job_id pattern is valid"));
static EVENT_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[?&;]event_id=(\d+)").expect("event_id pattern is valid"));

/// Pull `job_id`/`event_id` out of an event results URL
pub fn event_ref_from_url(url: &str) -> Option<EventRef> {
    let url = url.replace("&amp;", "&");
    let job_id = JOB_ID.captures(&url)?.get(1)?.as_str().to_string();
    let event_id = EVENT_ID.captures(&url)?.get(1)?.as_str().to_string();
    Some(EventRef { job_id, event_id })
}

/// Every distinct event linked from a results listing page, in page order
pub fn extract_event_refs(html: &str) -> Vec<EventRef> {
    let document = Html::parse_document(html);
    let mut seen = HashSet::new();

    document
        .select(&LINK_SELECTOR)
        .filter_map(|a| a.value().attr("href"))
        .filter_map(event_ref_from_url)
        .filter(|event| seen.insert(event.clone()))
        .collect()
}

/// Every distinct event with its link resolved against the base URL, in page order
pub fn extract_event_links(html: &str, endpoints: &Endpoints) -> Vec<(EventRef, String)> {
    let document = Html::parse_document(html);
    let mut seen = HashSet::new();

    document
        .select(&LINK_SELECTOR)
        .filter_map(|a| a.value().attr("href"))
        .filter_map(|href| event_ref_from_url(href).map(|event| (event, href)))
        .filter(|(event, _)| seen.insert(event.clone()))
        .map(|(event, href)| (event, endpoints.absolute(href)))
        .collect()
}

/// Load the listing page from a URL or a saved file.
///
/// This is the one input the run cannot do without, so failures are returned
/// to the caller rather than skipped.
pub async fn load_listing<T: Transport>(
    transport: &T,
    source: &str,
    policy: &RetryPolicy,
    timeout: std::time::Duration,
) -> Result<String> {
    if source.starts_with("http://") || source.starts_with("https://") {
        info!(url = source, "fetching results listing");
        policy
            .run(|_| transport.get_text(source, timeout))
            .await
            .with_context(|| format!("Results listing unreachable at {}", source))
    } else {
        std::fs::read_to_string(Path::new(source))
            .with_context(|| format!("Failed to read results listing from {}", source))
    }
}
