use anyhow::{Context, Result};
use std::future::Future;
use std::time::Duration;

use super::error::FetchError;
use super::types::{BoatRef, EventRef};
use crate::config::FetchSettings;

/// Minimal HTTP seam: GET a URL and return its body as text.
///
/// Non-success statuses are errors. Every fetch carries its own timeout.
pub trait Transport: Sync {
    fn get_text(
        &self,
        url: &str,
        timeout: Duration,
    ) -> impl Future<Output = Result<String, FetchError>> + Send;
}

/// Transport backed by a shared reqwest client
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Transport for HttpTransport {
    async fn get_text(&self, url: &str, timeout: Duration) -> Result<String, FetchError> {
        let response = self.client.get(url).timeout(timeout).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        Ok(response.text().await?)
    }
}

/// Create the HTTP client used for every upstream request
pub fn create_client(settings: &FetchSettings) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(settings.user_agent.clone())
        .build()
        .context("Failed to create HTTP client")
}

/// URL builders for the results service
#[derive(Debug, Clone)]
pub struct Endpoints {
    base_url: String,
}

impl Endpoints {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn event_results(&self, event: &EventRef) -> String {
        format!(
            "{}/servlet/DisplayRacesResults?Method=getResults&job_id={}&event_id={}",
            self.base_url, event.job_id, event.event_id
        )
    }

    pub fn lineup(&self, boat: &BoatRef) -> String {
        format!(
            "{}/servlet/LineupServlet?Method=getLineupHtml&job_id={}&boat_id={}",
            self.base_url, boat.job_id, boat.boat_id
        )
    }

    /// Resolve a listing href against the base URL
    pub fn absolute(&self, href: &str) -> String {
        if href.starts_with("http://") || href.starts_with("https://") {
            href.to_string()
        } else if href.starts_with('/') {
            format!("{}{}", self.base_url, href)
        } else {
            format!("{}/{}", self.base_url, href)
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_urls() {
        let endpoints = Endpoints::new("https://www.regattacentral.com/");
        assert_eq!(
            endpoints.event_results(&EventRef::new("9168", "12")),
            "https://www.regattacentral.com/servlet/DisplayRacesResults?Method=getResults&job_id=9168&event_id=12"
        );
        assert_eq!(
            endpoints.lineup(&BoatRef::new("9168", "777")),
            "https://www.regattacentral.com/servlet/LineupServlet?Method=getLineupHtml&job_id=9168&boat_id=777"
        );
    }

    #[test]
    fn test_absolute_href() {
        let endpoints = Endpoints::new("https://host.example");
        assert_eq!(endpoints.absolute("/a?b=1"), "https://host.example/a?b=1");
        assert_eq!(endpoints.absolute("a"), "https://host.example/a");
        assert_eq!(endpoints.absolute("http://other/x"), "http://other/x");
    }
}
