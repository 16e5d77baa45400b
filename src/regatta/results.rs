use std::time::Duration;
use tokio_retry::strategy::FixedInterval;
use tokio_retry::Retry;
use tracing::{debug, warn};

use super::client::{Endpoints, Transport};
use super::error::FetchError;
use super::types::EventRef;

/// Fixed-delay retry budget for event fetches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    delay: Duration,
}

impl RetryPolicy {
    /// `max_attempts` counts the first try; values below 1 are raised to 1
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Delays between attempts: one fewer than the attempt budget
    pub fn strategy(&self) -> impl Iterator<Item = Duration> {
        FixedInterval::new(self.delay).take(self.max_attempts as usize - 1)
    }

    /// Run `action` until it succeeds or the budget is spent
    pub async fn run<T, F, Fut>(&self, mut action: F) -> Result<T, FetchError>
    where
        F: FnMut(u32) -> Fut,
        Fut: std::future::Future<Output = Result<T, FetchError>>,
    {
        let mut attempt = 0;
        Retry::spawn(self.strategy(), || {
            attempt += 1;
            action(attempt)
        })
        .await
        .map_err(|last| FetchError::RetryExhausted {
            attempts: self.max_attempts,
            last: Box::new(last),
        })
    }
}

/// Fetch the raw results payload for one event.
///
/// Transport failures, non-success statuses and blank bodies are all retried.
/// Exhausting the budget returns `FetchError::RetryExhausted`; callers skip the event.
pub async fn fetch_event<T: Transport>(
    transport: &T,
    endpoints: &Endpoints,
    event: &EventRef,
    policy: &RetryPolicy,
    timeout: Duration,
) -> Result<String, FetchError> {
    let url = endpoints.event_results(event);

    policy
        .run(|attempt| {
            let url = url.as_str();
            async move {
                debug!(job_id = %event.job_id, event_id = %event.event_id, attempt, "fetching event results");
                let result = transport.get_text(url, timeout).await.and_then(|body| {
                    if body.trim().is_empty() {
                        Err(FetchError::EmptyBody)
                    } else {
                        Ok(body)
                    }
                });
                if let Err(ref e) = result {
                    warn!(job_id = %event.job_id, event_id = %event.event_id, attempt, error = %e, "event fetch attempt failed");
                }
                result
            }
        })
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::regatta::client::fake::FakeTransport;

    fn endpoints() -> Endpoints {
        Endpoints::new("https://rc.test")
    }

    fn no_wait(attempts: u32) -> RetryPolicy {
        RetryPolicy::new(attempts, Duration::ZERO)
    }

    #[test]
    fn test_strategy_yields_one_fewer_delay_than_attempts() {
        let policy = RetryPolicy::new(3, Duration::from_millis(250));
        let delays: Vec<_> = policy.strategy().collect();
        assert_eq!(delays, vec![Duration::from_millis(250); 2]);
    }

    #[test]
    fn test_zero_attempts_raised_to_one() {
        let policy = RetryPolicy::new(0, Duration::ZERO);
        assert_eq!(policy.max_attempts(), 1);
        assert_eq!(policy.strategy().count(), 0);
    }

    #[tokio::test]
    async fn test_fetch_event_first_try() {
        let event = EventRef::new("1", "2");
        let transport = FakeTransport::new();
        let url = endpoints().event_results(&event);
        transport.respond(url.clone(), Ok("{\"races\":[]}".to_string()));

        let body = fetch_event(&transport, &endpoints(), &event, &no_wait(3), Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(body, "{\"races\":[]}");
        assert_eq!(transport.calls_to(&url), 1);
    }

    #[tokio::test]
    async fn test_fetch_event_recovers_after_failures() {
        let event = EventRef::new("1", "2");
        let transport = FakeTransport::new();
        let url = endpoints().event_results(&event);
        transport.respond(url.clone(), Err(FetchError::Status(503)));
        transport.respond(url.clone(), Ok("   ".to_string()));
        transport.respond(url.clone(), Ok("{}".to_string()));

        let body = fetch_event(&transport, &endpoints(), &event, &no_wait(3), Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(body, "{}");
        assert_eq!(transport.calls_to(&url), 3);
    }

    #[tokio::test]
    async fn test_fetch_event_exhausts_retries() {
        let event = EventRef::new("1", "2");
        let transport = FakeTransport::new();
        let url = endpoints().event_results(&event);
        transport.respond(url.clone(), Err(FetchError::Timeout));

        let err = fetch_event(&transport, &endpoints(), &event, &no_wait(3), Duration::from_secs(1))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            FetchError::RetryExhausted {
                attempts: 3,
                last: Box::new(FetchError::Timeout)
            }
        );
        assert_eq!(transport.calls_to(&url), 3);
    }

    #[tokio::test]
    async fn test_empty_body_is_retryable_failure() {
        let event = EventRef::new("1", "3");
        let transport = FakeTransport::new();
        let url = endpoints().event_results(&event);
        transport.respond(url.clone(), Ok(String::new()));

        let err = fetch_event(&transport, &endpoints(), &event, &no_wait(2), Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::RetryExhausted { attempts: 2, .. }));
        assert!(err.to_string().contains("empty response body"));
    }
}
