//! Request pacing and ADS rate-limit header tracking.

use crate::types::RateLimits;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::{Duration, Instant};

/// Paces outgoing requests and remembers the quota ADS last reported.
///
/// ADS sends `X-RateLimit-Limit`, `X-RateLimit-Remaining` and
/// `X-RateLimit-Reset` (unix seconds) on every response. When the remaining
/// quota hits zero, [`acquire`](Self::acquire) sleeps until the reset time.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    inner: Arc<Mutex<LimiterState>>,
}

#[derive(Debug)]
struct LimiterState {
    min_interval: Duration,
    last_request: Option<Instant>,
    reported: RateLimits,
    reset_at: Option<Instant>,
}

impl RateLimiter {
    /// Allow at most `max_per_second` requests per second.
    pub fn new(max_per_second: f64) -> Self {
        let min_interval = if max_per_second > 0.0 {
            Duration::from_secs_f64(1.0 / max_per_second)
        } else {
            Duration::ZERO
        };
        Self {
            inner: Arc::new(Mutex::new(LimiterState {
                min_interval,
                last_request: None,
                reported: RateLimits::default(),
                reset_at: None,
            })),
        }
    }

    /// Wait until a request may be sent, then record it.
    pub async fn acquire(&self) {
        let wait = {
            let state = self.inner.lock().await;
            let now = Instant::now();

            let quota_wait = match (state.reported.remaining, state.reset_at) {
                (Some(0), Some(reset)) if reset > now => reset - now,
                _ => Duration::ZERO,
            };
            let pacing_wait = state
                .last_request
                .map(|last| state.min_interval.saturating_sub(last.elapsed()))
                .unwrap_or(Duration::ZERO);

            quota_wait.max(pacing_wait)
        };

        if !wait.is_zero() {
            tracing::debug!(wait_ms = wait.as_millis() as u64, "rate limit: waiting");
            tokio::time::sleep(wait).await;
        }

        self.inner.lock().await.last_request = Some(Instant::now());
    }

    /// Record the quota headers of a response.
    pub async fn update_from_headers(&self, headers: &reqwest::header::HeaderMap) {
        let read = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok())
        };

        let mut state = self.inner.lock().await;
        if let Some(limit) = read("x-ratelimit-limit") {
            state.reported.limit = Some(limit);
        }
        if let Some(remaining) = read("x-ratelimit-remaining") {
            state.reported.remaining = Some(remaining);
        }
        if let Some(reset) = read("x-ratelimit-reset") {
            state.reported.reset = Some(reset);
            let now_unix = std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs();
            state.reset_at =
                (reset > now_unix).then(|| Instant::now() + Duration::from_secs(reset - now_unix));
        }
    }

    /// The quota ADS reported on the most recent response.
    pub async fn limits(&self) -> RateLimits {
        self.inner.lock().await.reported.clone()
    }
}
