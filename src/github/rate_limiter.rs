use std::sync::Mutex;

use chrono::{DateTime, TimeZone, Utc};
use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use serde::Serialize;

const LIMIT_HEADER: &str = "x-ratelimit-limit";
const REMAINING_HEADER: &str = "x-ratelimit-remaining";
const RESET_HEADER: &str = "x-ratelimit-reset";

/// Quota state reported by the most recent GitHub response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RateLimitSnapshot {
    pub limit: Option<u32>,
    pub remaining: u32,
    pub reset_at: Option<DateTime<Utc>>,
}

impl RateLimitSnapshot {
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let remaining = header_value::<u32>(headers, REMAINING_HEADER)?;
        Some(Self {
            limit: header_value(headers, LIMIT_HEADER),
            remaining,
            reset_at: header_value::<i64>(headers, RESET_HEADER)
                .and_then(|ts| Utc.timestamp_opt(ts, 0).single()),
        })
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining == 0
    }

    fn is_low(&self) -> bool {
        match self.limit {
            Some(limit) if limit > 0 => (self.remaining as u64) * 10 < limit as u64,
            _ => false,
        }
    }
}

fn header_value<T: std::str::FromStr>(headers: &HeaderMap, name: &str) -> Option<T> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}

/// Whether a response is GitHub refusing service because the quota ran out,
/// as opposed to a permissions problem.
pub fn is_rate_limited(status: StatusCode, snapshot: Option<&RateLimitSnapshot>) -> bool {
    let throttled = status == StatusCode::FORBIDDEN || status == StatusCode::TOO_MANY_REQUESTS;
    throttled && snapshot.is_some_and(RateLimitSnapshot::is_exhausted)
}

/// Tracks GitHub's rate-limit headers across every response the client sees.
/// It only observes; the client decides what an exhausted quota means.
#[derive(Debug, Default)]
pub struct RateLimiter {
    latest: Mutex<Option<RateLimitSnapshot>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the quota carried by `headers`, returning it when present.
    pub fn update_from_headers(&self, headers: &HeaderMap) -> Option<RateLimitSnapshot> {
        let snapshot = RateLimitSnapshot::from_headers(headers)?;

        if snapshot.is_low() {
            tracing::warn!(
                "GitHub rate limit running low: {} of {} requests left",
                snapshot.remaining,
                snapshot.limit.unwrap_or_default()
            );
        }

        if let Ok(mut latest) = self.latest.lock() {
            *latest = Some(snapshot);
        }
        Some(snapshot)
    }

    pub fn snapshot(&self) -> Option<RateLimitSnapshot> {
        self.latest.lock().ok().and_then(|latest| *latest)
    }
}
