use chrono::{DateTime, TimeDelta, Utc};
use reqwest::header::HeaderMap;
use std::time::Duration;

use crate::utils::constants::{
    EPOCH_RESET_THRESHOLD, RATE_LIMIT_REMAINING_HEADER, RATE_LIMIT_RESET_HEADER,
};

/// Last rate-limit window reported by upstream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RateLimitState {
    pub remaining: Option<u64>,
    pub reset_at: Option<DateTime<Utc>>,
}

impl RateLimitState {
    /// Update from response headers. Returns false when no rate-limit
    /// headers were present and the state is unchanged.
    ///
    /// `X-Rate-Limit-Reset` is read as a unix timestamp when it is large
    /// enough to be one, otherwise as seconds until the reset.
    pub fn observe(&mut self, headers: &HeaderMap, now: DateTime<Utc>) -> bool {
        let remaining = header_number::<u64>(headers, RATE_LIMIT_REMAINING_HEADER);
        let reset = header_number::<i64>(headers, RATE_LIMIT_RESET_HEADER);
        if remaining.is_none() && reset.is_none() {
            return false;
        }
        self.remaining = remaining;
        self.reset_at = reset.and_then(|reset| {
            if reset >= EPOCH_RESET_THRESHOLD {
                DateTime::from_timestamp(reset, 0)
            } else {
                TimeDelta::try_seconds(reset).and_then(|delta| now.checked_add_signed(delta))
            }
        });
        true
    }

    /// How long to pause before the next request, if at all.
    pub fn wait_duration(&self, low_water: u64, now: DateTime<Utc>) -> Option<Duration> {
        let remaining = self.remaining?;
        if remaining >= low_water {
            return None;
        }
        self.until_reset(now)
    }

    /// Time left until the window resets, regardless of the remaining count.
    pub fn until_reset(&self, now: DateTime<Utc>) -> Option<Duration> {
        let reset_at = self.reset_at?;
        (reset_at - now).to_std().ok().filter(|wait| !wait.is_zero())
    }
}

fn header_number<T: std::str::FromStr>(headers: &HeaderMap, name: &str) -> Option<T> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<T>().ok())
}
