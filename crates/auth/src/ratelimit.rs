use std::time::Duration;

use dashmap::DashMap;

/// Outcome of a rate limit check.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitResult {
    pub allowed: bool,
    pub limit: u64,
    pub retry_after_secs: u64,
}

struct Window {
    start_secs: u64,
    count: u64,
}

/// In-process sliding-window-approximation rate limiter (per §4.6: per-phone
/// and per-IP issuance caps, per-phone verify-attempt caps).
///
/// Uses the same weighted previous/current window approximation as a
/// distributed limiter backed by a shared counter store, but keyed directly
/// in a `DashMap` since a single night-watch node needs no cross-instance
/// coordination.
pub struct RateLimiter {
    windows: DashMap<String, Window>,
    limit: u64,
    window_secs: u64,
}

impl RateLimiter {
    pub fn new(limit: u64, window: Duration) -> Self {
        Self {
            windows: DashMap::new(),
            limit,
            window_secs: window.as_secs().max(1),
        }
    }

    /// Checks and records one request for `key` at `now`. `now` is passed in
    /// (rather than read from the system clock) so tests can drive it.
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn check(&self, key: &str, now_secs: u64) -> RateLimitResult {
        let current_window_start = (now_secs / self.window_secs) * self.window_secs;
        let elapsed = now_secs - current_window_start;
        let weight = (self.window_secs.saturating_sub(elapsed)) as f64 / self.window_secs as f64;

        let mut entry = self.windows.entry(key.to_string()).or_insert(Window {
            start_secs: current_window_start,
            count: 0,
        });

        let prev_count = if entry.start_secs == current_window_start {
            0
        } else if entry.start_secs == current_window_start.saturating_sub(self.window_secs) {
            entry.count
        } else {
            0
        };

        if entry.start_secs != current_window_start {
            entry.start_secs = current_window_start;
            // The just-replaced count becomes the previous window's count
            // for this single check; we don't keep two windows in storage,
            // trading a little precision at the boundary for simplicity.
        }

        let effective = (prev_count as f64 * weight) as u64 + entry.count;
        let reset_after = self.window_secs.saturating_sub(elapsed).max(1);

        if effective >= self.limit {
            return RateLimitResult {
                allowed: false,
                limit: self.limit,
                retry_after_secs: reset_after,
            };
        }

        entry.count += 1;
        RateLimitResult {
            allowed: true,
            limit: self.limit,
            retry_after_secs: reset_after,
        }
    }

    /// Drops tracking state for `key`, used after a successful verification
    /// so a fresh OTP cycle starts with a clean attempt counter.
    pub fn reset(&self, key: &str) {
        self.windows.remove(key);
    }
}
