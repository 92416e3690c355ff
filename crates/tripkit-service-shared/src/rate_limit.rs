//! Per-client fixed-window rate limiting.

use std::time::Duration;

use dashmap::DashMap;
use tokio::time::Instant;

use crate::config::RateLimitConfig;

/// Expired windows are swept once the table grows past this many clients.
const PRUNE_THRESHOLD: usize = 1024;

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

/// Outcome of a [`RateLimiter::check`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateDecision {
    pub allowed: bool,
    pub remaining: u32,
    /// Time until the client's window resets.
    pub retry_after: Duration,
}

/// Fixed-window counter keyed by client IP.
///
/// Each client may make `max_requests` calls per window. The window starts
/// at the client's first request and resets once it has fully elapsed.
#[derive(Debug)]
pub struct RateLimiter {
    config: RateLimitConfig,
    windows: DashMap<String, Window>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            windows: DashMap::new(),
        }
    }

    pub fn config(&self) -> RateLimitConfig {
        self.config
    }

    /// Count one request from `client` and decide whether it may proceed.
    pub fn check(&self, client: &str) -> RateDecision {
        let now = Instant::now();
        if self.windows.len() > PRUNE_THRESHOLD {
            self.prune(now);
        }

        let mut entry = self
            .windows
            .entry(client.to_string())
            .or_insert(Window {
                started: now,
                count: 0,
            });

        let window = entry.value_mut();
        if now.duration_since(window.started) >= self.config.window {
            *window = Window {
                started: now,
                count: 0,
            };
        }

        let retry_after = self
            .config
            .window
            .saturating_sub(now.duration_since(window.started));

        if window.count >= self.config.max_requests {
            tracing::debug!(client, "rate limit exceeded");
            return RateDecision {
                allowed: false,
                remaining: 0,
                retry_after,
            };
        }

        window.count += 1;
        RateDecision {
            allowed: true,
            remaining: self.config.max_requests - window.count,
            retry_after,
        }
    }

    /// Number of clients currently tracked.
    pub fn tracked_clients(&self) -> usize {
        self.windows.len()
    }

    fn prune(&self, now: Instant) {
        let window = self.config.window;
        self.windows
            .retain(|_, w| now.duration_since(w.started) < window);
    }
}
