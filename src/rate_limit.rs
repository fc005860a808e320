//! Per-client request throttling
//!
//! Each limiter counts hits per key in fixed windows. A key is the client
//! address plus the route, so limits apply per client and per endpoint.

use std::time::{Duration, Instant};

use axum::http::Method;
use dashmap::DashMap;

use crate::config::Config;
use crate::error::{AppError, Result};

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    hits: u32,
}

#[derive(Debug)]
pub struct FixedWindowLimiter {
    limit: u32,
    window: Duration,
    windows: DashMap<String, Window>,
}

impl FixedWindowLimiter {
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            limit,
            window,
            windows: DashMap::new(),
        }
    }

    pub fn check(&self, key: &str) -> Result<()> {
        self.check_at(key, Instant::now())
    }

    /// Records one hit for `key` at `now`, or fails with `TooManyRequests`
    /// once the current window is full.
    pub fn check_at(&self, key: &str, now: Instant) -> Result<()> {
        let mut entry = self
            .windows
            .entry(key.to_string())
            .or_insert(Window { started: now, hits: 0 });

        let elapsed = now.saturating_duration_since(entry.started);
        if elapsed >= self.window {
            *entry = Window { started: now, hits: 0 };
        }

        if entry.hits >= self.limit {
            let retry_after = self.window - now.saturating_duration_since(entry.started);
            return Err(AppError::TooManyRequests { retry_after });
        }

        entry.hits += 1;
        Ok(())
    }

    /// Drops windows that ended before `now`. Returns how many were removed.
    pub fn prune(&self, now: Instant) -> usize {
        let before = self.windows.len();
        self.windows
            .retain(|_, w| now.saturating_duration_since(w.started) < self.window);
        before - self.windows.len()
    }
}

/// Throttling policies of the API
#[derive(Debug)]
pub struct RateLimits {
    /// Every API route without a stricter policy
    pub default: FixedWindowLimiter,
    /// Sign-up and sign-in
    pub auth: FixedWindowLimiter,
    /// Link creation
    pub create: FixedWindowLimiter,
}

impl RateLimits {
    pub fn from_config(config: &Config) -> Self {
        let window = Duration::from_secs(config.rate_limit_window_secs);
        Self {
            default: FixedWindowLimiter::new(config.rate_limit_default, window),
            auth: FixedWindowLimiter::new(config.rate_limit_auth, window),
            create: FixedWindowLimiter::new(config.rate_limit_create, window),
        }
    }

    /// Picks the limiter for a matched route.
    pub fn limiter_for(&self, method: &Method, route: &str) -> &FixedWindowLimiter {
        match route {
            "/auth/sign-up" | "/auth/sign-in" => &self.auth,
            "/urls" if *method == Method::POST => &self.create,
            _ => &self.default,
        }
    }

    pub fn prune(&self, now: Instant) -> usize {
        self.default.prune(now) + self.auth.prune(now) + self.create.prune(now)
    }
}
