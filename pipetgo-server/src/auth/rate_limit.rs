//! Sliding-window rate limiting for the credential endpoints

use std::collections::{HashMap, VecDeque};
use std::net::IpAddr;
use std::time::{Duration, Instant};

use axum::http::HeaderMap;
use tokio::sync::Mutex;

/// Limit for one endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub limit: u32,
    pub window: Duration,
}

impl RateLimitConfig {
    /// Sign-in: 5 attempts per 15 minutes per client IP.
    pub const LOGIN: Self = Self {
        limit: 5,
        window: Duration::from_secs(15 * 60),
    };
    /// Sign-up: 3 accounts per hour per client IP.
    pub const SIGNUP: Self = Self {
        limit: 3,
        window: Duration::from_secs(60 * 60),
    };
    /// Set-password: 5 attempts per hour per user.
    pub const SET_PASSWORD: Self = Self {
        limit: 5,
        window: Duration::from_secs(60 * 60),
    };
}

/// Outcome of a rate-limit check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed { remaining: u32 },
    Limited { retry_after: Duration, limit: u32 },
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed { .. })
    }
}

#[derive(Debug, Default)]
struct Windows {
    hits: HashMap<String, VecDeque<Instant>>,
    last_sweep: Option<Instant>,
}

impl Windows {
    /// Drop keys whose newest hit has left the window, at most once per window.
    fn sweep(&mut self, now: Instant, window: Duration) {
        if self
            .last_sweep
            .is_some_and(|last| now.duration_since(last) < window)
        {
            return;
        }
        self.hits
            .retain(|_, w| w.back().is_some_and(|t| now.duration_since(*t) < window));
        self.last_sweep = Some(now);
    }
}

/// In-memory sliding window keyed by identifier (IP or user id)
#[derive(Debug)]
pub struct RateLimiter {
    scope: &'static str,
    config: RateLimitConfig,
    enabled: bool,
    windows: Mutex<Windows>,
}

impl RateLimiter {
    pub fn new(scope: &'static str, config: RateLimitConfig, enabled: bool) -> Self {
        Self {
            scope,
            config,
            enabled,
            windows: Mutex::new(Windows::default()),
        }
    }

    /// Record an attempt for `key` and decide whether it may proceed.
    pub async fn check(&self, key: &str) -> Decision {
        self.check_at(key, Instant::now()).await
    }

    async fn check_at(&self, key: &str, now: Instant) -> Decision {
        if !self.enabled {
            return Decision::Allowed {
                remaining: self.config.limit,
            };
        }

        let mut windows = self.windows.lock().await;
        windows.sweep(now, self.config.window);
        let window = windows.hits.entry(key.to_owned()).or_default();
        while window
            .front()
            .is_some_and(|t| now.duration_since(*t) >= self.config.window)
        {
            window.pop_front();
        }

        if window.len() as u32 >= self.config.limit {
            let oldest = window.front().copied().unwrap_or(now);
            let retry_after = self
                .config
                .window
                .saturating_sub(now.duration_since(oldest));
            tracing::warn!(scope = self.scope, key, "rate limit exceeded");
            return Decision::Limited {
                retry_after,
                limit: self.config.limit,
            };
        }

        window.push_back(now);
        Decision::Allowed {
            remaining: self.config.limit - window.len() as u32,
        }
    }
}

/// Client IP from proxy headers: `cf-connecting-ip`, then `x-real-ip`,
/// then the first `x-forwarded-for` entry, else loopback.
pub fn client_ip(headers: &HeaderMap) -> String {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    header("cf-connecting-ip")
        .or_else(|| header("x-real-ip"))
        .or_else(|| header("x-forwarded-for").and_then(|v| v.split(',').next()).map(str::trim))
        .filter(|ip| ip.parse::<IpAddr>().is_ok())
        .map(str::to_owned)
        .unwrap_or_else(|| "127.0.0.1".to_owned())
}
