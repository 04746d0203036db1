//! Sliding-window rate limiting for the sensitive auth endpoints.
//!
//! Each route gets its own independently constructed [`RateLimiter`]
//! instance so tests can build isolated limiters instead of sharing
//! process-wide state.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::config::{RateLimitsConfig, RouteLimitConfig};

#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    pub max_attempts: usize,
    pub window: Duration,
}

impl From<RouteLimitConfig> for RateLimitConfig {
    fn from(cfg: RouteLimitConfig) -> Self {
        Self {
            max_attempts: cfg.max_attempts,
            window: Duration::from_secs(cfg.window_seconds),
        }
    }
}

/// Per-client-key sliding window counter. Check and record happen under a
/// single lock so two parallel requests cannot both pass the final slot.
#[derive(Debug)]
pub struct RateLimiter {
    config: RateLimitConfig,
    attempts: Mutex<HashMap<String, Vec<Instant>>>,
}

impl RateLimiter {
    #[must_use]
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            attempts: Mutex::new(HashMap::new()),
        }
    }

    #[must_use]
    pub const fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Records an attempt for `client_key`, returning false when the window
    /// is already full (the attempt is then not recorded).
    pub fn check(&self, client_key: &str) -> bool {
        let now = Instant::now();
        let mut attempts = self.attempts.lock().unwrap_or_else(|e| e.into_inner());

        let entries = attempts.entry(client_key.to_string()).or_default();
        entries.retain(|t| now.duration_since(*t) < self.config.window);

        if entries.len() >= self.config.max_attempts {
            return false;
        }
        entries.push(now);
        true
    }

    /// Attempts left in the current window for `client_key`.
    #[must_use]
    pub fn remaining(&self, client_key: &str) -> usize {
        let now = Instant::now();
        let mut attempts = self.attempts.lock().unwrap_or_else(|e| e.into_inner());

        attempts.get_mut(client_key).map_or(
            self.config.max_attempts,
            |entries| {
                entries.retain(|t| now.duration_since(*t) < self.config.window);
                self.config.max_attempts.saturating_sub(entries.len())
            },
        )
    }
}

/// The four limiter instances in front of the auth routes.
#[derive(Debug)]
pub struct AuthLimiters {
    pub login: RateLimiter,
    pub register: RateLimiter,
    pub forgot_password: RateLimiter,
    pub reset_password: RateLimiter,
}

impl AuthLimiters {
    #[must_use]
    pub fn new(config: &RateLimitsConfig) -> Self {
        Self {
            login: RateLimiter::new(config.login.into()),
            register: RateLimiter::new(config.register.into()),
            forgot_password: RateLimiter::new(config.forgot_password.into()),
            reset_password: RateLimiter::new(config.reset_password.into()),
        }
    }
}
