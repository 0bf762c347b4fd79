//! Shared types for the console API layer.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::core_state::CoreState;

// ═══════════════════════════════════════════════════════════
// API context — shared state for the router
// ═══════════════════════════════════════════════════════════

/// Shared context for all API routes and middleware.
/// Wraps `CoreState` plus API-specific in-memory state.
#[derive(Clone)]
pub struct ApiContext {
    pub core: Arc<CoreState>,
    /// Credential endpoints (login, password reset), keyed by email.
    pub auth_limiter: Arc<Mutex<RateLimiter>>,
}

impl ApiContext {
    pub fn new(core: Arc<CoreState>) -> Self {
        Self {
            core,
            auth_limiter: Arc::new(Mutex::new(RateLimiter::for_credentials())),
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Rate limiter — per-key sliding window
// ═══════════════════════════════════════════════════════════

/// Per-key rate limiter with per-minute and per-hour limits.
pub struct RateLimiter {
    windows: HashMap<String, Vec<Instant>>,
    per_minute: u32,
    per_hour: u32,
}

impl RateLimiter {
    pub fn new(per_minute: u32, per_hour: u32) -> Self {
        Self {
            windows: HashMap::new(),
            per_minute,
            per_hour,
        }
    }

    /// Limits for password guessing: 5 per minute, 20 per hour per account.
    pub fn for_credentials() -> Self {
        Self::new(5, 20)
    }

    /// Check if a key is within rate limits. Returns `Ok(())` or
    /// `Err(retry_after_secs)` if exceeded.
    pub fn check(&mut self, key: &str) -> Result<(), u64> {
        let now = Instant::now();
        if self.windows.len() > 10_000 {
            self.prune(now);
        }
        let entries = self.windows.entry(key.to_string()).or_default();

        entries.retain(|ts| now.duration_since(*ts) < Duration::from_secs(3600));

        let last_minute = entries
            .iter()
            .filter(|ts| now.duration_since(**ts) < Duration::from_secs(60))
            .count() as u32;
        if last_minute >= self.per_minute {
            return Err(60);
        }

        if entries.len() as u32 >= self.per_hour {
            return Err(3600);
        }

        entries.push(now);
        Ok(())
    }

    /// Forget a key's history (after a successful login).
    pub fn clear(&mut self, key: &str) {
        self.windows.remove(key);
    }

    fn prune(&mut self, now: Instant) {
        self.windows.retain(|_, entries| {
            entries.retain(|ts| now.duration_since(*ts) < Duration::from_secs(3600));
            !entries.is_empty()
        });
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::for_credentials()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limiter_allows_under_limit() {
        let mut limiter = RateLimiter::for_credentials();
        assert!(limiter.check("a@clinic.test").is_ok());
        assert!(limiter.check("a@clinic.test").is_ok());
    }

    #[test]
    fn rate_limiter_rejects_over_per_minute() {
        let mut limiter = RateLimiter::new(2, 1000);
        assert!(limiter.check("a").is_ok());
        assert!(limiter.check("a").is_ok());
        assert_eq!(limiter.check("a"), Err(60));
    }

    #[test]
    fn rate_limiter_rejects_over_per_hour() {
        let mut limiter = RateLimiter::new(100, 3);
        for _ in 0..3 {
            assert!(limiter.check("a").is_ok());
        }
        assert_eq!(limiter.check("a"), Err(3600));
    }

    #[test]
    fn rate_limiter_isolates_keys() {
        let mut limiter = RateLimiter::new(1, 1000);
        assert!(limiter.check("a").is_ok());
        assert!(limiter.check("b").is_ok());
        assert_eq!(limiter.check("a"), Err(60));
    }

    #[test]
    fn clear_resets_a_key() {
        let mut limiter = RateLimiter::new(1, 1000);
        assert!(limiter.check("a").is_ok());
        limiter.clear("a");
        assert!(limiter.check("a").is_ok());
    }
}
