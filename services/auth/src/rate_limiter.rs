//! Failed-login limiter for preventing brute force attacks

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use common::settings::RateLimitSettings;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Rate limiter configuration
#[derive(Debug, Clone)]
pub struct RateLimiterConfig {
    /// Failed attempts allowed inside one window
    pub max_attempts: u32,
    /// Window length in seconds
    pub window_seconds: u64,
    /// Lockout duration in seconds
    pub lockout_seconds: u64,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            window_seconds: 900,
            lockout_seconds: 900,
        }
    }
}

impl From<&RateLimitSettings> for RateLimiterConfig {
    fn from(settings: &RateLimitSettings) -> Self {
        Self {
            max_attempts: settings.max_attempts,
            window_seconds: settings.window_seconds,
            lockout_seconds: settings.lockout_seconds,
        }
    }
}

#[derive(Debug)]
struct RateLimiterEntry {
    failures: u32,
    window_started: Instant,
    locked_until: Option<Instant>,
}

impl RateLimiterEntry {
    /// Still counting failures or still locked
    fn is_live(&self, now: Instant, window: Duration) -> bool {
        match self.locked_until {
            Some(until) => now < until,
            None => now.duration_since(self.window_started) < window,
        }
    }
}

/// Per-key failure counter with lockout
#[derive(Debug, Clone)]
pub struct RateLimiter {
    config: RateLimiterConfig,
    entries: Arc<Mutex<HashMap<String, RateLimiterEntry>>>,
}

impl RateLimiter {
    pub fn new(config: RateLimiterConfig) -> Self {
        Self {
            config,
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn window(&self) -> Duration {
        Duration::from_secs(self.config.window_seconds)
    }

    /// Drop every key whose window and lock have both run out
    fn sweep(&self, entries: &mut HashMap<String, RateLimiterEntry>, now: Instant) {
        let window = self.window();
        let before = entries.len();
        entries.retain(|_, entry| entry.is_live(now, window));
        let dropped = before - entries.len();
        if dropped > 0 {
            debug!("Dropped {} expired failed login counters", dropped);
        }
    }

    /// Whether `key` may attempt a login right now
    pub async fn is_allowed(&self, key: &str) -> bool {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();
        self.sweep(&mut entries, now);

        !entries
            .get(key)
            .and_then(|entry| entry.locked_until)
            .is_some_and(|until| now < until)
    }

    /// Count a failed attempt, locking the key once the limit is reached
    pub async fn record_failure(&self, key: &str) {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();
        let window = self.window();
        self.sweep(&mut entries, now);

        let entry = entries.entry(key.to_string()).or_insert(RateLimiterEntry {
            failures: 0,
            window_started: now,
            locked_until: None,
        });

        if now.duration_since(entry.window_started) >= window {
            entry.failures = 0;
            entry.window_started = now;
        }

        entry.failures += 1;
        if entry.failures >= self.config.max_attempts && entry.locked_until.is_none() {
            entry.locked_until = Some(now + Duration::from_secs(self.config.lockout_seconds));
            warn!(
                "Locked {} for {} seconds after {} failed logins",
                key, self.config.lockout_seconds, entry.failures
            );
        }
    }

    /// Forget a key after a successful login
    pub async fn clear(&self, key: &str) {
        if self.entries.lock().await.remove(key).is_some() {
            info!("Cleared failed login counter for {}", key);
        }
    }

    pub fn config(&self) -> &RateLimiterConfig {
        &self.config
    }

    #[cfg(test)]
    async fn tracked(&self) -> usize {
        self.entries.lock().await.len()
    }
}
