//! Session Rate Limiter - sliding-window throttle over a session store
//!
//! Each tracked action keeps two session values:
//!
//! - `<key>`: JSON array of event timestamps (epoch seconds)
//! - `<key>_action`: `{ "triggered_at": <epoch secs>, "cooldown_secs": <secs> }`,
//!   written when the event count inside the window reaches the threshold
//!
//! The limiter expires on its own: `is_rate_limiter_enabled` compares the
//! trigger time against the cooldown on every call, so nothing has to reset
//! it. Missing or malformed session values read as "no events" and
//! "not triggered".

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::clock::{secs_to_i64, Clock, SystemClock};
use crate::session::SessionStore;

/// Session key tracking declined card attempts at checkout.
pub const DECLINED_CARD_REGISTRY: &str = "wcpay_card_declined_registry";

const ACTION_SUFFIX: &str = "_action";

/// When to trigger and how long to stay triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    /// Events inside `window` that trigger the limiter
    pub threshold: usize,
    /// Trailing window events are counted in
    pub window: Duration,
    /// How long the limiter stays enabled after triggering
    pub cooldown: Duration,
}

impl RateLimitPolicy {
    /// Policy whose cooldown equals its counting window.
    pub fn new(threshold: usize, window: Duration) -> Self {
        Self {
            threshold,
            window,
            cooldown: window,
        }
    }

    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }
}

/// Companion record stored under [`SessionRateLimiter::get_action_id`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRecord {
    pub triggered_at: i64,
    pub cooldown_secs: u64,
}

impl ActionRecord {
    fn expires_at(&self) -> i64 {
        self.triggered_at.saturating_add(secs_to_i64(self.cooldown_secs))
    }
}

pub struct SessionRateLimiter<S, C = SystemClock> {
    session: S,
    clock: C,
}

impl<S: SessionStore> SessionRateLimiter<S, SystemClock> {
    pub fn new(session: S) -> Self {
        Self::with_clock(session, SystemClock)
    }
}

impl<S: SessionStore, C: Clock> SessionRateLimiter<S, C> {
    pub fn with_clock(session: S, clock: C) -> Self {
        Self { session, clock }
    }

    pub fn session(&self) -> &S {
        &self.session
    }

    /// Session key holding the trigger record for `key`.
    pub fn get_action_id(key: &str) -> String {
        format!("{}{}", key, ACTION_SUFFIX)
    }

    /// Record one occurrence of the action tracked under `key`.
    ///
    /// Timestamps that fell out of the window are dropped. Returns true if
    /// this event brought the count to the threshold and triggered the
    /// limiter.
    pub fn save_datetime_in_key(&self, key: &str, policy: &RateLimitPolicy) -> bool {
        let now = self.clock.now();
        let window = secs_to_i64(policy.window.as_secs());

        let mut registry = self.registry(key);
        registry.retain(|&at| now.saturating_sub(at) <= window);
        registry.push(now);
        let count = registry.len();
        self.session.set(key, Value::from(registry));

        if count < policy.threshold {
            debug!(key, count, threshold = policy.threshold, "Rate limiter event recorded");
            return false;
        }

        let record = ActionRecord {
            triggered_at: now,
            cooldown_secs: policy.cooldown.as_secs(),
        };
        match serde_json::to_value(record) {
            Ok(value) => self.session.set(&Self::get_action_id(key), value),
            Err(e) => {
                debug!(key, error = %e, "Failed to encode rate limiter action");
                return false;
            }
        }
        info!(
            key,
            count,
            cooldown_secs = record.cooldown_secs,
            "Rate limiter enabled"
        );
        true
    }

    /// Whether the action under `key` is currently throttled.
    pub fn is_rate_limiter_enabled(&self, key: &str) -> bool {
        self.remaining_cooldown(key).is_some()
    }

    /// Time left until the limiter for `key` expires, if it is enabled.
    pub fn remaining_cooldown(&self, key: &str) -> Option<Duration> {
        let record = self.action(key)?;
        let now = self.clock.now();
        if now > record.expires_at() {
            return None;
        }
        let remaining = record.expires_at().saturating_sub(now);
        Some(Duration::from_secs(u64::try_from(remaining).unwrap_or(0)))
    }

    /// Events recorded under `key` within the trailing `window`.
    pub fn event_count(&self, key: &str, window: Duration) -> usize {
        let now = self.clock.now();
        let window = secs_to_i64(window.as_secs());
        self.registry(key)
            .into_iter()
            .filter(|&at| now.saturating_sub(at) <= window)
            .count()
    }

    /// Forget all events and any trigger for `key`.
    pub fn clear(&self, key: &str) {
        self.session.set(key, Value::Array(Vec::new()));
        self.session.set(&Self::get_action_id(key), Value::Null);
        debug!(key, "Rate limiter cleared");
    }

    fn registry(&self, key: &str) -> Vec<i64> {
        match self.session.get(key) {
            Some(Value::Array(items)) => items.iter().filter_map(Value::as_i64).collect(),
            _ => Vec::new(),
        }
    }

    fn action(&self, key: &str) -> Option<ActionRecord> {
        let value = self.session.get(&Self::get_action_id(key))?;
        serde_json::from_value(value).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::session::MemorySessionStore;
    use serde_json::json;

    const KEY: &str = "test_registry";
    const NOW: i64 = 1_700_000_000;

    fn limiter() -> (SessionRateLimiter<MemorySessionStore, ManualClock>, ManualClock) {
        let clock = ManualClock::new(NOW);
        (
            SessionRateLimiter::with_clock(MemorySessionStore::new(), clock.clone()),
            clock,
        )
    }

    #[test]
    fn test_action_id() {
        assert_eq!(
            SessionRateLimiter::<MemorySessionStore>::get_action_id(DECLINED_CARD_REGISTRY),
            "wcpay_card_declined_registry_action"
        );
    }

    #[test]
    fn test_empty_session_is_not_limited() {
        let (limiter, _) = limiter();
        assert!(!limiter.is_rate_limiter_enabled(KEY));
        assert_eq!(limiter.event_count(KEY, Duration::from_secs(60)), 0);
        assert_eq!(limiter.remaining_cooldown(KEY), None);
    }

    #[test]
    fn test_malformed_session_values_are_ignored() {
        let (limiter, _) = limiter();
        limiter.session().set(KEY, json!("garbage"));
        limiter
            .session()
            .set(&SessionRateLimiter::<MemorySessionStore>::get_action_id(KEY), json!(42));

        assert!(!limiter.is_rate_limiter_enabled(KEY));
        assert_eq!(limiter.event_count(KEY, Duration::from_secs(60)), 0);

        let policy = RateLimitPolicy::new(2, Duration::from_secs(60));
        assert!(!limiter.save_datetime_in_key(KEY, &policy));
        assert_eq!(limiter.session().get(KEY), Some(json!([NOW])));
    }

    #[test]
    fn test_extreme_registry_timestamps_are_pruned() {
        let (limiter, _) = limiter();
        limiter.session().set(KEY, json!([i64::MIN, i64::MAX]));

        let policy = RateLimitPolicy::new(3, Duration::from_secs(60));
        assert!(!limiter.save_datetime_in_key(KEY, &policy));

        assert_eq!(limiter.session().get(KEY), Some(json!([i64::MAX, NOW])));
        assert_eq!(limiter.event_count(KEY, policy.window), 2);
    }

    #[test]
    fn test_unbounded_cooldown_stays_enabled() {
        let (limiter, clock) = limiter();
        let policy = RateLimitPolicy::new(1, Duration::from_secs(60))
            .with_cooldown(Duration::from_secs(i64::MAX as u64));

        assert!(limiter.save_datetime_in_key(KEY, &policy));
        assert!(limiter.is_rate_limiter_enabled(KEY));

        clock.advance(100 * 365 * 24 * 60 * 60);
        assert!(limiter.is_rate_limiter_enabled(KEY));
        assert_eq!(
            limiter.remaining_cooldown(KEY),
            Some(Duration::from_secs((i64::MAX - NOW - 100 * 365 * 24 * 60 * 60) as u64))
        );

        let huge = RateLimitPolicy::new(1, Duration::from_secs(u64::MAX));
        assert!(limiter.save_datetime_in_key("other", &huge));
        assert!(limiter.is_rate_limiter_enabled("other"));
    }

    #[test]
    fn test_old_events_are_pruned() {
        let (limiter, clock) = limiter();
        let policy = RateLimitPolicy::new(3, Duration::from_secs(60));

        limiter.save_datetime_in_key(KEY, &policy);
        limiter.save_datetime_in_key(KEY, &policy);
        clock.advance(61);
        assert!(!limiter.save_datetime_in_key(KEY, &policy));

        assert_eq!(limiter.session().get(KEY), Some(json!([NOW + 61])));
        assert!(!limiter.is_rate_limiter_enabled(KEY));
    }

    #[test]
    fn test_remaining_cooldown() {
        let (limiter, clock) = limiter();
        let policy = RateLimitPolicy::new(1, Duration::from_secs(60));

        assert!(limiter.save_datetime_in_key(KEY, &policy));
        assert_eq!(limiter.remaining_cooldown(KEY), Some(Duration::from_secs(60)));

        clock.advance(45);
        assert_eq!(limiter.remaining_cooldown(KEY), Some(Duration::from_secs(15)));

        clock.advance(15);
        assert!(limiter.is_rate_limiter_enabled(KEY));

        clock.advance(1);
        assert!(!limiter.is_rate_limiter_enabled(KEY));
    }

    #[test]
    fn test_separate_cooldown() {
        let (limiter, clock) = limiter();
        let policy = RateLimitPolicy::new(2, Duration::from_secs(10))
            .with_cooldown(Duration::from_secs(300));

        limiter.save_datetime_in_key(KEY, &policy);
        assert!(limiter.save_datetime_in_key(KEY, &policy));

        clock.advance(200);
        assert!(limiter.is_rate_limiter_enabled(KEY));
        assert_eq!(limiter.event_count(KEY, policy.window), 0);

        clock.advance(101);
        assert!(!limiter.is_rate_limiter_enabled(KEY));
    }

    #[test]
    fn test_clear() {
        let (limiter, _) = limiter();
        let policy = RateLimitPolicy::new(1, Duration::from_secs(60));
        limiter.save_datetime_in_key(KEY, &policy);
        assert!(limiter.is_rate_limiter_enabled(KEY));

        limiter.clear(KEY);
        assert!(!limiter.is_rate_limiter_enabled(KEY));
        assert_eq!(limiter.event_count(KEY, policy.window), 0);
    }
}
