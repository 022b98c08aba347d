//! SessionRateLimiter behavior over a session store

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use gateway_cache_core::rate_limiter::DECLINED_CARD_REGISTRY;
use gateway_cache_core::{
    ManualClock, MemorySessionStore, RateLimitPolicy, RateLimiterConfig, SessionRateLimiter,
    SessionStore,
};

const NOW: i64 = 1_700_000_000;

fn limiter() -> (
    SessionRateLimiter<Arc<MemorySessionStore>, ManualClock>,
    Arc<MemorySessionStore>,
    ManualClock,
) {
    let session = Arc::new(MemorySessionStore::new());
    let clock = ManualClock::new(NOW);
    let limiter = SessionRateLimiter::with_clock(Arc::clone(&session), clock.clone());
    (limiter, session, clock)
}

#[test]
fn test_below_threshold_is_not_limited() {
    let (limiter, _, _) = limiter();
    let policy = RateLimitPolicy::new(3, Duration::from_secs(60));

    assert!(!limiter.save_datetime_in_key(DECLINED_CARD_REGISTRY, &policy));
    assert!(!limiter.save_datetime_in_key(DECLINED_CARD_REGISTRY, &policy));

    assert!(!limiter.is_rate_limiter_enabled(DECLINED_CARD_REGISTRY));
}

#[test]
fn test_reaching_threshold_enables_limiter() {
    let (limiter, session, _) = limiter();
    let policy = RateLimitPolicy::new(3, Duration::from_secs(60));

    for _ in 0..3 {
        limiter.save_datetime_in_key(DECLINED_CARD_REGISTRY, &policy);
    }

    assert!(limiter.is_rate_limiter_enabled(DECLINED_CARD_REGISTRY));
    assert_eq!(
        session.get("wcpay_card_declined_registry_action"),
        Some(json!({"triggered_at": NOW, "cooldown_secs": 60}))
    );
    assert_eq!(
        session.get(DECLINED_CARD_REGISTRY),
        Some(json!([NOW, NOW, NOW]))
    );
}

#[test]
fn test_trigger_moved_into_past_disables_limiter() {
    let (limiter, session, _) = limiter();
    let policy = RateLimitPolicy::new(2, Duration::from_secs(60));

    limiter.save_datetime_in_key(DECLINED_CARD_REGISTRY, &policy);
    limiter.save_datetime_in_key(DECLINED_CARD_REGISTRY, &policy);
    assert!(limiter.is_rate_limiter_enabled(DECLINED_CARD_REGISTRY));

    let action_id = SessionRateLimiter::<MemorySessionStore>::get_action_id(DECLINED_CARD_REGISTRY);
    session.set(
        &action_id,
        json!({"triggered_at": NOW - 61, "cooldown_secs": 60}),
    );

    assert!(!limiter.is_rate_limiter_enabled(DECLINED_CARD_REGISTRY));
}

#[test]
fn test_limiter_expires_with_time() {
    let (limiter, _, clock) = limiter();
    let policy = RateLimitPolicy::new(2, Duration::from_secs(60));

    limiter.save_datetime_in_key(DECLINED_CARD_REGISTRY, &policy);
    limiter.save_datetime_in_key(DECLINED_CARD_REGISTRY, &policy);

    clock.advance(30);
    assert!(limiter.is_rate_limiter_enabled(DECLINED_CARD_REGISTRY));

    clock.advance(31);
    assert!(!limiter.is_rate_limiter_enabled(DECLINED_CARD_REGISTRY));
}

#[test]
fn test_events_outside_window_do_not_count() {
    let (limiter, _, clock) = limiter();
    let policy = RateLimitPolicy::new(2, Duration::from_secs(60));

    limiter.save_datetime_in_key(DECLINED_CARD_REGISTRY, &policy);
    clock.advance(120);
    assert!(!limiter.save_datetime_in_key(DECLINED_CARD_REGISTRY, &policy));
    assert!(!limiter.is_rate_limiter_enabled(DECLINED_CARD_REGISTRY));

    clock.advance(10);
    assert!(limiter.save_datetime_in_key(DECLINED_CARD_REGISTRY, &policy));
    assert!(limiter.is_rate_limiter_enabled(DECLINED_CARD_REGISTRY));
}

#[test]
fn test_keys_are_independent() {
    let (limiter, _, _) = limiter();
    let policy = RateLimitPolicy::new(1, Duration::from_secs(60));

    limiter.save_datetime_in_key("registry_a", &policy);

    assert!(limiter.is_rate_limiter_enabled("registry_a"));
    assert!(!limiter.is_rate_limiter_enabled("registry_b"));
}

#[test]
fn test_session_end_resets_limiter() {
    let (limiter, session, _) = limiter();
    let policy = RateLimitPolicy::new(1, Duration::from_secs(60));

    limiter.save_datetime_in_key(DECLINED_CARD_REGISTRY, &policy);
    session.clear();

    assert!(!limiter.is_rate_limiter_enabled(DECLINED_CARD_REGISTRY));
}

#[test]
fn test_declined_card_policy_from_config() {
    let (limiter, _, clock) = limiter();
    let config = RateLimiterConfig {
        declined_card_threshold: 2,
        declined_card_window_secs: 60,
        declined_card_cooldown_secs: Some(600),
    };
    let policy = config.declined_card_policy();

    limiter.save_datetime_in_key(DECLINED_CARD_REGISTRY, &policy);
    limiter.save_datetime_in_key(DECLINED_CARD_REGISTRY, &policy);

    clock.advance(599);
    assert_eq!(
        limiter.remaining_cooldown(DECLINED_CARD_REGISTRY),
        Some(Duration::from_secs(1))
    );
}
