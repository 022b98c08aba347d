//! Database Cache - get-or-populate cache over a durable option store
//!
//! Each cache slot is one option holding a [`CacheEntry`]:
//!
//! ```text
//! { "data": <payload or null>, "fetched": <epoch secs>, "errored": <bool> }
//! ```
//!
//! [`DatabaseCache::get_or_add`] serves the stored payload while it is fresh
//! and passes the caller's validator. Otherwise it runs the caller's
//! generator and persists the result. A failing generator never surfaces to
//! the caller: the previous payload (if any) is kept, marked errored, and
//! returned as a best-effort value.
//!
//! ## Regeneration decision
//!
//! | Stored entry                    | `force_refresh` | Result         |
//! |---------------------------------|-----------------|----------------|
//! | any                             | true            | regenerate     |
//! | absent / malformed              | false           | regenerate     |
//! | `errored = true`                | false           | regenerate     |
//! | older than TTL                  | false           | regenerate     |
//! | validator rejects `data`        | false           | regenerate     |
//! | fresh, valid, not errored       | false           | serve as-is    |
//!
//! When refresh is disabled ([`DatabaseCache::disable_refresh`]) a decision
//! to regenerate is downgraded to "serve whatever is stored".
//!
//! Concurrent callers racing on one key may both regenerate; the last write
//! wins.

use std::fmt;
use std::fmt::Display;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::clock::{secs_to_i64, Clock, SystemClock};
use crate::config::CacheConfig;
use crate::store::OptionStore;

// ============================================================================
// Stored entry
// ============================================================================

/// Shape persisted for every cache slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    /// Cached payload; `None` when no generation ever succeeded
    pub data: Option<T>,
    /// Epoch seconds of the last successful population
    pub fetched: i64,
    /// Last population attempt failed
    pub errored: bool,
}

impl<T> CacheEntry<T> {
    pub fn age_secs(&self, now: i64) -> i64 {
        now.saturating_sub(self.fetched)
    }

    pub fn is_stale(&self, now: i64, ttl_secs: u64) -> bool {
        self.age_secs(now) > secs_to_i64(ttl_secs)
    }
}

/// Result of [`DatabaseCache::get_or_add`].
#[derive(Debug, Clone, PartialEq)]
pub struct CacheLookup<T> {
    /// Served payload, `None` when nothing usable was ever stored
    pub value: Option<T>,
    /// The generator ran and succeeded during this call
    pub was_refreshed: bool,
}

impl<T> CacheLookup<T> {
    fn served(value: Option<T>) -> Self {
        Self {
            value,
            was_refreshed: false,
        }
    }
}

/// Why a slot is being regenerated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshReason {
    Forced,
    Missing,
    Errored,
    Stale,
    Invalid,
}

impl fmt::Display for RefreshReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RefreshReason::Forced => "forced",
            RefreshReason::Missing => "missing",
            RefreshReason::Errored => "errored",
            RefreshReason::Stale => "stale",
            RefreshReason::Invalid => "invalid",
        };
        f.write_str(s)
    }
}

/// Decide whether a slot needs regeneration.
///
/// Returns `None` when the stored entry can be served as-is. Data that is
/// absent never satisfies the validator.
pub fn refresh_reason<T, V>(
    entry: Option<&CacheEntry<T>>,
    now: i64,
    ttl_secs: u64,
    validator: V,
    force_refresh: bool,
) -> Option<RefreshReason>
where
    V: FnOnce(&T) -> bool,
{
    if force_refresh {
        return Some(RefreshReason::Forced);
    }
    let entry = match entry {
        Some(entry) => entry,
        None => return Some(RefreshReason::Missing),
    };
    if entry.errored {
        return Some(RefreshReason::Errored);
    }
    if entry.is_stale(now, ttl_secs) {
        return Some(RefreshReason::Stale);
    }
    match entry.data.as_ref() {
        Some(data) if validator(data) => None,
        _ => Some(RefreshReason::Invalid),
    }
}

// ============================================================================
// Statistics
// ============================================================================

#[derive(Debug, Default)]
struct CacheCounters {
    hits: AtomicU64,
    misses: AtomicU64,
    refreshes: AtomicU64,
    errors: AtomicU64,
}

/// Snapshot of cache statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Served from the store without regeneration
    pub hits: u64,
    /// Regeneration was indicated
    pub misses: u64,
    /// Generator ran and succeeded
    pub refreshes: u64,
    /// Generator ran and failed
    pub errors: u64,
}

impl CacheStats {
    /// Hit rate as percentage (0-100)
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }
}

// ============================================================================
// Database Cache
// ============================================================================

/// Stale-on-error cache over an [`OptionStore`].
pub struct DatabaseCache<S, C = SystemClock> {
    store: S,
    clock: C,
    config: CacheConfig,
    refresh_disabled: AtomicBool,
    counters: CacheCounters,
}

impl<S: OptionStore> DatabaseCache<S, SystemClock> {
    pub fn new(store: S, config: CacheConfig) -> Self {
        Self::with_clock(store, config, SystemClock)
    }
}

impl<S: OptionStore, C: Clock> DatabaseCache<S, C> {
    pub fn with_clock(store: S, config: CacheConfig, clock: C) -> Self {
        let refresh_disabled = AtomicBool::new(config.refresh_disabled);
        Self {
            store,
            clock,
            config,
            refresh_disabled,
            counters: CacheCounters::default(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Stop invoking generators for the lifetime of this instance.
    pub fn disable_refresh(&self) {
        if !self.refresh_disabled.swap(true, Ordering::Relaxed) {
            info!("Database cache refresh disabled");
        }
    }

    pub fn enable_refresh(&self) {
        self.refresh_disabled.store(false, Ordering::Relaxed);
    }

    pub fn is_refresh_disabled(&self) -> bool {
        self.refresh_disabled.load(Ordering::Relaxed)
    }

    /// Serve `key` from the store, regenerating it when needed.
    ///
    /// * `generator` - produces a fresh payload; its error is logged, never returned
    /// * `validator` - accepts or rejects a stored payload independent of its age
    /// * `force_refresh` - regenerate regardless of freshness and validity
    ///
    /// Every call that runs the generator writes the slot exactly once.
    pub fn get_or_add<T, G, E, V>(
        &self,
        key: &str,
        generator: G,
        validator: V,
        force_refresh: bool,
    ) -> CacheLookup<T>
    where
        T: Serialize + DeserializeOwned,
        G: FnOnce() -> Result<T, E>,
        E: Display,
        V: FnOnce(&T) -> bool,
    {
        let now = self.clock.now();
        let ttl_secs = self.config.ttl_for(key);
        let entry: Option<CacheEntry<T>> = self.entry(key);

        let reason = match refresh_reason(entry.as_ref(), now, ttl_secs, validator, force_refresh) {
            Some(reason) => reason,
            None => {
                self.counters.hits.fetch_add(1, Ordering::Relaxed);
                debug!(key, "Database cache hit");
                return CacheLookup::served(entry.and_then(|e| e.data));
            }
        };
        self.counters.misses.fetch_add(1, Ordering::Relaxed);

        if self.is_refresh_disabled() {
            debug!(key, reason = %reason, "Refresh disabled, serving stored data");
            return CacheLookup::served(entry.and_then(|e| e.data));
        }

        debug!(key, reason = %reason, "Regenerating cache entry");

        match generator() {
            Ok(data) => {
                let fresh = CacheEntry {
                    data: Some(data),
                    fetched: now,
                    errored: false,
                };
                self.persist(key, &fresh);
                self.counters.refreshes.fetch_add(1, Ordering::Relaxed);
                CacheLookup {
                    value: fresh.data,
                    was_refreshed: true,
                }
            }
            Err(e) => {
                self.counters.errors.fetch_add(1, Ordering::Relaxed);
                let errored = match entry {
                    Some(previous) => {
                        warn!(
                            key,
                            error = %e,
                            age_secs = previous.age_secs(now),
                            "Cache generator failed, keeping previous data"
                        );
                        CacheEntry {
                            data: previous.data,
                            fetched: previous.fetched,
                            errored: true,
                        }
                    }
                    None => {
                        warn!(key, error = %e, "Cache generator failed, no previous data");
                        CacheEntry {
                            data: None,
                            fetched: now,
                            errored: true,
                        }
                    }
                };
                self.persist(key, &errored);
                CacheLookup::served(errored.data)
            }
        }
    }

    /// Stored payload for `key` without regenerating or writing.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.entry::<T>(key).and_then(|e| e.data)
    }

    /// Decoded entry for `key`. Absent, unreadable and malformed slots are `None`.
    pub fn entry<T: DeserializeOwned>(&self, key: &str) -> Option<CacheEntry<T>> {
        let raw = match self.store.read(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!(key, error = %e, "Failed to read cache entry");
                return None;
            }
        };

        match serde_json::from_value::<CacheEntry<T>>(raw) {
            Ok(entry) => Some(entry),
            Err(e) => {
                debug!(key, error = %e, "Ignoring malformed cache entry");
                None
            }
        }
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            refreshes: self.counters.refreshes.load(Ordering::Relaxed),
            errors: self.counters.errors.load(Ordering::Relaxed),
        }
    }

    fn persist<T: Serialize>(&self, key: &str, entry: &CacheEntry<T>) {
        let value: Value = match serde_json::to_value(entry) {
            Ok(value) => value,
            Err(e) => {
                warn!(key, error = %e, "Failed to encode cache entry");
                return;
            }
        };
        if let Err(e) = self.store.write(key, &value) {
            warn!(key, error = %e, "Failed to write cache entry");
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
