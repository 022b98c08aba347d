//! Per-session key-value store used by the rate limiter.
//!
//! The store is scoped to one visitor session by whoever constructs it; this
//! crate only reads and writes values by key.

use dashmap::DashMap;
use serde_json::Value;

/// Session-scoped values. Absent keys read as `None`.
pub trait SessionStore: Send + Sync {
    fn get(&self, key: &str) -> Option<Value>;
    fn set(&self, key: &str, value: Value);
}

impl<S: SessionStore + ?Sized> SessionStore for std::sync::Arc<S> {
    fn get(&self, key: &str) -> Option<Value> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: Value) {
        (**self).set(key, value)
    }
}

/// In-memory session for a single visitor.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    values: DashMap<String, Value>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every value, as happens when the session ends.
    pub fn clear(&self) {
        self.values.clear();
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, key: &str) -> Option<Value> {
        self.values.get(key).map(|v| v.value().clone())
    }

    fn set(&self, key: &str, value: Value) {
        self.values.insert(key.to_string(), value);
    }
}
