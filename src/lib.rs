//! Gateway Cache Core - caching and throttling for payment gateway integrations
//!
//! Two independent components sit behind narrow storage traits:
//!
//! - **DatabaseCache**: get-or-populate cache over a durable option store
//!   with validator-gated freshness, TTL staleness, forced refresh and
//!   stale-on-error fallback
//! - **SessionRateLimiter**: sliding-window event counter over a per-session
//!   store, used to block repeated declined card attempts
//!
//! Plus two small utilities shared with the rest of the gateway:
//!
//! - **BaseConstant**: named constants carrying a distinct wire value
//! - **CidrRange**: inclusive address range of an IPv4/IPv6 block

pub mod cidr;
pub mod clock;
pub mod config;
pub mod constants;
pub mod database_cache;
pub mod error;
pub mod logging;
pub mod rate_limiter;
pub mod session;
pub mod store;

pub use cidr::CidrRange;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{CacheConfig, Config, RateLimiterConfig, StorageConfig};
pub use constants::{BaseConstant, CacheKey};
pub use database_cache::{CacheEntry, CacheLookup, CacheStats, DatabaseCache};
pub use error::{CidrError, ConfigError, ConstantError, StoreError};
pub use rate_limiter::{RateLimitPolicy, SessionRateLimiter};
pub use session::{MemorySessionStore, SessionStore};
pub use store::{MemoryOptionStore, OptionStore, SqliteOptionStore};
