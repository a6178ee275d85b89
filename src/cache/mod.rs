//! Query answer caching.
//!
//! Normalizes queries into fingerprints and stores produced answers in a
//! bounded LRU store with TTL expiry.

mod normalize;
mod stats;
mod store;

pub use normalize::{fingerprint, normalize, Fingerprint, DISPLAY_KEY_LEN};
pub use stats::{
    cost_savings, hit_rate, savings_percent, AnalyticsSnapshot, CacheStats, CACHE_STRATEGIES,
};
pub use store::{CacheEntry, CacheStore, CacheStoreConfig};
