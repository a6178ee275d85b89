//! Hit/miss accounting and derived analytics.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Estimated dollars saved per unit of hit rate.
const COST_PER_HIT_RATE: f64 = 2.5;

/// Strategies reported alongside the analytics snapshot.
pub const CACHE_STRATEGIES: [&str; 3] = ["exact match", "LRU eviction", "TTL expiration"];

/// Process-lifetime request counters.
#[derive(Debug, Default)]
pub struct CacheStats {
    total_requests: AtomicU64,
    cache_hits: AtomicU64,
}

impl CacheStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// A query served from the cache.
    pub fn record_hit(&self) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    /// A query answered by the producer.
    pub fn record_miss(&self) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn total_requests(&self) -> u64 {
        self.total_requests.load(Ordering::Relaxed)
    }

    pub fn cache_hits(&self) -> u64 {
        self.cache_hits.load(Ordering::Relaxed)
    }

    /// Build analytics for the current counters and store size.
    pub fn snapshot(&self, cache_size: usize) -> AnalyticsSnapshot {
        // Counters are read independently; keep hits <= total.
        let hits = self.cache_hits();
        let total = self.total_requests().max(hits);
        AnalyticsSnapshot::from_counts(total, hits, cache_size)
    }
}

/// Analytics report. Field names match the wire format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsSnapshot {
    pub hit_rate: f64,
    pub total_requests: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub cache_size: usize,
    pub cost_savings: f64,
    pub savings_percent: u32,
    pub strategies: Vec<String>,
}

impl AnalyticsSnapshot {
    pub fn from_counts(total: u64, hits: u64, cache_size: usize) -> Self {
        let rate = hit_rate(hits, total);
        Self {
            hit_rate: round_to(rate, 3),
            total_requests: total,
            cache_hits: hits,
            cache_misses: total.saturating_sub(hits),
            cache_size,
            cost_savings: cost_savings(rate),
            savings_percent: savings_percent(rate),
            strategies: CACHE_STRATEGIES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// `hits / max(total, 1)`.
pub fn hit_rate(hits: u64, total: u64) -> f64 {
    hits as f64 / total.max(1) as f64
}

/// Estimated savings in dollars, two decimals.
pub fn cost_savings(hit_rate: f64) -> f64 {
    round_to(hit_rate * COST_PER_HIT_RATE, 2)
}

/// Hit rate as a whole percentage.
pub fn savings_percent(hit_rate: f64) -> u32 {
    (hit_rate.clamp(0.0, 1.0) * 100.0).round() as u32
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
