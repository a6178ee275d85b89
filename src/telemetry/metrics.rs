//! Metrics facade counters.
//!
//! Values go through the `metrics` crate; without an installed recorder the
//! calls are no-ops. Analytics served to callers come from `CacheStats`.

use metrics::{counter, gauge};

pub fn record_cache_hit() {
    counter!("querygate_cache_hits_total").increment(1);
}

pub fn record_cache_miss() {
    counter!("querygate_cache_misses_total").increment(1);
}

pub fn record_cache_evictions(count: usize) {
    if count > 0 {
        counter!("querygate_cache_evictions_total").increment(count as u64);
    }
}

pub fn record_cache_entries(entries: usize) {
    gauge!("querygate_cache_entries").set(entries as f64);
}

/// Count a refused admission by rejection kind.
pub fn record_admission_rejected(kind: &'static str) {
    counter!("querygate_admission_rejected_total", "reason" => kind).increment(1);
}
