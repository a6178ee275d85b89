//! Fuzz target for query normalization.
//!
//! Normalization must be idempotent and the fingerprint of a query must
//! equal the fingerprint of its normalized form.

#![no_main]

use libfuzzer_sys::fuzz_target;
use querygate::cache::{fingerprint, normalize};

fuzz_target!(|data: &str| {
    let once = normalize(data);
    assert_eq!(normalize(&once), once, "normalize is not idempotent");
    assert!(!once.starts_with(' ') && !once.ends_with(' '));
    assert!(!once.contains("  "));
    assert_eq!(fingerprint(data), fingerprint(&once));
});
