//! Fuzz target for the admission rule filter.
//!
//! Arbitrary strings must not panic the matcher, and a reported match
//! must point at a real rule.

#![no_main]

use libfuzzer_sys::fuzz_target;
use querygate::security::PromptInjectionFilter;

fuzz_target!(|data: &str| {
    let filter = PromptInjectionFilter::default();

    match filter.first_match(data) {
        Some(m) => {
            assert!(m.rule_index < filter.rule_count());
            assert!(!filter.is_clean(data));
        }
        None => assert!(filter.is_clean(data)),
    }
});
