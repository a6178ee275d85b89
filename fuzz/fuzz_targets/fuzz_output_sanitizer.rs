//! Fuzz target for output sanitization.
//!
//! Escaped output must contain no raw markup characters and stay within
//! the worst-case expansion of the truncated input.

#![no_main]

use libfuzzer_sys::fuzz_target;
use querygate::security::OutputSanitizer;

fuzz_target!(|data: &str| {
    let sanitizer = OutputSanitizer::new(4096);
    let result = sanitizer.sanitize(data);

    assert!(!result.output.contains(['<', '>', '"', '\'']));
    // "&#x27;" is the longest entity
    assert!(result.output.len() <= 4096 * 6);
    if !result.modified {
        assert_eq!(result.output, data);
    }
});
