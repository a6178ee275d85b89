//! Fuzz target for IPC JSON message decoding.
//!
//! Arbitrary byte sequences must decode to `Ok` or `Err`, never panic, and
//! anything that decodes must re-encode.

#![no_main]

use libfuzzer_sys::fuzz_target;
use querygate::ipc::{decode_message, encode_message};

fuzz_target!(|data: &[u8]| {
    if let Ok(message) = decode_message(data) {
        assert!(encode_message(&message).is_ok());
    }
});
