//! Fuzz target for redaction config parsing.
//!
//! Tests that config JSON parsing and pattern compilation handle arbitrary
//! input without panicking.

#![no_main]

use libfuzzer_sys::fuzz_target;
use sd_redact::RedactionConfig;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    // Should never panic, only return an error
    if let Ok(config) = RedactionConfig::from_json(text) {
        let _ = config.into_options();
    }
});
