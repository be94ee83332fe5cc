//! Fuzz target for whole-tree redaction of arbitrary JSON.
//!
//! Redaction must never panic, and a second pass over its own output must
//! not change it.

#![no_main]

use libfuzzer_sys::fuzz_target;
use sd_redact::{redact, safe_stringify, RedactionOptions, StringifyOptions, Value};

fuzz_target!(|data: &[u8]| {
    let Ok(json) = serde_json::from_slice::<serde_json::Value>(data) else {
        return;
    };
    let input = Value::from(json);
    let options = RedactionOptions::default();

    let once = redact(&input, &options);
    let twice = redact(&once, &options);
    assert_eq!(once, twice);

    let _ = safe_stringify(&input, &StringifyOptions::default());
});
