//! Fuzz target for path parsing and path redaction.
//!
//! Arbitrary path strings must parse or be rejected without panicking, and
//! redacting them against arbitrary data must never panic.

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use sd_redact::{parse_path, redact_paths, PathRedactionOptions, Value};

#[derive(Debug, Arbitrary)]
struct Input<'a> {
    paths: Vec<&'a str>,
    separator: &'a str,
    case_sensitive: bool,
    json: &'a [u8],
}

fuzz_target!(|input: Input<'_>| {
    for path in &input.paths {
        let _ = parse_path(path, input.separator);
    }

    let Ok(json) = serde_json::from_slice::<serde_json::Value>(input.json) else {
        return;
    };
    let options = PathRedactionOptions::default()
        .with_separator(input.separator)
        .with_case_sensitive(input.case_sensitive);
    let _ = redact_paths(&Value::from(json), &input.paths, &options);
});
