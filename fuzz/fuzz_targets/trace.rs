#![no_main]

use isorun_core::{MAX_TRACE_BYTES, normalize_trace};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let text = String::from_utf8_lossy(data);
    let normalized = normalize_trace(&text);
    assert!(!normalized.contains('\n'));
    assert!(normalized.len() <= MAX_TRACE_BYTES);
});
