#![no_main]

use isorun::patterns::PatternSet;
use isorun::TestIdentifier;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(s) = std::str::from_utf8(data) else {
        return;
    };
    // First line is the pattern list, the rest are candidate identifiers
    let mut lines = s.lines();
    let Some(list) = lines.next() else {
        return;
    };
    if let Ok(patterns) = PatternSet::parse_list(list) {
        for line in lines {
            if let Ok(id) = TestIdentifier::parse(line) {
                let _ = patterns.matches_id(&id);
            }
        }
    }
});
