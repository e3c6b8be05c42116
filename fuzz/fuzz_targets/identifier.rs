#![no_main]

use isorun::TestIdentifier;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        if let Ok(id) = TestIdentifier::parse(s) {
            let again = TestIdentifier::parse(&id.to_string());
            assert_eq!(again.ok(), Some(id));
        }
    }
});
