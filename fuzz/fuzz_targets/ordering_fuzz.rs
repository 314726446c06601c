//! Fuzz test for ordering text parsing
//!
//! Any UTF-8 input must parse to an ordering or a typed error, and a parsed
//! ordering must survive a Display round trip.
//!
//! Run with: cargo +nightly fuzz run ordering_fuzz -- -max_total_time=60

#![no_main]

use libfuzzer_sys::fuzz_target;
use tiercache_core::{CacheError, Ordering};

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        match Ordering::parse(input) {
            Ok(ordering) => {
                let rendered = ordering.to_string();
                let reparsed = Ordering::parse(&rendered).expect("rendered ordering parses");
                assert_eq!(ordering, reparsed);
            }
            Err(CacheError::InvalidOrdering { reason, .. }) => {
                assert!(!reason.is_empty(), "ordering error should carry a reason");
            }
            Err(other) => panic!("unexpected error kind: {other:?}"),
        }
    }
});
