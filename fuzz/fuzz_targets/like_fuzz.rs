//! Fuzz test for LIKE pattern evaluation
//!
//! Arbitrary patterns and subjects must evaluate without panicking, and the
//! trivial patterns must behave as documented.
//!
//! Run with: cargo +nightly fuzz run like_fuzz -- -max_total_time=60

#![no_main]

use libfuzzer_sys::fuzz_target;
use tiercache_core::{Predicate, Record};

fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };
    let (pattern, subject) = input.split_once('\n').unwrap_or((input, ""));

    let record = Record::builder("Probe")
        .key("id", 1)
        .field("name", subject)
        .build();

    let _ = Predicate::like("name", pattern)
        .evaluate(&record)
        .expect("field is present");

    assert!(Predicate::like("name", "%")
        .evaluate(&record)
        .expect("field is present"));
    assert!(Predicate::like("name", subject.replace(['%', '_'], "_"))
        .evaluate(&record)
        .expect("field is present"));
});
