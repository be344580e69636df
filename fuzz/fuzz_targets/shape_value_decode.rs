//! Fuzz target for shape value decoding.
//!
//! The first byte picks a registered type tag; the rest is parsed as the
//! entry's JSON `value` object.

#![no_main]

use libfuzzer_sys::fuzz_target;
use regionkit::codec::registry::{fuzz_decode_value, type_tags};

fuzz_target!(|data: &[u8]| {
    let Some((&selector, rest)) = data.split_first() else {
        return;
    };
    if rest.len() > 1024 * 1024 {
        return;
    }

    let tags: Vec<&str> = type_tags().collect();
    let tag = tags[selector as usize % tags.len()];
    let _ = fuzz_decode_value(tag, rest);
});
