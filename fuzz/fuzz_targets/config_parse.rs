//! Fuzz target for labeling config parsing.
//!
//! This fuzzer feeds arbitrary UTF-8 documents to the config parser,
//! checking for panics, crashes, or hangs.

#![no_main]

use libfuzzer_sys::fuzz_target;
use regionkit::LabelConfig;

fuzz_target!(|data: &[u8]| {
    if data.len() > 1024 * 1024 {
        return;
    }

    let Ok(xml) = std::str::from_utf8(data) else {
        return;
    };

    let _ = LabelConfig::parse(xml);
});
