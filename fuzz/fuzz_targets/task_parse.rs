//! Fuzz target for task file parsing and result loading.
//!
//! This fuzzer feeds arbitrary byte sequences to the task parser and loads
//! every task that carries a labeling config, checking for panics, crashes,
//! or hangs.

#![no_main]

use libfuzzer_sys::fuzz_target;
use regionkit::codec::from_tasks_slice;

fuzz_target!(|data: &[u8]| {
    if data.len() > 10 * 1024 * 1024 {
        return;
    }

    let Ok(tasks) = from_tasks_slice(data) else {
        return;
    };
    for task in &tasks {
        if let Ok((annotation, _report)) = task.load(None) {
            let _ = annotation.serialize();
        }
    }
});
