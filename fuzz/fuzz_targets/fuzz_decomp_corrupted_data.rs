#![no_main]
use libfuzzer_sys::fuzz_target;

use lzav::{decompress_into, decompress_partial_into};

fuzz_target!(|data: &[u8]| {
    let mut out = vec![0u8; 4096];
    // should not panic for any input or output length
    let _ = decompress_into(data, &mut out);
    let written = decompress_partial_into(data, &mut out);
    assert!(written <= out.len());
    let _ = decompress_into(data, &mut []);
});
