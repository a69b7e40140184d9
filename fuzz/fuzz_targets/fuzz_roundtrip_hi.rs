#![no_main]
use libfuzzer_sys::fuzz_target;

use lzav::{compress_hi, decompress};

fuzz_target!(|data: &[u8]| {
    let compressed = compress_hi(data);
    let decompressed = decompress(&compressed, data.len()).unwrap();
    assert_eq!(data, &decompressed[..]);
});
