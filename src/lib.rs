/*! Pure Rust implementation of the LZAV byte-stream compression format.

LZAV is an LZ77-family codec tuned for fast in-memory compression and very
fast decompression. Compressed streams are self-delimiting byte sequences;
the decoded length is not recorded in the stream and must be supplied by the
caller (or carried externally, see [`compress_prepend_size`]).

# Examples
```
use lzav::{compress, decompress};
let input: &[u8] = b"Hello people, what's up?";
let compressed = compress(input);
let decompressed = decompress(&compressed, input.len()).unwrap();
assert_eq!(input, &decompressed[..]);
```

# Feature Flags

- `std` (default): `std::error::Error` impls for the error types.
- `legacy-fmt`: decoding of streams produced by pre-format-2 encoders.
*/

#![cfg_attr(not(feature = "std"), no_std)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]
#![warn(missing_docs)]

extern crate alloc;

pub mod block;
mod fastcpy;
mod sink;

#[cfg(test)]
#[macro_use]
extern crate more_asserts;

pub use block::compress::{
    compress, compress_into, compress_into_with_table, compress_prepend_size,
};
pub use block::compress_hi::{compress_hi, compress_hi_into};
pub use block::decompress::{
    decompress, decompress_into, decompress_partial_into, decompress_size_prepended,
};
pub use block::hashtable::CompressTable;
pub use block::{compress_bound, compress_bound_hi, CompressError, DecompressError};
