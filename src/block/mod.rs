/*!
LZAV byte-stream format, version 2.

A stream starts with a prefix byte `(format_id << 4) | mref`, where `mref`
is the minimum reference length the encoder emits (6 for the default
compressor, 5 for the high-ratio one). Blocks follow, each introduced by a
header byte:

```text
bits 7:6  offset-carry bits, owned by the NEXT reference block
bits 5:4  block type (00 literal, 01/10/11 reference with a
          10/18/23-bit base offset)
bits 3:0  length nibble
```

A literal block's payload is the literal bytes themselves; a reference
block's payload is 1..3 offset bytes plus optional length-extension bytes.
Reference offsets borrow their low bits from the previous block's header
(and, for 23-bit offsets, lend their top three bits onward), so a block is
not decodable in isolation; the decoder threads a small carry register
through the stream. The stream always ends in a literal block covering at
least the last `LIT_FIN` (6) input bytes.
*/

pub mod compress;
pub mod compress_hi;
pub mod decompress;
#[cfg(feature = "legacy-fmt")]
#[cfg_attr(docsrs, doc(cfg(feature = "legacy-fmt")))]
pub mod decompress_v1;
pub mod hashtable;

use core::fmt;

/// Current stream format id.
pub(crate) const FMT_CUR: u8 = 2;

/// Maximum reference offset (sliding-window length).
pub(crate) const WIN_LEN: usize = 1 << 23;

/// Minimum reference length emitted by the default compressor.
pub(crate) const REF_MIN: usize = 6;

/// Minimum reference length emitted by the high-ratio compressor.
pub(crate) const REF_MIN_HI: usize = 5;

/// Maximum reference length encodable in a single block.
pub(crate) const REF_LEN: usize = REF_MIN + 15 + 255 + 254;

/// The last `LIT_FIN` input bytes are always emitted as literals.
pub(crate) const LIT_FIN: usize = 6;

/// Largest input length the stream format represents.
pub(crate) const MAX_SRC_LEN: usize = i32::MAX as usize;

#[inline]
pub(crate) fn stream_prefix(mref: usize) -> u8 {
    (FMT_CUR << 4) | mref as u8
}

/// Returns the maximum possible compressed size for an input of `srcl`
/// bytes, for the default compressor. Always at least 16.
#[inline]
pub fn compress_bound(srcl: usize) -> usize {
    if srcl == 0 {
        return 16;
    }

    // Amortizes the worst case of one length-extension byte per 128
    // literals plus per-block reference overhead.
    let k = 16 + 127 + 1;
    let l2 = srcl / (k + 6);

    (srcl - l2 * 6 + k - 1) / k * 2 - l2 + srcl + 16
}

/// Returns the maximum possible compressed size for an input of `srcl`
/// bytes, for the high-ratio compressor. Always at least 16.
#[inline]
pub fn compress_bound_hi(srcl: usize) -> usize {
    if srcl == 0 {
        return 16;
    }

    let l2 = srcl / (16 + 5);

    (srcl - l2 * 5 + 15) / 16 * 2 - l2 + srcl + 16
}

/// An error produced when compressing into a caller-provided buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum CompressError {
    /// The output buffer is smaller than [`compress_bound`] (or
    /// [`compress_bound_hi`]) requires for this input length.
    OutputTooSmall {
        /// Minimum output capacity for this input length.
        required: usize,
    },
    /// The input is longer than the stream format can represent.
    InputTooLong,
}

impl fmt::Display for CompressError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CompressError::OutputTooSmall { required } => write!(
                f,
                "output buffer is smaller than the compress bound {} for this input",
                required
            ),
            CompressError::InputTooLong => {
                write!(f, "input exceeds the format's length limit {}", MAX_SRC_LEN)
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for CompressError {}

/// An error representing invalid compressed data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum DecompressError {
    /// The compressed stream ends in the middle of a block.
    SourceTruncated,
    /// Decoding would write past the end of the output buffer.
    OutputTooSmall {
        /// Output length the stream wanted to reach.
        expected: usize,
        /// Output capacity actually available.
        actual: usize,
    },
    /// A reference offset points before the start of the output.
    OffsetOutOfBounds,
    /// The stream ended but produced a different number of bytes than the
    /// caller requested.
    DecodedSizeMismatch {
        /// Output length the caller requested.
        expected: usize,
        /// Output length the stream actually produced.
        actual: usize,
    },
    /// The stream prefix carries a format this build does not decode.
    UnknownFormat {
        /// Format id from the stream prefix.
        format_id: u8,
    },
}

impl fmt::Display for DecompressError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DecompressError::SourceTruncated => {
                f.write_str("compressed stream ends in the middle of a block")
            }
            DecompressError::OutputTooSmall { expected, actual } => write!(
                f,
                "output ({}) is too small for the decompressed data ({})",
                actual, expected
            ),
            DecompressError::OffsetOutOfBounds => {
                f.write_str("reference offset points before the decompressed buffer")
            }
            DecompressError::DecodedSizeMismatch { expected, actual } => write!(
                f,
                "the expected decompressed output size is {}, actual {}",
                expected, actual
            ),
            DecompressError::UnknownFormat { format_id } => {
                write!(f, "unrecognized stream format id {}", format_id)
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for DecompressError {}

#[inline]
pub(crate) fn uncompressed_size(input: &[u8]) -> Result<(usize, &[u8]), DecompressError> {
    let size = input.get(..4).ok_or(DecompressError::SourceTruncated)?;
    let size: &[u8; 4] = size.try_into().unwrap();
    let uncompressed_size = u32::from_le_bytes(*size) as usize;
    Ok((uncompressed_size, &input[4..]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bound_is_at_least_16() {
        assert_eq!(compress_bound(0), 16);
        assert_eq!(compress_bound_hi(0), 16);
        for n in 1..300 {
            assert_ge!(compress_bound(n), n + 16);
            assert_ge!(compress_bound_hi(n), n + 16);
        }
    }

    #[test]
    fn prefix_encodes_format_and_mref() {
        assert_eq!(stream_prefix(REF_MIN), 0x26);
        assert_eq!(stream_prefix(REF_MIN_HI), 0x25);
    }
}
