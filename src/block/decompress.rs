//! The decompression algorithm, stream format 2.
//!
//! The decoder is a two-state machine (literal block / reference block)
//! threading a small offset-carry register between blocks. Every fast path
//! is gated on source and destination slack; the fallback paths are fully
//! bounds-checked, so arbitrary input can never read or write out of
//! bounds.

use crate::block::compress::read_u32;
use crate::block::{uncompressed_size, DecompressError, LIT_FIN};
use crate::fastcpy::slice_copy;
use alloc::vec;
use alloc::vec::Vec;

/// Masks selecting `bt` low-order offset bytes of a loaded word.
const OFFS_MASK: [usize; 4] = [0, 0xFF, 0xFFFF, 0xFF_FFFF];

/// Copies a `cc`-byte reference from `d` bytes back. Overlapping copies
/// run byte-wise ascending, which gives run-fill semantics.
#[inline]
fn copy_reference(output: &mut [u8], op: usize, d: usize, cc: usize) {
    if d >= cc {
        let (head, tail) = output.split_at_mut(op);
        slice_copy(&head[op - d..op - d + cc], &mut tail[..cc]);
    } else {
        for i in op..op + cc {
            output[i] = output[i - d];
        }
    }
}

/// Decodes a format-2 stream. On error, reports the number of output
/// bytes committed before the failure alongside the error.
pub(crate) fn decompress_fmt2(
    input: &[u8],
    output: &mut [u8],
) -> Result<usize, (usize, DecompressError)> {
    let mref1 = (input[0] & 15) as usize;
    if mref1 == 0 {
        return Err((
            0,
            DecompressError::UnknownFormat {
                format_id: input[0] >> 4,
            },
        ));
    }
    let mref1 = mref1 - 1;

    let ipe = input.len();
    let ipet = ipe.saturating_sub(LIT_FIN);
    let ope = output.len();

    let mut ip = 1usize;
    let mut op = 0usize;
    let mut cv = 0usize;
    let mut csh = 0u32;

    while ip < ipet {
        let bh = input[ip] as usize;

        if bh & 0x30 == 0 {
            // Literal block. Bits 7:6 are offset bits owed to the next
            // reference.
            let ncv = bh >> 6;
            ip += 1;
            let mut cc = bh & 15;

            if cc == 0 {
                // Continuation varint, 16 + up to 5 payload bytes. Widened
                // accumulation so hostile encodings cannot overflow a
                // 32-bit usize; anything past the format's length limit is
                // malformed anyway.
                let mut l = 0u64;
                let mut sh = 0u32;
                loop {
                    if ip >= ipe {
                        return Err((op, DecompressError::SourceTruncated));
                    }
                    let b = input[ip] as u64;
                    ip += 1;
                    l |= (b & 0x7F) << sh;
                    if b & 0x80 == 0 {
                        break;
                    }
                    sh += 7;
                    if sh > 28 {
                        return Err((op, DecompressError::SourceTruncated));
                    }
                }
                if l > (1 << 31) - 1 {
                    return Err((op, DecompressError::SourceTruncated));
                }
                cc = 16 + l as usize;
            }

            // A well-formed stream only reaches shifts 0, 2, 3 and 5; the
            // cap keeps hostile block sequences harmless.
            if csh < 6 {
                cv |= ncv << csh;
                csh += 2;
            }

            if cc <= 16 && ip + 16 <= ipe && op + 16 <= ope {
                // Short literal fast path: one unconditional 16-byte copy,
                // of which only `cc` count.
                output[op..op + 16].copy_from_slice(&input[ip..ip + 16]);
                ip += cc;
                op += cc;
                continue;
            }

            if cc > ipe - ip {
                let avail = (ipe - ip).min(ope - op);
                output[op..op + avail].copy_from_slice(&input[ip..ip + avail]);
                return Err((op + avail, DecompressError::SourceTruncated));
            }
            if cc > ope - op {
                let fit = ope - op;
                output[op..ope].copy_from_slice(&input[ip..ip + fit]);
                return Err((
                    ope,
                    DecompressError::OutputTooSmall {
                        expected: op + cc,
                        actual: ope,
                    },
                ));
            }
            slice_copy(&input[ip..ip + cc], &mut output[op..op + cc]);
            ip += cc;
            op += cc;
            continue;
        }

        // Reference block. The loop gate leaves at least 6 readable bytes:
        // header, up to 3 offset bytes, up to 2 length bytes.
        let bt = (bh >> 4) & 3;
        ip += 1;
        let o = read_u32(input, ip) as usize & OFFS_MASK[bt];
        ip += bt;

        let d = (((bh >> 6) | ((o & 0x1F_FFFF) << 2)) << csh) | cv;
        csh = if bt == 3 { 3 } else { 0 };
        cv = if bt == 3 { o >> 21 } else { 0 };

        if d > op {
            return Err((op, DecompressError::OffsetOutOfBounds));
        }

        let mut cc = bh & 15;
        if cc != 0 {
            cc += mref1;
        } else {
            let b = input[ip] as usize;
            ip += 1;
            if b == 255 {
                cc = 16 + mref1 + 255 + input[ip] as usize;
                ip += 1;
            } else {
                cc = 16 + mref1 + b;
            }
        }

        if cc <= 20 && d >= 20 && op + 20 <= ope {
            // Short reference fast path, wild 20-byte copy.
            let (head, tail) = output.split_at_mut(op);
            tail[..20].copy_from_slice(&head[op - d..op - d + 20]);
            op += cc;
            continue;
        }

        if cc > ope - op {
            let fit = ope - op;
            copy_reference(output, op, d, fit);
            return Err((
                ope,
                DecompressError::OutputTooSmall {
                    expected: op + cc,
                    actual: ope,
                },
            ));
        }
        copy_reference(output, op, d, cc);
        op += cc;
    }

    if op != ope {
        return Err((
            op,
            DecompressError::DecodedSizeMismatch {
                expected: ope,
                actual: op,
            },
        ));
    }

    Ok(op)
}

fn dispatch(input: &[u8], output: &mut [u8]) -> Result<usize, (usize, DecompressError)> {
    if input.is_empty() {
        return if output.is_empty() {
            Ok(0)
        } else {
            Err((0, DecompressError::SourceTruncated))
        };
    }

    let format_id = input[0] >> 4;
    match format_id {
        2 => decompress_fmt2(input, output),
        #[cfg(feature = "legacy-fmt")]
        1 => crate::block::decompress_v1::decompress_fmt1(input, output),
        _ => Err((0, DecompressError::UnknownFormat { format_id })),
    }
}

/// Decompress all bytes of `input` into `output`.
///
/// `output` must be exactly the uncompressed length; a stream that ends
/// early or would overrun it is an error. Returns the number of bytes
/// written, which equals `output.len()` on success.
#[inline]
pub fn decompress_into(input: &[u8], output: &mut [u8]) -> Result<usize, DecompressError> {
    dispatch(input, output).map_err(|(_, e)| e)
}

/// Decompress as much of `input` as fits into `output`, ignoring stream
/// errors. Returns the number of bytes written; never fails. Useful for
/// recovering a readable prefix from damaged data.
#[inline]
pub fn decompress_partial_into(input: &[u8], output: &mut [u8]) -> usize {
    match dispatch(input, output) {
        Ok(n) | Err((n, _)) => n,
    }
}

/// Decompress all bytes of `input` into a new vec of length
/// `uncompressed_size`.
#[inline]
pub fn decompress(input: &[u8], uncompressed_size: usize) -> Result<Vec<u8>, DecompressError> {
    let mut decompressed = vec![0u8; uncompressed_size];
    decompress_into(input, &mut decompressed)?;
    Ok(decompressed)
}

/// Decompress all bytes of `input` into a new vec. The first 4 bytes are
/// the uncompressed size in little endian. Pairs with
/// [`compress_prepend_size`](crate::compress_prepend_size).
#[inline]
pub fn decompress_size_prepended(input: &[u8]) -> Result<Vec<u8>, DecompressError> {
    let (size, input) = uncompressed_size(input)?;
    decompress(input, size)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn all_literal_short_form() {
        let stream = [0x26, 3, b'a', b'4', b'9', 0, 0, 0];
        assert_eq!(decompress(&stream, 3).unwrap(), b"a49");
    }

    #[test]
    fn empty_stream_and_empty_output() {
        assert_eq!(decompress(&[0x26, 0], 0).unwrap(), b"");
        assert_eq!(decompress(&[], 0).unwrap(), b"");
        assert_eq!(
            decompress(&[], 1).unwrap_err(),
            DecompressError::SourceTruncated
        );
    }

    #[test]
    fn unknown_format_is_rejected() {
        let err = decompress(&[0x76, 1, 2, 3, 4, 5, 6, 7], 4).unwrap_err();
        assert_eq!(err, DecompressError::UnknownFormat { format_id: 7 });
        // mref of zero cannot come from any encoder
        let err = decompress(&[0x20, 1, 2, 3, 4, 5, 6, 7], 4).unwrap_err();
        assert!(matches!(err, DecompressError::UnknownFormat { .. }));
    }

    #[test]
    fn offset_before_output_start_is_rejected() {
        // literal "ab", then a reference with d far beyond op
        let stream = [0x26, 2, b'a', b'b', 0x1F, 0xFF, 0, 0, 0, 0, 0];
        let mut out = [0u8; 32];
        let err = decompress_into(&stream, &mut out[..8]).unwrap_err();
        assert_eq!(err, DecompressError::OffsetOutOfBounds);
    }

    #[test]
    fn partial_keeps_prefix_on_damage() {
        let stream = [0x26, 2, b'a', b'b', 0x1F, 0xFF, 0, 0, 0, 0, 0];
        let mut out = [0u8; 8];
        assert_eq!(decompress_partial_into(&stream, &mut out), 2);
        assert_eq!(&out[..2], b"ab");
    }
}
