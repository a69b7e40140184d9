//! Decoder for legacy stream format 1.
//!
//! The machine mirrors the format-2 decoder with the original layout
//! differences: reference offsets are 10, 18 or a plain 24 bits (a 24-bit
//! offset lends no bits onward), the carry channel only ever holds the two
//! bits a literal block deposits, and long literal lengths use the
//! byte-plus-255-escape scheme instead of a continuation varint.

use crate::block::compress::read_u32;
use crate::block::{DecompressError, LIT_FIN};
use crate::fastcpy::slice_copy;

const OFFS_MASK: [usize; 4] = [0, 0xFF, 0xFFFF, 0xFF_FFFF];

pub(crate) fn decompress_fmt1(
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
            let ncv = bh >> 6;
            ip += 1;
            let mut cc = bh & 15;

            if cc == 0 {
                if ip >= ipe {
                    return Err((op, DecompressError::SourceTruncated));
                }
                let b = input[ip] as usize;
                ip += 1;
                if b == 255 {
                    if ip >= ipe {
                        return Err((op, DecompressError::SourceTruncated));
                    }
                    cc = 16 + 255 + input[ip] as usize;
                    ip += 1;
                } else {
                    cc = 16 + b;
                }
            }

            if csh < 6 {
                cv |= ncv << csh;
                csh += 2;
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

        let bt = (bh >> 4) & 3;
        ip += 1;
        let o = read_u32(input, ip) as usize & OFFS_MASK[bt];
        ip += bt;

        // A 24-bit offset stands alone; shorter ones splice the header's
        // top bits underneath and consume the literal carry.
        let d = if bt == 3 {
            o
        } else {
            (((bh >> 6) | (o << 2)) << csh) | cv
        };
        csh = 0;
        cv = 0;

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

#[cfg(test)]
mod test {
    use crate::block::decompress::{decompress, decompress_into};
    use crate::block::DecompressError;

    #[test]
    fn literal_only_stream() {
        let stream = [0x16, 3, b'x', b'y', b'z', 0, 0, 0];
        assert_eq!(decompress(&stream, 3).unwrap(), b"xyz");
    }

    #[test]
    fn reference_with_plain_24_bit_offset() {
        // 8 literals, then a type-3 reference of length 1 + mref1 = 6
        // copying from offset 8, then the terminal literal block.
        let mut stream = alloc::vec![0x16, 8];
        stream.extend_from_slice(b"abcdefgh");
        stream.extend_from_slice(&[0x31, 8, 0, 0]);
        stream.extend_from_slice(&[6]);
        stream.extend_from_slice(b"vwxyz.");
        let decoded = decompress(&stream, 8 + 6 + 6).unwrap();
        assert_eq!(&decoded, b"abcdefghabcdefvwxyz.");
    }

    #[test]
    fn reference_with_carried_10_bit_offset() {
        // The literal header's top bits hold offset bits 0..2 for the
        // following reference: ncv = 2, so d = (1 | 0) << 2 | 2 = 6.
        let mut stream = alloc::vec![0x16, 0x80 | 8];
        stream.extend_from_slice(b"abcdefgh");
        stream.extend_from_slice(&[0x40 | 0x12, 0x00]);
        stream.extend_from_slice(&[6]);
        stream.extend_from_slice(b"vwxyz.");
        let decoded = decompress(&stream, 8 + 7 + 6).unwrap();
        assert_eq!(&decoded, b"abcdefghcdefghcvwxyz.");
    }

    #[test]
    fn truncated_legacy_stream_errors() {
        let stream = [0x16, 0x0F, b'x'];
        let mut out = [0u8; 15];
        assert_eq!(
            decompress_into(&stream, &mut out).unwrap_err(),
            DecompressError::DecodedSizeMismatch {
                expected: 15,
                actual: 0
            }
        );
    }
}
