//! The high-ratio compression algorithm.
//!
//! Same output format as the default compressor, driven harder: a minimum
//! reference length of 5, eight-way hash buckets holding the seven most
//! recent positions per hash, and a one-step lazy evaluation that weighs
//! candidates by their estimated encoded cost before committing.

use crate::block::compress::{
    hash_w, match_len, match_len_r, read_u32, write_block, write_fin, write_short, OffsCarry,
};
use crate::block::hashtable::{CompressTableHi, INIT_POS};
use crate::block::{
    compress_bound_hi, stream_prefix, CompressError, LIT_FIN, MAX_SRC_LEN, REF_LEN, REF_MIN,
    REF_MIN_HI, WIN_LEN,
};
use crate::sink::SliceSink;
use alloc::vec;
use alloc::vec::Vec;

/// Maximum reference length encodable with `mref = 5`.
const MLEN_HI: usize = REF_LEN - REF_MIN + REF_MIN_HI;

/// A found match: position, reference length, offset.
#[derive(Clone, Copy)]
struct Cand {
    ip: usize,
    rc: usize,
    d: usize,
}

/// Estimated encoded size of a literal run plus reference block. The
/// offset-byte thresholds shift up by the carry bits the block would
/// consume (3 from a pending 23-bit offset, 2 more from a literal block).
#[inline]
fn block_cost(lc: usize, d: usize, csh: u32) -> u64 {
    let thr = 10 + 3 * (csh != 0) as usize + 2 * (lc != 0) as usize;

    (lc + (lc != 0) as usize
        + (lc > 15) as usize
        + 2
        + (d >= 1 << thr) as usize
        + (d >= 1 << (thr + 8)) as usize) as u64
}

/// Back-extends and writes `c`, returning the new literal anchor (one past
/// the reference's end).
fn emit_cand(
    op: &mut SliceSink,
    carry: &mut OffsCarry,
    input: &[u8],
    ipa: usize,
    c: &Cand,
) -> usize {
    let mut rc = c.rc;
    let mut ip = c.ip;
    let mut lc = ip - ipa;
    let wp = ip - c.d;

    // Consume literals backward; the reference start must not move before
    // the source start or past the window headroom.
    let bml = lc
        .min(16)
        .min(c.d.min(MLEN_HI).saturating_sub(rc))
        .min(wp);
    let bmc = match_len_r(&input[..ip], &input[..wp], bml);
    rc += bmc;
    ip -= bmc;
    lc -= bmc;

    write_block(op, lc, rc, c.d, &input[ipa..ipa + lc], carry, REF_MIN_HI);

    c.ip + c.rc
}

/// Compress all bytes of `input` into `output` with the high-ratio
/// strategy. The stream decodes with the same decompressor.
pub fn compress_hi_into(input: &[u8], output: &mut [u8]) -> Result<usize, CompressError> {
    if input.len() < 16 {
        return write_short(input, output, REF_MIN_HI);
    }
    if input.len() > MAX_SRC_LEN {
        return Err(CompressError::InputTooLong);
    }

    let required = compress_bound_hi(input.len());
    if output.len() < required {
        return Err(CompressError::OutputTooSmall { required });
    }

    let mut table = CompressTableHi::for_input_len(input.len());
    table.prepare(input);

    let mut op = SliceSink::new(output, 0);
    op.push(stream_prefix(REF_MIN_HI));

    let srcl = input.len();
    let ipe = srcl - LIT_FIN;
    let ipet = ipe - 9;

    let mut ip = INIT_POS;
    let mut ipa = 0usize;
    let mut carry = OffsCarry { bp: 0, sh: 0 };
    let mut pend: Option<Cand> = None;

    while ip < ipet {
        let iw1 = read_u32(input, ip);
        let iw2 = input[ip + 4] as u32;
        let ipo = ip as u32;
        let hp = table.bucket_mut(hash_w(iw1, iw2));

        // Probe the seven live tuples, newest first, keeping the best
        // match. A longer offset must buy its extra header byte: past the
        // 18-bit boundary a candidate has to beat the best by one byte.
        let head = hp[15] as usize;
        let mut rc = 0usize;
        let mut d = 0usize;
        for k in 0..7 {
            let t = (head + k * 2) % 14;
            if hp[t] != iw1 {
                continue;
            }
            let w = hp[t + 1] as usize;
            let d0 = ip - w;
            if d0 < 8 || input[w + 4] != input[ip + 4] {
                continue;
            }
            let ml0 = d0.min(MLEN_HI).min(ipe - ip);
            let rc0 =
                REF_MIN_HI + match_len(&input[ip + REF_MIN_HI..], &input[w + REF_MIN_HI..], ml0 - REF_MIN_HI);
            if rc0 > rc + (d0 > 1 << 18) as usize {
                rc = rc0;
                d = d0;
            }
        }

        // Every probed position rotates into the bucket.
        let nh = if head == 0 { 12 } else { head - 2 };
        hp[nh] = iw1;
        hp[nh + 1] = ipo;
        hp[15] = nh as u32;

        if rc < REF_MIN_HI + (d > 1 << 18) as usize || d > WIN_LEN - 1 {
            match pend.take() {
                Some(p) => {
                    ipa = emit_cand(&mut op, &mut carry, input, ipa, &p);
                    ip = ipa;
                }
                None => ip += 1,
            }
            continue;
        }

        let cand = Cand { ip, rc, d };
        match pend.take() {
            None => {
                // Hold the match for one byte and look for a better one.
                pend = Some(cand);
                ip += 1;
            }
            Some(p) => {
                let pov = block_cost(p.ip - ipa, p.d, carry.sh);
                let cov = block_cost(cand.ip - ipa, cand.d, carry.sh);
                if p.rc as u64 * cov > cand.rc as u64 * pov {
                    // The held match carries more bytes per output byte.
                    let end = emit_cand(&mut op, &mut carry, input, ipa, &p);
                    ipa = end;
                    if cand.ip >= end {
                        pend = Some(cand);
                        ip += 1;
                    } else {
                        ip = end;
                    }
                } else {
                    pend = Some(cand);
                    ip += 1;
                }
            }
        }
    }

    if let Some(p) = pend.take() {
        ipa = emit_cand(&mut op, &mut carry, input, ipa, &p);
    }

    write_fin(&mut op, &input[ipa..srcl]);
    Ok(op.pos())
}

/// Compress all bytes of `input` into a new vec with the high-ratio
/// strategy.
#[inline]
pub fn compress_hi(input: &[u8]) -> Vec<u8> {
    let mut compressed = vec![0u8; compress_bound_hi(input.len())];
    let len = compress_hi_into(input, &mut compressed).unwrap();
    compressed.truncate(len);
    compressed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::decompress::decompress;

    #[test]
    fn hi_stream_carries_its_own_mref() {
        let input = b"abcdefghijabcdefghijabcdefghijabcdefghij";
        let out = compress_hi(input);
        assert_eq!(out[0], 0x25);
        assert_eq!(decompress(&out, input.len()).unwrap(), input);
    }

    #[test]
    fn hi_compresses_repetitive_data_tighter_than_bound() {
        let input: Vec<u8> = (0..10_000u32).map(|i| (i % 7) as u8).collect();
        let out = compress_hi(&input);
        assert_lt!(out.len(), input.len() / 10);
        assert_eq!(decompress(&out, input.len()).unwrap(), input);
    }

    #[test]
    fn cost_estimate_tracks_offset_width() {
        assert_eq!(block_cost(0, 100, 0), 2);
        assert_eq!(block_cost(0, 1 << 12, 0), 3);
        assert_eq!(block_cost(0, 1 << 20, 0), 4);
        // Carry bits push the boundaries up.
        assert_eq!(block_cost(0, 1 << 12, 3), 2);
        assert_eq!(block_cost(4, 100, 0), 4 + 1 + 2);
    }
}
