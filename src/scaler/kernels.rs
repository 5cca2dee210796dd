//! Per-ratio vectorized kernels
//!
//! Both kernels load each block of a source row once and store it to all
//! `ymul` rows of the destination group in the same pass.
//!
//! Horizontal expansion reads a batch of source pixels once, spreads it
//! through [`Lane::spread`] into a stack buffer, and stores that buffer to
//! every destination row of the group in the same pass. Leftovers shorter
//! than a batch go through one block each of 64, 32, 16 and 8 bytes (only
//! the blocks smaller than the batch) and then a per-pixel remainder.

use super::geometry::BlitGeometry;
use super::lane::{copy_lanes, Lane, LaneBlock, LANE_BYTES};
use crate::config::BatchSize;

/// Tail blocks tried after the batched loop, largest first
const TAIL_BLOCKS: [usize; 4] = [64, 32, 16, 8];

/// Widest batch: 32 pixels of 4 bytes
const MAX_BATCH_BYTES: usize = 32 * 4;

/// Spread output of the widest batch at the widest factor
const SCRATCH_BYTES: usize = MAX_BATCH_BYTES * 4;

/// 1:1 horizontal copy with vertical replication
pub(crate) fn copy_rows(g: &BlitGeometry, src: &[u8], dst: &mut [u8]) {
    if g.is_contiguous() {
        let len = g.src_stride * g.height;
        copy_lanes(&mut dst[..len], &src[..len]);
        return;
    }

    let row_bytes = g.src_row_bytes();
    let group_len = (g.ymul - 1) * g.dst_stride + row_bytes;
    for row in 0..g.height {
        let first = row * g.ymul * g.dst_stride;
        copy_row(
            &src[row * g.src_stride..][..row_bytes],
            &mut dst[first..first + group_len],
            g.dst_stride,
            g.ymul,
        );
    }
}

/// Copy one source row to the first `ymul` rows of `group`, reading each
/// block of the row once
fn copy_row(row: &[u8], group: &mut [u8], dst_stride: usize, ymul: usize) {
    let mut scratch = [0u8; MAX_BATCH_BYTES];
    let len = row.len();
    let mut off = 0;

    while len - off >= MAX_BATCH_BYTES {
        off += fan_block::<8>(row, group, dst_stride, ymul, off, &mut scratch);
    }
    if len - off >= 64 {
        off += fan_block::<4>(row, group, dst_stride, ymul, off, &mut scratch);
    }
    if len - off >= 32 {
        off += fan_block::<2>(row, group, dst_stride, ymul, off, &mut scratch);
    }
    if len - off >= 16 {
        off += fan_block::<1>(row, group, dst_stride, ymul, off, &mut scratch);
    }
    for unit in [8, 4, 2, 1] {
        if len - off >= unit {
            fan_out(group, dst_stride, ymul, off, &row[off..off + unit]);
            off += unit;
        }
    }
}

/// Load `N` lanes of `row` at `off` and store them to every row of the group
#[inline(always)]
fn fan_block<const N: usize>(
    row: &[u8],
    group: &mut [u8],
    dst_stride: usize,
    ymul: usize,
    off: usize,
    scratch: &mut [u8],
) -> usize {
    let bytes = LaneBlock::<N>::BYTES;
    LaneBlock::<N>::load(&row[off..]).store(scratch);
    fan_out(group, dst_stride, ymul, off, &scratch[..bytes]);
    bytes
}

/// Horizontal expansion by `F` of `BPP`-byte pixels, written to all
/// `ymul` rows of each destination group in lockstep
pub(crate) fn expand_rows<const BPP: usize, const F: usize>(
    g: &BlitGeometry,
    src: &[u8],
    dst: &mut [u8],
    batch: BatchSize,
) {
    debug_assert_eq!(g.bytes_per_pixel(), BPP);
    debug_assert_eq!(g.x.get(), F);
    debug_assert!(g.ymul > 0);

    let src_row = g.src_row_bytes();
    let dst_row = src_row * F;
    let group_len = (g.ymul - 1) * g.dst_stride + dst_row;
    let batch_bytes = batch.pixels() * BPP;

    for row in 0..g.height {
        let first = row * g.ymul * g.dst_stride;
        expand_row::<BPP, F>(
            &src[row * g.src_stride..][..src_row],
            &mut dst[first..first + group_len],
            g.dst_stride,
            g.ymul,
            batch_bytes,
        );
    }
}

fn expand_row<const BPP: usize, const F: usize>(
    row: &[u8],
    group: &mut [u8],
    dst_stride: usize,
    ymul: usize,
    batch_bytes: usize,
) {
    let mut scratch = [0u8; SCRATCH_BYTES];
    let len = row.len();
    let mut off = 0;

    while len - off >= batch_bytes {
        let wide = spread_run::<BPP, F>(&row[off..off + batch_bytes], &mut scratch);
        fan_out(group, dst_stride, ymul, off * F, wide);
        off += batch_bytes;
    }

    for block in TAIL_BLOCKS {
        if block < batch_bytes && len - off >= block {
            let wide = spread_run::<BPP, F>(&row[off..off + block], &mut scratch);
            fan_out(group, dst_stride, ymul, off * F, wide);
            off += block;
        }
    }

    let mut pixel = [0u8; LANE_BYTES];
    while off < len {
        let source = &row[off..off + BPP];
        for copy in pixel[..BPP * F].chunks_exact_mut(BPP) {
            copy.copy_from_slice(source);
        }
        fan_out(group, dst_stride, ymul, off * F, &pixel[..BPP * F]);
        off += BPP;
    }
}

/// Spread a run of whole lanes (or a single half lane) into `scratch`
///
/// `run.len()` is a multiple of 8. Returns the `run.len() * F` spread bytes.
#[inline(always)]
fn spread_run<'a, const BPP: usize, const F: usize>(run: &[u8], scratch: &'a mut [u8]) -> &'a [u8] {
    debug_assert_eq!(run.len() % (LANE_BYTES / 2), 0);

    let mut out = 0;
    for chunk in run.chunks(LANE_BYTES) {
        let lane = if chunk.len() == LANE_BYTES {
            Lane::load(chunk)
        } else {
            Lane::load_half(chunk)
        };
        for (i, wide) in lane.spread::<BPP, F>().into_iter().enumerate() {
            wide.store(&mut scratch[out + i * LANE_BYTES..]);
        }
        out += chunk.len() * F;
    }
    &scratch[..run.len() * F]
}

/// Store `bytes` at `offset` in each of the first `ymul` rows of `group`
#[inline(always)]
fn fan_out(group: &mut [u8], stride: usize, ymul: usize, offset: usize, bytes: &[u8]) {
    for line in group.chunks_mut(stride).take(ymul) {
        line[offset..offset + bytes.len()].copy_from_slice(bytes);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    /// Straightforward per-pixel expansion used as the oracle
    fn reference_row(row: &[u8], bpp: usize, factor: usize) -> Vec<u8> {
        row.chunks_exact(bpp)
            .flat_map(|px| std::iter::repeat(px).take(factor).flatten().copied())
            .collect()
    }

    fn ramp(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i * 13 + 1) as u8).collect()
    }

    #[test]
    fn test_spread_run_half_lane() {
        let run = ramp(8);
        let mut scratch = [0u8; SCRATCH_BYTES];
        let wide = spread_run::<2, 4>(&run, &mut scratch);
        assert_eq!(wide, &reference_row(&run, 2, 4)[..]);
    }

    #[test]
    fn test_spread_run_full_batch() {
        let run = ramp(MAX_BATCH_BYTES);
        let mut scratch = [0u8; SCRATCH_BYTES];
        let wide = spread_run::<4, 4>(&run, &mut scratch);
        assert_eq!(wide, &reference_row(&run, 4, 4)[..]);
    }

    #[test]
    fn test_fan_out_skips_padding() {
        // 3 rows of 4 bytes, stride 6
        let mut group = vec![0u8; 2 * 6 + 4];
        fan_out(&mut group, 6, 3, 1, &[9, 9]);
        assert_eq!(group, vec![0, 9, 9, 0, 0, 0, 0, 9, 9, 0, 0, 0, 0, 9, 9, 0]);
    }

    #[rstest]
    fn test_copy_row_every_length(#[values(1, 2, 3, 4)] ymul: usize) {
        // Lengths cover the 128-byte loop, every tail block and every small unit
        for len in 0..(2 * MAX_BATCH_BYTES + 64 + 32 + 16 + 8) {
            let row = ramp(len);
            let stride = len + 3;
            let mut group = vec![0xCCu8; (ymul - 1) * stride + len];
            copy_row(&row, &mut group, stride, ymul);
            for line in 0..ymul {
                let start = line * stride;
                assert_eq!(&group[start..start + len], &row[..], "{len} bytes");
                if line + 1 < ymul {
                    assert_eq!(&group[start + len..start + stride], &[0xCC; 3], "{len} bytes");
                }
            }
        }
    }

    #[test]
    fn test_copy_rows_padded_strides() {
        use crate::scaler::{PixelDepth, XFactor};
        // 11 px of 32 bits, source stride 48, destination stride 52, 3 rows each
        let g = BlitGeometry::new(PixelDepth::Bpp32, XFactor::X1, 3, 11, 2, 48, 52);
        let src = ramp(g.required_src_len().unwrap());
        let mut dst = vec![0xCCu8; g.required_dst_len().unwrap()];
        copy_rows(&g, &src, &mut dst);
        for r in 0..g.dst_rows() {
            let line = &src[(r / 3) * 48..][..44];
            assert_eq!(&dst[r * 52..r * 52 + 44], line);
            if r + 1 < g.dst_rows() {
                assert_eq!(&dst[r * 52 + 44..(r + 1) * 52], &[0xCC; 8]);
            }
        }
    }

    #[rstest]
    fn test_expand_row_every_length(
        #[values(BatchSize::Pixels16, BatchSize::Pixels32)] batch: BatchSize,
        #[values(1, 2, 3, 4)] ymul: usize,
    ) {
        // Lengths cover every combination of batch, tail blocks and scalar remainder
        for pixels in 0..(2 * 32 + 17) {
            let row = ramp(pixels * 2);
            let expected = reference_row(&row, 2, 2);
            let stride = expected.len() + 2;
            let mut group = vec![0xCCu8; (ymul - 1) * stride + expected.len()];
            expand_row::<2, 2>(&row, &mut group, stride, ymul, batch.pixels() * 2);
            for line in 0..ymul {
                let start = line * stride;
                assert_eq!(&group[start..start + expected.len()], &expected[..], "{pixels} px");
                if line + 1 < ymul {
                    assert_eq!(&group[start + expected.len()..start + stride], &[0xCC, 0xCC]);
                }
            }
        }
    }

    #[rstest]
    #[case(BatchSize::Pixels16)]
    #[case(BatchSize::Pixels32)]
    fn test_expand_row_32bit_by_4(#[case] batch: BatchSize) {
        for pixels in 0..70 {
            let row = ramp(pixels * 4);
            let expected = reference_row(&row, 4, 4);
            let mut group = vec![0u8; expected.len()];
            expand_row::<4, 4>(&row, &mut group, expected.len().max(1), 1, batch.pixels() * 4);
            assert_eq!(group, expected, "{pixels} px");
        }
    }
}
