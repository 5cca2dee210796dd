//! Portable scaler
//!
//! Correct for any address, stride and width. Horizontal expansion works a
//! machine word at a time: two 16-bit pixels share one 32-bit read, and each
//! half is duplicated into its own 32-bit store, so even widths never branch
//! per pixel. Words are read and written little-endian, which keeps the
//! in-memory pixel order intact on every host.

use super::geometry::BlitGeometry;
use super::{PixelDepth, PixelScaler, XFactor};

/// Alignment-agnostic reference implementation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PortableScaler;

impl PixelScaler for PortableScaler {
    fn name(&self) -> &'static str {
        "portable"
    }

    fn scale(&self, geometry: &BlitGeometry, src: &[u8], dst: &mut [u8]) {
        if geometry.is_empty() {
            return;
        }
        debug_assert_eq!(geometry.validate(src.len(), dst.len()), Ok(()));

        match (geometry.depth, geometry.x) {
            (_, XFactor::X1) => copy_rows(geometry, src, dst),
            (PixelDepth::Bpp16, XFactor::X2) => expand_rows(geometry, src, dst, widen_row16x2),
            (PixelDepth::Bpp16, XFactor::X4) => expand_rows(geometry, src, dst, widen_row16x4),
            (PixelDepth::Bpp32, XFactor::X2) => expand_rows(geometry, src, dst, widen_row32x2),
            (PixelDepth::Bpp32, XFactor::X4) => expand_rows(geometry, src, dst, widen_row32x4),
        }
    }
}

/// Vertical-only replication
fn copy_rows(g: &BlitGeometry, src: &[u8], dst: &mut [u8]) {
    if g.is_contiguous() {
        let len = g.src_stride * g.height;
        dst[..len].copy_from_slice(&src[..len]);
        return;
    }

    let row_bytes = g.src_row_bytes();
    let mut out = 0;
    for row in 0..g.height {
        let line = &src[row * g.src_stride..][..row_bytes];
        for _ in 0..g.ymul {
            dst[out..out + row_bytes].copy_from_slice(line);
            out += g.dst_stride;
        }
    }
}

/// Widen each source row into the first of its destination rows, then
/// copy that row down `ymul - 1` times
fn expand_rows(g: &BlitGeometry, src: &[u8], dst: &mut [u8], widen: fn(&[u8], &mut [u8])) {
    let src_row = g.src_row_bytes();
    let dst_row = g.dst_row_bytes();

    for row in 0..g.height {
        let first = row * g.ymul * g.dst_stride;
        widen(
            &src[row * g.src_stride..][..src_row],
            &mut dst[first..first + dst_row],
        );
        for copy in 1..g.ymul {
            dst.copy_within(first..first + dst_row, first + copy * g.dst_stride);
        }
    }
}

#[inline(always)]
fn read_word(bytes: &[u8]) -> u32 {
    u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

#[inline(always)]
fn write_word(bytes: &mut [u8], word: u32) {
    bytes[..4].copy_from_slice(&word.to_le_bytes());
}

/// First pixel of a packed pair, duplicated into both halves
#[inline(always)]
fn dup_low(pair: u32) -> u32 {
    (pair & 0x0000_FFFF) | (pair << 16)
}

/// Second pixel of a packed pair, duplicated into both halves
#[inline(always)]
fn dup_high(pair: u32) -> u32 {
    (pair & 0xFFFF_0000) | (pair >> 16)
}

/// Trailing odd 16-bit pixel, duplicated into a full word
#[inline(always)]
fn dup_single(bytes: &[u8]) -> u32 {
    let pixel = u16::from_le_bytes([bytes[0], bytes[1]]) as u32;
    pixel | (pixel << 16)
}

fn widen_row16x2(src: &[u8], dst: &mut [u8]) {
    let pairs = src.chunks_exact(4);
    let odd = pairs.remainder();
    for (pair, out) in pairs.zip(dst.chunks_exact_mut(8)) {
        let pix = read_word(pair);
        write_word(&mut out[0..], dup_low(pix));
        write_word(&mut out[4..], dup_high(pix));
    }
    if !odd.is_empty() {
        let end = dst.len();
        write_word(&mut dst[end - 4..], dup_single(odd));
    }
}

fn widen_row16x4(src: &[u8], dst: &mut [u8]) {
    let pairs = src.chunks_exact(4);
    let odd = pairs.remainder();
    for (pair, out) in pairs.zip(dst.chunks_exact_mut(16)) {
        let pix = read_word(pair);
        let lo = dup_low(pix);
        let hi = dup_high(pix);
        write_word(&mut out[0..], lo);
        write_word(&mut out[4..], lo);
        write_word(&mut out[8..], hi);
        write_word(&mut out[12..], hi);
    }
    if !odd.is_empty() {
        let end = dst.len();
        let word = dup_single(odd);
        write_word(&mut dst[end - 8..], word);
        write_word(&mut dst[end - 4..], word);
    }
}

fn widen_row32x2(src: &[u8], dst: &mut [u8]) {
    for (pixel, out) in src.chunks_exact(4).zip(dst.chunks_exact_mut(8)) {
        let pix = read_word(pixel);
        write_word(&mut out[0..], pix);
        write_word(&mut out[4..], pix);
    }
}

fn widen_row32x4(src: &[u8], dst: &mut [u8]) {
    for (pixel, out) in src.chunks_exact(4).zip(dst.chunks_exact_mut(16)) {
        let pix = read_word(pixel);
        for word in out.chunks_exact_mut(4) {
            write_word(word, pix);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scaler::{ScaleFactors, YFactor};

    fn px16(values: &[u16]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    fn px32(values: &[u32]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    #[test]
    fn test_dup_helpers() {
        // pixels A=0x1111 (first in memory), B=0x2222
        let pair = read_word(&px16(&[0x1111, 0x2222]));
        assert_eq!(dup_low(pair), 0x1111_1111);
        assert_eq!(dup_high(pair), 0x2222_2222);
        assert_eq!(dup_single(&px16(&[0xABCD])), 0xABCD_ABCD);
    }

    #[test]
    fn test_widen_row16x2_even() {
        let src = px16(&[1, 2, 3, 4]);
        let mut dst = vec![0u8; 16];
        widen_row16x2(&src, &mut dst);
        assert_eq!(dst, px16(&[1, 1, 2, 2, 3, 3, 4, 4]));
    }

    #[test]
    fn test_widen_row16x2_odd_tail() {
        let src = px16(&[1, 2, 3]);
        let mut dst = vec![0u8; 12];
        widen_row16x2(&src, &mut dst);
        assert_eq!(dst, px16(&[1, 1, 2, 2, 3, 3]));
    }

    #[test]
    fn test_widen_row16x4_odd_tail() {
        let src = px16(&[7, 9, 5]);
        let mut dst = vec![0u8; 24];
        widen_row16x4(&src, &mut dst);
        assert_eq!(dst, px16(&[7, 7, 7, 7, 9, 9, 9, 9, 5, 5, 5, 5]));
    }

    #[test]
    fn test_widen_row32() {
        let src = px32(&[0xAABBCCDD, 0x11223344]);
        let mut dst = vec![0u8; 16];
        widen_row32x2(&src, &mut dst);
        assert_eq!(dst, px32(&[0xAABBCCDD, 0xAABBCCDD, 0x11223344, 0x11223344]));

        let mut dst = vec![0u8; 32];
        widen_row32x4(&src, &mut dst);
        assert_eq!(
            dst,
            px32(&[
                0xAABBCCDD, 0xAABBCCDD, 0xAABBCCDD, 0xAABBCCDD, 0x11223344, 0x11223344,
                0x11223344, 0x11223344
            ])
        );
    }

    #[test]
    fn test_scale_2x1_16_packed() {
        // [A,B,C,D / E,F,G,H]
        let src = px16(&[0xA, 0xB, 0xC, 0xD, 0xE, 0xF, 0x10, 0x11]);
        let mut dst = vec![0u8; 32];
        let g = BlitGeometry::for_factors(
            PixelDepth::Bpp16,
            ScaleFactors::new(XFactor::X2, YFactor::Y1),
            4,
            2,
            0,
            0,
        );
        PortableScaler.scale(&g, &src, &mut dst);
        assert_eq!(
            dst,
            px16(&[
                0xA, 0xA, 0xB, 0xB, 0xC, 0xC, 0xD, 0xD, 0xE, 0xE, 0xF, 0xF, 0x10, 0x10, 0x11,
                0x11
            ])
        );
    }

    #[test]
    fn test_scale_1x3_32_packed() {
        let src = px32(&[0xDEAD_BEEF, 0x0BAD_F00D]);
        let mut dst = vec![0u8; 24];
        let g = BlitGeometry::for_factors(
            PixelDepth::Bpp32,
            ScaleFactors::new(XFactor::X1, YFactor::Y3),
            2,
            1,
            0,
            0,
        );
        PortableScaler.scale(&g, &src, &mut dst);
        for row in dst.chunks_exact(8) {
            assert_eq!(row, &src[..]);
        }
    }

    #[test]
    fn test_scale_1x1_contiguous_is_copy() {
        let src: Vec<u8> = (0..64).collect();
        let mut dst = vec![0u8; 64];
        let g = BlitGeometry::new(PixelDepth::Bpp16, XFactor::X1, 1, 8, 4, 0, 0);
        PortableScaler.scale(&g, &src, &mut dst);
        assert_eq!(dst, src);
    }

    #[test]
    fn test_scale_respects_padding() {
        // 2 px per row, source stride 8 (4 bytes padding), destination stride 12
        let src = px16(&[1, 2, 0xEE, 0xEE, 3, 4]);
        let mut dst = vec![0xFFu8; 12 * 3 + 8];
        let g = BlitGeometry::new(PixelDepth::Bpp16, XFactor::X2, 2, 2, 2, 8, 12);
        PortableScaler.scale(&g, &src, &mut dst);

        let rows = [
            (0, [1u16, 1, 2, 2]),
            (1, [1, 1, 2, 2]),
            (2, [3, 3, 4, 4]),
            (3, [3, 3, 4, 4]),
        ];
        for (row, expected) in rows {
            assert_eq!(&dst[row * 12..row * 12 + 8], &px16(&expected)[..]);
        }
        // Row padding is never written
        for row in 0..3 {
            assert_eq!(&dst[row * 12 + 8..row * 12 + 12], &[0xFF; 4]);
        }
    }

    #[test]
    fn test_scale_zero_guards() {
        let src = px16(&[1, 2, 3, 4]);
        for g in [
            BlitGeometry::new(PixelDepth::Bpp16, XFactor::X2, 1, 0, 2, 0, 0),
            BlitGeometry::new(PixelDepth::Bpp16, XFactor::X2, 1, 2, 0, 0, 0),
            BlitGeometry::new(PixelDepth::Bpp16, XFactor::X2, 0, 2, 2, 0, 0),
        ] {
            let mut dst = vec![0x5Au8; 32];
            PortableScaler.scale(&g, &src, &mut dst);
            assert!(dst.iter().all(|&b| b == 0x5A));
        }
    }
}
