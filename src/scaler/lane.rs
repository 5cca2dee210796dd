//! 16-byte lane abstraction
//!
//! A [`Lane`] is one vector register's worth of pixel bytes. Every operation
//! here is a fixed-size move or a compile-time byte permutation, which the
//! optimizer lowers to 128-bit loads, shuffles and stores on targets that
//! have them and to plain word moves everywhere else. No target-specific
//! intrinsics are used; both pixel depths go through the same code.

/// Bytes per lane
pub const LANE_BYTES: usize = 16;

/// One 128-bit lane of pixel bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C, align(16))]
pub struct Lane(pub [u8; LANE_BYTES]);

impl Lane {
    pub const ZERO: Lane = Lane([0; LANE_BYTES]);

    /// Load the first 16 bytes of `src`
    #[inline(always)]
    pub fn load(src: &[u8]) -> Self {
        let mut bytes = [0u8; LANE_BYTES];
        bytes.copy_from_slice(&src[..LANE_BYTES]);
        Lane(bytes)
    }

    /// Load the first 8 bytes of `src` into the low half; the high half is zero
    #[inline(always)]
    pub fn load_half(src: &[u8]) -> Self {
        let mut bytes = [0u8; LANE_BYTES];
        bytes[..LANE_BYTES / 2].copy_from_slice(&src[..LANE_BYTES / 2]);
        Lane(bytes)
    }

    /// Store all 16 bytes to the front of `dst`
    #[inline(always)]
    pub fn store(self, dst: &mut [u8]) {
        dst[..LANE_BYTES].copy_from_slice(&self.0);
    }

    /// Spread the lane's pixels `F` times each across `F` lanes
    ///
    /// With `BPP` bytes per pixel, output pixel `i` is input pixel `i / F`.
    /// The permutation is fixed at compile time.
    #[inline(always)]
    pub fn spread<const BPP: usize, const F: usize>(self) -> [Lane; F] {
        let mut out = [Lane::ZERO; F];
        for (index, lane) in out.iter_mut().enumerate() {
            for (byte, slot) in lane.0.iter_mut().enumerate() {
                let at = index * LANE_BYTES + byte;
                let pixel = at / BPP / F;
                *slot = self.0[pixel * BPP + at % BPP];
            }
        }
        out
    }
}

/// `N` consecutive lanes moved as one unit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LaneBlock<const N: usize>(pub [Lane; N]);

impl<const N: usize> LaneBlock<N> {
    pub const BYTES: usize = N * LANE_BYTES;

    #[inline(always)]
    pub fn load(src: &[u8]) -> Self {
        let mut lanes = [Lane::ZERO; N];
        for (lane, chunk) in lanes.iter_mut().zip(src[..Self::BYTES].chunks_exact(LANE_BYTES)) {
            *lane = Lane::load(chunk);
        }
        LaneBlock(lanes)
    }

    #[inline(always)]
    pub fn store(&self, dst: &mut [u8]) {
        for (lane, chunk) in self.0.iter().zip(dst[..Self::BYTES].chunks_exact_mut(LANE_BYTES)) {
            lane.store(chunk);
        }
    }
}

/// Largest block the bulk copy moves per iteration
const BULK_LANES: usize = 8;

#[inline(always)]
fn move_block<const N: usize>(src: &[u8], dst: &mut [u8]) {
    LaneBlock::<N>::load(src).store(dst);
}

#[inline(always)]
fn move_fixed<const B: usize>(src: &[u8], dst: &mut [u8]) {
    let mut bytes = [0u8; B];
    bytes.copy_from_slice(&src[..B]);
    dst[..B].copy_from_slice(&bytes);
}

/// Bulk copy of `src` into the front of `dst`
///
/// Moves 128-byte blocks first, then at most one block each of 64, 32, 16
/// and 8 bytes, then 4, 2 and 1 byte units, so any length finishes in a
/// handful of fixed-size moves after the main loop.
pub fn copy_lanes(dst: &mut [u8], src: &[u8]) {
    let len = src.len();
    let bulk = LaneBlock::<BULK_LANES>::BYTES;
    let body = len - len % bulk;

    for (s, d) in src[..body]
        .chunks_exact(bulk)
        .zip(dst[..body].chunks_exact_mut(bulk))
    {
        move_block::<BULK_LANES>(s, d);
    }

    let mut off = body;
    if len - off >= 64 {
        move_block::<4>(&src[off..], &mut dst[off..]);
        off += 64;
    }
    if len - off >= 32 {
        move_block::<2>(&src[off..], &mut dst[off..]);
        off += 32;
    }
    if len - off >= 16 {
        move_block::<1>(&src[off..], &mut dst[off..]);
        off += 16;
    }
    if len - off >= 8 {
        move_fixed::<8>(&src[off..], &mut dst[off..]);
        off += 8;
    }
    if len - off >= 4 {
        move_fixed::<4>(&src[off..], &mut dst[off..]);
        off += 4;
    }
    if len - off >= 2 {
        move_fixed::<2>(&src[off..], &mut dst[off..]);
        off += 2;
    }
    if len - off >= 1 {
        dst[off] = src[off];
    }
}
