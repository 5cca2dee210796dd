//! Accelerated scaler
//!
//! Same contract as [`PortableScaler`], strictly faster. Eligibility is
//! decided once per call by [`select_strategy`]; an unaligned call goes to
//! the portable routine whole, never partly accelerated.

use super::geometry::BlitGeometry;
use super::kernels;
use super::portable::PortableScaler;
use super::{select_strategy, PixelDepth, PixelScaler, StrategyKind, XFactor};
use crate::config::BatchSize;

/// Lane-based implementation gated on 4-byte alignment
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AcceleratedScaler {
    batch: BatchSize,
}

impl AcceleratedScaler {
    /// Create a scaler that expands `batch` source pixels per unrolled iteration
    pub const fn new(batch: BatchSize) -> Self {
        Self { batch }
    }

    pub fn batch(&self) -> BatchSize {
        self.batch
    }

    /// Run the lane kernels without the alignment gate
    ///
    /// The kernels produce correct output at any alignment; the gate in
    /// [`PixelScaler::scale`] only keeps misaligned calls off the wide
    /// loads where they would be slower.
    pub fn scale_vectorized(&self, g: &BlitGeometry, src: &[u8], dst: &mut [u8]) {
        if g.is_empty() {
            return;
        }
        debug_assert_eq!(g.validate(src.len(), dst.len()), Ok(()));

        match (g.depth, g.x) {
            (_, XFactor::X1) => kernels::copy_rows(g, src, dst),
            (PixelDepth::Bpp16, XFactor::X2) => {
                kernels::expand_rows::<2, 2>(g, src, dst, self.batch)
            }
            (PixelDepth::Bpp16, XFactor::X4) => {
                kernels::expand_rows::<2, 4>(g, src, dst, self.batch)
            }
            (PixelDepth::Bpp32, XFactor::X2) => {
                kernels::expand_rows::<4, 2>(g, src, dst, self.batch)
            }
            (PixelDepth::Bpp32, XFactor::X4) => {
                kernels::expand_rows::<4, 4>(g, src, dst, self.batch)
            }
        }
    }
}

impl PixelScaler for AcceleratedScaler {
    fn name(&self) -> &'static str {
        "accelerated"
    }

    fn scale(&self, geometry: &BlitGeometry, src: &[u8], dst: &mut [u8]) {
        if geometry.is_empty() {
            return;
        }
        match select_strategy(geometry, src.as_ptr(), dst.as_ptr()) {
            StrategyKind::Accelerated => self.scale_vectorized(geometry, src, dst),
            StrategyKind::Portable => {
                log::trace!(
                    "unaligned blit (src {:p} / {}, dst {:p} / {}), using portable scaler",
                    src.as_ptr(),
                    geometry.src_stride,
                    dst.as_ptr(),
                    geometry.dst_stride
                );
                PortableScaler.scale(geometry, src, dst)
            }
        }
    }
}
