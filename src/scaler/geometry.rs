//! Buffer geometry for a single scaling call
//!
//! A [`BlitGeometry`] is built by the caller right before a call and dropped
//! right after. It resolves the "zero means tightly packed" stride convention
//! and answers the size questions both strategies need.

use super::{PixelDepth, ScaleError, ScaleFactors, XFactor};

/// Address and stride granularity required by the accelerated path
pub const ALIGNMENT: usize = 4;

/// Which side of the blit a diagnostic refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferSide {
    Source,
    Destination,
}

impl std::fmt::Display for BufferSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BufferSide::Source => f.write_str("Source"),
            BufferSide::Destination => f.write_str("Destination"),
        }
    }
}

/// Resolved source/destination layout
///
/// Strides are in bytes. `dst_stride` is the distance between destination
/// rows, so one source row lands on `ymul` destination rows spaced
/// `dst_stride` apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlitGeometry {
    pub depth: PixelDepth,
    pub x: XFactor,
    /// Destination rows written per source row; zero makes the call a no-op
    pub ymul: usize,
    /// Source width in pixels
    pub width: usize,
    /// Source height in rows
    pub height: usize,
    pub src_stride: usize,
    pub dst_stride: usize,
}

impl BlitGeometry {
    /// Build a geometry, substituting packed strides for zero strides
    pub fn new(
        depth: PixelDepth,
        x: XFactor,
        ymul: usize,
        width: usize,
        height: usize,
        src_stride: usize,
        dst_stride: usize,
    ) -> Self {
        let src_row = width.saturating_mul(depth.bytes_per_pixel());
        let dst_row = src_row.saturating_mul(x.get());
        Self {
            depth,
            x,
            ymul,
            width,
            height,
            src_stride: if src_stride == 0 { src_row } else { src_stride },
            dst_stride: if dst_stride == 0 { dst_row } else { dst_stride },
        }
    }

    /// Build a geometry for one of the supported ratio pairs
    pub fn for_factors(
        depth: PixelDepth,
        factors: ScaleFactors,
        width: usize,
        height: usize,
        src_stride: usize,
        dst_stride: usize,
    ) -> Self {
        Self::new(
            depth,
            factors.x,
            factors.y.get(),
            width,
            height,
            src_stride,
            dst_stride,
        )
    }

    #[inline]
    pub fn bytes_per_pixel(&self) -> usize {
        self.depth.bytes_per_pixel()
    }

    /// Bytes of pixel data in one source row
    #[inline]
    pub fn src_row_bytes(&self) -> usize {
        self.width * self.bytes_per_pixel()
    }

    /// Bytes of pixel data in one destination row
    #[inline]
    pub fn dst_row_bytes(&self) -> usize {
        self.src_row_bytes() * self.x.get()
    }

    /// Destination rows written in total
    #[inline]
    pub fn dst_rows(&self) -> usize {
        self.height * self.ymul
    }

    /// True when the call writes nothing
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0 || self.ymul == 0
    }

    /// True when source and destination are one unbroken run of rows,
    /// so a 1:1 copy can collapse into a single bulk copy
    #[inline]
    pub fn is_contiguous(&self) -> bool {
        let row = self.src_row_bytes();
        self.x == XFactor::X1 && self.ymul == 1 && row == self.src_stride && row == self.dst_stride
    }

    /// Smallest source buffer the call may read, or `None` on overflow
    pub fn required_src_len(&self) -> Option<usize> {
        if self.is_empty() {
            return Some(0);
        }
        let row = self.width.checked_mul(self.bytes_per_pixel())?;
        (self.height - 1).checked_mul(self.src_stride)?.checked_add(row)
    }

    /// Smallest destination buffer the call may write, or `None` on overflow
    pub fn required_dst_len(&self) -> Option<usize> {
        if self.is_empty() {
            return Some(0);
        }
        let row = self
            .width
            .checked_mul(self.bytes_per_pixel())?
            .checked_mul(self.x.get())?;
        let rows = self.height.checked_mul(self.ymul)?;
        (rows - 1).checked_mul(self.dst_stride)?.checked_add(row)
    }

    /// Check strides and buffer lengths against the geometry
    pub fn validate(&self, src_len: usize, dst_len: usize) -> Result<(), ScaleError> {
        if self.is_empty() {
            return Ok(());
        }
        let src_row = self
            .width
            .checked_mul(self.bytes_per_pixel())
            .ok_or(ScaleError::GeometryOverflow)?;
        let dst_row = src_row
            .checked_mul(self.x.get())
            .ok_or(ScaleError::GeometryOverflow)?;

        if self.src_stride < src_row {
            return Err(ScaleError::StrideTooSmall {
                side: BufferSide::Source,
                stride: self.src_stride,
                row_bytes: src_row,
            });
        }
        if self.dst_stride < dst_row {
            return Err(ScaleError::StrideTooSmall {
                side: BufferSide::Destination,
                stride: self.dst_stride,
                row_bytes: dst_row,
            });
        }

        let src_required = self.required_src_len().ok_or(ScaleError::GeometryOverflow)?;
        if src_len < src_required {
            return Err(ScaleError::BufferTooSmall {
                side: BufferSide::Source,
                required: src_required,
                actual: src_len,
            });
        }
        let dst_required = self.required_dst_len().ok_or(ScaleError::GeometryOverflow)?;
        if dst_len < dst_required {
            return Err(ScaleError::BufferTooSmall {
                side: BufferSide::Destination,
                required: dst_required,
                actual: dst_len,
            });
        }
        Ok(())
    }
}

// ==============================================================================
// Alignment
// ==============================================================================

/// Alignment of a call's addresses and strides, derived per call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlignmentClass {
    /// Both addresses and both strides are multiples of [`ALIGNMENT`]
    Word,
    /// At least one of them is not
    Unaligned,
}

impl AlignmentClass {
    pub fn classify(
        src_addr: usize,
        dst_addr: usize,
        src_stride: usize,
        dst_stride: usize,
    ) -> Self {
        let mask = ALIGNMENT - 1;
        if (src_addr | dst_addr | src_stride | dst_stride) & mask == 0 {
            AlignmentClass::Word
        } else {
            AlignmentClass::Unaligned
        }
    }
}
