//! Integer-ratio nearest-neighbor pixel scaling
//!
//! This module is the final blit stage of the video output path: it takes a
//! rendered frame and enlarges it by integer factors, replicating pixel
//! values unchanged. Two strategies do the same job at different speeds:
//!
//! - [`PortableScaler`]: alignment-agnostic word-at-a-time replication.
//! - [`AcceleratedScaler`]: 16-byte lane kernels gated on 4-byte alignment,
//!   falling back to the portable path when the gate fails.
//!
//! Both implement [`PixelScaler`] and must produce byte-identical output.
//!
//! Key concepts:
//! - [`BlitGeometry`]: resolved source/destination layout for one call
//! - [`ScaleFactors`]: closed set of supported ratios ({1,2,4} x {1,2,3,4})
//! - [`select_strategy`]: pure capability check picking the implementation

pub mod accelerated;
pub mod geometry;
pub mod kernels;
pub mod lane;
pub mod portable;


pub use accelerated::AcceleratedScaler;
pub use geometry::{AlignmentClass, BlitGeometry, BufferSide, ALIGNMENT};
pub use lane::{Lane, LaneBlock, LANE_BYTES};
pub use portable::PortableScaler;

use crate::config::{BatchSize, ScalerConfig, StrategyPreference};

// ==============================================================================
// Pixel Depth
// ==============================================================================

/// Packed pixel size class
///
/// The scaler never looks inside a pixel; only its width in bytes matters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PixelDepth {
    /// 16-bit packed pixels (RGB565 and friends)
    Bpp16 = 16,
    /// 32-bit packed pixels (XRGB8888 and friends)
    Bpp32 = 32,
}

impl PixelDepth {
    /// Bytes occupied by one pixel
    pub const fn bytes_per_pixel(self) -> usize {
        match self {
            PixelDepth::Bpp16 => 2,
            PixelDepth::Bpp32 => 4,
        }
    }

    /// Bits per pixel, as the driver names formats
    pub const fn bits(self) -> u32 {
        self as u32
    }

    /// Map a driver bit count onto a supported depth
    pub fn from_bits(bits: u32) -> Result<Self, ScaleError> {
        match bits {
            16 => Ok(PixelDepth::Bpp16),
            32 => Ok(PixelDepth::Bpp32),
            _ => Err(ScaleError::UnsupportedDepth { bits }),
        }
    }
}

// ==============================================================================
// Scale Factors
// ==============================================================================

/// Horizontal replication factor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum XFactor {
    X1 = 1,
    X2 = 2,
    X4 = 4,
}

impl XFactor {
    /// Number of destination pixels produced per source pixel
    pub const fn get(self) -> usize {
        self as usize
    }
}

impl TryFrom<u32> for XFactor {
    type Error = u32;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(XFactor::X1),
            2 => Ok(XFactor::X2),
            4 => Ok(XFactor::X4),
            other => Err(other),
        }
    }
}

/// Vertical replication factor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum YFactor {
    Y1 = 1,
    Y2 = 2,
    Y3 = 3,
    Y4 = 4,
}

impl YFactor {
    /// Number of destination rows produced per source row
    pub const fn get(self) -> usize {
        self as usize
    }
}

impl TryFrom<u32> for YFactor {
    type Error = u32;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(YFactor::Y1),
            2 => Ok(YFactor::Y2),
            3 => Ok(YFactor::Y3),
            4 => Ok(YFactor::Y4),
            other => Err(other),
        }
    }
}

/// A supported (horizontal, vertical) ratio pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScaleFactors {
    pub x: XFactor,
    pub y: YFactor,
}

impl ScaleFactors {
    pub const fn new(x: XFactor, y: YFactor) -> Self {
        Self { x, y }
    }

    /// Every supported combination, x-major
    pub const ALL: [ScaleFactors; 12] = [
        ScaleFactors::new(XFactor::X1, YFactor::Y1),
        ScaleFactors::new(XFactor::X1, YFactor::Y2),
        ScaleFactors::new(XFactor::X1, YFactor::Y3),
        ScaleFactors::new(XFactor::X1, YFactor::Y4),
        ScaleFactors::new(XFactor::X2, YFactor::Y1),
        ScaleFactors::new(XFactor::X2, YFactor::Y2),
        ScaleFactors::new(XFactor::X2, YFactor::Y3),
        ScaleFactors::new(XFactor::X2, YFactor::Y4),
        ScaleFactors::new(XFactor::X4, YFactor::Y1),
        ScaleFactors::new(XFactor::X4, YFactor::Y2),
        ScaleFactors::new(XFactor::X4, YFactor::Y3),
        ScaleFactors::new(XFactor::X4, YFactor::Y4),
    ];
}

impl TryFrom<(u32, u32)> for ScaleFactors {
    type Error = ScaleError;

    fn try_from((x, y): (u32, u32)) -> Result<Self, Self::Error> {
        match (XFactor::try_from(x), YFactor::try_from(y)) {
            (Ok(x), Ok(y)) => Ok(ScaleFactors { x, y }),
            _ => Err(ScaleError::UnsupportedFactor { x, y }),
        }
    }
}

impl std::fmt::Display for ScaleFactors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.x.get(), self.y.get())
    }
}

// ==============================================================================
// Scaling Errors
// ==============================================================================

/// Errors reported by the validating entry points
///
/// The scaling strategies themselves never fail; these come from checking a
/// caller's geometry before any pixel is touched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScaleError {
    #[error("Unsupported scale ratio: {x}x{y}")]
    UnsupportedFactor { x: u32, y: u32 },

    #[error("Unsupported pixel depth: {bits} bits")]
    UnsupportedDepth { bits: u32 },

    #[error("{side} stride {stride} is smaller than the row size {row_bytes}")]
    StrideTooSmall {
        side: BufferSide,
        stride: usize,
        row_bytes: usize,
    },

    #[error("{side} buffer holds {actual} bytes, {required} required")]
    BufferTooSmall {
        side: BufferSide,
        required: usize,
        actual: usize,
    },

    #[error("Buffer geometry overflows the address space")]
    GeometryOverflow,
}

// ==============================================================================
// Scaler Trait
// ==============================================================================

/// A scaling implementation
///
/// `geometry` must already describe buffers that fit `src` and `dst`
/// (see [`BlitGeometry::validate`]). Implementations never fail; an
/// undersized slice panics on indexing.
pub trait PixelScaler {
    /// Short name for diagnostics
    fn name(&self) -> &'static str;

    /// Replicate `src` into `dst` according to `geometry`
    fn scale(&self, geometry: &BlitGeometry, src: &[u8], dst: &mut [u8]);
}

/// Which implementation a call is eligible for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    Portable,
    Accelerated,
}

/// Capability check for the accelerated path
///
/// Pure function of the two base addresses and the resolved strides.
pub fn select_strategy(geometry: &BlitGeometry, src: *const u8, dst: *const u8) -> StrategyKind {
    match AlignmentClass::classify(
        src as usize,
        dst as usize,
        geometry.src_stride,
        geometry.dst_stride,
    ) {
        AlignmentClass::Word => StrategyKind::Accelerated,
        AlignmentClass::Unaligned => StrategyKind::Portable,
    }
}

/// The two interchangeable strategies behind one interface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Portable(PortableScaler),
    Accelerated(AcceleratedScaler),
}

impl Strategy {
    /// Build the strategy a configuration asks for
    pub fn from_config(config: &ScalerConfig) -> Self {
        match config.strategy {
            StrategyPreference::Portable => Strategy::Portable(PortableScaler),
            StrategyPreference::Auto => Strategy::Accelerated(AcceleratedScaler::new(config.batch)),
        }
    }
}

impl Default for Strategy {
    fn default() -> Self {
        Strategy::Accelerated(AcceleratedScaler::new(BatchSize::default()))
    }
}

impl PixelScaler for Strategy {
    fn name(&self) -> &'static str {
        match self {
            Strategy::Portable(s) => s.name(),
            Strategy::Accelerated(s) => s.name(),
        }
    }

    #[inline]
    fn scale(&self, geometry: &BlitGeometry, src: &[u8], dst: &mut [u8]) {
        match self {
            Strategy::Portable(s) => s.scale(geometry, src, dst),
            Strategy::Accelerated(s) => s.scale(geometry, src, dst),
        }
    }
}

/// Validate `geometry` against the buffers, then scale with the active configuration
pub fn scale_frame(geometry: &BlitGeometry, src: &[u8], dst: &mut [u8]) -> Result<(), ScaleError> {
    if geometry.is_empty() {
        return Ok(());
    }
    geometry.validate(src.len(), dst.len())?;
    Strategy::from_config(&crate::config::active()).scale(geometry, src, dst);
    Ok(())
}
