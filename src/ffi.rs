//! Dispatch façade - C ABI entry points for the video driver.
//!
//! The driver picks one of the `scale{X}x{Y}_{16,32}` functions by pixel
//! depth and ratio and calls it once per frame:
//!
//! ```c
//! void scale2x2_16(void* data, void* src, void* dst,
//!                  uint32_t sw, uint32_t sh, uint32_t sp, uint32_t dp);
//! ```
//!
//! # Safety Requirements
//!
//! - `src` must be readable for `(sh - 1) * sp + sw * bpp` bytes.
//! - `dst` must be writable for `(sh * ymul - 1) * dp + sw * bpp * xmul` bytes.
//! - A stride of zero means "tightly packed".
//! - `src` and `dst` must not overlap.
//! - `data` is the driver's context slot; it is never dereferenced.
//!
//! Each call validates the geometry (strides at least one row wide, no
//! address overflow) and rejects null pointers, logging the reason and
//! writing nothing. Buffer lengths cannot be checked from here; they are
//! the driver's responsibility.

use libc::c_int;
use std::ffi::c_void;
use std::ops::Range;

use crate::config::{self, ScalerConfig, StrategyPreference};
use crate::logging::{self, LogLevel};
use crate::scaler::{
    BlitGeometry, PixelDepth, PixelScaler, ScaleError, ScaleFactors, Strategy, XFactor, YFactor,
};

/// Signature shared by every exported scaling entry point
pub type ScaleFn = unsafe extern "C" fn(
    data: *mut c_void,
    src: *const c_void,
    dst: *mut c_void,
    sw: u32,
    sh: u32,
    sp: u32,
    dp: u32,
);

/// Geometry for a raw call, validated against the lengths it implies
fn raw_geometry(
    depth: PixelDepth,
    factors: ScaleFactors,
    sw: u32,
    sh: u32,
    sp: u32,
    dp: u32,
) -> Result<(BlitGeometry, usize, usize), ScaleError> {
    let geometry = BlitGeometry::for_factors(
        depth,
        factors,
        sw as usize,
        sh as usize,
        sp as usize,
        dp as usize,
    );
    let src_len = geometry
        .required_src_len()
        .ok_or(ScaleError::GeometryOverflow)?;
    let dst_len = geometry
        .required_dst_len()
        .ok_or(ScaleError::GeometryOverflow)?;
    geometry.validate(src_len, dst_len)?;
    Ok((geometry, src_len, dst_len))
}

/// Shared body of every bridge
///
/// # Safety
/// See the module documentation.
#[allow(clippy::too_many_arguments)]
unsafe fn dispatch(
    depth: PixelDepth,
    factors: ScaleFactors,
    src: *const c_void,
    dst: *mut c_void,
    sw: u32,
    sh: u32,
    sp: u32,
    dp: u32,
) {
    if sw == 0 || sh == 0 {
        return;
    }
    if src.is_null() || dst.is_null() {
        log::error!(
            "scale{}_{}: null buffer (src {:p}, dst {:p})",
            factors,
            depth.bits(),
            src,
            dst
        );
        return;
    }

    let (geometry, src_len, dst_len) = match raw_geometry(depth, factors, sw, sh, sp, dp) {
        Ok(parts) => parts,
        Err(e) => {
            log::error!(
                "scale{}_{}: rejected {}x{} (sp {}, dp {}): {}",
                factors,
                depth.bits(),
                sw,
                sh,
                sp,
                dp,
                e
            );
            return;
        }
    };

    let src = std::slice::from_raw_parts(src as *const u8, src_len);
    let dst = std::slice::from_raw_parts_mut(dst as *mut u8, dst_len);
    debug_assert!(
        !ranges_overlap(src.as_ptr_range(), dst.as_ptr_range()),
        "source and destination overlap"
    );

    Strategy::from_config(&config::active()).scale(&geometry, src, dst);
}

fn ranges_overlap(a: Range<*const u8>, b: Range<*const u8>) -> bool {
    let (a_start, a_end) = (a.start as usize, a.end as usize);
    let (b_start, b_end) = (b.start as usize, b.end as usize);
    a_start < b_end && b_start < a_end
}

macro_rules! bridges {
    ($($name:ident => $depth:ident, $x:ident, $y:ident;)*) => {
        $(
            /// Driver bridge; `_data` is the unused driver context slot.
            ///
            /// # Safety
            /// See the module documentation.
            #[no_mangle]
            pub unsafe extern "C" fn $name(
                _data: *mut c_void,
                src: *const c_void,
                dst: *mut c_void,
                sw: u32,
                sh: u32,
                sp: u32,
                dp: u32,
            ) {
                dispatch(
                    PixelDepth::$depth,
                    ScaleFactors::new(XFactor::$x, YFactor::$y),
                    src,
                    dst,
                    sw,
                    sh,
                    sp,
                    dp,
                )
            }
        )*
    };
}

bridges! {
    scale1x1_16 => Bpp16, X1, Y1;
    scale1x2_16 => Bpp16, X1, Y2;
    scale1x3_16 => Bpp16, X1, Y3;
    scale1x4_16 => Bpp16, X1, Y4;
    scale2x1_16 => Bpp16, X2, Y1;
    scale2x2_16 => Bpp16, X2, Y2;
    scale2x3_16 => Bpp16, X2, Y3;
    scale2x4_16 => Bpp16, X2, Y4;
    scale4x1_16 => Bpp16, X4, Y1;
    scale4x2_16 => Bpp16, X4, Y2;
    scale4x3_16 => Bpp16, X4, Y3;
    scale4x4_16 => Bpp16, X4, Y4;
    scale1x1_32 => Bpp32, X1, Y1;
    scale1x2_32 => Bpp32, X1, Y2;
    scale1x3_32 => Bpp32, X1, Y3;
    scale1x4_32 => Bpp32, X1, Y4;
    scale2x1_32 => Bpp32, X2, Y1;
    scale2x2_32 => Bpp32, X2, Y2;
    scale2x3_32 => Bpp32, X2, Y3;
    scale2x4_32 => Bpp32, X2, Y4;
    scale4x1_32 => Bpp32, X4, Y1;
    scale4x2_32 => Bpp32, X4, Y2;
    scale4x3_32 => Bpp32, X4, Y3;
    scale4x4_32 => Bpp32, X4, Y4;
}

/// Look up the bridge for a depth and ratio pair
pub fn scaler_fn(depth: PixelDepth, factors: ScaleFactors) -> ScaleFn {
    use XFactor::*;
    use YFactor::*;
    match (depth, factors.x, factors.y) {
        (PixelDepth::Bpp16, X1, Y1) => scale1x1_16,
        (PixelDepth::Bpp16, X1, Y2) => scale1x2_16,
        (PixelDepth::Bpp16, X1, Y3) => scale1x3_16,
        (PixelDepth::Bpp16, X1, Y4) => scale1x4_16,
        (PixelDepth::Bpp16, X2, Y1) => scale2x1_16,
        (PixelDepth::Bpp16, X2, Y2) => scale2x2_16,
        (PixelDepth::Bpp16, X2, Y3) => scale2x3_16,
        (PixelDepth::Bpp16, X2, Y4) => scale2x4_16,
        (PixelDepth::Bpp16, X4, Y1) => scale4x1_16,
        (PixelDepth::Bpp16, X4, Y2) => scale4x2_16,
        (PixelDepth::Bpp16, X4, Y3) => scale4x3_16,
        (PixelDepth::Bpp16, X4, Y4) => scale4x4_16,
        (PixelDepth::Bpp32, X1, Y1) => scale1x1_32,
        (PixelDepth::Bpp32, X1, Y2) => scale1x2_32,
        (PixelDepth::Bpp32, X1, Y3) => scale1x3_32,
        (PixelDepth::Bpp32, X1, Y4) => scale1x4_32,
        (PixelDepth::Bpp32, X2, Y1) => scale2x1_32,
        (PixelDepth::Bpp32, X2, Y2) => scale2x2_32,
        (PixelDepth::Bpp32, X2, Y3) => scale2x3_32,
        (PixelDepth::Bpp32, X2, Y4) => scale2x4_32,
        (PixelDepth::Bpp32, X4, Y1) => scale4x1_32,
        (PixelDepth::Bpp32, X4, Y2) => scale4x2_32,
        (PixelDepth::Bpp32, X4, Y3) => scale4x3_32,
        (PixelDepth::Bpp32, X4, Y4) => scale4x4_32,
    }
}

/// Driver-side lookup by integers
///
/// Returns NULL for an unsupported depth or ratio.
#[no_mangle]
pub extern "C" fn blitscale_select(bpp: u32, xmul: u32, ymul: u32) -> Option<ScaleFn> {
    let depth = PixelDepth::from_bits(bpp);
    let factors = ScaleFactors::try_from((xmul, ymul));
    match (depth, factors) {
        (Ok(depth), Ok(factors)) => Some(scaler_fn(depth, factors)),
        (Err(e), _) | (_, Err(e)) => {
            log::warn!("blitscale_select({}, {}, {}): {}", bpp, xmul, ymul, e);
            None
        }
    }
}

/// Set the strategy (0 = auto, 1 = portable) and batch size (16 or 32 pixels)
///
/// Returns 0 on success, -1 on an invalid argument (configuration unchanged).
#[no_mangle]
pub extern "C" fn blitscale_configure(strategy: c_int, batch_pixels: c_int) -> c_int {
    let strategy = match strategy {
        0 => StrategyPreference::Auto,
        1 => StrategyPreference::Portable,
        other => {
            log::warn!("blitscale_configure: unknown strategy {}", other);
            return -1;
        }
    };
    let batch = match u32::try_from(batch_pixels)
        .map_err(anyhow::Error::from)
        .and_then(config::batch_from_pixels)
    {
        Ok(batch) => batch,
        Err(e) => {
            log::warn!("blitscale_configure: {}", e);
            return -1;
        }
    };
    config::install(ScalerConfig { strategy, batch });
    0
}

/// Load `BLITSCALE_*` environment settings. Returns 0 on success, -1 on a parse error.
#[no_mangle]
pub extern "C" fn blitscale_configure_from_env() -> c_int {
    match config::install_from_env() {
        Ok(_) => 0,
        Err(e) => {
            log::error!("blitscale_configure_from_env: {:#}", e);
            -1
        }
    }
}

/// Install the stderr logger at the driver's verbosity level (0..6)
///
/// Returns 0 on success, -1 if the host already installed another logger
/// (the level is applied either way).
#[no_mangle]
pub extern "C" fn blitscale_log_init(level: c_int) -> c_int {
    match logging::init(LogLevel::from_i32(level)) {
        Ok(()) => 0,
        Err(_) => -1,
    }
}
