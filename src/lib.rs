// blitscale: integer-ratio framebuffer scaling for the video output driver

pub mod cli;
pub mod config;
pub mod ffi;
pub mod logging;
pub mod scaler;

pub use config::{BatchSize, ScalerConfig, StrategyPreference};
pub use logging::LogLevel;
pub use scaler::{
    scale_frame, AcceleratedScaler, BlitGeometry, PixelDepth, PixelScaler, PortableScaler,
    ScaleError, ScaleFactors, Strategy, XFactor, YFactor,
};
