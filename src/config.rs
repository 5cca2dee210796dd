use anyhow::{Context, Result};
use parking_lot::RwLock;

/// Environment variable selecting the strategy (`auto` or `portable`)
pub const STRATEGY_ENV: &str = "BLITSCALE_STRATEGY";

/// Environment variable selecting the batch size in pixels (`16` or `32`)
pub const BATCH_ENV: &str = "BLITSCALE_BATCH";

/// Which implementation scaling calls are routed through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StrategyPreference {
    /// Accelerated scaler, falling back per call when alignment fails
    #[default]
    Auto,
    /// Portable scaler for every call
    Portable,
}

/// Source pixels expanded per unrolled iteration of the accelerated kernels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BatchSize {
    Pixels16,
    #[default]
    Pixels32,
}

impl BatchSize {
    pub const fn pixels(self) -> usize {
        match self {
            BatchSize::Pixels16 => 16,
            BatchSize::Pixels32 => 32,
        }
    }
}

/// Runtime scaler configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScalerConfig {
    pub strategy: StrategyPreference,
    pub batch: BatchSize,
}

impl ScalerConfig {
    pub const DEFAULT: ScalerConfig = ScalerConfig {
        strategy: StrategyPreference::Auto,
        batch: BatchSize::Pixels32,
    };

    /// Build a configuration from the process environment
    ///
    /// Unset variables keep their defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from any key lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();
        if let Some(value) = lookup(STRATEGY_ENV) {
            config.strategy =
                parse_strategy(&value).with_context(|| format!("Invalid {}", STRATEGY_ENV))?;
        }
        if let Some(value) = lookup(BATCH_ENV) {
            config.batch = parse_batch(&value).with_context(|| format!("Invalid {}", BATCH_ENV))?;
        }
        Ok(config)
    }
}

impl Default for ScalerConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Parse a strategy name
pub fn parse_strategy(s: &str) -> Result<StrategyPreference> {
    match s.trim().to_ascii_lowercase().as_str() {
        "auto" | "accelerated" | "neon" => Ok(StrategyPreference::Auto),
        "portable" | "c" | "scalar" => Ok(StrategyPreference::Portable),
        other => anyhow::bail!("Unknown strategy '{}' (expected auto or portable)", other),
    }
}

/// Parse a batch size in pixels
pub fn parse_batch(s: &str) -> Result<BatchSize> {
    let pixels: u32 = s.trim().parse().context("Batch size must be a number")?;
    batch_from_pixels(pixels)
}

/// Map a pixel count onto a supported batch size
pub fn batch_from_pixels(pixels: u32) -> Result<BatchSize> {
    match pixels {
        16 => Ok(BatchSize::Pixels16),
        32 => Ok(BatchSize::Pixels32),
        other => anyhow::bail!("Batch size must be 16 or 32 pixels, got {}", other),
    }
}

// ==============================================================================
// Active configuration
// ==============================================================================

static ACTIVE: RwLock<ScalerConfig> = parking_lot::const_rwlock(ScalerConfig::DEFAULT);

/// Snapshot of the configuration scaling calls use
pub fn active() -> ScalerConfig {
    *ACTIVE.read()
}

/// Replace the active configuration
pub fn install(config: ScalerConfig) {
    log::info!(
        "scaler configured: strategy={:?} batch={} px",
        config.strategy,
        config.batch.pixels()
    );
    *ACTIVE.write() = config;
}

/// Load the environment configuration and make it active
pub fn install_from_env() -> Result<ScalerConfig> {
    let config = ScalerConfig::from_env()?;
    install(config);
    Ok(config)
}
