//! Configuration validation errors.
//!
//! Numerical degeneracy is never reported here: singular systems and
//! degenerate sample counts surface as NaN in the fitted values. These errors
//! only describe parameter sets that must be rejected before any work runs.
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("filter inner radius {inner} must be smaller than outer radius {outer}")]
    InvalidFilterRadii { inner: usize, outer: usize },
    #[error("minimum separation between peaks must be positive")]
    NonPositiveSeparation,
    #[error("threshold sigma multiplier must be finite, got {0}")]
    InvalidThresholdSigma(f64),
    #[error("fixed threshold value must be finite, got {0}")]
    InvalidThresholdValue(f32),
    #[error("fit radius must be at least 1 pixel")]
    ZeroFitRadius,
    #[error("maximum error for parameter {index} must be a non-negative number, got {value}")]
    InvalidMaxError { index: usize, value: f64 },
    #[error("sensor bit depth must be between 1 and 32, got {0}")]
    InvalidSensorBits(u8),
    #[error("saturation level must be finite, got {0}")]
    InvalidSaturation(f32),
    #[error("look-ahead must cover at least one frame")]
    ZeroLookAhead,
    #[error("maximum step distance must be positive and finite, got {0}")]
    InvalidMaxStep(f64),
    #[error("noise sigma must be positive and finite, got {0}")]
    InvalidNoiseSigma(f64),
    #[error("{name} must be positive and finite, got {value}")]
    NonPositive { name: &'static str, value: f64 },
    #[error("{name} must be non-negative and finite, got {value}")]
    Negative { name: &'static str, value: f64 },
}
