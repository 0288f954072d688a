use crate::error::ConfigError;
use serde::{Deserialize, Serialize};

/// Detection parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectParams {
    /// Run the discoidal background filter before thresholding.
    pub use_filter: bool,
    /// Inner disc radius of the discoidal filter (pixels).
    pub inner_radius: usize,
    /// Outer ring radius of the discoidal filter (pixels).
    pub outer_radius: usize,
    /// Multiplier `k` of the automatic threshold `mean + k·σ`.
    pub threshold_sigma: f64,
    /// Fixed threshold. When set, `threshold_sigma` is ignored.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threshold_value: Option<f32>,
    /// Radius of the suppression disc painted around each accepted peak.
    pub minimum_separation: usize,
}

impl Default for DetectParams {
    fn default() -> Self {
        Self {
            use_filter: true,
            inner_radius: 1,
            outer_radius: 3,
            threshold_sigma: 6.0,
            threshold_value: None,
            minimum_separation: 8,
        }
    }
}

impl DetectParams {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.use_filter && self.inner_radius >= self.outer_radius {
            return Err(ConfigError::InvalidFilterRadii {
                inner: self.inner_radius,
                outer: self.outer_radius,
            });
        }
        if self.minimum_separation == 0 {
            return Err(ConfigError::NonPositiveSeparation);
        }
        if !self.threshold_sigma.is_finite() {
            return Err(ConfigError::InvalidThresholdSigma(self.threshold_sigma));
        }
        if let Some(t) = self.threshold_value {
            if !t.is_finite() {
                return Err(ConfigError::InvalidThresholdValue(t));
            }
        }
        Ok(())
    }
}
