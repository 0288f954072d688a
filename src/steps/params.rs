use crate::error::ConfigError;
use serde::{Deserialize, Serialize};

/// How many segments to fit.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepTarget {
    /// Split until the signal holds this many segments.
    Segments(usize),
    /// Stop at the first rise of `χ² / χ²_counter`.
    #[default]
    Auto,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StepParams {
    /// Per-sample noise standard deviation used to scale χ².
    pub noise_sigma: f64,
    pub target: StepTarget,
}

impl Default for StepParams {
    fn default() -> Self {
        Self {
            noise_sigma: 1.0,
            target: StepTarget::Auto,
        }
    }
}

impl StepParams {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.noise_sigma.is_finite() && self.noise_sigma > 0.0) {
            return Err(ConfigError::InvalidNoiseSigma(self.noise_sigma));
        }
        Ok(())
    }
}
