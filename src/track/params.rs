use crate::error::ConfigError;
use serde::{Deserialize, Serialize};

/// Linking parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkParams {
    /// Largest frame gap a link may bridge (1 = consecutive frames only).
    pub look_ahead: usize,
    /// Links must be strictly shorter than this distance (pixels).
    pub max_step: f64,
    /// Keep localizations that ended up in no trajectory.
    pub keep_unlinked: bool,
}

impl Default for LinkParams {
    fn default() -> Self {
        Self {
            look_ahead: 1,
            max_step: 8.0,
            keep_unlinked: false,
        }
    }
}

impl LinkParams {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.look_ahead == 0 {
            return Err(ConfigError::ZeroLookAhead);
        }
        if !(self.max_step.is_finite() && self.max_step > 0.0) {
            return Err(ConfigError::InvalidMaxStep(self.max_step));
        }
        Ok(())
    }
}
