use crate::error::ConfigError;
use serde::{Deserialize, Serialize};

/// Bit depth assumed for the sensor when neither the config nor the frame
/// loader provides one.
pub const DEFAULT_SENSOR_BITS: u8 = 16;

/// Which samples count as saturated and are left out of the fit window.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Saturation {
    /// Fit every sample.
    Off,
    /// Exclude samples at or above this level.
    Level(f32),
    /// Exclude samples at the full-scale value of the sensor bit depth.
    #[default]
    SensorMax,
}

/// Gaussian fitting parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FitParams {
    /// Half-width of the square fit window (window side is `2r + 1`).
    pub fit_radius: usize,
    /// Largest accepted standard error per parameter, in parameter order
    /// `[baseline, amplitude, x0, y0, sigma_x, sigma_y]`.
    pub max_errors: [f64; 6],
    pub saturation: Saturation,
    /// Sensor bit depth used by [`Saturation::SensorMax`]; taken from the
    /// loaded frames when unset, else [`DEFAULT_SENSOR_BITS`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sensor_bits: Option<u8>,
}

impl Default for FitParams {
    fn default() -> Self {
        Self {
            fit_radius: 4,
            max_errors: [5000.0, 5000.0, 1.0, 1.0, 1.0, 1.0],
            saturation: Saturation::default(),
            sensor_bits: None,
        }
    }
}

impl FitParams {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fit_radius == 0 {
            return Err(ConfigError::ZeroFitRadius);
        }
        for (index, &value) in self.max_errors.iter().enumerate() {
            if value.is_nan() || value < 0.0 {
                return Err(ConfigError::InvalidMaxError { index, value });
            }
        }
        if let Some(bits) = self.sensor_bits {
            if bits == 0 || bits > 32 {
                return Err(ConfigError::InvalidSensorBits(bits));
            }
        }
        if let Saturation::Level(level) = self.saturation {
            if !level.is_finite() {
                return Err(ConfigError::InvalidSaturation(level));
            }
        }
        Ok(())
    }

    /// Level at or above which samples are excluded, if any.
    pub fn saturation_level(&self) -> Option<f32> {
        match self.saturation {
            Saturation::Off => None,
            Saturation::Level(level) => Some(level),
            Saturation::SensorMax => {
                let bits = self.sensor_bits.unwrap_or(DEFAULT_SENSOR_BITS);
                Some(((1u64 << bits) - 1) as f32)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sensor_max_follows_bit_depth() {
        let mut params = FitParams::default();
        assert_eq!(params.saturation_level(), Some(65535.0));
        params.sensor_bits = Some(8);
        assert_eq!(params.saturation_level(), Some(255.0));
        params.saturation = Saturation::Level(1000.0);
        assert_eq!(params.saturation_level(), Some(1000.0));
        params.saturation = Saturation::Off;
        assert_eq!(params.saturation_level(), None);
    }

    #[test]
    fn saturation_policy_parses_from_json() {
        let params: FitParams =
            serde_json::from_str(r#"{ "saturation": { "level": 4095.0 } }"#).expect("valid json");
        assert_eq!(params.saturation, Saturation::Level(4095.0));
        let params: FitParams = serde_json::from_str(r#"{ "saturation": "off" }"#).expect("valid json");
        assert_eq!(params.saturation_level(), None);
    }

    #[test]
    fn rejects_bad_sensor_bits() {
        let params = FitParams {
            sensor_bits: Some(0),
            ..FitParams::default()
        };
        assert_eq!(params.validate(), Err(ConfigError::InvalidSensorBits(0)));
    }
}
