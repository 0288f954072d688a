//! Step size distribution of linked trajectories.
//!
//! The lengths of single-frame link steps are binned into a normalized
//! histogram and fitted with the 2D Brownian step density
//! `p(r) = (2r / msd) · exp(-r² / msd)`, giving `D = msd / (4·Δt)`.
use super::linker::Linkage;
use crate::error::ConfigError;
use crate::lmfit::{LmSolver, Model, Observation};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StepSizeParams {
    /// Seconds between consecutive frames.
    pub frame_interval: f64,
    /// Physical size of one pixel (µm).
    pub pixel_size: f64,
    /// Histogram bin width (µm).
    pub binning: f64,
    /// Bins centred below this step size (µm) are left out of the fit.
    pub min_step_size: f64,
}

impl Default for StepSizeParams {
    fn default() -> Self {
        Self {
            frame_interval: 0.034,
            pixel_size: 0.1,
            binning: 0.001,
            min_step_size: 0.0,
        }
    }
}

impl StepSizeParams {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("frame_interval", self.frame_interval),
            ("pixel_size", self.pixel_size),
            ("binning", self.binning),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::NonPositive { name, value });
            }
        }
        if !(self.min_step_size.is_finite() && self.min_step_size >= 0.0) {
            return Err(ConfigError::Negative {
                name: "min_step_size",
                value: self.min_step_size,
            });
        }
        Ok(())
    }
}

/// Normalized step size histogram.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StepSizeHistogram {
    /// Bin centres (µm).
    pub centres: Vec<f64>,
    /// Probability density per bin; integrates to 1 over all bins.
    pub density: Vec<f64>,
    /// Mean square step size over every step (µm²).
    pub msd: f64,
    pub steps: usize,
}

/// Fitted step size density.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct StepSizeFit {
    pub msd: f64,
    pub msd_error: f64,
    pub d: f64,
    pub d_error: f64,
    pub r_squared: f64,
    /// Histogram bins used in the fit.
    pub bins: usize,
}

#[derive(Clone, Copy, Debug)]
struct StepDensity;

impl Model<1> for StepDensity {
    fn value(&self, x: &[f64; 1], p: &[f64]) -> f64 {
        let (r, msd) = (x[0], p[0]);
        2.0 * r / msd * (-r * r / msd).exp()
    }

    fn gradient(&self, x: &[f64; 1], p: &[f64], dyda: &mut [f64]) {
        let (r, msd) = (x[0], p[0]);
        dyda[0] = self.value(x, p) * (r * r / msd - 1.0) / msd;
    }
}

/// Physical lengths of every accepted link spanning exactly one frame.
pub fn step_sizes(linkage: &Linkage, params: &StepSizeParams) -> Vec<f64> {
    linkage
        .records
        .iter()
        .filter_map(|r| r.step)
        .filter(|s| s.gap == 1)
        .map(|s| s.step_size * params.pixel_size)
        .collect()
}

/// Bin `sizes` into a density histogram; `None` without steps.
pub fn step_size_histogram(sizes: &[f64], params: &StepSizeParams) -> Option<StepSizeHistogram> {
    if sizes.is_empty() {
        return None;
    }
    let max = sizes.iter().copied().fold(0.0f64, f64::max);
    let bins = (max / params.binning) as usize + 1;
    let mut counts = vec![0usize; bins];
    for &s in sizes {
        counts[((s / params.binning) as usize).min(bins - 1)] += 1;
    }
    let n = sizes.len() as f64;
    let norm = n * params.binning;
    Some(StepSizeHistogram {
        centres: (0..bins).map(|i| (i as f64 + 0.5) * params.binning).collect(),
        density: counts.iter().map(|&c| c as f64 / norm).collect(),
        msd: sizes.iter().map(|s| s * s).sum::<f64>() / n,
        steps: sizes.len(),
    })
}

/// Fit the step density to `histogram`, seeded with its empirical msd.
pub fn fit_step_sizes(
    histogram: &StepSizeHistogram,
    params: &StepSizeParams,
) -> Option<StepSizeFit> {
    let observations: Vec<Observation<1>> = histogram
        .centres
        .iter()
        .zip(&histogram.density)
        .filter(|(r, _)| **r >= params.min_step_size)
        .map(|(&r, &p)| Observation::new([r], p))
        .collect();
    if observations.is_empty() || histogram.msd <= 0.0 {
        return None;
    }
    let fit = LmSolver::default().solve(&StepDensity, &observations, &[histogram.msd], None);
    if fit.has_nan() {
        warn!("step size fit over {} bins produced NaN", observations.len());
        return None;
    }
    let scale = 4.0 * params.frame_interval;
    debug!(
        "step sizes: steps={} bins={} msd={:.6} fitted={:.6}",
        histogram.steps,
        observations.len(),
        histogram.msd,
        fit.params[0]
    );
    Some(StepSizeFit {
        msd: fit.params[0],
        msd_error: fit.errors[0],
        d: fit.params[0] / scale,
        d_error: fit.errors[0] / scale,
        r_squared: fit.r_squared,
        bins: observations.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::track::{link_particles, LinkParams, Spot};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn unit_params(binning: f64) -> StepSizeParams {
        StepSizeParams {
            frame_interval: 1.0,
            pixel_size: 1.0,
            binning,
            min_step_size: 0.0,
        }
    }

    fn gaussian(rng: &mut StdRng, sigma: f64) -> f64 {
        let u1: f64 = rng.gen_range(f64::EPSILON..1.0);
        let u2: f64 = rng.gen_range(0.0..1.0);
        sigma * (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos()
    }

    #[test]
    fn only_single_frame_steps_are_counted() {
        let spots = [
            Spot::new(0, 0.0, 0.0),
            Spot::new(1, 3.0, 4.0),
            Spot::new(3, 3.0, 5.0),
        ];
        let p = LinkParams {
            look_ahead: 2,
            ..LinkParams::default()
        };
        let linkage = link_particles(&spots, &p).expect("valid params");
        let params = StepSizeParams {
            pixel_size: 0.5,
            ..unit_params(0.1)
        };
        assert_eq!(step_sizes(&linkage, &params), vec![2.5]);
    }

    #[test]
    fn histogram_is_a_density() {
        let sizes = [0.05, 0.12, 0.18, 0.31, 0.33];
        let params = unit_params(0.1);
        let hist = step_size_histogram(&sizes, &params).expect("steps");
        assert_eq!(hist.centres.len(), 4);
        assert!((hist.centres[0] - 0.05).abs() < 1e-12);
        let total: f64 = hist.density.iter().map(|p| p * params.binning).sum();
        assert!((total - 1.0).abs() < 1e-12);
        assert!((hist.density[3] - 2.0 / (5.0 * 0.1)).abs() < 1e-12);
        assert!(step_size_histogram(&[], &params).is_none());
    }

    #[test]
    fn random_walk_diffusion_is_recovered() {
        // Per-axis sigma 0.5 px per frame: <r²> = 0.5, D = 0.125.
        let mut rng = StdRng::seed_from_u64(17);
        let (mut x, mut y) = (100.0, 100.0);
        let spots: Vec<Spot> = (0..4000)
            .map(|frame| {
                let spot = Spot::new(frame, x, y);
                x += gaussian(&mut rng, 0.5);
                y += gaussian(&mut rng, 0.5);
                spot
            })
            .collect();
        let linkage = link_particles(&spots, &LinkParams::default()).expect("valid params");
        let params = unit_params(0.05);
        let sizes = step_sizes(&linkage, &params);
        assert_eq!(sizes.len(), 3999);

        let hist = step_size_histogram(&sizes, &params).expect("steps");
        assert!((hist.msd - 0.5).abs() < 0.05, "empirical msd {}", hist.msd);
        let fit = fit_step_sizes(&hist, &params).expect("fit");
        assert!((fit.d - 0.125).abs() < 0.02, "D {}", fit.d);
        assert!(fit.d_error > 0.0 && fit.d_error < 0.01);
        assert!(fit.r_squared > 0.9, "r2 {}", fit.r_squared);

        let trimmed = StepSizeParams {
            min_step_size: 0.2,
            ..params
        };
        let fit = fit_step_sizes(&hist, &trimmed).expect("fit above the cut");
        assert_eq!(fit.bins, hist.centres.len() - 4);
        assert!((fit.d - 0.125).abs() < 0.02, "trimmed D {}", fit.d);
    }

    #[test]
    fn invalid_binning_is_rejected() {
        let params = StepSizeParams {
            binning: 0.0,
            ..StepSizeParams::default()
        };
        assert!(params.validate().is_err());
        let params = StepSizeParams {
            min_step_size: -1.0,
            ..StepSizeParams::default()
        };
        assert!(params.validate().is_err());
    }
}
