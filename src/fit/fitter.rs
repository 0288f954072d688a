use super::gaussian::Gaussian2D;
use super::localization::Localization;
use super::params::FitParams;
use crate::error::ConfigError;
use crate::image::{ImageF32, Roi};
use crate::lmfit::{LmParams, LmSolver, Observation};
use crate::peaks::PixelCoord;
use serde::Serialize;

/// Pre-seeded starting values, one slot per Gaussian parameter.
///
/// `None` slots are filled from the window: baseline = window minimum,
/// amplitude = window maximum − baseline, centre = location of the window
/// maximum, sigmas = 1. When both centre slots are seeded the amplitude guess
/// becomes the sample under the seed minus the baseline.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Seed(pub [Option<f64>; 6]);

impl Seed {
    /// Seed only the centre.
    pub fn at(x: f64, y: f64) -> Self {
        Self([None, None, Some(x), Some(y), None, None])
    }

    pub fn with(mut self, index: usize, value: f64) -> Self {
        if let Some(slot) = self.0.get_mut(index) {
            *slot = Some(value);
        }
        self
    }
}

/// Raw outcome of one window fit, before validation.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PeakFit {
    pub params: [f64; 6],
    pub errors: [f64; 6],
    pub chi_squared: f64,
    pub r_squared: f64,
    pub iterations: usize,
    /// Samples that entered the fit (saturated ones excluded).
    pub samples: usize,
}

impl PeakFit {
    fn degenerate(samples: usize) -> Self {
        Self {
            params: [f64::NAN; 6],
            errors: [f64::NAN; 6],
            chi_squared: f64::NAN,
            r_squared: f64::NAN,
            iterations: 0,
            samples,
        }
    }

    /// A fit is accepted when no parameter or error is NaN and every error
    /// stays within its bound.
    pub fn is_valid(&self, max_errors: &[f64; 6]) -> bool {
        self.params
            .iter()
            .zip(self.errors.iter())
            .zip(max_errors.iter())
            .all(|((p, e), bound)| !p.is_nan() && !e.is_nan() && e.abs() <= *bound)
    }
}

/// Fit a 2D Gaussian to the samples of `window` with default solver settings.
pub fn fit_peak(image: &ImageF32, window: Roi, seed: &Seed, saturation: Option<f32>) -> PeakFit {
    fit_window(&LmSolver::default(), image, window, seed, saturation)
}

fn fit_window(
    solver: &LmSolver,
    image: &ImageF32,
    window: Roi,
    seed: &Seed,
    saturation: Option<f32>,
) -> PeakFit {
    let window = window.clip(image.w, image.h);
    let mut observations = Vec::with_capacity(window.area());
    let mut min: Option<(usize, f64)> = None;
    let mut max: Option<(usize, f64)> = None;
    for y in window.y..window.y_end() {
        for x in window.x..window.x_end() {
            let v = image.get(x, y);
            if saturation.is_some_and(|s| v >= s) {
                continue;
            }
            let v = v as f64;
            let n = observations.len();
            if max.map_or(true, |(_, m)| v > m) {
                max = Some((n, v));
            }
            if min.map_or(true, |(_, m)| v < m) {
                min = Some((n, v));
            }
            observations.push(Observation::new([x as f64, y as f64], v));
        }
    }
    let (Some((_, lo)), Some((imax, hi))) = (min, max) else {
        return PeakFit::degenerate(0);
    };

    let at_max = observations[imax].x;
    let mut guess = [lo, hi - lo, at_max[0], at_max[1], 1.0, 1.0];
    let baseline = seed.0[0].unwrap_or(lo);
    if let (Some(sx), Some(sy)) = (seed.0[2], seed.0[3]) {
        if let Some(v) = image.get_checked(sx as isize, sy as isize) {
            guess[1] = v as f64 - baseline;
        }
    }
    let mut initial = [0.0; 6];
    for (i, slot) in initial.iter_mut().enumerate() {
        *slot = seed.0[i].unwrap_or(guess[i]);
    }

    let fit = solver.solve(&Gaussian2D, &observations, &initial, None);
    let mut params = [0.0; 6];
    let mut errors = [0.0; 6];
    params.copy_from_slice(&fit.params);
    errors.copy_from_slice(&fit.errors);
    params[4] = params[4].abs();
    params[5] = params[5].abs();
    PeakFit {
        params,
        errors,
        chi_squared: fit.chi_squared,
        r_squared: fit.r_squared,
        iterations: fit.iterations,
        samples: observations.len(),
    }
}

/// Refines detected candidates into validated [`Localization`]s.
#[derive(Clone, Debug)]
pub struct GaussianPeakFitter {
    params: FitParams,
    solver: LmSolver,
}

impl GaussianPeakFitter {
    pub fn new(params: FitParams) -> Result<Self, ConfigError> {
        params.validate()?;
        Ok(Self {
            params,
            solver: LmSolver::default(),
        })
    }

    pub fn with_solver_params(mut self, lm: LmParams) -> Self {
        self.solver = LmSolver::new(lm);
        self
    }

    pub fn params(&self) -> &FitParams {
        &self.params
    }

    /// Fit window of side `2·fit_radius + 1` around `peak`, clipped to the image.
    pub fn window(&self, image: &ImageF32, peak: PixelCoord) -> Roi {
        Roi::square_around(peak.x, peak.y, self.params.fit_radius, image.w, image.h)
    }

    pub fn fit_window(&self, image: &ImageF32, window: Roi, seed: &Seed) -> PeakFit {
        fit_window(&self.solver, image, window, seed, self.params.saturation_level())
    }

    /// Fit the candidate at `peak` (centre seeded at the peak) and keep it only
    /// when it passes validation.
    pub fn fit_candidate(
        &self,
        image: &ImageF32,
        frame: usize,
        peak: PixelCoord,
    ) -> Option<Localization> {
        let window = self.window(image, peak);
        let fit = self.fit_window(image, window, &Seed::at(peak.x as f64, peak.y as f64));
        fit.is_valid(&self.params.max_errors)
            .then(|| Localization::from_fit(frame, &fit))
    }
}
