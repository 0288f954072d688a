//! Mean square displacement (MSD) analysis of linked trajectories.
//!
//! Square displacements are taken between every ordered pair of members of a
//! trajectory, grouped by time lag and averaged. A line through the origin,
//! `MSD = d·D·t`, is then fitted per trajectory to estimate the diffusion
//! coefficient `D`, weighting each lag by its spread.
use super::linker::{Linkage, Positioned, Trajectory};
use crate::error::ConfigError;
use crate::lmfit::{LmSolver, Model, Observation};
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Number of spatial dimensions assumed by the diffusion model.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimensionality {
    /// `MSD = 2·D·t`
    OneD,
    /// `MSD = 4·D·t`
    #[default]
    TwoD,
}

impl Dimensionality {
    pub fn factor(self) -> f64 {
        match self {
            Dimensionality::OneD => 2.0,
            Dimensionality::TwoD => 4.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MsdParams {
    /// Seconds between consecutive frames.
    pub frame_interval: f64,
    /// Physical size of one pixel (µm).
    pub pixel_size: f64,
    /// Lags with this many pairs or fewer are dropped.
    pub min_points: usize,
    /// Lags beyond this time are excluded from the fit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_fit_time: Option<f64>,
    pub dimensionality: Dimensionality,
    /// Pool every trajectory into a single curve.
    pub average_trajectories: bool,
}

impl Default for MsdParams {
    fn default() -> Self {
        Self {
            frame_interval: 0.1,
            pixel_size: 0.160,
            min_points: 1,
            max_fit_time: None,
            dimensionality: Dimensionality::TwoD,
            average_trajectories: false,
        }
    }
}

impl MsdParams {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("frame_interval", self.frame_interval),
            ("pixel_size", self.pixel_size),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::NonPositive { name, value });
            }
        }
        if let Some(t) = self.max_fit_time {
            if !(t.is_finite() && t > 0.0) {
                return Err(ConfigError::NonPositive {
                    name: "max_fit_time",
                    value: t,
                });
            }
        }
        Ok(())
    }
}

/// Square displacement of one pair of trajectory members.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct SquareDisplacement {
    pub trajectory: usize,
    /// Frame lag between the pair.
    pub lag: usize,
    pub dt: f64,
    pub sd: f64,
}

/// Averaged square displacement for one lag.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct MsdPoint {
    /// `None` when trajectories are pooled.
    pub trajectory: Option<usize>,
    pub lag: usize,
    pub dt: f64,
    pub msd: f64,
    /// Population standard deviation of the pooled square displacements.
    pub std_dev: f64,
    pub points: usize,
}

/// Diffusion coefficient fitted to one MSD curve.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct DiffusionFit {
    pub trajectory: Option<usize>,
    pub d: f64,
    pub d_error: f64,
    pub r_squared: f64,
    pub points: usize,
}

/// `MSD = factor·D·t`.
#[derive(Clone, Copy, Debug)]
struct LinearMsd {
    factor: f64,
}

impl Model<1> for LinearMsd {
    fn value(&self, x: &[f64; 1], p: &[f64]) -> f64 {
        self.factor * p[0] * x[0]
    }

    fn gradient(&self, x: &[f64; 1], _p: &[f64], dyda: &mut [f64]) {
        dyda[0] = self.factor * x[0];
    }
}

/// Square displacements between every pair of members of `trajectory`.
pub fn square_displacements<P: Positioned>(
    items: &[P],
    trajectory: &Trajectory,
    params: &MsdParams,
) -> Vec<SquareDisplacement> {
    let members = trajectory.items(items);
    let mut out = Vec::new();
    for (i, a) in members.iter().enumerate() {
        for b in &members[i + 1..] {
            let lag = b.frame().saturating_sub(a.frame());
            let dx = (b.x() - a.x()) * params.pixel_size;
            let dy = (b.y() - a.y()) * params.pixel_size;
            out.push(SquareDisplacement {
                trajectory: trajectory.id,
                lag,
                dt: lag as f64 * params.frame_interval,
                sd: dx * dx + dy * dy,
            });
        }
    }
    out
}

/// MSD curve of every trajectory in `linkage`, ordered by trajectory then lag.
pub fn mean_square_displacement<P: Positioned>(
    items: &[P],
    linkage: &Linkage,
    params: &MsdParams,
) -> Vec<MsdPoint> {
    let mut groups: BTreeMap<(Option<usize>, usize), Vec<f64>> = BTreeMap::new();
    for trajectory in linkage.trajectories() {
        for sd in square_displacements(items, &trajectory, params) {
            let key = if params.average_trajectories {
                None
            } else {
                Some(sd.trajectory)
            };
            groups.entry((key, sd.lag)).or_default().push(sd.sd);
        }
    }

    groups
        .into_iter()
        .filter(|(_, values)| values.len() > params.min_points)
        .map(|((trajectory, lag), values)| {
            let n = values.len() as f64;
            let msd = values.iter().sum::<f64>() / n;
            let var = values.iter().map(|v| (v - msd) * (v - msd)).sum::<f64>() / n;
            MsdPoint {
                trajectory,
                lag,
                dt: lag as f64 * params.frame_interval,
                msd,
                std_dev: var.sqrt(),
                points: values.len(),
            }
        })
        .collect()
}

/// Fit `MSD = d·D·t` to each trajectory's curve in `points`.
///
/// Curves are expected in the order produced by [`mean_square_displacement`].
/// Curves with no lag inside the fit window, or whose fit yields NaN, are
/// skipped.
pub fn fit_diffusion(points: &[MsdPoint], params: &MsdParams) -> Vec<DiffusionFit> {
    let model = LinearMsd {
        factor: params.dimensionality.factor(),
    };
    let solver = LmSolver::default();
    let max_t = params.max_fit_time.unwrap_or(f64::MAX);

    let mut fits = Vec::new();
    let mut start = 0;
    while start < points.len() {
        let trajectory = points[start].trajectory;
        let end = start + points[start..].partition_point(|p| p.trajectory == trajectory);
        let observations: Vec<Observation<1>> = points[start..end]
            .iter()
            .filter(|p| p.dt <= max_t)
            .map(|p| Observation::with_sigma([p.dt], p.msd, p.std_dev))
            .collect();
        start = end;

        let Some(last) = observations.last() else {
            continue;
        };
        let initial = [last.y / (model.factor * last.x[0])];
        let fit = solver.solve(&model, &observations, &initial, None);
        if fit.params[0].is_nan() {
            warn!("msd fit for trajectory {trajectory:?} produced NaN, skipped");
            continue;
        }
        fits.push(DiffusionFit {
            trajectory,
            d: fit.params[0],
            d_error: fit.errors[0],
            r_squared: fit.r_squared,
            points: observations.len(),
        });
    }
    fits
}
