use super::gauss_jordan::gauss_jordan;
use super::model::{Model, Observation};
use log::{debug, warn};
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

/// Stopping and damping controls for the Levenberg-Marquardt iteration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LmParams {
    /// Hard cap on iterations.
    pub max_iterations: usize,
    /// Stop once the absolute change in weighted sum-of-squares drops below
    /// this value.
    pub precision: f64,
    /// Damping seed λ.
    pub initial_lambda: f64,
}

impl Default for LmParams {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            precision: 1e-6,
            initial_lambda: 1e-3,
        }
    }
}

/// Outcome of a solve. Degenerate problems show up as NaN or infinite
/// entries in `errors`, `chi_squared` or `r_squared`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LmFit {
    /// Refined parameters (fixed parameters are returned untouched).
    pub params: Vec<f64>,
    /// Standard error per parameter, zero for fixed parameters.
    pub errors: Vec<f64>,
    /// Weighted sum of squared residuals at `params`.
    pub chi_squared: f64,
    /// Weighted coefficient of determination.
    pub r_squared: f64,
    /// Iterations performed.
    pub iterations: usize,
    /// Damping factor after the last iteration.
    pub lambda: f64,
}

impl LmFit {
    /// True when any parameter or error is NaN.
    pub fn has_nan(&self) -> bool {
        self.params.iter().chain(self.errors.iter()).any(|v| v.is_nan())
    }
}

/// Damped Gauss-Newton solver over any [`Model`].
#[derive(Clone, Debug, Default)]
pub struct LmSolver {
    params: LmParams,
}

impl LmSolver {
    pub fn new(params: LmParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &LmParams {
        &self.params
    }

    /// Refine `initial` against `observations`.
    ///
    /// `vary[i] == false` holds parameter `i` fixed; a missing mask (or a
    /// mask shorter than the parameter vector) varies the remaining entries.
    pub fn solve<const D: usize, M>(
        &self,
        model: &M,
        observations: &[Observation<D>],
        initial: &[f64],
        vary: Option<&[bool]>,
    ) -> LmFit
    where
        M: Model<D> + ?Sized,
    {
        let p = initial.len();
        let free: Vec<usize> = (0..p)
            .filter(|&i| vary.map_or(true, |mask| mask.get(i).copied().unwrap_or(true)))
            .collect();
        let m = free.len();

        let mut params = initial.to_vec();
        let mut trial = initial.to_vec();
        let mut dyda = vec![0.0; p];
        let mut lambda = self.params.initial_lambda;
        let mut chi_squared = sum_of_squares(model, observations, &params);
        let mut iterations = 0;

        for iteration in 1..=self.params.max_iterations {
            iterations = iteration;
            let mut alpha = DMatrix::<f64>::zeros(m, m);
            let mut beta = DMatrix::<f64>::zeros(m, 1);
            let before = accumulate(
                model,
                observations,
                &params,
                &free,
                &mut dyda,
                &mut alpha,
                Some(&mut beta),
            );

            for i in 0..m {
                alpha[(i, i)] *= 1.0 + lambda;
            }
            gauss_jordan(&mut alpha, &mut beta);

            trial.copy_from_slice(&params);
            for (k, &i) in free.iter().enumerate() {
                trial[i] += beta[(k, 0)];
            }
            let after = sum_of_squares(model, observations, &trial);
            let improvement = (after - before).abs();

            if after < before {
                params.copy_from_slice(&trial);
                chi_squared = after;
                lambda /= 10.0;
            } else {
                chi_squared = before;
                lambda *= 10.0;
            }

            if improvement < self.params.precision {
                break;
            }
        }

        // Covariance from the undamped curvature at the final parameters.
        let mut alpha = DMatrix::<f64>::zeros(m, m);
        accumulate(
            model,
            observations,
            &params,
            &free,
            &mut dyda,
            &mut alpha,
            None,
        );
        let mut covar = DMatrix::<f64>::identity(m, m);
        gauss_jordan(&mut alpha, &mut covar);

        let n = observations.len() as f64;
        let dof = n - m as f64;
        let mut errors = vec![0.0; p];
        for (k, &i) in free.iter().enumerate() {
            errors[i] = (covar[(k, k)] * chi_squared / dof).sqrt();
        }

        let r_squared = weighted_r_squared(observations, chi_squared, dof);
        debug!(
            "lm solve: n={} free={} iterations={} chi2={:.6e} r2={:.6}",
            observations.len(),
            m,
            iterations,
            chi_squared,
            r_squared
        );

        let fit = LmFit {
            params,
            errors,
            chi_squared,
            r_squared,
            iterations,
            lambda,
        };
        if fit.has_nan() {
            warn!("lm solve: NaN in parameters or errors (n={}, free={})", observations.len(), m);
        }
        fit
    }
}

/// Weighted sum of squared residuals.
pub fn sum_of_squares<const D: usize, M>(
    model: &M,
    observations: &[Observation<D>],
    params: &[f64],
) -> f64
where
    M: Model<D> + ?Sized,
{
    observations
        .iter()
        .map(|o| {
            let r = (o.y - model.value(&o.x, params)) * o.scale();
            r * r
        })
        .sum()
}

/// Fill the lower triangle of `alpha = JᵗWJ` (mirrored afterwards) and, when
/// requested, `beta = JᵗWr`. Returns the weighted sum of squares.
fn accumulate<const D: usize, M>(
    model: &M,
    observations: &[Observation<D>],
    params: &[f64],
    free: &[usize],
    dyda: &mut [f64],
    alpha: &mut DMatrix<f64>,
    mut beta: Option<&mut DMatrix<f64>>,
) -> f64
where
    M: Model<D> + ?Sized,
{
    let mut ss = 0.0;
    for o in observations {
        let s = o.scale();
        let residual = (o.y - model.value(&o.x, params)) * s;
        ss += residual * residual;

        model.gradient(&o.x, params, dyda);
        for (j, &fj) in free.iter().enumerate() {
            let gj = dyda[fj] * s;
            for (k, &fk) in free[..=j].iter().enumerate() {
                alpha[(j, k)] += gj * dyda[fk] * s;
            }
            if let Some(beta) = beta.as_deref_mut() {
                beta[(j, 0)] += gj * residual;
            }
        }
    }
    let m = free.len();
    for i in 0..m {
        for j in (i + 1)..m {
            alpha[(i, j)] = alpha[(j, i)];
        }
    }
    ss
}

fn weighted_r_squared<const D: usize>(
    observations: &[Observation<D>],
    chi_squared: f64,
    dof: f64,
) -> f64 {
    let n = observations.len() as f64;
    let mut mean = 0.0;
    let mut w_total = 0.0;
    for o in observations {
        let w = o.effective_weight();
        mean += o.y * w;
        w_total += w;
    }
    mean /= w_total;
    let sst: f64 = observations
        .iter()
        .map(|o| {
            let d = o.y - mean;
            d * d * o.effective_weight()
        })
        .sum();
    1.0 - (chi_squared / dof) / (sst / (n - 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lmfit::FnModel;

    fn line() -> impl Model<1> {
        FnModel::new(
            |x: &[f64; 1], p: &[f64]| p[0] * x[0] + p[1],
            |x: &[f64; 1], _p: &[f64], dyda: &mut [f64]| {
                dyda[0] = x[0];
                dyda[1] = 1.0;
            },
        )
    }

    fn gaussian_1d() -> impl Model<1> {
        FnModel::new(
            |x: &[f64; 1], p: &[f64]| {
                let d = (x[0] - p[2]) / p[3];
                p[0] + p[1] * (-0.5 * d * d).exp()
            },
            |x: &[f64; 1], p: &[f64], dyda: &mut [f64]| {
                let d = x[0] - p[2];
                let e = (-(d * d) / (2.0 * p[3] * p[3])).exp();
                dyda[0] = 1.0;
                dyda[1] = e;
                dyda[2] = p[1] * e * d / (p[3] * p[3]);
                dyda[3] = p[1] * e * d * d / (p[3] * p[3] * p[3]);
            },
        )
    }

    #[test]
    fn recovers_exact_line() {
        let obs: Vec<_> = (0..10)
            .map(|i| {
                let x = i as f64;
                Observation::new([x], 2.5 * x - 1.0)
            })
            .collect();
        let fit = LmSolver::default().solve(&line(), &obs, &[0.0, 0.0], None);
        assert!((fit.params[0] - 2.5).abs() < 1e-6, "slope {}", fit.params[0]);
        assert!((fit.params[1] + 1.0).abs() < 1e-6, "offset {}", fit.params[1]);
        assert!(fit.iterations <= 100);
        assert!(fit.r_squared > 0.999_999);
    }

    #[test]
    fn weighted_gaussian_profile_converges() {
        let truth = [3300.0, 4000.0, 6.3, 1.4];
        let model = gaussian_1d();
        let obs: Vec<_> = (0..14)
            .map(|i| {
                let x = [i as f64];
                let sigma = 50.0 + 10.0 * (i % 4) as f64;
                Observation::with_sigma(x, model.value(&x, &truth), sigma)
            })
            .collect();
        let fit = LmSolver::default().solve(&model, &obs, &[3000.0, 3500.0, 6.0, 1.0], None);
        for (got, want) in fit.params.iter().zip(truth.iter()) {
            assert!(
                (got - want).abs() < 1e-3 * want.abs().max(1.0),
                "got {:?}, want {:?}",
                fit.params,
                truth
            );
        }
        assert!(fit.errors.iter().all(|e| e.is_finite()));
    }

    #[test]
    fn fixed_parameters_keep_value_and_zero_error() {
        let obs: Vec<_> = (0..8)
            .map(|i| {
                let x = i as f64;
                Observation::new([x], 3.0 * x + 4.0 + if i % 2 == 0 { 0.1 } else { -0.1 })
            })
            .collect();
        let vary = [true, false];
        let fit = LmSolver::default().solve(&line(), &obs, &[1.0, 4.0], Some(&vary));
        assert_eq!(fit.params[1], 4.0);
        assert_eq!(fit.errors[1], 0.0);
        assert!((fit.params[0] - 3.0).abs() < 0.05);
        assert!(fit.errors[0] > 0.0 && fit.errors[0].is_finite());
    }

    #[test]
    fn zero_gradient_parameter_surfaces_nan() {
        let model = FnModel::new(
            |x: &[f64; 1], p: &[f64]| p[0] * x[0],
            |x: &[f64; 1], _p: &[f64], dyda: &mut [f64]| {
                dyda[0] = x[0];
                dyda[1] = 0.0;
            },
        );
        let obs: Vec<_> = (1..6).map(|i| Observation::new([i as f64], 2.0 * i as f64)).collect();
        let fit = LmSolver::default().solve(&model, &obs, &[1.0, 0.0], None);
        assert!(fit.has_nan(), "expected NaN errors, got {:?}", fit.errors);
        assert_eq!(fit.params, vec![1.0, 0.0], "every NaN step must be rejected");
    }

    #[test]
    fn as_many_parameters_as_samples_is_not_finite() {
        let obs = [Observation::new([0.0], 1.0), Observation::new([1.0], 3.0)];
        let fit = LmSolver::default().solve(&line(), &obs, &[0.0, 0.0], None);
        assert!(
            fit.errors.iter().all(|e| !e.is_finite()),
            "errors {:?}",
            fit.errors
        );
    }
}
