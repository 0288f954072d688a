//! Model capability and weighted observations consumed by the solver.

/// A parametric model over a `D`-dimensional independent variable.
///
/// Implementors must be stateless for the duration of a solve: the solver
/// calls `value` and `gradient` many times with trial parameter vectors and
/// expects identical answers for identical inputs.
pub trait Model<const D: usize> {
    /// Model value at `x` for `params`.
    fn value(&self, x: &[f64; D], params: &[f64]) -> f64;

    /// Partial derivatives of `value` with respect to every parameter.
    /// `dyda` has the same length as `params`.
    fn gradient(&self, x: &[f64; D], params: &[f64], dyda: &mut [f64]);
}

impl<const D: usize, M: Model<D> + ?Sized> Model<D> for &M {
    #[inline]
    fn value(&self, x: &[f64; D], params: &[f64]) -> f64 {
        (**self).value(x, params)
    }

    #[inline]
    fn gradient(&self, x: &[f64; D], params: &[f64], dyda: &mut [f64]) {
        (**self).gradient(x, params, dyda)
    }
}

/// Model assembled from a pair of closures.
///
/// ```
/// use peak_tracker::lmfit::{FnModel, Model};
///
/// let line = FnModel::new(
///     |x: &[f64; 1], p: &[f64]| p[0] * x[0] + p[1],
///     |x: &[f64; 1], _p: &[f64], dyda: &mut [f64]| {
///         dyda[0] = x[0];
///         dyda[1] = 1.0;
///     },
/// );
/// assert_eq!(line.value(&[2.0], &[3.0, 1.0]), 7.0);
/// ```
#[derive(Clone, Copy)]
pub struct FnModel<F, G> {
    value: F,
    gradient: G,
}

impl<F, G> FnModel<F, G> {
    pub fn new(value: F, gradient: G) -> Self {
        Self { value, gradient }
    }
}

impl<const D: usize, F, G> Model<D> for FnModel<F, G>
where
    F: Fn(&[f64; D], &[f64]) -> f64,
    G: Fn(&[f64; D], &[f64], &mut [f64]),
{
    #[inline]
    fn value(&self, x: &[f64; D], params: &[f64]) -> f64 {
        (self.value)(x, params)
    }

    #[inline]
    fn gradient(&self, x: &[f64; D], params: &[f64], dyda: &mut [f64]) {
        (self.gradient)(x, params, dyda)
    }
}

/// One sample: independent variable, dependent value and optional weight
/// (inverse variance).
///
/// A missing, zero or non-finite weight marks the sample as unweighted.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Observation<const D: usize> {
    pub x: [f64; D],
    pub y: f64,
    pub weight: Option<f64>,
}

impl<const D: usize> Observation<D> {
    pub fn new(x: [f64; D], y: f64) -> Self {
        Self { x, y, weight: None }
    }

    pub fn weighted(x: [f64; D], y: f64, weight: f64) -> Self {
        Self {
            x,
            y,
            weight: Some(weight),
        }
    }

    /// Weighted by `1 / sigma²`; a zero sigma leaves the sample unweighted.
    pub fn with_sigma(x: [f64; D], y: f64, sigma: f64) -> Self {
        let weight = (sigma != 0.0).then(|| 1.0 / (sigma * sigma));
        Self { x, y, weight }
    }

    /// Weight actually applied to squared residuals.
    #[inline]
    pub fn effective_weight(&self) -> f64 {
        match self.weight {
            Some(w) if w > 0.0 && w.is_finite() => w,
            _ => 1.0,
        }
    }

    /// Factor applied to residuals and gradients (`sqrt(weight)`).
    #[inline]
    pub(crate) fn scale(&self) -> f64 {
        match self.weight {
            Some(w) if w > 0.0 && w.is_finite() => w.sqrt(),
            _ => 1.0,
        }
    }
}
