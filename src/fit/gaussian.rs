use crate::lmfit::Model;

/// Conversion factor from standard deviation to full width at half maximum,
/// `2·sqrt(2·ln 2)`.
pub const SIGMA_TO_FWHM: f64 = 2.354_820_045_030_949_4;

/// Column names of the six Gaussian parameters, in parameter order.
pub const PARAM_NAMES: [&str; 6] = ["baseline", "height", "x", "y", "sigma_x", "sigma_y"];

/// Elliptical, axis-aligned 2D Gaussian on a constant baseline.
///
/// Parameters: `[baseline, amplitude, x0, y0, sigma_x, sigma_y]`.
#[derive(Clone, Copy, Debug, Default)]
pub struct Gaussian2D;

impl Model<2> for Gaussian2D {
    #[inline]
    fn value(&self, x: &[f64; 2], p: &[f64]) -> f64 {
        let dx = x[0] - p[2];
        let dy = x[1] - p[3];
        p[0] + p[1] * (-(dx * dx / (2.0 * p[4] * p[4]) + dy * dy / (2.0 * p[5] * p[5]))).exp()
    }

    #[inline]
    fn gradient(&self, x: &[f64; 2], p: &[f64], dyda: &mut [f64]) {
        let dx = x[0] - p[2];
        let dy = x[1] - p[3];
        let sx2 = p[4] * p[4];
        let sy2 = p[5] * p[5];
        let e = (-(dx * dx / (2.0 * sx2) + dy * dy / (2.0 * sy2))).exp();
        let ae = p[1] * e;
        dyda[0] = 1.0;
        dyda[1] = e;
        dyda[2] = ae * dx / sx2;
        dyda[3] = ae * dy / sy2;
        dyda[4] = ae * dx * dx / (sx2 * p[4]);
        dyda[5] = ae * dy * dy / (sy2 * p[5]);
    }
}
