//! Weighted nonlinear least squares (Levenberg-Marquardt).
//!
//! The solver refines a parameter vector for any [`Model`] against a set of
//! [`Observation`]s:
//!
//! 1) Evaluate residuals and analytic gradients at the current parameters
//!    and assemble the curvature matrix `A = JᵗWJ` and gradient `b = JᵗWr`
//!    over the varied parameters only.
//! 2) Damp the diagonal by `(1 + λ)` and solve `A·δ = b` with Gauss-Jordan
//!    elimination and partial pivoting.
//! 3) Accept the step when the weighted sum of squares drops (`λ /= 10`),
//!    otherwise keep the previous parameters (`λ *= 10`).
//! 4) Stop when the change in sum of squares falls below `precision` or after
//!    `max_iterations`.
//! 5) Invert the undamped curvature at the solution to obtain standard
//!    errors `sqrt(C_ii · χ² / (n − free))` and the weighted `R²`.
//!
//! Singular systems are not an error. They produce NaN entries through the
//! elimination and every caller is expected to check for them.
mod gauss_jordan;
mod model;
mod solver;

pub use gauss_jordan::{gauss_jordan, invert};
pub use model::{FnModel, Model, Observation};
pub use solver::{sum_of_squares, LmFit, LmParams, LmSolver};
