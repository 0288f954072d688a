//! Piecewise-constant segmentation of a noisy signal (changepoint fitting).
//!
//! The signal starts as one segment. Each [`StepFitter::add_step`] call
//! splits the segment whose best two-way split lowers the global χ² the
//! most. In automatic mode a "counter" segmentation is kept alongside: its
//! boundaries sit at the best split point inside every current segment. The
//! ratio `χ² / χ²_counter` drops while real steps are still being found and
//! rises once splits start fitting noise; fitting stops at the first rise
//! (the split that caused the rise is kept).
mod fitter;
mod params;


pub use fitter::{fit_changepoints, Step, StepFit, StepFitter};
pub use params::{StepParams, StepTarget};
