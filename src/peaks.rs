//! Local-maximum peak detection with a minimum-separation constraint.
//!
//! Overview
//! - The frame is copied (and optionally preprocessed); the caller's buffer is
//!   never touched.
//! - The threshold is either a fixed value or `mean + k·σ` over the ROI of
//!   the working copy (population standard deviation).
//! - Every ROI sample at or above the threshold is a candidate. The brightest
//!   remaining candidate is recorded, then a disc of radius
//!   `minimum_separation` around it is painted with the frame minimum and its
//!   candidates are discarded. This repeats until no candidate is left.
//!
//! Output order is brightest first; equal values keep row-major order.
mod detector;
mod params;

#[cfg(test)]
mod tests;

pub use detector::{detect_peaks, PeakDetector, PixelCoord};
pub use params::DetectParams;
