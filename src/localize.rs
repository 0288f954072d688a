//! Frame-stack localization: detection followed by Gaussian refinement.
//!
//! Frames are independent. With the `parallel` feature each frame runs as its
//! own rayon task and appends its batch to one mutex-guarded accumulator;
//! the final list is ordered by frame and, within a frame, by detection
//! order.
mod params;
mod pipeline;

pub use params::{LocalizerParams, ParallelOptions};
pub use pipeline::{FrameOutcome, LocalizationReport, Localizer};
