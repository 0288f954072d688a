#![doc = include_str!("../README.md")]

// Public modules
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod fit;
pub mod image;
pub mod lmfit;
pub mod localize;
pub mod peaks;
pub mod preprocess;
pub mod steps;
pub mod table;
pub mod track;

// --- High-level re-exports -------------------------------------------------

pub use crate::error::ConfigError;
pub use crate::fit::{fit_peak, FitParams, GaussianPeakFitter, Localization, Saturation};
pub use crate::localize::{LocalizationReport, Localizer, LocalizerParams};
pub use crate::peaks::{detect_peaks, DetectParams, PeakDetector, PixelCoord};
pub use crate::steps::{fit_changepoints, StepFit, StepFitter, StepParams, StepTarget};
pub use crate::track::{link_particles, LinkParams, Linkage, Trajectory};

// --- Prelude ---------------------------------------------------------------

/// Small prelude for quick experiments.
///
/// ```
/// use peak_tracker::prelude::*;
///
/// let mut frame = ImageF32::new(32, 32);
/// for y in 0..32 {
///     for x in 0..32 {
///         let d2 = (x as f32 - 16.0).powi(2) + (y as f32 - 12.0).powi(2);
///         frame.set(x, y, 10.0 + 200.0 * (-d2 / 3.0).exp());
///     }
/// }
///
/// let localizer = Localizer::new(LocalizerParams::default()).unwrap();
/// let report = localizer.process_stack(&[frame], Roi::new(0, 0, 32, 32));
/// assert_eq!(report.fitted_peaks, 1);
/// ```
pub mod prelude {
    pub use crate::image::{ImageF32, Roi};
    pub use crate::{
        fit_changepoints, link_particles, LinkParams, Localizer, LocalizerParams, StepTarget,
    };
}
