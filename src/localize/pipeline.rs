use super::params::{LocalizerParams, ParallelOptions};
use crate::diagnostics::{elapsed_ms, TimingBreakdown};
use crate::error::ConfigError;
use crate::fit::{GaussianPeakFitter, Localization};
use crate::image::{ImageF32, Roi};
use crate::peaks::{PeakDetector, PixelCoord};
use crate::preprocess::Preprocess;
use crate::table::{ResultsTable, TableSink};
use log::debug;
use serde::Serialize;
use std::sync::Mutex;
use std::time::Instant;

/// Result of one frame.
#[derive(Clone, Debug, Serialize)]
pub struct FrameOutcome {
    pub frame: usize,
    /// Candidates returned by the detector (before the region mask).
    pub peaks_found: usize,
    /// Validated fits in detection order.
    pub localizations: Vec<Localization>,
}

/// Result of a whole stack.
#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalizationReport {
    pub frames: usize,
    pub found_peaks: usize,
    pub fitted_peaks: usize,
    pub localizations: Vec<Localization>,
    pub timing: TimingBreakdown,
}

impl LocalizationReport {
    pub fn status_line(&self) -> String {
        format!(
            "found peaks : {} fitted peaks : {}",
            self.found_peaks, self.fitted_peaks
        )
    }

    pub fn write_rows<S: TableSink + ?Sized>(&self, sink: &mut S) {
        for loc in &self.localizations {
            loc.write_row(sink);
        }
    }

    pub fn to_table(&self) -> ResultsTable {
        let mut table = ResultsTable::new();
        self.write_rows(&mut table);
        table
    }
}

#[derive(Default)]
struct Accumulator {
    batches: Vec<(usize, Vec<Localization>)>,
    found_peaks: usize,
    fitted_peaks: usize,
}

impl Accumulator {
    fn append(&mut self, outcome: FrameOutcome) {
        self.found_peaks += outcome.peaks_found;
        self.fitted_peaks += outcome.localizations.len();
        self.batches.push((outcome.frame, outcome.localizations));
    }
}

/// Detection + fitting over frames.
#[derive(Clone, Debug)]
pub struct Localizer {
    detector: PeakDetector,
    fitter: GaussianPeakFitter,
    fit_regions: Vec<Roi>,
    parallel: ParallelOptions,
}

impl Localizer {
    pub fn new(params: LocalizerParams) -> Result<Self, ConfigError> {
        params.validate()?;
        Ok(Self {
            detector: PeakDetector::new(params.detect)?,
            fitter: GaussianPeakFitter::new(params.fit)?,
            fit_regions: params.fit_regions,
            parallel: params.parallel,
        })
    }

    /// Replace the detector's preprocessing step.
    pub fn with_preprocess(mut self, preprocess: impl Preprocess + 'static) -> Self {
        self.detector = self.detector.with_preprocess(preprocess);
        self
    }

    pub fn with_parallel(mut self, parallel: ParallelOptions) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn detector(&self) -> &PeakDetector {
        &self.detector
    }

    pub fn fitter(&self) -> &GaussianPeakFitter {
        &self.fitter
    }

    fn in_fit_regions(&self, peak: PixelCoord) -> bool {
        self.fit_regions.is_empty() || self.fit_regions.iter().any(|r| r.contains(peak.x, peak.y))
    }

    /// Detect and fit one frame.
    pub fn process_frame(&self, frame: usize, image: &ImageF32, roi: Roi) -> FrameOutcome {
        let peaks = self.detector.detect(image, roi);
        let localizations: Vec<Localization> = peaks
            .iter()
            .filter(|p| self.in_fit_regions(**p))
            .filter_map(|p| self.fitter.fit_candidate(image, frame, *p))
            .collect();
        debug!(
            "frame {}: peaks={} fitted={}",
            frame,
            peaks.len(),
            localizations.len()
        );
        FrameOutcome {
            frame,
            peaks_found: peaks.len(),
            localizations,
        }
    }

    /// Process every frame of `frames` over `roi` (clipped per frame).
    pub fn process_stack(&self, frames: &[ImageF32], roi: Roi) -> LocalizationReport {
        let start = Instant::now();
        let mut timing = TimingBreakdown::default();

        let sink = Mutex::new(Accumulator::default());
        timing.time("detect_fit", || {
            if self.parallel.should_parallelize(frames.len()) {
                #[cfg(feature = "parallel")]
                {
                    self.process_parallel(frames, roi, &sink);
                }
                #[cfg(not(feature = "parallel"))]
                {
                    self.process_sequential(frames, roi, &sink);
                }
            } else {
                self.process_sequential(frames, roi, &sink);
            }
        });

        let Accumulator {
            mut batches,
            found_peaks,
            fitted_peaks,
        } = sink.into_inner().unwrap_or_else(|p| p.into_inner());
        let localizations: Vec<Localization> = timing.time("merge", move || {
            batches.sort_by_key(|(frame, _)| *frame);
            batches.into_iter().flat_map(|(_, batch)| batch).collect()
        });
        timing.total_ms = elapsed_ms(start);

        let report = LocalizationReport {
            frames: frames.len(),
            found_peaks,
            fitted_peaks,
            localizations,
            timing,
        };
        debug!(
            "localizer: frames={} {} total_ms={:.3}",
            report.frames,
            report.status_line(),
            report.timing.total_ms
        );
        report
    }

    fn process_sequential(&self, frames: &[ImageF32], roi: Roi, sink: &Mutex<Accumulator>) {
        for (frame, image) in frames.iter().enumerate() {
            let outcome = self.process_frame(frame, image, roi);
            sink.lock().unwrap_or_else(|p| p.into_inner()).append(outcome);
        }
    }

    #[cfg(feature = "parallel")]
    fn process_parallel(&self, frames: &[ImageF32], roi: Roi, sink: &Mutex<Accumulator>) {
        use rayon::prelude::*;

        frames.par_iter().enumerate().for_each(|(frame, image)| {
            let outcome = self.process_frame(frame, image, roi);
            sink.lock().unwrap_or_else(|p| p.into_inner()).append(outcome);
        });
    }
}
