use super::params::DetectParams;
use crate::error::ConfigError;
use crate::image::{ImageF32, Roi};
use crate::preprocess::{DiscoidalFilter, Preprocess};
use log::debug;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Integer pixel location of a detected peak.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PixelCoord {
    pub x: usize,
    pub y: usize,
}

impl PixelCoord {
    pub const fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }
}

/// Stateless peak detector. Cheap to clone and safe to share across threads.
#[derive(Clone)]
pub struct PeakDetector {
    params: DetectParams,
    preprocess: Option<Arc<dyn Preprocess>>,
}

impl fmt::Debug for PeakDetector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PeakDetector")
            .field("params", &self.params)
            .field("preprocess", &self.preprocess.is_some())
            .finish()
    }
}

impl PeakDetector {
    /// Build a detector. With `use_filter` set, a [`DiscoidalFilter`] with the
    /// configured radii is installed as the preprocessing step.
    pub fn new(params: DetectParams) -> Result<Self, ConfigError> {
        params.validate()?;
        let preprocess: Option<Arc<dyn Preprocess>> = if params.use_filter {
            Some(Arc::new(DiscoidalFilter::new(
                params.inner_radius,
                params.outer_radius,
            )?))
        } else {
            None
        };
        Ok(Self { params, preprocess })
    }

    /// Replace the preprocessing step with a caller-supplied transform.
    pub fn with_preprocess(mut self, preprocess: impl Preprocess + 'static) -> Self {
        self.preprocess = Some(Arc::new(preprocess));
        self
    }

    /// Remove any preprocessing step.
    pub fn without_preprocess(mut self) -> Self {
        self.preprocess = None;
        self
    }

    pub fn params(&self) -> &DetectParams {
        &self.params
    }

    /// Working copy the detector thresholds and paints.
    pub fn prepare(&self, image: &ImageF32, roi: Roi) -> ImageF32 {
        match &self.preprocess {
            Some(p) => p.apply(image, roi),
            None => image.clone(),
        }
    }

    /// Threshold for `working` (an already prepared frame) over `roi`.
    pub fn threshold(&self, working: &ImageF32, roi: Roi) -> f32 {
        match self.params.threshold_value {
            Some(t) => t,
            None => {
                let (mean, std) = working.roi_stats(&roi);
                (mean + self.params.threshold_sigma * std) as f32
            }
        }
    }

    /// Detect peaks inside `roi`, brightest first.
    pub fn detect(&self, image: &ImageF32, roi: Roi) -> Vec<PixelCoord> {
        let roi = roi.clip(image.w, image.h);
        if roi.is_empty() {
            return Vec::new();
        }
        let mut working = self.prepare(image, roi);
        let threshold = self.threshold(&working, roi);
        let floor = working.min_value();

        let mut candidates: Vec<PixelCoord> = Vec::new();
        for y in roi.y..roi.y_end() {
            for x in roi.x..roi.x_end() {
                if working.get(x, y) >= threshold {
                    candidates.push(PixelCoord::new(x, y));
                }
            }
        }
        let candidate_count = candidates.len();

        let radius = self.params.minimum_separation;
        let limit = (radius as f64 + 0.5).powi(2);
        let mut peaks = Vec::new();
        while let Some(best) = brightest(&working, &candidates) {
            if working.get(best.x, best.y) < threshold {
                break;
            }
            peaks.push(best);
            working.fill_disc(best.x, best.y, radius, floor);
            candidates.retain(|c| {
                let dx = c.x as f64 - best.x as f64;
                let dy = c.y as f64 - best.y as f64;
                dx * dx + dy * dy > limit
            });
        }

        debug!(
            "peak detection: roi={}x{}@({},{}) threshold={:.3} candidates={} peaks={}",
            roi.width,
            roi.height,
            roi.x,
            roi.y,
            threshold,
            candidate_count,
            peaks.len()
        );
        peaks
    }
}

/// First candidate (row-major) holding the largest value.
fn brightest(image: &ImageF32, candidates: &[PixelCoord]) -> Option<PixelCoord> {
    let mut best: Option<(PixelCoord, f32)> = None;
    for &c in candidates {
        let v = image.get(c.x, c.y);
        match best {
            Some((_, bv)) if v <= bv => {}
            _ => best = Some((c, v)),
        }
    }
    best.map(|(c, _)| c)
}

/// One-shot detection with freshly validated parameters.
pub fn detect_peaks(
    image: &ImageF32,
    roi: Roi,
    params: &DetectParams,
) -> Result<Vec<PixelCoord>, ConfigError> {
    Ok(PeakDetector::new(params.clone())?.detect(image, roi))
}
