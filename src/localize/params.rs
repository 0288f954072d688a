use crate::error::ConfigError;
use crate::fit::FitParams;
use crate::image::Roi;
use crate::peaks::DetectParams;
use serde::{Deserialize, Serialize};

/// Controls whether frames are processed sequentially or with Rayon.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParallelOptions {
    enabled: bool,
    min_frames_for_parallel: usize,
}

impl ParallelOptions {
    pub fn new(enabled: bool, min_frames_for_parallel: usize) -> Self {
        Self {
            enabled,
            min_frames_for_parallel: min_frames_for_parallel.max(1),
        }
    }

    /// Sequential processing regardless of stack size.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            min_frames_for_parallel: usize::MAX,
        }
    }

    /// Returns true when a stack of `frame_count` frames should run in parallel.
    pub fn should_parallelize(&self, frame_count: usize) -> bool {
        self.enabled && frame_count >= self.min_frames_for_parallel
    }
}

impl Default for ParallelOptions {
    fn default() -> Self {
        Self {
            enabled: cfg!(feature = "parallel"),
            min_frames_for_parallel: 2,
        }
    }
}

/// Parameters of the whole detection + fitting pipeline.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalizerParams {
    pub detect: DetectParams,
    pub fit: FitParams,
    pub parallel: ParallelOptions,
    /// When non-empty, only candidates inside one of these rectangles are fitted.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fit_regions: Vec<Roi>,
}

impl LocalizerParams {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.detect.validate()?;
        self.fit.validate()
    }
}
