use crate::image::Roi;
use crate::localize::LocalizerParams;
use crate::track::msd::MsdParams;
use crate::track::step_sizes::StepSizeParams;
use crate::track::LinkParams;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct LocalizeOutputConfig {
    /// Full JSON report: localizations, link records, MSD curves, fits and
    /// the step size distribution.
    pub report_json: Option<PathBuf>,
    /// Results table (one row per localization) as JSON.
    pub table_json: Option<PathBuf>,
    /// Preprocessed first frame, for checking filter settings.
    pub filtered_image: Option<PathBuf>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct LocalizeToolConfig {
    /// Frames in acquisition order.
    pub frames: Vec<PathBuf>,
    /// Region searched for peaks; whole frame when absent.
    #[serde(default)]
    pub roi: Option<Roi>,
    #[serde(default)]
    pub localizer: LocalizerParams,
    /// Link localizations into trajectories when present.
    #[serde(default)]
    pub link: Option<LinkParams>,
    /// Mean square displacement analysis of the trajectories (needs `link`).
    #[serde(default)]
    pub msd: Option<MsdParams>,
    /// Step size distribution fit over the trajectories (needs `link`).
    #[serde(default)]
    pub step_sizes: Option<StepSizeParams>,
    #[serde(default)]
    pub output: LocalizeOutputConfig,
}

pub fn load_config(path: &Path) -> Result<LocalizeToolConfig, String> {
    let data = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config {}: {e}", path.display()))?;
    serde_json::from_str(&data)
        .map_err(|e| format!("Failed to parse config {}: {e}", path.display()))
}
