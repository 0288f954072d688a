use crate::steps::StepParams;
use crate::table::ResultsTable;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Signal stored either as a results table or a bare array.
#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub enum SignalFile {
    Table(ResultsTable),
    Values(Vec<f64>),
}

impl SignalFile {
    /// `(x, y)` columns. `x` is `None` for row-indexed signals.
    pub fn columns(
        &self,
        y_column: Option<&str>,
        x_column: Option<&str>,
    ) -> Result<(Option<Vec<f64>>, Vec<f64>), String> {
        match self {
            SignalFile::Values(values) => Ok((None, values.clone())),
            SignalFile::Table(table) => {
                let y_name = y_column.ok_or("Table input needs a `column` name")?;
                let y = table
                    .column(y_name)
                    .ok_or_else(|| format!("Column `{y_name}` not found"))?;
                let x = match x_column {
                    Some(name) => Some(
                        table
                            .column(name)
                            .ok_or_else(|| format!("Column `{name}` not found"))?,
                    ),
                    None => None,
                };
                Ok((x, y))
            }
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct StepFitToolConfig {
    pub input: PathBuf,
    /// Signal column for table inputs.
    #[serde(default)]
    pub column: Option<String>,
    /// Optional abscissa column; row index when absent.
    #[serde(default)]
    pub x_column: Option<String>,
    #[serde(default)]
    pub steps: StepParams,
    pub output: PathBuf,
}

pub fn load_config(path: &Path) -> Result<StepFitToolConfig, String> {
    let data = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config {}: {e}", path.display()))?;
    serde_json::from_str(&data)
        .map_err(|e| format!("Failed to parse config {}: {e}", path.display()))
}
