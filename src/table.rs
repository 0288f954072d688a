//! Append-only tabular result sink.
use serde::{Deserialize, Deserializer, Serialize};

/// Destination for per-row numeric results with named columns.
pub trait TableSink {
    /// Start a new row. Values added afterwards land in this row.
    fn begin_row(&mut self);
    /// Set `column` in the current row.
    fn add_value(&mut self, column: &str, value: f64);
}

/// In-memory table. Cells never written hold NaN (`null` in JSON).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultsTable {
    columns: Vec<String>,
    #[serde(deserialize_with = "rows_with_nulls")]
    rows: Vec<Vec<f64>>,
}

fn rows_with_nulls<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Vec<f64>>, D::Error> {
    let raw = Vec::<Vec<Option<f64>>>::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .map(|row| row.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect())
        .collect())
}

impl ResultsTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// All values of one column, top to bottom.
    pub fn column(&self, name: &str) -> Option<Vec<f64>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(|r| r[idx]).collect())
    }

    pub fn value(&self, row: usize, name: &str) -> Option<f64> {
        let idx = self.column_index(name)?;
        self.rows.get(row).map(|r| r[idx])
    }
}

impl TableSink for ResultsTable {
    fn begin_row(&mut self) {
        self.rows.push(vec![f64::NAN; self.columns.len()]);
    }

    fn add_value(&mut self, column: &str, value: f64) {
        if self.rows.is_empty() {
            self.begin_row();
        }
        let idx = match self.column_index(column) {
            Some(idx) => idx,
            None => {
                self.columns.push(column.to_string());
                for row in &mut self.rows {
                    row.push(f64::NAN);
                }
                self.columns.len() - 1
            }
        };
        if let Some(row) = self.rows.last_mut() {
            row[idx] = value;
        }
    }
}
