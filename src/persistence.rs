//! Reading and writing prediction, evaluation and summary tables.
//!
//! Tables are CSV by default; a `.json` extension selects pretty-printed JSON.

use crate::error::{RagError, Result};
use crate::evaluator::{EvaluationRecord, SummaryReport};
use crate::runner::PredictionRecord;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs;
use std::path::Path;

/// File names used when writing a full run into one directory.
pub const PREDICTIONS_FILENAME: &str = "predictions.csv";
pub const EVALUATIONS_FILENAME: &str = "evaluations.csv";
pub const REPORT_FILENAME: &str = "report.csv";

/// Save format for output tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveFormat {
    /// Comma-separated values with a header row.
    Csv,
    /// JSON array of row objects.
    Json,
}

impl SaveFormat {
    /// Determine format from file extension.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => SaveFormat::Json,
            _ => SaveFormat::Csv,
        }
    }
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| RagError::io(parent, e))?;
        }
    }
    Ok(())
}

/// Write rows to `path` in the format implied by its extension.
pub fn save_rows<T: Serialize>(rows: &[T], path: &Path) -> Result<()> {
    ensure_parent(path)?;

    match SaveFormat::from_path(path) {
        SaveFormat::Json => {
            let data = serde_json::to_string_pretty(rows)
                .map_err(|e| RagError::Serialization(e.to_string()))?;
            fs::write(path, data).map_err(|e| RagError::io(path, e))?;
        }
        SaveFormat::Csv => {
            let mut writer = csv::Writer::from_path(path)?;
            for row in rows {
                writer.serialize(row)?;
            }
            writer.flush().map_err(|e| RagError::io(path, e))?;
        }
    }

    tracing::info!(path = %path.display(), rows = rows.len(), "wrote table");
    Ok(())
}

/// Read rows from `path` in the format implied by its extension.
pub fn load_rows<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    match SaveFormat::from_path(path) {
        SaveFormat::Json => {
            let data = fs::read_to_string(path).map_err(|e| RagError::io(path, e))?;
            serde_json::from_str(&data).map_err(|e| RagError::Serialization(e.to_string()))
        }
        SaveFormat::Csv => {
            let mut reader = csv::Reader::from_path(path)?;
            let rows = reader
                .deserialize::<T>()
                .map(|row| row.map_err(RagError::from))
                .collect();
            rows
        }
    }
}

pub fn save_predictions(predictions: &[PredictionRecord], path: &Path) -> Result<()> {
    save_rows(predictions, path)
}

pub fn load_predictions(path: &Path) -> Result<Vec<PredictionRecord>> {
    load_rows(path)
}

pub fn save_evaluations(evaluations: &[EvaluationRecord], path: &Path) -> Result<()> {
    save_rows(evaluations, path)
}

pub fn load_evaluations(path: &Path) -> Result<Vec<EvaluationRecord>> {
    load_rows(path)
}

/// Write the summary rows, ascending by score.
pub fn save_report(report: &SummaryReport, path: &Path) -> Result<()> {
    save_rows(&report.rows, path)
}
