//! Dataset persistence.

use crate::dataset::Dataset;
use crate::error::HarvestError;
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use tracing::info;

/// Receives the finished dataset.
pub trait DatasetSink {
    fn write(&self, dataset: &Dataset) -> Result<(), HarvestError>;
}

/// Header-first CSV file without an index column.
pub struct CsvSink {
    path: PathBuf,
}

impl CsvSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn export_error(&self, error: impl std::fmt::Display) -> HarvestError {
        HarvestError::Export(format!("{}: {error}", self.path.display()))
    }
}

impl DatasetSink for CsvSink {
    fn write(&self, dataset: &Dataset) -> Result<(), HarvestError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| self.export_error(e))?;
        }

        let mut writer = csv::Writer::from_path(&self.path).map_err(|e| self.export_error(e))?;
        writer
            .write_record(dataset.columns())
            .map_err(|e| self.export_error(e))?;
        for row in dataset.rows() {
            writer
                .write_record(row.iter().map(ToString::to_string))
                .map_err(|e| self.export_error(e))?;
        }
        writer.flush().map_err(|e| self.export_error(e))?;

        info!(path = %self.path.display(), rows = dataset.len(), "Dataset written");
        Ok(())
    }
}

/// `activities_<YYYYmmdd_HHMMSS>.csv`, used when no output path is given.
pub fn default_file_name(at: DateTime<Local>) -> String {
    format!("activities_{}.csv", at.format("%Y%m%d_%H%M%S"))
}
