use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, warn};

use crate::model_id::LogTarget;

pub const STEP_COLUMN: &str = "step";

#[derive(Debug, Error)]
pub enum LogError {
    #[error("failed to read log table {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("failed to write log table {path}")]
    Write {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("failed to replace log table {path}")]
    Replace {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("log table has no `{STEP_COLUMN}` column")]
    MissingStepColumn,
    #[error("log table has no column named {column:?}")]
    MissingColumn { column: String },
    #[error("log table has no row for step {step}")]
    StepNotFound { step: i64 },
    #[error("log table has {count} rows for step {step}")]
    DuplicateStep { step: i64, count: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl LogTable {
    pub fn read(path: &Path) -> Result<Self, LogError> {
        let read_error = |source| LogError::Read {
            path: path.to_path_buf(),
            source,
        };

        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(path)
            .map_err(read_error)?;
        let headers = reader
            .headers()
            .map_err(read_error)?
            .iter()
            .map(ToOwned::to_owned)
            .collect::<Vec<String>>();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(read_error)?;
            rows.push(record.iter().map(ToOwned::to_owned).collect());
        }

        debug!(path = %path.display(), rows = rows.len(), columns = headers.len(), "read log table");
        Ok(Self { headers, rows })
    }

    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.headers.iter().position(|header| header == column)
    }

    pub fn cell(&self, step: i64, column: &str) -> Option<&str> {
        let step_index = self.column_index(STEP_COLUMN)?;
        let column_index = self.column_index(column)?;
        self.rows
            .iter()
            .find(|row| row_step(row, step_index) == Some(step))
            .and_then(|row| row.get(column_index))
            .map(String::as_str)
    }

    pub fn set_metric(&mut self, step: i64, column: &str, value: f64) -> Result<(), LogError> {
        let step_index = self
            .column_index(STEP_COLUMN)
            .ok_or(LogError::MissingStepColumn)?;
        let column_index = self
            .column_index(column)
            .ok_or_else(|| LogError::MissingColumn {
                column: column.to_string(),
            })?;

        let matches = self
            .rows
            .iter()
            .enumerate()
            .filter(|(_, row)| row_step(row, step_index) == Some(step))
            .map(|(index, _)| index)
            .collect::<Vec<usize>>();

        let row_index = match matches.as_slice() {
            [] => return Err(LogError::StepNotFound { step }),
            [index] => *index,
            _ => {
                return Err(LogError::DuplicateStep {
                    step,
                    count: matches.len(),
                });
            }
        };

        let row = &mut self.rows[row_index];
        if row.len() <= column_index {
            warn!(step, "log row is shorter than the header; padding with empty cells");
            row.resize(column_index + 1, String::new());
        }
        row[column_index] = format_metric(value);
        Ok(())
    }

    pub fn write(&self, path: &Path) -> Result<(), LogError> {
        let staging_path = staging_path(path);

        if let Err(source) = self.write_staged(&staging_path) {
            let _ = fs::remove_file(&staging_path);
            return Err(LogError::Write {
                path: path.to_path_buf(),
                source,
            });
        }

        fs::rename(&staging_path, path).map_err(|source| {
            let _ = fs::remove_file(&staging_path);
            LogError::Replace {
                path: path.to_path_buf(),
                source,
            }
        })
    }

    fn write_staged(&self, staging_path: &Path) -> Result<(), csv::Error> {
        let mut writer = csv::WriterBuilder::new()
            .flexible(true)
            .terminator(csv::Terminator::Any(b'\n'))
            .from_path(staging_path)?;
        writer.write_record(&self.headers)?;
        for row in &self.rows {
            writer.write_record(row)?;
        }
        writer.flush()?;
        Ok(())
    }
}

pub fn record_metric(
    path: &Path,
    target: &LogTarget,
    value: f64,
) -> Result<Option<String>, LogError> {
    let mut table = LogTable::read(path)?;
    let previous = table
        .cell(target.step, &target.finetuning_type)
        .filter(|cell| !cell.is_empty())
        .map(ToOwned::to_owned);
    table.set_metric(target.step, &target.finetuning_type, value)?;
    table.write(path)?;
    Ok(previous)
}

fn row_step(row: &[String], step_index: usize) -> Option<i64> {
    let raw = row.get(step_index)?.trim();
    if let Ok(step) = raw.parse::<i64>() {
        return Some(step);
    }
    let value = raw.parse::<f64>().ok()?;
    if value.is_finite() && value.fract() == 0.0 {
        Some(value as i64)
    } else {
        None
    }
}

fn format_metric(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 {
        format!("{value:.1}")
    } else {
        value.to_string()
    }
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
