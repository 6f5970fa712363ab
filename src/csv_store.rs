//! Append-only CSV log of panchanga records

use anyhow::{Context, Result};
use csv::StringRecord;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use crate::types::PanchangaRecord;

/// The CSV artifact shared by the extractor (writer) and loader (reader).
///
/// Every append opens, writes and closes the file on its own, so each row is
/// durable once `append` returns. Rows are never rewritten or removed.
pub struct CsvStore {
    path: PathBuf,
}

impl CsvStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one row, writing the header only if the file is new or empty
    pub fn append(&self, record: &PanchangaRecord) -> Result<()> {
        let needs_header = fs::metadata(&self.path)
            .map(|m| m.len() == 0)
            .unwrap_or(true);

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open {}", self.path.display()))?;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(needs_header)
            .from_writer(file);
        writer
            .serialize(record)
            .with_context(|| format!("Failed to write row for {}", record.date))?;
        writer.flush()?;
        Ok(())
    }

    /// Read every data row. The first row is skipped as a header without
    /// looking at its contents; column names are assigned by the loader.
    pub fn read_all(&self) -> Result<Vec<StringRecord>> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(&self.path)
            .with_context(|| format!("Failed to open {}", self.path.display()))?;

        let mut rows = Vec::new();
        for (i, row) in reader.records().enumerate() {
            let row = row.with_context(|| {
                format!("Failed to read row {} of {}", i + 1, self.path.display())
            })?;
            rows.push(row);
        }
        Ok(rows)
    }
}
