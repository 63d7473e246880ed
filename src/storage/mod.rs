// src/storage/mod.rs
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use crate::batch::RunSummary;
use crate::extractors::{ExtractedTable, TableId};
use crate::utils::error::StorageError;

pub struct StorageManager {
    base_dir: PathBuf,
}

impl StorageManager {
    /// Creates a new StorageManager over an existing output directory.
    /// The directory is never created here; choosing it is the caller's job.
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self, StorageError> {
        let base_path = base_dir.as_ref().to_path_buf();

        if !base_path.is_dir() {
            return Err(StorageError::MissingDirectory(base_path));
        }

        Ok(Self { base_dir: base_path })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Path of the artifact for a table: periods become hyphens, `.txt` is appended.
    pub fn table_path(&self, table_id: &TableId) -> PathBuf {
        self.base_dir.join(artifact_file_name(table_id))
    }

    /// Writes the table's data lines verbatim, replacing any previous artifact.
    pub fn save_table(&self, table: &ExtractedTable) -> Result<PathBuf, StorageError> {
        let file_path = self.table_path(&table.table_id);

        let file = fs::File::create(&file_path)
            .map_err(StorageError::IoError)?;
        let mut writer = BufWriter::new(file);

        for line in &table.lines {
            writer.write_all(line)
                .map_err(StorageError::IoError)?;
        }
        writer.flush().map_err(StorageError::IoError)?;

        tracing::info!("Saved table {} ({} lines) to {}",
                       table.table_id, table.line_count(), file_path.display());

        Ok(file_path)
    }

    /// Saves the per-table outcomes of a run in JSON format.
    /// A relative path lands inside the output directory, next to the tables.
    pub fn save_summary<P: AsRef<Path>>(&self, path: P, summary: &RunSummary) -> Result<PathBuf, StorageError> {
        let file_path = self.base_dir.join(path.as_ref());

        let summary_str = serde_json::to_string_pretty(summary)
            .map_err(|e| StorageError::SerializationError(e.to_string()))?;

        fs::write(&file_path, summary_str)
            .map_err(StorageError::IoError)?;

        tracing::info!("Saved run summary to {}", file_path.display());

        Ok(file_path)
    }
}

/// File name of the artifact for a table, e.g. `10.03` -> `10-03.txt`.
pub fn artifact_file_name(table_id: &TableId) -> String {
    format!("{}.txt", table_id.as_str().replace('.', "-"))
}
