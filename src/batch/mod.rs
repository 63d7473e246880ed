// src/batch/mod.rs
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use serde::Serialize;
use crate::extractors::{ExtractedTable, ScanStatus, TableExtractor, TableId};
use crate::storage::StorageManager;
use crate::utils::AppError;

/// What a single requested table produced.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TableOutcome {
    Written {
        path: PathBuf,
        lines: usize,
        /// False when the report ended before a blank line closed the table.
        terminated_by_marker: bool,
    },
    NotFound {
        stage: ScanStatus,
    },
    Empty,
    WriteFailed {
        reason: String,
    },
}

impl fmt::Display for TableOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableOutcome::Written { path, lines, terminated_by_marker } => {
                write!(f, "wrote {} line(s) to {}", lines, path.display())?;
                if !terminated_by_marker {
                    write!(f, " (report ended before a closing blank line)")?;
                }
                Ok(())
            }
            TableOutcome::NotFound { stage: ScanStatus::DataStartNotFound } => {
                write!(f, "no file written: title found but no '=' data start line after it")
            }
            TableOutcome::NotFound { .. } => write!(f, "no file written: table title not found"),
            TableOutcome::Empty => write!(f, "no file written: table has no data lines"),
            TableOutcome::WriteFailed { reason } => write!(f, "no file written: {}", reason),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TableReport {
    pub table_id: TableId,
    #[serde(flatten)]
    pub outcome: TableOutcome,
}

/// Everything a run did, in request order.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub report: PathBuf,
    pub output_dir: PathBuf,
    pub extracted_at: String,
    pub tables: Vec<TableReport>,
}

impl RunSummary {
    pub fn new(report: &Path, output_dir: &Path, tables: Vec<TableReport>) -> Self {
        Self {
            report: report.to_path_buf(),
            output_dir: output_dir.to_path_buf(),
            extracted_at: chrono::Utc::now().to_rfc3339(),
            tables,
        }
    }

    pub fn written_count(&self) -> usize {
        self.tables
            .iter()
            .filter(|t| matches!(t.outcome, TableOutcome::Written { .. }))
            .count()
    }

    pub fn write_failures(&self) -> usize {
        self.tables
            .iter()
            .filter(|t| matches!(t.outcome, TableOutcome::WriteFailed { .. }))
            .count()
    }
}

/// Drops repeated identifiers, keeping the first occurrence of each.
pub fn unique_tables(tables: Vec<TableId>) -> Vec<TableId> {
    let mut seen = HashSet::new();
    tables.into_iter().filter(|t| seen.insert(t.clone())).collect()
}

/// Extracts every requested table from the report into the storage directory.
///
/// The report is reopened and rescanned for each table. An unreadable report
/// aborts the whole batch; a table that is missing, empty or cannot be written
/// is recorded in its own `TableReport` and the batch moves on.
pub fn extract_tables(
    report: &Path,
    storage: &StorageManager,
    tables: &[TableId],
) -> Result<Vec<TableReport>, AppError> {
    let mut reports = Vec::with_capacity(tables.len());

    for table_id in tables {
        tracing::info!("Extracting table {} from {}", table_id, report.display());

        let extractor = TableExtractor::new(table_id.clone())?;
        let table = extractor.extract_from_file(report)?;
        let outcome = store_table(storage, &table);

        reports.push(TableReport {
            table_id: table_id.clone(),
            outcome,
        });
    }

    Ok(reports)
}

fn store_table(storage: &StorageManager, table: &ExtractedTable) -> TableOutcome {
    if table.is_empty() {
        if table.status.found() {
            tracing::warn!("Table {} has no data lines, skipping", table.table_id);
            return TableOutcome::Empty;
        }
        tracing::warn!("Table {} not found ({:?})", table.table_id, table.status);
        return TableOutcome::NotFound { stage: table.status };
    }

    match storage.save_table(table) {
        Ok(path) => TableOutcome::Written {
            path,
            lines: table.line_count(),
            terminated_by_marker: table.status == ScanStatus::EndMarker,
        },
        Err(e) => {
            tracing::error!("Failed to save table {}: {}", table.table_id, e);
            TableOutcome::WriteFailed { reason: e.to_string() }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::error::ExtractError;
    use std::fs;
    use tempfile::TempDir;

    const REPORT: &str = "\
PAGE 1    REGIONAL MODEL SUMMARY
Table 9.01   Population
=======   =======
TOWN A      1200
TOWN B       800

Table 10.01  Trips
====
HBW  10
HBO  20
NHB  30

Table 10.02  Placeholder
=====

Table 10.03  Truncated
=====
LAST ROW 1
";

    fn ids(raw: &[&str]) -> Vec<TableId> {
        raw.iter().map(|r| TableId::new(r).unwrap()).collect()
    }

    fn setup() -> (TempDir, PathBuf, StorageManager, TempDir) {
        let input_dir = TempDir::new().unwrap();
        let report = input_dir.path().join("model.prn");
        fs::write(&report, REPORT).unwrap();
        let output_dir = TempDir::new().unwrap();
        let storage = StorageManager::new(output_dir.path()).unwrap();
        (input_dir, report, storage, output_dir)
    }

    #[test]
    fn test_missing_table_does_not_affect_siblings() {
        let (_input, report, storage, output_dir) = setup();

        let reports = extract_tables(&report, &storage, &ids(&["9.99", "10.01"])).unwrap();

        assert!(matches!(
            reports[0].outcome,
            TableOutcome::NotFound { stage: ScanStatus::TitleNotFound }
        ));
        assert!(!output_dir.path().join("9-99.txt").exists());

        match &reports[1].outcome {
            TableOutcome::Written { path, lines, terminated_by_marker } => {
                assert_eq!(*lines, 3);
                assert!(*terminated_by_marker);
                assert_eq!(path, &output_dir.path().join("10-01.txt"));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        let content = fs::read_to_string(output_dir.path().join("10-01.txt")).unwrap();
        assert_eq!(content, "HBW  10\nHBO  20\nNHB  30\n");
    }

    #[test]
    fn test_empty_table_writes_nothing() {
        let (_input, report, storage, output_dir) = setup();

        let reports = extract_tables(&report, &storage, &ids(&["10.02"])).unwrap();

        assert!(matches!(reports[0].outcome, TableOutcome::Empty));
        assert!(!output_dir.path().join("10-02.txt").exists());
    }

    #[test]
    fn test_truncated_table_is_still_written() {
        let (_input, report, storage, output_dir) = setup();

        let reports = extract_tables(&report, &storage, &ids(&["10.03"])).unwrap();

        assert!(matches!(
            reports[0].outcome,
            TableOutcome::Written { lines: 1, terminated_by_marker: false, .. }
        ));
        let content = fs::read_to_string(output_dir.path().join("10-03.txt")).unwrap();
        assert_eq!(content, "LAST ROW 1\n");
    }

    #[test]
    fn test_write_failure_is_isolated() {
        let (_input, report, storage, output_dir) = setup();
        fs::create_dir(output_dir.path().join("9-01.txt")).unwrap();

        let reports = extract_tables(&report, &storage, &ids(&["9.01", "10.01"])).unwrap();

        assert!(matches!(reports[0].outcome, TableOutcome::WriteFailed { .. }));
        assert!(matches!(reports[1].outcome, TableOutcome::Written { lines: 3, .. }));
    }

    #[test]
    fn test_legacy_encoded_report_keeps_batch_going() {
        let input_dir = TempDir::new().unwrap();
        let report = input_dir.path().join("model.prn");
        fs::write(
            &report,
            b"Table 10.01  Trips\n====\nHBW  10 \xB0\n\nNotes: temperature 20\xB0C\n",
        )
        .unwrap();
        let output_dir = TempDir::new().unwrap();
        let storage = StorageManager::new(output_dir.path()).unwrap();

        let reports = extract_tables(&report, &storage, &ids(&["9.99", "10.01"])).unwrap();

        assert!(matches!(
            reports[0].outcome,
            TableOutcome::NotFound { stage: ScanStatus::TitleNotFound }
        ));
        assert!(matches!(reports[1].outcome, TableOutcome::Written { lines: 1, .. }));
        let content = fs::read(output_dir.path().join("10-01.txt")).unwrap();
        assert_eq!(content, b"HBW  10 \xB0\n");
    }

    #[test]
    fn test_unreadable_report_is_fatal() {
        let output_dir = TempDir::new().unwrap();
        let storage = StorageManager::new(output_dir.path()).unwrap();
        let missing = output_dir.path().join("missing.prn");

        let result = extract_tables(&missing, &storage, &ids(&["9.01", "10.01"]));

        assert!(matches!(
            result,
            Err(AppError::Extraction(ExtractError::SourceUnreadable { .. }))
        ));
        assert_eq!(fs::read_dir(output_dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_summary_counts_and_json() {
        let (_input, report, storage, output_dir) = setup();
        let reports =
            extract_tables(&report, &storage, &ids(&["9.01", "9.99", "10.02"])).unwrap();

        let summary = RunSummary::new(&report, output_dir.path(), reports);
        assert_eq!(summary.written_count(), 1);
        assert_eq!(summary.write_failures(), 0);

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["tables"][0]["table_id"], "9.01");
        assert_eq!(json["tables"][0]["outcome"], "written");
        assert_eq!(json["tables"][0]["lines"], 2);
        assert_eq!(json["tables"][1]["outcome"], "not_found");
        assert_eq!(json["tables"][1]["stage"], "title_not_found");
        assert_eq!(json["tables"][2]["outcome"], "empty");
    }

    #[test]
    fn test_unique_tables_keeps_first_order() {
        let tables = unique_tables(ids(&["10.01", "9.01", "10.01", "9.01", "10.02"]));
        let names: Vec<&str> = tables.iter().map(|t| t.as_str()).collect();
        assert_eq!(names, vec!["10.01", "9.01", "10.02"]);
    }

    #[test]
    fn test_outcome_messages() {
        let not_found = TableOutcome::NotFound { stage: ScanStatus::DataStartNotFound };
        assert!(not_found.to_string().contains("data start"));
        assert_eq!(
            TableOutcome::Empty.to_string(),
            "no file written: table has no data lines"
        );
    }
}
