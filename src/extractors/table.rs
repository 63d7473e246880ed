// src/extractors/table.rs

// --- Imports ---
use crate::extractors::markers;
use crate::utils::error::ExtractError;
use regex::bytes::Regex;
use serde::Serialize;
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::str::FromStr;

// --- Data Structures ---

/// Identifier of a table inside a PRN report, e.g. `10.03`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct TableId(String);

impl TableId {
    /// Trims the raw token and rejects empty identifiers or ones that would
    /// escape the output directory once turned into a file name.
    pub fn new(raw: &str) -> Result<Self, ExtractError> {
        let id = raw.trim();
        if id.is_empty() || id.contains(['/', '\\']) {
            return Err(ExtractError::InvalidTableId(raw.to_string()));
        }
        Ok(Self(id.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for TableId {
    type Err = ExtractError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Position of a scan relative to the table it is looking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    SeekingTitle,
    SeekingBegin,
    Collecting,
    Done,
}

/// What happens to the line that drove a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineAction {
    Discard,
    Capture,
}

impl ScanState {
    /// Single transition function of the scan.
    ///
    /// The title is only tested while seeking it, so once the first title has
    /// been seen later occurrences of the same title are treated as plain lines.
    pub fn next(self, line: &[u8], title: &Regex) -> (ScanState, LineAction) {
        match self {
            ScanState::SeekingTitle if markers::is_title_line(line, title) => {
                (ScanState::SeekingBegin, LineAction::Discard)
            }
            ScanState::SeekingBegin if markers::is_data_begin_marker(line) => {
                (ScanState::Collecting, LineAction::Discard)
            }
            ScanState::Collecting if markers::is_data_end_marker(line) => {
                (ScanState::Done, LineAction::Discard)
            }
            ScanState::Collecting => (ScanState::Collecting, LineAction::Capture),
            state => (state, LineAction::Discard),
        }
    }

    /// How a scan that stopped in this state ended. Running out of input while
    /// collecting counts as an implicit end marker.
    pub fn finish(self) -> ScanStatus {
        match self {
            ScanState::SeekingTitle => ScanStatus::TitleNotFound,
            ScanState::SeekingBegin => ScanStatus::DataStartNotFound,
            ScanState::Collecting => ScanStatus::EndOfStream,
            ScanState::Done => ScanStatus::EndMarker,
        }
    }
}

/// Where a finished scan stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanStatus {
    /// No title line for the table anywhere in the report.
    TitleNotFound,
    /// Title found, but no `=` separator line after it.
    DataStartNotFound,
    /// Data region closed by a blank line.
    EndMarker,
    /// Report ended while data lines were still being collected.
    EndOfStream,
}

impl ScanStatus {
    pub fn found(self) -> bool {
        matches!(self, ScanStatus::EndMarker | ScanStatus::EndOfStream)
    }
}

/// Data lines of one table, as raw bytes and with their line terminators.
/// Nothing is decoded, so reports in any ASCII-compatible encoding pass through.
#[derive(Debug, Clone)]
pub struct ExtractedTable {
    pub table_id: TableId,
    pub lines: Vec<Vec<u8>>,
    pub status: ScanStatus,
}

impl ExtractedTable {
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }
}

// --- Extractor ---
pub struct TableExtractor {
    table_id: TableId,
    title: Regex,
}

impl TableExtractor {
    pub fn new(table_id: TableId) -> Result<Self, ExtractError> {
        let title = markers::title_pattern(table_id.as_str())?;
        Ok(Self { table_id, title })
    }

    /// Opens the report and scans it from the top. Each call owns its own read
    /// handle, so extracting several tables rescans the file independently.
    pub fn extract_from_file(&self, report: &Path) -> Result<ExtractedTable, ExtractError> {
        let unreadable = |source| ExtractError::SourceUnreadable {
            path: report.to_path_buf(),
            source,
        };

        let file = File::open(report).map_err(unreadable)?;
        self.scan(BufReader::new(file)).map_err(unreadable)
    }

    /// Runs the scan over any line source, stopping at the first end marker.
    pub fn scan<R: BufRead>(&self, mut reader: R) -> std::io::Result<ExtractedTable> {
        let mut state = ScanState::SeekingTitle;
        let mut lines = Vec::new();
        let mut line = Vec::new();
        let mut line_no = 0usize;

        while state != ScanState::Done {
            line.clear();
            if reader.read_until(b'\n', &mut line)? == 0 {
                break;
            }
            line_no += 1;

            let (next, action) = state.next(&line, &self.title);
            if next != state {
                tracing::debug!(
                    "Table {}: {:?} -> {:?} at line {}",
                    self.table_id,
                    state,
                    next,
                    line_no
                );
            }
            if action == LineAction::Capture {
                lines.push(std::mem::take(&mut line));
            }
            state = next;
        }

        let status = state.finish();
        tracing::trace!(
            "Table {}: scan stopped after {} lines with {:?}, {} data lines",
            self.table_id,
            line_no,
            status,
            lines.len()
        );

        Ok(ExtractedTable {
            table_id: self.table_id.clone(),
            lines,
            status,
        })
    }
}
