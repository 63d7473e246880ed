// src/extractors/markers.rs
//
// Line classifiers for the three markers that delimit a table in a PRN report:
//
//   Table 10.03  Daily Vehicle Trips by Purpose     <- title line
//   ==========   =======   =======                  <- data begin marker
//   HBW            1234.5    987.0                  <- data lines (kept)
//                                                   <- data end marker (blank)
//
// Every check looks at a single line only. Lines are raw bytes, so reports in
// a legacy code page classify the same as UTF-8 ones.

use once_cell::sync::Lazy;
use regex::bytes::Regex;

// Leading '=' is required; after it only '=', spaces and tabs may follow.
static DATA_BEGIN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^=[= \t]*$").expect("Failed to compile DATA_BEGIN_RE"));

static DATA_END_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[ \t]*$").expect("Failed to compile DATA_END_RE"));

/// Builds the pattern that recognises the title line of `table_id`.
///
/// The identifier is escaped, so `10.1` matches `Table 10.1` but never `Table 10x1`.
/// Any number of spaces (including none) may sit between `Table` and the identifier.
pub fn title_pattern(table_id: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!("Table *{}", regex::escape(table_id)))
}

/// True if the line announces the table the pattern was built for.
pub fn is_title_line(line: &[u8], title: &Regex) -> bool {
    title.is_match(strip_line_ending(line))
}

/// True if the line separates a table's header from its data rows.
pub fn is_data_begin_marker(line: &[u8]) -> bool {
    DATA_BEGIN_RE.is_match(strip_line_ending(line))
}

/// True if the line is empty or whitespace-only, which closes a table's data rows.
pub fn is_data_end_marker(line: &[u8]) -> bool {
    DATA_END_RE.is_match(strip_line_ending(line))
}

/// Drops a trailing `\n` or `\r\n`. Lines are classified without their terminator
/// but copied to the output with it.
fn strip_line_ending(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}
