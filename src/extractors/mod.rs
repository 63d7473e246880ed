// src/extractors/mod.rs
pub mod markers;
pub mod table;

// Re-export key extraction types for convenience
pub use table::{ExtractedTable, ScanStatus, TableExtractor, TableId};
