//! Summary of a conversion run.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::cdm::ResolutionGaps;
use crate::error::Result;
use crate::utils::io::write_atomically;

/// File name of the report inside the output directory
pub const REPORT_FILE: &str = "conversion_report.json";

/// What happened to one CDM table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableReport {
    /// Rows exported
    pub rows: usize,
    /// Chunk files written (chunked tables only)
    pub chunks_exported: usize,
    /// Chunks without input files
    pub chunks_empty: usize,
    /// Chunks skipped because they precede the start chunk
    pub chunks_resumed: usize,
    /// Unresolved values
    pub gaps: ResolutionGaps,
    /// `"<chunk>:<variable>"` for every variable absent from a whole chunk
    pub skipped_variables: Vec<String>,
}

/// Counters of a conversion run, by table name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionReport {
    /// Per-table reports
    pub tables: BTreeMap<String, TableReport>,
}

impl ConversionReport {
    /// Create an empty report
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn table(&mut self, table: &str) -> &mut TableReport {
        self.tables.entry(table.to_string()).or_default()
    }

    /// Record a table exported in one piece
    pub fn record_table(&mut self, table: &str, rows: usize, gaps: ResolutionGaps) {
        let report = self.table(table);
        report.rows += rows;
        report.gaps += gaps;
    }

    /// Record one exported chunk
    pub fn record_chunk(
        &mut self,
        table: &str,
        chunk: usize,
        rows: usize,
        gaps: ResolutionGaps,
        skipped_variables: &[String],
    ) {
        let report = self.table(table);
        report.rows += rows;
        report.chunks_exported += 1;
        report.gaps += gaps;
        report
            .skipped_variables
            .extend(skipped_variables.iter().map(|v| format!("{chunk}:{v}")));
    }

    /// Record a chunk without input files
    pub fn record_empty_chunk(&mut self, table: &str) {
        self.table(table).chunks_empty += 1;
    }

    /// Record chunks left alone because they were exported by an earlier run
    pub fn record_resumed_chunks(&mut self, table: &str, chunks: usize) {
        self.table(table).chunks_resumed += chunks;
    }

    /// Rows exported for a table
    #[must_use]
    pub fn rows(&self, table: &str) -> usize {
        self.tables.get(table).map_or(0, |t| t.rows)
    }

    /// Gaps summed over all tables
    #[must_use]
    pub fn total_gaps(&self) -> ResolutionGaps {
        let mut total = ResolutionGaps::default();
        for report in self.tables.values() {
            total += report.gaps;
        }
        total
    }

    /// Log one line per table
    pub fn log_summary(&self) {
        for (table, report) in &self.tables {
            log::info!(
                "{table}: {} rows, {} chunks, {} unresolved values",
                report.rows,
                report.chunks_exported,
                report.gaps.total()
            );
        }
    }

    /// Write the report as pretty-printed JSON
    pub fn write_json(&self, path: &Path) -> Result<()> {
        write_atomically(path, |file| {
            serde_json::to_writer_pretty(file, self)?;
            Ok(())
        })
    }
}
