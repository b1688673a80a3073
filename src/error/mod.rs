//! Error handling for the OMOP conversion pipeline.
//!
//! Fatal conditions (broken reference data, unreadable inputs, failed exports) surface as
//! [`OmopError`]. Row-level resolution gaps are not errors; they are counted in the
//! [`ConversionReport`](crate::pipeline::ConversionReport) instead.

use std::io;
use std::path::{Path, PathBuf};

use arrow::error::ArrowError;
use parquet::errors::ParquetError;

/// Errors that can occur while converting to OMOP CDM
#[derive(Debug, thiserror::Error)]
pub enum OmopError {
    /// Arrow error
    #[error("Arrow error: {0}")]
    Arrow(#[from] ArrowError),

    /// Parquet error
    #[error("Parquet error: {0}")]
    Parquet(#[from] ParquetError),

    /// Error opening, reading or writing a file
    #[error("IO error at {}: {source}", path.display())]
    Io {
        /// Path of the file or directory involved
        path: PathBuf,
        /// Underlying error
        source: io::Error,
    },

    /// Error converting between Arrow batches and Rust records
    #[error("Record conversion error: {0}")]
    SerdeArrow(#[from] serde_arrow::Error),

    /// Error parsing or writing JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid pipeline configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Concepts required by the pipeline that the vocabulary does not contain
    #[error("Vocabulary is missing {} required concept(s): {missing:?}", missing.len())]
    MissingConcepts {
        /// The absent concept ids, sorted
        missing: Vec<i32>,
    },

    /// A source code mapped to two different target concepts
    #[error("Source code '{code}' maps to both concept {first} and concept {second}")]
    ConflictingMapping {
        /// Source code
        code: String,
        /// Concept id registered first
        first: i32,
        /// Concept id that conflicts with it
        second: i32,
    },

    /// Two label rows describe the same admission
    #[error("Duplicate visit key in label table: {0}")]
    DuplicateVisit(String),

    /// A required input column is absent
    #[error("Column '{column}' not found")]
    ColumnNotFound {
        /// Column name
        column: String,
    },

    /// Input data that cannot be interpreted
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Processing of a single chunk failed
    #[error("{table} chunk {chunk} failed: {source}")]
    ChunkFailed {
        /// CDM table the chunk belongs to
        table: &'static str,
        /// Chunk index
        chunk: usize,
        /// Cause
        source: Box<OmopError>,
    },
}

impl OmopError {
    /// Attach a path to an I/O error
    pub fn io(path: impl AsRef<Path>, source: io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Wrap an error raised while processing a chunk
    #[must_use]
    pub fn in_chunk(self, table: &'static str, chunk: usize) -> Self {
        Self::ChunkFailed {
            table,
            chunk,
            source: Box::new(self),
        }
    }
}

/// Result type for OMOP conversion operations
pub type Result<T> = std::result::Result<T, OmopError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_concepts_message_lists_ids() {
        let err = OmopError::MissingConcepts {
            missing: vec![8507, 9203],
        };
        assert_eq!(
            err.to_string(),
            "Vocabulary is missing 2 required concept(s): [8507, 9203]"
        );
    }

    #[test]
    fn test_chunk_failure_keeps_cause() {
        let err = OmopError::InvalidData("bad offset".to_string()).in_chunk("MEASUREMENT", 3);
        assert_eq!(
            err.to_string(),
            "MEASUREMENT chunk 3 failed: Invalid data: bad offset"
        );
    }
}
