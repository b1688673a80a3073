//! Chunk planning and chunk artifacts of the fact tables.

use std::path::{Path, PathBuf};

use arrow::array::Int64Array;
use arrow::datatypes::DataType;

use crate::error::{OmopError, Result};
use crate::utils::arrow::{downcast_array, get_column};
use crate::utils::io::{find_parquet_files, read_parquet, split_into_chunks};

/// Input files of a chunked table, grouped by chunk index
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChunkPlan {
    chunks: Vec<Vec<PathBuf>>,
}

impl ChunkPlan {
    /// Find the parquet files below `dir` and split them into `n_chunks` groups
    pub fn discover(dir: &Path, seed: u64, n_chunks: usize) -> Result<Self> {
        let files = find_parquet_files(dir)?;
        Ok(Self::new(split_into_chunks(files, seed, n_chunks)))
    }

    /// Plan over already grouped files
    #[must_use]
    pub fn new(chunks: Vec<Vec<PathBuf>>) -> Self {
        Self { chunks }
    }

    /// Number of chunks, including empty ones
    #[must_use]
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Whether the plan has no chunks
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Chunks from `start` on, with their indices
    pub fn from_chunk(&self, start: usize) -> impl Iterator<Item = (usize, &[PathBuf])> {
        self.chunks
            .iter()
            .enumerate()
            .skip(start)
            .map(|(idx, files)| (idx, files.as_slice()))
    }
}

/// `<out>/<TABLE>/<TABLE>_<chunk>.parquet`
#[must_use]
pub fn chunk_path(output_dir: &Path, table: &str, chunk: usize) -> PathBuf {
    output_dir.join(table).join(format!("{table}_{chunk}.parquet"))
}

/// Largest value of an id column over the chunks before `before`
///
/// Chunks that were never written (empty chunks) are skipped.
pub fn max_exported_id(
    output_dir: &Path,
    table: &str,
    id_column: &str,
    before: usize,
) -> Result<Option<i64>> {
    let mut max = None;
    for chunk in 0..before {
        let path = chunk_path(output_dir, table, chunk);
        if !path.exists() {
            continue;
        }
        for batch in read_parquet(&path, None)? {
            let column = get_column(&batch, id_column, &DataType::Int64, true)?.ok_or_else(
                || OmopError::ColumnNotFound {
                    column: id_column.to_string(),
                },
            )?;
            let ids = downcast_array::<Int64Array>(&column, id_column, "Int64")?;
            if let Some(batch_max) = arrow::compute::max(ids) {
                max = max.max(Some(batch_max));
            }
        }
    }
    Ok(max)
}
