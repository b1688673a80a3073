//! Input discovery and chunk partitioning.

use std::path::{Path, PathBuf};

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::error::{OmopError, Result};
use crate::utils::logging::{log_operation_start, log_warning};

/// Find all parquet files below a directory, sorted by path
///
/// # Errors
/// Returns an error if the directory does not exist or cannot be read
pub fn find_parquet_files(dir: &Path) -> Result<Vec<PathBuf>> {
    log_operation_start("Searching for parquet files in", dir);
    if !dir.is_dir() {
        return Err(OmopError::io(
            dir,
            std::io::Error::new(std::io::ErrorKind::NotFound, "directory does not exist"),
        ));
    }

    let mut files = Vec::new();
    let mut pending = vec![dir.to_path_buf()];
    while let Some(current) = pending.pop() {
        let entries = std::fs::read_dir(&current).map_err(|e| OmopError::io(&current, e))?;
        for entry in entries {
            let path = entry.map_err(|e| OmopError::io(&current, e))?.path();
            if path.is_dir() {
                pending.push(path);
            } else if path.extension().is_some_and(|ext| ext == "parquet") {
                files.push(path);
            }
        }
    }
    files.sort();

    if files.is_empty() {
        log_warning("No parquet files found", Some(dir));
    } else {
        log::info!("Found {} parquet files in {}", files.len(), dir.display());
    }
    Ok(files)
}

/// Shuffle paths with a fixed seed and split them into `n_chunks` groups
///
/// Group sizes differ by at most one; the first `len % n_chunks` groups hold the
/// extra paths. The same input and seed always give the same chunks. Groups are
/// empty when there are fewer paths than chunks.
#[must_use]
pub fn split_into_chunks(mut paths: Vec<PathBuf>, seed: u64, n_chunks: usize) -> Vec<Vec<PathBuf>> {
    let n_chunks = n_chunks.max(1);
    let mut rng = StdRng::seed_from_u64(seed);
    paths.shuffle(&mut rng);

    let base = paths.len() / n_chunks;
    let extra = paths.len() % n_chunks;
    let mut remaining = paths.into_iter();
    (0..n_chunks)
        .map(|i| {
            let size = base + usize::from(i < extra);
            remaining.by_ref().take(size).collect()
        })
        .collect()
}
