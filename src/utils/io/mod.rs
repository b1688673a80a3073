//! File I/O: parquet input and output, delimited text output, and input discovery.

pub mod csv;
pub mod parquet;
pub mod paths;

pub use csv::write_csv;
pub use parquet::{read_parquet, read_parquet_files, write_parquet};
pub use paths::{find_parquet_files, split_into_chunks};

use std::path::{Path, PathBuf};

use crate::error::{OmopError, Result};

/// Temporary sibling of `path` that is renamed into place once fully written
fn temporary_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Write through `write` to a temporary file, then rename it to `path`
///
/// Readers never observe a partially written artifact: on failure the temporary file
/// is removed and `path` is left untouched.
pub(crate) fn write_atomically<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(std::fs::File) -> Result<()>,
{
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| OmopError::io(parent, e))?;
    }
    let tmp = temporary_path(path);
    let file = std::fs::File::create(&tmp).map_err(|e| OmopError::io(&tmp, e))?;
    if let Err(e) = write(file) {
        let _ = std::fs::remove_file(&tmp);
        return Err(e);
    }
    std::fs::rename(&tmp, path).map_err(|e| OmopError::io(path, e))
}
