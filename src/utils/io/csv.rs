//! Delimited text export of the dimension tables.

use std::path::Path;

use arrow::csv::WriterBuilder;
use arrow::record_batch::RecordBatch;

use super::write_atomically;
use crate::error::Result;
use crate::utils::logging::log_operation_complete;

/// Field delimiter of exported tables
pub const DELIMITER: u8 = b';';

/// Format of timestamp columns in exported tables
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Write a table as `;`-delimited text with a header row
///
/// Null values are written as empty fields. The file appears only once completely
/// written.
pub fn write_csv(path: &Path, batch: &RecordBatch) -> Result<()> {
    write_atomically(path, |file| {
        let mut writer = WriterBuilder::new()
            .with_header(true)
            .with_delimiter(DELIMITER)
            .with_timestamp_format(TIMESTAMP_FORMAT.to_string())
            .build(file);
        writer.write(batch)?;
        Ok(())
    })?;
    log_operation_complete("wrote", path, batch.num_rows(), None);
    Ok(())
}
