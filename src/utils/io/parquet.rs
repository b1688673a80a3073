//! Parquet file operations
//!
//! Reading input files into Arrow record batches (optionally projected onto the
//! columns a builder needs) and writing chunk artifacts with a fixed schema.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::datatypes::Schema;
use arrow::record_batch::RecordBatch;
use itertools::Itertools;
use parquet::arrow::ArrowWriter;
use parquet::arrow::{ProjectionMask, arrow_reader::ParquetRecordBatchReaderBuilder};
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use rayon::prelude::*;

use super::write_atomically;
use crate::error::{OmopError, Result};
use crate::utils::logging::{log_operation_complete, log_operation_start};

/// Default batch size for Parquet reading
pub const DEFAULT_BATCH_SIZE: usize = 16384;

/// Batch size from `PARQUET_BATCH_SIZE`, or the default
#[must_use]
pub fn batch_size() -> usize {
    std::env::var("PARQUET_BATCH_SIZE")
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or(DEFAULT_BATCH_SIZE)
}

/// Projection mask of the schema fields present in the file
///
/// Fields absent from the file are skipped; the caller decides whether that is an
/// error. Returns `None` when nothing matches, in which case all columns are read.
fn create_projection(
    schema: &Schema,
    file_schema: &Schema,
    parquet_schema: &parquet::schema::types::SchemaDescriptor,
) -> Option<ProjectionMask> {
    let roots = schema
        .fields()
        .iter()
        .filter_map(|f| file_schema.index_of(f.name()).ok())
        .collect_vec();
    if roots.is_empty() {
        None
    } else {
        Some(ProjectionMask::roots(parquet_schema, roots))
    }
}

/// Read a parquet file into Arrow record batches
///
/// # Arguments
/// * `path` - Path to the Parquet file
/// * `schema` - Optional schema whose field names select the columns to read
///
/// # Errors
/// Returns an error if the file cannot be opened or is not valid parquet
pub fn read_parquet(path: &Path, schema: Option<&Schema>) -> Result<Vec<RecordBatch>> {
    let file = File::open(path).map_err(|e| OmopError::io(path, e))?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)?.with_batch_size(batch_size());

    let projection = schema.and_then(|schema| {
        create_projection(schema, builder.schema(), builder.parquet_schema())
    });
    let reader = match projection {
        Some(mask) => builder.with_projection(mask).build()?,
        None => builder.build()?,
    };

    let batches = reader.collect::<std::result::Result<Vec<_>, _>>()?;
    log::debug!("Read {} batches from {}", batches.len(), path.display());
    Ok(batches)
}

/// Read several parquet files in parallel, keeping the order of `paths`
pub fn read_parquet_files(paths: &[PathBuf], schema: Option<&Schema>) -> Result<Vec<RecordBatch>> {
    let per_file: Vec<Result<Vec<RecordBatch>>> = paths
        .par_iter()
        .map(|path| read_parquet(path, schema))
        .collect();

    let mut batches = Vec::new();
    for result in per_file {
        batches.extend(result?);
    }
    Ok(batches)
}

/// Write record batches to a parquet file with a fixed schema
///
/// Every batch must match `schema` exactly. The file is written to a temporary path
/// and renamed, so a failed write leaves no artifact behind.
pub fn write_parquet(path: &Path, schema: &Arc<Schema>, batches: &[RecordBatch]) -> Result<()> {
    let start = std::time::Instant::now();
    log_operation_start("Writing", path);

    for batch in batches {
        if batch.schema().as_ref() != schema.as_ref() {
            return Err(OmopError::InvalidData(format!(
                "batch schema does not match the export schema of {}",
                path.display()
            )));
        }
    }

    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();
    write_atomically(path, |file| {
        let mut writer = ArrowWriter::try_new(file, schema.clone(), Some(props))?;
        for batch in batches {
            writer.write(batch)?;
        }
        writer.close()?;
        Ok(())
    })?;

    let rows = batches.iter().map(RecordBatch::num_rows).sum();
    log_operation_complete("wrote", path, rows, Some(start.elapsed()));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{Float64Array, StringArray};
    use arrow::datatypes::{DataType, Field};

    fn sample() -> (Arc<Schema>, RecordBatch) {
        let schema = Arc::new(Schema::new(vec![
            Field::new("patient", DataType::Utf8, false),
            Field::new("time", DataType::Float64, false),
        ]));
        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(StringArray::from(vec!["a", "b"])),
                Arc::new(Float64Array::from(vec![0.0, 3600.0])),
            ],
        )
        .unwrap();
        (schema, batch)
    }

    #[test]
    fn test_write_then_project_one_column() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/out.parquet");
        let (schema, batch) = sample();
        write_parquet(&path, &schema, &[batch]).unwrap();
        assert!(!dir.path().join("nested/out.parquet.tmp").exists());

        let projection = Schema::new(vec![Field::new("time", DataType::Float64, false)]);
        let batches = read_parquet(&path, Some(&projection)).unwrap();
        assert_eq!(batches[0].num_columns(), 1);
        assert_eq!(batches[0].num_rows(), 2);
    }

    #[test]
    fn test_schema_mismatch_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.parquet");
        let (_, batch) = sample();
        let other = Arc::new(Schema::new(vec![Field::new("x", DataType::Int32, true)]));
        assert!(write_parquet(&path, &other, &[batch]).is_err());
        assert!(!path.exists());
    }
}
