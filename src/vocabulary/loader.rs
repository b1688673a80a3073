//! Loading the vocabulary CONCEPT table from parquet.

use std::path::Path;
use std::sync::Arc;

use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;

use super::concept::Concept;
use crate::error::Result;
use crate::utils::arrow::get_column;
use crate::utils::io::read_parquet;

/// Columns read from the vocabulary and the types they are normalised to
fn vocabulary_schema() -> Schema {
    Schema::new(vec![
        Field::new("concept_id", DataType::Int32, false),
        Field::new("concept_name", DataType::Utf8, false),
        Field::new("domain_id", DataType::Utf8, false),
        Field::new("vocabulary_id", DataType::Utf8, false),
        Field::new("concept_class_id", DataType::Utf8, false),
        Field::new("standard_concept", DataType::Utf8, true),
        Field::new("concept_code", DataType::Utf8, false),
    ])
}

/// Read every concept of a vocabulary parquet file
///
/// Columns are cast to the expected types first, so numeric concept codes or
/// 64-bit concept ids in the source file are accepted.
pub fn load_vocabulary(path: &Path) -> Result<Vec<Concept>> {
    let schema = vocabulary_schema();
    let batches = read_parquet(path, Some(&schema))?;

    let mut concepts = Vec::new();
    for batch in &batches {
        let normalised = normalise_batch(batch, &schema)?;
        let mut rows: Vec<Concept> = serde_arrow::from_record_batch(&normalised)?;
        concepts.append(&mut rows);
    }

    log::info!(
        "Loaded {} vocabulary concepts from {}",
        concepts.len(),
        path.display()
    );
    Ok(concepts)
}

fn normalise_batch(batch: &RecordBatch, schema: &Schema) -> Result<RecordBatch> {
    let mut columns = Vec::with_capacity(schema.fields().len());
    for field in schema.fields() {
        let column = get_column(batch, field.name(), field.data_type(), !field.is_nullable())?;
        columns.push(column.unwrap_or_else(|| {
            arrow::array::new_null_array(field.data_type(), batch.num_rows())
        }));
    }
    // The source may contain nulls in columns declared non-nullable above.
    let relaxed = Schema::new(
        schema
            .fields()
            .iter()
            .map(|f| f.as_ref().clone().with_nullable(true))
            .collect::<Vec<_>>(),
    );
    Ok(RecordBatch::try_new(Arc::new(relaxed), columns)?)
}
