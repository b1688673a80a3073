//! Assembling record batches against the fixed CDM schemas.
//!
//! Builders only fill the columns they know values for. Every other column of the
//! schema is emitted as a typed all-null array, so exports keep the full column list.

use std::sync::Arc;

use arrow::array::{
    ArrayRef, Date32Array, Date64Array, Float32Array, Float64Array, Int32Array, Int64Array,
    StringArray, Time32SecondArray, TimestampSecondArray, new_null_array,
};
use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;
use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use rustc_hash::FxHashMap;

use crate::error::{OmopError, Result};

/// Collects named columns and completes them into a batch of the target schema
#[derive(Debug)]
pub struct BatchAssembler {
    schema: SchemaRef,
    rows: usize,
    columns: FxHashMap<String, ArrayRef>,
}

impl BatchAssembler {
    /// Start a batch of `rows` rows
    #[must_use]
    pub fn new(schema: SchemaRef, rows: usize) -> Self {
        Self {
            schema,
            rows,
            columns: FxHashMap::default(),
        }
    }

    /// Provide the values of a column
    ///
    /// # Errors
    /// Fails if the schema has no such column, or the array has the wrong type or length.
    pub fn column(mut self, name: &str, array: ArrayRef) -> Result<Self> {
        let field = self.schema.field_with_name(name)?;
        if field.data_type() != array.data_type() {
            return Err(OmopError::InvalidData(format!(
                "column '{name}' expects {:?}, got {:?}",
                field.data_type(),
                array.data_type()
            )));
        }
        if array.len() != self.rows {
            return Err(OmopError::InvalidData(format!(
                "column '{name}' has {} values for {} rows",
                array.len(),
                self.rows
            )));
        }
        self.columns.insert(name.to_string(), array);
        Ok(self)
    }

    /// Build the batch, filling absent columns with nulls
    pub fn finish(mut self) -> Result<RecordBatch> {
        let arrays = self
            .schema
            .fields()
            .iter()
            .map(|field| {
                self.columns
                    .remove(field.name())
                    .unwrap_or_else(|| new_null_array(field.data_type(), self.rows))
            })
            .collect();
        Ok(RecordBatch::try_new(self.schema, arrays)?)
    }
}

/// Days from 0001-01-01 (CE) to 1970-01-01
const EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// Days since the Unix epoch
#[must_use]
pub fn days_since_epoch(date: NaiveDate) -> i32 {
    date.num_days_from_ce() - EPOCH_DAYS_FROM_CE
}

/// Utf8 column
pub fn strings<S: AsRef<str>>(values: impl IntoIterator<Item = Option<S>>) -> ArrayRef {
    Arc::new(StringArray::from_iter(values))
}

/// Int32 column
pub fn int32s(values: impl IntoIterator<Item = Option<i32>>) -> ArrayRef {
    Arc::new(Int32Array::from_iter(values))
}

/// Int64 column
pub fn int64s(values: impl IntoIterator<Item = Option<i64>>) -> ArrayRef {
    Arc::new(Int64Array::from_iter(values))
}

/// Float32 column
pub fn float32s(values: impl IntoIterator<Item = Option<f64>>) -> ArrayRef {
    Arc::new(Float32Array::from_iter(
        values.into_iter().map(|v| v.map(|x| x as f32)),
    ))
}

/// Float64 column
pub fn float64s(values: impl IntoIterator<Item = Option<f64>>) -> ArrayRef {
    Arc::new(Float64Array::from_iter(values))
}

/// Date32 column
pub fn dates(values: impl IntoIterator<Item = Option<NaiveDate>>) -> ArrayRef {
    Arc::new(Date32Array::from_iter(
        values.into_iter().map(|v| v.map(days_since_epoch)),
    ))
}

/// Date64 column (milliseconds since the epoch)
pub fn date64s(values: impl IntoIterator<Item = Option<NaiveDateTime>>) -> ArrayRef {
    Arc::new(Date64Array::from_iter(
        values.into_iter().map(|v| v.map(|dt| dt.and_utc().timestamp_millis())),
    ))
}

/// Time32(second) column
pub fn times(values: impl IntoIterator<Item = Option<NaiveTime>>) -> ArrayRef {
    Arc::new(Time32SecondArray::from_iter(
        values
            .into_iter()
            .map(|v| v.map(|t| t.num_seconds_from_midnight() as i32)),
    ))
}

/// Timestamp(second) column without time zone
pub fn timestamps(values: impl IntoIterator<Item = Option<NaiveDateTime>>) -> ArrayRef {
    Arc::new(TimestampSecondArray::from_iter(
        values.into_iter().map(|v| v.map(|dt| dt.and_utc().timestamp())),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::Array;
    use arrow::datatypes::{DataType, Field, Schema};

    fn schema() -> SchemaRef {
        Arc::new(Schema::new(vec![
            Field::new("id", DataType::Int64, false),
            Field::new("name", DataType::Utf8, true),
            Field::new("day", DataType::Date32, true),
        ]))
    }

    #[test]
    fn test_absent_columns_are_null() {
        let batch = BatchAssembler::new(schema(), 2)
            .column("id", int64s([Some(1), Some(2)]))
            .unwrap()
            .finish()
            .unwrap();
        assert_eq!(batch.num_columns(), 3);
        assert_eq!(batch.column(1).null_count(), 2);
        assert_eq!(batch.column(2).data_type(), &DataType::Date32);
    }

    #[test]
    fn test_rejects_wrong_type_and_unknown_column() {
        assert!(
            BatchAssembler::new(schema(), 1)
                .column("id", int32s([Some(1)]))
                .is_err()
        );
        assert!(
            BatchAssembler::new(schema(), 1)
                .column("missing", int64s([Some(1)]))
                .is_err()
        );
        assert!(
            BatchAssembler::new(schema(), 2)
                .column("id", int64s([Some(1)]))
                .is_err()
        );
    }

    #[test]
    fn test_date_encoding() {
        let date = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
        assert_eq!(days_since_epoch(date), 19358);
        let array = dates([Some(date), None]);
        assert_eq!(array.null_count(), 1);
    }
}
