//! Utilities for working with Arrow arrays.
//!
//! Input files come from several source databases, so the same logical column may be
//! stored with different physical types. Columns are fetched by name and cast to the
//! type the builders expect.

use arrow::array::{Array, ArrayRef, Float64Array, StringArray};
use arrow::compute::kernels::cast::cast;
use arrow::datatypes::DataType;
use arrow::record_batch::RecordBatch;
use log::debug;

use crate::error::{OmopError, Result};

/// Get a column from a record batch, cast to the expected type
///
/// # Arguments
///
/// * `batch` - The record batch containing the column
/// * `column_name` - The name of the column to extract
/// * `expected_type` - The data type the caller works with
/// * `required` - Whether a missing column is an error or `None`
///
/// # Returns
///
/// * `Ok(Some(ArrayRef))` - The column, converted if necessary
/// * `Ok(None)` - The column is absent and not required
/// * `Err(OmopError)` - The column is absent and required, or cannot be cast
pub fn get_column(
    batch: &RecordBatch,
    column_name: &str,
    expected_type: &DataType,
    required: bool,
) -> Result<Option<ArrayRef>> {
    let Some(column) = batch.column_by_name(column_name) else {
        if required {
            return Err(OmopError::ColumnNotFound {
                column: column_name.to_string(),
            });
        }
        return Ok(None);
    };

    if column.data_type() == expected_type {
        return Ok(Some(column.clone()));
    }

    debug!(
        "Converting column '{column_name}' from {:?} to {expected_type:?}",
        column.data_type()
    );
    Ok(Some(cast(column, expected_type)?))
}

/// Downcast a column to a concrete array type with a clear error message
pub fn downcast_array<'a, T: Array + 'static>(
    array: &'a ArrayRef,
    column_name: &str,
    type_name: &str,
) -> Result<&'a T> {
    array.as_any().downcast_ref::<T>().ok_or_else(|| {
        OmopError::InvalidData(format!("Column '{column_name}' is not a {type_name} array"))
    })
}

/// Required column as optional strings, one per row
pub fn string_column(batch: &RecordBatch, column_name: &str) -> Result<Vec<Option<String>>> {
    let array = get_column(batch, column_name, &DataType::Utf8, true)?
        .ok_or_else(|| OmopError::ColumnNotFound {
            column: column_name.to_string(),
        })?;
    let strings = downcast_array::<StringArray>(&array, column_name, "Utf8")?;
    Ok(strings.iter().map(|v| v.map(str::to_string)).collect())
}

/// Column as optional floats, or `None` when absent and not required
///
/// NaN values are read as missing.
pub fn f64_column(
    batch: &RecordBatch,
    column_name: &str,
    required: bool,
) -> Result<Option<Vec<Option<f64>>>> {
    let Some(array) = get_column(batch, column_name, &DataType::Float64, required)? else {
        return Ok(None);
    };
    let values = downcast_array::<Float64Array>(&array, column_name, "Float64")?;
    Ok(Some(
        values
            .iter()
            .map(|v| v.filter(|x| !x.is_nan()))
            .collect(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{Int64Array, StringArray};
    use arrow::datatypes::{Field, Schema};
    use std::sync::Arc;

    fn batch() -> RecordBatch {
        let schema = Schema::new(vec![
            Field::new("patient", DataType::Int64, false),
            Field::new("value", DataType::Float64, true),
            Field::new("label", DataType::Utf8, true),
        ]);
        RecordBatch::try_new(
            Arc::new(schema),
            vec![
                Arc::new(Int64Array::from(vec![10, 11])),
                Arc::new(Float64Array::from(vec![Some(1.5), Some(f64::NAN)])),
                Arc::new(StringArray::from(vec![Some("a"), None])),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_numeric_keys_cast_to_strings() {
        let patients = string_column(&batch(), "patient").unwrap();
        assert_eq!(patients, vec![Some("10".to_string()), Some("11".to_string())]);
    }

    #[test]
    fn test_nan_read_as_missing() {
        let values = f64_column(&batch(), "value", true).unwrap().unwrap();
        assert_eq!(values, vec![Some(1.5), None]);
    }

    #[test]
    fn test_missing_column_is_optional_or_error() {
        assert!(f64_column(&batch(), "absent", false).unwrap().is_none());
        assert!(matches!(
            string_column(&batch(), "absent"),
            Err(OmopError::ColumnNotFound { .. })
        ));
    }
}
