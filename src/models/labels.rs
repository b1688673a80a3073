//! The harmonized per-admission label table.

use std::path::Path;

use arrow::record_batch::RecordBatch;

use crate::error::{OmopError, Result};
use crate::utils::arrow::{f64_column, string_column};
use crate::utils::io::read_parquet;
use crate::utils::logging::log_operation_start;

/// Column holding the visit natural key
pub const VISIT_KEY_COLUMN: &str = "patient";
/// Column holding the patient natural key
pub const PATIENT_KEY_COLUMN: &str = "uniquepid";
/// Column holding the in-ICU mortality flag
pub const MORTALITY_COLUMN: &str = "mortality";

/// One admission of the harmonized label table
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LabelRecord {
    /// Natural key of the admission
    pub visit_key: String,
    /// Natural key of the patient
    pub patient_key: String,
    /// 1 male, 0 female, anything else unknown
    pub sex: Option<f64>,
    /// Age at admission in years
    pub raw_age: Option<f64>,
    /// Weight at admission in kg
    pub raw_weight: Option<f64>,
    /// Height at admission in cm
    pub raw_height: Option<f64>,
    /// ICU length of stay in hours
    pub length_of_stay_hours: Option<f64>,
    /// Whether the patient died during the stay
    pub mortality: bool,
    /// Free-text admission origin
    pub origin: Option<String>,
    /// Free-text discharge destination
    pub discharge_location: Option<String>,
    /// Hospital name or hospital id
    pub care_site: Option<String>,
    /// ICU unit type
    pub unit_type: Option<String>,
    /// Source database tag
    pub source_dataset: Option<String>,
}

impl LabelRecord {
    /// Numeric admission covariate by label-table column name
    #[must_use]
    pub fn covariate(&self, name: &str) -> Option<f64> {
        match name {
            "raw_age" => self.raw_age,
            "raw_weight" => self.raw_weight,
            "raw_height" => self.raw_height,
            _ => None,
        }
    }
}

/// All admissions, in label-table row order
#[derive(Debug, Clone, Default)]
pub struct LabelTable {
    records: Vec<LabelRecord>,
}

impl LabelTable {
    /// Wrap already-parsed records
    #[must_use]
    pub fn new(records: Vec<LabelRecord>) -> Self {
        Self { records }
    }

    /// Read the label table from parquet
    pub fn load(path: &Path) -> Result<Self> {
        log_operation_start("Loading labels from", path);
        let mut records = Vec::new();
        for batch in read_parquet(path, None)? {
            records.extend(records_from_batch(&batch)?);
        }
        log::info!("Loaded {} admissions", records.len());
        Ok(Self { records })
    }

    /// Consume the table
    #[must_use]
    pub fn into_records(self) -> Vec<LabelRecord> {
        self.records
    }

    /// Number of admissions
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the table is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

fn optional_strings(batch: &RecordBatch, name: &str) -> Result<Vec<Option<String>>> {
    if batch.column_by_name(name).is_some() {
        string_column(batch, name)
    } else {
        log::debug!("Label column '{name}' absent, treating as null");
        Ok(vec![None; batch.num_rows()])
    }
}

fn optional_floats(batch: &RecordBatch, name: &str) -> Result<Vec<Option<f64>>> {
    Ok(f64_column(batch, name, false)?.unwrap_or_else(|| vec![None; batch.num_rows()]))
}

/// Parse one batch of the label table
///
/// The two natural keys are required; every other column may be absent.
pub fn records_from_batch(batch: &RecordBatch) -> Result<Vec<LabelRecord>> {
    let visit_keys = string_column(batch, VISIT_KEY_COLUMN)?;
    let patient_keys = string_column(batch, PATIENT_KEY_COLUMN)?;
    let sex = optional_floats(batch, "sex")?;
    let age = optional_floats(batch, "raw_age")?;
    let weight = optional_floats(batch, "raw_weight")?;
    let height = optional_floats(batch, "raw_height")?;
    let los = optional_floats(batch, "lengthofstay")?;
    let mortality = optional_floats(batch, MORTALITY_COLUMN)?;
    let origin = optional_strings(batch, "origin")?;
    let destination = optional_strings(batch, "discharge_location")?;
    let care_site = optional_strings(batch, "care_site")?;
    let unit_type = optional_strings(batch, "unit_type")?;
    let dataset = optional_strings(batch, "source_dataset")?;

    (0..batch.num_rows())
        .map(|row| {
            let visit_key = visit_keys[row].clone().ok_or_else(|| {
                OmopError::InvalidData(format!("null {VISIT_KEY_COLUMN} in label row {row}"))
            })?;
            let patient_key = patient_keys[row].clone().ok_or_else(|| {
                OmopError::InvalidData(format!("null {PATIENT_KEY_COLUMN} for visit {visit_key}"))
            })?;
            Ok(LabelRecord {
                visit_key,
                patient_key,
                sex: sex[row],
                raw_age: age[row],
                raw_weight: weight[row],
                raw_height: height[row],
                length_of_stay_hours: los[row],
                mortality: mortality[row] == Some(1.0),
                origin: origin[row].clone(),
                discharge_location: destination[row].clone(),
                care_site: care_site[row].clone(),
                unit_type: unit_type[row].clone(),
                source_dataset: dataset[row].clone(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{Float64Array, Int64Array, StringArray};
    use arrow::datatypes::{DataType, Field, Schema};
    use std::sync::Arc;

    #[test]
    fn test_parse_with_absent_optional_columns() {
        let schema = Schema::new(vec![
            Field::new("patient", DataType::Int64, false),
            Field::new("uniquepid", DataType::Utf8, false),
            Field::new("mortality", DataType::Int64, true),
            Field::new("raw_age", DataType::Float64, true),
        ]);
        let batch = RecordBatch::try_new(
            Arc::new(schema),
            vec![
                Arc::new(Int64Array::from(vec![1001, 1002])),
                Arc::new(StringArray::from(vec!["p1", "p2"])),
                Arc::new(Int64Array::from(vec![Some(1), None])),
                Arc::new(Float64Array::from(vec![Some(42.0), None])),
            ],
        )
        .unwrap();

        let records = records_from_batch(&batch).unwrap();
        assert_eq!(records[0].visit_key, "1001");
        assert!(records[0].mortality);
        assert!(!records[1].mortality);
        assert_eq!(records[0].covariate("raw_age"), Some(42.0));
        assert_eq!(records[1].origin, None);
    }

    #[test]
    fn test_null_patient_key_rejected() {
        let schema = Schema::new(vec![
            Field::new("patient", DataType::Utf8, false),
            Field::new("uniquepid", DataType::Utf8, true),
        ]);
        let batch = RecordBatch::try_new(
            Arc::new(schema),
            vec![
                Arc::new(StringArray::from(vec!["v1"])),
                Arc::new(StringArray::from(vec![None::<&str>])),
            ],
        )
        .unwrap();
        assert!(matches!(
            records_from_batch(&batch),
            Err(OmopError::InvalidData(_))
        ));
    }
}
