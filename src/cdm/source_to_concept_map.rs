//! SOURCE_TO_CONCEPT_MAP: the source-code mapping as an exportable table.

use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;
use chrono::NaiveDate;

use super::columns::{BatchAssembler, dates, int32s, strings};
use super::{BuiltTable, CdmRecord, schema};
use crate::error::Result;
use crate::vocabulary::ConceptMapping;

/// A SOURCE_TO_CONCEPT_MAP row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceToConceptMapRecord {
    /// Source code
    pub source_code: String,
    /// Always 0: source codes are not vocabulary concepts
    pub source_concept_id: i32,
    /// Mapped concept
    pub target_concept_id: i32,
    /// Start of validity
    pub valid_start_date: NaiveDate,
    /// End of validity
    pub valid_end_date: NaiveDate,
}

/// Flatten the concept mapping, keeping its insertion order
#[must_use]
pub fn build_source_to_concept_map(
    mapping: &ConceptMapping,
    valid_start_date: NaiveDate,
    valid_end_date: NaiveDate,
) -> BuiltTable<SourceToConceptMapRecord> {
    let rows = mapping
        .entries()
        .iter()
        .map(|entry| SourceToConceptMapRecord {
            source_code: entry.source_code.clone(),
            source_concept_id: 0,
            target_concept_id: entry.target_concept_id,
            valid_start_date,
            valid_end_date,
        })
        .collect();
    BuiltTable::complete(rows)
}

impl CdmRecord for SourceToConceptMapRecord {
    const TABLE: &'static str = "SOURCE_TO_CONCEPT_MAP";

    fn schema() -> SchemaRef {
        schema::source_to_concept_map()
    }

    fn to_record_batch(rows: &[Self]) -> Result<RecordBatch> {
        BatchAssembler::new(Self::schema(), rows.len())
            .column(
                "source_code",
                strings(rows.iter().map(|r| Some(r.source_code.as_str()))),
            )?
            .column(
                "source_concept_id",
                int32s(rows.iter().map(|r| Some(r.source_concept_id))),
            )?
            .column(
                "target_concept_id",
                int32s(rows.iter().map(|r| Some(r.target_concept_id))),
            )?
            .column(
                "valid_start_date",
                dates(rows.iter().map(|r| Some(r.valid_start_date))),
            )?
            .column(
                "valid_end_date",
                dates(rows.iter().map(|r| Some(r.valid_end_date))),
            )?
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vocabulary::MappingSource;

    #[test]
    fn test_one_row_per_source_code() {
        let mut mapping = ConceptMapping::default();
        mapping.insert("icu", 4148981, MappingSource::VisitType).unwrap();
        mapping.insert("heart_rate", 3027018, MappingSource::Variable).unwrap();
        mapping.insert("icu", 4148981, MappingSource::VisitType).unwrap();

        let start = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2099, 12, 31).unwrap();
        let table = build_source_to_concept_map(&mapping, start, end);
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows[1].source_code, "heart_rate");
        assert_eq!(table.rows[1].source_concept_id, 0);
        assert_eq!(table.rows[0].valid_end_date, end);
    }
}
