//! DRUG_EXPOSURE: medication intervals, one chunk at a time.
//!
//! Ids continue from the largest id of the previous chunk, so chunks must be built in
//! export order with the same [`RunningIdAllocator`].

use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;
use chrono::NaiveDateTime;

use super::columns::{BatchAssembler, dates, int32s, int64s, strings};
use super::time::offset_datetime;
use super::{BuiltTable, CdmRecord, ResolutionGaps, schema};
use crate::error::Result;
use crate::identifiers::RunningIdAllocator;
use crate::models::VisitIndex;
use crate::models::labels::VISIT_KEY_COLUMN;
use crate::utils::arrow::{f64_column, string_column};
use crate::utils::logging::log_skip;
use crate::vocabulary::ConceptMapping;
use crate::vocabulary::constants::DRUG_TYPE_CONCEPT_ID;

/// Format of the time-of-day text columns
pub const TIME_OF_DAY_FORMAT: &str = "%H:%M:%S";

/// A DRUG_EXPOSURE row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrugExposureRecord {
    /// Drug exposure id
    pub drug_exposure_id: i64,
    /// Medication name
    pub drug_source_value: Option<String>,
    /// Derived visit id
    pub visit_occurrence_id: String,
    /// Derived person id
    pub person_id: String,
    /// Start of the interval
    pub start: Option<NaiveDateTime>,
    /// End of the interval
    pub end: Option<NaiveDateTime>,
    /// Concept of the medication
    pub drug_concept_id: Option<i32>,
}

/// Output of one drug exposure chunk
#[derive(Debug, Clone, PartialEq)]
pub struct DrugExposureChunk {
    /// Chunk index
    pub chunk: usize,
    /// Rows and gaps
    pub table: BuiltTable<DrugExposureRecord>,
}

/// Build the drug exposures of one chunk
///
/// Rows whose visit key is not in the label table are dropped before ids are drawn, so
/// ids are dense within the chunk.
pub fn build_drug_exposures(
    batches: &[RecordBatch],
    chunk: usize,
    allocator: &mut RunningIdAllocator,
    visits: &VisitIndex,
    mapping: &ConceptMapping,
    reference: NaiveDateTime,
) -> Result<DrugExposureChunk> {
    let mut gaps = ResolutionGaps::default();
    let mut rows = Vec::new();

    for batch in batches {
        let keys = string_column(batch, VISIT_KEY_COLUMN)?;
        let names = string_column(batch, "variable")?;
        let starts = f64_column(batch, "start", true)?.unwrap_or_default();
        let ends = f64_column(batch, "end", true)?.unwrap_or_default();

        for (row, key) in keys.into_iter().enumerate() {
            let Some(visit) = key.as_deref().and_then(|k| visits.get(k)) else {
                gaps.join_misses += 1;
                continue;
            };
            let drug_source_value = names[row].clone();
            let drug_concept_id = drug_source_value
                .as_deref()
                .and_then(|name| mapping.resolve(name));
            if drug_concept_id.is_none() {
                gaps.drug_concept += 1;
            }
            rows.push(DrugExposureRecord {
                drug_exposure_id: 0,
                drug_source_value,
                visit_occurrence_id: visit.visit_occurrence_id.clone(),
                person_id: visit.person_id.clone(),
                start: offset_datetime(reference, starts[row]),
                end: offset_datetime(reference, ends[row]),
                drug_concept_id,
            });
        }
    }

    let first = allocator.allocate(rows.len())?;
    for (position, row) in rows.iter_mut().enumerate() {
        row.drug_exposure_id = first + position as i64;
    }

    if gaps.join_misses > 0 {
        log_skip(
            "DRUG_EXPOSURE",
            Some(chunk),
            &format!("{} rows without a known visit dropped", gaps.join_misses),
        );
    }
    if gaps.drug_concept > 0 {
        log_skip(
            "DRUG_EXPOSURE",
            Some(chunk),
            &format!("{} rows without a drug concept", gaps.drug_concept),
        );
    }

    Ok(DrugExposureChunk {
        chunk,
        table: BuiltTable { rows, gaps },
    })
}

fn time_of_day(datetime: Option<NaiveDateTime>) -> Option<String> {
    datetime.map(|dt| dt.format(TIME_OF_DAY_FORMAT).to_string())
}

impl CdmRecord for DrugExposureRecord {
    const TABLE: &'static str = "DRUG_EXPOSURE";

    fn schema() -> SchemaRef {
        schema::drug_exposure()
    }

    fn to_record_batch(rows: &[Self]) -> Result<RecordBatch> {
        BatchAssembler::new(Self::schema(), rows.len())
            .column(
                "drug_source_value",
                strings(rows.iter().map(|r| r.drug_source_value.as_deref())),
            )?
            .column(
                "drug_type_concept_id",
                int32s(rows.iter().map(|_| Some(DRUG_TYPE_CONCEPT_ID))),
            )?
            .column(
                "visit_occurrence_id",
                strings(rows.iter().map(|r| Some(r.visit_occurrence_id.as_str()))),
            )?
            .column(
                "person_id",
                strings(rows.iter().map(|r| Some(r.person_id.as_str()))),
            )?
            .column(
                "drug_exposure_start_date",
                dates(rows.iter().map(|r| r.start.map(|dt| dt.date()))),
            )?
            .column(
                "drug_exposure_start_datetime",
                strings(rows.iter().map(|r| time_of_day(r.start))),
            )?
            .column(
                "drug_exposure_end_date",
                dates(rows.iter().map(|r| r.end.map(|dt| dt.date()))),
            )?
            .column(
                "drug_exposure_end_datetime",
                strings(rows.iter().map(|r| time_of_day(r.end))),
            )?
            .column(
                "drug_concept_id",
                int32s(rows.iter().map(|r| r.drug_concept_id)),
            )?
            .column(
                "drug_exposure_id",
                int64s(rows.iter().map(|r| Some(r.drug_exposure_id))),
            )?
            .finish()
    }
}
