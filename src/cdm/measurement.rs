//! MEASUREMENT: time-series values and admission anthropometrics, one chunk at a time.
//!
//! A chunk is the set of wide time-series batches read from one group of input files
//! (`patient`, `time`, one column per variable). Its rows get ids from the chunk's own
//! block, so chunks are independent of each other.

use std::collections::BTreeSet;

use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;
use chrono::NaiveDateTime;
use rustc_hash::FxHashSet;

use super::columns::{
    BatchAssembler, date64s, dates, float32s, int32s, int64s, strings, times,
};
use super::time::offset_datetime;
use super::{BuiltTable, CdmRecord, ResolutionGaps, schema};
use crate::error::Result;
use crate::identifiers::StridedIdAllocator;
use crate::models::{IndexedVisit, VisitIndex};
use crate::models::labels::VISIT_KEY_COLUMN;
use crate::utils::arrow::{f64_column, string_column};
use crate::utils::logging::log_skip;
use crate::vocabulary::{ConceptMapping, ConceptRegistry};

/// Column holding the offset from admission in seconds
pub const TIME_COLUMN: &str = "time";

/// A MEASUREMENT row
#[derive(Debug, Clone, PartialEq)]
pub struct MeasurementRecord {
    /// Measurement id from the chunk's block
    pub measurement_id: i64,
    /// Measured value
    pub value: f64,
    /// Offset from admission in seconds
    pub time: f64,
    /// Derived visit id
    pub visit_occurrence_id: String,
    /// Derived person id
    pub person_id: String,
    /// Visit natural key
    pub visit_source_value: String,
    /// Admission time of the visit
    pub visit_start_datetime: NaiveDateTime,
    /// Reference datetime plus `time`
    pub measurement_datetime: Option<NaiveDateTime>,
    /// Concept of the variable
    pub measurement_concept_id: Option<i32>,
    /// Unit code
    pub unit_source_value: Option<String>,
    /// Unit concept
    pub unit_concept_id: Option<i32>,
}

/// Shared inputs of every measurement chunk
#[derive(Debug, Clone, Copy)]
pub struct MeasurementContext<'a> {
    /// Admissions with their ids
    pub visits: &'a VisitIndex,
    /// Units of the variables
    pub registry: &'a ConceptRegistry,
    /// Concepts of the variables
    pub mapping: &'a ConceptMapping,
    /// Synthetic admission datetime
    pub reference: NaiveDateTime,
    /// Offset of the admission covariates in seconds
    pub admission_offset_seconds: f64,
    /// Wide time-series columns to export
    pub timeseries_variables: &'a [String],
    /// Label-table covariates to export
    pub admission_variables: &'a [String],
}

/// Output of one measurement chunk
#[derive(Debug, Clone, PartialEq)]
pub struct MeasurementChunk {
    /// Chunk index
    pub chunk: usize,
    /// Rows and gaps
    pub table: BuiltTable<MeasurementRecord>,
    /// Variables absent from every batch of the chunk
    pub skipped_variables: Vec<String>,
}

struct PendingRow<'v> {
    visit: &'v IndexedVisit,
    value: f64,
    time: f64,
    variable: &'v str,
}

/// Build the measurements of one chunk
///
/// Admission covariates are emitted first, for the visits that appear in the chunk,
/// then each time-series variable in configured order. Time-series rows whose visit key
/// is not in the label table are dropped.
pub fn build_measurements(
    batches: &[RecordBatch],
    chunk: usize,
    ids: &StridedIdAllocator,
    ctx: &MeasurementContext<'_>,
) -> Result<MeasurementChunk> {
    let mut gaps = ResolutionGaps::default();
    let mut pending: Vec<PendingRow<'_>> = Vec::new();

    let mut keys = Vec::with_capacity(batches.len());
    let mut offsets = Vec::with_capacity(batches.len());
    for batch in batches {
        keys.push(string_column(batch, VISIT_KEY_COLUMN)?);
        offsets.push(f64_column(batch, TIME_COLUMN, true)?.unwrap_or_default());
    }

    let chunk_visits: FxHashSet<&str> = keys
        .iter()
        .flatten()
        .filter_map(|key| key.as_deref())
        .collect();
    for variable in ctx.admission_variables {
        for visit in ctx
            .visits
            .iter()
            .filter(|v| chunk_visits.contains(v.label.visit_key.as_str()))
        {
            if let Some(value) = visit.label.covariate(variable) {
                pending.push(PendingRow {
                    visit,
                    value,
                    time: ctx.admission_offset_seconds,
                    variable,
                });
            }
        }
    }

    let mut skipped_variables = Vec::new();
    for variable in ctx.timeseries_variables {
        let mut present = false;
        for (batch_idx, batch) in batches.iter().enumerate() {
            let Some(values) = f64_column(batch, variable, false)? else {
                continue;
            };
            present = true;
            for (row, value) in values.into_iter().enumerate() {
                let Some(value) = value else {
                    continue;
                };
                let Some(visit) = keys[batch_idx][row]
                    .as_deref()
                    .and_then(|key| ctx.visits.get(key))
                else {
                    gaps.join_misses += 1;
                    continue;
                };
                let Some(time) = offsets[batch_idx][row] else {
                    gaps.missing_time += 1;
                    continue;
                };
                pending.push(PendingRow {
                    visit,
                    value,
                    time,
                    variable,
                });
            }
        }
        if !present {
            log_skip("MEASUREMENT", Some(chunk), &format!("variable '{variable}' not found"));
            skipped_variables.push(variable.clone());
        }
    }
    gaps.skipped_variables = skipped_variables.len();

    let mut unresolved = BTreeSet::new();
    let rows: Vec<_> = ids
        .ids(chunk, pending.len())?
        .zip(pending)
        .map(|(measurement_id, p)| {
            let measurement_concept_id = ctx.mapping.resolve(p.variable);
            let unit = ctx.registry.unit(p.variable);
            if measurement_concept_id.is_none() {
                gaps.measurement_concept += 1;
                unresolved.insert(p.variable);
            }
            if unit.is_none() {
                gaps.unit += 1;
            }
            MeasurementRecord {
                measurement_id,
                value: p.value,
                time: p.time,
                visit_occurrence_id: p.visit.visit_occurrence_id.clone(),
                person_id: p.visit.person_id.clone(),
                visit_source_value: p.visit.visit_source_value().to_string(),
                visit_start_datetime: ctx.reference,
                measurement_datetime: offset_datetime(ctx.reference, Some(p.time)),
                measurement_concept_id,
                unit_source_value: unit.map(|u| u.source_value.clone()),
                unit_concept_id: unit.map(|u| u.concept_id),
            }
        })
        .collect();

    if !unresolved.is_empty() {
        log_skip(
            "MEASUREMENT",
            Some(chunk),
            &format!("no concept for variables {unresolved:?}"),
        );
    }
    if gaps.join_misses > 0 {
        log_skip(
            "MEASUREMENT",
            Some(chunk),
            &format!("{} values without a known visit dropped", gaps.join_misses),
        );
    }

    Ok(MeasurementChunk {
        chunk,
        table: BuiltTable { rows, gaps },
        skipped_variables,
    })
}

impl CdmRecord for MeasurementRecord {
    const TABLE: &'static str = "MEASUREMENT";

    fn schema() -> SchemaRef {
        schema::measurement()
    }

    fn to_record_batch(rows: &[Self]) -> Result<RecordBatch> {
        BatchAssembler::new(Self::schema(), rows.len())
            .column("value_as_number", float32s(rows.iter().map(|r| Some(r.value))))?
            .column("time", float32s(rows.iter().map(|r| Some(r.time))))?
            .column(
                "visit_occurrence_id",
                strings(rows.iter().map(|r| Some(r.visit_occurrence_id.as_str()))),
            )?
            .column(
                "visit_start_date",
                dates(rows.iter().map(|r| Some(r.visit_start_datetime.date()))),
            )?
            .column(
                "visit_source_value",
                strings(rows.iter().map(|r| Some(r.visit_source_value.as_str()))),
            )?
            .column(
                "person_id",
                strings(rows.iter().map(|r| Some(r.person_id.as_str()))),
            )?
            .column(
                "measurement_datetime",
                date64s(rows.iter().map(|r| r.measurement_datetime)),
            )?
            .column(
                "measurement_date",
                dates(rows.iter().map(|r| r.measurement_datetime.map(|dt| dt.date()))),
            )?
            .column(
                "measurement_time",
                times(rows.iter().map(|r| r.measurement_datetime.map(|dt| dt.time()))),
            )?
            .column(
                "measurement_concept_id",
                int32s(rows.iter().map(|r| r.measurement_concept_id)),
            )?
            .column(
                "measurement_source_value",
                float32s(rows.iter().map(|r| Some(r.value))),
            )?
            .column(
                "unit_source_value",
                strings(rows.iter().map(|r| r.unit_source_value.as_deref())),
            )?
            .column("unit_concept_id", int32s(rows.iter().map(|r| r.unit_concept_id)))?
            .column(
                "measurement_id",
                int64s(rows.iter().map(|r| Some(r.measurement_id))),
            )?
            .column(
                "value_source_value",
                float32s(rows.iter().map(|r| Some(r.value))),
            )?
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identifiers::IdRange;
    use crate::models::visit_index::tests::label;
    use crate::models::{LabelRecord, LabelTable};
    use crate::vocabulary::registry::tests::full_vocabulary;
    use crate::vocabulary::{MappingSource, RequiredConcepts};
    use arrow::array::{Float64Array, Int64Array};
    use arrow::datatypes::{DataType, Field, Schema};
    use chrono::{NaiveDate, TimeDelta};
    use std::collections::BTreeMap;
    use std::sync::Arc;

    fn timeseries(patients: Vec<i64>, times: Vec<f64>, heart_rate: Vec<Option<f64>>) -> RecordBatch {
        let schema = Schema::new(vec![
            Field::new("patient", DataType::Int64, false),
            Field::new("time", DataType::Float64, false),
            Field::new("heart_rate", DataType::Float64, true),
        ]);
        RecordBatch::try_new(
            Arc::new(schema),
            vec![
                Arc::new(Int64Array::from(patients)),
                Arc::new(Float64Array::from(times)),
                Arc::new(Float64Array::from(heart_rate)),
            ],
        )
        .unwrap()
    }

    struct Fixture {
        visits: VisitIndex,
        registry: ConceptRegistry,
        mapping: ConceptMapping,
        timeseries_variables: Vec<String>,
        admission_variables: Vec<String>,
        reference: NaiveDateTime,
    }

    impl Fixture {
        fn new() -> Self {
            let visits = VisitIndex::build(LabelTable::new(vec![
                LabelRecord {
                    raw_height: Some(170.0),
                    raw_weight: None,
                    ..label("1001", "p1")
                },
                LabelRecord {
                    raw_height: Some(180.0),
                    raw_weight: Some(90.0),
                    ..label("1002", "p2")
                },
            ]))
            .unwrap();
            let required = RequiredConcepts::for_pipeline(&BTreeMap::new(), &[]);
            let registry = ConceptRegistry::load(full_vocabulary(), &required).unwrap();
            let mut mapping = ConceptMapping::default();
            mapping
                .insert("heart_rate", 3027018, MappingSource::Variable)
                .unwrap();
            mapping
                .insert("raw_height", 607590, MappingSource::ObservationVariable)
                .unwrap();
            mapping
                .insert("raw_weight", 4099154, MappingSource::ObservationVariable)
                .unwrap();
            Self {
                visits,
                registry,
                mapping,
                timeseries_variables: vec!["heart_rate".to_string(), "lactate".to_string()],
                admission_variables: vec!["raw_height".to_string(), "raw_weight".to_string()],
                reference: NaiveDate::from_ymd_opt(2023, 1, 1)
                    .unwrap()
                    .and_hms_opt(0, 0, 0)
                    .unwrap(),
            }
        }

        fn context(&self) -> MeasurementContext<'_> {
            MeasurementContext {
                visits: &self.visits,
                registry: &self.registry,
                mapping: &self.mapping,
                reference: self.reference,
                admission_offset_seconds: 0.0,
                timeseries_variables: &self.timeseries_variables,
                admission_variables: &self.admission_variables,
            }
        }
    }

    #[test]
    fn test_chunk_rows() {
        let fixture = Fixture::new();
        let batch = timeseries(
            vec![1001, 1001, 9999],
            vec![3600.0, 7200.0, 60.0],
            vec![Some(80.0), None, Some(70.0)],
        );
        let ids = StridedIdAllocator::new(
            IdRange::Measurement.start(),
            IdRange::Measurement.start(),
        );

        let out = build_measurements(&[batch], 2, &ids, &fixture.context()).unwrap();
        let rows = &out.table.rows;
        // raw_height of 1001, then one heart rate value; 1002 is not in the chunk
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].measurement_concept_id, Some(607590));
        assert_eq!(rows[0].value, 170.0);
        assert_eq!(rows[0].unit_source_value.as_deref(), Some("cm"));
        assert_eq!(rows[1].measurement_concept_id, Some(3027018));
        assert_eq!(
            rows[1].measurement_datetime,
            Some(fixture.reference + TimeDelta::hours(1))
        );
        assert_eq!(rows[1].unit_concept_id, Some(8541));
        assert_eq!(rows[0].measurement_id, 15_000_000_000);
        assert_eq!(rows[1].measurement_id, 15_000_000_001);

        assert_eq!(out.table.gaps.join_misses, 1);
        assert_eq!(out.skipped_variables, vec!["lactate".to_string()]);
        assert_eq!(out.table.gaps.skipped_variables, 1);

        let batch = out.table.to_record_batch().unwrap();
        assert_eq!(batch.num_columns(), 26);
    }

    #[test]
    fn test_ids_unique_across_chunks() {
        let fixture = Fixture::new();
        let ids = StridedIdAllocator::new(
            IdRange::Measurement.start(),
            IdRange::Measurement.start(),
        );
        let first = build_measurements(
            &[timeseries(vec![1001], vec![0.0], vec![Some(1.0)])],
            0,
            &ids,
            &fixture.context(),
        )
        .unwrap();
        let second = build_measurements(
            &[timeseries(vec![1002, 1002], vec![0.0, 1.0], vec![Some(1.0), Some(2.0)])],
            1,
            &ids,
            &fixture.context(),
        )
        .unwrap();
        let all: FxHashSet<i64> = first
            .table
            .rows
            .iter()
            .chain(&second.table.rows)
            .map(|r| r.measurement_id)
            .collect();
        assert_eq!(all.len(), first.table.len() + second.table.len());
        assert_eq!(first.table.rows[0].measurement_id, 5_000_000_000);
    }

    #[test]
    fn test_values_without_time_are_counted() {
        let fixture = Fixture::new();
        let schema = Schema::new(vec![
            Field::new("patient", DataType::Int64, false),
            Field::new("time", DataType::Float64, true),
            Field::new("heart_rate", DataType::Float64, true),
        ]);
        let batch = RecordBatch::try_new(
            Arc::new(schema),
            vec![
                Arc::new(Int64Array::from(vec![1001, 1001, 1001])),
                Arc::new(Float64Array::from(vec![Some(0.0), None, None])),
                Arc::new(Float64Array::from(vec![Some(80.0), Some(81.0), None])),
            ],
        )
        .unwrap();
        let ids = StridedIdAllocator::new(
            IdRange::Measurement.start(),
            IdRange::Measurement.start(),
        );

        let out = build_measurements(&[batch], 0, &ids, &fixture.context()).unwrap();
        let heart_rates = out
            .table
            .rows
            .iter()
            .filter(|r| r.measurement_concept_id == Some(3027018))
            .count();
        assert_eq!(heart_rates, 1);
        assert_eq!(out.table.gaps.missing_time, 1);
        assert_eq!(out.table.gaps.join_misses, 0);
    }
}
