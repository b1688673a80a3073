//! OBSERVATION: admission covariates (age, weight, height) as labelled bins.
//!
//! Every admission gets one row per covariate, all at the same synthetic admission
//! time. Rows are grouped by covariate in the order of [`covariates`].

use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;
use chrono::NaiveDateTime;

use super::columns::{BatchAssembler, dates, float64s, int32s, int64s, strings, times};
use super::{BuiltTable, CdmRecord, ResolutionGaps, schema};
use crate::error::Result;
use crate::identifiers::IdRange;
use crate::models::VisitIndex;
use crate::vocabulary::ConceptRegistry;
use crate::vocabulary::constants::OBSERVATION_TYPE_CONCEPT_ID;

/// Right-closed bins `(lo, hi]` over consecutive breaks
///
/// The lowest break itself falls into the first bin.
#[derive(Debug, Clone, PartialEq)]
pub struct Bins {
    breaks: Vec<f64>,
    float_labels: bool,
}

impl Bins {
    /// Breaks `start, start + step, …` up to and including `last`, optionally
    /// extended by open-ended outer bins
    #[must_use]
    pub fn stepped(start: u32, last: u32, step: u32, open_ended: bool) -> Self {
        let inner = (start..=last).step_by(step as usize).map(f64::from);
        let breaks = if open_ended {
            std::iter::once(f64::NEG_INFINITY)
                .chain(inner)
                .chain(std::iter::once(f64::INFINITY))
                .collect()
        } else {
            inner.collect()
        };
        Self {
            breaks,
            float_labels: open_ended,
        }
    }

    /// Label of the bin containing `value`, or `None` outside every bin
    #[must_use]
    pub fn label(&self, value: f64) -> Option<String> {
        if value.is_nan() {
            return None;
        }
        let first = *self.breaks.first()?;
        let idx = if value == first {
            0
        } else {
            self.breaks
                .windows(2)
                .position(|w| w[0] < value && value <= w[1])?
        };
        Some(format!(
            "{}-{}",
            self.format_break(self.breaks[idx]),
            self.format_break(self.breaks[idx + 1])
        ))
    }

    fn format_break(&self, value: f64) -> String {
        if value.is_infinite() {
            if value > 0.0 { "inf" } else { "-inf" }.to_string()
        } else if self.float_labels {
            format!("{value:.1}")
        } else {
            format!("{value}")
        }
    }
}

/// A label-table covariate exported as an observation
#[derive(Debug, Clone, PartialEq)]
pub struct Covariate {
    /// Label-table column
    pub column: &'static str,
    /// Observation concept
    pub concept_id: i32,
    /// Unit concept
    pub unit_concept_id: i32,
    /// Bins the value is assigned to
    pub bins: Bins,
}

/// Age (years), weight (kg) and height (cm)
#[must_use]
pub fn covariates() -> Vec<Covariate> {
    vec![
        Covariate {
            column: "raw_age",
            concept_id: 44804452,
            unit_concept_id: 9448,
            bins: Bins::stepped(0, 95, 5, false),
        },
        Covariate {
            column: "raw_weight",
            concept_id: 3711521,
            unit_concept_id: 9529,
            bins: Bins::stepped(30, 145, 5, true),
        },
        Covariate {
            column: "raw_height",
            concept_id: 607590,
            unit_concept_id: 8582,
            bins: Bins::stepped(120, 205, 5, true),
        },
    ]
}

/// An OBSERVATION row
#[derive(Debug, Clone, PartialEq)]
pub struct ObservationRecord {
    /// Observation id (from 3,000,000)
    pub observation_id: i64,
    /// Derived person id
    pub person_id: String,
    /// Covariate concept
    pub observation_concept_id: i32,
    /// Admission time
    pub observation_datetime: NaiveDateTime,
    /// Bin label
    pub value_as_string: Option<String>,
    /// Unit concept
    pub unit_concept_id: i32,
    /// Derived visit id
    pub visit_occurrence_id: String,
    /// Unit name
    pub unit_source_value: Option<String>,
    /// Raw covariate value
    pub value_source_value: Option<f64>,
}

/// Fail unless `visits * covariates` rows get ids inside the observation range
fn check_id_capacity(visits: usize, covariates: usize) -> Result<()> {
    let rows = visits.saturating_mul(covariates);
    if rows > 0 {
        IdRange::Observation.checked_id_at(rows - 1)?;
    }
    Ok(())
}

/// Build the OBSERVATION table
///
/// Missing or out-of-range values keep their row with a null label.
///
/// # Errors
/// Fails when the rows would not fit in the observation id range.
pub fn build_observations(
    visits: &VisitIndex,
    registry: &ConceptRegistry,
    admission_datetime: NaiveDateTime,
) -> Result<BuiltTable<ObservationRecord>> {
    let covariates = covariates();
    check_id_capacity(visits.len(), covariates.len())?;

    let mut gaps = ResolutionGaps::default();
    let mut rows = Vec::with_capacity(visits.len() * 3);

    for covariate in covariates {
        let unit_source_value = registry
            .get(covariate.unit_concept_id)
            .map(|c| c.concept_name.clone());
        for visit in visits.iter() {
            let value = visit.label.covariate(covariate.column);
            let value_as_string = value.and_then(|v| covariate.bins.label(v));
            if value_as_string.is_none() {
                gaps.observation_bin += 1;
            }
            rows.push(ObservationRecord {
                observation_id: IdRange::Observation.id_at(rows.len()),
                person_id: visit.person_id.clone(),
                observation_concept_id: covariate.concept_id,
                observation_datetime: admission_datetime,
                value_as_string,
                unit_concept_id: covariate.unit_concept_id,
                visit_occurrence_id: visit.visit_occurrence_id.clone(),
                unit_source_value: unit_source_value.clone(),
                value_source_value: value,
            });
        }
    }

    if gaps.observation_bin > 0 {
        log::warn!(
            "{} covariate values are missing or outside every bin",
            gaps.observation_bin
        );
    }
    log::info!("Built {} observations", rows.len());
    Ok(BuiltTable { rows, gaps })
}

impl CdmRecord for ObservationRecord {
    const TABLE: &'static str = "OBSERVATION";

    fn schema() -> SchemaRef {
        schema::observation()
    }

    fn to_record_batch(rows: &[Self]) -> Result<RecordBatch> {
        BatchAssembler::new(Self::schema(), rows.len())
            .column(
                "observation_id",
                int64s(rows.iter().map(|r| Some(r.observation_id))),
            )?
            .column(
                "person_id",
                strings(rows.iter().map(|r| Some(r.person_id.as_str()))),
            )?
            .column(
                "observation_concept_id",
                int32s(rows.iter().map(|r| Some(r.observation_concept_id))),
            )?
            .column(
                "observation_date",
                dates(rows.iter().map(|r| Some(r.observation_datetime.date()))),
            )?
            .column(
                "observation_datetime",
                times(rows.iter().map(|r| Some(r.observation_datetime.time()))),
            )?
            .column(
                "observation_type_concept_id",
                int32s(rows.iter().map(|_| Some(OBSERVATION_TYPE_CONCEPT_ID))),
            )?
            .column(
                "value_as_string",
                strings(rows.iter().map(|r| r.value_as_string.as_deref())),
            )?
            .column(
                "unit_concept_id",
                int32s(rows.iter().map(|r| Some(r.unit_concept_id))),
            )?
            .column(
                "visit_occurrence_id",
                strings(rows.iter().map(|r| Some(r.visit_occurrence_id.as_str()))),
            )?
            .column(
                "unit_source_value",
                strings(rows.iter().map(|r| r.unit_source_value.as_deref())),
            )?
            .column(
                "value_source_value",
                float64s(rows.iter().map(|r| r.value_source_value)),
            )?
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::visit_index::tests::label;
    use crate::models::{LabelRecord, LabelTable};
    use crate::vocabulary::RequiredConcepts;
    use crate::vocabulary::registry::tests::full_vocabulary;
    use chrono::NaiveDate;
    use std::collections::BTreeMap;

    #[test]
    fn test_bin_labels() {
        let bins: Vec<_> = covariates().into_iter().map(|c| c.bins).collect();
        let (age, weight, height) = (&bins[0], &bins[1], &bins[2]);
        assert_eq!(age.label(42.0).as_deref(), Some("40-45"));
        assert_eq!(age.label(45.0).as_deref(), Some("40-45"));
        assert_eq!(age.label(0.0).as_deref(), Some("0-5"));
        assert_eq!(age.label(95.0).as_deref(), Some("90-95"));
        assert_eq!(age.label(97.0), None);
        assert_eq!(age.label(-1.0), None);

        assert_eq!(weight.label(80.0).as_deref(), Some("75.0-80.0"));
        assert_eq!(weight.label(12.0).as_deref(), Some("-inf-30.0"));
        assert_eq!(weight.label(300.0).as_deref(), Some("145.0-inf"));
        assert_eq!(height.label(170.0).as_deref(), Some("165.0-170.0"));
        assert_eq!(height.label(f64::NAN), None);
    }

    #[test]
    fn test_cohort_must_fit_observation_ids() {
        assert!(check_id_capacity(0, 3).is_ok());
        assert!(check_id_capacity(333_333, 3).is_ok());
        assert!(check_id_capacity(333_334, 3).is_err());
    }

    #[test]
    fn test_three_rows_per_visit() {
        let visits = VisitIndex::build(LabelTable::new(vec![
            LabelRecord {
                raw_age: Some(42.0),
                raw_weight: Some(80.0),
                raw_height: Some(170.0),
                ..label("A", "p1")
            },
            LabelRecord {
                raw_age: Some(70.0),
                ..label("B", "p2")
            },
        ]))
        .unwrap();
        let required = RequiredConcepts::for_pipeline(&BTreeMap::new(), &[]);
        let registry = ConceptRegistry::load(full_vocabulary(), &required).unwrap();
        let admission = NaiveDate::from_ymd_opt(2023, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();

        let table = build_observations(&visits, &registry, admission).unwrap();
        assert_eq!(table.len(), 6);
        assert_eq!(table.rows[0].observation_id, 3_000_000);
        assert_eq!(table.rows[5].observation_id, 3_000_005);

        let visit_a = &visits.get("A").unwrap().visit_occurrence_id;
        let labels: Vec<_> = table
            .rows
            .iter()
            .filter(|r| &r.visit_occurrence_id == visit_a)
            .map(|r| r.value_as_string.as_deref())
            .collect();
        assert_eq!(
            labels,
            vec![Some("40-45"), Some("75.0-80.0"), Some("165.0-170.0")]
        );
        assert_eq!(table.rows[1].unit_source_value.as_deref(), Some("year"));
        assert_eq!(table.gaps.observation_bin, 2);
        assert!(table.rows.iter().all(|r| r.observation_datetime == admission));
    }
}
