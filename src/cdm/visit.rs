//! VISIT_OCCURRENCE: one row per admission.

use std::collections::BTreeMap;

use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;
use chrono::NaiveDateTime;

use super::care_site::CareSiteLookup;
use super::columns::{BatchAssembler, dates, int32s, int64s, strings, timestamps};
use super::time::after_hours;
use super::{BuiltTable, CdmRecord, ResolutionGaps, schema};
use crate::error::Result;
use crate::models::VisitIndex;
use crate::vocabulary::ConceptMapping;
use crate::vocabulary::constants::{VISIT_CONCEPT_ID, VISIT_TYPE_CONCEPT_ID};

/// A VISIT_OCCURRENCE row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisitOccurrenceRecord {
    /// Derived visit id
    pub visit_occurrence_id: String,
    /// Derived person id
    pub person_id: String,
    /// Admission time, the reference datetime
    pub visit_start_datetime: NaiveDateTime,
    /// Admission time plus length of stay
    pub visit_end_datetime: Option<NaiveDateTime>,
    /// Care site of the admission
    pub care_site_id: Option<i64>,
    /// Visit natural key
    pub visit_source_value: String,
    /// Concept of the admission origin
    pub admitted_from_concept_id: Option<i32>,
    /// Free-text admission origin
    pub admitted_from_source_value: Option<String>,
    /// Concept of the discharge destination
    pub discharged_to_concept_id: Option<i32>,
    /// Free-text discharge destination
    pub discharged_to_source_value: Option<String>,
}

/// Lookups that resolve free-text visit attributes to concepts
#[derive(Debug, Clone, Copy)]
pub struct VisitResolver<'a> {
    /// Source-code mapping
    pub mapping: &'a ConceptMapping,
    /// Free-text origin to visit-type key
    pub admission_origins: &'a BTreeMap<String, String>,
    /// Free-text unit type to visit-type key
    pub unit_types: &'a BTreeMap<String, String>,
    /// Care sites built for these admissions
    pub care_sites: &'a CareSiteLookup,
}

impl VisitResolver<'_> {
    /// Concept of an origin or destination label
    ///
    /// The label is first translated to its visit-type key; labels without a
    /// translation are looked up verbatim.
    #[must_use]
    pub fn visit_type_concept(&self, label: Option<&str>) -> Option<i32> {
        let label = label?;
        self.admission_origins
            .get(label)
            .and_then(|key| self.mapping.resolve(key))
            .or_else(|| self.mapping.resolve(label))
    }
}

/// Build the VISIT_OCCURRENCE table in label-table order
pub fn build_visits(
    visits: &VisitIndex,
    reference: NaiveDateTime,
    resolver: VisitResolver<'_>,
) -> BuiltTable<VisitOccurrenceRecord> {
    let mut gaps = ResolutionGaps::default();
    let rows: Vec<_> = visits
        .iter()
        .map(|visit| {
            let label = &visit.label;
            let admitted_from_concept_id = resolver.visit_type_concept(label.origin.as_deref());
            if admitted_from_concept_id.is_none() {
                gaps.origin += 1;
            }
            let discharged_to_concept_id =
                resolver.visit_type_concept(label.discharge_location.as_deref());
            if discharged_to_concept_id.is_none() {
                gaps.destination += 1;
            }
            let visit_end_datetime = after_hours(reference, label.length_of_stay_hours);
            if visit_end_datetime.is_none() {
                gaps.length_of_stay += 1;
            }
            let care_site_id = resolver.care_sites.get(label, resolver.unit_types);
            if care_site_id.is_none() {
                gaps.care_site += 1;
            }

            VisitOccurrenceRecord {
                visit_occurrence_id: visit.visit_occurrence_id.clone(),
                person_id: visit.person_id.clone(),
                visit_start_datetime: reference,
                visit_end_datetime,
                care_site_id,
                visit_source_value: visit.visit_source_value().to_string(),
                admitted_from_concept_id,
                admitted_from_source_value: label.origin.clone(),
                discharged_to_concept_id,
                discharged_to_source_value: label.discharge_location.clone(),
            }
        })
        .collect();

    if gaps.origin + gaps.destination > 0 {
        log::warn!(
            "Unresolved visit types: {} origins, {} destinations",
            gaps.origin,
            gaps.destination
        );
    }
    log::info!("Built {} visit occurrences", rows.len());
    BuiltTable { rows, gaps }
}

impl CdmRecord for VisitOccurrenceRecord {
    const TABLE: &'static str = "VISIT_OCCURRENCE";

    fn schema() -> SchemaRef {
        schema::visit_occurrence()
    }

    fn to_record_batch(rows: &[Self]) -> Result<RecordBatch> {
        BatchAssembler::new(Self::schema(), rows.len())
            .column(
                "visit_occurrence_id",
                strings(rows.iter().map(|r| Some(r.visit_occurrence_id.as_str()))),
            )?
            .column(
                "person_id",
                strings(rows.iter().map(|r| Some(r.person_id.as_str()))),
            )?
            .column(
                "visit_concept_id",
                int32s(rows.iter().map(|_| Some(VISIT_CONCEPT_ID))),
            )?
            .column(
                "visit_start_date",
                dates(rows.iter().map(|r| Some(r.visit_start_datetime.date()))),
            )?
            .column(
                "visit_start_datetime",
                timestamps(rows.iter().map(|r| Some(r.visit_start_datetime))),
            )?
            .column(
                "visit_end_date",
                dates(rows.iter().map(|r| r.visit_end_datetime.map(|dt| dt.date()))),
            )?
            .column(
                "visit_end_datetime",
                timestamps(rows.iter().map(|r| r.visit_end_datetime)),
            )?
            .column(
                "visit_type_concept_id",
                int32s(rows.iter().map(|_| Some(VISIT_TYPE_CONCEPT_ID))),
            )?
            .column("care_site_id", int64s(rows.iter().map(|r| r.care_site_id)))?
            .column(
                "visit_source_value",
                strings(rows.iter().map(|r| Some(r.visit_source_value.as_str()))),
            )?
            .column(
                "admitted_from_concept_id",
                int32s(rows.iter().map(|r| r.admitted_from_concept_id)),
            )?
            .column(
                "admitted_from_source_value",
                strings(rows.iter().map(|r| r.admitted_from_source_value.as_deref())),
            )?
            .column(
                "discharged_to_concept_id",
                int32s(rows.iter().map(|r| r.discharged_to_concept_id)),
            )?
            .column(
                "discharged_to_source_value",
                strings(rows.iter().map(|r| r.discharged_to_source_value.as_deref())),
            )?
            .finish()
    }
}
