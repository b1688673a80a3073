//! PERSON: one row per patient.

use std::collections::BTreeMap;

use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;
use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime};
use rustc_hash::FxHashSet;

use super::columns::{BatchAssembler, int32s, int64s, strings, timestamps};
use super::location::LocationLookup;
use super::{BuiltTable, CdmRecord, ResolutionGaps, schema};
use crate::error::Result;
use crate::models::VisitIndex;
use crate::vocabulary::constants::{FEMALE_CONCEPT_ID, MALE_CONCEPT_ID};

/// A PERSON row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonRecord {
    /// Derived person id
    pub person_id: String,
    /// 8507 (male), 8532 (female) or unknown
    pub gender_concept_id: Option<i32>,
    /// Reference year minus age at admission
    pub year_of_birth: Option<i32>,
    /// January 1st of the year of birth
    pub birth_datetime: Option<NaiveDateTime>,
    /// Location of the source database's country
    pub location_id: Option<i64>,
    /// Patient natural key
    pub person_source_value: String,
    /// Raw sex code
    pub gender_source_value: Option<String>,
}

/// Gender concept of a sex code
#[must_use]
pub fn gender_concept(sex: Option<f64>) -> Option<i32> {
    match sex {
        Some(s) if s == 1.0 => Some(MALE_CONCEPT_ID),
        Some(s) if s == 0.0 => Some(FEMALE_CONCEPT_ID),
        _ => None,
    }
}

/// Year of birth from the age at admission, truncated toward zero
#[must_use]
pub fn year_of_birth(reference_year: i32, age: Option<f64>) -> Option<i32> {
    let year = (f64::from(reference_year) - age.filter(|a| a.is_finite())?).trunc();
    // chrono's supported year range
    (f64::from(NaiveDate::MIN.year())..=f64::from(NaiveDate::MAX.year()))
        .contains(&year)
        .then_some(year as i32)
}

/// Build the PERSON table
///
/// Patients are deduplicated by natural key; the first admission in label-table order
/// provides the person's attributes.
pub fn build_persons(
    visits: &VisitIndex,
    reference_date: NaiveDate,
    dataset_countries: &BTreeMap<String, String>,
    locations: &LocationLookup,
) -> BuiltTable<PersonRecord> {
    let mut gaps = ResolutionGaps::default();
    let mut seen = FxHashSet::default();
    let mut rows = Vec::new();

    for visit in visits.iter() {
        let label = &visit.label;
        if !seen.insert(label.patient_key.as_str()) {
            continue;
        }

        let gender_concept_id = gender_concept(label.sex);
        if gender_concept_id.is_none() {
            gaps.gender += 1;
        }
        let location_id = label
            .source_dataset
            .as_deref()
            .and_then(|dataset| dataset_countries.get(dataset))
            .and_then(|country| locations.get(country));
        if location_id.is_none() {
            gaps.person_location += 1;
        }
        let year = year_of_birth(reference_date.year(), label.raw_age);

        rows.push(PersonRecord {
            person_id: visit.person_id.clone(),
            gender_concept_id,
            year_of_birth: year,
            birth_datetime: year
                .and_then(|y| NaiveDate::from_ymd_opt(y, 1, 1))
                .map(|d| d.and_time(NaiveTime::MIN)),
            location_id,
            person_source_value: label.patient_key.clone(),
            gender_source_value: label.sex.map(|s| s.to_string()),
        });
    }

    log::info!("Built {} persons", rows.len());
    BuiltTable { rows, gaps }
}

impl CdmRecord for PersonRecord {
    const TABLE: &'static str = "PERSON";

    fn schema() -> SchemaRef {
        schema::person()
    }

    fn to_record_batch(rows: &[Self]) -> Result<RecordBatch> {
        BatchAssembler::new(Self::schema(), rows.len())
            .column(
                "person_id",
                strings(rows.iter().map(|r| Some(r.person_id.as_str()))),
            )?
            .column(
                "gender_concept_id",
                int32s(rows.iter().map(|r| r.gender_concept_id)),
            )?
            .column("year_of_birth", int32s(rows.iter().map(|r| r.year_of_birth)))?
            .column(
                "birth_datetime",
                timestamps(rows.iter().map(|r| r.birth_datetime)),
            )?
            .column("location_id", int64s(rows.iter().map(|r| r.location_id)))?
            .column(
                "person_source_value",
                strings(rows.iter().map(|r| Some(r.person_source_value.as_str()))),
            )?
            .column(
                "gender_source_value",
                strings(rows.iter().map(|r| r.gender_source_value.as_deref())),
            )?
            .finish()
    }
}
