//! Column lists and types of the exported CDM tables.
//!
//! Column order is part of the output contract. Surrogate keys are non-nullable; every
//! other column may be null.

use std::sync::Arc;

use arrow::datatypes::{DataType, Field, Schema, SchemaRef, TimeUnit};

fn key(name: &str, data_type: DataType) -> Field {
    Field::new(name, data_type, false)
}

fn col(name: &str, data_type: DataType) -> Field {
    Field::new(name, data_type, true)
}

fn timestamp() -> DataType {
    DataType::Timestamp(TimeUnit::Second, None)
}

fn time_of_day() -> DataType {
    DataType::Time32(TimeUnit::Second)
}

/// PERSON
#[must_use]
pub fn person() -> SchemaRef {
    Arc::new(Schema::new(vec![
        key("person_id", DataType::Utf8),
        col("gender_concept_id", DataType::Int32),
        col("year_of_birth", DataType::Int32),
        col("month_of_birth", DataType::Int32),
        col("day_of_birth", DataType::Int32),
        col("birth_datetime", timestamp()),
        col("race_concept_id", DataType::Int32),
        col("ethnicity_concept_id", DataType::Int32),
        col("location_id", DataType::Int64),
        col("provider_id", DataType::Int32),
        col("care_site_id", DataType::Int64),
        col("person_source_value", DataType::Utf8),
        col("gender_source_value", DataType::Utf8),
        col("gender_source_concept_id", DataType::Int32),
        col("race_source_value", DataType::Utf8),
        col("race_source_concept_id", DataType::Int32),
        col("ethnicity_source_value", DataType::Utf8),
        col("ethnicity_source_concept_id", DataType::Int32),
    ]))
}

/// VISIT_OCCURRENCE
#[must_use]
pub fn visit_occurrence() -> SchemaRef {
    Arc::new(Schema::new(vec![
        key("visit_occurrence_id", DataType::Utf8),
        col("person_id", DataType::Utf8),
        col("visit_concept_id", DataType::Int32),
        col("visit_start_date", DataType::Date32),
        col("visit_start_datetime", timestamp()),
        col("visit_end_date", DataType::Date32),
        col("visit_end_datetime", timestamp()),
        col("visit_type_concept_id", DataType::Int32),
        col("provider_id", DataType::Int32),
        col("care_site_id", DataType::Int64),
        col("visit_source_value", DataType::Utf8),
        col("visit_source_concept_id", DataType::Int32),
        col("admitted_from_concept_id", DataType::Int32),
        col("admitted_from_source_value", DataType::Utf8),
        col("discharged_to_concept_id", DataType::Int32),
        col("discharged_to_source_value", DataType::Utf8),
        col("preceding_visit_occurrence_id", DataType::Utf8),
    ]))
}

/// DEATH
#[must_use]
pub fn death() -> SchemaRef {
    Arc::new(Schema::new(vec![
        key("person_id", DataType::Utf8),
        col("death_date", DataType::Date32),
        col("death_datetime", timestamp()),
        col("death_type_concept_id", DataType::Int32),
        col("cause_concept_id", DataType::Int32),
        col("cause_source_value", DataType::Utf8),
        col("cause_source_concept_id", DataType::Int32),
    ]))
}

/// CARE_SITE
#[must_use]
pub fn care_site() -> SchemaRef {
    Arc::new(Schema::new(vec![
        key("care_site_id", DataType::Int64),
        col("care_site_name", DataType::Utf8),
        col("place_of_service_concept_id", DataType::Int32),
        col("location_id", DataType::Int64),
        col("care_site_source_value", DataType::Utf8),
        col("place_of_service_source_value", DataType::Utf8),
    ]))
}

/// LOCATION
#[must_use]
pub fn location() -> SchemaRef {
    Arc::new(Schema::new(vec![
        key("location_id", DataType::Int64),
        col("address_1", DataType::Utf8),
        col("address_2", DataType::Utf8),
        col("city", DataType::Utf8),
        col("state", DataType::Utf8),
        col("zip", DataType::Utf8),
        col("county", DataType::Utf8),
        col("location_source_value", DataType::Utf8),
        col("country_concept_id", DataType::Int32),
        col("country_source_value", DataType::Utf8),
        col("latitude", DataType::Float64),
        col("longitude", DataType::Float64),
    ]))
}

/// DOMAIN
#[must_use]
pub fn domain() -> SchemaRef {
    Arc::new(Schema::new(vec![
        key("domain_id", DataType::Int64),
        col("domain_name", DataType::Utf8),
        col("domain_concept_id", DataType::Int32),
    ]))
}

/// CONCEPT
#[must_use]
pub fn concept() -> SchemaRef {
    Arc::new(Schema::new(vec![
        key("concept_id", DataType::Int32),
        col("concept_name", DataType::Utf8),
        col("domain_id", DataType::Utf8),
        col("vocabulary_id", DataType::Utf8),
        col("concept_class_id", DataType::Utf8),
        col("standard_concept", DataType::Utf8),
        col("concept_code", DataType::Utf8),
        col("valid_start_date", DataType::Date32),
        col("valid_end_date", DataType::Date32),
        col("invalid_reason", DataType::Utf8),
    ]))
}

/// SOURCE_TO_CONCEPT_MAP
#[must_use]
pub fn source_to_concept_map() -> SchemaRef {
    Arc::new(Schema::new(vec![
        key("source_code", DataType::Utf8),
        col("source_concept_id", DataType::Int32),
        col("source_vocabulary_id", DataType::Utf8),
        col("source_code_description", DataType::Utf8),
        col("target_concept_id", DataType::Int32),
        col("target_vocabulary_id", DataType::Utf8),
        col("valid_start_date", DataType::Date32),
        col("valid_end_date", DataType::Date32),
        col("invalid_reason", DataType::Utf8),
    ]))
}

/// OBSERVATION
#[must_use]
pub fn observation() -> SchemaRef {
    Arc::new(Schema::new(vec![
        key("observation_id", DataType::Int64),
        col("person_id", DataType::Utf8),
        col("observation_concept_id", DataType::Int32),
        col("observation_date", DataType::Date32),
        col("observation_datetime", time_of_day()),
        col("observation_type_concept_id", DataType::Int32),
        col("value_as_number", DataType::Float64),
        col("value_as_string", DataType::Utf8),
        col("value_as_concept_id", DataType::Int32),
        col("qualifier_concept_id", DataType::Float32),
        col("unit_concept_id", DataType::Int32),
        col("provider_id", DataType::Float32),
        col("visit_occurrence_id", DataType::Utf8),
        col("visit_detail_id", DataType::Float32),
        col("observation_source_value", DataType::Float32),
        col("observation_source_concept_id", DataType::Int32),
        col("unit_source_value", DataType::Utf8),
        col("qualifier_source_value", DataType::Utf8),
        col("value_source_value", DataType::Float64),
        col("observation_event_id", DataType::Float64),
        col("obs_event_field_concept_id", DataType::Float64),
    ]))
}

/// MEASUREMENT
///
/// Besides the CDM columns, `time` keeps the raw offset in seconds and
/// `visit_start_date`/`visit_source_value` denormalize the visit.
#[must_use]
pub fn measurement() -> SchemaRef {
    Arc::new(Schema::new(vec![
        col("value_as_number", DataType::Float32),
        col("time", DataType::Float32),
        col("visit_occurrence_id", DataType::Utf8),
        col("visit_start_date", DataType::Date32),
        col("visit_source_value", DataType::Utf8),
        col("person_id", DataType::Utf8),
        col("measurement_datetime", DataType::Date64),
        col("measurement_date", DataType::Date32),
        col("measurement_time", time_of_day()),
        col("measurement_concept_id", DataType::Int32),
        col("measurement_source_value", DataType::Float32),
        col("unit_source_value", DataType::Utf8),
        col("unit_concept_id", DataType::Int32),
        key("measurement_id", DataType::Int64),
        col("measurement_type_concept_id", DataType::Int32),
        col("operator_concept_id", DataType::Int32),
        col("value_as_concept_id", DataType::Int32),
        col("range_low", DataType::Float32),
        col("range_high", DataType::Float32),
        col("provider_id", DataType::Int32),
        col("visit_detail_id", DataType::Int32),
        col("measurement_source_concept_id", DataType::Int32),
        col("unit_source_concept_id", DataType::Int32),
        col("value_source_value", DataType::Float32),
        col("measurement_event_id", DataType::Int32),
        col("meas_event_field_concept_id", DataType::Int32),
    ]))
}

/// DRUG_EXPOSURE
///
/// The `*_datetime` columns hold the time of day as `HH:MM:SS` text.
#[must_use]
pub fn drug_exposure() -> SchemaRef {
    Arc::new(Schema::new(vec![
        col("drug_source_value", DataType::Utf8),
        col("drug_type_concept_id", DataType::Int32),
        col("visit_occurrence_id", DataType::Utf8),
        col("person_id", DataType::Utf8),
        col("drug_exposure_start_date", DataType::Date32),
        col("drug_exposure_start_datetime", DataType::Utf8),
        col("drug_exposure_end_date", DataType::Date32),
        col("drug_exposure_end_datetime", DataType::Utf8),
        col("drug_concept_id", DataType::Int32),
        key("drug_exposure_id", DataType::Int64),
        col("verbatim_end_date", DataType::Date32),
        col("stop_reason", DataType::Utf8),
        col("refills", DataType::Utf8),
        col("quantity", DataType::Utf8),
        col("days_supply", DataType::Float32),
        col("sig", DataType::Utf8),
        col("route_concept_id", DataType::Int32),
        col("lot_number", DataType::Utf8),
        col("provider_id", DataType::Int32),
        col("visit_detail_id", DataType::Int32),
        col("drug_source_concept_id", DataType::Int32),
        col("route_source_value", DataType::Utf8),
        col("dose_unit_source_value", DataType::Utf8),
    ]))
}
