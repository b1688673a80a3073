//! OMOP CDM tables and the builders producing them.
//!
//! Every builder is a function from its inputs to an owned table value. Rows are plain
//! structs implementing [`CdmRecord`], which knows the fixed export schema of its table.
//! Row-level resolution gaps never fail a build; they are counted in
//! [`ResolutionGaps`] and returned next to the rows.

pub mod care_site;
pub mod columns;
pub mod concept;
pub mod death;
pub mod domain;
pub mod drug_exposure;
pub mod location;
pub mod measurement;
pub mod observation;
pub mod person;
pub mod schema;
pub mod source_to_concept_map;
pub mod time;
pub mod visit;

use std::ops::AddAssign;

use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;
use serde::{Deserialize, Serialize};

use crate::error::Result;

pub use care_site::{CareSiteLookup, CareSiteRecord, build_care_sites};
pub use concept::{ConceptRecord, build_concepts};
pub use death::{DeathRecord, build_deaths};
pub use domain::{DomainRecord, build_domains};
pub use drug_exposure::{DrugExposureChunk, DrugExposureRecord, build_drug_exposures};
pub use location::{LocationLookup, LocationRecord, build_locations};
pub use measurement::{MeasurementChunk, MeasurementContext, MeasurementRecord, build_measurements};
pub use observation::{ObservationRecord, build_observations};
pub use person::{PersonRecord, build_persons};
pub use source_to_concept_map::{SourceToConceptMapRecord, build_source_to_concept_map};
pub use visit::{VisitOccurrenceRecord, VisitResolver, build_visits};

/// A row type of an exported CDM table
pub trait CdmRecord: Sized {
    /// Table name, used for file names
    const TABLE: &'static str;

    /// Export schema of the table
    fn schema() -> SchemaRef;

    /// Convert rows to a batch of [`Self::schema`]
    fn to_record_batch(rows: &[Self]) -> Result<RecordBatch>;
}

/// Rows of a built table together with the gaps met while building it
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltTable<R> {
    /// Table rows in output order
    pub rows: Vec<R>,
    /// Unresolved values, counted per kind
    pub gaps: ResolutionGaps,
}

impl<R> BuiltTable<R> {
    /// Rows without any gaps
    #[must_use]
    pub fn complete(rows: Vec<R>) -> Self {
        Self {
            rows,
            gaps: ResolutionGaps::default(),
        }
    }

    /// Number of rows
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl<R: CdmRecord> BuiltTable<R> {
    /// Rows as a batch of the table's export schema
    pub fn to_record_batch(&self) -> Result<RecordBatch> {
        R::to_record_batch(&self.rows)
    }
}

/// Counts of values that could not be resolved and were written as null, dropped or
/// skipped
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionGaps {
    /// Admission origins without a concept
    pub origin: usize,
    /// Discharge destinations without a concept
    pub destination: usize,
    /// Sex codes other than 0 and 1
    pub gender: usize,
    /// Persons whose source dataset has no location
    pub person_location: usize,
    /// Visits without a care site
    pub care_site: usize,
    /// Care sites whose name has no location
    pub care_site_location: usize,
    /// Unit types without a place-of-service concept
    pub place_of_service: usize,
    /// Missing or negative lengths of stay
    pub length_of_stay: usize,
    /// Covariates missing or outside every bin
    pub observation_bin: usize,
    /// Measurement rows without a concept
    pub measurement_concept: usize,
    /// Measurement rows without a unit
    pub unit: usize,
    /// Drug exposure rows without a concept
    pub drug_concept: usize,
    /// Fact rows whose visit key is not in the label table
    pub join_misses: usize,
    /// Time-series values without a time offset
    pub missing_time: usize,
    /// Variables absent from a whole chunk
    pub skipped_variables: usize,
}

impl ResolutionGaps {
    /// Total of all counters
    #[must_use]
    pub fn total(&self) -> usize {
        self.origin
            + self.destination
            + self.gender
            + self.person_location
            + self.care_site
            + self.care_site_location
            + self.place_of_service
            + self.length_of_stay
            + self.observation_bin
            + self.measurement_concept
            + self.unit
            + self.drug_concept
            + self.join_misses
            + self.missing_time
            + self.skipped_variables
    }
}

impl AddAssign for ResolutionGaps {
    fn add_assign(&mut self, other: Self) {
        self.origin += other.origin;
        self.destination += other.destination;
        self.gender += other.gender;
        self.person_location += other.person_location;
        self.care_site += other.care_site;
        self.care_site_location += other.care_site_location;
        self.place_of_service += other.place_of_service;
        self.length_of_stay += other.length_of_stay;
        self.observation_bin += other.observation_bin;
        self.measurement_concept += other.measurement_concept;
        self.unit += other.unit;
        self.drug_concept += other.drug_concept;
        self.join_misses += other.join_misses;
        self.missing_time += other.missing_time;
        self.skipped_variables += other.skipped_variables;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gaps_accumulate() {
        let mut gaps = ResolutionGaps {
            origin: 1,
            ..ResolutionGaps::default()
        };
        gaps += ResolutionGaps {
            origin: 2,
            join_misses: 5,
            ..ResolutionGaps::default()
        };
        assert_eq!(gaps.origin, 3);
        assert_eq!(gaps.total(), 8);
    }
}
