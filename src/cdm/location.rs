//! LOCATION: hospitals and countries the admissions come from.
//!
//! The multicentre eICU database identifies hospitals by numeric id, so each id gets a
//! row of its own. The monocentric databases get one row per hospital, and every
//! country gets a row used for persons.

use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;
use itertools::Itertools;
use rustc_hash::FxHashMap;

use super::columns::{BatchAssembler, int32s, int64s, strings};
use super::{BuiltTable, CdmRecord, schema};
use crate::error::Result;
use crate::identifiers::IdRange;
use crate::vocabulary::constants::{
    NETHERLANDS_CONCEPT_ID, SWITZERLAND_CONCEPT_ID, UNITED_STATES_CONCEPT_ID,
};

/// Hospital ids of the eICU database
pub const EICU_HOSPITAL_IDS: &[u16] = &[
    404, 420, 252, 90, 94, 385, 136, 259, 301, 227, 449, 345, 248, 279, 122, 264, 436, 391, 338,
    63, 266, 336, 167, 197, 188, 337, 400, 202, 69, 307, 199, 141, 243, 73, 269, 440, 403, 424,
    58, 280, 382, 245, 283, 394, 249, 300, 208, 155, 176, 435, 443, 452, 171, 165, 154, 183, 390,
    282, 142, 407, 458, 195, 95, 389, 358, 412, 277, 425, 85, 226, 331, 220, 152, 357, 388, 79,
    353, 271, 392, 181, 318, 148, 157, 405, 205, 268, 419, 423, 224, 198, 207, 272, 416, 67, 146,
    417, 144, 256, 328, 184, 60, 281, 444, 459, 175, 253, 217, 310, 421, 413, 360, 393, 131, 140,
    66, 71, 194, 411, 387, 384, 364, 397, 422, 158, 110, 125, 196, 402, 92, 201, 396, 102, 398,
    386, 244, 383, 209, 206, 355, 365, 68, 251, 204, 433, 445, 254, 210, 59, 143, 437, 215, 123,
    138, 174, 438, 250, 112, 56, 434, 258, 342, 428, 108, 200, 262, 312, 164, 203, 180, 182, 439,
    399, 275, 323, 133, 429, 350, 447, 263, 120, 273, 267, 381, 356, 61, 401, 246, 352, 408, 414,
    83, 265, 303, 96, 91, 93, 179, 135, 212, 361, 115, 84, 86, 363, 151, 409, 156, 351,
];

/// Named hospitals: (city, country code, hospital name)
pub const HOSPITALS: &[(&str, &str, &str)] = &[
    ("Bern", "CH", "Bern University Hospital"),
    ("Boston", "US", "Beth Israel Deaconess Medical Center"),
    ("Amsterdam", "NL", "Amsterdam University Medical Center"),
];

/// Countries and their concept ids
pub const COUNTRIES: &[(&str, i32)] = &[
    ("US", UNITED_STATES_CONCEPT_ID),
    ("NL", NETHERLANDS_CONCEPT_ID),
    ("CH", SWITZERLAND_CONCEPT_ID),
];

/// A LOCATION row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationRecord {
    /// Location id (from 8,000,000)
    pub location_id: i64,
    /// City, when known
    pub city: Option<String>,
    /// Hospital id, hospital name or country code
    pub location_source_value: String,
    /// Country concept
    pub country_concept_id: Option<i32>,
    /// Country code
    pub country_source_value: String,
}

fn country_concept(code: &str) -> Option<i32> {
    COUNTRIES
        .iter()
        .find(|(country, _)| *country == code)
        .map(|(_, id)| *id)
}

/// Build the LOCATION table
#[must_use]
pub fn build_locations() -> BuiltTable<LocationRecord> {
    let eicu = EICU_HOSPITAL_IDS
        .iter()
        .map(|id| (None, "US", id.to_string()));
    let hospitals = HOSPITALS
        .iter()
        .map(|(city, country, name)| (Some((*city).to_string()), *country, (*name).to_string()));
    let countries = COUNTRIES
        .iter()
        .map(|(country, _)| (None, *country, (*country).to_string()));

    let rows = eicu
        .chain(hospitals)
        .chain(countries)
        .enumerate()
        .map(|(offset, (city, country, source))| LocationRecord {
            location_id: IdRange::Location.id_at(offset),
            city,
            location_source_value: source,
            country_concept_id: country_concept(country),
            country_source_value: country.to_string(),
        })
        .collect_vec();
    log::info!("Built {} locations", rows.len());
    BuiltTable::complete(rows)
}

/// Location id by `location_source_value`
#[derive(Debug, Clone, Default)]
pub struct LocationLookup {
    ids: FxHashMap<String, i64>,
}

impl LocationLookup {
    /// Index built locations; the first row wins for repeated source values
    #[must_use]
    pub fn new(rows: &[LocationRecord]) -> Self {
        let mut ids = FxHashMap::default();
        for row in rows {
            ids.entry(row.location_source_value.clone())
                .or_insert(row.location_id);
        }
        Self { ids }
    }

    /// Location of a hospital id, hospital name or country code
    #[must_use]
    pub fn get(&self, source_value: &str) -> Option<i64> {
        self.ids.get(source_value).copied()
    }
}

impl CdmRecord for LocationRecord {
    const TABLE: &'static str = "LOCATION";

    fn schema() -> SchemaRef {
        schema::location()
    }

    fn to_record_batch(rows: &[Self]) -> Result<RecordBatch> {
        BatchAssembler::new(Self::schema(), rows.len())
            .column("location_id", int64s(rows.iter().map(|r| Some(r.location_id))))?
            .column("city", strings(rows.iter().map(|r| r.city.as_deref())))?
            .column(
                "location_source_value",
                strings(rows.iter().map(|r| Some(r.location_source_value.as_str()))),
            )?
            .column(
                "country_concept_id",
                int32s(rows.iter().map(|r| r.country_concept_id)),
            )?
            .column(
                "country_source_value",
                strings(rows.iter().map(|r| Some(r.country_source_value.as_str()))),
            )?
            .finish()
    }
}
