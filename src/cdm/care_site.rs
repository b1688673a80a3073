//! CARE_SITE: one row per distinct (hospital, unit type) pair.

use std::collections::BTreeMap;

use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;
use rustc_hash::FxHashMap;

use super::columns::{BatchAssembler, int32s, int64s, strings};
use super::location::LocationLookup;
use super::{BuiltTable, CdmRecord, ResolutionGaps, schema};
use crate::error::Result;
use crate::identifiers::IdRange;
use crate::models::{LabelRecord, VisitIndex};
use crate::vocabulary::ConceptMapping;

/// A CARE_SITE row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CareSiteRecord {
    /// Care site id (from 7,000,000)
    pub care_site_id: i64,
    /// Hospital name or eICU hospital id
    pub care_site_name: String,
    /// Concept of the unit type
    pub place_of_service_concept_id: Option<i32>,
    /// Location of the hospital
    pub location_id: Option<i64>,
    /// Visit-type key of the unit type
    pub place_of_service_source_value: Option<String>,
}

/// Visit-type key of an admission's unit type
#[must_use]
pub fn unit_type_key(label: &LabelRecord, unit_types: &BTreeMap<String, String>) -> Option<String> {
    label
        .unit_type
        .as_deref()
        .and_then(|unit| unit_types.get(unit))
        .cloned()
}

/// Build the CARE_SITE table from the distinct care sites of the admissions
///
/// Rows keep the order in which each pair first appears in the label table.
/// Admissions without a care site contribute no row.
///
/// # Errors
/// Fails when the care sites would not fit in the care site id range.
pub fn build_care_sites(
    visits: &VisitIndex,
    unit_types: &BTreeMap<String, String>,
    mapping: &ConceptMapping,
    locations: &LocationLookup,
) -> Result<BuiltTable<CareSiteRecord>> {
    let mut gaps = ResolutionGaps::default();
    let mut seen = FxHashMap::default();
    let mut rows = Vec::new();

    for visit in visits.iter() {
        let Some(name) = visit.label.care_site.as_deref() else {
            continue;
        };
        let unit = unit_type_key(&visit.label, unit_types);
        let key = (name.to_string(), unit.clone());
        if seen.contains_key(&key) {
            continue;
        }

        let care_site_id = IdRange::CareSite.checked_id_at(rows.len())?;
        seen.insert(key, care_site_id);

        let location_id = locations.get(name);
        if location_id.is_none() {
            gaps.care_site_location += 1;
        }
        let place_of_service_concept_id = unit.as_deref().and_then(|u| mapping.resolve(u));
        if place_of_service_concept_id.is_none() {
            gaps.place_of_service += 1;
        }

        rows.push(CareSiteRecord {
            care_site_id,
            care_site_name: name.to_string(),
            place_of_service_concept_id,
            location_id,
            place_of_service_source_value: unit,
        });
    }

    if gaps.care_site_location > 0 {
        log::warn!(
            "{} care sites have no matching location",
            gaps.care_site_location
        );
    }
    log::info!("Built {} care sites", rows.len());
    Ok(BuiltTable { rows, gaps })
}

/// Care site id by hospital and unit-type key
#[derive(Debug, Clone, Default)]
pub struct CareSiteLookup {
    ids: FxHashMap<(String, Option<String>), i64>,
}

impl CareSiteLookup {
    /// Index built care sites
    #[must_use]
    pub fn new(rows: &[CareSiteRecord]) -> Self {
        let ids = rows
            .iter()
            .map(|r| {
                (
                    (
                        r.care_site_name.clone(),
                        r.place_of_service_source_value.clone(),
                    ),
                    r.care_site_id,
                )
            })
            .collect();
        Self { ids }
    }

    /// Care site of an admission
    #[must_use]
    pub fn get(&self, label: &LabelRecord, unit_types: &BTreeMap<String, String>) -> Option<i64> {
        let name = label.care_site.clone()?;
        self.ids
            .get(&(name, unit_type_key(label, unit_types)))
            .copied()
    }
}

impl CdmRecord for CareSiteRecord {
    const TABLE: &'static str = "CARE_SITE";

    fn schema() -> SchemaRef {
        schema::care_site()
    }

    fn to_record_batch(rows: &[Self]) -> Result<RecordBatch> {
        BatchAssembler::new(Self::schema(), rows.len())
            .column("care_site_id", int64s(rows.iter().map(|r| Some(r.care_site_id))))?
            .column(
                "care_site_name",
                strings(rows.iter().map(|r| Some(r.care_site_name.as_str()))),
            )?
            .column(
                "place_of_service_concept_id",
                int32s(rows.iter().map(|r| r.place_of_service_concept_id)),
            )?
            .column("location_id", int64s(rows.iter().map(|r| r.location_id)))?
            .column(
                "care_site_source_value",
                strings(rows.iter().map(|r| Some(r.care_site_name.as_str()))),
            )?
            .column(
                "place_of_service_source_value",
                strings(rows.iter().map(|r| r.place_of_service_source_value.as_deref())),
            )?
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cdm::location::build_locations;
    use crate::models::LabelTable;
    use crate::models::visit_index::tests::label;
    use crate::vocabulary::MappingSource;
    use crate::vocabulary::constants::UNIT_TYPES;

    fn unit_types() -> BTreeMap<String, String> {
        UNIT_TYPES
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    fn visit(key: &str, site: Option<&str>, unit: Option<&str>) -> LabelRecord {
        LabelRecord {
            care_site: site.map(str::to_string),
            unit_type: unit.map(str::to_string),
            ..label(key, key)
        }
    }

    #[test]
    fn test_distinct_pairs_in_first_appearance_order() {
        let visits = VisitIndex::build(LabelTable::new(vec![
            visit("A", Some("Bern University Hospital"), Some("ICU")),
            visit("B", Some("73"), Some("MICU")),
            visit("C", Some("Bern University Hospital"), Some("ICU")),
            visit("D", Some("73"), Some("Unknown unit")),
            visit("E", None, Some("ICU")),
        ]))
        .unwrap();
        let mut mapping = ConceptMapping::default();
        mapping.insert("icu", 4148981, MappingSource::VisitType).unwrap();
        mapping
            .insert("medical_icu", 40481392, MappingSource::VisitType)
            .unwrap();
        let locations = build_locations();
        let lookup = LocationLookup::new(&locations.rows);

        let table = build_care_sites(&visits, &unit_types(), &mapping, &lookup).unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.rows[0].care_site_id, 7_000_000);
        assert_eq!(table.rows[0].place_of_service_concept_id, Some(4148981));
        assert_eq!(table.rows[1].care_site_name, "73");
        assert_eq!(
            table.rows[1].place_of_service_source_value.as_deref(),
            Some("medical_icu")
        );
        assert_eq!(table.rows[1].location_id, lookup.get("73"));
        assert_eq!(table.rows[2].place_of_service_source_value, None);
        assert_eq!(table.gaps.place_of_service, 1);
        assert_eq!(table.gaps.care_site_location, 0);

        let sites = CareSiteLookup::new(&table.rows);
        let c = visits.get("C").unwrap();
        assert_eq!(sites.get(&c.label, &unit_types()), Some(7_000_000));
        let e = visits.get("E").unwrap();
        assert_eq!(sites.get(&e.label, &unit_types()), None);
    }

    #[test]
    fn test_unknown_hospital_has_no_location() {
        let visits =
            VisitIndex::build(LabelTable::new(vec![visit("A", Some("Nowhere"), None)])).unwrap();
        let locations = build_locations();
        let table = build_care_sites(
            &visits,
            &unit_types(),
            &ConceptMapping::default(),
            &LocationLookup::new(&locations.rows),
        )
        .unwrap();
        assert_eq!(table.rows[0].location_id, None);
        assert_eq!(table.gaps.care_site_location, 1);
    }
}
