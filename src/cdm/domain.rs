//! DOMAIN: the CDM domains the exported tables use.

use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;

use super::columns::{BatchAssembler, int32s, int64s, strings};
use super::{BuiltTable, CdmRecord, schema};
use crate::error::Result;
use crate::identifiers::IdRange;
use crate::vocabulary::constants::DOMAINS;

/// A DOMAIN row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainRecord {
    /// Domain id (from 6,000,000)
    pub domain_id: i64,
    /// Domain name
    pub domain_name: String,
    /// Concept describing the domain
    pub domain_concept_id: i32,
}

/// Build the DOMAIN table
#[must_use]
pub fn build_domains() -> BuiltTable<DomainRecord> {
    let rows = DOMAINS
        .iter()
        .enumerate()
        .map(|(offset, (name, concept_id))| DomainRecord {
            domain_id: IdRange::Domain.id_at(offset),
            domain_name: (*name).to_string(),
            domain_concept_id: *concept_id,
        })
        .collect();
    BuiltTable::complete(rows)
}

impl CdmRecord for DomainRecord {
    const TABLE: &'static str = "DOMAIN";

    fn schema() -> SchemaRef {
        schema::domain()
    }

    fn to_record_batch(rows: &[Self]) -> Result<RecordBatch> {
        BatchAssembler::new(Self::schema(), rows.len())
            .column("domain_id", int64s(rows.iter().map(|r| Some(r.domain_id))))?
            .column(
                "domain_name",
                strings(rows.iter().map(|r| Some(r.domain_name.as_str()))),
            )?
            .column(
                "domain_concept_id",
                int32s(rows.iter().map(|r| Some(r.domain_concept_id))),
            )?
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domains() {
        let table = build_domains();
        let rows: Vec<_> = table
            .rows
            .iter()
            .map(|r| (r.domain_id, r.domain_name.as_str(), r.domain_concept_id))
            .collect();
        assert_eq!(
            rows,
            vec![
                (6_000_000, "Visit", 8),
                (6_000_001, "Type Concept", 58),
                (6_000_002, "Observation", 27),
                (6_000_003, "Drug", 13),
                (6_000_004, "Unit", 16),
                (6_000_005, "Measurement", 21),
            ]
        );
    }
}
