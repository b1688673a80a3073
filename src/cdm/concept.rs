//! CONCEPT: the registry's concepts, exported as they were loaded.

use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;

use super::columns::{BatchAssembler, int32s, strings};
use super::{BuiltTable, CdmRecord, schema};
use crate::error::Result;
use crate::vocabulary::{Concept, ConceptRegistry};

/// A CONCEPT row
pub type ConceptRecord = Concept;

/// Build the CONCEPT table in ascending concept id order
#[must_use]
pub fn build_concepts(registry: &ConceptRegistry) -> BuiltTable<ConceptRecord> {
    BuiltTable::complete(registry.iter().cloned().collect())
}

impl CdmRecord for Concept {
    const TABLE: &'static str = "CONCEPT";

    fn schema() -> SchemaRef {
        schema::concept()
    }

    fn to_record_batch(rows: &[Self]) -> Result<RecordBatch> {
        BatchAssembler::new(Self::schema(), rows.len())
            .column("concept_id", int32s(rows.iter().map(|r| Some(r.concept_id))))?
            .column(
                "concept_name",
                strings(rows.iter().map(|r| Some(r.concept_name.as_str()))),
            )?
            .column(
                "domain_id",
                strings(rows.iter().map(|r| Some(r.domain_id.as_str()))),
            )?
            .column(
                "vocabulary_id",
                strings(rows.iter().map(|r| Some(r.vocabulary_id.as_str()))),
            )?
            .column(
                "concept_class_id",
                strings(rows.iter().map(|r| Some(r.concept_class_id.as_str()))),
            )?
            .column(
                "standard_concept",
                strings(rows.iter().map(|r| r.standard_concept.as_deref())),
            )?
            .column(
                "concept_code",
                strings(rows.iter().map(|r| Some(r.concept_code.as_str()))),
            )?
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vocabulary::RequiredConcepts;
    use crate::vocabulary::registry::tests::full_vocabulary;
    use std::collections::BTreeMap;

    #[test]
    fn test_concepts_are_sorted_and_include_injected() {
        let required = RequiredConcepts::for_pipeline(&BTreeMap::new(), &[]);
        let registry = ConceptRegistry::load(full_vocabulary(), &required).unwrap();
        let table = build_concepts(&registry);
        assert_eq!(table.len(), registry.len());
        assert!(table.rows.windows(2).all(|w| w[0].concept_id < w[1].concept_id));
        assert!(table.rows.iter().any(|c| c.concept_id == 38004285));

        let batch = table.to_record_batch().unwrap();
        assert_eq!(batch.num_rows(), registry.len());
    }
}
