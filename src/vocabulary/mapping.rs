//! Source code → concept id mapping shared by every builder.

use std::collections::BTreeMap;

use rustc_hash::FxHashMap;

use super::constants;
use super::registry::ConceptRegistry;
use crate::error::{OmopError, Result};

/// Where a mapping entry came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MappingSource {
    /// Visit-type keys (origins, destinations, unit types)
    VisitType,
    /// Variable catalog of the time-series and medication data
    Variable,
    /// Admission covariates exported as measurements
    ObservationVariable,
    /// Medication names resolved through the vocabulary
    Medication,
}

/// One source code and its target concept
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingEntry {
    /// Source code
    pub source_code: String,
    /// Target concept id
    pub target_concept_id: i32,
    /// Origin of the entry
    pub source: MappingSource,
}

/// Many-to-one mapping from source codes to concept ids
///
/// Each code resolves to at most one concept; entries keep insertion order.
#[derive(Debug, Clone, Default)]
pub struct ConceptMapping {
    entries: Vec<MappingEntry>,
    index: FxHashMap<String, usize>,
}

impl ConceptMapping {
    /// Merge the visit-type table, the variable catalog, the admission covariates and
    /// the medication names, in that order
    ///
    /// A medication already present in the catalog keeps its catalog concept.
    pub fn for_pipeline(
        variable_concepts: &BTreeMap<String, i32>,
        medications: &[String],
        registry: &ConceptRegistry,
    ) -> Result<Self> {
        let mut mapping = Self::default();
        for (code, id) in constants::VISIT_CONCEPT_IDS {
            mapping.insert(code, *id, MappingSource::VisitType)?;
        }
        for (code, id) in variable_concepts {
            mapping.insert(code, *id, MappingSource::Variable)?;
        }
        for (code, id) in constants::OBSERVATION_VARIABLE_CONCEPTS {
            mapping.insert(code, *id, MappingSource::ObservationVariable)?;
        }
        for name in medications {
            if mapping.resolve(name).is_some() {
                continue;
            }
            if let Some(id) = registry.id_by_name(name) {
                mapping.insert(name, id, MappingSource::Medication)?;
            }
        }
        log::info!("Concept mapping holds {} source codes", mapping.len());
        Ok(mapping)
    }

    /// Add a mapping; re-adding the same pair is a no-op
    pub fn insert(&mut self, code: &str, concept_id: i32, source: MappingSource) -> Result<()> {
        if let Some(&idx) = self.index.get(code) {
            let first = self.entries[idx].target_concept_id;
            if first != concept_id {
                return Err(OmopError::ConflictingMapping {
                    code: code.to_string(),
                    first,
                    second: concept_id,
                });
            }
            return Ok(());
        }
        self.index.insert(code.to_string(), self.entries.len());
        self.entries.push(MappingEntry {
            source_code: code.to_string(),
            target_concept_id: concept_id,
            source,
        });
        Ok(())
    }

    /// Concept id of a source code
    #[must_use]
    pub fn resolve(&self, code: &str) -> Option<i32> {
        self.index
            .get(code)
            .map(|&idx| self.entries[idx].target_concept_id)
    }

    /// Entries in insertion order
    #[must_use]
    pub fn entries(&self) -> &[MappingEntry] {
        &self.entries
    }

    /// Number of source codes
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the mapping is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
