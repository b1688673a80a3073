//! The concept registry: the subset of the vocabulary the CDM tables refer to.

use std::collections::{BTreeMap, BTreeSet};

use itertools::Itertools;
use rustc_hash::FxHashMap;

use super::concept::{Concept, Unit};
use super::constants;
use crate::error::{OmopError, Result};

/// Concept ids and medication names the registry must resolve
#[derive(Debug, Clone, Default)]
pub struct RequiredConcepts {
    ids: BTreeSet<i32>,
    medications: Vec<String>,
}

impl RequiredConcepts {
    /// Everything the generated tables reference, plus variable and medication concepts
    #[must_use]
    pub fn for_pipeline(variable_concepts: &BTreeMap<String, i32>, medications: &[String]) -> Self {
        let mut ids: BTreeSet<i32> = constants::MISC_CONCEPT_IDS.iter().copied().collect();
        ids.extend(constants::FLAT_CONCEPT_IDS);
        ids.extend(constants::OBSERVATION_CONCEPT_IDS);
        ids.extend(constants::OBSERVATION_VARIABLE_CONCEPTS.iter().map(|(_, id)| *id));
        ids.extend(constants::VISIT_CONCEPT_IDS.iter().map(|(_, id)| *id));
        ids.extend(constants::UNIT_CONCEPT_IDS.iter().map(|(_, id)| *id));
        ids.extend([constants::MALE_CONCEPT_ID, constants::FEMALE_CONCEPT_ID]);
        ids.extend(variable_concepts.values());
        Self {
            ids,
            medications: medications.to_vec(),
        }
    }

    /// Require an additional concept id
    pub fn insert(&mut self, concept_id: i32) {
        self.ids.insert(concept_id);
    }

    /// Required concept ids
    pub fn ids(&self) -> impl Iterator<Item = i32> + '_ {
        self.ids.iter().copied()
    }
}

/// Immutable lookup of the concepts used by the conversion
#[derive(Debug, Clone)]
pub struct ConceptRegistry {
    concepts: BTreeMap<i32, Concept>,
    by_name: FxHashMap<String, i32>,
    units: FxHashMap<String, Unit>,
}

impl ConceptRegistry {
    /// Restrict a vocabulary to the required concepts
    ///
    /// Medication concepts are selected by name. Whitelisted concepts absent from the
    /// vocabulary are injected; any other absent concept id fails the load.
    pub fn load(
        vocabulary: impl IntoIterator<Item = Concept>,
        required: &RequiredConcepts,
    ) -> Result<Self> {
        let medication_names: BTreeSet<&str> =
            required.medications.iter().map(String::as_str).collect();

        let mut concepts = BTreeMap::new();
        let mut medications_found = BTreeSet::new();
        for concept in vocabulary {
            let is_medication = medication_names.contains(concept.concept_name.as_str());
            if is_medication {
                medications_found.insert(concept.concept_name.clone());
            }
            if is_medication || required.ids.contains(&concept.concept_id) {
                concepts.entry(concept.concept_id).or_insert(concept);
            }
        }

        for concept in Concept::injected() {
            if !concepts.contains_key(&concept.concept_id) {
                log::debug!("Injecting concept {} ({})", concept.concept_id, concept.concept_name);
                concepts.insert(concept.concept_id, concept);
            }
        }

        let missing = required
            .ids()
            .filter(|id| !concepts.contains_key(id))
            .collect_vec();
        if !missing.is_empty() {
            return Err(OmopError::MissingConcepts { missing });
        }

        for name in medication_names
            .iter()
            .filter(|name| !medications_found.contains(**name))
        {
            log::warn!("No vocabulary concept named '{name}', drug exposures will be unmapped");
        }

        let by_name = index_by_name(&concepts);
        let units = constants::UNIT_CONCEPT_IDS
            .iter()
            .filter_map(|(variable, id)| {
                concepts
                    .get(id)
                    .map(|concept| ((*variable).to_string(), Unit::from_concept(concept)))
            })
            .collect();

        log::info!("Concept registry holds {} concepts", concepts.len());
        Ok(Self {
            concepts,
            by_name,
            units,
        })
    }

    /// Look up a concept by id
    #[must_use]
    pub fn get(&self, concept_id: i32) -> Option<&Concept> {
        self.concepts.get(&concept_id)
    }

    /// Look up a concept id by exact concept name
    #[must_use]
    pub fn id_by_name(&self, name: &str) -> Option<i32> {
        self.by_name.get(name).copied()
    }

    /// Unit of a measured variable
    #[must_use]
    pub fn unit(&self, variable: &str) -> Option<&Unit> {
        self.units.get(variable)
    }

    /// Concepts in ascending id order
    pub fn iter(&self) -> impl Iterator<Item = &Concept> {
        self.concepts.values()
    }

    /// Number of concepts
    #[must_use]
    pub fn len(&self) -> usize {
        self.concepts.len()
    }

    /// Whether the registry is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.concepts.is_empty()
    }
}

/// Name index preferring standard concepts, then the lowest id
fn index_by_name(concepts: &BTreeMap<i32, Concept>) -> FxHashMap<String, i32> {
    let mut by_name: FxHashMap<String, i32> = FxHashMap::default();
    for concept in concepts.values() {
        let replace = by_name
            .get(&concept.concept_name)
            .is_none_or(|existing| concept.is_standard() && !concepts[existing].is_standard());
        if replace {
            by_name.insert(concept.concept_name.clone(), concept.concept_id);
        }
    }
    by_name
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn concept(id: i32, name: &str, code: &str) -> Concept {
        Concept {
            concept_id: id,
            concept_name: name.to_string(),
            domain_id: "Metadata".to_string(),
            vocabulary_id: "Test".to_string(),
            concept_class_id: "Test".to_string(),
            standard_concept: Some("S".to_string()),
            concept_code: code.to_string(),
        }
    }

    /// A vocabulary that satisfies `RequiredConcepts::for_pipeline` with no variables
    pub(crate) fn full_vocabulary() -> Vec<Concept> {
        let required = RequiredConcepts::for_pipeline(&BTreeMap::new(), &[]);
        required
            .ids()
            .filter(|id| ![8844, 38004285].contains(id))
            .map(|id| match id {
                0 => concept(0, constants::NO_MATCHING_CONCEPT, constants::NO_MATCHING_CONCEPT),
                8582 => concept(8582, "centimeter", "cm"),
                9529 => concept(9529, "kilogram", "kg"),
                9448 => concept(9448, "year", "a"),
                other => concept(other, &format!("concept {other}"), &other.to_string()),
            })
            .collect()
    }

    #[test]
    fn test_load_injects_whitelisted_concepts() {
        let required = RequiredConcepts::for_pipeline(&BTreeMap::new(), &[]);
        let registry = ConceptRegistry::load(full_vocabulary(), &required).unwrap();
        assert_eq!(
            registry.get(8844).map(|c| c.concept_name.as_str()),
            Some("Other Place of Service")
        );
        assert!(registry.get(38004285).is_some());
    }

    #[test]
    fn test_missing_required_concept_is_fatal() {
        let mut required = RequiredConcepts::for_pipeline(&BTreeMap::new(), &[]);
        required.insert(123_456);
        let vocabulary = full_vocabulary()
            .into_iter()
            .filter(|c| c.concept_id != constants::MALE_CONCEPT_ID);
        match ConceptRegistry::load(vocabulary, &required) {
            Err(OmopError::MissingConcepts { missing }) => {
                assert_eq!(missing, vec![constants::MALE_CONCEPT_ID, 123_456]);
            }
            other => panic!("expected MissingConcepts, got {other:?}"),
        }
    }

    #[test]
    fn test_unreferenced_concepts_are_dropped() {
        let required = RequiredConcepts::for_pipeline(&BTreeMap::new(), &[]);
        let mut vocabulary = full_vocabulary();
        vocabulary.push(concept(999_999, "unused", "x"));
        let registry = ConceptRegistry::load(vocabulary, &required).unwrap();
        assert!(registry.get(999_999).is_none());
    }

    #[test]
    fn test_medications_selected_by_name() {
        let required =
            RequiredConcepts::for_pipeline(&BTreeMap::new(), &["propofol".to_string()]);
        let mut vocabulary = full_vocabulary();
        let mut non_standard = concept(1, "propofol", "p-old");
        non_standard.standard_concept = None;
        vocabulary.push(non_standard);
        vocabulary.push(concept(753626, "propofol", "8782"));
        let registry = ConceptRegistry::load(vocabulary, &required).unwrap();
        assert_eq!(registry.id_by_name("propofol"), Some(753626));
        assert!(registry.get(1).is_some());
    }

    #[test]
    fn test_unit_source_value_blank_for_no_matching_concept() {
        let required = RequiredConcepts::for_pipeline(&BTreeMap::new(), &[]);
        let registry = ConceptRegistry::load(full_vocabulary(), &required).unwrap();
        assert_eq!(registry.unit("raw_height").unwrap().source_value, "cm");
        let gcs = registry.unit("glasgow_coma_score").unwrap();
        assert_eq!(gcs.concept_id, 0);
        assert_eq!(gcs.source_value, "");
        assert!(registry.unit("not_a_variable").is_none());
    }
}
