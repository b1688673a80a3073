//! Concept records of the OMOP standardized vocabulary.

use serde::{Deserialize, Serialize};

use super::constants::NO_MATCHING_CONCEPT;

/// A vocabulary entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Concept {
    /// Concept identifier
    pub concept_id: i32,
    /// Human-readable name
    pub concept_name: String,
    /// CDM domain the concept belongs to
    pub domain_id: String,
    /// Vocabulary the concept comes from
    pub vocabulary_id: String,
    /// Concept class
    pub concept_class_id: String,
    /// "S" for standard, "C" for classification, absent otherwise
    pub standard_concept: Option<String>,
    /// Code of the concept in its source vocabulary
    pub concept_code: String,
}

impl Concept {
    /// Whether this is a standard concept
    #[must_use]
    pub fn is_standard(&self) -> bool {
        self.standard_concept.as_deref() == Some("S")
    }

    /// Concepts injected when the vocabulary does not provide them
    #[must_use]
    pub fn injected() -> Vec<Self> {
        vec![
            Self {
                concept_id: 8844,
                concept_name: "Other Place of Service".to_string(),
                domain_id: "Visit".to_string(),
                vocabulary_id: "CMS Place of Service".to_string(),
                concept_class_id: "Visit".to_string(),
                standard_concept: None,
                concept_code: "99".to_string(),
            },
            Self {
                concept_id: 38004285,
                concept_name: "Rehabilitation Hospital".to_string(),
                domain_id: "Visit".to_string(),
                vocabulary_id: "NUCC".to_string(),
                concept_class_id: "Visit".to_string(),
                standard_concept: Some("S".to_string()),
                concept_code: "283X00000X".to_string(),
            },
        ]
    }
}

/// Unit attached to a measured variable
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unit {
    /// Unit concept id
    pub concept_id: i32,
    /// Unit code as written to `unit_source_value`
    pub source_value: String,
}

impl Unit {
    /// Unit described by a vocabulary concept
    #[must_use]
    pub fn from_concept(concept: &Concept) -> Self {
        let source_value = if concept.concept_code == NO_MATCHING_CONCEPT {
            String::new()
        } else {
            concept.concept_code.clone()
        };
        Self {
            concept_id: concept.concept_id,
            source_value,
        }
    }
}
