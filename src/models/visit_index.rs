//! Admissions keyed by their derived visit id.
//!
//! Building the index consumes the [`LabelTable`], so the re-keying happens exactly once
//! and every builder that needs visit ids must go through it.

use rustc_hash::FxHashMap;

use super::labels::{LabelRecord, LabelTable};
use crate::error::{OmopError, Result};
use crate::identifiers::{PERSON_PREFIX, VISIT_PREFIX, derive};

/// One admission together with its surrogate ids
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedVisit {
    /// Derived visit id (`v_…`)
    pub visit_occurrence_id: String,
    /// Derived person id (`p_…`)
    pub person_id: String,
    /// The label row of the admission
    pub label: LabelRecord,
}

impl IndexedVisit {
    /// Natural visit key, exported as `visit_source_value`
    #[must_use]
    pub fn visit_source_value(&self) -> &str {
        &self.label.visit_key
    }
}

/// Admissions in label-table row order, addressable by visit natural key
#[derive(Debug, Clone, Default)]
pub struct VisitIndex {
    visits: Vec<IndexedVisit>,
    by_key: FxHashMap<String, usize>,
}

impl VisitIndex {
    /// Assign person and visit ids to every admission
    ///
    /// # Errors
    /// Returns [`OmopError::DuplicateVisit`] when two rows share a visit key.
    pub fn build(labels: LabelTable) -> Result<Self> {
        if labels.is_empty() {
            log::warn!("Label table has no admissions");
        }
        let mut visits = Vec::with_capacity(labels.len());
        let mut by_key = FxHashMap::default();
        by_key.reserve(labels.len());

        for label in labels.into_records() {
            if by_key.contains_key(&label.visit_key) {
                return Err(OmopError::DuplicateVisit(label.visit_key));
            }
            by_key.insert(label.visit_key.clone(), visits.len());
            visits.push(IndexedVisit {
                visit_occurrence_id: derive(&label.visit_key, VISIT_PREFIX),
                person_id: derive(&label.patient_key, PERSON_PREFIX),
                label,
            });
        }

        log::info!("Indexed {} visits", visits.len());
        Ok(Self { visits, by_key })
    }

    /// Admission with the given natural visit key
    #[must_use]
    pub fn get(&self, visit_key: &str) -> Option<&IndexedVisit> {
        self.by_key.get(visit_key).map(|&idx| &self.visits[idx])
    }

    /// Admissions in label-table row order
    pub fn iter(&self) -> impl Iterator<Item = &IndexedVisit> {
        self.visits.iter()
    }

    /// Number of admissions
    #[must_use]
    pub fn len(&self) -> usize {
        self.visits.len()
    }

    /// Whether there are no admissions
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.visits.is_empty()
    }
}
