//! Vocabulary reference data: concepts, unit lookups and source-code mappings.

pub mod concept;
pub mod constants;
pub mod loader;
pub mod mapping;
pub mod registry;

pub use concept::{Concept, Unit};
pub use loader::load_vocabulary;
pub use mapping::{ConceptMapping, MappingSource};
pub use registry::{ConceptRegistry, RequiredConcepts};
