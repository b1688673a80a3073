//! Conversion of harmonized ICU datasets to the OMOP Common Data Model.
//!
//! The harmonized label table and the formatted time-series and medication files are
//! mapped onto CDM tables (PERSON, VISIT_OCCURRENCE, MEASUREMENT, OBSERVATION,
//! DRUG_EXPOSURE, DEATH and the dimension tables) with deterministic identifiers and
//! chunked, memory-bounded processing of the large fact tables.

pub mod cdm;
pub mod config;
pub mod error;
pub mod identifiers;
pub mod models;
pub mod pipeline;
pub mod utils;
pub mod vocabulary;

// Re-export the most common types for easier use
pub use config::PipelineConfig;
pub use error::{OmopError, Result};
pub use models::{LabelTable, VisitIndex};
pub use pipeline::{ConversionReport, OmopConverter};
pub use vocabulary::{ConceptMapping, ConceptRegistry};

// Arrow types
pub use arrow::record_batch::RecordBatch;
