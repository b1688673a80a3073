//! Input models of the conversion.
//!
//! The harmonized label table is read once into a [`LabelTable`]. Once visit ids are
//! assigned it is consumed and re-keyed into a [`VisitIndex`], which every later
//! builder reads.

pub mod labels;
pub mod visit_index;

pub use labels::{LabelRecord, LabelTable};
pub use visit_index::{IndexedVisit, VisitIndex};
