//! Surrogate identifiers.
//!
//! Persons and visits get content-addressed string ids derived from their natural keys.
//! Every other table draws numeric ids from its own range (see [`IdRange`]); the
//! chunked fact tables draw them through an explicit allocator.

pub mod allocator;
pub mod hashing;

pub use allocator::{RunningIdAllocator, StridedIdAllocator};
pub use hashing::{derive, PERSON_PREFIX, VISIT_PREFIX};

use crate::error::{OmopError, Result};

/// Disjoint numeric id ranges, one per table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdRange {
    /// OBSERVATION
    Observation,
    /// DRUG_EXPOSURE
    DrugExposure,
    /// MEASUREMENT (also the per-chunk stride)
    Measurement,
    /// DOMAIN
    Domain,
    /// CARE_SITE
    CareSite,
    /// LOCATION
    Location,
}

impl IdRange {
    /// First id of the range
    #[must_use]
    pub const fn start(self) -> i64 {
        match self {
            Self::Observation => 3_000_000,
            Self::DrugExposure => 4_000_000,
            Self::Measurement => 5_000_000_000,
            Self::Domain => 6_000_000,
            Self::CareSite => 7_000_000,
            Self::Location => 8_000_000,
        }
    }

    /// First id past the range: the start of the next range above it
    #[must_use]
    pub const fn end(self) -> i64 {
        match self {
            Self::Observation => Self::DrugExposure.start(),
            Self::DrugExposure => Self::Domain.start(),
            Self::Domain => Self::CareSite.start(),
            Self::CareSite => Self::Location.start(),
            Self::Location => Self::Measurement.start(),
            Self::Measurement => i64::MAX,
        }
    }

    /// Number of ids in the range
    #[must_use]
    pub const fn capacity(self) -> i64 {
        self.end() - self.start()
    }

    /// Id of the row at `offset` in a table of fixed content
    #[must_use]
    pub fn id_at(self, offset: usize) -> i64 {
        // usize offsets of in-memory tables always fit in i64
        self.start() + offset as i64
    }

    /// Id of the row at `offset`, failing once the range is exhausted
    pub fn checked_id_at(self, offset: usize) -> Result<i64> {
        let id = i64::try_from(offset)
            .ok()
            .and_then(|offset| self.start().checked_add(offset))
            .filter(|id| *id < self.end());
        id.ok_or_else(|| self.exhausted(offset.saturating_add(1)))
    }

    pub(crate) fn exhausted(self, rows: usize) -> OmopError {
        OmopError::InvalidData(format!(
            "{self:?} ids exhausted: {rows} rows do not fit in [{}, {})",
            self.start(),
            self.end()
        ))
    }
}
