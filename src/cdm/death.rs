//! DEATH: at most one row per person, from admissions flagged with mortality.

use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;
use chrono::NaiveDateTime;
use rustc_hash::FxHashSet;

use super::columns::{BatchAssembler, dates, strings, timestamps};
use super::time::after_hours;
use super::{BuiltTable, CdmRecord, ResolutionGaps, schema};
use crate::error::Result;
use crate::models::VisitIndex;

/// A DEATH row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeathRecord {
    /// Derived person id
    pub person_id: String,
    /// End of the fatal stay
    pub death_datetime: Option<NaiveDateTime>,
}

/// Build the DEATH table
///
/// A person who died in several admissions keeps the first one in label-table order.
pub fn build_deaths(visits: &VisitIndex, reference: NaiveDateTime) -> BuiltTable<DeathRecord> {
    let mut gaps = ResolutionGaps::default();
    let mut seen = FxHashSet::default();
    let mut rows = Vec::new();

    for visit in visits.iter().filter(|v| v.label.mortality) {
        if !seen.insert(visit.person_id.as_str()) {
            continue;
        }
        let death_datetime = after_hours(reference, visit.label.length_of_stay_hours);
        if death_datetime.is_none() {
            gaps.length_of_stay += 1;
        }
        rows.push(DeathRecord {
            person_id: visit.person_id.clone(),
            death_datetime,
        });
    }

    log::info!("Built {} deaths", rows.len());
    BuiltTable { rows, gaps }
}

impl CdmRecord for DeathRecord {
    const TABLE: &'static str = "DEATH";

    fn schema() -> SchemaRef {
        schema::death()
    }

    fn to_record_batch(rows: &[Self]) -> Result<RecordBatch> {
        BatchAssembler::new(Self::schema(), rows.len())
            .column(
                "person_id",
                strings(rows.iter().map(|r| Some(r.person_id.as_str()))),
            )?
            .column(
                "death_date",
                dates(rows.iter().map(|r| r.death_datetime.map(|dt| dt.date()))),
            )?
            .column(
                "death_datetime",
                timestamps(rows.iter().map(|r| r.death_datetime)),
            )?
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::visit_index::tests::label;
    use crate::models::{LabelRecord, LabelTable};
    use chrono::{NaiveDate, TimeDelta};

    fn died(visit: &str, patient: &str, los: f64) -> LabelRecord {
        LabelRecord {
            mortality: true,
            length_of_stay_hours: Some(los),
            ..label(visit, patient)
        }
    }

    #[test]
    fn test_one_death_per_person() {
        let reference = NaiveDate::from_ymd_opt(2023, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let visits = VisitIndex::build(LabelTable::new(vec![
            died("A", "p1", 72.0),
            died("B", "p1", 24.0),
            label("C", "p2"),
            died("D", "p3", 10.0),
        ]))
        .unwrap();

        let table = build_deaths(&visits, reference);
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows[0].person_id, visits.get("A").unwrap().person_id);
        assert_eq!(
            table.rows[0].death_datetime,
            Some(reference + TimeDelta::hours(72))
        );
        assert_eq!(table.rows[1].person_id, visits.get("D").unwrap().person_id);
        assert_eq!(table.gaps.total(), 0);
    }
}
