//! Fixtures for the pipeline integration tests.
#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array, Int32Array, Int64Array, StringArray};
use arrow::datatypes::{Field, Schema};
use arrow::record_batch::RecordBatch;
use icu_omop::PipelineConfig;
use icu_omop::utils::io::{read_parquet, write_parquet};
use icu_omop::vocabulary::RequiredConcepts;

pub const HEART_RATE_CONCEPT: i32 = 3027018;
pub const LACTATE_CONCEPT: i32 = 3047181;
pub const PROPOFOL_CONCEPT: i32 = 753626;

/// Write a single batch built from named columns
pub fn write_table(path: &Path, columns: Vec<(&str, ArrayRef)>) {
    let fields: Vec<Field> = columns
        .iter()
        .map(|(name, array)| Field::new(*name, array.data_type().clone(), true))
        .collect();
    let schema = Arc::new(Schema::new(fields));
    let batch =
        RecordBatch::try_new(schema.clone(), columns.into_iter().map(|(_, a)| a).collect())
            .unwrap();
    write_parquet(path, &schema, &[batch]).unwrap();
}

fn strs(values: &[Option<&str>]) -> ArrayRef {
    Arc::new(StringArray::from(values.to_vec()))
}

fn floats(values: &[Option<f64>]) -> ArrayRef {
    Arc::new(Float64Array::from(values.to_vec()))
}

fn variable_concepts() -> BTreeMap<String, i32> {
    BTreeMap::from([
        ("heart_rate".to_string(), HEART_RATE_CONCEPT),
        ("lactate".to_string(), LACTATE_CONCEPT),
    ])
}

fn medications() -> Vec<String> {
    vec!["propofol".to_string()]
}

/// Vocabulary with every concept the pipeline requires plus one medication
fn write_vocabulary(path: &Path) {
    let required = RequiredConcepts::for_pipeline(&variable_concepts(), &medications());
    let mut rows: Vec<(i32, String, String)> = required
        .ids()
        .map(|id| match id {
            0 => (0, "No matching concept".to_string(), "No matching concept".to_string()),
            8582 => (8582, "centimeter".to_string(), "cm".to_string()),
            9529 => (9529, "kilogram".to_string(), "kg".to_string()),
            9448 => (9448, "year".to_string(), "a".to_string()),
            8541 => (8541, "per minute".to_string(), "/min".to_string()),
            other => (other, format!("concept {other}"), other.to_string()),
        })
        .collect();
    rows.push((PROPOFOL_CONCEPT, "propofol".to_string(), "8782".to_string()));
    rows.push((1_000_001, "unrelated".to_string(), "x".to_string()));

    let n = rows.len();
    write_table(
        path,
        vec![
            (
                "concept_id",
                Arc::new(Int32Array::from(rows.iter().map(|r| r.0).collect::<Vec<_>>())) as ArrayRef,
            ),
            (
                "concept_name",
                Arc::new(StringArray::from(
                    rows.iter().map(|r| r.1.clone()).collect::<Vec<_>>(),
                )) as ArrayRef,
            ),
            ("domain_id", strs(&vec![Some("Metadata"); n])),
            ("vocabulary_id", strs(&vec![Some("Test"); n])),
            ("concept_class_id", strs(&vec![Some("Test"); n])),
            ("standard_concept", strs(&vec![Some("S"); n])),
            (
                "concept_code",
                Arc::new(StringArray::from(
                    rows.iter().map(|r| r.2.clone()).collect::<Vec<_>>(),
                )) as ArrayRef,
            ),
        ],
    );
}

/// Two admissions: A (p1, dies after 48 h) and B (p2, survives)
fn write_labels(path: &Path) {
    write_table(
        path,
        vec![
            ("patient", strs(&[Some("A"), Some("B")])),
            ("uniquepid", strs(&[Some("p1"), Some("p2")])),
            ("sex", floats(&[Some(1.0), Some(0.0)])),
            ("raw_age", floats(&[Some(42.0), Some(70.0)])),
            ("raw_weight", floats(&[Some(80.0), Some(60.0)])),
            ("raw_height", floats(&[Some(170.0), Some(165.0)])),
            ("lengthofstay", floats(&[Some(48.0), Some(24.0)])),
            ("mortality", Arc::new(Int64Array::from(vec![1, 0])) as ArrayRef),
            ("origin", strs(&[Some("Home"), Some("Emergency Department")])),
            ("discharge_location", strs(&[Some("Overleden"), Some("home")])),
            ("care_site", strs(&[Some("Amsterdam University Medical Center"), Some("73")])),
            ("unit_type", strs(&[Some("ICU"), Some("MICU")])),
            ("source_dataset", strs(&[Some("amsterdam"), Some("eicu")])),
        ],
    );
}

fn write_inputs(data_dir: &Path) {
    write_vocabulary(&data_dir.join("OMOP_vocabulary/CONCEPT.parquet"));
    write_labels(&data_dir.join("preprocessed_labels.parquet"));

    let ts = data_dir.join("formatted_timeseries");
    write_table(
        &ts.join("A.parquet"),
        vec![
            ("patient", strs(&[Some("A"), Some("A")])),
            ("time", floats(&[Some(0.0), Some(3600.0)])),
            ("heart_rate", floats(&[Some(80.0), Some(82.0)])),
            ("lactate", floats(&[None, Some(1.2)])),
        ],
    );
    write_table(
        &ts.join("B.parquet"),
        vec![
            ("patient", strs(&[Some("B"), Some("Z")])),
            ("time", floats(&[Some(1800.0), Some(60.0)])),
            ("heart_rate", floats(&[Some(90.0), Some(70.0)])),
        ],
    );

    let med = data_dir.join("formatted_medications");
    write_table(
        &med.join("A.parquet"),
        vec![
            ("patient", strs(&[Some("A")])),
            ("variable", strs(&[Some("propofol")])),
            ("start", floats(&[Some(0.0)])),
            ("end", floats(&[Some(3600.0)])),
        ],
    );
    write_table(
        &med.join("B.parquet"),
        vec![
            ("patient", strs(&[Some("B")])),
            ("variable", strs(&[Some("heparin")])),
            ("start", floats(&[Some(600.0)])),
            ("end", floats(&[Some(7200.0)])),
        ],
    );
}

/// Write all inputs below `data_dir` and return a matching configuration
pub fn fixture(data_dir: &Path) -> PipelineConfig {
    write_inputs(data_dir);
    let mut config = PipelineConfig::new(data_dir);
    config.n_chunks = 2;
    config.workers = 2;
    config.variable_concepts = variable_concepts();
    config.medications = medications();
    config
}

/// Header and rows of an exported CSV table
pub fn read_csv(path: &Path) -> (Vec<String>, Vec<Vec<String>>) {
    let text = std::fs::read_to_string(path).unwrap();
    let mut lines = text.lines();
    let header = lines
        .next()
        .unwrap()
        .split(';')
        .map(str::to_string)
        .collect();
    let rows = lines
        .map(|line| line.split(';').map(str::to_string).collect())
        .collect();
    (header, rows)
}

/// Values of one CSV column
pub fn csv_column(path: &Path, column: &str) -> Vec<String> {
    let (header, rows) = read_csv(path);
    let idx = header.iter().position(|h| h == column).unwrap();
    rows.into_iter().map(|mut row| row.swap_remove(idx)).collect()
}

/// All batches of every chunk file of a table, with the chunk index of each file
pub fn read_chunks(output_dir: &Path, table: &str) -> Vec<(usize, RecordBatch)> {
    let dir = output_dir.join(table);
    let mut files: Vec<PathBuf> = std::fs::read_dir(&dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .filter(|p| p.extension().is_some_and(|e| e == "parquet"))
        .collect();
    files.sort();
    files
        .into_iter()
        .flat_map(|path| {
            let stem = path.file_stem().unwrap().to_string_lossy().to_string();
            let chunk: usize = stem.rsplit('_').next().unwrap().parse().unwrap();
            read_parquet(&path, None)
                .unwrap()
                .into_iter()
                .map(move |batch| (chunk, batch))
        })
        .collect()
}

/// Values of an Int64 column over batches
pub fn i64_values(batches: &[(usize, RecordBatch)], column: &str) -> Vec<i64> {
    batches
        .iter()
        .flat_map(|(_, batch)| {
            let array = batch
                .column_by_name(column)
                .unwrap()
                .as_any()
                .downcast_ref::<Int64Array>()
                .unwrap()
                .clone();
            array.values().to_vec()
        })
        .collect()
}

/// Non-null values of a Utf8 column over batches
pub fn string_values(batches: &[(usize, RecordBatch)], column: &str) -> Vec<String> {
    batches
        .iter()
        .flat_map(|(_, batch)| {
            let array = batch
                .column_by_name(column)
                .unwrap()
                .as_any()
                .downcast_ref::<StringArray>()
                .unwrap()
                .clone();
            array
                .iter()
                .flatten()
                .map(str::to_string)
                .collect::<Vec<_>>()
        })
        .collect()
}
