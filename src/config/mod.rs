//! Configuration for the OMOP conversion pipeline.
//!
//! A [`PipelineConfig`] can be built from defaults, loaded from a JSON file, and then
//! adjusted through `OMOP_*` environment variables.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::{OmopError, Result};
use crate::vocabulary::constants;

/// Default number of chunks the fact-table inputs are split into
pub const DEFAULT_N_CHUNKS: usize = 100;

/// Default seed for the reproducible shuffle of input files
pub const DEFAULT_SHUFFLE_SEED: u64 = 974;

/// Configuration for the conversion pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Root directory of the harmonized dataset
    pub data_dir: PathBuf,
    /// Harmonized label table, relative to `data_dir` unless absolute
    pub labels_file: PathBuf,
    /// Directory of formatted time-series parquet files
    pub timeseries_dir: PathBuf,
    /// Directory of formatted medication parquet files
    pub medications_dir: PathBuf,
    /// Vocabulary CONCEPT table (parquet)
    pub vocabulary_file: PathBuf,
    /// JSON object mapping variable names to concept ids
    pub variable_catalog_file: Option<PathBuf>,
    /// Output directory; defaults to `<data_dir>/OMOP-CDM`
    pub output_dir: Option<PathBuf>,
    /// Number of chunks for MEASUREMENT and DRUG_EXPOSURE
    pub n_chunks: usize,
    /// Seed for shuffling input file paths before chunking
    pub shuffle_seed: u64,
    /// First chunk to build; earlier chunks are taken as already exported
    pub start_chunk: usize,
    /// Synthetic calendar anchor for all relative offsets
    pub reference_date: NaiveDate,
    /// `valid_end_date` of generated source-to-concept mappings
    pub end_date: NaiveDate,
    /// Offset from admission at which admission covariates are recorded
    pub admission_offset_seconds: f64,
    /// Time-series variables emitted as measurements
    pub timeseries_variables: Vec<String>,
    /// Label-table covariates emitted as measurements at the admission offset
    pub admission_variables: Vec<String>,
    /// Medication names whose vocabulary concepts are kept
    pub medications: Vec<String>,
    /// Variable name to concept id, merged with `variable_catalog_file`
    pub variable_concepts: BTreeMap<String, i32>,
    /// Free-text admission origin to visit-type key
    pub admission_origins: BTreeMap<String, String>,
    /// Free-text unit type to visit-type key
    pub unit_types: BTreeMap<String, String>,
    /// Source dataset tag to country code
    pub dataset_countries: BTreeMap<String, String>,
    /// Worker threads for measurement chunks
    pub workers: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("."),
            labels_file: PathBuf::from("preprocessed_labels.parquet"),
            timeseries_dir: PathBuf::from("formatted_timeseries"),
            medications_dir: PathBuf::from("formatted_medications"),
            vocabulary_file: PathBuf::from("OMOP_vocabulary/CONCEPT.parquet"),
            variable_catalog_file: None,
            output_dir: None,
            n_chunks: DEFAULT_N_CHUNKS,
            shuffle_seed: DEFAULT_SHUFFLE_SEED,
            start_chunk: 0,
            reference_date: NaiveDate::from_ymd_opt(2023, 1, 1).unwrap_or_default(),
            end_date: NaiveDate::from_ymd_opt(2099, 12, 31).unwrap_or_default(),
            admission_offset_seconds: 0.0,
            timeseries_variables: constants::TIMESERIES_VARIABLES
                .iter()
                .map(ToString::to_string)
                .collect(),
            admission_variables: constants::ADMISSION_VARIABLES
                .iter()
                .map(ToString::to_string)
                .collect(),
            medications: Vec::new(),
            variable_concepts: BTreeMap::new(),
            admission_origins: owned_pairs(constants::ADMISSION_ORIGINS),
            unit_types: owned_pairs(constants::UNIT_TYPES),
            dataset_countries: owned_pairs(constants::DATASET_COUNTRIES),
            workers: num_cpus::get(),
        }
    }
}

fn owned_pairs(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect()
}

impl PipelineConfig {
    /// Create a configuration rooted at `data_dir` with default settings
    #[must_use]
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Self::default()
        }
    }

    /// Load a configuration from a JSON file; absent keys take their defaults
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| OmopError::io(path, e))?;
        let config: Self = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Apply `OMOP_N_CHUNKS`, `OMOP_START_CHUNK`, `OMOP_WORKERS` and `OMOP_OUTPUT_DIR`
    /// overrides
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(n) = env_usize("OMOP_N_CHUNKS") {
            self.n_chunks = n;
        }
        if let Some(n) = env_usize("OMOP_START_CHUNK") {
            self.start_chunk = n;
        }
        if let Some(n) = env_usize("OMOP_WORKERS") {
            self.workers = n;
        }
        if let Ok(dir) = std::env::var("OMOP_OUTPUT_DIR") {
            self.output_dir = Some(PathBuf::from(dir));
        }
        self
    }

    /// Check settings that would make the pipeline misbehave
    pub fn validate(&self) -> Result<()> {
        if self.n_chunks == 0 {
            return Err(OmopError::Config("n_chunks must be at least 1".to_string()));
        }
        if self.start_chunk >= self.n_chunks {
            return Err(OmopError::Config(format!(
                "start_chunk {} is not below n_chunks {}",
                self.start_chunk, self.n_chunks
            )));
        }
        if self.workers == 0 {
            return Err(OmopError::Config("workers must be at least 1".to_string()));
        }
        if !self.admission_offset_seconds.is_finite() || self.admission_offset_seconds < 0.0 {
            return Err(OmopError::Config(format!(
                "admission_offset_seconds must be a non-negative number, got {}",
                self.admission_offset_seconds
            )));
        }
        if self.end_date < self.reference_date {
            return Err(OmopError::Config(format!(
                "end_date {} precedes reference_date {}",
                self.end_date, self.reference_date
            )));
        }
        Ok(())
    }

    /// Reference date at midnight
    #[must_use]
    pub fn reference_datetime(&self) -> NaiveDateTime {
        self.reference_date.and_time(NaiveTime::MIN)
    }

    /// Full path of the label table
    #[must_use]
    pub fn labels_path(&self) -> PathBuf {
        self.resolve(&self.labels_file)
    }

    /// Full path of the time-series directory
    #[must_use]
    pub fn timeseries_path(&self) -> PathBuf {
        self.resolve(&self.timeseries_dir)
    }

    /// Full path of the medication directory
    #[must_use]
    pub fn medications_path(&self) -> PathBuf {
        self.resolve(&self.medications_dir)
    }

    /// Full path of the vocabulary table
    #[must_use]
    pub fn vocabulary_path(&self) -> PathBuf {
        self.resolve(&self.vocabulary_file)
    }

    /// Directory the CDM tables are written to
    #[must_use]
    pub fn output_path(&self) -> PathBuf {
        self.output_dir
            .as_ref()
            .map_or_else(|| self.data_dir.join("OMOP-CDM"), |dir| self.resolve(dir))
    }

    /// Variable concepts from the catalog file merged with the inline table
    ///
    /// Inline entries win over catalog entries with the same name.
    pub fn load_variable_concepts(&self) -> Result<BTreeMap<String, i32>> {
        let mut concepts = BTreeMap::new();
        if let Some(file) = &self.variable_catalog_file {
            let path = self.resolve(file);
            let content = std::fs::read_to_string(&path).map_err(|e| OmopError::io(&path, e))?;
            let catalog: BTreeMap<String, Option<i32>> = serde_json::from_str(&content)?;
            // Variables without a concept stay unmapped.
            concepts.extend(catalog.into_iter().filter_map(|(k, v)| v.map(|id| (k, id))));
        }
        concepts.extend(self.variable_concepts.iter().map(|(k, v)| (k.clone(), *v)));
        Ok(concepts)
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.data_dir.join(path)
        }
    }
}

fn env_usize(name: &str) -> Option<usize> {
    std::env::var(name).ok().and_then(|s| s.parse::<usize>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = PipelineConfig::new("/data/blended");
        config.validate().unwrap();
        assert_eq!(config.n_chunks, 100);
        assert_eq!(config.shuffle_seed, 974);
        assert_eq!(
            config.reference_date,
            NaiveDate::from_ymd_opt(2023, 1, 1).unwrap()
        );
        assert_eq!(
            config.output_path(),
            PathBuf::from("/data/blended/OMOP-CDM")
        );
        assert_eq!(
            config.labels_path(),
            PathBuf::from("/data/blended/preprocessed_labels.parquet")
        );
    }

    #[test]
    fn test_zero_chunks_rejected() {
        let config = PipelineConfig {
            n_chunks: 0,
            ..PipelineConfig::default()
        };
        assert!(matches!(config.validate(), Err(OmopError::Config(_))));
    }

    #[test]
    fn test_start_chunk_must_be_a_chunk() {
        let config = PipelineConfig {
            n_chunks: 4,
            start_chunk: 4,
            ..PipelineConfig::default()
        };
        assert!(matches!(config.validate(), Err(OmopError::Config(_))));
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: PipelineConfig =
            serde_json::from_str(r#"{"data_dir": "/tmp/x", "n_chunks": 4}"#).unwrap();
        assert_eq!(config.n_chunks, 4);
        assert_eq!(config.shuffle_seed, DEFAULT_SHUFFLE_SEED);
        assert_eq!(config.admission_origins.get("Home").map(String::as_str), Some("home"));
    }

    #[test]
    fn test_catalog_merges_with_inline_concepts() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("catalog.json"),
            r#"{"heart_rate": 3027018, "ventilator_mode": null, "lactate": 1}"#,
        )
        .unwrap();
        let mut config = PipelineConfig::new(dir.path());
        config.variable_catalog_file = Some(PathBuf::from("catalog.json"));
        config.variable_concepts.insert("lactate".to_string(), 3047181);

        let concepts = config.load_variable_concepts().unwrap();
        assert_eq!(concepts.get("heart_rate"), Some(&3027018));
        assert_eq!(concepts.get("lactate"), Some(&3047181));
        assert!(!concepts.contains_key("ventilator_mode"));
    }
}
