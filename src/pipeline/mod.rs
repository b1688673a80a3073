//! The conversion pipeline.
//!
//! [`OmopConverter`] runs the stages in dependency order: reference data, identifiers,
//! dimension tables, person and visit tables, then the fact tables. Every stage
//! exports its table as soon as it is built. MEASUREMENT and DRUG_EXPOSURE are
//! processed one chunk of input files at a time and never held in memory as a whole.

pub mod chunks;
pub mod report;

use std::path::{Path, PathBuf};
use std::time::Instant;

use arrow::datatypes::{DataType, Field, Schema};
use itertools::Itertools;
use rayon::prelude::*;

use crate::cdm::{
    self, BuiltTable, CareSiteLookup, CdmRecord, DrugExposureRecord, LocationLookup,
    MeasurementContext, MeasurementRecord, ResolutionGaps, VisitResolver,
};
use crate::config::PipelineConfig;
use crate::error::{OmopError, Result};
use crate::identifiers::{IdRange, RunningIdAllocator, StridedIdAllocator};
use crate::models::labels::VISIT_KEY_COLUMN;
use crate::models::{LabelTable, VisitIndex};
use crate::utils::io::{read_parquet_files, write_csv, write_parquet};
use crate::utils::logging::{
    create_chunk_progress_bar, finish_progress_bar, log_operation_start, log_skip,
};
use crate::vocabulary::{ConceptMapping, ConceptRegistry, RequiredConcepts, load_vocabulary};

pub use chunks::{ChunkPlan, chunk_path, max_exported_id};
pub use report::{ConversionReport, REPORT_FILE, TableReport};

/// Reference data shared, read-only, by every builder
#[derive(Debug)]
pub struct ReferenceData {
    /// Concepts used by the conversion
    pub registry: ConceptRegistry,
    /// Source code to concept mapping
    pub mapping: ConceptMapping,
}

/// Runs the conversion described by a [`PipelineConfig`]
#[derive(Debug, Clone)]
pub struct OmopConverter {
    config: PipelineConfig,
}

struct ChunkOutcome {
    chunk: usize,
    rows: usize,
    gaps: ResolutionGaps,
    skipped_variables: Vec<String>,
}

impl OmopConverter {
    /// Create a converter, rejecting invalid configurations
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// The configuration in use
    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run every stage and write all tables, starting the chunked tables at the
    /// configured start chunk
    pub fn run(&self) -> Result<ConversionReport> {
        self.run_from(self.config.start_chunk)
    }

    /// Run every stage, starting the chunked tables at `start_chunk`
    ///
    /// Chunks before `start_chunk` are assumed to be exported by an earlier run; drug
    /// exposure ids continue after the largest id found in them.
    pub fn run_from(&self, start_chunk: usize) -> Result<ConversionReport> {
        let start = Instant::now();
        let output_dir = self.config.output_path();
        std::fs::create_dir_all(&output_dir).map_err(|e| OmopError::io(&output_dir, e))?;
        log::info!("Writing OMOP CDM tables to {}", output_dir.display());

        let reference = self.load_reference_data()?;
        let labels = LabelTable::load(&self.config.labels_path())?;
        let visits = VisitIndex::build(labels)?;

        let mut report = ConversionReport::new();
        self.export_tables(&output_dir, &reference, &visits, &mut report)?;
        self.export_measurements(&output_dir, &reference, &visits, start_chunk, &mut report)?;
        self.export_drug_exposures(&output_dir, &reference, &visits, start_chunk, &mut report)?;

        report.write_json(&output_dir.join(REPORT_FILE))?;
        report.log_summary();
        log::info!("Conversion finished in {:?}", start.elapsed());
        Ok(report)
    }

    /// Load the vocabulary and build the registry and the concept mapping
    pub fn load_reference_data(&self) -> Result<ReferenceData> {
        let variable_concepts = self.config.load_variable_concepts()?;
        let vocabulary = load_vocabulary(&self.config.vocabulary_path())?;
        let required = RequiredConcepts::for_pipeline(&variable_concepts, &self.config.medications);
        let registry = ConceptRegistry::load(vocabulary, &required)?;
        let mapping =
            ConceptMapping::for_pipeline(&variable_concepts, &self.config.medications, &registry)?;
        Ok(ReferenceData { registry, mapping })
    }

    /// Build and export every table that is written as a single CSV file
    pub fn export_tables(
        &self,
        output_dir: &Path,
        reference: &ReferenceData,
        visits: &VisitIndex,
        report: &mut ConversionReport,
    ) -> Result<()> {
        let config = &self.config;
        let reference_datetime = config.reference_datetime();

        let locations = cdm::build_locations();
        let location_lookup = LocationLookup::new(&locations.rows);
        let care_sites = cdm::build_care_sites(
            visits,
            &config.unit_types,
            &reference.mapping,
            &location_lookup,
        )?;
        let care_site_lookup = CareSiteLookup::new(&care_sites.rows);

        export_csv(output_dir, &locations, report)?;
        export_csv(output_dir, &care_sites, report)?;
        export_csv(output_dir, &cdm::build_domains(), report)?;
        export_csv(output_dir, &cdm::build_concepts(&reference.registry), report)?;
        export_csv(
            output_dir,
            &cdm::build_source_to_concept_map(
                &reference.mapping,
                config.reference_date,
                config.end_date,
            ),
            report,
        )?;

        let persons = cdm::build_persons(
            visits,
            config.reference_date,
            &config.dataset_countries,
            &location_lookup,
        );
        export_csv(output_dir, &persons, report)?;

        let resolver = VisitResolver {
            mapping: &reference.mapping,
            admission_origins: &config.admission_origins,
            unit_types: &config.unit_types,
            care_sites: &care_site_lookup,
        };
        export_csv(
            output_dir,
            &cdm::build_visits(visits, reference_datetime, resolver),
            report,
        )?;
        export_csv(
            output_dir,
            &cdm::build_deaths(visits, reference_datetime),
            report,
        )?;
        export_csv(
            output_dir,
            &cdm::build_observations(visits, &reference.registry, self.admission_datetime()?)?,
            report,
        )?;
        Ok(())
    }

    fn admission_datetime(&self) -> Result<chrono::NaiveDateTime> {
        let offset = self.config.admission_offset_seconds;
        cdm::time::offset_datetime(self.config.reference_datetime(), Some(offset)).ok_or_else(
            || OmopError::Config(format!("admission offset {offset}s is out of range")),
        )
    }

    /// Build and export the MEASUREMENT chunks on a pool of `workers` threads
    pub fn export_measurements(
        &self,
        output_dir: &Path,
        reference: &ReferenceData,
        visits: &VisitIndex,
        start_chunk: usize,
        report: &mut ConversionReport,
    ) -> Result<()> {
        let table = MeasurementRecord::TABLE;
        let config = &self.config;
        let timeseries_dir = config.timeseries_path();
        log_operation_start("Building measurements from", &timeseries_dir);
        let plan = ChunkPlan::discover(&timeseries_dir, config.shuffle_seed, config.n_chunks)?;
        report.record_resumed_chunks(table, start_chunk.min(plan.len()));

        let ctx = MeasurementContext {
            visits,
            registry: &reference.registry,
            mapping: &reference.mapping,
            reference: config.reference_datetime(),
            admission_offset_seconds: config.admission_offset_seconds,
            timeseries_variables: &config.timeseries_variables,
            admission_variables: &config.admission_variables,
        };
        let ids = StridedIdAllocator::new(IdRange::Measurement.start(), IdRange::Measurement.start());
        let projection = projection(
            [VISIT_KEY_COLUMN, cdm::measurement::TIME_COLUMN]
                .into_iter()
                .chain(config.timeseries_variables.iter().map(String::as_str)),
        );

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.workers)
            .build()
            .map_err(|e| OmopError::Config(format!("cannot start worker pool: {e}")))?;
        log::info!("Processing measurement chunks on {} workers", config.workers);

        let pending = plan.from_chunk(start_chunk).collect_vec();
        let pb = create_chunk_progress_bar(pending.len() as u64, table);
        let outcomes: Vec<Result<Option<ChunkOutcome>>> = pool.install(|| {
            pending
                .into_par_iter()
                .map(|(chunk, files)| {
                    let outcome = if files.is_empty() {
                        Ok(None)
                    } else {
                        measurement_chunk(output_dir, files, chunk, &ids, &ctx, &projection)
                            .map(Some)
                            .map_err(|e| e.in_chunk(table, chunk))
                    };
                    pb.inc(1);
                    outcome
                })
                .collect()
        });
        finish_progress_bar(&pb, Some("measurements done"));

        record_outcomes(table, outcomes, report)
    }

    /// Build and export the DRUG_EXPOSURE chunks in order
    pub fn export_drug_exposures(
        &self,
        output_dir: &Path,
        reference: &ReferenceData,
        visits: &VisitIndex,
        start_chunk: usize,
        report: &mut ConversionReport,
    ) -> Result<()> {
        let table = DrugExposureRecord::TABLE;
        let config = &self.config;
        let medications_dir = config.medications_path();
        log_operation_start("Building drug exposures from", &medications_dir);
        let plan = ChunkPlan::discover(&medications_dir, config.shuffle_seed, config.n_chunks)?;
        report.record_resumed_chunks(table, start_chunk.min(plan.len()));

        let mut allocator = if start_chunk == 0 {
            RunningIdAllocator::new(IdRange::DrugExposure)
        } else {
            let last = max_exported_id(output_dir, table, "drug_exposure_id", start_chunk)?;
            log::info!("Resuming drug exposures at chunk {start_chunk} after id {last:?}");
            RunningIdAllocator::resume(IdRange::DrugExposure, last)
        };
        let projection = projection([VISIT_KEY_COLUMN, "variable", "start", "end"]);

        let pending = plan.from_chunk(start_chunk).collect_vec();
        let pb = create_chunk_progress_bar(pending.len() as u64, table);
        for (chunk, files) in pending {
            pb.inc(1);
            if files.is_empty() {
                log_skip(table, Some(chunk), "no input files");
                report.record_empty_chunk(table);
                continue;
            }
            let outcome = drug_exposure_chunk(
                output_dir,
                files,
                chunk,
                &mut allocator,
                visits,
                &reference.mapping,
                config.reference_datetime(),
                &projection,
            )
            .map_err(|e| e.in_chunk(table, chunk))?;
            report.record_chunk(table, outcome.chunk, outcome.rows, outcome.gaps, &[]);
        }
        finish_progress_bar(&pb, Some("drug exposures done"));
        Ok(())
    }
}

/// Schema naming the columns to read; types are taken from the files
fn projection<'a>(columns: impl IntoIterator<Item = &'a str>) -> Schema {
    Schema::new(
        columns
            .into_iter()
            .map(|name| Field::new(name, DataType::Null, true))
            .collect_vec(),
    )
}

fn export_csv<R: CdmRecord>(
    output_dir: &Path,
    table: &BuiltTable<R>,
    report: &mut ConversionReport,
) -> Result<()> {
    let path = output_dir.join(format!("{}.csv", R::TABLE));
    write_csv(&path, &table.to_record_batch()?)?;
    report.record_table(R::TABLE, table.len(), table.gaps);
    Ok(())
}

fn measurement_chunk(
    output_dir: &Path,
    files: &[PathBuf],
    chunk: usize,
    ids: &StridedIdAllocator,
    ctx: &MeasurementContext<'_>,
    projection: &Schema,
) -> Result<ChunkOutcome> {
    let batches = read_parquet_files(files, Some(projection))?;
    let built = cdm::build_measurements(&batches, chunk, ids, ctx)?;
    drop(batches);
    let batch = built.table.to_record_batch()?;
    write_parquet(
        &chunk_path(output_dir, MeasurementRecord::TABLE, chunk),
        &MeasurementRecord::schema(),
        &[batch],
    )?;
    Ok(ChunkOutcome {
        chunk,
        rows: built.table.len(),
        gaps: built.table.gaps,
        skipped_variables: built.skipped_variables,
    })
}

#[allow(clippy::too_many_arguments)]
fn drug_exposure_chunk(
    output_dir: &Path,
    files: &[PathBuf],
    chunk: usize,
    allocator: &mut RunningIdAllocator,
    visits: &VisitIndex,
    mapping: &ConceptMapping,
    reference: chrono::NaiveDateTime,
    projection: &Schema,
) -> Result<ChunkOutcome> {
    let batches = read_parquet_files(files, Some(projection))?;
    // Ids are only committed once the chunk is written.
    let mut next = *allocator;
    let built = cdm::build_drug_exposures(&batches, chunk, &mut next, visits, mapping, reference)?;
    drop(batches);
    let batch = built.table.to_record_batch()?;
    write_parquet(
        &chunk_path(output_dir, DrugExposureRecord::TABLE, chunk),
        &DrugExposureRecord::schema(),
        &[batch],
    )?;
    *allocator = next;
    Ok(ChunkOutcome {
        chunk,
        rows: built.table.len(),
        gaps: built.table.gaps,
        skipped_variables: Vec::new(),
    })
}

/// Record chunk outcomes in chunk order and surface the first failure
fn record_outcomes(
    table: &str,
    outcomes: Vec<Result<Option<ChunkOutcome>>>,
    report: &mut ConversionReport,
) -> Result<()> {
    let mut first_error = None;
    for outcome in outcomes {
        match outcome {
            Ok(Some(o)) => report.record_chunk(table, o.chunk, o.rows, o.gaps, &o.skipped_variables),
            Ok(None) => report.record_empty_chunk(table),
            Err(e) => {
                log::error!("{e}");
                first_error.get_or_insert(e);
            }
        }
    }
    first_error.map_or(Ok(()), Err)
}

