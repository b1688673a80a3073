use std::path::PathBuf;

use anyhow::Context;
use icu_omop::{OmopConverter, PipelineConfig};
use log::info;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut args = std::env::args().skip(1);
    let config = match args.next().map(PathBuf::from) {
        Some(path) => {
            info!("Loading configuration from {}", path.display());
            PipelineConfig::from_json_file(&path)
                .with_context(|| format!("failed to load configuration {}", path.display()))?
        }
        None => {
            info!("No configuration file given, converting the current directory");
            PipelineConfig::default()
        }
    }
    .with_env_overrides();

    let converter = OmopConverter::new(config).context("invalid configuration")?;
    let report = converter.run().context("OMOP conversion failed")?;

    let gaps = report.total_gaps();
    info!(
        "Done: {} unresolved values, {} fact rows dropped without a visit",
        gaps.total(),
        gaps.join_misses
    );
    Ok(())
}
