//! chirp — bird-call ingestion and spectrogram derivation pipeline.
//!
//! Configuration comes from the environment (and `.env`); see
//! `chirp_core::Config`. Exits non-zero only on fatal errors (configuration,
//! catalog persistence); per-item failures are reported in the run summary.

use std::sync::Arc;

use anyhow::Context;
use chirp_catalog::{RecordingCatalog, SpectrogramCatalog};
use chirp_cli::init_tracing;
use chirp_core::{Config, RunSummary};
use chirp_pipeline::{Ingestor, SpectrogramDeriver};
use chirp_provider::XenoCantoProvider;
use chirp_storage::{create_storage, Storage};
use clap::{Parser, Subcommand};
use serde::Serialize;

#[derive(Parser)]
#[command(name = "chirp", about = "Bird-call ingestion and spectrogram pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Species common names (comma-separated), overriding TARGET_SPECIES
    #[arg(long, global = true, value_delimiter = ',')]
    species: Vec<String>,

    /// Recordings per species, overriding RECORDINGS_PER_SPECIES
    #[arg(long, global = true)]
    count: Option<usize>,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch metadata and audio for the target species
    Ingest,
    /// Derive mel-spectrogram images for stored recordings
    Derive,
    /// Run both stages: ingest, then derive
    Run,
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize run summary")?;
    println!("{}", out);
    Ok(())
}

async fn ingest(
    config: &Config,
    storage: Arc<dyn Storage>,
    summary: &mut RunSummary,
) -> anyhow::Result<RecordingCatalog> {
    let provider = Arc::new(XenoCantoProvider::from_config(config)?);
    let ingestor = Ingestor::new(provider, storage.clone(), config);

    let mut catalog = RecordingCatalog::load(storage.as_ref())
        .await
        .context("Load recording catalog")?;
    let stage = ingestor
        .ingest(&config.target_species, &mut catalog)
        .await
        .context("Ingest stage failed")?;

    summary.ingest = Some(stage);
    Ok(catalog)
}

async fn derive(
    config: &Config,
    storage: Arc<dyn Storage>,
    recordings: &RecordingCatalog,
    summary: &mut RunSummary,
) -> anyhow::Result<()> {
    let deriver = SpectrogramDeriver::new(storage.clone(), config);

    let mut catalog = SpectrogramCatalog::load(storage.as_ref())
        .await
        .context("Load spectrogram catalog")?;
    let stage = deriver
        .derive(recordings, &mut catalog)
        .await
        .context("Derive stage failed")?;

    summary.derive = Some(stage);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    let mut config = Config::from_env().context("Failed to load configuration")?;
    if !cli.species.is_empty() {
        config.target_species = cli.species.clone();
    }
    if let Some(count) = cli.count {
        config.recordings_per_species = count;
    }
    if config.target_species.is_empty() {
        anyhow::bail!("No target species. Set TARGET_SPECIES or pass --species");
    }

    let storage = create_storage(&config)
        .await
        .context("Failed to create storage backend")?;

    let mut summary = RunSummary::new(config.target_species.clone());

    match cli.command {
        Commands::Ingest => {
            ingest(&config, storage.clone(), &mut summary).await?;
        }
        Commands::Derive => {
            let recordings = RecordingCatalog::load(storage.as_ref())
                .await
                .context("Load recording catalog")?;
            derive(&config, storage.clone(), &recordings, &mut summary).await?;
        }
        Commands::Run => {
            let recordings = ingest(&config, storage.clone(), &mut summary).await?;
            derive(&config, storage.clone(), &recordings, &mut summary).await?;
        }
    }

    print_json(&summary)
}
