use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info};

use provider_validator::app::Capabilities;
use provider_validator::config::Config;
use provider_validator::constants::DEFAULT_FUZZY_MATCH_THRESHOLD;
use provider_validator::domain::{DirectoryStatus, ProviderRecord};
use provider_validator::infra::{
    FileRecordOutputAdapter, Fixtures, GoogleGeocoder, HtmlWebsiteScraper, NpiRegistryClient,
};
use provider_validator::pipeline::storage::InMemoryJobStore;
use provider_validator::pipeline::{JobSummary, ValidationPipeline};
use provider_validator::scoring::fuzzy;
use provider_validator::{logging, observability};

#[derive(Parser)]
#[command(name = "provider-validator")]
#[command(about = "Validate and enrich healthcare provider directory records")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a batch of provider records through the validation pipeline
    Validate {
        /// JSON array of provider records
        #[arg(long)]
        input: PathBuf,
        /// Offline lookup data; live registry, geocoding and website adapters are used without it
        #[arg(long)]
        fixtures: Option<PathBuf>,
        /// Write finished records here as NDJSON
        #[arg(long)]
        output: Option<PathBuf>,
        /// TOML configuration file
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long, default_value = "cli-batch")]
        job_name: String,
        /// Print Prometheus metrics after the run
        #[arg(long)]
        metrics: bool,
    },
    /// Score two strings with the fuzzy matcher
    Similarity {
        a: String,
        b: String,
        #[arg(long, default_value_t = DEFAULT_FUZZY_MATCH_THRESHOLD)]
        threshold: f64,
    },
}

fn live_capabilities(config: &Config) -> provider_validator::error::Result<Capabilities> {
    Ok(Capabilities::new(
        Arc::new(NpiRegistryClient::new(&config.registry)?),
        Arc::new(GoogleGeocoder::new(&config.maps)?),
        Arc::new(HtmlWebsiteScraper::new(&config.website)?),
    ))
}

fn load_records(path: &Path) -> Result<Vec<ProviderRecord>, Box<dyn std::error::Error>> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read input '{}': {}", path.display(), e))?;
    Ok(serde_json::from_str(&content)?)
}

fn print_summary(summary: &JobSummary, output: Option<&Path>) {
    println!("\n📊 Job {} ({}):", summary.job_id, summary.status.as_str());
    println!("   Total records: {}", summary.total);
    println!("   Processed: {}", summary.processed);
    println!("   Failed: {}", summary.failed);
    for status in [DirectoryStatus::Validated, DirectoryStatus::NeedsReview, DirectoryStatus::Pending] {
        println!("   {}: {}", status.as_str(), summary.with_status(status));
    }
    if let Some(output) = output {
        println!("   Output file: {}", output.display());
    }
}

async fn run_validate(
    input: PathBuf,
    fixtures: Option<PathBuf>,
    output: Option<PathBuf>,
    config: Option<PathBuf>,
    job_name: String,
    metrics: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if metrics {
        observability::init()?;
    }

    let config = match config {
        Some(path) => Config::load(path)?,
        None => Config::from_env()?,
    };

    let capabilities = match fixtures {
        Some(path) => {
            info!("Using offline fixtures from {}", path.display());
            Fixtures::load(&path)?.into_capabilities()
        }
        None => live_capabilities(&config)?,
    };

    let records = load_records(&input)?;
    let store = Arc::new(InMemoryJobStore::new());
    let job = store.create_job(&job_name, records)?;
    info!("Ingested {} records as job {}", job.total_providers, job.job_id);

    let mut pipeline = ValidationPipeline::new(capabilities, store.clone(), config.pipeline.clone());
    if let Some(path) = &output {
        let adapter = FileRecordOutputAdapter::new(&path.to_string_lossy())?;
        pipeline = pipeline.with_output(Arc::new(adapter));
    }

    let summary = pipeline.run_job(&job.job_id).await?;
    print_summary(&summary, output.as_deref());

    if metrics {
        if let Some(rendered) = observability::render() {
            println!("\n{}", rendered);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    logging::init_logging();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate {
            input,
            fixtures,
            output,
            config,
            job_name,
            metrics,
        } => {
            if let Err(e) = run_validate(input, fixtures, output, config, job_name, metrics).await {
                error!("Validation run failed: {}", e);
                return Err(e);
            }
        }
        Commands::Similarity { a, b, threshold } => {
            let (matched, score) = fuzzy::is_match(&a, &b, threshold);
            println!("similarity: {:.4}", score);
            println!("match (threshold {:.2}): {}", threshold, matched);
        }
    }

    Ok(())
}
