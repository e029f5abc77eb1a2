//! # econ_report
//!
//! Command-line front end: run a batch analysis into an artifact bundle, or
//! answer questions from a saved bundle.

use clap::{Parser, Subcommand};
use econ_analysis::store::ArtifactStore;
use econ_analysis::{
    AnalysisConfig, AnalysisRunner, CsvSeriesRepository, JsonFileStore, RetryingRepository,
};
use econ_insight::{KnowledgeBaseBuilder, MetadataCatalog, QueryEngine};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

type CliResult<T> = std::result::Result<T, Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(name = "econ_report")]
#[command(about = "Economic indicator forecasting, anomaly and correlation report", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyse series and save the artifact bundle
    Analyze {
        /// Observations CSV with date,value,series_id columns
        #[arg(short, long)]
        data: PathBuf,

        /// Analysis configuration (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Series to analyse (default: all)
        #[arg(short, long, num_args = 1..)]
        series: Vec<String>,

        /// Where to write the bundle
        #[arg(short, long)]
        out: PathBuf,
    },

    /// Answer questions from a saved bundle
    Ask {
        /// Observations CSV with date,value,series_id columns
        #[arg(short, long)]
        data: PathBuf,

        /// Bundle written by `analyze`
        #[arg(short, long)]
        bundle: PathBuf,

        /// Series metadata catalog (TOML)
        #[arg(long)]
        catalog: Option<PathBuf>,

        /// Analysis configuration (TOML), for the retry policy
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// One or more questions
        #[arg(required = true)]
        question: Vec<String>,
    },
}

fn load_config(path: Option<&PathBuf>) -> CliResult<AnalysisConfig> {
    Ok(match path {
        Some(path) => AnalysisConfig::from_file(path)?,
        None => AnalysisConfig::default(),
    })
}

fn run_analyze(
    data: PathBuf,
    config: Option<PathBuf>,
    series: Vec<String>,
    out: PathBuf,
) -> CliResult<()> {
    let config = load_config(config.as_ref())?;
    let repository = RetryingRepository::new(
        CsvSeriesRepository::from_path(&data)?,
        config.retry.clone(),
    );

    let runner = AnalysisRunner::new(config)?;
    let session = runner.run(&repository, &series)?;
    for failure in &session.failures {
        warn!(
            "{} skipped at {:?}: {}",
            failure.series_id, failure.stage, failure.error
        );
    }

    JsonFileStore::new(&out).save(&session.artifacts)?;
    info!("Bundle written to {}", out.display());
    println!(
        "{} forecasts, {} anomaly reports, {} failures",
        session.forecasts().len(),
        session.anomalies().len(),
        session.failures.len()
    );
    Ok(())
}

fn run_ask(
    data: PathBuf,
    bundle: PathBuf,
    catalog: Option<PathBuf>,
    config: Option<PathBuf>,
    questions: Vec<String>,
) -> CliResult<()> {
    let config = load_config(config.as_ref())?;
    let catalog = match catalog {
        Some(path) => MetadataCatalog::from_file(path)?,
        None => MetadataCatalog::default(),
    };
    let repository =
        RetryingRepository::new(CsvSeriesRepository::from_path(&data)?, config.retry);
    let artifacts = JsonFileStore::new(&bundle).load()?;

    let knowledge = KnowledgeBaseBuilder::new(catalog, &artifacts).build(&repository)?;
    let engine = QueryEngine::new(&knowledge);
    for question in &questions {
        let record = engine.answer(question);
        println!("{}", serde_json::to_string_pretty(&record)?);
    }
    Ok(())
}

fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "econ_report=info,econ_analysis=info,econ_insight=info".into()),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Analyze {
            data,
            config,
            series,
            out,
        } => run_analyze(data, config, series, out),

        Commands::Ask {
            data,
            bundle,
            catalog,
            config,
            question,
        } => run_ask(data, bundle, catalog, config, question),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
