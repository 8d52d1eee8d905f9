//! latinepi CLI - Command-line interface
//!
//! Usage:
//!   latinepi extract --input <file> --output <file>
//!   latinepi report <text>
//!   latinepi fix-spacing --input <jsonl> --output <jsonl>
//!   latinepi fix-annotations --input <jsonl> --output <jsonl>
//!   latinepi clean --input <jsonl> --output <jsonl>

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use latinepi_cli::input::{record_id, record_text};
use latinepi_cli::{flatten_entities, read_inscriptions, write_results, FlattenOptions};
use latinepi_core::{AppConfig, LoggingConfig, OutputFormat, TaggerKind};
use latinepi_corpus::{BatchProcessor, BatchStep};
use latinepi_extractor::{HybridOrchestrator, TaggerBackend};

#[derive(Parser)]
#[command(name = "latinepi")]
#[command(about = "Extract structured personal data from Latin funerary inscriptions")]
#[command(version)]
struct Cli {
    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract entities from a CSV or JSON file of inscriptions
    Extract(ExtractArgs),
    /// Print the full extraction report for one inscription as JSON
    Report {
        /// Inscription text
        text: String,
    },
    /// Join words split by digitization and recompute annotation offsets
    FixSpacing(CorpusArgs),
    /// Reconcile corpus annotations with the labelling rules
    FixAnnotations(CorpusArgs),
    /// Spacing repair followed by annotation reconciliation
    Clean(CorpusArgs),
}

#[derive(Args)]
struct ExtractArgs {
    /// Input file (.csv or .json)
    #[arg(long)]
    input: PathBuf,

    /// Output file
    #[arg(long)]
    output: PathBuf,

    /// Output format: json or csv
    #[arg(long)]
    output_format: Option<OutputFormat>,

    /// Minimum confidence for an entity to be written (0.0-1.0)
    #[arg(long)]
    confidence_threshold: Option<f32>,

    /// Keep entities below the threshold and mark them ambiguous
    #[arg(long)]
    flag_ambiguous: bool,

    /// Skip the morphology phase
    #[arg(long)]
    no_morphology: bool,

    /// Run the dependency phase
    #[arg(long)]
    dependencies: bool,

    /// Tagging backend: rule or none
    #[arg(long)]
    tagger: Option<TaggerKind>,
}

#[derive(Args)]
struct CorpusArgs {
    /// Input corpus (JSON Lines)
    #[arg(long)]
    input: PathBuf,

    /// Output corpus (JSON Lines)
    #[arg(long)]
    output: PathBuf,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => AppConfig::from_file(path)?,
        None => AppConfig::default(),
    }
    .with_env_override()?;

    if let Commands::Extract(args) = &cli.command {
        apply_extract_flags(&mut config, args);
    }
    config.validate()?;

    init_logging(&config.logging);

    match cli.command {
        Commands::Extract(args) => extract(&config, &args),
        Commands::Report { text } => {
            let report = orchestrator(&config, &tagger_backend(&config)).report(&text);
            println!("{}", report.to_json_pretty()?);
            Ok(())
        }
        Commands::FixSpacing(args) => run_corpus(BatchStep::FixSpacing, &args),
        Commands::FixAnnotations(args) => run_corpus(BatchStep::FixAnnotations, &args),
        Commands::Clean(args) => run_corpus(BatchStep::Clean, &args),
    }
}

/// Command-line flags take precedence over file and environment
fn apply_extract_flags(config: &mut AppConfig, args: &ExtractArgs) {
    if let Some(format) = args.output_format {
        config.output.format = format;
    }
    if let Some(threshold) = args.confidence_threshold {
        config.output.confidence_threshold = threshold;
    }
    if args.flag_ambiguous {
        config.output.flag_ambiguous = true;
    }
    if args.no_morphology {
        config.extraction.use_morphology = false;
    }
    if args.dependencies {
        config.extraction.use_dependencies = true;
    }
    if let Some(tagger) = args.tagger {
        config.extraction.tagger = tagger;
    }
}

fn init_logging(config: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if config.json_format {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn orchestrator(config: &AppConfig, backend: &Arc<TaggerBackend>) -> HybridOrchestrator {
    HybridOrchestrator::from_config(&config.extraction, Arc::clone(backend))
}

fn tagger_backend(config: &AppConfig) -> Arc<TaggerBackend> {
    Arc::new(TaggerBackend::from_kind(config.extraction.tagger))
}

fn extract(config: &AppConfig, args: &ExtractArgs) -> anyhow::Result<()> {
    let inscriptions = read_inscriptions(&args.input)
        .with_context(|| format!("Could not read input file '{}'", args.input.display()))?;

    let backend = tagger_backend(config);
    let orchestrator = orchestrator(config, &backend);
    let options = FlattenOptions::from(&config.output);
    let total = inscriptions.len();
    println!("Processing {total} inscription(s)...");

    let mut rows = Vec::with_capacity(total);
    for (i, inscription) in inscriptions.iter().enumerate() {
        let number = i + 1;
        let Some(text) = record_text(inscription) else {
            tracing::warn!("Inscription {} has no 'text' field, skipping", number);
            continue;
        };

        let entities = orchestrator.extract(text);
        rows.push(flatten_entities(record_id(inscription), &entities, options));
        println!("Processed inscription {number}/{total}");
    }

    // Loaded only if a tagger-backed phase ran
    tracing::debug!("Tagging backend loaded: {}", backend.is_loaded());

    write_results(&args.output, &rows, config.output.format)
        .with_context(|| format!("Could not write to output file '{}'", args.output.display()))?;

    println!(
        "Successfully processed {} inscription(s) -> '{}'",
        rows.len(),
        args.output.display()
    );
    Ok(())
}

fn run_corpus(step: BatchStep, args: &CorpusArgs) -> anyhow::Result<()> {
    let stats = BatchProcessor::new(step)
        .process_file(&args.input, &args.output)
        .with_context(|| format!("{} failed on '{}'", step, args.input.display()))?;

    println!(
        "Processed {} record(s), {} modified -> '{}'",
        stats.total_records,
        stats.modified_records,
        args.output.display()
    );
    Ok(())
}
