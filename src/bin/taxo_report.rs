//! Taxonomy alignment report CLI
//!
//! Evaluates every instrument of a portfolio against the reference tables and
//! writes a timestamped report.
//!
//! # Usage
//!
//! ```bash
//! # Credential from the environment (or .env), default input.xlsx / report.xlsx
//! TAXO_APP_KEY=... taxo_report
//!
//! # CSV portfolio, JSON output, sequential run
//! taxo_report $KEY -i portfolio.csv -r out/alignment.json --format json --sequential
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use taxo_align::{
    load_portfolio, load_reference_dir, AppConfig, Credential, MarketDataSource,
    PortfolioRunner, ReportFormat, ReportWriter, SnapshotSource, TaxonomyEngine,
};

#[derive(Parser)]
#[command(name = "taxo_report")]
#[command(version = "0.1.0")]
#[command(about = "EU taxonomy alignment report for a portfolio of instruments")]
#[command(long_about = None)]
struct Cli {
    /// Market-data access key
    #[arg(env = "TAXO_APP_KEY", hide_env_values = true)]
    app_key: String,

    /// Portfolio workbook or CSV with a RIC column
    #[arg(short, long, default_value = "input.xlsx")]
    input: PathBuf,

    /// Report name; files are written next to it with a timestamp prefix
    #[arg(short, long, default_value = "report.xlsx")]
    report: PathBuf,

    /// YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory holding the reference tables
    #[arg(long)]
    reference_dir: Option<PathBuf>,

    /// Directory holding the market-data snapshot
    #[arg(long)]
    market_data_dir: Option<PathBuf>,

    /// Evaluate instruments one at a time
    #[arg(long)]
    sequential: bool,

    /// Report output format
    #[arg(long, value_enum)]
    format: Option<OutputFormat>,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Xlsx,
    Csv,
    Json,
}

impl From<OutputFormat> for ReportFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Xlsx => ReportFormat::Xlsx,
            OutputFormat::Csv => ReportFormat::Csv,
            OutputFormat::Json => ReportFormat::Json,
        }
    }
}

fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into()),
        )
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}: {:#}", "error".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

fn app_config(cli: &Cli) -> Result<AppConfig> {
    let mut config = match &cli.config {
        Some(path) => AppConfig::load_from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => AppConfig::default(),
    };
    if let Some(dir) = &cli.reference_dir {
        config.reference_dir = dir.clone();
    }
    if let Some(dir) = &cli.market_data_dir {
        config.market_data_dir = dir.clone();
    }
    if cli.sequential {
        config.parallel = false;
    }
    if let Some(format) = cli.format {
        config.report_format = format.into();
    }
    Ok(config)
}

fn run(cli: Cli) -> Result<()> {
    let config = app_config(&cli)?;

    println!("{}", "Taxonomy alignment report".bold());
    println!("  Portfolio:  {}", cli.input.display());
    println!("  Reference:  {}", config.reference_dir.display());
    println!("  Snapshot:   {}", config.market_data_dir.display());

    let store = load_reference_dir(&config.reference_dir).context("Failed to load reference tables")?;
    let instruments = load_portfolio(&cli.input)
        .with_context(|| format!("Failed to load portfolio {}", cli.input.display()))?;

    let mut source = SnapshotSource::new(&config.market_data_dir);
    source
        .connect(&Credential::new(cli.app_key.as_str()))
        .context("Failed to open market data")?;
    let inputs = source
        .fetch(&instruments, &store.requested_fields())
        .context("Failed to fetch market data")?;

    let engine = TaxonomyEngine::new(&store, &config.engine);
    let report = PortfolioRunner::new(engine)
        .parallel(config.parallel)
        .run(&inputs);

    let writer = ReportWriter::new(&cli.report, config.report_format);
    match writer.write(&report) {
        Ok(files) => {
            println!(
                "{} Evaluated {} instrument(s)",
                "OK".green(),
                report.len()
            );
            for file in files {
                println!("  {}", file.display());
            }
            Ok(())
        }
        Err(e) if e.is_permission_denied() => {
            println!("Error: Unable to write report file");
            Ok(())
        }
        Err(e) => Err(e).context("Failed to write report"),
    }
}
