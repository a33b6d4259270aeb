//! docfactory QA runner - Main Entry Point
//!
//! Runs the contract cases against a running docfactory service and prints
//! one JSON report on stdout. Logs go to stderr.
//!
//! Exit codes: 0 all cases passed, 1 a case failed, 2 the harness could not
//! start (bad configuration, unreadable case file, no matching cases).

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use docfactory_qa::catalog;
use docfactory_qa::{CaseRunner, CaseSpec, QaConfig};
use docfactory_qa_common::GateKind;
use tracing::{error, warn};
use tracing_subscriber::EnvFilter;

/// docfactory QA - contract verification for the document generation service
#[derive(Parser)]
#[command(name = "docfactory-qa")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file (defaults apply when missing)
    #[arg(long, default_value = "docfactory-qa.toml", global = true)]
    config: PathBuf,

    /// Base URL of the service under test
    #[arg(long, env = "DOCFACTORY_QA_BASE_URL", global = true)]
    base_url: Option<String>,

    /// Service checkout root (job artifacts, references, sources)
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// Case file or directory; the built-in catalog when omitted
    #[arg(long, global = true)]
    cases: Option<PathBuf>,

    /// Report output directory
    #[arg(long, global = true)]
    output: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format
    #[arg(long, value_enum, default_value = "text", global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand, Clone, Copy)]
enum Commands {
    /// Run every case
    All,
    /// Identical payloads produce identical hashes
    Determinism,
    /// A different variant changes the audit hash
    VariantSensitivity,
    /// One job never rewrites another job's artifacts
    JobIsolation,
    /// Every page has a title and body copy
    ContentCompleteness,
    /// Every page carries enough copy
    CopyDensity,
    /// Multi-page layouts fill their pages
    LayoutDensity,
    /// Internal vocabulary never reaches rendered copy
    InternalTerms,
    /// Exports must use reference-derived style and layout
    ReferenceSource,
    /// A stale reference index blocks export
    ReferenceFreshness,
    /// Tiny page sizes are refused
    ExportSize,
    /// The control page disables export for refused sizes
    UiRuntime,
    /// No hard-coded sample copy in the sources
    DomainCopy,
    /// Print the case catalog as YAML
    List,
}

impl Commands {
    fn gate(self) -> Option<GateKind> {
        match self {
            Commands::All | Commands::List => None,
            Commands::Determinism => Some(GateKind::Determinism),
            Commands::VariantSensitivity => Some(GateKind::VariantSensitivity),
            Commands::JobIsolation => Some(GateKind::JobIsolation),
            Commands::ContentCompleteness => Some(GateKind::ContentCompleteness),
            Commands::CopyDensity => Some(GateKind::CopyDensity),
            Commands::LayoutDensity => Some(GateKind::LayoutDensity),
            Commands::InternalTerms => Some(GateKind::InternalTerms),
            Commands::ReferenceSource => Some(GateKind::ReferenceSource),
            Commands::ReferenceFreshness => Some(GateKind::ReferenceFreshness),
            Commands::ExportSize => Some(GateKind::ExportSize),
            Commands::UiRuntime => Some(GateKind::UiRuntime),
            Commands::DomainCopy => Some(GateKind::DomainCopy),
        }
    }
}

fn init_logging(cli: &Cli) {
    let log_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    match cli.log_format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<QaConfig> {
    let mut config = QaConfig::load(&cli.config)
        .with_context(|| format!("loading configuration from {}", cli.config.display()))?;

    if let Some(base_url) = &cli.base_url {
        config.service.base_url = base_url.clone();
    }
    if let Some(root) = &cli.root {
        config.paths.root = root.clone();
    }
    if let Some(output) = &cli.output {
        config.paths.output_dir = output.clone();
    }

    config.validate().context("invalid configuration")?;
    Ok(config)
}

fn load_cases(cli: &Cli) -> anyhow::Result<Vec<CaseSpec>> {
    match &cli.cases {
        Some(path) => CaseSpec::load_all(path).with_context(|| format!("loading cases from {}", path.display())),
        None => Ok(catalog::builtin()),
    }
}

/// `Ok(passed)` once a report exists; `Err` for setup failures.
async fn run(cli: &Cli) -> anyhow::Result<bool> {
    let config = load_config(cli)?;
    let specs = load_cases(cli)?;

    if let Commands::List = cli.command {
        print!("{}", serde_yaml::to_string(&specs)?);
        return Ok(true);
    }

    let runner = CaseRunner::from_config(&config).context("building runner")?;
    let report = runner
        .run_selected(&specs, cli.command.gate())
        .await
        .context("selecting cases")?;

    println!("{}", report.to_json()?);
    if let Err(e) = runner.write_report(&report) {
        warn!("Could not write report file: {}", e);
    }

    Ok(report.passed)
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli);

    match run(&cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            error!("{:#}", e);
            ExitCode::from(2)
        }
    }
}
