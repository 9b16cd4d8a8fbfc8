mod display;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use pesi_core::config::{
    DEFAULT_BASE_URL, DEFAULT_CHECKPOINT_ROOT, DEFAULT_OUTPUT_ROOT, DEFAULT_REGISTRY,
};
use pesi_core::{DistrictRegistry, RunConfig, RunMode};
use pesi_fetch::{PageFetcher, RecordExtractor};
use pesi_runner::{RunOrchestrator, RunPlan};
use pesi_store::{CheckpointStore, OutputWriter};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pesi", version, about = "Resumable fetcher for district court pesi lists")]
struct Cli {
    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch every pending (district, date) in the window
    Run(RunArgs),

    /// Show checkpoint progress per district
    Status {
        /// Checkpoint directory
        #[arg(long, env = "PESI_CHECKPOINTS", default_value = DEFAULT_CHECKPOINT_ROOT)]
        checkpoints: PathBuf,

        /// Also list failed units with their reasons
        #[arg(long)]
        failed: bool,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Mode {
    Production,
    /// First district only, five days
    Debug,
}

#[derive(Args, Debug)]
struct RunArgs {
    #[arg(long, env = "PESI_MODE", value_enum, default_value_t = Mode::Production)]
    mode: Mode,

    /// Trailing days to request per district
    #[arg(long, env = "PESI_WINDOW", default_value_t = 30)]
    window: u32,

    /// Days between today (Kathmandu) and the newest requested date
    #[arg(long, env = "PESI_OFFSET_DAYS", default_value_t = 2)]
    offset_days: u32,

    /// District registry JSON
    #[arg(long, env = "PESI_REGISTRY", default_value = DEFAULT_REGISTRY)]
    registry: PathBuf,

    #[arg(long, env = "PESI_BASE_URL", default_value = DEFAULT_BASE_URL)]
    base_url: String,

    /// Output root; artifacts go under `court-cases/`
    #[arg(long, env = "PESI_OUTPUT", default_value = DEFAULT_OUTPUT_ROOT)]
    output: PathBuf,

    #[arg(long, env = "PESI_CHECKPOINTS", default_value = DEFAULT_CHECKPOINT_ROOT)]
    checkpoints: PathBuf,

    /// Per-request timeout in seconds
    #[arg(long, env = "PESI_TIMEOUT", default_value_t = 30)]
    timeout: u64,

    /// Districts fetched in parallel
    #[arg(long, env = "PESI_CONCURRENCY", default_value_t = 1)]
    concurrency: usize,

    /// Only this district code (repeatable)
    #[arg(long = "district")]
    districts: Vec<String>,
}

impl RunArgs {
    fn into_config(self) -> RunConfig {
        RunConfig {
            mode: match self.mode {
                Mode::Production => RunMode::Production,
                Mode::Debug => RunMode::Debug,
            },
            window_size: self.window,
            offset_days: self.offset_days,
            registry_path: self.registry,
            base_url: self.base_url,
            output_root: self.output,
            checkpoint_root: self.checkpoints,
            request_timeout: Duration::from_secs(self.timeout),
            concurrency: self.concurrency,
            districts: self.districts,
        }
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    tracing::info!("pesi v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Command::Run(args) => run(args.into_config()).await,
        Command::Status {
            checkpoints,
            failed,
        } => status(checkpoints, failed),
    }
}

// ── Commands ──

async fn run(config: RunConfig) -> anyhow::Result<()> {
    config.validate().context("invalid configuration")?;

    let registry = DistrictRegistry::load(&config.registry_path)
        .with_context(|| format!("loading registry {}", config.registry_path.display()))?;
    let plan = RunPlan::resolve(&config, registry, chrono::Utc::now())?;

    let checkpoints = CheckpointStore::open(&config.checkpoint_root).with_context(|| {
        format!(
            "opening checkpoint directory {}",
            config.checkpoint_root.display()
        )
    })?;
    let fetcher = PageFetcher::new(&config.base_url, config.request_timeout)?;
    let orchestrator = RunOrchestrator::new(
        fetcher,
        RecordExtractor::new()?,
        checkpoints,
        OutputWriter::new(&config.output_root),
    )
    .with_concurrency(config.concurrency);

    let summary = orchestrator.run(&plan.districts, &plan.dates).await;
    display::print_summary(&plan, &summary)?;
    Ok(())
}

fn status(checkpoints: PathBuf, show_failed: bool) -> anyhow::Result<()> {
    let store = CheckpointStore::open(&checkpoints)
        .with_context(|| format!("opening checkpoint directory {}", checkpoints.display()))?;
    let partitions = store.partitions()?;
    display::print_status(&partitions, show_failed)?;
    Ok(())
}
