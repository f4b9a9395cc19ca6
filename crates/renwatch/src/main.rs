//! renwatch binary: one reconciliation run over the configured jobs root.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use renwatch::db::Database;
use renwatch::engine::{Reconciler, RunOptions};
use renwatch::notify::SlackGateway;
use renwatch::publish::FtpPublisher;
use renwatch::scanner::JobFolderScanner;
use renwatch::{load_config, RenwatchError};

/// Reconciles render-farm job folders against the image tracking store.
#[derive(Debug, Parser)]
#[command(name = "renwatch", version, about)]
struct Cli {
    /// Path to the JSON configuration file.
    #[arg(short, long, default_value = "renwatch.json")]
    config: PathBuf,

    /// Walk this directory instead of the configured jobs root.
    #[arg(long)]
    jobs_dir: Option<PathBuf>,

    /// Compute and log every decision, then roll the transaction back.
    #[arg(long)]
    dry_run: bool,
}

fn main() -> ExitCode {
    // Bridge `log` macros from the leaf modules into tracing.
    tracing_log::LogTracer::init().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init()
        .ok();

    let cli = Cli::parse();
    info!("Starting renwatch v{}", env!("CARGO_PKG_VERSION"));

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Run aborted: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), RenwatchError> {
    let config = load_config(&cli.config)?;
    let jobs_dir = cli
        .jobs_dir
        .unwrap_or_else(|| PathBuf::from(&config.jobs_directory));

    let db = Database::open(Path::new(&config.database_path))?;
    let publisher = FtpPublisher::from_config(&config.remote)?;
    let gateway = SlackGateway::from_config(&config.chat)?;

    let scanner = JobFolderScanner::new(&jobs_dir, &config.exclude_keyword);
    let options = RunOptions::from_config(&config, cli.dry_run);
    let reconciler = Reconciler::new(&db, &publisher, &gateway, options);

    let summary = reconciler.run(&scanner)?;
    info!(
        "Run complete: {} folders ({} excluded), {} processed, {} skipped, {} failed, \
         {} notifications, {} previews, {} composites aggregated",
        summary.folders_seen,
        summary.excluded,
        summary.processed,
        summary.skipped,
        summary.failed,
        summary.notifications_sent,
        summary.previews_published,
        summary.composites_aggregated
    );
    Ok(())
}
