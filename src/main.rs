//! mirror-sync - Sync workspace npm packages to a registry mirror
//!
//! This is the command line entry point.

mod reporter;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use console::style;
use tracing::{debug, info};

use mirror_sync::config::{resolve_config, Config, ConfigOverrides};
use mirror_sync::logging::init_tracing;
use mirror_sync::sync::{MirrorClient, ProgressObserver, SilentReporter, SyncReport, SyncRunner};
use mirror_sync::{assert_sync_target, discover_package_names, AppError};

use crate::reporter::TerminalReporter;

/// mirror-sync - Sync workspace npm packages to a registry mirror
#[derive(Parser, Debug)]
#[command(name = "mirror-sync")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Additional packages to sync
    packages: Vec<String>,

    /// The mirror site preset
    #[arg(long)]
    target: Option<String>,

    /// Workspace directory
    #[arg(long)]
    cwd: Option<PathBuf>,

    /// Ignore package.json pattern
    #[arg(long, value_delimiter = ',')]
    ignore: Vec<String>,

    /// Additional packages to sync
    #[arg(long, value_delimiter = ',')]
    include: Vec<String>,

    /// Exclude packages from being synced
    #[arg(long, value_delimiter = ',')]
    exclude: Vec<String>,

    /// Disable default ignore patterns
    #[arg(long)]
    no_default_ignore: bool,

    /// Also sync optionalDependencies from package.json
    #[arg(long)]
    with_optional: bool,

    /// Print the packages that would be synced and exit
    #[arg(long)]
    dry: bool,

    /// Registry host (or base URL) accepting sync requests
    #[arg(long)]
    registry: Option<String>,

    /// Request timeout in milliseconds
    #[arg(long, value_name = "MS")]
    timeout: Option<u64>,

    /// Number of retries per package
    #[arg(long)]
    retry: Option<u32>,

    /// Base retry delay in milliseconds
    #[arg(long, value_name = "MS")]
    retry_delay: Option<u64>,

    /// Maximum number of concurrent requests
    #[arg(long)]
    concurrency: Option<usize>,

    /// Skip packages synced by a previous run
    #[arg(long)]
    cache: bool,

    /// Directory for the sync cache
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Print one line per package
    #[arg(short, long)]
    verbose: bool,

    /// Suppress progress output
    #[arg(long)]
    silent: bool,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,

    /// Log format: compact, pretty or json
    #[arg(long)]
    log_format: Option<String>,

    /// Path to the configuration file
    #[arg(short, long, env = "MIRROR_SYNC_CONFIG")]
    config: Option<PathBuf>,
}

impl Args {
    /// Convert flags into overrides; unset flags keep config file values
    fn overrides(&self) -> ConfigOverrides {
        let flag = |set: bool| set.then_some(true);
        let list = |values: Vec<String>| (!values.is_empty()).then_some(values);

        let mut include = self.packages.clone();
        include.extend(self.include.iter().cloned());

        ConfigOverrides {
            target: self.target.clone(),
            registry: self.registry.clone(),
            timeout_ms: self.timeout,
            retry: self.retry,
            retry_delay_ms: self.retry_delay,
            concurrency: self.concurrency,
            cache: flag(self.cache),
            cache_dir: self.cache_dir.clone(),
            verbose: flag(self.verbose),
            silent: flag(self.silent),
            debug: flag(self.debug),
            cwd: self.cwd.clone(),
            ignore: list(self.ignore.clone()),
            default_ignore: self.no_default_ignore.then_some(false),
            include: list(include),
            exclude: list(self.exclude.clone()),
            with_optional: flag(self.with_optional),
            dry: flag(self.dry),
            log_level: None,
            log_format: self.log_format.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", style(format!("{:#}", e)).red());
            ExitCode::FAILURE
        }
    }
}

/// Result of a run that did not fail
#[derive(Debug)]
enum Outcome {
    NoPackages,
    DryRun(Vec<String>),
    Synced(SyncReport),
}

async fn run(args: Args) -> anyhow::Result<()> {
    // Config files are searched in --cwd or the process directory
    let search_dir = match &args.cwd {
        Some(dir) => dir.clone(),
        None => std::env::current_dir()?,
    };

    let config = resolve_config(&search_dir, args.config.as_deref(), &args.overrides())?;
    init_tracing(&config.logging, config.sync.debug)?;

    debug!(config = ?config, "Resolved configuration");

    assert_sync_target(config.sync.target.as_deref())?;

    let silent = config.sync.silent;
    if !silent {
        println!(
            "\n{} {}",
            style("mirror-sync").magenta().bold(),
            style(format!("v{}", env!("CARGO_PKG_VERSION"))).dim()
        );
        println!("{}", style("--------------").dim());
    }

    let observer: Arc<dyn ProgressObserver> = if silent {
        Arc::new(SilentReporter)
    } else {
        Arc::new(TerminalReporter::new(config.sync.verbose))
    };

    match execute(&config, observer).await? {
        Outcome::NoPackages => {
            if !silent {
                println!("{}", style("No packages detected.").red());
            }
        }
        Outcome::DryRun(packages) => {
            println!("{}", style("\nDry run, sync is skipped.").yellow());
            println!("{}", style("\nDetected packages to sync:").dim());
            for package in &packages {
                println!("- {}", style(package).cyan().bold());
            }
            println!();
        }
        Outcome::Synced(report) => {
            info!(
                synced = report.synced.len(),
                skipped = report.skipped,
                "Sync finished"
            );
            if !silent {
                println!("{}", style("Sync successfully!").green());
            }
        }
    }

    Ok(())
}

/// Discover packages and sync them unless this is a dry run
async fn execute(
    config: &Config,
    observer: Arc<dyn ProgressObserver>,
) -> Result<Outcome, AppError> {
    let packages = discover_package_names(&config.discovery)?;

    if packages.is_empty() {
        return Ok(Outcome::NoPackages);
    }
    if config.dry {
        return Ok(Outcome::DryRun(packages));
    }

    let client = MirrorClient::from_config(&config.sync)?;
    let report = SyncRunner::new(client, &config.sync)?
        .with_observer(observer)
        .run(packages)
        .await?;

    Ok(Outcome::Synced(report))
}
