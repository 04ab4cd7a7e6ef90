//! Command-line interface for ontocheck.

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use colored::*;
use std::collections::BTreeSet;
use std::fs::{File, OpenOptions};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

use crate::audit::{AuditContext, ReportRunner};
use crate::config::{self, Config, DEFAULT_CONFIG_NAMES};
use crate::index::{AnnotatorClient, HttpContext, SearchClient};
use crate::reconcile::{ReconcileSummary, Reconciler};
use crate::report::{self, JsonFileSink, ReportSink, StdoutSink};
use crate::source::SnapshotSource;

/// Exit codes.
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILED: i32 = 1;
pub const EXIT_ERROR: i32 = 2;

/// Environment variable holding a tracing filter directive.
pub const LOG_ENV: &str = "ONTOCHECK_LOG";

/// Configuration template written by `ontocheck init`.
const CONFIG_TEMPLATE: &str = include_str!("templates/ontocheck.yaml");

/// Periodic sanity audit of an ontology repository.
///
/// Checks every ontology's submissions for readiness, status errors,
/// structural emptiness and index consistency, and writes a JSON report
/// keyed by ontology id.
#[derive(Parser)]
#[command(name = "ontocheck")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Flags accepted by every command.
#[derive(Args)]
pub struct GlobalArgs {
    /// Path to configuration YAML file (default: auto-discover)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Append log output to this file instead of stderr
    #[arg(long, global = true)]
    pub log_path: Option<PathBuf>,

    /// Log debug output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Audit ontologies and write the sanity report
    #[command(visible_alias = "run")]
    Report(ReportArgs),
    /// Move upload files into the repository layout and fix recorded paths
    Reconcile(ReconcileArgs),
    /// Create a configuration file from the template
    Init(InitArgs),
}

/// Arguments for the report command.
#[derive(Args)]
pub struct ReportArgs {
    /// Comma-separated ontology ids to audit (default: all)
    #[arg(short, long, value_delimiter = ',')]
    pub ontologies: Vec<String>,

    /// Print the report to stdout instead of writing it
    #[arg(long)]
    pub dry_run: bool,

    /// Log every ontology outcome, not only problems
    #[arg(long)]
    pub log_all: bool,

    /// Report file path (overrides report_path)
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Ontologies audited concurrently (overrides workers)
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Summary format: pretty or json
    #[arg(short, long, default_value = "pretty")]
    pub format: String,

    /// Exit non-zero when any ontology has a problem
    #[arg(long)]
    pub fail_on_problem: bool,
}

/// Arguments for the reconcile command.
#[derive(Args)]
pub struct ReconcileArgs {
    /// Comma-separated ontology ids to reconcile (default: all)
    #[arg(short, long, value_delimiter = ',')]
    pub ontologies: Vec<String>,

    /// Log intended changes without copying or updating anything
    #[arg(long)]
    pub dry_run: bool,

    /// Also log submissions that are already in place
    #[arg(long)]
    pub log_all: bool,

    /// Repository root (overrides repository_path)
    #[arg(long)]
    pub repository: Option<PathBuf>,

    /// Summary format: pretty or json
    #[arg(short, long, default_value = "pretty")]
    pub format: String,
}

/// Arguments for the init command.
#[derive(Args)]
pub struct InitArgs {
    /// Output file path
    #[arg(short, long, default_value = "ontocheck.yaml")]
    pub output: PathBuf,
}

/// Install the global tracing subscriber.
pub fn init_tracing(global: &GlobalArgs) -> anyhow::Result<()> {
    let level = if global.quiet {
        "error"
    } else if global.verbose {
        "debug"
    } else {
        "info"
    };

    let filter = tracing_subscriber::EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let result = match &global.log_path {
        Some(path) => {
            let file = open_log_file(path)?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
        }
        None => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init(),
    };
    result.map_err(|error| anyhow::anyhow!("failed to initialize tracing subscriber: {error}"))
}

fn open_log_file(path: &Path) -> anyhow::Result<File> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create log directory {}", parent.display()))?;
        }
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open log file {}", path.display()))
}

/// Locate the configuration file.
fn discover_config(explicit: Option<&Path>) -> anyhow::Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }
    for name in DEFAULT_CONFIG_NAMES {
        let path = PathBuf::from(name);
        if path.exists() {
            return Ok(path);
        }
    }
    if let Some(dirs) = directories::ProjectDirs::from("", "", "ontocheck") {
        let path = dirs.config_dir().join(DEFAULT_CONFIG_NAMES[0]);
        if path.exists() {
            return Ok(path);
        }
    }
    anyhow::bail!(
        "no configuration file found (looked for {})",
        DEFAULT_CONFIG_NAMES.join(", ")
    )
}

/// Discover, parse and validate the configuration.
fn load_config(global: &GlobalArgs) -> anyhow::Result<(Config, PathBuf)> {
    let path = discover_config(global.config.as_deref())?;
    let config = Config::parse_file(&path)
        .with_context(|| format!("failed to parse configuration {}", path.display()))?;
    config::validate(&config).context("invalid configuration")?;
    Ok((config, path))
}

fn check_format(format: &str) -> anyhow::Result<()> {
    if format != "pretty" && format != "json" {
        anyhow::bail!("invalid format {:?}, must be 'pretty' or 'json'", format);
    }
    Ok(())
}

fn id_filter(ids: &[String]) -> BTreeSet<String> {
    ids.iter()
        .map(|id| id.trim())
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect()
}

/// Set `flag` on the first Ctrl-C and exit with [`EXIT_ERROR`] on the second.
fn install_cancel_handler(flag: Arc<AtomicBool>) {
    std::thread::spawn(move || {
        let runtime = match tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(e) => {
                warn!(error = %e, "cannot listen for interrupts");
                return;
            }
        };
        if runtime.block_on(watch_interrupts(tokio::signal::ctrl_c, &flag)) {
            std::process::exit(EXIT_ERROR);
        }
    });
}

/// Wait for interrupts from `interrupt`.
///
/// The first one sets `flag`. Returns true once a second one arrives and
/// false if the interrupt source fails first.
async fn watch_interrupts<S, F>(mut interrupt: S, flag: &AtomicBool) -> bool
where
    S: FnMut() -> F,
    F: Future<Output = std::io::Result<()>>,
{
    if let Err(e) = interrupt().await {
        warn!(error = %e, "cannot listen for interrupts");
        return false;
    }
    warn!("interrupt received, stopping before the next ontology (press Ctrl-C again to abort)");
    flag.store(true, Ordering::SeqCst);

    match interrupt().await {
        Ok(()) => {
            warn!("second interrupt received, aborting");
            true
        }
        Err(e) => {
            warn!(error = %e, "cannot listen for interrupts");
            false
        }
    }
}

/// Build the audit context for a configuration.
fn build_context(config: &Config, log_all: bool) -> anyhow::Result<AuditContext> {
    let source = SnapshotSource::open(&config.source.snapshot_path).with_context(|| {
        format!(
            "failed to open metadata snapshot {}",
            config.source.snapshot_path.display()
        )
    })?;
    let mut ctx = AuditContext::new(Box::new(source))
        .with_config(config)
        .log_all(log_all);

    let annotator_url = config.annotator.active_url();
    let search_url = config.search.active_url();
    if annotator_url.is_some() || search_url.is_some() {
        let http = HttpContext::new().context("failed to start HTTP client")?;
        if let Some(url) = annotator_url {
            ctx = ctx.with_annotator(Box::new(AnnotatorClient::new(
                http.clone(),
                url,
                &config.annotator,
            )));
        }
        if let Some(url) = search_url {
            ctx = ctx.with_search(Box::new(SearchClient::new(http, url, &config.search)));
        }
    } else {
        info!("no index configured, skipping index consistency checks");
    }
    Ok(ctx)
}

/// Run the report command.
pub fn run_report(global: &GlobalArgs, args: &ReportArgs) -> anyhow::Result<i32> {
    check_format(&args.format)?;
    let (config, config_path) = load_config(global)?;
    info!(config = %config_path.display(), "loaded configuration");

    let ctx = build_context(&config, args.log_all)?;
    let runner = ReportRunner::new(ctx)
        .filter(id_filter(&args.ontologies))
        .workers(args.workers.unwrap_or(config.workers));
    install_cancel_handler(runner.cancel_handle());

    if args.dry_run {
        let report = runner.run_to(&StdoutSink)?;
        return Ok(report_exit_code(args, report.problem_count()));
    }

    let report_path = args.output.as_ref().unwrap_or(&config.report_path);
    let sink = JsonFileSink::new(report_path);
    let report = runner.run_to(&sink)?;

    let destination = sink.describe();
    match args.format.as_str() {
        "json" => report::write_json_summary(&report, &destination)?,
        _ => report::write_pretty(&report, &destination),
    }
    Ok(report_exit_code(args, report.problem_count()))
}

fn report_exit_code(args: &ReportArgs, problems: usize) -> i32 {
    if args.fail_on_problem && problems > 0 {
        EXIT_FAILED
    } else {
        EXIT_SUCCESS
    }
}

/// Run the reconcile command.
pub fn run_reconcile(global: &GlobalArgs, args: &ReconcileArgs) -> anyhow::Result<i32> {
    check_format(&args.format)?;
    let (config, _) = load_config(global)?;

    let Some(repository) = args.repository.as_ref().or(config.repository_path.as_ref()) else {
        anyhow::bail!("repository_path is required for reconcile (set it or pass --repository)");
    };
    if !repository.is_dir() {
        anyhow::bail!("repository {} is not a directory", repository.display());
    }

    let store = SnapshotSource::open(&config.source.snapshot_path).with_context(|| {
        format!(
            "failed to open metadata snapshot {}",
            config.source.snapshot_path.display()
        )
    })?;
    let summary = Reconciler::new(&store, repository)
        .filter(id_filter(&args.ontologies))
        .dry_run(args.dry_run)
        .log_all(args.log_all)
        .run()?;

    match args.format.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&summary)?),
        _ => print_reconcile_summary(&summary, args.dry_run),
    }

    if summary.missing > 0 || summary.failed > 0 {
        Ok(EXIT_FAILED)
    } else {
        Ok(EXIT_SUCCESS)
    }
}

fn print_reconcile_summary(summary: &ReconcileSummary, dry_run: bool) {
    println!();
    if dry_run {
        println!("{}", "ontocheck reconcile (dry run)".bold());
    } else {
        println!("{}", "ontocheck reconcile".bold());
    }
    println!("  checked         {}", summary.checked);
    println!("  in place        {}", summary.in_place.to_string().green());
    println!("  relocated       {}", summary.relocated);
    println!("  repointed       {}", summary.repointed);
    println!("  no upload path  {}", summary.no_upload_path);
    let missing = summary.missing.to_string();
    let failed = summary.failed.to_string();
    println!(
        "  missing         {}",
        if summary.missing > 0 { missing.red() } else { missing.normal() }
    );
    println!(
        "  failed          {}",
        if summary.failed > 0 { failed.red() } else { failed.normal() }
    );
}

/// Run the init command.
pub fn run_init(args: &InitArgs) -> anyhow::Result<i32> {
    // Check if output already exists
    if args.output.exists() {
        eprintln!("Error: file already exists: {}", args.output.display());
        eprintln!("Remove it or use --output to specify a different path");
        return Ok(EXIT_ERROR);
    }

    // Create output directory if needed
    if let Some(parent) = args.output.parent() {
        if !parent.as_os_str().is_empty() && parent != Path::new(".") {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory {}", parent.display()))?;
        }
    }

    std::fs::write(&args.output, CONFIG_TEMPLATE)
        .with_context(|| format!("failed to write {}", args.output.display()))?;

    println!("Created {}", args.output.display());
    println!();
    println!("Next steps:");
    println!("  1. Point source.snapshot_path at the metadata export");
    println!("  2. Run: ontocheck report --config {}", args.output.display());

    Ok(EXIT_SUCCESS)
}
