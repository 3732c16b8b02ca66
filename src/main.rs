// Only compile UI module when TUI feature is enabled
#[cfg(feature = "tui")]
mod ui;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ledger_triage::{export, ingest, Config, IngestReport, Ingested, ListId, Overwrite, Triage};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Mutex;
use tracing::{debug, error};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

/// ledger-triage: sort bank CSV exports into an approved list and write a budget sheet.
///
/// Every CSV file in the input directory is normalized into one fixed-width list. Rows are then
/// approved (and re-categorized) in the review screen, and the approved rows are exported in the
/// 7-column budget layout.
#[derive(Debug, Parser)]
#[command(version)]
struct Args {
    /// The logging verbosity. One of, from least to most verbose:
    /// off, error, warn, info, debug, trace
    ///
    /// This can be overridden by RUST_LOG.
    #[arg(long, global = true, default_value_t = LevelFilter::INFO)]
    log_level: LevelFilter,

    /// Where log output goes while the review screen owns the terminal.
    #[arg(long, global = true, default_value = "ledger-triage.log")]
    log_file: PathBuf,

    /// Optional JSON config file with widths, output file and category palette.
    #[arg(long, global = true, env = "LEDGER_TRIAGE_CONFIG")]
    config: Option<PathBuf>,

    /// Width of the description column.
    #[arg(long, global = true)]
    desc_len: Option<usize>,

    /// Width of the category column.
    #[arg(long, global = true)]
    cat_len: Option<usize>,

    /// Export target, relative to the working directory.
    #[arg(long, global = true)]
    output: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
enum Command {
    /// Open the two-pane review screen (the default).
    Review(DirArgs),
    /// Print the normalized unsorted list and the ingestion report.
    Preview(DirArgs),
    /// Approve every row and export without opening the review screen.
    ApproveAll {
        #[command(flatten)]
        dir: DirArgs,

        /// Replace the output file if it already exists.
        #[arg(long)]
        force: bool,
    },
}

#[derive(Debug, Parser, Clone)]
struct DirArgs {
    /// Directory holding the bank CSV exports.
    #[arg(default_value = ".")]
    dir: PathBuf,
}

impl Default for DirArgs {
    fn default() -> Self {
        DirArgs {
            dir: PathBuf::from("."),
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    let command = args
        .command
        .clone()
        .unwrap_or_else(|| Command::Review(DirArgs::default()));

    let logged = match &command {
        Command::Review(_) => init_file_logger(args.log_level, &args.log_file),
        _ => {
            init_logger(args.log_level);
            Ok(())
        }
    };
    if let Err(e) = logged {
        eprintln!("Error: {:#}", e);
        return ExitCode::FAILURE;
    }
    debug!("Log level set to {}", args.log_level.to_string().to_lowercase());

    match main_inner(&args, command) {
        Ok(code) => code,
        Err(e) => {
            error!("Exiting with error: {e:#}");
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn main_inner(args: &Args, command: Command) -> Result<ExitCode> {
    let config = Config::load(args.config.as_deref())?
        .with_overrides(args.desc_len, args.cat_len, args.output.clone())
        .context("Invalid configuration")?;

    match command {
        Command::Review(dir) => run_review(config, &dir.dir),
        Command::Preview(dir) => run_preview(&config, &dir.dir),
        Command::ApproveAll { dir, force } => run_approve_all(&config, &dir.dir, force),
    }
}

fn load(config: &Config, dir: &Path) -> Result<Ingested> {
    let exclude = config.output_name().unwrap_or_default();
    ingest(dir, config.widths(), &exclude)
        .with_context(|| format!("Failed to ingest directory: {}", dir.display()))
}

fn print_report(report: &IngestReport) {
    for issue in &report.issues {
        eprintln!("  ! {}", issue);
    }
    eprintln!("{}", report.summary());
}

#[cfg(feature = "tui")]
fn run_review(config: Config, dir: &Path) -> Result<ExitCode> {
    let ingested = load(&config, dir)?;
    let triage = Triage::new(ingested.rows, ingested.widths);

    let mut app = ui::App::new(triage, ingested.report, config);
    ui::run_ui(&mut app)?;

    Ok(ExitCode::SUCCESS)
}

#[cfg(not(feature = "tui"))]
fn run_review(_config: Config, _dir: &Path) -> Result<ExitCode> {
    eprintln!("Review screen not available!");
    eprintln!("   Rebuild with: cargo build --features tui");
    eprintln!("   Or use: ledger-triage preview / approve-all");
    Ok(ExitCode::FAILURE)
}

fn run_preview(config: &Config, dir: &Path) -> Result<ExitCode> {
    let ingested = load(config, dir)?;

    let triage = Triage::new(ingested.rows, ingested.widths);
    for line in triage.rendered(ListId::Unsorted) {
        println!("{}", line);
    }
    print_report(&ingested.report);

    Ok(if ingested.report.failed_files() > 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

fn run_approve_all(config: &Config, dir: &Path, force: bool) -> Result<ExitCode> {
    let ingested = load(config, dir)?;
    print_report(&ingested.report);

    let mut triage = Triage::new(ingested.rows, ingested.widths);
    let approved = triage
        .approve_all()
        .context("Failed to approve ingested rows")?;
    debug!(approved, "approved all rows");

    let overwrite = if force {
        Overwrite::Confirmed
    } else {
        Overwrite::Refuse
    };
    let path = config.output_path();
    let count = export(triage.approved(), &path, overwrite)
        .with_context(|| format!("Failed to export to {}", path.display()))?;

    println!("Exported {} rows to {}", count, path.display());
    Ok(ExitCode::SUCCESS)
}

fn env_filter(level: LevelFilter) -> EnvFilter {
    match std::env::var("RUST_LOG").ok() {
        // RUST_LOG exists; use it.
        Some(_) => EnvFilter::from_default_env(),
        // Otherwise use the requested level for this crate only.
        None => EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), level)),
    }
}

/// Initializes the tracing subscriber on stderr.
fn init_logger(level: LevelFilter) {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(level))
        .with_writer(std::io::stderr)
        .init();
}

/// Initializes the tracing subscriber on a log file, keeping the terminal free for the UI.
fn init_file_logger(level: LevelFilter, path: &Path) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create log file: {}", path.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(env_filter(level))
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .init();
    Ok(())
}
