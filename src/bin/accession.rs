//! Accession CLI: rebuild or prune the external graph store offline.
//!
//! Usage:
//!   accession [--db path] [--config path] [--content snapshot.json] convert-all
//!   accession convert hdl:123456789/1 [hdl:...]
//!   accession delete hdl:123456789/1 | <graph uri>
//!   accession delete-all
//!   accession states

use accession::config::Settings;
use accession::propagation::{Converter, RebuildOptions, RebuildReport, Rebuilder, HANDLE_PREFIX};
use accession::{
    GraphStore, MemoryContentStore, MemoryDirectory, OpenStore, PropagationError, SqliteStore,
    WorkflowStates,
};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(
    name = "accession",
    version,
    about = "Propagate repository content to an external graph store"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Path to the SQLite graph store
    #[arg(long, global = true)]
    db: Option<PathBuf>,
    /// Path to a YAML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// JSON snapshot of repository content
    #[arg(long, global = true)]
    content: Option<PathBuf>,
    /// Report what would change without writing to the store
    #[arg(long, global = true)]
    dry_run: bool,
    /// Print converted graphs as N-Triples
    #[arg(long, global = true)]
    stdout: bool,
    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert every public subject, starting at the site
    ConvertAll,
    /// Convert the given subjects and their public descendants
    Convert {
        /// Subjects as hdl:<handle>
        #[arg(required = true)]
        identifiers: Vec<String>,
    },
    /// Delete the given subjects and their descendants from the store
    Delete {
        /// Subjects as hdl:<handle>, or graph URIs
        #[arg(required = true)]
        identifiers: Vec<String>,
    },
    /// Remove every graph from the store
    DeleteAll,
    /// List the workflow states for the configured number of steps
    States,
}

fn init_logging(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level)
        .init();
}

fn load_content(path: Option<&PathBuf>) -> Result<MemoryContentStore, String> {
    let Some(path) = path else {
        return Ok(MemoryContentStore::new());
    };
    let json = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read content snapshot {}: {}", path.display(), e))?;
    MemoryContentStore::from_json(&json)
        .map_err(|e| format!("Failed to parse content snapshot {}: {}", path.display(), e))
}

fn open_store(path: PathBuf) -> Result<SqliteStore, String> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).ok();
    }
    SqliteStore::open(&path).map_err(|e| format!("Failed to open database: {}", e))
}

fn build_rebuilder(cli: &Cli, settings: &Settings) -> Result<Rebuilder, String> {
    let content = Arc::new(load_content(cli.content.as_ref())?);
    let directory = Arc::new(MemoryDirectory::new());
    let identifiers = settings
        .propagation
        .identifiers
        .build(&settings.propagation.uri_prefix);
    let converter = Arc::new(Converter::new(content.clone(), directory, identifiers));
    let db_path = cli
        .db
        .clone()
        .unwrap_or_else(|| settings.storage.resolved_path());
    let store: Arc<dyn GraphStore> = Arc::new(open_store(db_path)?);
    Ok(Rebuilder::new(content, converter, store).with_options(RebuildOptions {
        dry_run: cli.dry_run,
        capture: cli.stdout,
    }))
}

fn print_report(report: &RebuildReport, stdout: bool, dry_run: bool) {
    if stdout {
        for graph in &report.graphs {
            print!("{}", graph.to_ntriples());
        }
    }
    let prefix = if dry_run { "[dry run] " } else { "" };
    if report.deleted_all {
        eprintln!("{}Removed every graph from the store", prefix);
    }
    if !report.converted.is_empty() {
        eprintln!("{}Converted {} subject(s)", prefix, report.converted.len());
    }
    if !report.deleted.is_empty() {
        eprintln!("{}Deleted {} graph(s)", prefix, report.deleted.len());
    }
    for (subject, reason) in &report.skipped {
        eprintln!("Skipped {}: {}", subject, reason);
    }
}

fn merge(into: &mut RebuildReport, from: RebuildReport) {
    into.converted.extend(from.converted);
    into.deleted.extend(from.deleted);
    into.skipped.extend(from.skipped);
    into.deleted_all |= from.deleted_all;
    into.graphs.extend(from.graphs);
}

async fn cmd_convert(rebuilder: &Rebuilder, identifiers: &[String]) -> Result<RebuildReport, PropagationError> {
    let mut report = RebuildReport::default();
    for identifier in identifiers {
        match rebuilder.resolve(identifier) {
            Some(entity) => merge(&mut report, rebuilder.convert(&entity).await?),
            None => eprintln!("Warning: cannot resolve '{}'", identifier),
        }
    }
    Ok(report)
}

async fn cmd_delete(rebuilder: &Rebuilder, identifiers: &[String]) -> Result<RebuildReport, PropagationError> {
    let mut report = RebuildReport::default();
    for identifier in identifiers {
        if identifier.starts_with(HANDLE_PREFIX) {
            match rebuilder.resolve(identifier) {
                Some(entity) => merge(&mut report, rebuilder.delete(&entity).await?),
                None => eprintln!("Warning: cannot resolve '{}'", identifier),
            }
        } else {
            merge(&mut report, rebuilder.delete_identifier(identifier).await?);
        }
    }
    Ok(report)
}

fn cmd_states(settings: &Settings) -> i32 {
    let states = WorkflowStates::new(settings.workflow.steps);
    for state in states.all() {
        println!("{:>3}  {}", states.id(state), states.name(state));
    }
    0
}

async fn run(cli: Cli) -> i32 {
    let settings = match Settings::load_or_default(cli.config.as_deref()) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };

    if let Commands::States = cli.command {
        return cmd_states(&settings);
    }

    let rebuilder = match build_rebuilder(&cli, &settings) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };

    let result = match &cli.command {
        Commands::ConvertAll => rebuilder.convert_all().await,
        Commands::Convert { identifiers } => cmd_convert(&rebuilder, identifiers).await,
        Commands::Delete { identifiers } => cmd_delete(&rebuilder, identifiers).await,
        Commands::DeleteAll => rebuilder.delete_all().await,
        Commands::States => Ok(RebuildReport::default()),
    };

    match result {
        Ok(report) => {
            print_report(&report, cli.stdout, cli.dry_run);
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let code = run(cli).await;
    std::process::exit(code);
}
