use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use rust_schemadiff::diff::report::format_report;
use rust_schemadiff::model::message;
use rust_schemadiff::walk_through::ErrorPolicy;
use rust_schemadiff::{load_snapshot, migrate, serializer, Engine, EngineRegistry, MigrateOptions};

#[derive(Parser)]
#[command(name = "rust-schemadiff")]
#[command(author, version, about = "Schema extraction, diffing and migration for MySQL-family databases")]
struct Cli {
    /// Database engine (mysql, tidb)
    #[arg(short, long, global = true, default_value = "mysql")]
    engine: String,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract the metadata message of a DDL script
    Metadata {
        /// Path to the .sql file
        #[arg(short, long)]
        input: PathBuf,

        /// Write the message here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Render canonical DDL from a metadata message
    Serialize {
        /// Path to the .json metadata message
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Walk a migration script through a baseline schema
    Check {
        /// Baseline schema (.sql or .json)
        #[arg(short, long)]
        baseline: PathBuf,

        /// Script to validate
        #[arg(short, long)]
        migration: PathBuf,

        /// Keep going after an error
        #[arg(long)]
        skip_errors: bool,
    },

    /// Print the differences between two schemas
    Diff {
        #[arg(long)]
        from: PathBuf,

        #[arg(long)]
        to: PathBuf,
    },

    /// Generate the migration between two schemas
    Migrate {
        #[arg(long)]
        from: PathBuf,

        #[arg(long)]
        to: PathBuf,

        /// Write the script here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Rewrite a design schema file to match a target schema
    Reconcile {
        /// Hand-maintained schema file
        #[arg(short, long)]
        baseline: PathBuf,

        /// Target schema (.sql or .json)
        #[arg(short, long)]
        target: PathBuf,
    },
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn read_text(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let registry = EngineRegistry::with_defaults();
    let engine_id: Engine = cli.engine.parse()?;
    let engine = registry.get(engine_id)?;

    match cli.command {
        Commands::Metadata { input, output } => {
            let snapshot = load_snapshot(&input, engine)?;
            let json = message::to_json(&snapshot)?;
            match output {
                Some(path) => std::fs::write(&path, json)
                    .with_context(|| format!("Failed to write {}", path.display()))?,
                None => println!("{}", json),
            }
        }
        Commands::Serialize { input } => {
            let snapshot = message::from_json(&read_text(&input)?)?;
            print!("{}", serializer::serialize_database(&snapshot));
        }
        Commands::Check {
            baseline,
            migration,
            skip_errors,
        } => {
            let mut snapshot = load_snapshot(&baseline, engine)?;
            let policy = if skip_errors {
                ErrorPolicy::SkipStatement
            } else {
                ErrorPolicy::Abort
            };
            let report = engine.walk_through(&mut snapshot, &read_text(&migration)?, policy)?;
            for diagnostic in &report.diagnostics {
                println!("{}", diagnostic);
            }
            if report.has_errors() {
                std::process::exit(1);
            }
            println!("OK: {} statements applied", report.applied);
        }
        Commands::Diff { from, to } => {
            let before = load_snapshot(&from, engine)?;
            let after = load_snapshot(&to, engine)?;
            print!("{}", format_report(&engine.diff(&before, &after)?));
        }
        Commands::Migrate { from, to, output } => {
            let options = MigrateOptions {
                from_path: from,
                to_path: to,
                output_path: output.clone(),
                engine: engine_id,
            };
            let script = migrate(&options, &registry)?;
            if output.is_none() {
                print!("{}", script);
            }
        }
        Commands::Reconcile { baseline, target } => {
            let target = load_snapshot(&target, engine)?;
            print!("{}", engine.reconcile(&read_text(&baseline)?, &target)?);
        }
    }

    Ok(())
}
