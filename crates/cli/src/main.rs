mod loader;
mod resolve;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// Character sheet resolver.
#[derive(Parser)]
#[command(name = "herosheet", version, about = "Character sheet resolver")]
struct Cli {
    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    output: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a character sheet from reference data and player decisions
    Resolve {
        /// Path to the reference data directory
        #[arg(long)]
        data: PathBuf,

        /// Path to the character JSON file
        #[arg(long)]
        character: PathBuf,

        /// Path to the decisions JSON file (a JSON array of decisions)
        #[arg(long)]
        decisions: Option<PathBuf>,
    },
}

/// Print an error the way every failure surfaces: prefixed, to stderr.
pub(crate) fn report_error(message: &str) {
    eprintln!("ERROR: {}", message);
}

fn main() {
    // Diagnostics go to stderr and are controlled by RUST_LOG; the sheet
    // itself is the only thing written to stdout.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Resolve {
            data,
            character,
            decisions,
        } => resolve::cmd_resolve(
            &data,
            &character,
            decisions.as_deref(),
            cli.output,
            cli.quiet,
        ),
    }
}
