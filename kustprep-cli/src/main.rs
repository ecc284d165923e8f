//! kustprep: prepare Kubernetes manifest directories for kustomize overlays.
//!
//! # Usage
//!
//! ```text
//! kustprep prepare <base> [--overlay <dir>] [--dest <dir>] [--kustomize <prog>]
//! kustprep split <base> [--skip-non-yaml]
//! kustprep lists [--json]
//! ```
//!
//! Every command accepts `--state <file>` (default `.kustprep/state.yaml`).
//! Log verbosity follows `RUST_LOG`; `-v` raises the default to `debug`.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{lists::ListsArgs, prepare::PrepareArgs, split::SplitArgs};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "kustprep",
    version,
    about = "Split, overlay and reconcile Kubernetes manifests with kustomize",
    long_about = None,
)]
struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the full pipeline against a base directory.
    Prepare(PrepareArgs),

    /// Split multi-document and List files without building anything.
    Split(SplitArgs),

    /// Show the List files recorded in the state file.
    Lists(ListsArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.command {
        Commands::Prepare(args) => args.run(),
        Commands::Split(args) => args.run(),
        Commands::Lists(args) => args.run(),
    }
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
