//! manifest-sync: keep a compliance hub's curated component list in step
//! with the manifests in a source tree.

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use manifest_sync::{cli, SyncConfig, SyncError};
use std::io;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "manifest-sync")]
#[command(version)]
#[command(about = "Sync component manifests to a compliance hub", long_about = None)]
#[command(after_help = "EXIT CODES:
    0  Success (including \"already in sync\")
    1  Runtime error (hub API, inconsistency, missing catalog version)
    3  Configuration error (bad manifest, bad credentials, bad aliases)

EXAMPLES:
    # See what would change, without touching the hub
    manifest-sync sync -p couchbase-server -v 7.6.0 -s ./src \\
        --credentials ~/.hub-creds.json --dry-run

    # Apply the changes
    manifest-sync sync -p couchbase-server -v 7.6.0 -s ./src \\
        --credentials ~/.hub-creds.json --aliases aliases.yaml")]
struct Cli {
    /// Enable verbose output
    #[arg(long, global = true)]
    verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconcile the hub's curated list with the manifest tree
    Sync(SyncArgs),

    /// Generate shell completions and print them to stdout
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(clap::Args)]
struct SyncArgs {
    /// Project name on the hub
    #[arg(short, long)]
    project: String,

    /// Project version on the hub
    #[arg(short, long)]
    version: String,

    /// Source root to search for manifests
    #[arg(short, long, default_value = ".")]
    src_root: PathBuf,

    /// JSON credentials file ({"url", "username", "password"})
    #[arg(short, long, env = "HUB_CREDENTIALS")]
    credentials: Option<PathBuf>,

    /// Alias and fallback-version configuration file
    #[arg(short, long)]
    aliases: Option<PathBuf>,

    /// HTTP timeout for hub requests, in seconds
    #[arg(long, default_value_t = 60)]
    timeout: u64,

    /// Compute and log changes without mutating the hub
    #[arg(short = 'n', long)]
    dry_run: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "warn"
    } else {
        "info"
    };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| log_level.to_string()),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    match cli.command {
        Commands::Sync(args) => {
            let config = SyncConfig {
                project: args.project,
                version: args.version,
                src_root: args.src_root,
                credentials: args.credentials,
                aliases: args.aliases,
                timeout: Duration::from_secs(args.timeout),
                dry_run: args.dry_run,
            };
            match cli::run_sync(&config) {
                Ok(code) => {
                    if code != 0 {
                        std::process::exit(code);
                    }
                }
                Err(e) => {
                    tracing::error!("{e}");
                    let code = match e {
                        SyncError::Config(_) | SyncError::Manifest { .. } => 3,
                        _ => 1,
                    };
                    std::process::exit(code);
                }
            }
        }
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(shell, &mut cmd, name, &mut io::stdout());
        }
    }

    Ok(())
}
