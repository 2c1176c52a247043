//! Operator binary for the session manager
//!
//! # Usage
//!
//! ```bash
//! bookie-session refresh --accounts accounts.json --concurrency 4
//! bookie-session dedup --input markets.json --ids 70472,12
//! ```
//!
//! Results are printed as JSON on stdout; logs and the refresh summary go to
//! stderr.

use bookie_session::{
    cli::{self, DedupArgs, RefreshArgs},
    config::ConfigLoader,
};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "bookie-session", author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(long, global = true)]
    verbose: bool,

    /// TOML configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Refresh sessions and balances for a batch of accounts
    Refresh {
        /// JSON array of accounts
        #[arg(short, long, value_name = "FILE")]
        accounts: PathBuf,

        /// Maximum accounts refreshed at once
        #[arg(long, value_name = "N")]
        concurrency: Option<usize>,

        /// Ignore cached tokens and log in again
        #[arg(short, long)]
        bypass_cache: bool,

        /// Do not restore or save the cache file
        #[arg(long)]
        no_persist: bool,

        /// Cache file location
        #[arg(long, value_name = "FILE")]
        cache_file: Option<PathBuf>,
    },
    /// Collapse duplicate market ids in a batch of market records
    Dedup {
        /// JSON array of market records, `-` for stdin
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,

        /// Comma separated market ids to collapse
        #[arg(long, value_name = "IDS")]
        ids: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let settings = ConfigLoader::new().load(cli.config.as_deref())?;
    cli::init_logging(&settings.logging, cli.verbose);

    match cli.command {
        Command::Refresh {
            accounts,
            concurrency,
            bypass_cache,
            no_persist,
            cache_file,
        } => {
            let args = RefreshArgs {
                accounts,
                concurrency,
                bypass_cache,
                no_persist,
                cache_file,
            };
            let code = cli::run_refresh_mode(args, settings).await?;
            if code != cli::EXIT_OK {
                std::process::exit(code);
            }
        }
        Command::Dedup { input, ids } => {
            cli::run_dedup_mode(DedupArgs { input, ids }, settings)?;
        }
    }

    Ok(())
}
