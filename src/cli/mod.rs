//! Command line interface modules
//!
//! Each subcommand of the `bookie-session` binary lives in its own module as
//! an argument struct plus a `run_*` entry point.

pub mod dedup;
pub mod refresh;

pub use dedup::{DedupArgs, run_dedup_mode};
pub use refresh::{RefreshArgs, run_refresh_mode};

use crate::config::LoggingSettings;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Exit code when every account refreshed
pub const EXIT_OK: i32 = 0;
/// Exit code on a fatal error or cancellation
pub const EXIT_FATAL: i32 = 1;
/// Exit code when at least one account failed
pub const EXIT_PARTIAL: i32 = 2;

/// Filter directive used when `RUST_LOG` is not set
pub fn default_log_directive(logging: &LoggingSettings, verbose: bool) -> String {
    if verbose || logging.verbose {
        "debug".to_string()
    } else {
        logging.level.clone()
    }
}

/// Install the stderr subscriber; stdout is reserved for JSON output
pub fn init_logging(logging: &LoggingSettings, verbose: bool) {
    let fallback = default_log_directive(logging, verbose);
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| fallback.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
