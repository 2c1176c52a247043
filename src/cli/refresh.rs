//! Refresh mode CLI logic
//!
//! Loads accounts from a JSON file, refreshes them all and prints one
//! result per account as a JSON array.

use super::{EXIT_FATAL, EXIT_OK, EXIT_PARTIAL};
use crate::{
    Settings,
    cache::{FileCache, MemoryBackend, TokenCache, get_cache_path},
    platform::AdapterRegistry,
    refresh::{BatchOutcome, RefreshCoordinator},
    session::SessionManager,
    types::Account,
    utils::version,
};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Arguments for refresh mode
#[derive(Debug, Clone, Default)]
pub struct RefreshArgs {
    /// JSON array of accounts
    pub accounts: PathBuf,
    /// Overrides `refresh.concurrency`
    pub concurrency: Option<usize>,
    /// Skip cache reads
    pub bypass_cache: bool,
    /// Skip restoring and saving the cache file
    pub no_persist: bool,
    /// Cache file location, defaults to the user cache directory
    pub cache_file: Option<PathBuf>,
}

/// Read a JSON array of accounts
pub fn load_accounts(path: &Path) -> Result<Vec<Account>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read accounts file {}", path.display()))?;
    let deserializer = &mut serde_json::Deserializer::from_str(&raw);
    serde_path_to_error::deserialize(deserializer)
        .with_context(|| format!("Invalid accounts file {}", path.display()))
}

/// Run refresh mode and return the process exit code
pub async fn run_refresh_mode(args: RefreshArgs, mut settings: Settings) -> Result<i32> {
    if let Some(concurrency) = args.concurrency {
        settings.refresh.concurrency = concurrency;
        settings.validate()?;
    }

    let accounts = load_accounts(&args.accounts)?;
    info!(
        "bookie-session v{} refreshing {} accounts",
        version::get_version(),
        accounts.len()
    );

    let backend = Arc::new(MemoryBackend::new(settings.cache.max_entries));
    let file_cache = if settings.cache.persist && !args.no_persist {
        let path = match args.cache_file {
            Some(path) => path,
            None => get_cache_path()?,
        };
        Some(FileCache::new(path))
    } else {
        None
    };

    if let Some(file_cache) = &file_cache {
        match file_cache.load_cache().await {
            Ok(entries) => {
                backend.restore(entries).await;
            }
            Err(e) => warn!("Failed to load cache: {}. Starting with empty cache.", e),
        }
    }

    let registry = AdapterRegistry::from_settings(&settings)?;
    let manager = SessionManager::new(&settings, TokenCache::new(backend.clone()), registry)
        .with_bypass_cache(args.bypass_cache);
    let coordinator = RefreshCoordinator::new(manager, &settings.refresh);

    let cancel = CancellationToken::new();
    let interrupt = tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                debug!("Interrupt received, cancelling refresh");
                cancel.cancel();
            }
        }
    });

    let outcome = coordinator
        .refresh_all_with_cancel(&accounts, cancel)
        .await;
    interrupt.abort();
    let outcome = outcome?;

    if let Some(file_cache) = &file_cache {
        if let Err(e) = file_cache.save_cache(&backend.snapshot().await).await {
            warn!("Failed to save cache: {}", e);
        }
    }

    println!("{}", serde_json::to_string_pretty(&outcome.results)?);
    Ok(report(&outcome))
}

/// Print the summary and pick the exit code
fn report(outcome: &BatchOutcome) -> i32 {
    let summary = outcome.summary();
    eprintln!("{}", summary);

    if outcome.cancelled {
        error!("Refresh cancelled before every account completed");
        EXIT_FATAL
    } else if summary.all_succeeded() {
        EXIT_OK
    } else {
        EXIT_PARTIAL
    }
}
