//! Dedup mode CLI logic

use crate::{
    Settings,
    config::parse_id_list,
    market::{DedupPolicy, deduplicate},
    types::MarketRecord,
};
use anyhow::{Context, Result, bail};
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Arguments for dedup mode
#[derive(Debug, Clone, Default)]
pub struct DedupArgs {
    /// JSON array of market records, `-` for stdin
    pub input: PathBuf,
    /// Comma separated allow-list overriding `[dedup]`
    pub ids: Option<String>,
}

/// Pick the policy: `--ids` wins over the configured one
pub fn resolve_policy(ids: Option<&str>, settings: &Settings) -> Result<DedupPolicy> {
    match ids {
        Some(raw) => {
            let ids = parse_id_list(raw)?;
            if ids.is_empty() {
                bail!("--ids requires at least one market id");
            }
            Ok(DedupPolicy::allow_list(ids))
        }
        None => Ok(DedupPolicy::from_settings(&settings.dedup)),
    }
}

/// Run dedup mode, printing the deduplicated batch to stdout
pub fn run_dedup_mode(args: DedupArgs, settings: Settings) -> Result<()> {
    let policy = resolve_policy(args.ids.as_deref(), &settings)?;
    let raw = read_input(&args.input)?;

    let deserializer = &mut serde_json::Deserializer::from_str(&raw);
    let records: Vec<MarketRecord> = serde_path_to_error::deserialize(deserializer)
        .with_context(|| format!("Invalid market records in {}", args.input.display()))?;

    debug!("Deduplicating {} records with {:?}", records.len(), policy);
    let output = deduplicate(&records, &policy);

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn read_input(path: &Path) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut raw = String::new();
        std::io::stdin()
            .read_to_string(&mut raw)
            .context("Failed to read market records from stdin")?;
        return Ok(raw);
    }
    std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read market records from {}", path.display()))
}
