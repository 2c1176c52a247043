//! Order-preserving market deduplication
//!
//! Upstream feeds repeat a market whenever its odds move. For every id under
//! the active [`DedupPolicy`], exactly one record survives: it sits where the
//! oldest occurrence sat and carries the newest occurrence's payload.

use crate::config::{DedupMode, DedupSettings};
use crate::types::MarketRecord;
use std::collections::{HashMap, HashSet};

/// Which market ids are collapsed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DedupPolicy {
    /// Every id
    #[default]
    All,
    /// Only the listed ids; every other id passes through untouched
    AllowList(HashSet<u64>),
}

impl DedupPolicy {
    /// Policy collapsing only `ids`
    pub fn allow_list(ids: impl IntoIterator<Item = u64>) -> Self {
        Self::AllowList(ids.into_iter().collect())
    }

    /// Policy described by the `[dedup]` settings
    pub fn from_settings(settings: &DedupSettings) -> Self {
        match settings.mode {
            DedupMode::All => Self::All,
            DedupMode::AllowList => Self::allow_list(settings.ids.iter().copied()),
        }
    }

    /// Whether records with `id` are collapsed
    pub fn applies_to(&self, id: u64) -> bool {
        match self {
            Self::All => true,
            Self::AllowList(ids) => ids.contains(&id),
        }
    }
}

/// Survivor bookkeeping of one id
struct Slot {
    position: usize,
    oldest: u64,
    newest: u64,
}

/// Collapse duplicate market ids in one pass
///
/// For each id under `policy`:
/// - position: that of the occurrence with the smallest `sequence_index`
///   (earlier wins a tie)
/// - payload and `sequence_index`: those of the occurrence with the largest
///   `sequence_index` (later wins a tie)
///
/// Ids outside the policy keep every occurrence. The result of deduplicating
/// an already deduplicated batch is the batch itself.
pub fn deduplicate<P: Clone>(records: &[MarketRecord<P>], policy: &DedupPolicy) -> Vec<MarketRecord<P>> {
    let mut output: Vec<Option<MarketRecord<P>>> = Vec::with_capacity(records.len());
    let mut slots: HashMap<u64, Slot> = HashMap::new();

    for record in records {
        if !policy.applies_to(record.id) {
            output.push(Some(record.clone()));
            continue;
        }

        let Some(slot) = slots.get_mut(&record.id) else {
            slots.insert(
                record.id,
                Slot {
                    position: output.len(),
                    oldest: record.sequence_index,
                    newest: record.sequence_index,
                },
            );
            output.push(Some(record.clone()));
            continue;
        };

        if record.sequence_index >= slot.newest {
            slot.newest = record.sequence_index;
            if let Some(survivor) = output[slot.position].as_mut() {
                survivor.payload = record.payload.clone();
                survivor.sequence_index = record.sequence_index;
            }
        }

        if record.sequence_index < slot.oldest {
            slot.oldest = record.sequence_index;
            let survivor = output[slot.position].take();
            slot.position = output.len();
            output.push(survivor);
        }
    }

    let deduplicated: Vec<_> = output.into_iter().flatten().collect();
    tracing::debug!(
        input = records.len(),
        output = deduplicated.len(),
        "Deduplicated market batch"
    );
    deduplicated
}
