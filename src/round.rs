//! Per-round emission bookkeeping.

use std::sync::{Mutex, MutexGuard};

use classgen_core::QualifiedName;
use rustc_hash::FxHashSet;

/// Qualified names already claimed in the current processing round.
///
/// Shared by every generator call of a round; claiming is atomic, so
/// definitions may be generated from several threads.
#[derive(Debug, Default)]
pub struct RoundContext {
    processed: Mutex<FxHashSet<QualifiedName>>,
}

impl RoundContext {
    pub fn new() -> Self {
        Self::default()
    }

    fn processed(&self) -> MutexGuard<'_, FxHashSet<QualifiedName>> {
        self.processed
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Begin a new round; everything may be emitted again.
    pub fn start_round(&self) {
        let mut processed = self.processed();
        tracing::debug!(forgotten = processed.len(), "starting processing round");
        processed.clear();
    }

    /// Claim `name` for emission. Returns false if it was already claimed
    /// this round.
    pub fn claim(&self, name: &QualifiedName) -> bool {
        let claimed = self.processed().insert(name.clone());
        if !claimed {
            tracing::debug!(%name, "already generated this round, skipping");
        }
        claimed
    }

    /// Give up a claim after a failed emission so a corrected definition
    /// is not mistaken for a duplicate.
    pub fn release(&self, name: &QualifiedName) {
        self.processed().remove(name);
    }

    pub fn is_processed(&self, name: &QualifiedName) -> bool {
        self.processed().contains(name)
    }

    pub fn processed_count(&self) -> usize {
        self.processed().len()
    }
}
