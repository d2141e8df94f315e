//! Progress reporting for long-running passes.
//!
//! Detection and merge runs report through an injected [`ProgressObserver`]
//! instead of mutating shared counters.

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum ProgressEvent {
    /// Incremental matching of unlinked signals against existing opportunities.
    Matching { processed: usize, total: usize, matched: usize },
    /// Clusters formed from signals that matched nothing.
    Clustered { candidates: usize, clusters: usize },
    /// Refinement finished (or was skipped over the cluster cap).
    Refined { before: usize, after: usize, skipped: bool },
    OpportunityCreated { opportunity_id: String, signal_count: usize },
    /// One pass of the merge loop finished.
    MergePass { pass: usize, merges_so_far: usize },
    Merged { primary_id: String, secondary_id: String },
}

pub trait ProgressObserver: Send + Sync {
    fn on_progress(&self, event: &ProgressEvent);
}

/// Discards every event.
pub struct NoProgress;

impl ProgressObserver for NoProgress {
    fn on_progress(&self, _event: &ProgressEvent) {}
}
