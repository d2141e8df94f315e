use crate::domain::ports::progress::{ProgressEvent, ProgressObserver};
use tracing::info;

/// Reports progress events as structured log lines.
pub struct TracingProgress;

impl ProgressObserver for TracingProgress {
    fn on_progress(&self, event: &ProgressEvent) {
        match event {
            ProgressEvent::Matching { processed, total, matched } => {
                info!(processed, total, matched, "Matching signals to existing opportunities")
            }
            ProgressEvent::Clustered { candidates, clusters } => {
                info!(candidates, clusters, "Clustered unmatched signals")
            }
            ProgressEvent::Refined { before, after, skipped } => {
                info!(before, after, skipped, "Refined clusters")
            }
            ProgressEvent::OpportunityCreated { opportunity_id, signal_count } => {
                info!(%opportunity_id, signal_count, "Opportunity created")
            }
            ProgressEvent::MergePass { pass, merges_so_far } => {
                info!(pass, merges_so_far, "Merge pass finished")
            }
            ProgressEvent::Merged { primary_id, secondary_id } => {
                info!(%primary_id, %secondary_id, "Opportunities merged")
            }
        }
    }
}
