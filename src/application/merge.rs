//! Merge use case: fuse opportunities whose signals overlap in meaning.
//!
//! Two opportunities are related when any cross pair of their signals
//! scores at or above the merge threshold. The earlier one in listing order
//! (most recent first) is kept as primary; it absorbs the secondary's links,
//! gets fresh text, and the secondary is deleted, all in one transaction.
//!
//! Pairs already found unrelated are remembered until one side changes, so
//! after a merge only pairs involving the grown primary are re-evaluated.
//! A pair whose merge fails is skipped until another merge succeeds. The
//! run ends after a full pass with no successful merge.

use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::application::clustering::similarity::{SimilarityConfig, SimilarityModel};
use crate::application::materialize::Materializer;
use crate::config::ensure_unit_interval;
use crate::domain::entities::signal::Signal;
use crate::domain::error::DomainError;
use crate::domain::ports::opportunity_repository::OpportunityRepository;
use crate::domain::ports::progress::{ProgressEvent, ProgressObserver};

pub const DEFAULT_MERGE_THRESHOLD: f64 = 0.3;

#[derive(Debug, Clone, Default, Serialize)]
pub struct MergeReport {
    pub merges: usize,
    pub passes: usize,
    pub failed_merges: usize,
    pub opportunities_remaining: usize,
}

struct Held {
    opportunity_id: String,
    signals: Vec<Signal>,
}

pub struct MergeOpportunitiesUseCase {
    opportunity_repo: Arc<dyn OpportunityRepository>,
    materializer: Arc<Materializer>,
    progress: Arc<dyn ProgressObserver>,
}

impl MergeOpportunitiesUseCase {
    pub fn new(
        opportunity_repo: Arc<dyn OpportunityRepository>,
        materializer: Arc<Materializer>,
        progress: Arc<dyn ProgressObserver>,
    ) -> Self {
        Self {
            opportunity_repo,
            materializer,
            progress,
        }
    }

    pub async fn execute(
        &self,
        similarity: &SimilarityConfig,
        threshold: f64,
    ) -> Result<MergeReport, DomainError> {
        ensure_unit_interval("merge threshold", threshold)?;
        let model = SimilarityModel::new(similarity.clone())?;

        let mut held = Vec::new();
        for opportunity in self.opportunity_repo.list()? {
            let signals = self.opportunity_repo.linked_signals(&opportunity.id)?;
            held.push(Held {
                opportunity_id: opportunity.id,
                signals,
            });
        }

        let mut report = MergeReport::default();
        let mut clean: HashSet<(String, String)> = HashSet::new();
        let mut failed: HashSet<(String, String)> = HashSet::new();

        loop {
            report.passes += 1;
            let mut merged: Option<(usize, usize)> = None;

            'scan: for i in 0..held.len() {
                for j in (i + 1)..held.len() {
                    let key = (held[i].opportunity_id.clone(), held[j].opportunity_id.clone());
                    if clean.contains(&key) || failed.contains(&key) {
                        continue;
                    }
                    if !related(&model, &held[i].signals, &held[j].signals, threshold) {
                        clean.insert(key);
                        continue;
                    }
                    match self.merge_pair(&held[i], &held[j]).await {
                        Ok(()) => {
                            merged = Some((i, j));
                            break 'scan;
                        }
                        Err(e) => {
                            warn!(
                                primary_id = %key.0,
                                secondary_id = %key.1,
                                error = %e,
                                "Merge failed; pair skipped"
                            );
                            report.failed_merges += 1;
                            failed.insert(key);
                        }
                    }
                }
            }

            self.progress.on_progress(&ProgressEvent::MergePass {
                pass: report.passes,
                merges_so_far: report.merges,
            });

            let Some((i, j)) = merged else { break };
            let secondary = held.remove(j);
            let primary = &mut held[i];
            absorb(&mut primary.signals, secondary.signals);

            let primary_id = primary.opportunity_id.clone();
            clean.retain(|(a, b)| *a != primary_id && *b != primary_id);
            failed.clear();
            report.merges += 1;
            self.progress.on_progress(&ProgressEvent::Merged {
                primary_id,
                secondary_id: secondary.opportunity_id,
            });
        }

        report.opportunities_remaining = held.len();
        info!(
            merges = report.merges,
            passes = report.passes,
            failed = report.failed_merges,
            remaining = report.opportunities_remaining,
            "Merge complete"
        );
        Ok(report)
    }

    async fn merge_pair(&self, primary: &Held, secondary: &Held) -> Result<(), DomainError> {
        let mut union = primary.signals.clone();
        absorb(&mut union, secondary.signals.clone());
        let text = self.materializer.describe(&union).await;
        self.opportunity_repo.merge_into(
            &primary.opportunity_id,
            &secondary.opportunity_id,
            &text.title,
            &text.description,
        )
    }
}

/// Any cross pair at or above `threshold`.
fn related(model: &SimilarityModel, a: &[Signal], b: &[Signal], threshold: f64) -> bool {
    a.iter()
        .any(|x| b.iter().any(|y| model.is_related_at(x, y, threshold)))
}

fn absorb(into: &mut Vec<Signal>, from: Vec<Signal>) {
    for s in from {
        if !into.iter().any(|existing| existing.id == s.id) {
            into.push(s);
        }
    }
}
