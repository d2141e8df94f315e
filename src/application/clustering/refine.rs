//! Post-processing of embedding clusters.
//!
//! 1. Overlap merge: clusters whose signal sets overlap by at least
//!    `overlap_merge_threshold` (intersection over the smaller set) are fused.
//! 2. Centroid reassignment: each cluster gets one representative (first
//!    member with a vector, else first member); every signal moves to the
//!    representative it scores highest against.
//! 3. Quality gate: clusters whose average signal quality is below
//!    `min_average_quality` are discarded, then the size floor is reapplied.
//!
//! Steps 1 and 2 are skipped above `max_clusters` to bound cost.

use std::collections::{HashSet, VecDeque};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::application::clustering::embedding::PairScorer;
use crate::config::ensure_unit_interval;
use crate::domain::entities::cluster::Cluster;
use crate::domain::error::DomainError;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RefinementConfig {
    pub overlap_merge_threshold: f64,
    pub min_average_quality: f64,
    /// Above this many clusters the merge and reassignment passes are skipped.
    pub max_clusters: usize,
}

impl Default for RefinementConfig {
    fn default() -> Self {
        Self {
            overlap_merge_threshold: 0.5,
            min_average_quality: 0.35,
            max_clusters: 1500,
        }
    }
}

impl RefinementConfig {
    pub fn validate(&self) -> Result<(), DomainError> {
        ensure_unit_interval("refinement.overlap_merge_threshold", self.overlap_merge_threshold)?;
        ensure_unit_interval("refinement.min_average_quality", self.min_average_quality)
    }
}

/// Counters from one refinement run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RefinementReport {
    pub input_clusters: usize,
    pub overlap_merges: usize,
    pub reassigned_signals: usize,
    pub dropped_low_quality: usize,
    pub dropped_undersized: usize,
    pub skipped: bool,
}

pub struct ClusterRefiner<'a> {
    scorer: &'a PairScorer<'a>,
    config: &'a RefinementConfig,
    min_cluster_size: usize,
}

impl<'a> ClusterRefiner<'a> {
    pub fn new(
        scorer: &'a PairScorer<'a>,
        config: &'a RefinementConfig,
        min_cluster_size: usize,
    ) -> Self {
        Self {
            scorer,
            config,
            min_cluster_size,
        }
    }

    pub fn refine(&self, clusters: Vec<Cluster>) -> (Vec<Cluster>, RefinementReport) {
        let mut report = RefinementReport {
            input_clusters: clusters.len(),
            ..Default::default()
        };

        let mut clusters = clusters;
        if clusters.len() > self.config.max_clusters {
            warn!(
                clusters = clusters.len(),
                cap = self.config.max_clusters,
                "Too many clusters; skipping overlap merge and reassignment"
            );
            report.skipped = true;
        } else {
            let (merged, merges) = merge_overlapping(clusters, self.config.overlap_merge_threshold);
            report.overlap_merges = merges;
            let (reassigned, moved) = self.reassign(merged);
            report.reassigned_signals = moved;
            clusters = reassigned;
        }

        let before_quality = clusters.len();
        clusters.retain(|c| c.average_quality() >= self.config.min_average_quality);
        report.dropped_low_quality = before_quality - clusters.len();

        let before_size = clusters.len();
        clusters.retain(|c| c.len() >= self.min_cluster_size);
        report.dropped_undersized = before_size - clusters.len();

        debug!(
            input = report.input_clusters,
            output = clusters.len(),
            merges = report.overlap_merges,
            moved = report.reassigned_signals,
            low_quality = report.dropped_low_quality,
            "Refinement complete"
        );
        (clusters, report)
    }

    /// Move every signal to its best-scoring representative. Representatives stay put.
    fn reassign(&self, clusters: Vec<Cluster>) -> (Vec<Cluster>, usize) {
        if clusters.len() < 2 {
            return (clusters, 0);
        }
        let representatives: Vec<_> = clusters
            .iter()
            .map(|c| {
                c.signals
                    .iter()
                    .find(|s| self.scorer.has_embedding(s))
                    .or_else(|| c.signals.first())
                    .cloned()
            })
            .collect();
        let mut placed: HashSet<String> = representatives
            .iter()
            .flatten()
            .map(|s| s.id.clone())
            .collect();

        let mut out: Vec<Cluster> = representatives
            .iter()
            .map(|r| Cluster {
                signals: r.iter().cloned().collect(),
            })
            .collect();
        let mut moved = 0usize;

        for (home, cluster) in clusters.into_iter().enumerate() {
            for signal in cluster.signals {
                if !placed.insert(signal.id.clone()) {
                    continue;
                }
                let mut best = home;
                let mut best_score = representatives[home]
                    .as_ref()
                    .and_then(|r| self.scorer.score(&signal, r))
                    .map(|s| s.value)
                    .unwrap_or(f64::NEG_INFINITY);
                for (idx, rep) in representatives.iter().enumerate() {
                    if idx == home {
                        continue;
                    }
                    let Some(rep) = rep else { continue };
                    if let Some(score) = self.scorer.score(&signal, rep) {
                        if score.value > best_score {
                            best = idx;
                            best_score = score.value;
                        }
                    }
                }
                if best != home {
                    moved += 1;
                }
                out[best].signals.push(signal);
            }
        }

        out.retain(|c| !c.is_empty());
        (out, moved)
    }
}

fn overlap_ratio(a: &Cluster, b: &Cluster) -> f64 {
    let smaller = a.len().min(b.len());
    if smaller == 0 {
        return 0.0;
    }
    let a_ids = a.id_set();
    let shared = b.signals.iter().filter(|s| a_ids.contains(s.id.as_str())).count();
    shared as f64 / smaller as f64
}

/// Fuse clusters that share enough signals. Returns the survivors and the merge count.
pub fn merge_overlapping(clusters: Vec<Cluster>, threshold: f64) -> (Vec<Cluster>, usize) {
    let mut pending: VecDeque<Cluster> = clusters.into();
    let mut done = Vec::new();
    let mut merges = 0usize;

    while let Some(mut current) = pending.pop_front() {
        loop {
            let mut absorbed_any = false;
            let mut rest = VecDeque::with_capacity(pending.len());
            while let Some(other) = pending.pop_front() {
                if overlap_ratio(&current, &other) >= threshold {
                    current.absorb(other);
                    merges += 1;
                    absorbed_any = true;
                } else {
                    rest.push_back(other);
                }
            }
            pending = rest;
            if !absorbed_any {
                break;
            }
        }
        done.push(current);
    }

    (done, merges)
}
