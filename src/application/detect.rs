//! Opportunity detection use case.
//!
//! One run takes every signal not yet linked to an opportunity and:
//!
//! 1. tries to attach it to an existing opportunity (first fit, in listing
//!    order, against each opportunity's current signals, including ones
//!    attached earlier in the same run);
//! 2. clusters whatever matched nothing, by text or by embedding;
//! 3. refines embedding clusters;
//! 4. persists each surviving cluster as a new opportunity.
//!
//! Opportunities that gained signals get their title and description
//! regenerated. Runs assume a single writer per database.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use crate::application::clustering::embedding::{EmbeddingClusterer, PairScorer};
use crate::application::clustering::refine::{ClusterRefiner, RefinementReport};
use crate::application::clustering::similarity::SimilarityModel;
use crate::application::clustering::text::{ClusteringMode, TextClusterer};
use crate::application::materialize::Materializer;
use crate::config::EngineConfig;
use crate::domain::entities::opportunity::Opportunity;
use crate::domain::entities::signal::Signal;
use crate::domain::error::DomainError;
use crate::domain::ports::opportunity_repository::OpportunityRepository;
use crate::domain::ports::progress::{ProgressEvent, ProgressObserver};
use crate::domain::ports::signal_repository::SignalRepository;
use crate::domain::ports::vector_store::VectorStore;

const PROGRESS_EVERY: usize = 100;

#[derive(Debug, Clone, Default)]
pub struct DetectOptions {
    /// Only consider unlinked signals from this source.
    pub source: Option<String>,
    /// Overrides `clustering.mode` from the config.
    pub mode: Option<ClusteringMode>,
}

/// Result of one detection run.
#[derive(Debug, Default, Serialize)]
pub struct DetectionReport {
    pub signals_processed: usize,
    pub signals_matched: usize,
    pub clusters_formed: usize,
    pub new_opportunities: Vec<Opportunity>,
    pub updated_opportunities: Vec<Opportunity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refinement: Option<RefinementReport>,
}

/// In-memory view of an opportunity and the signals it currently holds.
struct Candidate {
    opportunity_id: String,
    signals: Vec<Signal>,
    touched: bool,
}

pub struct DetectOpportunitiesUseCase {
    signal_repo: Arc<dyn SignalRepository>,
    opportunity_repo: Arc<dyn OpportunityRepository>,
    vector_store: Arc<dyn VectorStore>,
    materializer: Arc<Materializer>,
    progress: Arc<dyn ProgressObserver>,
}

impl DetectOpportunitiesUseCase {
    pub fn new(
        signal_repo: Arc<dyn SignalRepository>,
        opportunity_repo: Arc<dyn OpportunityRepository>,
        vector_store: Arc<dyn VectorStore>,
        materializer: Arc<Materializer>,
        progress: Arc<dyn ProgressObserver>,
    ) -> Self {
        Self {
            signal_repo,
            opportunity_repo,
            vector_store,
            materializer,
            progress,
        }
    }

    pub async fn execute(
        &self,
        config: &EngineConfig,
        options: &DetectOptions,
    ) -> Result<DetectionReport, DomainError> {
        config.validate()?;
        let model = SimilarityModel::new(config.similarity.clone())?;

        let pool = self.signal_repo.unlinked(options.source.as_deref())?;
        let mut report = DetectionReport {
            signals_processed: pool.len(),
            ..Default::default()
        };
        if pool.is_empty() {
            info!("No unlinked signals; nothing to detect");
            return Ok(report);
        }

        let (unmatched, touched) = self.match_existing(&model, pool, &mut report)?;

        for opportunity_id in &touched {
            let refreshed = self.materializer.refresh(opportunity_id).await?;
            report.updated_opportunities.push(refreshed);
        }

        let mode = options.mode.unwrap_or(config.clustering.mode);
        let min_size = config.clustering.min_cluster_size;
        let clusters = match mode {
            ClusteringMode::Text => {
                let clusters = TextClusterer::new(&model, min_size).cluster(&unmatched);
                self.progress.on_progress(&ProgressEvent::Clustered {
                    candidates: unmatched.len(),
                    clusters: clusters.len(),
                });
                clusters
            }
            ClusteringMode::Embedding => {
                let embeddings = self.load_embeddings(&unmatched)?;
                let scorer = PairScorer::new(&model, &embeddings, &config.embedding);
                let clusters = EmbeddingClusterer::new(
                    PairScorer::new(&model, &embeddings, &config.embedding),
                    min_size,
                )
                .cluster(&unmatched);
                self.progress.on_progress(&ProgressEvent::Clustered {
                    candidates: unmatched.len(),
                    clusters: clusters.len(),
                });
                let before = clusters.len();
                let (refined, refinement) =
                    ClusterRefiner::new(&scorer, &config.refinement, min_size).refine(clusters);
                self.progress.on_progress(&ProgressEvent::Refined {
                    before,
                    after: refined.len(),
                    skipped: refinement.skipped,
                });
                report.refinement = Some(refinement);
                refined
            }
        };
        report.clusters_formed = clusters.len();

        for cluster in &clusters {
            let opportunity = self.materializer.materialize(cluster).await?;
            self.progress.on_progress(&ProgressEvent::OpportunityCreated {
                opportunity_id: opportunity.id.clone(),
                signal_count: cluster.len(),
            });
            report.new_opportunities.push(opportunity);
        }

        info!(
            processed = report.signals_processed,
            matched = report.signals_matched,
            clusters = report.clusters_formed,
            created = report.new_opportunities.len(),
            updated = report.updated_opportunities.len(),
            mode = ?mode,
            "Detection complete"
        );
        Ok(report)
    }

    /// First-fit matching of the pool against existing opportunities.
    ///
    /// Returns the signals that matched nothing and the ids of opportunities
    /// that gained signals, in listing order.
    fn match_existing(
        &self,
        model: &SimilarityModel,
        pool: Vec<Signal>,
        report: &mut DetectionReport,
    ) -> Result<(Vec<Signal>, Vec<String>), DomainError> {
        let mut candidates = Vec::new();
        for opportunity in self.opportunity_repo.list()? {
            let signals = self.opportunity_repo.linked_signals(&opportunity.id)?;
            candidates.push(Candidate {
                opportunity_id: opportunity.id,
                signals,
                touched: false,
            });
        }

        let total = pool.len();
        let mut unmatched = Vec::new();
        for (processed, signal) in pool.into_iter().enumerate() {
            let target = candidates
                .iter()
                .position(|c| c.signals.iter().any(|existing| model.is_related(&signal, existing)));

            match target {
                Some(idx) => {
                    let candidate = &mut candidates[idx];
                    self.opportunity_repo
                        .link_signals(&candidate.opportunity_id, &[signal.id.clone()])?;
                    debug!(
                        signal_id = %signal.id,
                        opportunity_id = %candidate.opportunity_id,
                        "Signal attached to existing opportunity"
                    );
                    candidate.signals.push(signal);
                    candidate.touched = true;
                    report.signals_matched += 1;
                }
                None => unmatched.push(signal),
            }

            if (processed + 1) % PROGRESS_EVERY == 0 || processed + 1 == total {
                self.progress.on_progress(&ProgressEvent::Matching {
                    processed: processed + 1,
                    total,
                    matched: report.signals_matched,
                });
            }
        }

        let touched = candidates
            .into_iter()
            .filter(|c| c.touched)
            .map(|c| c.opportunity_id)
            .collect();
        Ok((unmatched, touched))
    }

    fn load_embeddings(
        &self,
        signals: &[Signal],
    ) -> Result<HashMap<String, Vec<f32>>, DomainError> {
        let mut embeddings = HashMap::with_capacity(signals.len());
        for s in signals {
            if let Some(v) = self.vector_store.get(&s.id)? {
                embeddings.insert(s.id.clone(), v);
            }
        }
        if embeddings.len() < signals.len() {
            debug!(
                with_vectors = embeddings.len(),
                without = signals.len() - embeddings.len(),
                "Some signals have no embedding; text similarity is used for them"
            );
        }
        Ok(embeddings)
    }
}

