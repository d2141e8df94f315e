//! Embedding-based clustering.
//!
//! Same seed-anchored strategy as the text clusterer, scored by cosine
//! similarity of embedding vectors. In hybrid mode the score blends cosine
//! with text similarity. A pair where either side has no vector falls back
//! to text similarity against the text threshold, since the two scores live
//! in different numeric ranges.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::application::clustering::similarity::SimilarityModel;
use crate::application::clustering::text::seed_clusters;
use crate::config::ensure_unit_interval;
use crate::domain::entities::cluster::Cluster;
use crate::domain::entities::signal::Signal;
use crate::domain::error::DomainError;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingClusterConfig {
    pub threshold: f64,
    pub use_hybrid: bool,
    /// Share of cosine similarity in the hybrid score.
    pub embedding_weight: f64,
}

impl Default for EmbeddingClusterConfig {
    fn default() -> Self {
        Self {
            threshold: 0.75,
            use_hybrid: true,
            embedding_weight: 0.7,
        }
    }
}

impl EmbeddingClusterConfig {
    pub fn validate(&self) -> Result<(), DomainError> {
        ensure_unit_interval("embedding.threshold", self.threshold)?;
        ensure_unit_interval("embedding.embedding_weight", self.embedding_weight)
    }
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0_f64;
    let mut norm_a = 0.0_f64;
    let mut norm_b = 0.0_f64;
    for (x, y) in a.iter().zip(b.iter()) {
        let x = *x as f64;
        let y = *y as f64;
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom == 0.0 {
        0.0
    } else {
        dot / denom
    }
}

/// How a pair score was computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreBasis {
    Embedding,
    Hybrid,
    Text,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PairScore {
    pub value: f64,
    pub basis: ScoreBasis,
}

/// Scores signal pairs with vectors when both sides have one.
pub struct PairScorer<'a> {
    model: &'a SimilarityModel,
    embeddings: &'a HashMap<String, Vec<f32>>,
    config: &'a EmbeddingClusterConfig,
}

impl<'a> PairScorer<'a> {
    pub fn new(
        model: &'a SimilarityModel,
        embeddings: &'a HashMap<String, Vec<f32>>,
        config: &'a EmbeddingClusterConfig,
    ) -> Self {
        Self {
            model,
            embeddings,
            config,
        }
    }

    pub fn has_embedding(&self, signal: &Signal) -> bool {
        self.embeddings.get(&signal.id).is_some_and(|v| !v.is_empty())
    }

    /// `None` when a similarity pre-filter excludes the pair.
    pub fn score(&self, a: &Signal, b: &Signal) -> Option<PairScore> {
        let text = self.model.similarity(a, b)?;
        let vectors = match (self.embeddings.get(&a.id), self.embeddings.get(&b.id)) {
            (Some(va), Some(vb)) if !va.is_empty() && !vb.is_empty() => Some((va, vb)),
            _ => None,
        };
        let Some((va, vb)) = vectors else {
            return Some(PairScore {
                value: text,
                basis: ScoreBasis::Text,
            });
        };
        let cosine = cosine_similarity(va, vb);
        if self.config.use_hybrid {
            let w = self.config.embedding_weight;
            Some(PairScore {
                value: w * cosine + (1.0 - w) * text,
                basis: ScoreBasis::Hybrid,
            })
        } else {
            Some(PairScore {
                value: cosine,
                basis: ScoreBasis::Embedding,
            })
        }
    }

    /// Related when the score clears the threshold that matches its basis.
    pub fn is_related(&self, a: &Signal, b: &Signal) -> bool {
        match self.score(a, b) {
            Some(PairScore {
                value,
                basis: ScoreBasis::Text,
            }) => value >= self.model.config().threshold,
            Some(PairScore { value, .. }) => value >= self.config.threshold,
            None => false,
        }
    }
}

pub struct EmbeddingClusterer<'a> {
    scorer: PairScorer<'a>,
    min_cluster_size: usize,
}

impl<'a> EmbeddingClusterer<'a> {
    pub fn new(scorer: PairScorer<'a>, min_cluster_size: usize) -> Self {
        Self {
            scorer,
            min_cluster_size,
        }
    }

    /// Signals carrying a vector are tried as seeds first; order is otherwise preserved.
    pub fn cluster(&self, signals: &[Signal]) -> Vec<Cluster> {
        let mut ordered: Vec<Signal> = signals.to_vec();
        ordered.sort_by_key(|s| !self.scorer.has_embedding(s));

        let with_vectors = ordered.iter().filter(|s| self.scorer.has_embedding(s)).count();
        let clusters = seed_clusters(&ordered, self.min_cluster_size, |seed, candidate| {
            self.scorer.is_related(seed, candidate)
        });
        tracing::debug!(
            signals = signals.len(),
            with_vectors,
            clusters = clusters.len(),
            "Embedding clustering complete"
        );
        clusters
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::clustering::similarity::SimilarityConfig;
    use crate::domain::values::signal_metadata::SignalMetadata;

    fn sig(id: &str, content: &str) -> Signal {
        let metadata = SignalMetadata::default();
        let mut s = Signal::new("slack".into(), "message".into(), content.into(), metadata);
        s.id = id.into();
        s
    }

    #[test]
    fn test_cosine_basics() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-9);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-9);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 2.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }

    #[test]
    fn test_hybrid_blend_and_text_fallback() {
        let model = SimilarityModel::new(SimilarityConfig::default()).unwrap();
        let cfg = EmbeddingClusterConfig::default();
        let mut emb = HashMap::new();
        emb.insert("a".to_string(), vec![1.0, 0.0]);
        emb.insert("b".to_string(), vec![1.0, 0.0]);
        let scorer = PairScorer::new(&model, &emb, &cfg);

        let a = sig("a", "alpha");
        let b = sig("b", "beta");
        let c = sig("c", "gamma");
        let ab = scorer.score(&a, &b).unwrap();
        assert_eq!(ab.basis, ScoreBasis::Hybrid);
        let text = model.similarity(&a, &b).unwrap();
        assert!((ab.value - (0.7 + 0.3 * text)).abs() < 1e-9);
        assert_eq!(scorer.score(&a, &c).unwrap().basis, ScoreBasis::Text);
    }

    #[test]
    fn test_embedded_signals_seed_first() {
        let model = SimilarityModel::new(SimilarityConfig::default()).unwrap();
        let cfg = EmbeddingClusterConfig {
            use_hybrid: false,
            ..Default::default()
        };
        let mut emb = HashMap::new();
        emb.insert("b".to_string(), vec![1.0, 0.0]);
        emb.insert("c".to_string(), vec![0.9, 0.1]);
        let signals = vec![sig("a", "unrelated words"), sig("b", "one"), sig("c", "two")];
        let clusterer = EmbeddingClusterer::new(PairScorer::new(&model, &emb, &cfg), 2);
        let clusters = clusterer.cluster(&signals);
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].ids(), vec!["b", "c"]);
    }
}
