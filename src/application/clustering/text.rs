//! Greedy, seed-anchored text clustering.
//!
//! Signals are visited in input order. The first unassigned signal seeds a
//! new cluster and every later unassigned signal related *to the seed* joins
//! it. Membership is not transitive: two members may be unrelated to each
//! other. Cost is one similarity check per candidate per cluster.

use serde::{Deserialize, Serialize};

use crate::application::clustering::similarity::SimilarityModel;
use crate::domain::entities::cluster::Cluster;
use crate::domain::entities::signal::Signal;
use crate::domain::error::DomainError;

/// Which clusterer handles signals that matched no existing opportunity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClusteringMode {
    #[default]
    Text,
    Embedding,
}

impl std::str::FromStr for ClusteringMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(ClusteringMode::Text),
            "embedding" | "embeddings" | "vector" => Ok(ClusteringMode::Embedding),
            _ => Err(format!("Unknown clustering mode: '{s}'. Use 'text' or 'embedding'")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusteringConfig {
    /// Smallest cluster that becomes an opportunity.
    pub min_cluster_size: usize,
    pub mode: ClusteringMode,
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            min_cluster_size: 2,
            mode: ClusteringMode::Text,
        }
    }
}

impl ClusteringConfig {
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.min_cluster_size == 0 {
            return Err(DomainError::Config(
                "clustering.min_cluster_size must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Group signals around seeds using a relatedness predicate.
///
/// Shared by the text and embedding clusterers; clusters below
/// `min_cluster_size` are dropped and their signals stay unassigned.
pub fn seed_clusters<F>(signals: &[Signal], min_cluster_size: usize, related: F) -> Vec<Cluster>
where
    F: Fn(&Signal, &Signal) -> bool,
{
    let mut assigned = vec![false; signals.len()];
    let mut clusters = Vec::new();

    for seed_idx in 0..signals.len() {
        if assigned[seed_idx] {
            continue;
        }
        assigned[seed_idx] = true;
        let seed = &signals[seed_idx];
        let mut cluster = Cluster::from_seed(seed.clone());

        for idx in (seed_idx + 1)..signals.len() {
            if assigned[idx] {
                continue;
            }
            if related(seed, &signals[idx]) {
                assigned[idx] = true;
                cluster.signals.push(signals[idx].clone());
            }
        }

        if cluster.len() >= min_cluster_size {
            clusters.push(cluster);
        }
    }

    clusters
}

pub struct TextClusterer<'a> {
    model: &'a SimilarityModel,
    min_cluster_size: usize,
}

impl<'a> TextClusterer<'a> {
    pub fn new(model: &'a SimilarityModel, min_cluster_size: usize) -> Self {
        Self {
            model,
            min_cluster_size,
        }
    }

    pub fn cluster(&self, signals: &[Signal]) -> Vec<Cluster> {
        let clusters = seed_clusters(signals, self.min_cluster_size, |seed, candidate| {
            self.model.is_related(seed, candidate)
        });
        tracing::debug!(
            signals = signals.len(),
            clusters = clusters.len(),
            "Text clustering complete"
        );
        clusters
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::clustering::similarity::SimilarityConfig;
    use crate::domain::values::signal_metadata::SignalMetadata;
    use chrono::Utc;

    fn sig(id: &str, content: &str) -> Signal {
        let metadata = SignalMetadata::default();
        let mut s = Signal::new("slack".into(), "message".into(), content.into(), metadata);
        s.id = id.into();
        s.created_at = Utc::now();
        s
    }

    #[test]
    fn test_small_clusters_dropped() {
        let model = SimilarityModel::new(SimilarityConfig::default()).unwrap();
        let signals = vec![
            sig("a", "checkout payment failing"),
            sig("b", "dark mode request"),
        ];
        let clusters = TextClusterer::new(&model, 2).cluster(&signals);
        assert!(clusters.is_empty());
    }

    #[test]
    fn test_membership_is_anchored_on_seed() {
        // b relates to the seed and c relates to b but not the seed, so c stays out.
        let signals = vec![sig("a", "x"), sig("b", "y"), sig("c", "z")];
        let related = |s: &Signal, c: &Signal| {
            matches!((s.id.as_str(), c.id.as_str()), ("a", "b") | ("b", "c"))
        };
        let clusters = seed_clusters(&signals, 2, related);
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].ids(), vec!["a", "b"]);
    }

    fn feedback() -> Vec<Signal> {
        let acme = SignalMetadata::from_value(&serde_json::json!({"customers": ["Acme"]}));
        let mut a = sig("a", "Dashboard loads slowly for Acme");
        a.metadata = acme.clone();
        let mut c = sig("c", "Acme dashboard slow again");
        c.metadata = acme;
        vec![
            a,
            sig("b", "Checkout payment failing on mobile"),
            c,
            sig("d", "Payment failing at checkout step"),
            sig("e", "Dark mode request"),
            sig("f", "Dashboard charts slow to render"),
        ]
    }

    fn partition(clusters: &[Cluster]) -> Vec<Vec<String>> {
        clusters.iter().map(|c| c.ids()).collect()
    }

    #[test]
    fn test_same_input_same_partition() {
        let model = SimilarityModel::new(SimilarityConfig::default()).unwrap();
        let signals = feedback();
        let first = TextClusterer::new(&model, 2).cluster(&signals);
        let second = TextClusterer::new(&model, 2).cluster(&signals);
        assert!(!first.is_empty());
        assert_eq!(partition(&first), partition(&second));
    }

    #[test]
    fn test_every_member_clears_threshold_against_seed() {
        let config = SimilarityConfig::default();
        let threshold = config.threshold;
        let model = SimilarityModel::new(config).unwrap();
        let clusters = TextClusterer::new(&model, 2).cluster(&feedback());
        assert!(!clusters.is_empty());
        for cluster in &clusters {
            let seed = &cluster.signals[0];
            for member in &cluster.signals[1..] {
                let score = model.similarity(seed, member).unwrap();
                assert!(score >= threshold, "{} -> {}: {score}", seed.id, member.id);
            }
        }
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!("embedding".parse::<ClusteringMode>().unwrap(), ClusteringMode::Embedding);
        assert!("kmeans".parse::<ClusteringMode>().is_err());
    }
}
