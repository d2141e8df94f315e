//! Pairwise signal similarity.
//!
//! Two hard pre-filters run first (same source, same type). A pair rejected
//! by either is unrelated regardless of content. Otherwise the score is a
//! weighted mean of four sub-scores in 0–1:
//!
//! - Jaccard similarity of meaningful words
//! - fuzzy overlap of customer names
//! - overlap of topics and themes
//! - time proximity: 1.0 inside the window, exponential decay beyond it

use serde::{Deserialize, Serialize};

use crate::config::{ensure_non_negative, ensure_positive, ensure_unit_interval};
use crate::domain::entities::signal::Signal;
use crate::domain::error::DomainError;
use crate::domain::values::text::{customer_overlap, jaccard, label_overlap, word_set};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimilarityConfig {
    pub word_similarity_weight: f64,
    pub customer_weight: f64,
    pub topic_weight: f64,
    pub time_weight: f64,
    pub time_window_hours: f64,
    pub require_same_source: bool,
    pub require_same_type: bool,
    /// Minimum score for two signals to count as related.
    pub threshold: f64,
}

impl Default for SimilarityConfig {
    fn default() -> Self {
        Self {
            word_similarity_weight: 0.4,
            customer_weight: 0.35,
            topic_weight: 0.2,
            time_weight: 0.05,
            time_window_hours: 72.0,
            require_same_source: true,
            require_same_type: false,
            threshold: 0.15,
        }
    }
}

impl SimilarityConfig {
    pub fn validate(&self) -> Result<(), DomainError> {
        ensure_non_negative("similarity.word_similarity_weight", self.word_similarity_weight)?;
        ensure_non_negative("similarity.customer_weight", self.customer_weight)?;
        ensure_non_negative("similarity.topic_weight", self.topic_weight)?;
        ensure_non_negative("similarity.time_weight", self.time_weight)?;
        ensure_positive("similarity weights (sum)", self.total_weight())?;
        ensure_positive("similarity.time_window_hours", self.time_window_hours)?;
        ensure_unit_interval("similarity.threshold", self.threshold)
    }

    fn total_weight(&self) -> f64 {
        self.word_similarity_weight + self.customer_weight + self.topic_weight + self.time_weight
    }
}

/// Sub-scores behind one similarity value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SimilarityBreakdown {
    pub words: f64,
    pub customers: f64,
    pub topics: f64,
    pub time: f64,
    pub score: f64,
}

#[derive(Debug, Clone)]
pub struct SimilarityModel {
    config: SimilarityConfig,
}

impl SimilarityModel {
    pub fn new(config: SimilarityConfig) -> Result<Self, DomainError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &SimilarityConfig {
        &self.config
    }

    /// True when a hard pre-filter rules the pair out.
    pub fn excluded(&self, a: &Signal, b: &Signal) -> bool {
        let source_differs = !a.source.eq_ignore_ascii_case(&b.source);
        let type_differs = !a.signal_type.eq_ignore_ascii_case(&b.signal_type);
        (self.config.require_same_source && source_differs)
            || (self.config.require_same_type && type_differs)
    }

    /// Similarity in 0–1, or `None` when a pre-filter excludes the pair.
    pub fn similarity(&self, a: &Signal, b: &Signal) -> Option<f64> {
        self.breakdown(a, b).map(|b| b.score)
    }

    pub fn breakdown(&self, a: &Signal, b: &Signal) -> Option<SimilarityBreakdown> {
        if self.excluded(a, b) {
            return None;
        }
        let c = &self.config;
        let words = jaccard(&word_set(a.text()), &word_set(b.text()));
        let customers = customer_overlap(&a.metadata.customers, &b.metadata.customers);
        let topics = label_overlap(&a.metadata.labels(), &b.metadata.labels());
        let time = self.time_proximity(a, b);

        let weighted = words * c.word_similarity_weight
            + customers * c.customer_weight
            + topics * c.topic_weight
            + time * c.time_weight;
        let score = (weighted / c.total_weight()).clamp(0.0, 1.0);

        Some(SimilarityBreakdown {
            words,
            customers,
            topics,
            time,
            score,
        })
    }

    /// Related at the configured threshold.
    pub fn is_related(&self, a: &Signal, b: &Signal) -> bool {
        self.is_related_at(a, b, self.config.threshold)
    }

    pub fn is_related_at(&self, a: &Signal, b: &Signal, threshold: f64) -> bool {
        self.similarity(a, b).is_some_and(|s| s >= threshold)
    }

    fn time_proximity(&self, a: &Signal, b: &Signal) -> f64 {
        let window = self.config.time_window_hours;
        let delta_hours = (a.created_at - b.created_at).num_seconds().abs() as f64 / 3600.0;
        if delta_hours <= window {
            1.0
        } else {
            (-(delta_hours - window) / window).exp()
        }
    }
}
