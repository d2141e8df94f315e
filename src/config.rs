//! Engine configuration.
//!
//! Every tunable of the detection, merge and scoring passes lives in
//! [`EngineConfig`]. Files are JSON; any field left out keeps its default.
//! Nothing here is global state: callers build a config and pass it in.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::application::clustering::embedding::EmbeddingClusterConfig;
use crate::application::clustering::refine::RefinementConfig;
use crate::application::clustering::similarity::SimilarityConfig;
use crate::application::clustering::text::ClusteringConfig;
use crate::domain::error::DomainError;
use crate::domain::values::roadmap_score::RoadmapConfig;

/// Env var naming an optional JSON config file.
pub const CONFIG_ENV: &str = "FEEDBACKMAP_CONFIG";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub similarity: SimilarityConfig,
    pub clustering: ClusteringConfig,
    pub embedding: EmbeddingClusterConfig,
    pub refinement: RefinementConfig,
    pub roadmap: RoadmapConfig,
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), DomainError> {
        self.similarity.validate()?;
        self.clustering.validate()?;
        self.embedding.validate()?;
        self.refinement.validate()?;
        self.roadmap.validate()
    }

    pub fn from_json_str(json: &str) -> Result<Self, DomainError> {
        let config: EngineConfig = serde_json::from_str(json)
            .map_err(|e| DomainError::Config(format!("Invalid config JSON: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, DomainError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            DomainError::Config(format!("Cannot read config {}: {e}", path.display()))
        })?;
        Self::from_json_str(&raw)
    }

    /// Explicit path first, then `FEEDBACKMAP_CONFIG`, then defaults.
    pub fn resolve(path: Option<&Path>) -> Result<Self, DomainError> {
        if let Some(p) = path {
            return Self::load(p);
        }
        match std::env::var(CONFIG_ENV) {
            Ok(p) if !p.trim().is_empty() => Self::load(Path::new(p.trim())),
            _ => Ok(Self::default()),
        }
    }
}

pub(crate) fn ensure_unit_interval(name: &str, value: f64) -> Result<(), DomainError> {
    if !value.is_finite() || !(0.0..=1.0).contains(&value) {
        return Err(DomainError::Config(format!(
            "{name} must be between 0.0 and 1.0, got {value}"
        )));
    }
    Ok(())
}

pub(crate) fn ensure_non_negative(name: &str, value: f64) -> Result<(), DomainError> {
    if !value.is_finite() || value < 0.0 {
        return Err(DomainError::Config(format!(
            "{name} must be a non-negative number, got {value}"
        )));
    }
    Ok(())
}

pub(crate) fn ensure_positive(name: &str, value: f64) -> Result<(), DomainError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(DomainError::Config(format!(
            "{name} must be greater than zero, got {value}"
        )));
    }
    Ok(())
}
