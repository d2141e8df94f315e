//! Roadmap prioritization score and its configuration.
//!
//! A [`RoadmapScore`] is derived on demand from an opportunity's signals and is
//! never persisted. Every numeric field lies in 0–100.

use serde::{Deserialize, Serialize};

use crate::config::{ensure_non_negative, ensure_positive};
use crate::domain::error::DomainError;
use crate::domain::values::customer_tier::CustomerTier;

/// Longest accepted recency window, ten years.
pub const MAX_RECENT_WINDOW_DAYS: i64 = 3650;

/// Weights of the five dimensions in the overall score.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreWeights {
    pub impact: f64,
    pub confidence: f64,
    pub effort: f64,
    pub strategic: f64,
    pub urgency: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            impact: 0.30,
            confidence: 0.25,
            effort: 0.15,
            strategic: 0.15,
            urgency: 0.15,
        }
    }
}

impl ScoreWeights {
    pub fn total(&self) -> f64 {
        self.impact + self.confidence + self.effort + self.strategic + self.urgency
    }
}

/// Impact multiplier per customer tier.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TierWeights {
    pub enterprise: f64,
    pub growth: f64,
    pub startup: f64,
    pub unknown: f64,
}

impl Default for TierWeights {
    fn default() -> Self {
        Self {
            enterprise: 3.0,
            growth: 2.0,
            startup: 1.0,
            unknown: 0.5,
        }
    }
}

impl TierWeights {
    pub fn weight(&self, tier: CustomerTier) -> f64 {
        match tier {
            CustomerTier::Enterprise => self.enterprise,
            CustomerTier::Growth => self.growth,
            CustomerTier::Startup => self.startup,
            CustomerTier::Unknown => self.unknown,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RoadmapConfig {
    pub weights: ScoreWeights,
    pub tier_weights: TierWeights,
    /// Themes the business is prioritizing. Empty means strategic fit is neutral.
    pub strategic_priorities: Vec<String>,
    /// Signals newer than this count as "recent" for urgency.
    pub recent_window_days: i64,
}

impl Default for RoadmapConfig {
    fn default() -> Self {
        Self {
            weights: ScoreWeights::default(),
            tier_weights: TierWeights::default(),
            strategic_priorities: Vec::new(),
            recent_window_days: 7,
        }
    }
}

impl RoadmapConfig {
    pub fn validate(&self) -> Result<(), DomainError> {
        let w = &self.weights;
        ensure_non_negative("roadmap.weights.impact", w.impact)?;
        ensure_non_negative("roadmap.weights.confidence", w.confidence)?;
        ensure_non_negative("roadmap.weights.effort", w.effort)?;
        ensure_non_negative("roadmap.weights.strategic", w.strategic)?;
        ensure_non_negative("roadmap.weights.urgency", w.urgency)?;
        ensure_positive("roadmap.weights (sum)", w.total())?;
        let t = &self.tier_weights;
        ensure_non_negative("roadmap.tier_weights.enterprise", t.enterprise)?;
        ensure_non_negative("roadmap.tier_weights.growth", t.growth)?;
        ensure_non_negative("roadmap.tier_weights.startup", t.startup)?;
        ensure_non_negative("roadmap.tier_weights.unknown", t.unknown)?;
        if !(1..=MAX_RECENT_WINDOW_DAYS).contains(&self.recent_window_days) {
            return Err(DomainError::Config(format!(
                "roadmap.recent_window_days must be between 1 and {MAX_RECENT_WINDOW_DAYS}, got {}",
                self.recent_window_days
            )));
        }
        Ok(())
    }
}

/// Per-component detail behind the five dimension scores.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    pub unique_customers: usize,
    pub customer_component: f64,
    pub tier_component: f64,
    pub volume_component: f64,
    pub engagement_component: f64,
    pub average_quality: f64,
    pub source_count: usize,
    pub matched_complexity_keywords: Vec<String>,
    pub extracted_features: usize,
    pub extracted_issues: usize,
    pub matched_priorities: Vec<String>,
    pub recent_ratio: f64,
    pub trend: Option<String>,
    pub acceleration_component: f64,
    pub forum_component: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoadmapScore {
    pub overall_score: f64,
    pub impact_score: f64,
    pub confidence_score: f64,
    /// Inverted: higher means easier.
    pub effort_score: f64,
    pub strategic_score: f64,
    pub urgency_score: f64,
    pub breakdown: ScoreBreakdown,
}

/// An opportunity together with its computed score.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredOpportunity {
    pub opportunity_id: String,
    pub title: String,
    pub signal_count: usize,
    pub score: RoadmapScore,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(RoadmapConfig::default().validate().is_ok());
    }

    #[test]
    fn test_recent_window_out_of_range_is_config_error() {
        for days in [0, -3, MAX_RECENT_WINDOW_DAYS + 1, i64::MAX / 2] {
            let cfg = RoadmapConfig {
                recent_window_days: days,
                ..Default::default()
            };
            assert!(matches!(cfg.validate(), Err(DomainError::Config(_))), "days = {days}");
        }
        let cfg = RoadmapConfig {
            recent_window_days: MAX_RECENT_WINDOW_DAYS,
            ..Default::default()
        };
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_zero_weight_sum_is_rejected() {
        let cfg = RoadmapConfig {
            weights: ScoreWeights {
                impact: 0.0,
                confidence: 0.0,
                effort: 0.0,
                strategic: 0.0,
                urgency: 0.0,
            },
            ..Default::default()
        };
        assert!(matches!(cfg.validate(), Err(DomainError::Config(_))));
    }
}
