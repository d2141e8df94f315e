//! Roadmap use case: score opportunities and slice them into views.
//!
//! Enrichment (extractions, theme trends) is gathered first; lookups that
//! fail are logged and scoring continues without that input.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, warn};

use crate::application::materialize::Materializer;
use crate::application::roadmap_scorer::{collect_themes, score_signals, ScoringContext};
use crate::domain::entities::opportunity::Opportunity;
use crate::domain::entities::signal::Signal;
use crate::domain::error::DomainError;
use crate::domain::ports::opportunity_repository::OpportunityRepository;
use crate::domain::ports::trend_service::TrendService;
use crate::domain::values::roadmap_score::{RoadmapConfig, ScoredOpportunity};

const QUICK_WIN_MIN_EFFORT: f64 = 70.0;
const QUICK_WIN_MIN_IMPACT: f64 = 40.0;
const STRATEGIC_MIN: f64 = 70.0;
const EMERGING_MIN_URGENCY: f64 = 60.0;
const HIGH_CONFIDENCE_MIN: f64 = 70.0;

/// A filtered, ordered slice of scored opportunities.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RoadmapView {
    /// Everything, by overall score.
    #[default]
    All,
    /// Easy and still impactful, by impact.
    QuickWins,
    /// Strong strategic fit, by strategic score.
    Strategic,
    /// Urgent, by urgency.
    Emerging,
    /// Well-evidenced, by confidence.
    HighConfidence,
}

impl fmt::Display for RoadmapView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoadmapView::All => write!(f, "all"),
            RoadmapView::QuickWins => write!(f, "quick-wins"),
            RoadmapView::Strategic => write!(f, "strategic"),
            RoadmapView::Emerging => write!(f, "emerging"),
            RoadmapView::HighConfidence => write!(f, "high-confidence"),
        }
    }
}

impl FromStr for RoadmapView {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "all" | "top" => Ok(RoadmapView::All),
            "quick-wins" | "quickwins" => Ok(RoadmapView::QuickWins),
            "strategic" => Ok(RoadmapView::Strategic),
            "emerging" | "urgent" => Ok(RoadmapView::Emerging),
            "high-confidence" | "confident" => Ok(RoadmapView::HighConfidence),
            _ => Err(format!(
                "Unknown roadmap view: {s}. Use all, quick-wins, strategic, emerging or high-confidence"
            )),
        }
    }
}

/// Filter and order already-scored opportunities: view key, then overall.
pub fn apply_view(
    mut scored: Vec<ScoredOpportunity>,
    view: RoadmapView,
    limit: Option<usize>,
) -> Vec<ScoredOpportunity> {
    scored.retain(|s| {
        let sc = &s.score;
        match view {
            RoadmapView::All => true,
            RoadmapView::QuickWins => {
                sc.effort_score >= QUICK_WIN_MIN_EFFORT && sc.impact_score >= QUICK_WIN_MIN_IMPACT
            }
            RoadmapView::Strategic => sc.strategic_score >= STRATEGIC_MIN,
            RoadmapView::Emerging => sc.urgency_score >= EMERGING_MIN_URGENCY,
            RoadmapView::HighConfidence => sc.confidence_score >= HIGH_CONFIDENCE_MIN,
        }
    });
    let key = |s: &ScoredOpportunity| match view {
        RoadmapView::All => s.score.overall_score,
        RoadmapView::QuickWins => s.score.impact_score,
        RoadmapView::Strategic => s.score.strategic_score,
        RoadmapView::Emerging => s.score.urgency_score,
        RoadmapView::HighConfidence => s.score.confidence_score,
    };
    scored.sort_by(|a, b| {
        key(b)
            .total_cmp(&key(a))
            .then(b.score.overall_score.total_cmp(&a.score.overall_score))
    });
    if let Some(n) = limit {
        scored.truncate(n);
    }
    scored
}

pub struct RoadmapUseCase {
    opportunity_repo: Arc<dyn OpportunityRepository>,
    materializer: Arc<Materializer>,
    trend_service: Arc<dyn TrendService>,
}

impl RoadmapUseCase {
    pub fn new(
        opportunity_repo: Arc<dyn OpportunityRepository>,
        materializer: Arc<Materializer>,
        trend_service: Arc<dyn TrendService>,
    ) -> Self {
        Self {
            opportunity_repo,
            materializer,
            trend_service,
        }
    }

    pub async fn score(
        &self,
        opportunity_id: &str,
        config: &RoadmapConfig,
        now: DateTime<Utc>,
    ) -> Result<ScoredOpportunity, DomainError> {
        config.validate()?;
        let opportunity = self
            .opportunity_repo
            .get(opportunity_id)?
            .ok_or_else(|| {
                DomainError::NotFound(format!("Opportunity not found: {opportunity_id}"))
            })?;
        self.score_one(opportunity, config, now).await
    }

    pub async fn view(
        &self,
        view: RoadmapView,
        config: &RoadmapConfig,
        now: DateTime<Utc>,
        limit: Option<usize>,
    ) -> Result<Vec<ScoredOpportunity>, DomainError> {
        config.validate()?;
        let mut scored = Vec::new();
        for opportunity in self.opportunity_repo.list()? {
            scored.push(self.score_one(opportunity, config, now).await?);
        }
        debug!(view = %view, scored = scored.len(), "Opportunities scored");
        Ok(apply_view(scored, view, limit))
    }

    async fn score_one(
        &self,
        opportunity: Opportunity,
        config: &RoadmapConfig,
        now: DateTime<Utc>,
    ) -> Result<ScoredOpportunity, DomainError> {
        let signals = self.opportunity_repo.linked_signals(&opportunity.id)?;
        let ctx = self.context(&signals).await;
        let score = score_signals(&signals, &ctx, config, now);
        Ok(ScoredOpportunity {
            opportunity_id: opportunity.id,
            title: opportunity.title,
            signal_count: signals.len(),
            score,
        })
    }

    async fn context(&self, signals: &[Signal]) -> ScoringContext {
        let extractions = self.materializer.enrichment(signals).await;
        let mut trends = HashMap::new();
        for theme in collect_themes(signals, &extractions) {
            match self.trend_service.trend_for(&theme).await {
                Ok(Some(direction)) => {
                    trends.insert(theme, direction);
                }
                Ok(None) => {}
                Err(e) => warn!(theme = %theme, error = %e, "Trend lookup failed; ignoring"),
            }
        }
        ScoringContext { extractions, trends }
    }
}
