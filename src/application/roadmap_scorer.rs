//! Five-dimension roadmap prioritization.
//!
//! [`score_signals`] is pure: the same signals, context, config and `now`
//! always produce the same [`RoadmapScore`]. Any I/O (extractions, trend
//! labels) is resolved beforehand into a [`ScoringContext`].
//!
//! | dimension  | components (each capped)                                           |
//! |------------|--------------------------------------------------------------------|
//! | impact     | log2 unique customers ≤40, tier boost ≤25, volume ≤20, forum ≤15    |
//! | confidence | avg quality ≤50, source diversity ≤25, volume ≤25                   |
//! | effort     | 50 ± theme keywords, − theme sprawl, − extracted complexity; 10–100 |
//! | strategic  | 20 + 80 × matched priorities / priorities; 50 with none configured  |
//! | urgency    | recent ratio ≤40, trend ≤30, acceleration ≤15, open forum ≤15       |

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Duration, Utc};

use crate::application::materialize::aggregate_customers;
use crate::domain::entities::extraction::Extraction;
use crate::domain::entities::signal::Signal;
use crate::domain::values::customer_tier::CustomerTier;
use crate::domain::values::roadmap_score::{
    RoadmapConfig, RoadmapScore, ScoreBreakdown, MAX_RECENT_WINDOW_DAYS,
};
use crate::domain::values::signal_metadata::ThreadStatus;
use crate::domain::values::text::customers_match;
use crate::domain::values::trend_direction::TrendDirection;

const HARD_KEYWORDS: &[&str] = &[
    "integration", "security", "migration", "infrastructure", "compliance", "architecture",
    "sso", "api",
];
const EASY_KEYWORDS: &[&str] = &[
    "ui", "ux", "documentation", "docs", "fix", "typo", "copy", "label",
];
const KEYWORD_STEP: f64 = 8.0;
const FREE_THEMES: usize = 3;

/// Enrichment resolved before scoring.
#[derive(Debug, Clone, Default)]
pub struct ScoringContext {
    /// Extractions keyed by signal id.
    pub extractions: HashMap<String, Extraction>,
    /// Trend label keyed by lowercase theme.
    pub trends: HashMap<String, TrendDirection>,
}

/// Lowercase theme labels from metadata and extractions, sorted.
pub fn collect_themes(
    signals: &[Signal],
    extractions: &HashMap<String, Extraction>,
) -> BTreeSet<String> {
    let mut themes = BTreeSet::new();
    for s in signals {
        for label in s.metadata.labels() {
            let l = label.trim().to_lowercase();
            if !l.is_empty() {
                themes.insert(l);
            }
        }
        if let Some(ex) = extractions.get(&s.id) {
            for t in &ex.themes {
                let l = t.trim().to_lowercase();
                if !l.is_empty() {
                    themes.insert(l);
                }
            }
        }
    }
    themes
}

pub fn score_signals(
    signals: &[Signal],
    ctx: &ScoringContext,
    config: &RoadmapConfig,
    now: DateTime<Utc>,
) -> RoadmapScore {
    let mut breakdown = ScoreBreakdown::default();
    let themes = collect_themes(signals, &ctx.extractions);

    let impact_score = impact(signals, ctx, config, &mut breakdown);
    let confidence_score = confidence(signals, &mut breakdown);
    let effort_score = effort(signals, ctx, &themes, &mut breakdown);
    let strategic_score = strategic(&themes, config, &mut breakdown);
    let urgency_score = urgency(signals, ctx, &themes, config, now, &mut breakdown);

    let w = &config.weights;
    let overall = impact_score * w.impact
        + confidence_score * w.confidence
        + effort_score * w.effort
        + strategic_score * w.strategic
        + urgency_score * w.urgency;

    RoadmapScore {
        overall_score: overall.clamp(0.0, 100.0).round(),
        impact_score,
        confidence_score,
        effort_score,
        strategic_score,
        urgency_score,
        breakdown,
    }
}

fn impact(
    signals: &[Signal],
    ctx: &ScoringContext,
    config: &RoadmapConfig,
    b: &mut ScoreBreakdown,
) -> f64 {
    let customers = aggregate_customers(signals, &ctx.extractions);
    let n = customers.len();
    b.unique_customers = n;
    b.customer_component = ((n as f64 + 1.0).log2() * 12.5).min(40.0);

    let tier_sum: f64 = customers
        .iter()
        .map(|c| config.tier_weights.weight(tier_for(signals, c)))
        .sum();
    b.tier_component = (tier_sum * 2.5).min(25.0);

    b.volume_component = ((signals.len() as f64 + 1.0).log2() * 5.0).min(20.0);

    // counts come from external scrapers and may be arbitrarily large
    let (mut views, mut likes, mut replies) = (0u64, 0u64, 0u64);
    for e in signals.iter().filter_map(|s| s.metadata.engagement) {
        views = views.saturating_add(e.views);
        likes = likes.saturating_add(e.likes);
        replies = replies.saturating_add(e.replies_count);
    }
    let engagement = ((views as f64 + 1.0).log10() * 4.0).min(8.0)
        + (likes as f64 * 0.5).min(6.0)
        + (replies as f64 * 0.5).min(6.0);
    b.engagement_component = engagement.min(15.0);

    (b.customer_component + b.tier_component + b.volume_component + b.engagement_component)
        .clamp(0.0, 100.0)
}

fn tier_for(signals: &[Signal], customer: &str) -> CustomerTier {
    signals
        .iter()
        .flat_map(|s| s.metadata.customer_tiers.iter())
        .find(|(name, _)| customers_match(name, customer))
        .map(|(_, tier)| *tier)
        .unwrap_or_default()
}

fn confidence(signals: &[Signal], b: &mut ScoreBreakdown) -> f64 {
    if signals.is_empty() {
        return 0.0;
    }
    let avg_quality =
        signals.iter().map(|s| s.metadata.quality()).sum::<f64>() / signals.len() as f64;
    b.average_quality = avg_quality;

    let sources: BTreeSet<String> = signals.iter().map(|s| s.source.to_lowercase()).collect();
    b.source_count = sources.len();

    let quality_part = (avg_quality * 50.0).min(50.0);
    let diversity_part = (sources.len() as f64 * 10.0).min(25.0);
    let volume_part = (signals.len() as f64 * 5.0).min(25.0);
    (quality_part + diversity_part + volume_part).clamp(0.0, 100.0)
}

fn tokens_of(text: &str) -> BTreeSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(String::from)
        .collect()
}

/// Exact token match; keywords of four or more letters also match as a prefix.
fn keyword_hit(tokens: &BTreeSet<String>, keyword: &str) -> bool {
    tokens
        .iter()
        .any(|t| t == keyword || (keyword.len() >= 4 && t.starts_with(keyword)))
}

fn effort(
    signals: &[Signal],
    ctx: &ScoringContext,
    themes: &BTreeSet<String>,
    b: &mut ScoreBreakdown,
) -> f64 {
    let tokens: BTreeSet<String> = themes.iter().flat_map(|t| tokens_of(t)).collect();

    let mut score: f64 = 50.0;
    for kw in HARD_KEYWORDS {
        if keyword_hit(&tokens, kw) {
            score -= KEYWORD_STEP;
            b.matched_complexity_keywords.push(kw.to_string());
        }
    }
    for kw in EASY_KEYWORDS {
        if keyword_hit(&tokens, kw) {
            score += KEYWORD_STEP;
            b.matched_complexity_keywords.push(kw.to_string());
        }
    }

    if themes.len() > FREE_THEMES {
        score -= ((themes.len() - FREE_THEMES) as f64 * 4.0).min(20.0);
    }

    let mut features = BTreeSet::new();
    let mut issues = BTreeSet::new();
    for s in signals {
        if let Some(ex) = ctx.extractions.get(&s.id) {
            features.extend(ex.features.iter().map(|f| f.trim().to_lowercase()));
            issues.extend(ex.issues.iter().map(|i| i.trim().to_lowercase()));
        }
    }
    b.extracted_features = features.len();
    b.extracted_issues = issues.len();
    score -= ((features.len() + issues.len()) as f64 * 2.0).min(20.0);

    score.clamp(10.0, 100.0)
}

fn strategic(themes: &BTreeSet<String>, config: &RoadmapConfig, b: &mut ScoreBreakdown) -> f64 {
    let priorities: Vec<String> = config
        .strategic_priorities
        .iter()
        .map(|p| p.trim().to_lowercase())
        .filter(|p| !p.is_empty())
        .collect();
    if priorities.is_empty() {
        return 50.0;
    }
    let theme_tokens: Vec<BTreeSet<String>> = themes.iter().map(|t| tokens_of(t)).collect();
    for p in &priorities {
        let words = tokens_of(p);
        // every word of the priority must appear in one theme
        let matched = !words.is_empty()
            && theme_tokens
                .iter()
                .any(|tokens| words.iter().all(|w| keyword_hit(tokens, w)));
        if matched {
            b.matched_priorities.push(p.clone());
        }
    }
    let ratio = b.matched_priorities.len() as f64 / priorities.len() as f64;
    20.0 + ratio * 80.0
}

fn urgency(
    signals: &[Signal],
    ctx: &ScoringContext,
    themes: &BTreeSet<String>,
    config: &RoadmapConfig,
    now: DateTime<Utc>,
    b: &mut ScoreBreakdown,
) -> f64 {
    if signals.is_empty() {
        return 0.0;
    }
    let window = Duration::days(config.recent_window_days.clamp(1, MAX_RECENT_WINDOW_DAYS));
    let recent = signals.iter().filter(|s| now - s.created_at <= window).count();
    let previous = signals
        .iter()
        .filter(|s| {
            let age = now - s.created_at;
            age > window && age <= window * 2
        })
        .count();
    b.recent_ratio = recent as f64 / signals.len() as f64;
    let recent_part = b.recent_ratio * 40.0;

    // strongest label wins; no label counts as stable
    let trend = themes
        .iter()
        .filter_map(|t| ctx.trends.get(t))
        .max_by(|x, y| x.urgency_score().total_cmp(&y.urgency_score()))
        .copied();
    b.trend = trend.map(|t| t.to_string());
    let trend_part = trend.unwrap_or(TrendDirection::Stable).urgency_score() * 0.3;

    b.acceleration_component = if recent > previous {
        ((recent - previous) as f64 / previous.max(1) as f64 * 5.0).min(15.0)
    } else {
        0.0
    };

    let mut forum: f64 = 0.0;
    for s in signals.iter().filter(|s| s.metadata.is_forum_thread()) {
        if s.metadata.status == Some(ThreadStatus::Unresolved) {
            forum += 5.0;
        }
        let resolved = s.metadata.status == Some(ThreadStatus::Resolved);
        if !resolved && s.metadata.is_accepted != Some(true) {
            forum += 3.0;
        }
    }
    b.forum_component = forum.min(15.0);

    (recent_part + trend_part + b.acceleration_component + b.forum_component).clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::values::roadmap_score::ScoreWeights;
    use crate::domain::values::signal_metadata::SignalMetadata;
    use serde_json::json;

    fn sig(
        id: &str,
        source: &str,
        content: &str,
        meta: serde_json::Value,
        created_at: DateTime<Utc>,
    ) -> Signal {
        let metadata = SignalMetadata::from_value(&meta);
        let mut s = Signal::new(source.into(), "message".into(), content.into(), metadata);
        s.id = id.into();
        s.created_at = created_at;
        s
    }

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-03-01T12:00:00Z").unwrap().with_timezone(&Utc)
    }

    #[test]
    fn test_no_customers_no_quality() {
        let signals = vec![
            sig("1", "slack", "export button broken", json!({}), now()),
            sig("2", "slack", "export button does nothing", json!({}), now()),
        ];
        let cfg = RoadmapConfig::default();
        let score = score_signals(&signals, &ScoringContext::default(), &cfg, now());
        assert_eq!(score.breakdown.unique_customers, 0);
        assert_eq!(score.breakdown.customer_component, 0.0);
        assert_eq!(score.breakdown.average_quality, 0.5);
        // 25 quality + 10 diversity + 10 volume
        assert_eq!(score.confidence_score, 45.0);
        assert_eq!(score.strategic_score, 50.0);
    }

    #[test]
    fn test_enterprise_customers_raise_impact() {
        let base = vec![sig("1", "slack", "sso login loop", json!({"customers": ["Acme"]}), now())];
        let tiered = vec![sig(
            "1",
            "slack",
            "sso login loop",
            json!({"customers": ["Acme"], "customer_tier": "enterprise"}),
            now(),
        )];
        let cfg = RoadmapConfig::default();
        let a = score_signals(&base, &ScoringContext::default(), &cfg, now());
        let b = score_signals(&tiered, &ScoringContext::default(), &cfg, now());
        assert!(b.impact_score > a.impact_score);
    }

    #[test]
    fn test_effort_keywords() {
        let themes = json!({"themes": ["SSO integration", "security"]});
        let hard = vec![sig("1", "slack", "x", themes, now())];
        let easy = vec![sig("1", "slack", "x", json!({"themes": ["ui fix"]}), now())];
        let cfg = RoadmapConfig::default();
        let h = score_signals(&hard, &ScoringContext::default(), &cfg, now());
        let e = score_signals(&easy, &ScoringContext::default(), &cfg, now());
        assert_eq!(h.effort_score, 50.0 - 3.0 * KEYWORD_STEP);
        assert_eq!(e.effort_score, 50.0 + 2.0 * KEYWORD_STEP);
    }

    #[test]
    fn test_effort_floor() {
        let mut ctx = ScoringContext::default();
        ctx.extractions.insert(
            "1".into(),
            Extraction {
                features: (0..10).map(|i| format!("feature {i}")).collect(),
                issues: (0..10).map(|i| format!("issue {i}")).collect(),
                ..Default::default()
            },
        );
        let signals = vec![sig(
            "1",
            "slack",
            "x",
            json!({"themes": [
                "integration", "security", "migration", "infrastructure", "compliance", "api"
            ]}),
            now(),
        )];
        let s = score_signals(&signals, &ctx, &RoadmapConfig::default(), now());
        assert_eq!(s.effort_score, 10.0);
    }

    #[test]
    fn test_strategic_ratio() {
        let cfg = RoadmapConfig {
            strategic_priorities: vec!["billing".into(), "mobile".into()],
            ..Default::default()
        };
        let signals = vec![sig("1", "slack", "x", json!({"topics": ["Billing exports"]}), now())];
        let s = score_signals(&signals, &ScoringContext::default(), &cfg, now());
        assert_eq!(s.strategic_score, 60.0);
        assert_eq!(s.breakdown.matched_priorities, vec!["billing"]);
    }

    #[test]
    fn test_urgency_uses_trend_and_forum_state() {
        let mut ctx = ScoringContext::default();
        ctx.trends.insert("exports".into(), TrendDirection::Emerging);
        let signals = vec![sig(
            "1",
            "forum",
            "export hangs",
            json!({"topics": ["exports"], "status": "unresolved", "views": 10}),
            now(),
        )];
        let s = score_signals(&signals, &ctx, &RoadmapConfig::default(), now());
        // 40 recent + 30 trend + 5 acceleration + 8 forum
        assert_eq!(s.urgency_score, 83.0);
        assert_eq!(s.breakdown.trend.as_deref(), Some("emerging"));
    }

    #[test]
    fn test_overall_bounded_and_rounded() {
        let signals = vec![sig("1", "slack", "x", json!({}), now() - Duration::days(30))];
        let cfg = RoadmapConfig {
            weights: ScoreWeights {
                impact: 1.0,
                confidence: 0.0,
                effort: 0.0,
                strategic: 0.0,
                urgency: 0.0,
            },
            ..Default::default()
        };
        let s = score_signals(&signals, &ScoringContext::default(), &cfg, now());
        assert_eq!(s.overall_score, s.impact_score.round());
        assert!((0.0..=100.0).contains(&s.overall_score));
    }

    #[test]
    fn test_strategic_matches_whole_words_only() {
        let cfg = RoadmapConfig {
            strategic_priorities: vec!["build".into(), "rapid".into(), "mobile app".into()],
            ..Default::default()
        };
        let themes = json!({"themes": ["ui", "api", "mobile"]});
        let signals = vec![sig("1", "slack", "x", themes, now())];
        let s = score_signals(&signals, &ScoringContext::default(), &cfg, now());
        assert!(s.breakdown.matched_priorities.is_empty());
        assert_eq!(s.strategic_score, 20.0);

        let themes = json!({"themes": ["Mobile app crashes", "builds"]});
        let signals = vec![sig("1", "slack", "x", themes, now())];
        let s = score_signals(&signals, &ScoringContext::default(), &cfg, now());
        assert_eq!(s.breakdown.matched_priorities, vec!["build", "mobile app"]);
    }

    #[test]
    fn test_huge_engagement_counts_saturate() {
        let meta = json!({"views": u64::MAX, "likes": u64::MAX, "replies_count": u64::MAX});
        let signals = vec![
            sig("1", "forum", "export hangs", meta.clone(), now()),
            sig("2", "forum", "export stuck", meta, now()),
        ];
        let cfg = RoadmapConfig::default();
        let s = score_signals(&signals, &ScoringContext::default(), &cfg, now());
        assert_eq!(s.breakdown.engagement_component, 15.0);
        assert!((0.0..=100.0).contains(&s.impact_score));
    }

    #[test]
    fn test_unvalidated_huge_window_does_not_panic() {
        let cfg = RoadmapConfig {
            recent_window_days: i64::MAX / 2,
            ..Default::default()
        };
        let signals = vec![sig("1", "slack", "x", json!({}), now() - Duration::days(400))];
        let s = score_signals(&signals, &ScoringContext::default(), &cfg, now());
        assert_eq!(s.breakdown.recent_ratio, 1.0);
    }
}
