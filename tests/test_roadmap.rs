mod common;

use chrono::Utc;
use common::{setup, setup_with, signal, signal_with};
use feedbackmap::application::detect::DetectOptions;
use feedbackmap::application::roadmap::RoadmapView;
use feedbackmap::config::EngineConfig;
use feedbackmap::domain::error::DomainError;
use feedbackmap::domain::values::trend_direction::TrendDirection;
use feedbackmap::FeedbackMap;
use serde_json::json;

async fn seed_export_opportunity(fm: &FeedbackMap) -> String {
    let meta = json!({"topics": ["exports"]});
    fm.add_signal(signal_with("slack", "Export button does nothing on reports page", meta.clone()))
        .await
        .unwrap();
    fm.add_signal(signal_with("slack", "Export button broken on reports page", meta))
        .await
        .unwrap();
    let report = fm.detect(&DetectOptions::default()).await.unwrap();
    assert_eq!(report.new_opportunities.len(), 1);
    report.new_opportunities[0].id.clone()
}

#[tokio::test]
async fn test_no_customers_no_quality_scores_deterministically() {
    let fm = setup();
    fm.add_signal(signal("slack", "Export button does nothing on reports page")).await.unwrap();
    fm.add_signal(signal("slack", "Export button broken on reports page")).await.unwrap();
    fm.detect(&DetectOptions::default()).await.unwrap();

    let now = Utc::now();
    let first = fm.roadmap_at(RoadmapView::All, None, now).await.unwrap();
    let second = fm.roadmap_at(RoadmapView::All, None, now).await.unwrap();
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].score, second[0].score);

    let score = &first[0].score;
    assert_eq!(score.breakdown.unique_customers, 0);
    assert_eq!(score.breakdown.customer_component, 0.0);
    assert_eq!(score.breakdown.average_quality, 0.5);
    assert_eq!(score.confidence_score, 45.0);
    assert_eq!(score.overall_score, score.overall_score.round());
}

#[tokio::test]
async fn test_scores_stay_in_bounds() {
    let fm = setup();
    let meta = json!({
        "customers": [
            "Acme", "Globex", "Initech", "Umbrella", "Hooli", "Soylent", "Tyrell", "Wayne"
        ],
        "customer_tier": "enterprise",
        "quality_score": 95,
        "views": 50000, "likes": 300, "replies_count": 120,
        "status": "unresolved",
        "themes": ["integration", "security", "migration", "compliance", "architecture", "sso"]
    });
    for i in 0..6 {
        let content = format!("SSO integration breaks migration step {i}");
        fm.add_signal(signal_with("forum", &content, meta.clone()))
            .await
            .unwrap();
    }
    fm.detect(&DetectOptions::default()).await.unwrap();

    let scored = fm.roadmap(RoadmapView::All, None).await.unwrap();
    assert_eq!(scored.len(), 1);
    let s = &scored[0].score;
    let all = [
        s.overall_score,
        s.impact_score,
        s.confidence_score,
        s.effort_score,
        s.strategic_score,
        s.urgency_score,
    ];
    for v in all {
        assert!((0.0..=100.0).contains(&v), "{v} out of range");
    }
    assert!(s.effort_score >= 10.0);
}

#[tokio::test]
async fn test_emerging_view_uses_recorded_trends() {
    let fm = setup();
    let id = seed_export_opportunity(&fm).await;

    fm.set_trend("exports", TrendDirection::Declining).unwrap();
    assert!(fm.roadmap(RoadmapView::Emerging, None).await.unwrap().is_empty());

    fm.set_trend("Exports", TrendDirection::Emerging).unwrap();

    let emerging = fm.roadmap(RoadmapView::Emerging, None).await.unwrap();
    assert_eq!(emerging.len(), 1);
    assert_eq!(emerging[0].opportunity_id, id);
    assert_eq!(emerging[0].score.breakdown.trend.as_deref(), Some("emerging"));
    assert!(emerging[0].score.urgency_score >= 60.0);
}

#[tokio::test]
async fn test_strategic_view_follows_priorities() {
    let mut config = EngineConfig::default();
    config.roadmap.strategic_priorities = vec!["exports".into()];
    let fm = setup_with(config);
    let id = seed_export_opportunity(&fm).await;

    let strategic = fm.roadmap(RoadmapView::Strategic, Some(5)).await.unwrap();
    assert_eq!(strategic.len(), 1);
    assert_eq!(strategic[0].opportunity_id, id);
    assert_eq!(strategic[0].score.strategic_score, 100.0);

    let neutral = setup();
    seed_export_opportunity(&neutral).await;
    assert!(neutral.roadmap(RoadmapView::Strategic, None).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_score_single_opportunity() {
    let fm = setup();
    let id = seed_export_opportunity(&fm).await;

    let scored = fm.score(&id).await.unwrap();
    assert_eq!(scored.opportunity_id, id);
    assert_eq!(scored.signal_count, 2);

    let err = fm.score("missing").await.unwrap_err();
    assert!(matches!(err, DomainError::NotFound(_)));
}

#[tokio::test]
async fn test_oversized_recent_window_is_config_error() {
    let raw = r#"{"roadmap": {"recent_window_days": 4611686018427387903}}"#;
    let err = EngineConfig::from_json_str(raw).unwrap_err();
    assert!(matches!(err, DomainError::Config(_)));
}
