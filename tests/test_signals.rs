mod common;

use common::{open_with_embedder, setup, signal, signal_with};
use feedbackmap::application::detect::DetectOptions;
use feedbackmap::config::EngineConfig;
use feedbackmap::domain::entities::extraction::Extraction;
use feedbackmap::domain::error::DomainError;
use feedbackmap::domain::values::opportunity_status::OpportunityStatus;
use feedbackmap::domain::values::signal_metadata::ThreadStatus;
use serde_json::json;
use std::io::Write;

#[tokio::test]
async fn test_add_signal_normalizes_and_parses_metadata() {
    let fm = setup();
    let s = fm
        .add_signal(signal_with(
            "  Forum ",
            "Thread: export hangs on large files",
            json!({"views": 120, "status": "open", "quality_dimensions": {"compositeScore": 72}}),
        ))
        .await
        .unwrap();
    assert_eq!(s.source, "forum");
    assert_eq!(s.metadata.status, Some(ThreadStatus::Unresolved));
    assert_eq!(s.metadata.quality_score, Some(0.72));

    let stored = fm.signals(Some("forum".into()), None, None).unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0], s);
}

#[tokio::test]
async fn test_add_signal_rejects_empty_content() {
    let fm = setup();
    let err = fm.add_signal(signal("slack", "   ")).await.unwrap_err();
    assert!(matches!(err, DomainError::InvalidInput(_)));
}

#[tokio::test]
async fn test_import_json_array() {
    let fm = setup();
    let raw = r#"[
        {"source": "slack", "content": "Dashboard is slow for customer Acme"},
        {"source": "slack", "type": "transcript", "content": "Acme reports dashboard latency issues",
         "created_at": "2026-01-05T10:00:00Z"},
        {"source": "jira", "content": "Dark mode please", "metadata": {"topics": ["ui"]}}
    ]"#;
    let added = fm.import_signals(raw).await.unwrap();
    assert_eq!(added.len(), 3);
    assert_eq!(added[1].signal_type, "transcript");
    assert_eq!(added[2].metadata.topics, vec!["ui"]);

    let stats = fm.stats().unwrap();
    assert_eq!(stats.total_signals, 3);
    assert_eq!(stats.signals_by_source[0], ("slack".to_string(), 2));
}

#[tokio::test]
async fn test_import_rejects_malformed_json() {
    let fm = setup();
    let err = fm.import_signals("{not json").await.unwrap_err();
    assert!(matches!(err, DomainError::Parse(_)));
}

#[tokio::test]
async fn test_status_and_listing() {
    let fm = setup();
    fm.add_signal(signal("slack", "Dashboard is slow for customer Acme")).await.unwrap();
    fm.add_signal(signal("slack", "Acme reports dashboard latency issues")).await.unwrap();
    let report = fm.detect(&DetectOptions::default()).await.unwrap();
    let id = &report.new_opportunities[0].id;

    let listed = fm.opportunities(Some(10)).unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].signal_count, 2);

    let updated = fm.set_status(id, OpportunityStatus::Accepted).unwrap();
    assert_eq!(updated.status, OpportunityStatus::Accepted);

    let err = fm.set_status("missing", OpportunityStatus::Rejected).unwrap_err();
    assert!(matches!(err, DomainError::NotFound(_)));

    let stats = fm.stats().unwrap();
    assert_eq!(stats.linked_signals, 2);
    assert_eq!(stats.opportunities_by_status, vec![(OpportunityStatus::Accepted, 1)]);
}

#[tokio::test]
async fn test_embed_without_provider_fails() {
    let fm = setup();
    fm.add_signal(signal("slack", "Dashboard is slow")).await.unwrap();
    let err = fm.embed_missing().await.unwrap_err();
    assert!(matches!(err, DomainError::Embedding(_)));
}

#[tokio::test]
async fn test_signals_are_embedded_on_add() {
    let fm = open_with_embedder(":memory:", EngineConfig::default());
    fm.add_signal(signal("slack", "Dashboard is slow")).await.unwrap();
    assert_eq!(fm.embed_missing().await.unwrap(), 0);
}

#[tokio::test]
async fn test_config_file_overrides_defaults() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{"similarity": {{"threshold": 0.5}}, "clustering": {{"mode": "embedding"}}}}"#
    )
    .unwrap();

    let config = EngineConfig::load(file.path()).unwrap();
    assert_eq!(config.similarity.threshold, 0.5);
    assert_eq!(config.similarity.customer_weight, 0.35);
    assert_eq!(config.clustering.min_cluster_size, 2);

    let fm = open_with_embedder(":memory:", config);
    assert_eq!(fm.config().similarity.threshold, 0.5);
}

#[tokio::test]
async fn test_invalid_config_file_is_rejected() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, r#"{{"embedding": {{"threshold": 3.0}}}}"#).unwrap();
    let err = EngineConfig::load(file.path()).unwrap_err();
    assert!(matches!(err, DomainError::Config(_)));
}

#[tokio::test]
async fn test_database_file_persists_between_instances() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("feedback.db");
    let path = path.to_str().unwrap();

    {
        let fm = open_with_embedder(path, EngineConfig::default());
        fm.add_signal(signal("slack", "Dashboard is slow for customer Acme")).await.unwrap();
        fm.add_signal(signal("slack", "Acme reports dashboard latency issues")).await.unwrap();
        fm.detect(&DetectOptions::default()).await.unwrap();
    }

    let fm = open_with_embedder(path, EngineConfig::default());
    assert_eq!(fm.opportunities(None).unwrap().len(), 1);
    assert_eq!(fm.stats().unwrap().linked_signals, 2);
}

#[tokio::test]
async fn test_extraction_for_unknown_signal_is_not_found() {
    let fm = setup();
    let extraction = Extraction {
        themes: vec!["billing".into()],
        ..Default::default()
    };
    let err = fm.record_extraction("missing", &extraction).await.unwrap_err();
    assert!(matches!(err, DomainError::NotFound(_)));
}
