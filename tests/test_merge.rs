mod common;

use common::{setup, RecordingProgress};
use feedbackmap::application::clustering::similarity::SimilarityConfig;
use feedbackmap::application::materialize::Materializer;
use feedbackmap::application::merge::MergeOpportunitiesUseCase;
use feedbackmap::domain::entities::opportunity::{Opportunity, OpportunitySummary};
use feedbackmap::domain::entities::signal::Signal;
use feedbackmap::domain::error::DomainError;
use feedbackmap::domain::ports::opportunity_repository::OpportunityRepository;
use feedbackmap::domain::ports::progress::{NoProgress, ProgressEvent};
use feedbackmap::domain::ports::signal_repository::SignalRepository;
use feedbackmap::domain::values::opportunity_status::OpportunityStatus;
use feedbackmap::domain::values::signal_metadata::SignalMetadata;
use feedbackmap::infrastructure::sqlite::extraction_store::SqliteExtractionStore;
use feedbackmap::infrastructure::sqlite::opportunity_repo::SqliteOpportunityRepo;
use feedbackmap::infrastructure::sqlite::signal_repo::SqliteSignalRepo;
use feedbackmap::infrastructure::sqlite::open;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

struct Fixture {
    signals: Arc<dyn SignalRepository>,
    opportunities: Arc<dyn OpportunityRepository>,
    materializer: Arc<Materializer>,
}

fn fixture() -> Fixture {
    let conn = open(":memory:").unwrap();
    let opportunities: Arc<dyn OpportunityRepository> =
        Arc::new(SqliteOpportunityRepo::new(conn.clone()));
    let materializer = Arc::new(Materializer::new(
        opportunities.clone(),
        Arc::new(SqliteExtractionStore::new(conn.clone())),
    ));
    Fixture {
        signals: Arc::new(SqliteSignalRepo::new(conn)),
        opportunities,
        materializer,
    }
}

impl Fixture {
    fn signal(&self, source: &str, content: &str, customers: &[&str]) -> Signal {
        let meta = SignalMetadata::from_value(&json!({ "customers": customers }));
        let s = Signal::new(source.into(), "message".into(), content.into(), meta);
        self.signals.add(&s).unwrap();
        s
    }

    fn opportunity(&self, title: &str, signals: &[&Signal]) -> Opportunity {
        let o = Opportunity::new(title.into(), String::new());
        let ids: Vec<String> = signals.iter().map(|s| s.id.clone()).collect();
        self.opportunities.create_with_links(&o, &ids).unwrap();
        o
    }

    fn use_case(&self) -> MergeOpportunitiesUseCase {
        self.use_case_with(self.opportunities.clone())
    }

    fn use_case_with(&self, repo: Arc<dyn OpportunityRepository>) -> MergeOpportunitiesUseCase {
        MergeOpportunitiesUseCase::new(repo, self.materializer.clone(), Arc::new(NoProgress))
    }

    fn linked_ids(&self, opportunity_id: &str) -> Vec<String> {
        let mut ids: Vec<String> = self
            .opportunities
            .linked_signals(opportunity_id)
            .unwrap()
            .into_iter()
            .map(|s| s.id)
            .collect();
        ids.sort();
        ids
    }
}

/// Delegates to SQLite but refuses to merge one pair a limited number of times.
struct RefusingMerges {
    inner: Arc<dyn OpportunityRepository>,
    pair: (String, String),
    refusals_left: AtomicUsize,
    merge_calls: AtomicUsize,
}

impl RefusingMerges {
    fn new(inner: Arc<dyn OpportunityRepository>, a: &str, b: &str, refusals: usize) -> Self {
        Self {
            inner,
            pair: (a.to_string(), b.to_string()),
            refusals_left: AtomicUsize::new(refusals),
            merge_calls: AtomicUsize::new(0),
        }
    }

    fn is_pair(&self, x: &str, y: &str) -> bool {
        let (a, b) = (&self.pair.0, &self.pair.1);
        (x == a && y == b) || (x == b && y == a)
    }
}

impl OpportunityRepository for RefusingMerges {
    fn create_with_links(
        &self,
        opportunity: &Opportunity,
        signal_ids: &[String],
    ) -> Result<(), DomainError> {
        self.inner.create_with_links(opportunity, signal_ids)
    }

    fn link_signals(
        &self,
        opportunity_id: &str,
        signal_ids: &[String],
    ) -> Result<usize, DomainError> {
        self.inner.link_signals(opportunity_id, signal_ids)
    }

    fn get(&self, id: &str) -> Result<Option<Opportunity>, DomainError> {
        self.inner.get(id)
    }

    fn list(&self) -> Result<Vec<Opportunity>, DomainError> {
        self.inner.list()
    }

    fn list_with_counts(
        &self,
        limit: Option<usize>,
    ) -> Result<Vec<OpportunitySummary>, DomainError> {
        self.inner.list_with_counts(limit)
    }

    fn linked_signals(&self, opportunity_id: &str) -> Result<Vec<Signal>, DomainError> {
        self.inner.linked_signals(opportunity_id)
    }

    fn update_text(&self, id: &str, title: &str, description: &str) -> Result<(), DomainError> {
        self.inner.update_text(id, title, description)
    }

    fn update_status(&self, id: &str, status: OpportunityStatus) -> Result<(), DomainError> {
        self.inner.update_status(id, status)
    }

    fn merge_into(
        &self,
        primary_id: &str,
        secondary_id: &str,
        title: &str,
        description: &str,
    ) -> Result<(), DomainError> {
        self.merge_calls.fetch_add(1, Ordering::SeqCst);
        if self.is_pair(primary_id, secondary_id) {
            let refuse = self
                .refusals_left
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if refuse {
                return Err(DomainError::Database("database is locked".into()));
            }
        }
        self.inner.merge_into(primary_id, secondary_id, title, description)
    }
}

#[tokio::test]
async fn test_related_opportunities_merge_into_one() {
    let f = fixture();
    let s1 = f.signal("slack", "Export to CSV times out", &["Acme"]);
    let s2 = f.signal("slack", "CSV export very slow on large reports", &["Acme"]);
    let s3 = f.signal("slack", "Exports hang for big accounts", &["Acme Inc"]);
    f.opportunity("A", &[&s1, &s2]);
    f.opportunity("B", &[&s3]);

    let report = f.use_case().execute(&SimilarityConfig::default(), 0.3).await.unwrap();
    assert_eq!(report.merges, 1);
    assert_eq!(report.opportunities_remaining, 1);

    let remaining = f.opportunities.list().unwrap();
    assert_eq!(remaining.len(), 1);
    let mut ids: Vec<String> = f
        .opportunities
        .linked_signals(&remaining[0].id)
        .unwrap()
        .into_iter()
        .map(|s| s.id)
        .collect();
    ids.sort();
    let mut expected = vec![s1.id, s2.id, s3.id];
    expected.sort();
    assert_eq!(ids, expected);
    assert!(remaining[0].title.ends_with("(3 signals)"));
}

#[tokio::test]
async fn test_unrelated_opportunity_survives() {
    let f = fixture();
    let s1 = f.signal("slack", "Export to CSV times out", &["Acme"]);
    let s2 = f.signal("slack", "Exports hang for big accounts", &["Acme"]);
    let s3 = f.signal("jira", "Export to CSV times out", &["Acme"]);
    f.opportunity("A", &[&s1]);
    f.opportunity("B", &[&s2]);
    let c = f.opportunity("C", &[&s3]);

    let report = f.use_case().execute(&SimilarityConfig::default(), 0.3).await.unwrap();
    assert_eq!(report.merges, 1);
    assert_eq!(report.passes, 2);
    assert_eq!(report.opportunities_remaining, 2);
    assert!(f.opportunities.get(&c.id).unwrap().is_some());
    assert_eq!(f.opportunities.linked_signals(&c.id).unwrap().len(), 1);
}

#[tokio::test]
async fn test_merges_chain_until_stable() {
    let progress = Arc::new(RecordingProgress::default());
    let f = fixture();
    let a = f.signal("slack", "Export to CSV times out", &["Acme"]);
    let b = f.signal("slack", "Exports hang for big accounts", &["Acme"]);
    let c = f.signal("slack", "Export button greyed out", &["Acme"]);
    f.opportunity("A", &[&a]);
    f.opportunity("B", &[&b]);
    f.opportunity("C", &[&c]);

    let uc = MergeOpportunitiesUseCase::new(
        f.opportunities.clone(),
        f.materializer.clone(),
        progress.clone(),
    );
    let report = uc.execute(&SimilarityConfig::default(), 0.3).await.unwrap();
    assert_eq!(report.merges, 2);
    assert_eq!(report.opportunities_remaining, 1);

    let events = progress.events.lock().unwrap();
    let merged = events.iter().filter(|e| matches!(e, ProgressEvent::Merged { .. })).count();
    assert_eq!(merged, 2);
    // the last pass found nothing to merge
    assert!(matches!(
        events.last(),
        Some(ProgressEvent::MergePass { merges_so_far: 2, .. })
    ));
}

#[tokio::test]
async fn test_merge_rejects_threshold_out_of_range() {
    let f = fixture();
    let err = f.use_case().execute(&SimilarityConfig::default(), 1.5).await.unwrap_err();
    assert!(matches!(err, DomainError::Config(_)));
}

#[tokio::test]
async fn test_merge_on_empty_database() {
    let fm = setup();
    let report = fm.merge_related(None).await.unwrap();
    assert_eq!(report.merges, 0);
    assert_eq!(report.passes, 1);
}

#[tokio::test]
async fn test_merge_into_is_atomic_on_missing_secondary() {
    let f = fixture();
    let s1 = f.signal("slack", "Export to CSV times out", &["Acme"]);
    let a = f.opportunity("A", &[&s1]);

    let err = f
        .opportunities
        .merge_into(&a.id, "does-not-exist", "new title", "desc")
        .unwrap_err();
    assert!(matches!(err, DomainError::NotFound(_)));
    let unchanged = f.opportunities.get(&a.id).unwrap().unwrap();
    assert_eq!(unchanged.title, "A");
}

#[tokio::test]
async fn test_failed_merge_is_skipped_and_other_pairs_still_merge() {
    let f = fixture();
    let a = f.signal("slack", "Export to CSV times out", &["Acme"]);
    let b = f.signal("slack", "Exports hang for big accounts", &["Acme"]);
    let d = f.signal("jira", "Export to CSV times out", &["Acme"]);
    let e = f.signal("jira", "Exports hang for big accounts", &["Acme"]);
    let opp_a = f.opportunity("A", &[&a]);
    let opp_b = f.opportunity("B", &[&b]);
    let opp_d = f.opportunity("D", &[&d]);
    let opp_e = f.opportunity("E", &[&e]);

    let repo = Arc::new(RefusingMerges::new(
        f.opportunities.clone(),
        &opp_a.id,
        &opp_b.id,
        usize::MAX,
    ));
    let report = f
        .use_case_with(repo.clone())
        .execute(&SimilarityConfig::default(), 0.3)
        .await
        .unwrap();

    // E absorbs D; A and B are related but their merge keeps failing
    assert_eq!(report.merges, 1);
    assert_eq!(report.failed_merges, 1);
    assert_eq!(report.passes, 2);
    assert_eq!(report.opportunities_remaining, 3);
    assert_eq!(repo.merge_calls.load(Ordering::SeqCst), 2);

    assert!(f.opportunities.get(&opp_d.id).unwrap().is_none());
    let mut merged = vec![d.id.clone(), e.id.clone()];
    merged.sort();
    assert_eq!(f.linked_ids(&opp_e.id), merged);

    let untouched_a = f.opportunities.get(&opp_a.id).unwrap().unwrap();
    let untouched_b = f.opportunities.get(&opp_b.id).unwrap().unwrap();
    assert_eq!(untouched_a.title, "A");
    assert_eq!(untouched_b.title, "B");
    assert_eq!(f.linked_ids(&opp_a.id), vec![a.id]);
    assert_eq!(f.linked_ids(&opp_b.id), vec![b.id]);
}

#[tokio::test]
async fn test_failed_pair_is_retried_after_another_merge() {
    let f = fixture();
    let a = f.signal("slack", "Export to CSV times out", &["Acme"]);
    let b = f.signal("slack", "Exports hang for big accounts", &["Acme"]);
    let c = f.signal("slack", "Export button greyed out", &["Acme"]);
    f.opportunity("A", &[&a]);
    let opp_b = f.opportunity("B", &[&b]);
    let opp_c = f.opportunity("C", &[&c]);

    // listing order is C, B, A: C+B fails once, C+A succeeds, then C+B is retried
    let repo = Arc::new(RefusingMerges::new(f.opportunities.clone(), &opp_c.id, &opp_b.id, 1));
    let report = f
        .use_case_with(repo.clone())
        .execute(&SimilarityConfig::default(), 0.3)
        .await
        .unwrap();

    assert_eq!(report.failed_merges, 1);
    assert_eq!(report.merges, 2);
    assert_eq!(report.passes, 3);
    assert_eq!(report.opportunities_remaining, 1);
    assert_eq!(repo.merge_calls.load(Ordering::SeqCst), 3);

    let remaining = f.opportunities.list().unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, opp_c.id);
    let mut all = vec![a.id, b.id, c.id];
    all.sort();
    assert_eq!(f.linked_ids(&opp_c.id), all);
}
