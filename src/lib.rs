pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

use crate::application::add_signal::{AddSignalUseCase, NewSignal};
use crate::application::detect::{DetectOpportunitiesUseCase, DetectOptions, DetectionReport};
use crate::application::materialize::Materializer;
use crate::application::merge::{MergeOpportunitiesUseCase, MergeReport, DEFAULT_MERGE_THRESHOLD};
use crate::application::query::{OpportunityDetail, QueryUseCase};
use crate::application::reindex::ReindexUseCase;
use crate::application::roadmap::{RoadmapUseCase, RoadmapView};
use crate::application::stats::{Stats, StatsUseCase};
use crate::config::EngineConfig;
use crate::domain::entities::extraction::Extraction;
use crate::domain::entities::opportunity::{Opportunity, OpportunitySummary};
use crate::domain::entities::signal::Signal;
use crate::domain::error::DomainError;
use crate::domain::ports::embedding_port::EmbeddingProvider;
use crate::domain::ports::extraction_store::ExtractionStore;
use crate::domain::ports::opportunity_repository::OpportunityRepository;
use crate::domain::ports::progress::ProgressObserver;
use crate::domain::ports::signal_repository::SignalRepository;
use crate::domain::ports::trend_service::TrendService;
use crate::domain::ports::vector_store::VectorStore;
use crate::domain::values::opportunity_status::OpportunityStatus;
use crate::domain::values::roadmap_score::ScoredOpportunity;
use crate::domain::values::trend_direction::TrendDirection;
use crate::infrastructure::embeddings::noop::NoopProvider;
use crate::infrastructure::embeddings::openai::OpenAiProvider;
use crate::infrastructure::progress::TracingProgress;
use crate::infrastructure::sqlite::extraction_store::SqliteExtractionStore;
use crate::infrastructure::sqlite::opportunity_repo::SqliteOpportunityRepo;
use crate::infrastructure::sqlite::signal_repo::SqliteSignalRepo;
use crate::infrastructure::sqlite::trend_store::SqliteTrendStore;
use crate::infrastructure::sqlite::vector_store::SqliteVectorStore;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::warn;

pub struct FeedbackMap {
    config: EngineConfig,
    add_signal_uc: AddSignalUseCase,
    query_uc: QueryUseCase,
    stats_uc: StatsUseCase,
    reindex_uc: ReindexUseCase,
    detect_uc: DetectOpportunitiesUseCase,
    merge_uc: MergeOpportunitiesUseCase,
    roadmap_uc: RoadmapUseCase,
    extraction_store: Arc<dyn ExtractionStore>,
    trend_store: Arc<SqliteTrendStore>,
}

impl FeedbackMap {
    /// Embedding provider from `FEEDBACKMAP_EMBEDDING_*` env vars.
    pub fn new(db_path: &str, config: EngineConfig) -> Result<Self, DomainError> {
        let provider =
            std::env::var("FEEDBACKMAP_EMBEDDING_PROVIDER").unwrap_or_else(|_| "noop".into());
        let api_key = std::env::var("FEEDBACKMAP_EMBEDDING_API_KEY").unwrap_or_default();
        let model = std::env::var("FEEDBACKMAP_EMBEDDING_MODEL").ok();
        let base_url = std::env::var("FEEDBACKMAP_EMBEDDING_URL").ok();
        let dimension = std::env::var("FEEDBACKMAP_EMBEDDING_DIMENSION")
            .ok()
            .and_then(|d| d.parse::<usize>().ok());

        let embedder: Arc<dyn EmbeddingProvider> = match provider.as_str() {
            "openai" => {
                let openai = OpenAiProvider::new(api_key, model, base_url);
                match dimension {
                    Some(d) => Arc::new(openai.with_dimension(d)),
                    None => Arc::new(openai),
                }
            }
            _ => Arc::new(NoopProvider),
        };

        Self::with_providers(db_path, embedder, config)
    }

    pub fn with_providers(
        db_path: &str,
        embedder: Arc<dyn EmbeddingProvider>,
        config: EngineConfig,
    ) -> Result<Self, DomainError> {
        Self::with_components(db_path, embedder, None, Arc::new(TracingProgress), config)
    }

    /// Full wiring. `extraction_store` defaults to the SQLite one.
    pub fn with_components(
        db_path: &str,
        embedder: Arc<dyn EmbeddingProvider>,
        extraction_store: Option<Arc<dyn ExtractionStore>>,
        progress: Arc<dyn ProgressObserver>,
        config: EngineConfig,
    ) -> Result<Self, DomainError> {
        config.validate()?;
        let conn = infrastructure::sqlite::open(db_path)?;

        let signal_repo: Arc<dyn SignalRepository> = Arc::new(SqliteSignalRepo::new(conn.clone()));
        let opportunity_repo: Arc<dyn OpportunityRepository> =
            Arc::new(SqliteOpportunityRepo::new(conn.clone()));
        let vector_store: Arc<dyn VectorStore> = Arc::new(SqliteVectorStore::new(conn.clone()));
        let extraction_store: Arc<dyn ExtractionStore> = match extraction_store {
            Some(store) => store,
            None => Arc::new(SqliteExtractionStore::new(conn.clone())),
        };
        let trend_store = Arc::new(SqliteTrendStore::new(conn));
        let trend_service: Arc<dyn TrendService> = trend_store.clone();

        let materializer = Arc::new(Materializer::new(
            opportunity_repo.clone(),
            extraction_store.clone(),
        ));
        let reindex_uc =
            ReindexUseCase::new(signal_repo.clone(), embedder.clone(), vector_store.clone());
        if let Err(e) = reindex_uc.check_dimension() {
            warn!(error = %e, "Could not check stored vector dimension");
        }

        Ok(Self {
            config,
            add_signal_uc: AddSignalUseCase::new(
                signal_repo.clone(),
                embedder,
                vector_store.clone(),
            ),
            query_uc: QueryUseCase::new(signal_repo.clone(), opportunity_repo.clone()),
            stats_uc: StatsUseCase::new(signal_repo.clone(), opportunity_repo.clone()),
            reindex_uc,
            detect_uc: DetectOpportunitiesUseCase::new(
                signal_repo,
                opportunity_repo.clone(),
                vector_store,
                materializer.clone(),
                progress.clone(),
            ),
            merge_uc: MergeOpportunitiesUseCase::new(
                opportunity_repo.clone(),
                materializer.clone(),
                progress,
            ),
            roadmap_uc: RoadmapUseCase::new(opportunity_repo, materializer, trend_service),
            extraction_store,
            trend_store,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub async fn add_signal(&self, input: NewSignal) -> Result<Signal, DomainError> {
        self.add_signal_uc.execute(input).await
    }

    /// Add every signal of a JSON array.
    pub async fn import_signals(&self, json: &str) -> Result<Vec<Signal>, DomainError> {
        self.add_signal_uc.import(json).await
    }

    pub fn signals(
        &self,
        source: Option<String>,
        since: Option<DateTime<Utc>>,
        limit: Option<usize>,
    ) -> Result<Vec<Signal>, DomainError> {
        self.query_uc.signals(source, since, limit)
    }

    pub async fn record_extraction(
        &self,
        signal_id: &str,
        extraction: &Extraction,
    ) -> Result<(), DomainError> {
        self.query_uc.signal(signal_id)?;
        self.extraction_store.save(signal_id, extraction).await
    }

    pub fn set_trend(&self, theme: &str, direction: TrendDirection) -> Result<(), DomainError> {
        self.trend_store.set_trend(theme, direction)
    }

    /// Embed signals that have no vector yet.
    pub async fn embed_missing(&self) -> Result<usize, DomainError> {
        self.reindex_uc.execute().await
    }

    pub async fn detect(&self, options: &DetectOptions) -> Result<DetectionReport, DomainError> {
        self.detect_uc.execute(&self.config, options).await
    }

    pub async fn merge_related(&self, threshold: Option<f64>) -> Result<MergeReport, DomainError> {
        self.merge_uc
            .execute(&self.config.similarity, threshold.unwrap_or(DEFAULT_MERGE_THRESHOLD))
            .await
    }

    pub fn opportunities(
        &self,
        limit: Option<usize>,
    ) -> Result<Vec<OpportunitySummary>, DomainError> {
        self.query_uc.opportunities(limit)
    }

    pub fn opportunity(&self, id: &str) -> Result<OpportunityDetail, DomainError> {
        self.query_uc.opportunity(id)
    }

    pub fn set_status(
        &self,
        id: &str,
        status: OpportunityStatus,
    ) -> Result<Opportunity, DomainError> {
        self.query_uc.set_status(id, status)
    }

    pub async fn score(&self, opportunity_id: &str) -> Result<ScoredOpportunity, DomainError> {
        self.roadmap_uc
            .score(opportunity_id, &self.config.roadmap, Utc::now())
            .await
    }

    pub async fn roadmap(
        &self,
        view: RoadmapView,
        limit: Option<usize>,
    ) -> Result<Vec<ScoredOpportunity>, DomainError> {
        self.roadmap_at(view, limit, Utc::now()).await
    }

    /// Same as [`FeedbackMap::roadmap`] with an explicit clock.
    pub async fn roadmap_at(
        &self,
        view: RoadmapView,
        limit: Option<usize>,
        now: DateTime<Utc>,
    ) -> Result<Vec<ScoredOpportunity>, DomainError> {
        self.roadmap_uc.view(view, &self.config.roadmap, now, limit).await
    }

    pub fn stats(&self) -> Result<Stats, DomainError> {
        self.stats_uc.stats()
    }
}
