use crate::domain::error::DomainError;
use crate::domain::ports::embedding_port::EmbeddingProvider;
use crate::domain::ports::signal_repository::SignalRepository;
use crate::domain::ports::vector_store::VectorStore;
use std::sync::Arc;
use tracing::{info, warn};

const BATCH_SIZE: usize = 32;

/// Embeds every signal that has no stored vector yet.
pub struct ReindexUseCase {
    repo: Arc<dyn SignalRepository>,
    embedder: Arc<dyn EmbeddingProvider>,
    vector_store: Arc<dyn VectorStore>,
}

impl ReindexUseCase {
    pub fn new(
        repo: Arc<dyn SignalRepository>,
        embedder: Arc<dyn EmbeddingProvider>,
        vector_store: Arc<dyn VectorStore>,
    ) -> Self {
        Self { repo, embedder, vector_store }
    }

    /// Warn when stored vectors were produced by a different model size.
    pub fn check_dimension(&self) -> Result<(), DomainError> {
        let provider_dim = self.embedder.dimension();
        if provider_dim == 0 {
            return Ok(());
        }
        if let Some(stored_dim) = self.vector_store.get_stored_dimension()? {
            if stored_dim != provider_dim {
                warn!(
                    stored = stored_dim,
                    provider = provider_dim,
                    "Stored vectors have a different dimension than the embedding provider; run `embed` after clearing vectors"
                );
            }
        }
        Ok(())
    }

    pub async fn execute(&self) -> Result<usize, DomainError> {
        if self.embedder.dimension() == 0 {
            return Err(DomainError::Embedding(
                "No embedding provider configured (set FEEDBACKMAP_EMBEDDING_PROVIDER)".into(),
            ));
        }
        let signals = self.repo.missing_vectors()?;
        let total = signals.len();
        if total == 0 {
            return Ok(0);
        }

        for chunk in signals.chunks(BATCH_SIZE) {
            let texts: Vec<String> = chunk.iter().map(|s| s.content.clone()).collect();
            let vectors = self.embedder.embed(&texts).await?;
            if vectors.len() != chunk.len() {
                return Err(DomainError::Embedding(format!(
                    "Provider returned {} vectors for {} texts",
                    vectors.len(),
                    chunk.len()
                )));
            }
            for (signal, vector) in chunk.iter().zip(vectors.iter()) {
                self.vector_store.store(&signal.id, vector)?;
            }
        }

        info!(embedded = total, "Embedding backfill complete");
        Ok(total)
    }
}
