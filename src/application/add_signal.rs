use crate::domain::entities::signal::Signal;
use crate::domain::error::DomainError;
use crate::domain::ports::embedding_port::EmbeddingProvider;
use crate::domain::ports::signal_repository::SignalRepository;
use crate::domain::ports::vector_store::VectorStore;
use crate::domain::values::signal_metadata::SignalMetadata;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, warn};

/// Ingestion payload; one element of an import file.
#[derive(Debug, Clone, Deserialize)]
pub struct NewSignal {
    pub source: String,
    #[serde(default = "default_signal_type", alias = "type")]
    pub signal_type: String,
    pub content: String,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

fn default_signal_type() -> String {
    "message".into()
}

pub struct AddSignalUseCase {
    repo: Arc<dyn SignalRepository>,
    embedder: Arc<dyn EmbeddingProvider>,
    vector_store: Arc<dyn VectorStore>,
}

impl AddSignalUseCase {
    pub fn new(
        repo: Arc<dyn SignalRepository>,
        embedder: Arc<dyn EmbeddingProvider>,
        vector_store: Arc<dyn VectorStore>,
    ) -> Self {
        Self {
            repo,
            embedder,
            vector_store,
        }
    }

    pub async fn execute(&self, input: NewSignal) -> Result<Signal, DomainError> {
        let signal = build(input)?;
        self.repo.add(&signal)?;

        // Embedding is best effort; a signal without a vector still clusters by text.
        if self.embedder.dimension() > 0 {
            match self.embedder.embed(&[signal.content.clone()]).await {
                Ok(vectors) if !vectors.is_empty() => {
                    if let Err(e) = self.vector_store.store(&signal.id, &vectors[0]) {
                        warn!(signal_id = %signal.id, error = %e, "Failed to store embedding");
                    }
                }
                Ok(_) => {}
                Err(e) => warn!(
                    signal_id = %signal.id,
                    error = %e,
                    "Embedding failed; signal stored without vector"
                ),
            }
        }

        debug!(signal_id = %signal.id, source = %signal.source, "Signal added");
        Ok(signal)
    }

    /// Add every signal of a JSON array. Stops at the first invalid one.
    pub async fn import(&self, json: &str) -> Result<Vec<Signal>, DomainError> {
        let inputs: Vec<NewSignal> = serde_json::from_str(json)?;
        let mut added = Vec::with_capacity(inputs.len());
        for input in inputs {
            added.push(self.execute(input).await?);
        }
        Ok(added)
    }
}

fn build(input: NewSignal) -> Result<Signal, DomainError> {
    let source = input.source.trim().to_lowercase();
    if source.is_empty() {
        return Err(DomainError::InvalidInput("Signal source must not be empty".into()));
    }
    if input.content.trim().is_empty() {
        return Err(DomainError::InvalidInput("Signal content must not be empty".into()));
    }
    let metadata = input
        .metadata
        .as_ref()
        .map(SignalMetadata::from_value)
        .unwrap_or_default();
    let signal_type = input.signal_type.trim().to_lowercase();
    let signal = Signal::new(source, signal_type, input.content, metadata);
    Ok(match input.created_at {
        Some(at) => signal.with_created_at(at),
        None => signal,
    })
}
