use crate::domain::error::DomainError;
use crate::domain::ports::embedding_port::EmbeddingProvider;

/// Used when no provider is configured; every signal clusters by text.
pub struct NoopProvider;

#[async_trait::async_trait]
impl EmbeddingProvider for NoopProvider {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, DomainError> {
        Ok(texts.iter().map(|_| vec![]).collect())
    }

    fn dimension(&self) -> usize {
        0
    }
}
