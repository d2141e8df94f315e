use crate::domain::entities::extraction::Extraction;
use crate::domain::error::DomainError;
use async_trait::async_trait;
use std::collections::HashMap;

/// Source of LLM-extracted entities per signal.
#[async_trait]
pub trait ExtractionStore: Send + Sync {
    /// Extractions keyed by signal id. Signals without one are absent from the map.
    async fn for_signals(
        &self,
        signal_ids: &[String],
    ) -> Result<HashMap<String, Extraction>, DomainError>;

    async fn save(&self, signal_id: &str, extraction: &Extraction) -> Result<(), DomainError>;
}
