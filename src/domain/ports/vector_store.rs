use crate::domain::error::DomainError;

/// Embedding store. The clustering core only reads vectors it has loaded.
pub trait VectorStore: Send + Sync {
    fn store(&self, id: &str, vector: &[f32]) -> Result<(), DomainError>;
    fn get(&self, id: &str) -> Result<Option<Vec<f32>>, DomainError>;
    fn get_stored_dimension(&self) -> Result<Option<usize>, DomainError>;
}
