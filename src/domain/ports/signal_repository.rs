use crate::domain::entities::signal::Signal;
use crate::domain::error::DomainError;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Default)]
pub struct SignalFilter {
    pub source: Option<String>,
    pub since: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct SignalStats {
    pub total_signals: usize,
    pub linked_signals: usize,
    pub by_source: Vec<(String, usize)>,
}

pub trait SignalRepository: Send + Sync {
    fn add(&self, signal: &Signal) -> Result<(), DomainError>;
    fn get_by_id(&self, id: &str) -> Result<Option<Signal>, DomainError>;
    fn query(&self, filter: &SignalFilter) -> Result<Vec<Signal>, DomainError>;
    /// Signals not linked to any opportunity, oldest first.
    fn unlinked(&self, source: Option<&str>) -> Result<Vec<Signal>, DomainError>;
    fn missing_vectors(&self) -> Result<Vec<Signal>, DomainError>;
    fn stats(&self) -> Result<SignalStats, DomainError>;
}
