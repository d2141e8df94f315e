use crate::domain::entities::opportunity::{Opportunity, OpportunitySummary};
use crate::domain::entities::signal::Signal;
use crate::domain::error::DomainError;
use crate::domain::ports::opportunity_repository::OpportunityRepository;
use crate::domain::ports::signal_repository::{SignalFilter, SignalRepository};
use crate::domain::values::opportunity_status::OpportunityStatus;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

/// An opportunity with every linked signal.
#[derive(Debug, Clone, Serialize)]
pub struct OpportunityDetail {
    pub opportunity: Opportunity,
    pub signals: Vec<Signal>,
}

/// Read-side queries over signals and opportunities.
pub struct QueryUseCase {
    signal_repo: Arc<dyn SignalRepository>,
    opportunity_repo: Arc<dyn OpportunityRepository>,
}

impl QueryUseCase {
    pub fn new(
        signal_repo: Arc<dyn SignalRepository>,
        opportunity_repo: Arc<dyn OpportunityRepository>,
    ) -> Self {
        Self {
            signal_repo,
            opportunity_repo,
        }
    }

    pub fn signals(
        &self,
        source: Option<String>,
        since: Option<DateTime<Utc>>,
        limit: Option<usize>,
    ) -> Result<Vec<Signal>, DomainError> {
        self.signal_repo.query(&SignalFilter { source, since, limit })
    }

    pub fn signal(&self, id: &str) -> Result<Signal, DomainError> {
        self.signal_repo
            .get_by_id(id)?
            .ok_or_else(|| DomainError::NotFound(format!("Signal not found: {id}")))
    }

    pub fn opportunities(
        &self,
        limit: Option<usize>,
    ) -> Result<Vec<OpportunitySummary>, DomainError> {
        self.opportunity_repo.list_with_counts(limit)
    }

    pub fn opportunity(&self, id: &str) -> Result<OpportunityDetail, DomainError> {
        let opportunity = self
            .opportunity_repo
            .get(id)?
            .ok_or_else(|| DomainError::NotFound(format!("Opportunity not found: {id}")))?;
        let signals = self.opportunity_repo.linked_signals(id)?;
        Ok(OpportunityDetail { opportunity, signals })
    }

    pub fn set_status(
        &self,
        id: &str,
        status: OpportunityStatus,
    ) -> Result<Opportunity, DomainError> {
        self.opportunity_repo.update_status(id, status)?;
        self.opportunity_repo
            .get(id)?
            .ok_or_else(|| DomainError::NotFound(format!("Opportunity not found: {id}")))
    }
}
