use crate::domain::error::DomainError;
use crate::domain::ports::opportunity_repository::OpportunityRepository;
use crate::domain::ports::signal_repository::SignalRepository;
use crate::domain::values::opportunity_status::OpportunityStatus;
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Clone, Default, Serialize)]
pub struct Stats {
    pub total_signals: usize,
    pub linked_signals: usize,
    pub unlinked_signals: usize,
    pub signals_by_source: Vec<(String, usize)>,
    pub total_opportunities: usize,
    pub opportunities_by_status: Vec<(OpportunityStatus, usize)>,
}

pub struct StatsUseCase {
    signal_repo: Arc<dyn SignalRepository>,
    opportunity_repo: Arc<dyn OpportunityRepository>,
}

impl StatsUseCase {
    pub fn new(
        signal_repo: Arc<dyn SignalRepository>,
        opportunity_repo: Arc<dyn OpportunityRepository>,
    ) -> Self {
        Self {
            signal_repo,
            opportunity_repo,
        }
    }

    pub fn stats(&self) -> Result<Stats, DomainError> {
        let signals = self.signal_repo.stats()?;
        let opportunities = self.opportunity_repo.list()?;

        let mut by_status: Vec<(OpportunityStatus, usize)> = Vec::new();
        for o in &opportunities {
            match by_status.iter_mut().find(|(s, _)| *s == o.status) {
                Some((_, n)) => *n += 1,
                None => by_status.push((o.status, 1)),
            }
        }

        Ok(Stats {
            total_signals: signals.total_signals,
            linked_signals: signals.linked_signals,
            unlinked_signals: signals.total_signals - signals.linked_signals,
            signals_by_source: signals.by_source,
            total_opportunities: opportunities.len(),
            opportunities_by_status: by_status,
        })
    }
}
