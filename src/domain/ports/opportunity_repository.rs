use crate::domain::entities::opportunity::{Opportunity, OpportunitySummary};
use crate::domain::entities::signal::Signal;
use crate::domain::error::DomainError;
use crate::domain::values::opportunity_status::OpportunityStatus;

pub trait OpportunityRepository: Send + Sync {
    /// Insert an opportunity and link its signals in one transaction.
    fn create_with_links(
        &self,
        opportunity: &Opportunity,
        signal_ids: &[String],
    ) -> Result<(), DomainError>;

    /// Link signals to an existing opportunity. Links that already exist are no-ops.
    fn link_signals(
        &self,
        opportunity_id: &str,
        signal_ids: &[String],
    ) -> Result<usize, DomainError>;

    fn get(&self, id: &str) -> Result<Option<Opportunity>, DomainError>;

    /// All opportunities, most recently created first.
    fn list(&self) -> Result<Vec<Opportunity>, DomainError>;

    fn list_with_counts(
        &self,
        limit: Option<usize>,
    ) -> Result<Vec<OpportunitySummary>, DomainError>;

    /// Linked signals in link order.
    fn linked_signals(&self, opportunity_id: &str) -> Result<Vec<Signal>, DomainError>;

    fn update_text(&self, id: &str, title: &str, description: &str) -> Result<(), DomainError>;

    fn update_status(&self, id: &str, status: OpportunityStatus) -> Result<(), DomainError>;

    /// Re-point every link of `secondary_id` to `primary_id`, rewrite the
    /// primary's text and delete the secondary, atomically.
    fn merge_into(
        &self,
        primary_id: &str,
        secondary_id: &str,
        title: &str,
        description: &str,
    ) -> Result<(), DomainError>;
}
