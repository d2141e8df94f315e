use crate::domain::values::opportunity_status::OpportunityStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A persisted group of related signals; a candidate roadmap item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Opportunity {
    pub id: String,
    pub title: String,
    pub description: String,
    pub status: OpportunityStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Opportunity {
    pub fn new(title: String, description: String) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title,
            description,
            status: OpportunityStatus::New,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Opportunity row plus the number of linked signals, for listings.
#[derive(Debug, Clone, Serialize)]
pub struct OpportunitySummary {
    #[serde(flatten)]
    pub opportunity: Opportunity,
    pub signal_count: usize,
}
