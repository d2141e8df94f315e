use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OpportunityStatus {
    #[default]
    New,
    Reviewing,
    Accepted,
    Rejected,
}

impl fmt::Display for OpportunityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OpportunityStatus::New => write!(f, "new"),
            OpportunityStatus::Reviewing => write!(f, "reviewing"),
            OpportunityStatus::Accepted => write!(f, "accepted"),
            OpportunityStatus::Rejected => write!(f, "rejected"),
        }
    }
}

impl FromStr for OpportunityStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "new" => Ok(OpportunityStatus::New),
            "reviewing" | "review" => Ok(OpportunityStatus::Reviewing),
            "accepted" => Ok(OpportunityStatus::Accepted),
            "rejected" => Ok(OpportunityStatus::Rejected),
            _ => Err(format!(
                "Invalid status: '{s}'. Use 'new', 'reviewing', 'accepted' or 'rejected'"
            )),
        }
    }
}
