use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Commercial tier of a customer, used to weight impact.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CustomerTier {
    Enterprise,
    Growth,
    Startup,
    #[default]
    Unknown,
}

impl fmt::Display for CustomerTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CustomerTier::Enterprise => write!(f, "enterprise"),
            CustomerTier::Growth => write!(f, "growth"),
            CustomerTier::Startup => write!(f, "startup"),
            CustomerTier::Unknown => write!(f, "unknown"),
        }
    }
}

impl FromStr for CustomerTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "enterprise" | "ent" => Ok(CustomerTier::Enterprise),
            "growth" | "mid-market" | "midmarket" => Ok(CustomerTier::Growth),
            "startup" | "smb" => Ok(CustomerTier::Startup),
            "unknown" | "" => Ok(CustomerTier::Unknown),
            _ => Err(format!("Unknown customer tier: {s}")),
        }
    }
}
