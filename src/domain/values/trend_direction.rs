use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Trend label reported for a theme by the trend-analysis collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Emerging,
    Growing,
    Stable,
    Declining,
}

impl TrendDirection {
    /// Urgency contribution on a 0–100 scale.
    pub fn urgency_score(&self) -> f64 {
        match self {
            TrendDirection::Emerging => 100.0,
            TrendDirection::Growing => 75.0,
            TrendDirection::Stable => 40.0,
            TrendDirection::Declining => 10.0,
        }
    }
}

impl fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrendDirection::Emerging => write!(f, "emerging"),
            TrendDirection::Growing => write!(f, "growing"),
            TrendDirection::Stable => write!(f, "stable"),
            TrendDirection::Declining => write!(f, "declining"),
        }
    }
}

impl FromStr for TrendDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "emerging" | "new" => Ok(TrendDirection::Emerging),
            "growing" | "rising" => Ok(TrendDirection::Growing),
            "stable" | "flat" => Ok(TrendDirection::Stable),
            "declining" | "falling" => Ok(TrendDirection::Declining),
            _ => Err(format!("Unknown trend direction: {s}")),
        }
    }
}
