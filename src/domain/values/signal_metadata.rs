//! Typed view over a signal's metadata bag.
//!
//! Ingestion collaborators hand over free-form JSON. It is parsed once into
//! [`SignalMetadata`] when a signal is built or loaded; every consumer reads
//! the typed fields instead of re-probing keys. Unknown keys are kept in
//! `extra` so nothing is lost on a round trip through storage.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::domain::values::customer_tier::CustomerTier;

/// Quality used wherever a signal carries no quality score.
pub const DEFAULT_QUALITY: f64 = 0.5;

/// Forum thread resolution state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThreadStatus {
    Resolved,
    Unresolved,
    Unknown,
}

impl fmt::Display for ThreadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ThreadStatus::Resolved => write!(f, "resolved"),
            ThreadStatus::Unresolved => write!(f, "unresolved"),
            ThreadStatus::Unknown => write!(f, "unknown"),
        }
    }
}

impl FromStr for ThreadStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "resolved" | "solved" | "closed" | "answered" => Ok(ThreadStatus::Resolved),
            "unresolved" | "open" | "unsolved" | "unanswered" => Ok(ThreadStatus::Unresolved),
            "unknown" | "" => Ok(ThreadStatus::Unknown),
            _ => Err(format!("Unknown thread status: {s}")),
        }
    }
}

/// Community-forum engagement counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ForumEngagement {
    pub views: u64,
    pub likes: u64,
    pub replies_count: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SignalMetadata {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub customers: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub topics: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub themes: Vec<String>,
    /// Normalized to 0–1.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engagement: Option<ForumEngagement>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ThreadStatus>,
    /// `Some(true)` when the thread has an accepted answer (or the signal is one).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_accepted: Option<bool>,
    /// Tier per customer name, as supplied by the source.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub customer_tiers: BTreeMap<String, CustomerTier>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

const KNOWN_KEYS: &[&str] = &[
    "customers",
    "topics",
    "themes",
    "quality_score",
    "quality_dimensions",
    "views",
    "likes",
    "replies_count",
    "engagement",
    "status",
    "is_accepted",
    "accepted_answer",
    "customer_tier",
    "customer_tiers",
];

impl SignalMetadata {
    /// Parse an untyped metadata bag. Malformed fields fall back to their defaults.
    pub fn from_value(value: &Value) -> Self {
        let obj = match value.as_object() {
            Some(o) => o,
            None => return Self::default(),
        };

        let customers = string_list(obj.get("customers"));
        let topics = string_list(obj.get("topics"));
        let themes = string_list(obj.get("themes"));

        let raw_quality = obj
            .get("quality_score")
            .and_then(Value::as_f64)
            .or_else(|| {
                obj.get("quality_dimensions")
                    .and_then(|d| d.get("compositeScore"))
                    .and_then(Value::as_f64)
            });

        let engagement_src = obj.get("engagement").and_then(Value::as_object).unwrap_or(obj);
        let views = engagement_src.get("views").and_then(Value::as_u64);
        let likes = engagement_src.get("likes").and_then(Value::as_u64);
        let replies = engagement_src.get("replies_count").and_then(Value::as_u64);
        let engagement = if views.is_some() || likes.is_some() || replies.is_some() {
            Some(ForumEngagement {
                views: views.unwrap_or(0),
                likes: likes.unwrap_or(0),
                replies_count: replies.unwrap_or(0),
            })
        } else {
            None
        };

        let status = obj
            .get("status")
            .and_then(Value::as_str)
            .and_then(|s| s.parse().ok());

        let is_accepted = obj
            .get("is_accepted")
            .and_then(Value::as_bool)
            .or_else(|| obj.get("accepted_answer").map(|a| !a.is_null()));

        let mut customer_tiers = BTreeMap::new();
        if let Some(map) = obj.get("customer_tiers").and_then(Value::as_object) {
            for (name, tier) in map {
                if let Some(t) = tier.as_str().and_then(|s| s.parse().ok()) {
                    customer_tiers.insert(name.clone(), t);
                }
            }
        }
        if let Some(tier) = obj
            .get("customer_tier")
            .and_then(Value::as_str)
            .and_then(|s| s.parse::<CustomerTier>().ok())
        {
            for c in &customers {
                customer_tiers.entry(c.clone()).or_insert(tier);
            }
        }

        let extra = obj
            .iter()
            .filter(|(k, _)| !KNOWN_KEYS.contains(&k.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        Self {
            customers,
            topics,
            themes,
            quality_score: raw_quality.map(normalize_quality),
            engagement,
            status,
            is_accepted,
            customer_tiers,
            extra,
        }
    }

    /// Canonical JSON form, as stored.
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|_| Value::Object(Map::new()))
    }

    /// Quality in 0–1, [`DEFAULT_QUALITY`] when absent.
    pub fn quality(&self) -> f64 {
        self.quality_score.unwrap_or(DEFAULT_QUALITY)
    }

    /// Topics and themes together, in that order.
    pub fn labels(&self) -> Vec<String> {
        self.topics.iter().chain(self.themes.iter()).cloned().collect()
    }

    /// Whether this signal came from a community forum thread.
    pub fn is_forum_thread(&self) -> bool {
        self.engagement.is_some() || self.status.is_some()
    }

    pub fn tier_of(&self, customer: &str) -> Option<CustomerTier> {
        self.customer_tiers.get(customer).copied()
    }
}

/// Scores above 1 are read as percentages.
fn normalize_quality(raw: f64) -> f64 {
    let q = if raw > 1.0 { raw / 100.0 } else { raw };
    q.clamp(0.0, 1.0)
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| v.as_str())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        Some(Value::String(s)) => s
            .split(',')
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_quality_percentage_is_normalized() {
        let m = SignalMetadata::from_value(&json!({"quality_dimensions": {"compositeScore": 80}}));
        assert_eq!(m.quality_score, Some(0.8));
        let m = SignalMetadata::from_value(&json!({"quality_score": 0.3}));
        assert_eq!(m.quality(), 0.3);
    }

    #[test]
    fn test_missing_quality_defaults() {
        let m = SignalMetadata::from_value(&json!({}));
        assert_eq!(m.quality(), DEFAULT_QUALITY);
    }

    #[test]
    fn test_forum_fields() {
        let m = SignalMetadata::from_value(&json!({
            "views": 1200, "likes": 4, "replies_count": 7,
            "status": "unresolved", "accepted_answer": null
        }));
        assert!(m.is_forum_thread());
        assert_eq!(m.engagement.map(|e| e.views), Some(1200));
        assert_eq!(m.status, Some(ThreadStatus::Unresolved));
        assert_eq!(m.is_accepted, Some(false));
    }

    #[test]
    fn test_customer_tier_applies_to_listed_customers() {
        let m = SignalMetadata::from_value(&json!({
            "customers": ["Acme"], "customer_tier": "enterprise"
        }));
        assert_eq!(m.tier_of("Acme"), Some(CustomerTier::Enterprise));
    }

    #[test]
    fn test_unknown_keys_survive_round_trip() {
        let raw = json!({"topics": ["billing"], "channel": "#support"});
        let m = SignalMetadata::from_value(&raw);
        let again = SignalMetadata::from_value(&m.to_value());
        assert_eq!(m, again);
        assert_eq!(again.extra.get("channel"), Some(&json!("#support")));
    }
}
