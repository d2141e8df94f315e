use crate::domain::values::signal_metadata::SignalMetadata;
use crate::domain::values::text::normalize_content;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single normalized unit of feedback from any source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub id: String,
    /// Originating system, e.g. "slack", "jira", "forum".
    pub source: String,
    /// Kind of content, e.g. "message", "transcript", "document", "web_page", "forum_thread".
    pub signal_type: String,
    pub content: String,
    pub normalized_content: String,
    pub metadata: SignalMetadata,
    pub created_at: DateTime<Utc>,
}

impl Signal {
    pub fn new(
        source: String,
        signal_type: String,
        content: String,
        metadata: SignalMetadata,
    ) -> Self {
        let normalized_content = normalize_content(&content);
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            source,
            signal_type,
            content,
            normalized_content,
            metadata,
            created_at: Utc::now(),
        }
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    /// Text used for word-level comparison.
    pub fn text(&self) -> &str {
        if self.normalized_content.is_empty() {
            &self.content
        } else {
            &self.normalized_content
        }
    }
}
