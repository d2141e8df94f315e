use super::{lock, to_timestamp, SharedConnection};
use crate::domain::entities::extraction::Extraction;
use crate::domain::error::DomainError;
use crate::domain::ports::extraction_store::ExtractionStore;
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, OptionalExtension};
use std::collections::HashMap;
use tracing::warn;

/// Extractions persisted as JSON, one row per signal.
pub struct SqliteExtractionStore {
    conn: SharedConnection,
}

impl SqliteExtractionStore {
    pub fn new(conn: SharedConnection) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl ExtractionStore for SqliteExtractionStore {
    async fn for_signals(
        &self,
        signal_ids: &[String],
    ) -> Result<HashMap<String, Extraction>, DomainError> {
        let conn = lock(&self.conn)?;
        let mut stmt = conn.prepare("SELECT payload FROM extractions WHERE signal_id = ?1")?;
        let mut out = HashMap::new();
        for id in signal_ids {
            let payload: Option<String> = stmt.query_row(params![id], |r| r.get(0)).optional()?;
            let Some(payload) = payload else { continue };
            match serde_json::from_str::<Extraction>(&payload) {
                Ok(ex) => {
                    out.insert(id.clone(), ex);
                }
                Err(e) => warn!(signal_id = %id, error = %e, "Skipping malformed extraction"),
            }
        }
        Ok(out)
    }

    async fn save(&self, signal_id: &str, extraction: &Extraction) -> Result<(), DomainError> {
        let conn = lock(&self.conn)?;
        conn.execute(
            "INSERT OR REPLACE INTO extractions (signal_id, payload, updated_at)
             VALUES (?1, ?2, ?3)",
            params![signal_id, serde_json::to_string(extraction)?, to_timestamp(&Utc::now())],
        )
        .map_err(|e| {
            DomainError::Extraction(format!("Failed to save extraction for {signal_id}: {e}"))
        })?;
        Ok(())
    }
}
