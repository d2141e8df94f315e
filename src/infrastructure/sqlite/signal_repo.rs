use super::{from_timestamp, lock, to_timestamp, SharedConnection};
use crate::domain::entities::signal::Signal;
use crate::domain::error::DomainError;
use crate::domain::ports::signal_repository::*;
use crate::domain::values::signal_metadata::SignalMetadata;
use rusqlite::{params, OptionalExtension};

pub(crate) const SIGNAL_COLS: &str =
    "s.id, s.source, s.signal_type, s.content, s.normalized_content, s.metadata, s.created_at";

pub struct SqliteSignalRepo {
    conn: SharedConnection,
}

impl SqliteSignalRepo {
    pub fn new(conn: SharedConnection) -> Self {
        Self { conn }
    }
}

pub(crate) fn row_to_signal(row: &rusqlite::Row) -> Result<Signal, rusqlite::Error> {
    let metadata_str: String = row.get(5)?;
    let created_str: String = row.get(6)?;
    let metadata = serde_json::from_str::<serde_json::Value>(&metadata_str)
        .map(|v| SignalMetadata::from_value(&v))
        .unwrap_or_default();

    Ok(Signal {
        id: row.get(0)?,
        source: row.get(1)?,
        signal_type: row.get(2)?,
        content: row.get(3)?,
        normalized_content: row.get(4)?,
        metadata,
        created_at: from_timestamp(&created_str)?,
    })
}

impl SignalRepository for SqliteSignalRepo {
    fn add(&self, signal: &Signal) -> Result<(), DomainError> {
        let conn = lock(&self.conn)?;
        conn.execute(
            "INSERT INTO signals (id, source, signal_type, content, normalized_content, metadata, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                signal.id,
                signal.source,
                signal.signal_type,
                signal.content,
                signal.normalized_content,
                serde_json::to_string(&signal.metadata.to_value())?,
                to_timestamp(&signal.created_at),
            ],
        )
        .map_err(|e| DomainError::Database(format!("Failed to add signal: {e}")))?;
        Ok(())
    }

    fn get_by_id(&self, id: &str) -> Result<Option<Signal>, DomainError> {
        let conn = lock(&self.conn)?;
        let sql = format!("SELECT {SIGNAL_COLS} FROM signals s WHERE s.id = ?1");
        Ok(conn.query_row(&sql, params![id], row_to_signal).optional()?)
    }

    fn query(&self, filter: &SignalFilter) -> Result<Vec<Signal>, DomainError> {
        let conn = lock(&self.conn)?;
        let mut sql = format!("SELECT {SIGNAL_COLS} FROM signals s WHERE 1=1");
        let mut param_values: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

        if let Some(source) = &filter.source {
            sql.push_str(&format!(" AND s.source = ?{}", param_values.len() + 1));
            param_values.push(Box::new(source.to_lowercase()));
        }
        if let Some(since) = &filter.since {
            sql.push_str(&format!(" AND s.created_at >= ?{}", param_values.len() + 1));
            param_values.push(Box::new(to_timestamp(since)));
        }
        sql.push_str(" ORDER BY s.created_at DESC, s.rowid DESC");
        if let Some(limit) = filter.limit {
            sql.push_str(&format!(" LIMIT ?{}", param_values.len() + 1));
            param_values.push(Box::new(limit as i64));
        }

        let params_ref: Vec<&dyn rusqlite::types::ToSql> =
            param_values.iter().map(|p| p.as_ref()).collect();
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_ref.as_slice(), row_to_signal)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn unlinked(&self, source: Option<&str>) -> Result<Vec<Signal>, DomainError> {
        let conn = lock(&self.conn)?;
        let mut sql = format!(
            "SELECT {SIGNAL_COLS} FROM signals s
             WHERE NOT EXISTS (SELECT 1 FROM opportunity_signals l WHERE l.signal_id = s.id)"
        );
        if source.is_some() {
            sql.push_str(" AND s.source = ?1");
        }
        sql.push_str(" ORDER BY s.created_at ASC, s.rowid ASC");

        let mut stmt = conn.prepare(&sql)?;
        let rows = match source {
            Some(src) => stmt.query_map(params![src.to_lowercase()], row_to_signal)?,
            None => stmt.query_map([], row_to_signal)?,
        };
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn missing_vectors(&self) -> Result<Vec<Signal>, DomainError> {
        let conn = lock(&self.conn)?;
        let sql = format!(
            "SELECT {SIGNAL_COLS} FROM signals s
             LEFT JOIN vectors v ON v.id = s.id
             WHERE v.id IS NULL
             ORDER BY s.created_at ASC, s.rowid ASC"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map([], row_to_signal)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn stats(&self) -> Result<SignalStats, DomainError> {
        let conn = lock(&self.conn)?;
        let total_signals: i64 = conn.query_row("SELECT COUNT(*) FROM signals", [], |r| r.get(0))?;
        let linked_signals: i64 = conn.query_row(
            "SELECT COUNT(DISTINCT signal_id) FROM opportunity_signals",
            [],
            |r| r.get(0),
        )?;

        let mut stmt = conn.prepare(
            "SELECT source, COUNT(*) AS n FROM signals GROUP BY source ORDER BY n DESC, source ASC",
        )?;
        let by_source = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as usize)))?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(SignalStats {
            total_signals: total_signals as usize,
            linked_signals: linked_signals as usize,
            by_source,
        })
    }
}
