use super::signal_repo::{row_to_signal, SIGNAL_COLS};
use super::{from_timestamp, lock, to_timestamp, SharedConnection};
use crate::domain::entities::opportunity::{Opportunity, OpportunitySummary};
use crate::domain::entities::signal::Signal;
use crate::domain::error::DomainError;
use crate::domain::ports::opportunity_repository::OpportunityRepository;
use crate::domain::values::opportunity_status::OpportunityStatus;
use chrono::Utc;
use rusqlite::{params, OptionalExtension};
use tracing::warn;

const OPPORTUNITY_COLS: &str = "o.id, o.title, o.description, o.status, o.created_at, o.updated_at";

pub struct SqliteOpportunityRepo {
    conn: SharedConnection,
}

impl SqliteOpportunityRepo {
    pub fn new(conn: SharedConnection) -> Self {
        Self { conn }
    }

    fn row_to_opportunity(row: &rusqlite::Row) -> Result<Opportunity, rusqlite::Error> {
        let status_str: String = row.get(3)?;
        let created_str: String = row.get(4)?;
        let updated_str: String = row.get(5)?;
        Ok(Opportunity {
            id: row.get(0)?,
            title: row.get(1)?,
            description: row.get(2)?,
            status: status_str.parse().unwrap_or_else(|_| {
                warn!(status = %status_str, "Invalid opportunity status; defaulting to new");
                OpportunityStatus::default()
            }),
            created_at: from_timestamp(&created_str)?,
            updated_at: from_timestamp(&updated_str)?,
        })
    }
}

impl OpportunityRepository for SqliteOpportunityRepo {
    fn create_with_links(
        &self,
        opportunity: &Opportunity,
        signal_ids: &[String],
    ) -> Result<(), DomainError> {
        let mut conn = lock(&self.conn)?;
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO opportunities (id, title, description, status, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                opportunity.id,
                opportunity.title,
                opportunity.description,
                opportunity.status.to_string(),
                to_timestamp(&opportunity.created_at),
                to_timestamp(&opportunity.updated_at),
            ],
        )
        .map_err(|e| DomainError::Database(format!("Failed to create opportunity: {e}")))?;
        let linked_at = to_timestamp(&Utc::now());
        {
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO opportunity_signals (opportunity_id, signal_id, linked_at)
                 VALUES (?1, ?2, ?3)",
            )?;
            for signal_id in signal_ids {
                stmt.execute(params![opportunity.id, signal_id, linked_at])
                    .map_err(|e| {
                        DomainError::Database(format!("Failed to link signal {signal_id}: {e}"))
                    })?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn link_signals(
        &self,
        opportunity_id: &str,
        signal_ids: &[String],
    ) -> Result<usize, DomainError> {
        let mut conn = lock(&self.conn)?;
        let tx = conn.transaction()?;
        let exists: Option<String> = tx
            .query_row(
                "SELECT id FROM opportunities WHERE id = ?1",
                params![opportunity_id],
                |r| r.get(0),
            )
            .optional()?;
        if exists.is_none() {
            return Err(DomainError::NotFound(format!("Opportunity not found: {opportunity_id}")));
        }
        let linked_at = to_timestamp(&Utc::now());
        let mut added = 0;
        {
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO opportunity_signals (opportunity_id, signal_id, linked_at)
                 VALUES (?1, ?2, ?3)",
            )?;
            for signal_id in signal_ids {
                added += stmt.execute(params![opportunity_id, signal_id, linked_at])?;
            }
        }
        if added > 0 {
            tx.execute(
                "UPDATE opportunities SET updated_at = ?1 WHERE id = ?2",
                params![linked_at, opportunity_id],
            )?;
        }
        tx.commit()?;
        Ok(added)
    }

    fn get(&self, id: &str) -> Result<Option<Opportunity>, DomainError> {
        let conn = lock(&self.conn)?;
        let sql = format!("SELECT {OPPORTUNITY_COLS} FROM opportunities o WHERE o.id = ?1");
        Ok(conn.query_row(&sql, params![id], Self::row_to_opportunity).optional()?)
    }

    fn list(&self) -> Result<Vec<Opportunity>, DomainError> {
        let conn = lock(&self.conn)?;
        let sql = format!(
            "SELECT {OPPORTUNITY_COLS} FROM opportunities o
             ORDER BY o.created_at DESC, o.rowid DESC"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map([], Self::row_to_opportunity)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn list_with_counts(
        &self,
        limit: Option<usize>,
    ) -> Result<Vec<OpportunitySummary>, DomainError> {
        let conn = lock(&self.conn)?;
        let sql = format!(
            "SELECT {OPPORTUNITY_COLS}, COUNT(l.signal_id)
             FROM opportunities o
             LEFT JOIN opportunity_signals l ON l.opportunity_id = o.id
             GROUP BY o.id
             ORDER BY o.created_at DESC, o.rowid DESC
             LIMIT ?1"
        );
        let mut stmt = conn.prepare(&sql)?;
        let limit = limit.map(|l| l as i64).unwrap_or(-1);
        let rows = stmt.query_map(params![limit], |row| {
            Ok(OpportunitySummary {
                opportunity: Self::row_to_opportunity(row)?,
                signal_count: row.get::<_, i64>(6)? as usize,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn linked_signals(&self, opportunity_id: &str) -> Result<Vec<Signal>, DomainError> {
        let conn = lock(&self.conn)?;
        let sql = format!(
            "SELECT {SIGNAL_COLS} FROM opportunity_signals l
             JOIN signals s ON s.id = l.signal_id
             WHERE l.opportunity_id = ?1
             ORDER BY l.rowid ASC"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![opportunity_id], row_to_signal)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn update_text(&self, id: &str, title: &str, description: &str) -> Result<(), DomainError> {
        let conn = lock(&self.conn)?;
        let changed = conn.execute(
            "UPDATE opportunities SET title = ?1, description = ?2, updated_at = ?3 WHERE id = ?4",
            params![title, description, to_timestamp(&Utc::now()), id],
        )?;
        if changed == 0 {
            return Err(DomainError::NotFound(format!("Opportunity not found: {id}")));
        }
        Ok(())
    }

    fn update_status(&self, id: &str, status: OpportunityStatus) -> Result<(), DomainError> {
        let conn = lock(&self.conn)?;
        let changed = conn.execute(
            "UPDATE opportunities SET status = ?1, updated_at = ?2 WHERE id = ?3",
            params![status.to_string(), to_timestamp(&Utc::now()), id],
        )?;
        if changed == 0 {
            return Err(DomainError::NotFound(format!("Opportunity not found: {id}")));
        }
        Ok(())
    }

    fn merge_into(
        &self,
        primary_id: &str,
        secondary_id: &str,
        title: &str,
        description: &str,
    ) -> Result<(), DomainError> {
        if primary_id == secondary_id {
            return Err(DomainError::InvalidInput("Cannot merge an opportunity into itself".into()));
        }
        let mut conn = lock(&self.conn)?;
        // dropping the transaction without commit rolls everything back
        let tx = conn.transaction()?;
        tx.execute(
            "UPDATE OR IGNORE opportunity_signals SET opportunity_id = ?1
             WHERE opportunity_id = ?2",
            params![primary_id, secondary_id],
        )?;
        // links the primary already had
        tx.execute(
            "DELETE FROM opportunity_signals WHERE opportunity_id = ?1",
            params![secondary_id],
        )?;
        let updated = tx.execute(
            "UPDATE opportunities SET title = ?1, description = ?2, updated_at = ?3 WHERE id = ?4",
            params![title, description, to_timestamp(&Utc::now()), primary_id],
        )?;
        if updated == 0 {
            return Err(DomainError::NotFound(format!("Opportunity not found: {primary_id}")));
        }
        let deleted = tx.execute("DELETE FROM opportunities WHERE id = ?1", params![secondary_id])?;
        if deleted == 0 {
            return Err(DomainError::NotFound(format!("Opportunity not found: {secondary_id}")));
        }
        tx.commit()?;
        Ok(())
    }
}
