pub mod extraction_store;
pub mod migrations;
pub mod opportunity_repo;
pub mod signal_repo;
pub mod trend_store;
pub mod vector_store;

use crate::domain::error::DomainError;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::Connection;
use std::sync::{Arc, Mutex, MutexGuard};

/// One connection shared by every repository of a database.
///
/// Sharing matters for `:memory:` databases, where each new connection
/// would otherwise see its own empty database.
pub type SharedConnection = Arc<Mutex<Connection>>;

/// Open (or create) a database and bring its schema up to date.
pub fn open(db_path: &str) -> Result<SharedConnection, DomainError> {
    let conn = Connection::open(db_path)
        .map_err(|e| DomainError::Database(format!("DB error: {e}")))?;
    if db_path != ":memory:" {
        conn.pragma_update(None, "journal_mode", "WAL")
            .map_err(|e| DomainError::Database(format!("WAL error: {e}")))?;
    }
    conn.pragma_update(None, "foreign_keys", "ON")?;
    migrations::run_migrations(&conn)?;
    Ok(Arc::new(Mutex::new(conn)))
}

pub(crate) fn lock(conn: &SharedConnection) -> Result<MutexGuard<'_, Connection>, DomainError> {
    conn.lock().map_err(|e| DomainError::Database(e.to_string()))
}

/// Fixed-width UTC timestamps so text order matches time order.
pub(crate) fn to_timestamp(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

pub(crate) fn from_timestamp(s: &str) -> Result<DateTime<Utc>, rusqlite::Error> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
        })
}
