use crate::domain::error::DomainError;
use rusqlite::Connection;

pub fn run_migrations(conn: &Connection) -> Result<(), DomainError> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS signals (
            id TEXT PRIMARY KEY,
            source TEXT NOT NULL,
            signal_type TEXT NOT NULL,
            content TEXT NOT NULL,
            normalized_content TEXT NOT NULL,
            metadata TEXT NOT NULL DEFAULT '{}',
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS opportunities (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            description TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'new',
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS opportunity_signals (
            opportunity_id TEXT NOT NULL REFERENCES opportunities(id) ON DELETE CASCADE,
            signal_id TEXT NOT NULL REFERENCES signals(id) ON DELETE CASCADE,
            linked_at TEXT NOT NULL,
            PRIMARY KEY (opportunity_id, signal_id)
        );

        CREATE TABLE IF NOT EXISTS vectors (
            id TEXT PRIMARY KEY,
            vector BLOB NOT NULL
        );

        CREATE TABLE IF NOT EXISTS extractions (
            signal_id TEXT PRIMARY KEY REFERENCES signals(id) ON DELETE CASCADE,
            payload TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS theme_trends (
            theme TEXT PRIMARY KEY,
            direction TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_signals_created ON signals(created_at);
        CREATE INDEX IF NOT EXISTS idx_signals_source ON signals(source);
        CREATE INDEX IF NOT EXISTS idx_opportunities_created ON opportunities(created_at);
        CREATE INDEX IF NOT EXISTS idx_links_signal ON opportunity_signals(signal_id);
        "
    ).map_err(|e| DomainError::Database(format!("Migration failed: {e}")))
}
