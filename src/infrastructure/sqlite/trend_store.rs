use super::{lock, to_timestamp, SharedConnection};
use crate::domain::error::DomainError;
use crate::domain::ports::trend_service::TrendService;
use crate::domain::values::trend_direction::TrendDirection;
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, OptionalExtension};

/// Trend labels recorded per theme by an external analysis job.
pub struct SqliteTrendStore {
    conn: SharedConnection,
}

impl SqliteTrendStore {
    pub fn new(conn: SharedConnection) -> Self {
        Self { conn }
    }

    pub fn set_trend(&self, theme: &str, direction: TrendDirection) -> Result<(), DomainError> {
        let theme = theme.trim().to_lowercase();
        if theme.is_empty() {
            return Err(DomainError::InvalidInput("Theme must not be empty".into()));
        }
        let conn = lock(&self.conn)?;
        conn.execute(
            "INSERT OR REPLACE INTO theme_trends (theme, direction, updated_at)
             VALUES (?1, ?2, ?3)",
            params![theme, direction.to_string(), to_timestamp(&Utc::now())],
        )?;
        Ok(())
    }
}

#[async_trait]
impl TrendService for SqliteTrendStore {
    async fn trend_for(&self, theme: &str) -> Result<Option<TrendDirection>, DomainError> {
        let conn = lock(&self.conn)?;
        let raw: Option<String> = conn
            .query_row(
                "SELECT direction FROM theme_trends WHERE theme = ?1",
                params![theme.trim().to_lowercase()],
                |r| r.get(0),
            )
            .optional()?;
        raw.map(|r| r.parse().map_err(DomainError::Parse)).transpose()
    }
}
