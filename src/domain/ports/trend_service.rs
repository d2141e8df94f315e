use crate::domain::error::DomainError;
use crate::domain::values::trend_direction::TrendDirection;
use async_trait::async_trait;

/// Trend-analysis collaborator.
#[async_trait]
pub trait TrendService: Send + Sync {
    /// `None` when the theme has no recorded trend.
    async fn trend_for(&self, theme: &str) -> Result<Option<TrendDirection>, DomainError>;
}
