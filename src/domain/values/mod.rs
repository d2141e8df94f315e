pub mod customer_tier;
pub mod opportunity_status;
pub mod roadmap_score;
pub mod signal_metadata;
pub mod text;
pub mod trend_direction;
