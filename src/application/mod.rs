pub mod add_signal;
pub mod clustering;
pub mod detect;
pub mod materialize;
pub mod merge;
pub mod query;
pub mod reindex;
pub mod roadmap;
pub mod roadmap_scorer;
pub mod stats;
