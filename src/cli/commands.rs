use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "feedbackmap",
    about = "Cluster customer feedback into scored product opportunities"
)]
pub struct Cli {
    /// JSON engine config (falls back to FEEDBACKMAP_CONFIG, then defaults)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Add a signal
    Add {
        /// JSON with source, signal_type, content, metadata, created_at
        json: String,
    },
    /// Import signals from a JSON array file
    Import {
        file: PathBuf,
    },
    /// List signals, newest first
    Signals {
        #[arg(long)]
        source: Option<String>,
        /// Only signals created at or after this date (YYYY-MM-DD or RFC3339)
        #[arg(long)]
        since: Option<String>,
        #[arg(long, default_value = "20")]
        limit: usize,
    },
    /// Record LLM-extracted entities for a signal
    Extraction {
        signal_id: String,
        /// JSON with customers, features, issues, themes
        json: String,
    },
    /// Record the trend direction of a theme
    Trend {
        theme: String,
        /// emerging, growing, stable, declining
        direction: String,
    },
    /// Embed signals missing a vector
    Embed,
    /// Detect opportunities from unlinked signals
    Detect {
        /// Only consider signals from this source
        #[arg(long)]
        source: Option<String>,
        /// Clustering mode (text, embedding); overrides the config
        #[arg(long)]
        mode: Option<String>,
    },
    /// Merge opportunities whose signals are related
    Merge {
        #[arg(long, default_value = "0.3")]
        threshold: f64,
    },
    /// List opportunities, newest first
    Opportunities {
        #[arg(long, default_value = "20")]
        limit: usize,
    },
    /// Show an opportunity with its signals
    Show {
        id: String,
    },
    /// Set an opportunity's review status
    Status {
        id: String,
        /// new, reviewing, accepted, rejected
        status: String,
    },
    /// Score one opportunity
    Score {
        id: String,
    },
    /// Prioritized roadmap
    Roadmap {
        /// all, quick-wins, strategic, emerging, high-confidence
        #[arg(long, default_value = "all")]
        view: String,
        #[arg(long, default_value = "20")]
        limit: usize,
    },
    /// Show database statistics
    Stats,
}
