use clap::Parser;
use feedbackmap::application::add_signal::NewSignal;
use feedbackmap::application::clustering::text::ClusteringMode;
use feedbackmap::application::detect::DetectOptions;
use feedbackmap::application::roadmap::RoadmapView;
use feedbackmap::cli::commands::{Cli, Commands};
use feedbackmap::config::EngineConfig;
use feedbackmap::domain::entities::extraction::Extraction;
use feedbackmap::domain::values::opportunity_status::OpportunityStatus;
use feedbackmap::domain::values::trend_direction::TrendDirection;
use feedbackmap::FeedbackMap;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("feedbackmap=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let db_path = std::env::var("FEEDBACKMAP_DB").unwrap_or_else(|_| "./feedbackmap.db".into());

    let config = match EngineConfig::resolve(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading config: {e}");
            std::process::exit(1);
        }
    };

    let fm = match FeedbackMap::new(&db_path, config) {
        Ok(fm) => fm,
        Err(e) => {
            eprintln!("Error initializing feedbackmap: {e}");
            std::process::exit(1);
        }
    };

    let result = run_command(fm, cli.command).await;
    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run_command(fm: FeedbackMap, cmd: Commands) -> Result<(), Box<dyn std::error::Error>> {
    match cmd {
        Commands::Add { json } => {
            let input: NewSignal = serde_json::from_str(&json)?;
            let signal = fm.add_signal(input).await?;
            print_json(&signal)?;
        }
        Commands::Import { file } => {
            let raw = std::fs::read_to_string(&file)
                .map_err(|e| format!("Cannot read {}: {e}", file.display()))?;
            let added = fm.import_signals(&raw).await?;
            println!("Imported {} signals", added.len());
        }
        Commands::Signals { source, since, limit } => {
            let since_dt = parse_date(&since)?;
            let signals = fm.signals(source, since_dt, Some(limit))?;
            print_json(&signals)?;
        }
        Commands::Extraction { signal_id, json } => {
            let extraction: Extraction = serde_json::from_str(&json)?;
            fm.record_extraction(&signal_id, &extraction).await?;
            println!("Extraction recorded for {signal_id}");
        }
        Commands::Trend { theme, direction } => {
            let dir: TrendDirection = direction.parse().map_err(|e: String| e)?;
            fm.set_trend(&theme, dir)?;
            println!("Trend for '{theme}' set to {dir}");
        }
        Commands::Embed => {
            let count = fm.embed_missing().await?;
            println!("Embedded {count} signals");
        }
        Commands::Detect { source, mode } => {
            let mode = mode
                .map(|m| m.parse::<ClusteringMode>())
                .transpose()
                .map_err(|e: String| e)?;
            let report = fm.detect(&DetectOptions { source, mode }).await?;
            print_json(&report)?;
        }
        Commands::Merge { threshold } => {
            let report = fm.merge_related(Some(threshold)).await?;
            print_json(&report)?;
        }
        Commands::Opportunities { limit } => {
            let opportunities = fm.opportunities(Some(limit))?;
            print_json(&opportunities)?;
        }
        Commands::Show { id } => {
            let detail = fm.opportunity(&id)?;
            print_json(&detail)?;
        }
        Commands::Status { id, status } => {
            let st: OpportunityStatus = status.parse().map_err(|e: String| e)?;
            let opportunity = fm.set_status(&id, st)?;
            print_json(&opportunity)?;
        }
        Commands::Score { id } => {
            let scored = fm.score(&id).await?;
            print_json(&scored)?;
        }
        Commands::Roadmap { view, limit } => {
            let view: RoadmapView = view.parse().map_err(|e: String| e)?;
            let scored = fm.roadmap(view, Some(limit)).await?;
            print_json(&scored)?;
        }
        Commands::Stats => {
            let stats = fm.stats()?;
            print_json(&stats)?;
        }
    }
    Ok(())
}

fn parse_date(s: &Option<String>) -> Result<Option<chrono::DateTime<chrono::Utc>>, String> {
    match s {
        None => Ok(None),
        Some(s) => {
            if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(s) {
                return Ok(Some(dt.with_timezone(&chrono::Utc)));
            }
            if let Ok(date) = chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d") {
                if let Some(dt) = date.and_hms_opt(0, 0, 0) {
                    return Ok(Some(chrono::DateTime::from_naive_utc_and_offset(dt, chrono::Utc)));
                }
            }
            Err(format!("Invalid date format: {s}. Use YYYY-MM-DD or RFC3339"))
        }
    }
}
