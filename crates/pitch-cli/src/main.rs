use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use pitch_core::LeagueSeason;
use pitch_storage::Store;
use pitch_sync::{PhaseSummary, SyncConfig, SyncPipeline};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "pitch-cli")]
#[command(about = "Pitch Ledger command-line interface")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Apply the embedded database migrations.
    Migrate,
    /// Catalog phase: clubs and players for one league season.
    Catalog { code: String, season: String },
    /// Schedule phase: fixtures and lineups for one league season.
    Schedule { code: String, season: String },
    /// Odds phase: best-price sheet for one league season.
    Odds { code: String, season: String },
    /// All three phases in their fixed order.
    Run { code: String, season: String },
    /// Revisit persisted UPCOMING fixtures whose date has passed.
    Refresh,
    /// Serve the JSON API (and the cron refresh job when enabled).
    Serve,
    /// Export the parquet snapshot with its checksum manifest.
    Export {
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },
}

fn print_phase(name: &str, summary: &PhaseSummary) {
    println!(
        "{name}: processed={} skipped={} failed={}",
        summary.processed, summary.skipped, summary.failed
    );
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = SyncConfig::from_env();

    match cli.command {
        Commands::Migrate => {
            let store = Store::connect(&config.database_url, 1).await?;
            store.migrate().await?;
            println!("migrations applied");
        }
        Commands::Catalog { code, season } => {
            let pipeline = SyncPipeline::new(config).await?;
            let summary = pipeline.catalog(&LeagueSeason::new(code, season)).await?;
            print_phase("catalog", &summary);
        }
        Commands::Schedule { code, season } => {
            let pipeline = SyncPipeline::new(config).await?;
            let summary = pipeline.schedule(&LeagueSeason::new(code, season)).await?;
            print_phase("schedule", &summary);
        }
        Commands::Odds { code, season } => {
            let pipeline = SyncPipeline::new(config).await?;
            let summary = pipeline.odds(&LeagueSeason::new(code, season)).await?;
            print_phase("odds", &summary);
        }
        Commands::Run { code, season } => {
            let pipeline = SyncPipeline::new(config).await?;
            let summary = pipeline.run_scope(&LeagueSeason::new(code, season)).await?;
            println!("run {} for {}", summary.run_id, summary.scope);
            print_phase("catalog", &summary.catalog);
            print_phase("schedule", &summary.schedule);
            print_phase("odds", &summary.odds);
            for err in &summary.errors {
                eprintln!("error: {err}");
            }
        }
        Commands::Refresh => {
            let pipeline = SyncPipeline::new(config).await?;
            let summary = pipeline.refresh().await?;
            print_phase("refresh", &summary);
        }
        Commands::Serve => {
            let pipeline = Arc::new(SyncPipeline::new(config).await?);
            if let Some(scheduler) = Arc::clone(&pipeline).maybe_build_scheduler().await? {
                scheduler.start().await?;
            }
            pitch_web::serve_from_env(pipeline).await?;
        }
        Commands::Export { out_dir } => {
            let out_dir = out_dir.unwrap_or_else(|| config.snapshot_dir.clone());
            let pipeline = SyncPipeline::new(config).await?;
            let manifest = pipeline.export(&out_dir).await?;
            println!("{}", serde_json::to_string_pretty(&manifest)?);
        }
    }

    Ok(())
}
