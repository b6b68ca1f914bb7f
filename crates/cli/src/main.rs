//! reelsync operator binary.
//!
//! Maintenance commands for the catalog mirror: derived-cache cleanup and
//! store statistics. Logging goes to stderr as JSON so stdout carries only
//! the machine-readable command output.

use anyhow::{Context, Result, bail};
use tracing_subscriber::EnvFilter;

use reelsync_core::{AppConfig, MirrorDb};
use reelsync_engine::CacheLifecycle;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let args: Vec<String> = std::env::args().collect();
    let Some(command) = args.get(1) else {
        print_usage();
        std::process::exit(2);
    };

    let config = AppConfig::load().context("loading configuration")?;
    let db = MirrorDb::open(&config.db_path).await.context("opening mirror database")?;
    tracing::info!("opened mirror database at {}", config.db_path.display());

    match command.as_str() {
        "cleanup" => cleanup(&db, &config).await,
        "trim" => {
            let Some(target) = args.get(2).and_then(|raw| raw.parse().ok()) else {
                bail!("trim needs a numeric row target, e.g. `reelsync trim 1000`");
            };
            trim(&db, target).await
        }
        "stats" => stats(&db).await,
        other => {
            eprintln!("unknown command: {other}\n");
            print_usage();
            std::process::exit(2);
        }
    }
}

/// Routine maintenance: drop idle never-used entries, then trim only if
/// the cache has drifted past twice the configured target.
async fn cleanup(db: &MirrorDb, config: &AppConfig) -> Result<()> {
    let lifecycle = CacheLifecycle::new(db.clone());
    let purged = lifecycle.light_cleanup(config.cache_max_idle_days).await?;
    let trimmed = lifecycle.enforce_bound(config.cache_target_size).await?;

    let summary = serde_json::json!({
        "purged_never_used": purged,
        "bound_enforced": trimmed,
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

async fn trim(db: &MirrorDb, target: u64) -> Result<()> {
    let report = CacheLifecycle::new(db.clone()).major_cleanup(target).await?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

async fn stats(db: &MirrorDb) -> Result<()> {
    let stats = serde_json::json!({
        "catalog_items": db.catalog_len().await?,
        "ledger_entries": db.ledger_len().await?,
        "derived_cache": db.derived_stats().await?,
    });
    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}

fn print_usage() {
    eprintln!("usage: reelsync <command>");
    eprintln!();
    eprintln!("commands:");
    eprintln!("  cleanup        drop idle never-used cache entries, then trim if the cache");
    eprintln!("                 has grown past twice the configured target size");
    eprintln!("  trim <target>  trim the derived cache to at most <target> rows");
    eprintln!("  stats          print row counts for the catalog, ledger, and derived cache");
}
