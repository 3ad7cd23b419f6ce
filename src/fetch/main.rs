//! Dataset fetcher.
//!
//! Resolves the city boundary with Nominatim, downloads healthcare
//! facilities from the Overpass API, and writes both cache files.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use healthreach::analysis::category_counts;
use healthreach::config::Config;
use healthreach::dataset::Dataset;

#[derive(Parser, Debug)]
#[command(name = "fetch")]
#[command(about = "Fetch the boundary and healthcare facilities from OpenStreetMap")]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory to write the GeoJSON files to (overrides config)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Place to resolve (overrides config)
    #[arg(long)]
    place: Option<String>,

    /// Re-download even when the cache files exist
    #[arg(long)]
    force: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();
    let mut config = Config::load_or_default(args.config.as_deref())?;
    if let Some(dir) = args.data_dir {
        config.data.dir = dir;
    }
    if let Some(place) = args.place {
        config.source.place = place;
    }

    info!("Healthreach dataset fetch");
    info!("Place: {}", config.source.place);
    info!("Amenities: {}", config.source.amenities.join(", "));

    if Dataset::is_cached(&config.data) && !args.force {
        info!(
            "Cache already present in {} (use --force to refresh)",
            config.data.dir.display()
        );
        return Ok(());
    }

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .context("Invalid progress template")?,
    );
    pb.set_message(format!("Fetching {} from OpenStreetMap...", config.source.place));
    pb.enable_steady_tick(Duration::from_millis(120));

    let result = Dataset::fetch(&config.source).await;
    pb.finish_and_clear();
    let dataset = result?;

    dataset
        .save(&config.data)
        .context("Failed to write dataset files")?;

    info!("Boundary: {}", dataset.boundary.name);
    info!("Facilities: {}", dataset.facilities.len());
    for (category, count) in category_counts(&dataset.facilities) {
        info!("  {}: {}", category, count);
    }

    Ok(())
}
