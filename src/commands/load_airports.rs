use anyhow::{Context, Result};
use overhead::airports::{self, Airport, OPENFLIGHTS_URL};
use overhead::airports_repo::AirportsRepository;
use overhead::config::Config;
use overhead::instance_lock::InstanceLock;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::info;

use super::{http_client, open_database};

const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(60);

async fn download_airports() -> Result<Vec<Airport>> {
    info!("Downloading airports from {}", OPENFLIGHTS_URL);
    let client = http_client(DOWNLOAD_TIMEOUT)?;
    let body = client
        .get(OPENFLIGHTS_URL)
        .send()
        .await
        .context("Failed to download airports")?
        .error_for_status()
        .context("Airports download returned an error status")?
        .bytes()
        .await
        .context("Failed to read airports download")?;

    airports::parse_openflights(body.as_ref())
}

/// Replace the airports table from a local `airports.dat` or a fresh download
pub async fn handle_load_airports(config: &Config, file: Option<&Path>) -> Result<()> {
    let _lock = InstanceLock::for_database(&config.db_path)?;
    let pool = open_database(&config.db_path)?;

    let start = Instant::now();
    let parsed = match file {
        Some(path) => {
            info!("Reading airports from {}", path.display());
            airports::read_openflights_file(path)?
        }
        None => download_airports().await?,
    };
    info!("Parsed {} airports with IATA codes", parsed.len());

    let repo = AirportsRepository::new(pool);
    let inserted = repo.replace_all(parsed).await?;
    metrics::gauge!("airports.loaded").set(inserted as f64);

    info!(
        "Loaded {} airports in {:.2}s",
        inserted,
        start.elapsed().as_secs_f64()
    );
    Ok(())
}
