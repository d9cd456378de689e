use anyhow::Result;
use overhead::config::Config;
use overhead::events_repo::{EventsRepository, SweepScope};
use overhead::instance_lock::InstanceLock;
use overhead::reclassify::Reclassifier;
use std::time::Instant;
use tracing::info;

use super::open_database;

/// One-shot sweep. With `all`, every row is recomputed (useful after a
/// rule change); otherwise only rows without a settled label.
pub async fn handle_reclassify(config: &Config, all: bool) -> Result<()> {
    let _lock = InstanceLock::for_database(&config.db_path)?;
    let pool = open_database(&config.db_path)?;

    let scope = if all {
        SweepScope::All
    } else {
        SweepScope::Candidates
    };
    info!("Reclassifying events ({:?})", scope);

    let start = Instant::now();
    let mut reclassifier = Reclassifier::new(
        EventsRepository::new(pool),
        i64::from(config.reclassify_batch_size),
        scope,
    );
    let updated = reclassifier.sweep_all().await?;

    info!(
        "Reclassification complete: {} event(s) updated in {:.2}s",
        updated,
        start.elapsed().as_secs_f64()
    );
    Ok(())
}
