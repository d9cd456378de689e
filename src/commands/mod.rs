pub mod load_airports;
pub mod migrate;
pub mod reclassify;
pub mod run;
pub mod serve;

pub use load_airports::handle_load_airports;
pub use migrate::handle_migrate;
pub use reclassify::handle_reclassify;
pub use run::handle_run;
pub use serve::handle_serve;

use anyhow::{Context, Result};
use overhead::actions::version;
use overhead::db::{self, SqlitePool};
use std::path::Path;
use std::time::Duration;

/// Open the database and bring its schema up to date
pub(crate) fn open_database(path: &Path) -> Result<SqlitePool> {
    let pool = db::create_pool(path)?;
    db::run_migrations(&pool)?;
    Ok(pool)
}

/// Shared HTTP client for the feed and the reference source
pub(crate) fn http_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(format!("overhead-tracker/{}", version()))
        .timeout(timeout)
        .build()
        .context("Failed to build HTTP client")
}
