use anyhow::Result;
use overhead::config::Config;
use overhead::db;
use overhead::instance_lock::InstanceLock;
use tracing::info;

pub async fn handle_migrate(config: &Config) -> Result<()> {
    let _lock = InstanceLock::for_database(&config.db_path)?;

    let pool = db::create_pool(&config.db_path)?;
    let applied = tokio::task::spawn_blocking(move || db::run_migrations(&pool)).await??;

    info!(
        "Database {} ready ({} migration(s) applied)",
        config.db_path.display(),
        applied.len()
    );
    Ok(())
}
