use anyhow::Result;
use overhead::config::Config;
use overhead::db;
use overhead::tasks::TaskRegistry;
use overhead::web::{AppState, start_web_server};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Read-only HTTP server over a database maintained by `run`. Takes no
/// writer lock and applies no migrations.
pub async fn handle_serve(config: &Config) -> Result<()> {
    let pool = db::create_pool(&config.db_path)?;
    let cancel = CancellationToken::new();

    let shutdown = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Received shutdown signal (Ctrl+C), stopping web server...");
                shutdown.cancel();
            }
            Err(e) => error!("Unable to listen for shutdown signal: {}", e),
        }
    });

    let state = AppState {
        pool,
        tasks: TaskRegistry::new(),
    };
    start_web_server(config.web_address(), state, cancel).await
}
