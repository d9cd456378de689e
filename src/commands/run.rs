use anyhow::Result;
use overhead::adsb_lol_client::AdsbLolClient;
use overhead::adsbdb_client::AdsbdbClient;
use overhead::config::Config;
use overhead::enrichment::Enricher;
use overhead::event_merger::EventMerger;
use overhead::events_repo::{EventsRepository, SweepScope};
use overhead::ingest::Ingestor;
use overhead::instance_lock::InstanceLock;
use overhead::metrics::start_metrics_server;
use overhead::reclassify::Reclassifier;
use overhead::reference_cache::ReferenceCacheRepository;
use overhead::tasks::{TaskRegistry, spawn_periodic};
use overhead::web::{AppState, start_web_server};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use super::{http_client, open_database};

/// Ingest, sweep, and serve until Ctrl+C
pub async fn handle_run(config: &Config) -> Result<()> {
    let _lock = InstanceLock::for_database(&config.db_path)?;
    let pool = open_database(&config.db_path)?;

    let observer = config.observer();
    info!("Starting run command with:");
    info!("  Database: {}", config.db_path.display());
    info!(
        "  Observer: {:.4}, {:.4} radius {} nm",
        observer.latitude, observer.longitude, observer.radius_nm
    );
    info!(
        "  Poll every {}s, event window {} min, sweep every {}s",
        config.poll_seconds, config.event_window_minutes, config.reclassify_interval_seconds
    );

    let cancel = CancellationToken::new();
    let registry = TaskRegistry::new();

    if let Some(port) = config.metrics_port {
        let metrics_cancel = cancel.clone();
        tokio::spawn(async move {
            if let Err(e) = start_metrics_server(port, metrics_cancel).await {
                error!("Metrics server stopped: {:#}", e);
            }
        });
    }

    let client = http_client(config.feed_timeout().max(config.lookup_timeout()))?;
    let feed = AdsbLolClient::new(
        client.clone(),
        &config.feed_url,
        observer,
        config.feed_timeout(),
    );
    let source = AdsbdbClient::new(client, &config.reference_url, config.lookup_timeout());

    let enricher = Enricher::new(
        ReferenceCacheRepository::new(pool.clone()),
        Arc::new(source),
        config.lookup_timeout(),
    );
    let merger = EventMerger::new(EventsRepository::new(pool.clone()), config.event_window());
    let ingestor = Ingestor::new(Arc::new(feed), enricher, merger);

    let reclassifier = Reclassifier::new(
        EventsRepository::new(pool.clone()),
        i64::from(config.reclassify_batch_size),
        SweepScope::Candidates,
    );

    let handles = vec![
        spawn_periodic(
            ingestor,
            config.poll_interval(),
            registry.clone(),
            cancel.clone(),
        ),
        spawn_periodic(
            reclassifier,
            config.reclassify_interval(),
            registry.clone(),
            cancel.clone(),
        ),
    ];

    let shutdown = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Received shutdown signal (Ctrl+C), initiating graceful shutdown...");
                shutdown.cancel();
            }
            Err(e) => error!("Unable to listen for shutdown signal: {}", e),
        }
    });

    let state = AppState {
        pool,
        tasks: registry,
    };
    let web_result = start_web_server(config.web_address(), state, cancel.clone()).await;

    // A web server failure also stops the background tasks
    cancel.cancel();
    for handle in handles {
        if let Err(e) = handle.await {
            error!("Background task panicked: {}", e);
        }
    }
    info!("Graceful shutdown complete");

    web_result
}
