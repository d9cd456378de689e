use anyhow::{Context, Result};
use axum::{Router, routing::get};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Install the Prometheus recorder and return a handle for rendering scrapes
pub fn init_metrics() -> Result<PrometheusHandle> {
    PrometheusBuilder::new()
        // Buckets: 1ms, 5ms, 10ms, 25ms, 50ms, 100ms, 250ms, 500ms, 1s, 2.5s, 5s, 10s
        .set_buckets_for_metric(
            Matcher::Full("http_request_duration_seconds".to_string()),
            &[
                0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
            ],
        )
        .context("Failed to set buckets for http_request_duration_seconds")?
        .install_recorder()
        .context("Failed to install Prometheus recorder")
}

/// Initialize run metrics to zero so they appear in scrapes before the
/// first event
pub fn initialize_run_metrics() {
    metrics::counter!("ingest.cycles").absolute(0);
    metrics::counter!("ingest.sightings").absolute(0);
    metrics::counter!("ingest.poll_failed").absolute(0);

    metrics::counter!("merge.created").absolute(0);
    metrics::counter!("merge.new_leg").absolute(0);
    metrics::counter!("merge.continued").absolute(0);
    metrics::counter!("merge.failed").absolute(0);

    for kind in ["aircraft", "route"] {
        metrics::counter!("enrichment.cache_hit", "kind" => kind).absolute(0);
        metrics::counter!("enrichment.cache_miss", "kind" => kind).absolute(0);
        metrics::counter!("enrichment.lookup_failed", "kind" => kind).absolute(0);
    }

    metrics::counter!("reclassify.updated").absolute(0);
}

/// Update uptime and memory gauges every 5 seconds until cancelled
pub async fn process_metrics_task(cancel: CancellationToken) {
    let start_time = Instant::now();

    loop {
        metrics::gauge!("process.uptime.seconds").set(start_time.elapsed().as_secs() as f64);
        metrics::gauge!("process.is_up").set(1.0);

        #[cfg(target_os = "linux")]
        {
            if let Ok(status) = std::fs::read_to_string("/proc/self/status") {
                for line in status.lines() {
                    if line.starts_with("VmRSS:") {
                        if let Some(kb_str) = line.split_whitespace().nth(1)
                            && let Ok(kb) = kb_str.parse::<f64>()
                        {
                            metrics::gauge!("process.memory.bytes").set(kb * 1024.0);
                        }
                        break;
                    }
                }
            }
        }

        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(Duration::from_secs(5)) => {}
        }
    }
}

/// Serve `/metrics` on its own port until cancelled
pub async fn start_metrics_server(port: u16, cancel: CancellationToken) -> Result<()> {
    let handle = init_metrics()?;
    initialize_run_metrics();

    tokio::spawn(process_metrics_task(cancel.clone()));

    let app = Router::new().route("/metrics", get(move || async move { handle.render() }));

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Starting metrics server on http://{}/metrics", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind metrics server to {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await
        .context("Metrics server failed")
}
