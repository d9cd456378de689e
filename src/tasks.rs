//! Fixed-interval background tasks with visible health.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// One unit of periodic work. A failed tick is recorded and logged; the
/// schedule keeps running.
#[async_trait]
pub trait PeriodicTask: Send + 'static {
    fn name(&self) -> &'static str;
    async fn tick(&mut self) -> Result<()>;
}

/// Health of one task as last observed by the scheduler
#[derive(Debug, Clone, Default, Serialize)]
pub struct TaskHealth {
    pub interval_secs: u64,
    pub runs: u64,
    pub last_success: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub last_error_at: Option<DateTime<Utc>>,
    pub consecutive_failures: u32,
}

/// Shared view of every scheduled task's health, keyed by task name
#[derive(Clone, Default)]
pub struct TaskRegistry {
    inner: Arc<RwLock<BTreeMap<&'static str, TaskHealth>>>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, name: &'static str, interval: Duration) {
        let mut tasks = self.inner.write().await;
        tasks.entry(name).or_default().interval_secs = interval.as_secs();
    }

    pub async fn record_success(&self, name: &'static str, at: DateTime<Utc>) {
        let mut tasks = self.inner.write().await;
        let health = tasks.entry(name).or_default();
        health.runs += 1;
        health.last_success = Some(at);
        health.consecutive_failures = 0;
    }

    pub async fn record_failure(&self, name: &'static str, at: DateTime<Utc>, message: String) {
        let mut tasks = self.inner.write().await;
        let health = tasks.entry(name).or_default();
        health.runs += 1;
        health.last_error = Some(message);
        health.last_error_at = Some(at);
        health.consecutive_failures += 1;
    }

    pub async fn get(&self, name: &str) -> Option<TaskHealth> {
        self.inner.read().await.get(name).cloned()
    }

    pub async fn snapshot(&self) -> BTreeMap<String, TaskHealth> {
        self.inner
            .read()
            .await
            .iter()
            .map(|(name, health)| (name.to_string(), health.clone()))
            .collect()
    }
}

/// Run `task` every `interval` until `cancel` fires. The first tick runs
/// immediately; overrunning ticks delay the schedule instead of bursting.
pub fn spawn_periodic<T: PeriodicTask>(
    mut task: T,
    interval: Duration,
    registry: TaskRegistry,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let name = task.name();
        registry.register(name, interval).await;
        info!(task = name, interval_secs = interval.as_secs(), "Starting periodic task");

        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            match task.tick().await {
                Ok(()) => registry.record_success(name, Utc::now()).await,
                Err(e) => {
                    error!(task = name, "Task tick failed: {:#}", e);
                    metrics::counter!("task.failures", "task" => name).increment(1);
                    registry.record_failure(name, Utc::now(), format!("{:#}", e)).await;
                }
            }
        }

        info!(task = name, "Periodic task stopped");
    })
}
