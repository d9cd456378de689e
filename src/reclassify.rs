use anyhow::Result;
use async_trait::async_trait;
use tracing::{debug, info};

use crate::events_repo::{EventsRepository, ReclassifyBatch, SweepScope};
use crate::tasks::PeriodicTask;

pub const DEFAULT_BATCH_SIZE: i64 = 250;

/// Backlog sweep that recomputes stored labels in bounded batches.
///
/// Rows are visited in id order from a cursor that survives between passes,
/// so permanently-unknown rows at the front of the table cannot starve newer
/// ones. The cursor wraps once a pass comes back short.
pub struct Reclassifier {
    repo: EventsRepository,
    batch_size: i64,
    scope: SweepScope,
    cursor: i32,
}

impl Reclassifier {
    pub fn new(repo: EventsRepository, batch_size: i64, scope: SweepScope) -> Self {
        Self {
            repo,
            batch_size: batch_size.max(1),
            scope,
            cursor: 0,
        }
    }

    pub fn cursor(&self) -> i32 {
        self.cursor
    }

    /// Process one batch and advance the cursor
    pub async fn sweep_once(&mut self) -> Result<ReclassifyBatch> {
        let batch = self
            .repo
            .reclassify_batch(self.cursor, self.batch_size, self.scope)
            .await?;

        self.cursor = match batch.last_id {
            Some(last_id) if (batch.scanned as i64) >= self.batch_size => last_id,
            _ => 0,
        };

        if batch.updated > 0 {
            metrics::counter!("reclassify.updated").increment(batch.updated as u64);
            info!(
                scanned = batch.scanned,
                updated = batch.updated,
                "Reclassified events"
            );
        } else {
            debug!(scanned = batch.scanned, cursor = self.cursor, "Reclassify pass found nothing to change");
        }

        Ok(batch)
    }

    /// Sweep from the start until one full pass over the table is done.
    /// Returns the total number of rows updated.
    pub async fn sweep_all(&mut self) -> Result<usize> {
        self.cursor = 0;
        let mut updated = 0;
        loop {
            let batch = self.sweep_once().await?;
            updated += batch.updated;
            if self.cursor == 0 {
                return Ok(updated);
            }
        }
    }
}

#[async_trait]
impl PeriodicTask for Reclassifier {
    fn name(&self) -> &'static str {
        "reclassify"
    }

    async fn tick(&mut self) -> Result<()> {
        self.sweep_once().await.map(|_| ())
    }
}
