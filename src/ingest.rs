use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::enrichment::Enricher;
use crate::event_merger::{EventMerger, MergeOutcome};
use crate::feed::SightingFeed;
use crate::sightings::Altitude;
use crate::tasks::PeriodicTask;

fn altitude_text(altitude: Option<Altitude>) -> String {
    match altitude {
        Some(Altitude::Feet(feet)) => format!("{:.0} ft", feet),
        Some(Altitude::Ground) => "ground".to_string(),
        None => "-".to_string(),
    }
}

/// Result of one poll cycle
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngestReport {
    pub sightings: usize,
    pub merged: Vec<MergeOutcome>,
    pub failed: usize,
}

/// Poll → enrich → merge, once per tick
pub struct Ingestor {
    feed: Arc<dyn SightingFeed>,
    enricher: Enricher,
    merger: EventMerger,
}

impl Ingestor {
    pub fn new(feed: Arc<dyn SightingFeed>, enricher: Enricher, merger: EventMerger) -> Self {
        Self {
            feed,
            enricher,
            merger,
        }
    }

    /// Run one cycle. A feed failure fails the cycle; a failed merge only
    /// drops that sighting.
    pub async fn ingest_once(&self) -> Result<IngestReport> {
        metrics::counter!("ingest.cycles").increment(1);

        let sightings = match self.feed.poll(Utc::now()).await {
            Ok(sightings) => sightings,
            Err(e) => {
                metrics::counter!("ingest.poll_failed").increment(1);
                return Err(e).context("Feed poll failed, skipping cycle");
            }
        };

        let mut report = IngestReport {
            sightings: sightings.len(),
            ..Default::default()
        };
        if sightings.is_empty() {
            debug!("No aircraft in range");
            return Ok(report);
        }
        metrics::counter!("ingest.sightings").increment(sightings.len() as u64);

        for sighting in sightings {
            let seen_at = sighting.timestamp;
            let enriched = self.enricher.enrich(sighting).await;

            match self.merger.merge_or_create(&enriched, seen_at).await {
                Ok(outcome) => {
                    info!(
                        "{} {} {}",
                        enriched.sighting.callsign.as_deref().unwrap_or("UNKNOWN"),
                        enriched.sighting.registration.as_deref().unwrap_or_default(),
                        altitude_text(enriched.sighting.altitude),
                    );
                    report.merged.push(outcome);
                }
                Err(e) => {
                    error!("Failed to merge sighting: {:#}", e);
                    metrics::counter!("merge.failed").increment(1);
                    report.failed += 1;
                }
            }
        }

        Ok(report)
    }
}

#[async_trait]
impl PeriodicTask for Ingestor {
    fn name(&self) -> &'static str {
        "ingest"
    }

    async fn tick(&mut self) -> Result<()> {
        self.ingest_once().await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_altitude_text_units_only_on_feet() {
        assert_eq!(altitude_text(Some(Altitude::Feet(12000.0))), "12000 ft");
        assert_eq!(altitude_text(Some(Altitude::Ground)), "ground");
        assert_eq!(altitude_text(None), "-");
    }
}
