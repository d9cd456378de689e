//! Cache-or-fetch enrichment of raw sightings.
//!
//! Registration and callsign lookups are independent: a cached aircraft
//! never suppresses the route lookup. Any failure along the way yields "no
//! enrichment" for that lookup and is only logged.

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::reference_cache::{AircraftMetadata, ReferenceCacheRepository, RouteMetadata};
use crate::sightings::{EnrichedSighting, Sighting, non_empty};

/// Remote lookup of reference data. `Ok(None)` means the source does not
/// know the key.
#[async_trait]
pub trait ReferenceSource: Send + Sync {
    async fn fetch_aircraft(&self, registration: &str) -> Result<Option<AircraftMetadata>>;
    async fn fetch_route(&self, callsign: &str) -> Result<Option<RouteMetadata>>;
}

#[derive(Clone)]
pub struct Enricher {
    cache: ReferenceCacheRepository,
    source: Arc<dyn ReferenceSource>,
    timeout: Duration,
}

impl Enricher {
    pub fn new(
        cache: ReferenceCacheRepository,
        source: Arc<dyn ReferenceSource>,
        timeout: Duration,
    ) -> Self {
        Self {
            cache,
            source,
            timeout,
        }
    }

    /// Attach whatever reference data is available. Never fails.
    pub async fn enrich(&self, sighting: Sighting) -> EnrichedSighting {
        let registration = non_empty(sighting.registration.as_deref()).map(str::to_string);
        let callsign = non_empty(sighting.callsign.as_deref()).map(str::to_string);

        let aircraft = match registration {
            Some(registration) => self.aircraft(&registration).await,
            None => None,
        };
        let route = match callsign {
            Some(callsign) => self.route(&callsign).await,
            None => None,
        };

        EnrichedSighting {
            sighting,
            aircraft,
            route,
        }
    }

    async fn aircraft(&self, registration: &str) -> Option<AircraftMetadata> {
        match self.cache.lookup_aircraft(registration).await {
            Ok(Some(cached)) => {
                metrics::counter!("enrichment.cache_hit", "kind" => "aircraft").increment(1);
                return Some(cached.value);
            }
            Ok(None) => {
                metrics::counter!("enrichment.cache_miss", "kind" => "aircraft").increment(1);
            }
            Err(e) => {
                warn!(registration, "Aircraft cache lookup failed: {}", e);
                metrics::counter!("enrichment.lookup_failed", "kind" => "aircraft").increment(1);
                return None;
            }
        }

        let metadata = self
            .bounded("aircraft", registration, self.source.fetch_aircraft(registration))
            .await?;

        if let Err(e) = self
            .cache
            .upsert_aircraft(registration, &metadata, Utc::now())
            .await
        {
            warn!(registration, "Failed to cache aircraft metadata: {}", e);
        }
        Some(metadata)
    }

    async fn route(&self, callsign: &str) -> Option<RouteMetadata> {
        match self.cache.lookup_route(callsign).await {
            Ok(Some(cached)) => {
                metrics::counter!("enrichment.cache_hit", "kind" => "route").increment(1);
                return Some(cached.value);
            }
            Ok(None) => {
                metrics::counter!("enrichment.cache_miss", "kind" => "route").increment(1);
            }
            Err(e) => {
                warn!(callsign, "Route cache lookup failed: {}", e);
                metrics::counter!("enrichment.lookup_failed", "kind" => "route").increment(1);
                return None;
            }
        }

        let metadata = self
            .bounded("route", callsign, self.source.fetch_route(callsign))
            .await?;

        if let Err(e) = self.cache.upsert_route(callsign, &metadata, Utc::now()).await {
            warn!(callsign, "Failed to cache route metadata: {}", e);
        }
        Some(metadata)
    }

    /// Run one remote fetch under the lookup timeout, folding every failure
    /// into `None`
    async fn bounded<T>(
        &self,
        kind: &'static str,
        key: &str,
        fetch: impl Future<Output = Result<Option<T>>>,
    ) -> Option<T> {
        match tokio::time::timeout(self.timeout, fetch).await {
            Ok(Ok(Some(value))) => Some(value),
            Ok(Ok(None)) => {
                debug!(kind, key, "Reference source has no record");
                None
            }
            Ok(Err(e)) => {
                warn!(kind, key, "Reference lookup failed: {:#}", e);
                metrics::counter!("enrichment.lookup_failed", "kind" => kind).increment(1);
                None
            }
            Err(_) => {
                warn!(kind, key, timeout_secs = self.timeout.as_secs(), "Reference lookup timed out");
                metrics::counter!("enrichment.lookup_failed", "kind" => kind).increment(1);
                None
            }
        }
    }
}
