use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

use crate::adsbdb::{AircraftBody, Envelope, FlightrouteBody};
use crate::enrichment::ReferenceSource;
use crate::reference_cache::{AircraftMetadata, RouteMetadata};

/// Client for the adsbdb.com aircraft and callsign lookups
#[derive(Clone)]
pub struct AdsbdbClient {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl AdsbdbClient {
    pub fn new(client: Client, base_url: &str, timeout: Duration) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        }
    }

    /// GET `{base_url}/{path}/{key}`. 404 and string responses are `Ok(None)`.
    async fn fetch<T: DeserializeOwned>(&self, path: &str, key: &str) -> Result<Option<T>> {
        let url = format!("{}/{}/{}", self.base_url, path, key);
        debug!("Fetching adsbdb {}: {}", path, key);

        let response = self
            .client
            .get(&url)
            .timeout(self.timeout)
            .send()
            .await
            .with_context(|| format!("Failed to send adsbdb {} request", path))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("adsbdb API error {}: {}", status, body));
        }

        let envelope: Envelope<T> = response
            .json()
            .await
            .with_context(|| format!("Failed to parse adsbdb {} response", path))?;

        Ok(envelope.into_found())
    }
}

#[async_trait]
impl ReferenceSource for AdsbdbClient {
    async fn fetch_aircraft(&self, registration: &str) -> Result<Option<AircraftMetadata>> {
        let body: Option<AircraftBody> = self.fetch("aircraft", registration).await?;
        Ok(body.map(|b| b.aircraft.into()))
    }

    async fn fetch_route(&self, callsign: &str) -> Result<Option<RouteMetadata>> {
        let body: Option<FlightrouteBody> = self.fetch("callsign", callsign).await?;
        Ok(body.map(|b| b.flightroute.into()))
    }
}
