use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

use crate::feed::{ClosestResponse, SightingFeed};
use crate::sightings::Sighting;

/// Observer position and search radius for the closest-aircraft query
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observer {
    pub latitude: f64,
    pub longitude: f64,
    pub radius_nm: f64,
}

/// Client for the adsb.lol `closest` endpoint
#[derive(Clone)]
pub struct AdsbLolClient {
    client: Client,
    base_url: String,
    observer: Observer,
    timeout: Duration,
}

impl AdsbLolClient {
    pub fn new(client: Client, base_url: &str, observer: Observer, timeout: Duration) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            observer,
            timeout,
        }
    }

    fn url(&self) -> String {
        format!(
            "{}/{}/{}/{}",
            self.base_url, self.observer.latitude, self.observer.longitude, self.observer.radius_nm
        )
    }
}

#[async_trait]
impl SightingFeed for AdsbLolClient {
    async fn poll(&self, now: DateTime<Utc>) -> Result<Vec<Sighting>> {
        let url = self.url();
        debug!("Polling adsb.lol: {}", url);

        let response = self
            .client
            .get(&url)
            .timeout(self.timeout)
            .send()
            .await
            .context("Failed to send request to adsb.lol")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("adsb.lol API error {}: {}", status, body));
        }

        let closest: ClosestResponse = response
            .json()
            .await
            .context("Failed to parse adsb.lol response")?;

        Ok(closest
            .closest()
            .map(|aircraft| aircraft.into_sighting(now))
            .into_iter()
            .collect())
    }
}
