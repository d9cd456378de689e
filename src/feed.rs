//! Sighting sources and the adsb.lol payload they are decoded from.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::sightings::{Altitude, Sighting, deserialize_lenient_altitude, non_empty};

/// Anything that can be polled for the aircraft currently overhead
#[async_trait]
pub trait SightingFeed: Send + Sync {
    /// Fetch the current reports, stamped with `now`. An empty vec means
    /// nothing is in range; transport failures are returned as `Err`.
    async fn poll(&self, now: DateTime<Utc>) -> Result<Vec<Sighting>>;
}

/// One aircraft as reported by adsb.lol
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AdsbLolAircraft {
    pub hex: Option<String>,
    /// Registration
    pub r: Option<String>,
    /// Callsign, space padded
    pub flight: Option<String>,
    /// ICAO type designator
    pub t: Option<String>,
    #[serde(deserialize_with = "deserialize_lenient_altitude")]
    pub alt_baro: Option<Altitude>,
    pub gs: Option<f64>,
    pub dst: Option<f64>,
    pub track: Option<f64>,
}

impl AdsbLolAircraft {
    pub fn into_sighting(self, timestamp: DateTime<Utc>) -> Sighting {
        Sighting {
            hex: non_empty(self.hex.as_deref()).map(str::to_string),
            registration: non_empty(self.r.as_deref()).map(str::to_string),
            callsign: non_empty(self.flight.as_deref()).map(str::to_string),
            type_code: non_empty(self.t.as_deref()).map(str::to_string),
            altitude: self.alt_baro,
            ground_speed_kt: self.gs,
            distance_nm: self.dst,
            heading_deg: self.track,
            timestamp,
        }
    }
}

/// `/v2/closest` answers either `{ "ac": [...] }` or a bare aircraft object
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ClosestResponse {
    List { ac: Vec<AdsbLolAircraft> },
    Single(AdsbLolAircraft),
}

impl ClosestResponse {
    /// The closest aircraft, if the response names one
    pub fn closest(self) -> Option<AdsbLolAircraft> {
        match self {
            ClosestResponse::List { ac } => ac.into_iter().next(),
            ClosestResponse::Single(aircraft) => {
                non_empty(aircraft.hex.as_deref()).is_some().then_some(aircraft)
            }
        }
    }
}
