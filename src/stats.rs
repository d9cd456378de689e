use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::classification::Label;

/// Headline numbers over some slice of the event table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub total_events: i64,
    /// Sum of `times_seen`
    pub total_sightings: i64,
    /// Distinct non-empty hex ids
    pub unique_aircraft: i64,
    /// Distinct airline names, falling back to the registered owner
    pub operators: i64,
    pub countries: i64,
    /// Mean airborne altitude in feet, rounded; ground reports are left out
    pub avg_altitude: Option<i64>,
    pub by_classification: BTreeMap<String, i64>,
    pub since: Option<DateTime<Utc>>,
}

/// Summary over the trailing day, with the event count under its own name
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecentSummary {
    pub events_24h: i64,
    #[serde(flatten)]
    pub summary: Summary,
}

impl From<Summary> for RecentSummary {
    fn from(summary: Summary) -> Self {
        Self {
            events_24h: summary.total_events,
            summary,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabelCount {
    pub classification: Label,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HourlyCount {
    pub hour: u32,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopAircraft {
    pub registration: String,
    pub type_code: Option<String>,
    pub model: Option<String>,
    pub owner: Option<String>,
    pub events: i64,
    pub sightings: i64,
    pub last_seen: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopOperator {
    /// Airline name when known, otherwise the registered owner
    pub operator: String,
    pub events: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountryCount {
    pub country: String,
    pub country_iso: Option<String>,
    pub events: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteEndpoint {
    pub iata_code: String,
    pub name: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteCount {
    pub origin: RouteEndpoint,
    pub destination: RouteEndpoint,
    pub events: i64,
}
