use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::classification::Label;
use crate::events::Event;
use crate::sightings::Altitude;

/// Event as returned by the API
#[derive(Debug, Clone, Serialize)]
pub struct EventView {
    pub id: i32,
    pub event_key: String,
    pub hex: Option<String>,
    pub registration: Option<String>,
    pub callsign: Option<String>,
    pub type_code: Option<String>,
    pub model: Option<String>,
    pub manufacturer: Option<String>,
    pub country: Option<String>,
    pub country_iso: Option<String>,
    pub owner: Option<String>,
    pub airline_name: Option<String>,
    pub origin_iata: Option<String>,
    pub origin_name: Option<String>,
    pub dest_iata: Option<String>,
    pub dest_name: Option<String>,

    /// Feet, `"ground"`, or null
    pub altitude_ft: Option<Altitude>,
    pub on_ground: bool,
    pub ground_speed_kt: Option<f64>,
    pub distance_nm: Option<f64>,
    pub heading_deg: Option<f64>,

    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub seen_at: DateTime<Utc>,
    pub times_seen: i32,

    /// `null` when the stored label is missing or not a known label
    pub classification: Option<Label>,

    /// Seconds between `last_seen` and the requested time; set by time searches only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_diff_seconds: Option<i64>,
}

impl EventView {
    pub fn with_time_diff(mut self, target: DateTime<Utc>) -> Self {
        self.time_diff_seconds = Some((self.last_seen - target).num_seconds().abs());
        self
    }
}

impl From<Event> for EventView {
    fn from(event: Event) -> Self {
        let f = event.fields;
        Self {
            id: event.id,
            event_key: f.event_key,
            hex: f.hex,
            registration: f.registration,
            callsign: f.callsign,
            type_code: f.type_code,
            model: f.model,
            manufacturer: f.manufacturer,
            country: f.country,
            country_iso: f.country_iso,
            owner: f.owner,
            airline_name: f.airline_name,
            origin_iata: f.origin_iata,
            origin_name: f.origin_name,
            dest_iata: f.dest_iata,
            dest_name: f.dest_name,
            on_ground: f.altitude.is_some_and(|a| a.is_ground()),
            altitude_ft: f.altitude,
            ground_speed_kt: f.ground_speed_kt,
            distance_nm: f.distance_nm,
            heading_deg: f.heading_deg,
            first_seen: f.first_seen,
            last_seen: f.last_seen,
            seen_at: f.seen_at,
            times_seen: f.times_seen,
            classification: f.classification,
            time_diff_seconds: None,
        }
    }
}
