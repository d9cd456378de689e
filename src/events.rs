use chrono::{DateTime, NaiveDateTime, Utc};
use diesel::prelude::*;
use std::fmt;
use tracing::warn;

use crate::classification::{ClassificationInput, Label};
use crate::sightings::Altitude;

/// Composite identity of a logical event: trimmed `hex|registration|callsign`.
///
/// Empty components still take part in the key. A key whose three
/// components are all empty is degenerate and never merges.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EventKey {
    key: String,
    degenerate: bool,
}

impl EventKey {
    pub fn new(hex: Option<&str>, registration: Option<&str>, callsign: Option<&str>) -> Self {
        let hex = hex.unwrap_or_default().trim();
        let registration = registration.unwrap_or_default().trim();
        let callsign = callsign.unwrap_or_default().trim();

        Self {
            key: format!("{}|{}|{}", hex, registration, callsign),
            degenerate: hex.is_empty() && registration.is_empty() && callsign.is_empty(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.key
    }

    /// True when no identifying component is present
    pub fn is_degenerate(&self) -> bool {
        self.degenerate
    }
}

impl fmt::Display for EventKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key)
    }
}

/// Every persisted attribute of an event except its row id
#[derive(Debug, Clone, PartialEq)]
pub struct EventFields {
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
    pub altitude: Option<Altitude>,
    pub ground_speed_kt: Option<f64>,
    pub distance_nm: Option<f64>,
    pub heading_deg: Option<f64>,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub seen_at: DateTime<Utc>,
    pub times_seen: i32,
    /// `None` when the stored text is missing or outside the label set
    pub classification: Option<Label>,
}

impl EventFields {
    pub fn classification_input(&self) -> ClassificationInput<'_> {
        ClassificationInput {
            airline_name: self.airline_name.as_deref(),
            owner: self.owner.as_deref(),
            callsign: self.callsign.as_deref(),
            type_code: self.type_code.as_deref(),
            registration: self.registration.as_deref(),
        }
    }
}

/// A persisted event row
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub id: i32,
    pub fields: EventFields,
}

#[derive(Debug, Clone, Queryable, Selectable, QueryableByName)]
#[diesel(table_name = crate::schema::events)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct EventModel {
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
    pub altitude_ft: Option<f64>,
    pub on_ground: bool,
    pub ground_speed_kt: Option<f64>,
    pub distance_nm: Option<f64>,
    pub heading_deg: Option<f64>,
    pub first_seen: NaiveDateTime,
    pub last_seen: NaiveDateTime,
    pub seen_at: NaiveDateTime,
    pub times_seen: i32,
    pub classification: Option<String>,
}

/// Insert and full-row update shape. `None` is written as NULL so that
/// telemetry overwrites are unconditional.
#[derive(Debug, Clone, Insertable, AsChangeset)]
#[diesel(table_name = crate::schema::events)]
#[diesel(treat_none_as_null = true)]
pub struct EventRecordModel {
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
    pub altitude_ft: Option<f64>,
    pub on_ground: bool,
    pub ground_speed_kt: Option<f64>,
    pub distance_nm: Option<f64>,
    pub heading_deg: Option<f64>,
    pub first_seen: NaiveDateTime,
    pub last_seen: NaiveDateTime,
    pub seen_at: NaiveDateTime,
    pub times_seen: i32,
    pub classification: Option<String>,
}

/// Parse a stored label. Out-of-set text is a data-quality defect, not a
/// new category: it is logged and read back as "no label".
pub fn parse_stored_label(id: i32, stored: Option<&str>) -> Option<Label> {
    let text = stored?.trim();
    if text.is_empty() {
        return None;
    }
    match text.parse::<Label>() {
        Ok(label) => Some(label),
        Err(_) => {
            warn!(event_id = id, classification = %text, "Stored classification is outside the label set");
            None
        }
    }
}

impl From<EventModel> for Event {
    fn from(model: EventModel) -> Self {
        let classification = parse_stored_label(model.id, model.classification.as_deref());
        Self {
            id: model.id,
            fields: EventFields {
                event_key: model.event_key,
                hex: model.hex,
                registration: model.registration,
                callsign: model.callsign,
                type_code: model.type_code,
                model: model.model,
                manufacturer: model.manufacturer,
                country: model.country,
                country_iso: model.country_iso,
                owner: model.owner,
                airline_name: model.airline_name,
                origin_iata: model.origin_iata,
                origin_name: model.origin_name,
                dest_iata: model.dest_iata,
                dest_name: model.dest_name,
                altitude: Altitude::from_columns(model.altitude_ft, model.on_ground),
                ground_speed_kt: model.ground_speed_kt,
                distance_nm: model.distance_nm,
                heading_deg: model.heading_deg,
                first_seen: model.first_seen.and_utc(),
                last_seen: model.last_seen.and_utc(),
                seen_at: model.seen_at.and_utc(),
                times_seen: model.times_seen,
                classification,
            },
        }
    }
}

impl From<&EventFields> for EventRecordModel {
    fn from(fields: &EventFields) -> Self {
        Self {
            event_key: fields.event_key.clone(),
            hex: fields.hex.clone(),
            registration: fields.registration.clone(),
            callsign: fields.callsign.clone(),
            type_code: fields.type_code.clone(),
            model: fields.model.clone(),
            manufacturer: fields.manufacturer.clone(),
            country: fields.country.clone(),
            country_iso: fields.country_iso.clone(),
            owner: fields.owner.clone(),
            airline_name: fields.airline_name.clone(),
            origin_iata: fields.origin_iata.clone(),
            origin_name: fields.origin_name.clone(),
            dest_iata: fields.dest_iata.clone(),
            dest_name: fields.dest_name.clone(),
            altitude_ft: fields.altitude.and_then(|a| a.feet()),
            on_ground: fields.altitude.is_some_and(|a| a.is_ground()),
            ground_speed_kt: fields.ground_speed_kt,
            distance_nm: fields.distance_nm,
            heading_deg: fields.heading_deg,
            first_seen: fields.first_seen.naive_utc(),
            last_seen: fields.last_seen.naive_utc(),
            seen_at: fields.seen_at.naive_utc(),
            times_seen: fields.times_seen,
            classification: fields.classification.map(|label| label.as_str().to_string()),
        }
    }
}
