//! adsbdb.com response shapes.
//!
//! Every answer is wrapped as `{ "response": ... }`. A found record is an
//! object; a miss is reported as a plain string such as
//! `"unknown aircraft"`.

use serde::Deserialize;

use crate::reference_cache::{AircraftMetadata, RouteMetadata};
use crate::sightings::non_empty;

#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    pub response: EnvelopeBody<T>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum EnvelopeBody<T> {
    Found(T),
    Message(String),
}

impl<T> Envelope<T> {
    pub fn into_found(self) -> Option<T> {
        match self.response {
            EnvelopeBody::Found(body) => Some(body),
            EnvelopeBody::Message(_) => None,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AircraftBody {
    pub aircraft: AdsbdbAircraft,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AdsbdbAircraft {
    pub icao_type: Option<String>,
    #[serde(rename = "type")]
    pub model: Option<String>,
    pub manufacturer: Option<String>,
    pub registered_owner: Option<String>,
    pub registered_owner_country_name: Option<String>,
    pub registered_owner_country_iso_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct FlightrouteBody {
    pub flightroute: AdsbdbFlightroute,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AdsbdbFlightroute {
    pub airline: Option<AdsbdbAirline>,
    pub origin: Option<AdsbdbAirport>,
    pub destination: Option<AdsbdbAirport>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AdsbdbAirline {
    pub name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AdsbdbAirport {
    pub iata_code: Option<String>,
    pub name: Option<String>,
    pub municipality: Option<String>,
}

impl AdsbdbAirport {
    /// Airport name, falling back to the city it serves
    fn display_name(&self) -> Option<String> {
        non_empty(self.name.as_deref())
            .or_else(|| non_empty(self.municipality.as_deref()))
            .map(str::to_string)
    }
}

impl From<AdsbdbAircraft> for AircraftMetadata {
    fn from(aircraft: AdsbdbAircraft) -> Self {
        Self {
            type_code: aircraft.icao_type,
            model: aircraft.model,
            manufacturer: aircraft.manufacturer,
            owner: aircraft.registered_owner,
            country: aircraft.registered_owner_country_name,
            country_iso: aircraft.registered_owner_country_iso_name,
        }
    }
}

impl From<AdsbdbFlightroute> for RouteMetadata {
    fn from(route: AdsbdbFlightroute) -> Self {
        Self {
            airline_name: route.airline.and_then(|a| a.name),
            origin_iata: route.origin.as_ref().and_then(|o| o.iata_code.clone()),
            origin_name: route.origin.as_ref().and_then(AdsbdbAirport::display_name),
            dest_iata: route.destination.as_ref().and_then(|d| d.iata_code.clone()),
            dest_name: route
                .destination
                .as_ref()
                .and_then(AdsbdbAirport::display_name),
        }
    }
}
