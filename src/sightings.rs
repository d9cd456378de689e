use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::classification::ClassificationInput;
use crate::reference_cache::{AircraftMetadata, RouteMetadata};

/// Barometric altitude as reported by the feed
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Altitude {
    Feet(f64),
    /// The transponder reports the aircraft on the ground
    Ground,
}

impl Altitude {
    /// Altitude in feet; `Ground` has no numeric value
    pub fn feet(&self) -> Option<f64> {
        match self {
            Altitude::Feet(feet) => Some(*feet),
            Altitude::Ground => None,
        }
    }

    pub fn is_ground(&self) -> bool {
        matches!(self, Altitude::Ground)
    }

    /// Rebuild from the two stored columns
    pub fn from_columns(altitude_ft: Option<f64>, on_ground: bool) -> Option<Self> {
        if on_ground {
            Some(Altitude::Ground)
        } else {
            altitude_ft.map(Altitude::Feet)
        }
    }
}

impl Serialize for Altitude {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Altitude::Feet(feet) => serializer.serialize_f64(*feet),
            Altitude::Ground => serializer.serialize_str("ground"),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawAltitude {
    Number(f64),
    Text(String),
}

impl<'de> Deserialize<'de> for Altitude {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        match RawAltitude::deserialize(deserializer)? {
            RawAltitude::Number(feet) => Ok(Altitude::Feet(feet)),
            RawAltitude::Text(text) if text.trim().eq_ignore_ascii_case("ground") => {
                Ok(Altitude::Ground)
            }
            RawAltitude::Text(text) => Err(serde::de::Error::custom(format!(
                "unrecognised altitude '{}'",
                text
            ))),
        }
    }
}

/// Lenient altitude deserializer for feed payloads: unrecognised values are
/// treated as "no altitude" instead of rejecting the whole report.
pub fn deserialize_lenient_altitude<'de, D>(deserializer: D) -> Result<Option<Altitude>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<RawAltitude>::deserialize(deserializer)?;
    Ok(match raw {
        Some(RawAltitude::Number(feet)) => Some(Altitude::Feet(feet)),
        Some(RawAltitude::Text(text)) if text.trim().eq_ignore_ascii_case("ground") => {
            Some(Altitude::Ground)
        }
        _ => None,
    })
}

/// One raw position report for one aircraft at one instant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sighting {
    pub hex: Option<String>,
    pub registration: Option<String>,
    pub callsign: Option<String>,
    pub type_code: Option<String>,
    #[serde(rename = "altitude_ft", default, deserialize_with = "deserialize_lenient_altitude")]
    pub altitude: Option<Altitude>,
    pub ground_speed_kt: Option<f64>,
    pub distance_nm: Option<f64>,
    pub heading_deg: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

impl Sighting {
    /// A sighting with only a timestamp; identity and telemetry are filled by the caller
    pub fn at(timestamp: DateTime<Utc>) -> Self {
        Self {
            hex: None,
            registration: None,
            callsign: None,
            type_code: None,
            altitude: None,
            ground_speed_kt: None,
            distance_nm: None,
            heading_deg: None,
            timestamp,
        }
    }
}

/// A sighting plus whatever reference data could be found for it
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedSighting {
    pub sighting: Sighting,
    pub aircraft: Option<AircraftMetadata>,
    pub route: Option<RouteMetadata>,
}

/// Treat empty and whitespace-only strings as absent
pub fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

impl EnrichedSighting {
    pub fn new(sighting: Sighting) -> Self {
        Self {
            sighting,
            aircraft: None,
            route: None,
        }
    }

    /// Registry type code when known, otherwise the feed's type code
    pub fn type_code(&self) -> Option<&str> {
        self.aircraft
            .as_ref()
            .and_then(|a| non_empty(a.type_code.as_deref()))
            .or_else(|| non_empty(self.sighting.type_code.as_deref()))
    }

    pub fn owner(&self) -> Option<&str> {
        self.aircraft.as_ref().and_then(|a| a.owner.as_deref())
    }

    pub fn airline_name(&self) -> Option<&str> {
        self.route.as_ref().and_then(|r| r.airline_name.as_deref())
    }

    pub fn classification_input(&self) -> ClassificationInput<'_> {
        ClassificationInput {
            airline_name: self.airline_name(),
            owner: self.owner(),
            callsign: self.sighting.callsign.as_deref(),
            type_code: self.type_code(),
            registration: self.sighting.registration.as_deref(),
        }
    }
}
