//! Airport reference data from the OpenFlights `airports.dat` dump.
//!
//! The dump is a headerless CSV:
//! `id, name, city, country, IATA, ICAO, latitude, longitude, altitude, ...`
//! with `\N` standing in for missing values.

use anyhow::{Context, Result};
use diesel::prelude::*;
use serde::Serialize;
use std::io::Read;
use std::path::Path;
use tracing::debug;

pub const OPENFLIGHTS_URL: &str =
    "https://raw.githubusercontent.com/jpatokal/openflights/master/data/airports.dat";

#[derive(
    Debug, Clone, PartialEq, Serialize, Queryable, Selectable, Insertable, QueryableByName,
)]
#[diesel(table_name = crate::schema::airports)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Airport {
    pub iata_code: String,
    pub name: String,
    pub city: Option<String>,
    pub country: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
}

fn to_opt_string(s: &str) -> Option<String> {
    let t = s.trim();
    if t.is_empty() || t == "\\N" {
        None
    } else {
        Some(t.to_string())
    }
}

impl Airport {
    /// Build an airport from one OpenFlights record. Returns `None` for rows
    /// without a three-letter IATA code or with unparsable coordinates.
    pub fn from_openflights_record(record: &csv::StringRecord) -> Option<Self> {
        if record.len() < 8 {
            return None;
        }

        let iata = record.get(4)?.trim();
        if iata.is_empty() || iata == "\\N" || iata.chars().count() != 3 {
            return None;
        }

        let latitude = record.get(6)?.trim().parse::<f64>().ok()?;
        let longitude = record.get(7)?.trim().parse::<f64>().ok()?;

        Some(Self {
            iata_code: iata.to_string(),
            name: record.get(1).map(str::trim).unwrap_or_default().to_string(),
            city: record.get(2).and_then(to_opt_string),
            country: record.get(3).and_then(to_opt_string),
            latitude,
            longitude,
        })
    }
}

/// Parse an OpenFlights dump, skipping rows that do not describe an IATA airport
pub fn parse_openflights<R: Read>(input: R) -> Result<Vec<Airport>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(input);

    let mut out = Vec::new();
    let mut skipped = 0usize;
    for (lineno, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("Reading airports line {}", lineno + 1))?;
        match Airport::from_openflights_record(&record) {
            Some(airport) => out.push(airport),
            None => skipped += 1,
        }
    }

    debug!("Parsed {} airports, skipped {} rows", out.len(), skipped);
    Ok(out)
}

pub fn read_openflights_file<P: AsRef<Path>>(path: P) -> Result<Vec<Airport>> {
    let file = std::fs::File::open(path.as_ref())
        .with_context(|| format!("Opening {:?}", path.as_ref()))?;
    parse_openflights(file)
}
