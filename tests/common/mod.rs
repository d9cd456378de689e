//! Common test utilities for database-backed integration tests
//!
//! Each `TestDatabase` is a fresh SQLite file inside its own temporary
//! directory with every migration applied, so tests run in parallel without
//! sharing state. The directory (and the database) is removed on drop.
//!
//! ```no_run
//! use common::TestDatabase;
//!
//! #[tokio::test]
//! async fn my_test() {
//!     let test_db = TestDatabase::new().expect("Failed to create test database");
//!     let pool = test_db.pool();
//! }
//! ```
#![allow(dead_code)]

use anyhow::Result;
use chrono::{DateTime, TimeZone, Utc};
use overhead::db::{self, SqlitePool};
use overhead::reference_cache::{AircraftMetadata, RouteMetadata};
use overhead::sightings::{EnrichedSighting, Sighting};
use std::path::PathBuf;
use tempfile::TempDir;

pub struct TestDatabase {
    dir: TempDir,
    pool: SqlitePool,
}

impl TestDatabase {
    pub fn new() -> Result<Self> {
        let dir = tempfile::tempdir()?;
        let pool = db::create_pool_with_size(&dir.path().join("test.db"), 4)?;
        db::run_migrations(&pool)?;
        Ok(Self { dir, pool })
    }

    pub fn pool(&self) -> SqlitePool {
        self.pool.clone()
    }

    pub fn path(&self) -> PathBuf {
        self.dir.path().join("test.db")
    }
}

/// Fixed reference instant for timeline tests
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 14, 0, 0).unwrap()
}

pub fn minutes(n: i64) -> chrono::Duration {
    chrono::Duration::minutes(n)
}

pub fn sighting(hex: &str, registration: &str, callsign: &str, at: DateTime<Utc>) -> Sighting {
    Sighting {
        hex: Some(hex.to_string()),
        registration: Some(registration.to_string()),
        callsign: Some(callsign.to_string()),
        ..Sighting::at(at)
    }
}

pub fn bare(sighting: Sighting) -> EnrichedSighting {
    EnrichedSighting::new(sighting)
}

pub fn with_airline(sighting: Sighting, airline: &str) -> EnrichedSighting {
    EnrichedSighting {
        sighting,
        aircraft: None,
        route: Some(RouteMetadata {
            airline_name: Some(airline.to_string()),
            ..Default::default()
        }),
    }
}

pub fn with_owner(sighting: Sighting, owner: &str) -> EnrichedSighting {
    EnrichedSighting {
        sighting,
        aircraft: Some(AircraftMetadata {
            owner: Some(owner.to_string()),
            ..Default::default()
        }),
        route: None,
    }
}
