mod common;

use anyhow::Result;
use async_trait::async_trait;
use common::{TestDatabase, minutes, sighting, t0};
use overhead::enrichment::{Enricher, ReferenceSource};
use overhead::reference_cache::{AircraftMetadata, ReferenceCacheRepository, RouteMetadata};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn test_aircraft_upsert_last_write_wins() {
    let test_db = TestDatabase::new().expect("Failed to create test database");
    let cache = ReferenceCacheRepository::new(test_db.pool());

    assert!(cache.lookup_aircraft("N123AB").await.unwrap().is_none());

    let first = AircraftMetadata {
        type_code: Some("A320".to_string()),
        owner: Some("Old Owner Inc".to_string()),
        ..Default::default()
    };
    cache.upsert_aircraft("N123AB", &first, t0()).await.unwrap();

    let second = AircraftMetadata {
        type_code: Some("A321".to_string()),
        owner: Some("Delta Air Lines Inc".to_string()),
        ..Default::default()
    };
    cache
        .upsert_aircraft("N123AB", &second, t0() + minutes(5))
        .await
        .unwrap();

    let cached = cache.lookup_aircraft("N123AB").await.unwrap().unwrap();
    assert_eq!(cached.value, second);
    assert_eq!(cached.updated_at, t0() + minutes(5));
}

#[tokio::test]
async fn test_route_lookup_trims_and_ignores_empty_keys() {
    let test_db = TestDatabase::new().expect("Failed to create test database");
    let cache = ReferenceCacheRepository::new(test_db.pool());

    let route = RouteMetadata {
        airline_name: Some("Southwest Airlines".to_string()),
        origin_iata: Some("MDW".to_string()),
        dest_iata: Some("DTW".to_string()),
        ..Default::default()
    };
    cache.upsert_route("SWA42  ", &route, t0()).await.unwrap();
    cache.upsert_route("   ", &route, t0()).await.unwrap();

    let cached = cache.lookup_route("SWA42").await.unwrap().unwrap();
    assert_eq!(cached.value, route);
    assert!(cache.lookup_route("").await.unwrap().is_none());
}

/// A source that never answers in time
struct StalledSource;

#[async_trait]
impl ReferenceSource for StalledSource {
    async fn fetch_aircraft(&self, _registration: &str) -> Result<Option<AircraftMetadata>> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(Some(AircraftMetadata::default()))
    }

    async fn fetch_route(&self, _callsign: &str) -> Result<Option<RouteMetadata>> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(Some(RouteMetadata::default()))
    }
}

#[tokio::test]
async fn test_stalled_lookup_times_out_to_no_enrichment() {
    let test_db = TestDatabase::new().expect("Failed to create test database");
    let enricher = Enricher::new(
        ReferenceCacheRepository::new(test_db.pool()),
        Arc::new(StalledSource),
        Duration::from_millis(50),
    );

    let enriched = enricher
        .enrich(sighting("A1B2", "N123AB", "DAL123", t0()))
        .await;

    assert!(enriched.aircraft.is_none());
    assert!(enriched.route.is_none());
    assert_eq!(enriched.sighting.registration.as_deref(), Some("N123AB"));
}
