//! Poll → enrich → merge with in-memory feed and reference source
mod common;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{TestDatabase, minutes, sighting, t0};
use overhead::classification::Label;
use overhead::enrichment::{Enricher, ReferenceSource};
use overhead::event_merger::{EventMerger, MergeKind};
use overhead::events_repo::EventsRepository;
use overhead::feed::SightingFeed;
use overhead::ingest::Ingestor;
use overhead::reference_cache::{AircraftMetadata, ReferenceCacheRepository, RouteMetadata};
use overhead::sightings::Sighting;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;

/// Replays queued poll results; an empty queue polls as "nothing in range"
struct ScriptedFeed {
    polls: Mutex<Vec<Result<Vec<Sighting>>>>,
}

impl ScriptedFeed {
    fn new(mut polls: Vec<Result<Vec<Sighting>>>) -> Self {
        polls.reverse();
        Self {
            polls: Mutex::new(polls),
        }
    }
}

#[async_trait]
impl SightingFeed for ScriptedFeed {
    async fn poll(&self, _now: DateTime<Utc>) -> Result<Vec<Sighting>> {
        self.polls.lock().await.pop().unwrap_or_else(|| Ok(Vec::new()))
    }
}

#[derive(Default)]
struct FakeSource {
    aircraft_calls: AtomicUsize,
    route_calls: AtomicUsize,
    fail: bool,
}

#[async_trait]
impl ReferenceSource for FakeSource {
    async fn fetch_aircraft(&self, registration: &str) -> Result<Option<AircraftMetadata>> {
        self.aircraft_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(anyhow!("lookup service unavailable"));
        }
        Ok((registration == "N123AB").then(|| AircraftMetadata {
            type_code: Some("A321".to_string()),
            model: Some("A321-211".to_string()),
            manufacturer: Some("Airbus".to_string()),
            owner: Some("Delta Air Lines Inc".to_string()),
            country: Some("United States".to_string()),
            country_iso: Some("US".to_string()),
        }))
    }

    async fn fetch_route(&self, callsign: &str) -> Result<Option<RouteMetadata>> {
        self.route_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(anyhow!("lookup service unavailable"));
        }
        Ok((callsign == "DAL123").then(|| RouteMetadata {
            airline_name: Some("Delta Air Lines".to_string()),
            origin_iata: Some("DTW".to_string()),
            origin_name: Some("Detroit Metropolitan Wayne County Airport".to_string()),
            dest_iata: Some("ATL".to_string()),
            dest_name: Some("Hartsfield-Jackson Atlanta International Airport".to_string()),
        }))
    }
}

fn ingestor(test_db: &TestDatabase, feed: ScriptedFeed, source: Arc<FakeSource>) -> Ingestor {
    let enricher = Enricher::new(
        ReferenceCacheRepository::new(test_db.pool()),
        source,
        Duration::from_secs(2),
    );
    let merger = EventMerger::new(EventsRepository::new(test_db.pool()), minutes(20));
    Ingestor::new(Arc::new(feed), enricher, merger)
}

#[tokio::test]
async fn test_ingest_enriches_caches_and_merges() {
    let test_db = TestDatabase::new().expect("Failed to create test database");
    let source = Arc::new(FakeSource::default());
    let feed = ScriptedFeed::new(vec![
        Ok(vec![sighting("A1B2", "N123AB", "DAL123", t0())]),
        Ok(vec![sighting("A1B2", "N123AB", "DAL123", t0() + minutes(1))]),
    ]);
    let ingestor = ingestor(&test_db, feed, source.clone());

    let first = ingestor.ingest_once().await.unwrap();
    assert_eq!(first.sightings, 1);
    assert_eq!(first.failed, 0);
    assert_eq!(first.merged[0].kind, MergeKind::Created);
    assert_eq!(first.merged[0].classification, Label::Commercial);

    let second = ingestor.ingest_once().await.unwrap();
    assert_eq!(second.merged[0].kind, MergeKind::Continued);
    assert_eq!(second.merged[0].event_id, first.merged[0].event_id);

    // Second cycle was served from the cache
    assert_eq!(source.aircraft_calls.load(Ordering::SeqCst), 1);
    assert_eq!(source.route_calls.load(Ordering::SeqCst), 1);

    let cache = ReferenceCacheRepository::new(test_db.pool());
    let aircraft = cache.lookup_aircraft("N123AB").await.unwrap().unwrap();
    assert_eq!(aircraft.value.manufacturer.as_deref(), Some("Airbus"));
    let route = cache.lookup_route("DAL123").await.unwrap().unwrap();
    assert_eq!(route.value.dest_iata.as_deref(), Some("ATL"));

    let event = EventsRepository::new(test_db.pool())
        .get_by_id(first.merged[0].event_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(event.fields.type_code.as_deref(), Some("A321"));
    assert_eq!(event.fields.origin_iata.as_deref(), Some("DTW"));
    assert_eq!(event.fields.country_iso.as_deref(), Some("US"));
}

#[tokio::test]
async fn test_cached_aircraft_does_not_suppress_route_lookup() {
    let test_db = TestDatabase::new().expect("Failed to create test database");
    let cache = ReferenceCacheRepository::new(test_db.pool());
    cache
        .upsert_aircraft(
            "N123AB",
            &AircraftMetadata {
                owner: Some("Delta Air Lines Inc".to_string()),
                ..Default::default()
            },
            t0(),
        )
        .await
        .unwrap();

    let source = Arc::new(FakeSource::default());
    let feed = ScriptedFeed::new(vec![Ok(vec![sighting("A1B2", "N123AB", "DAL123", t0())])]);
    let ingestor = ingestor(&test_db, feed, source.clone());

    ingestor.ingest_once().await.unwrap();

    assert_eq!(source.aircraft_calls.load(Ordering::SeqCst), 0);
    assert_eq!(source.route_calls.load(Ordering::SeqCst), 1);
    assert!(cache.lookup_route("DAL123").await.unwrap().is_some());
}

#[tokio::test]
async fn test_lookup_failures_still_record_the_sighting() {
    let test_db = TestDatabase::new().expect("Failed to create test database");
    let source = Arc::new(FakeSource {
        fail: true,
        ..Default::default()
    });
    let feed = ScriptedFeed::new(vec![Ok(vec![sighting("A1B2", "N123AB", "DAL123", t0())])]);
    let ingestor = ingestor(&test_db, feed, source);

    let report = ingestor.ingest_once().await.unwrap();
    assert_eq!(report.merged.len(), 1);
    assert_eq!(report.merged[0].classification, Label::Unknown);

    // Failures are not cached
    let cache = ReferenceCacheRepository::new(test_db.pool());
    assert!(cache.lookup_aircraft("N123AB").await.unwrap().is_none());
}

#[tokio::test]
async fn test_not_found_is_not_cached() {
    let test_db = TestDatabase::new().expect("Failed to create test database");
    let source = Arc::new(FakeSource::default());
    let feed = ScriptedFeed::new(vec![
        Ok(vec![sighting("C0C0C0", "N999ZZ", "ZZZ999", t0())]),
        Ok(vec![sighting("C0C0C0", "N999ZZ", "ZZZ999", t0() + minutes(1))]),
    ]);
    let ingestor = ingestor(&test_db, feed, source.clone());

    ingestor.ingest_once().await.unwrap();
    ingestor.ingest_once().await.unwrap();

    assert_eq!(source.aircraft_calls.load(Ordering::SeqCst), 2);
    assert_eq!(source.route_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_poll_failure_fails_the_cycle_only() {
    let test_db = TestDatabase::new().expect("Failed to create test database");
    let source = Arc::new(FakeSource::default());
    let feed = ScriptedFeed::new(vec![
        Err(anyhow!("connection reset")),
        Ok(vec![sighting("A1B2", "N123AB", "DAL123", t0())]),
    ]);
    let ingestor = ingestor(&test_db, feed, source);

    assert!(ingestor.ingest_once().await.is_err());

    let report = ingestor.ingest_once().await.unwrap();
    assert_eq!(report.merged.len(), 1);

    let empty = ingestor.ingest_once().await.unwrap();
    assert_eq!(empty.sightings, 0);
    assert!(empty.merged.is_empty());
}
