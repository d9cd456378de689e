//! HTTP handlers exercised in-process through the router
mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::Utc;
use common::{TestDatabase, bare, minutes, sighting, t0, with_airline, with_owner};
use http_body_util::BodyExt;
use overhead::airports::Airport;
use overhead::airports_repo::AirportsRepository;
use overhead::event_merger::EventMerger;
use overhead::events_repo::EventsRepository;
use overhead::sightings::Altitude;
use overhead::tasks::TaskRegistry;
use overhead::web::{AppState, router};
use serde_json::Value;
use tower::ServiceExt;

async fn get_json(test_db: &TestDatabase, uri: &str) -> (StatusCode, Value) {
    let app = router(AppState {
        pool: test_db.pool(),
        tasks: TaskRegistry::new(),
    });

    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

/// Three events an hour apart, the middle one a Delta flight DTW → ATL
async fn seed(test_db: &TestDatabase) -> Vec<i32> {
    let merger = EventMerger::new(EventsRepository::new(test_db.pool()), minutes(20));
    let mut delta = with_airline(sighting("A1B2", "N123AB", "DAL123", t0()), "Delta Air Lines");
    if let Some(route) = delta.route.as_mut() {
        route.origin_iata = Some("DTW".to_string());
        route.dest_iata = Some("ATL".to_string());
    }

    let mut ids = Vec::new();
    for (offset, enriched) in [
        (0, bare(sighting("AAAAAA", "N1", "", t0() - minutes(60)))),
        (60, delta),
        (120, bare(sighting("CCCCCC", "N3", "", t0() + minutes(60)))),
    ] {
        let at = t0() - minutes(60) + minutes(offset);
        ids.push(merger.merge_or_create(&enriched, at).await.unwrap().event_id);
    }
    ids
}

#[tokio::test]
async fn test_list_flights_newest_first() {
    let test_db = TestDatabase::new().expect("Failed to create test database");
    let ids = seed(&test_db).await;

    let (status, body) = get_json(&test_db, "/api/flights").await;
    assert_eq!(status, StatusCode::OK);
    let flights = body.as_array().unwrap();
    assert_eq!(flights.len(), 3);
    assert_eq!(flights[0]["id"], ids[2]);
    assert_eq!(flights[2]["id"], ids[0]);

    let (_, body) = get_json(&test_db, "/api/flights?limit=1&offset=1").await;
    let flights = body.as_array().unwrap();
    assert_eq!(flights.len(), 1);
    assert_eq!(flights[0]["id"], ids[1]);
    assert_eq!(flights[0]["classification"], "commercial");
}

#[tokio::test]
async fn test_get_flight_by_id() {
    let test_db = TestDatabase::new().expect("Failed to create test database");
    let ids = seed(&test_db).await;

    let (status, body) = get_json(&test_db, &format!("/api/flights/{}", ids[1])).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["callsign"], "DAL123");
    assert_eq!(body["airline_name"], "Delta Air Lines");
    assert_eq!(body["times_seen"], 1);

    let (status, body) = get_json(&test_db, "/api/flights/99999").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["errors"], "Flight not found");
}

#[tokio::test]
async fn test_search_by_time_orders_by_distance() {
    let test_db = TestDatabase::new().expect("Failed to create test database");
    let ids = seed(&test_db).await;

    let uri = "/api/flights/search-by-time?datetime=2025-06-01T14:50:00Z&limit=2";
    let (status, body) = get_json(&test_db, uri).await;
    assert_eq!(status, StatusCode::OK);
    let flights = body.as_array().unwrap();
    assert_eq!(flights.len(), 2);
    assert_eq!(flights[0]["id"], ids[2]);
    assert_eq!(flights[0]["time_diff_seconds"], 600);
    assert_eq!(flights[1]["id"], ids[1]);

    // Naive input is taken as UTC
    let uri = "/api/flights/search-by-time?datetime=2025-06-01T14:00";
    let (_, body) = get_json(&test_db, uri).await;
    assert_eq!(body.as_array().unwrap()[0]["id"], ids[1]);

    // Nothing within a week of the target
    let uri = "/api/flights/search-by-time?datetime=2025-07-01T00:00:00Z";
    let (_, body) = get_json(&test_db, uri).await;
    assert!(body.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_search_by_time_rejects_bad_input() {
    let test_db = TestDatabase::new().expect("Failed to create test database");

    let (status, body) = get_json(&test_db, "/api/flights/search-by-time").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"], "datetime parameter is required");

    let (status, _) = get_json(&test_db, "/api/flights/search-by-time?datetime=noon").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_stats_endpoints() {
    let test_db = TestDatabase::new().expect("Failed to create test database");
    seed(&test_db).await;
    AirportsRepository::new(test_db.pool())
        .replace_all(vec![Airport {
            iata_code: "DTW".to_string(),
            name: "Detroit Metropolitan Wayne County Airport".to_string(),
            city: Some("Detroit".to_string()),
            country: Some("United States".to_string()),
            latitude: 42.21,
            longitude: -83.35,
        }])
        .await
        .unwrap();

    let (status, body) = get_json(&test_db, "/api/stats/summary").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_events"], 3);
    assert_eq!(body["total_sightings"], 3);
    assert_eq!(body["unique_aircraft"], 3);
    assert_eq!(body["by_classification"]["commercial"], 1);
    assert_eq!(body["by_classification"]["unknown"], 2);
    assert_eq!(body["by_classification"]["cargo"], 0);

    let (_, body) = get_json(&test_db, "/api/stats/classification").await;
    assert_eq!(body.as_array().unwrap().len(), 5);

    let (_, body) = get_json(&test_db, "/api/stats/hourly").await;
    let hours = body.as_array().unwrap();
    assert_eq!(hours.len(), 24);
    assert_eq!(hours[13]["count"], 1);
    assert_eq!(hours[14]["count"], 1);
    assert_eq!(hours[15]["count"], 1);

    let (_, body) = get_json(&test_db, "/api/stats/routes").await;
    let routes = body.as_array().unwrap();
    assert_eq!(routes.len(), 1);
    assert_eq!(routes[0]["origin"]["iata_code"], "DTW");
    assert_eq!(routes[0]["origin"]["latitude"], 42.21);
    assert_eq!(routes[0]["destination"]["iata_code"], "ATL");
    assert!(routes[0]["destination"]["latitude"].is_null());

    let (_, body) = get_json(&test_db, "/api/stats/top-operators?limit=5").await;
    assert_eq!(body[0]["operator"], "Delta Air Lines");
}

#[tokio::test]
async fn test_summary_snapshot_fields() {
    let test_db = TestDatabase::new().expect("Failed to create test database");
    let merger = EventMerger::new(EventsRepository::new(test_db.pool()), minutes(20));
    let now = Utc::now();

    let mut delta = with_airline(sighting("A1B2", "N123AB", "DAL123", now), "Delta Air Lines");
    delta.sighting.altitude = Some(Altitude::Feet(10000.0));
    let mut netjets = with_owner(sighting("A0E0E0", "N123QS", "EJA123", now), "NetJets Aviation");
    netjets.sighting.altitude = Some(Altitude::Feet(21000.0));
    if let Some(aircraft) = netjets.aircraft.as_mut() {
        aircraft.country = Some("United States".to_string());
    }
    let mut taxiing = bare(sighting("C0C0C0", "N999ZZ", "", now));
    taxiing.sighting.altitude = Some(Altitude::Ground);

    for enriched in [delta, netjets, taxiing] {
        merger.merge_or_create(&enriched, now).await.unwrap();
    }
    merger
        .merge_or_create(&bare(sighting("D0D0D0", "N1", "", t0())), t0())
        .await
        .unwrap();

    let (status, body) = get_json(&test_db, "/api/stats/summary").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_events"], 4);
    assert_eq!(body["operators"], 2);
    assert_eq!(body["countries"], 1);
    assert_eq!(body["avg_altitude"], 15500);

    let (status, body) = get_json(&test_db, "/api/stats/summary-24h").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["events_24h"], 3);
    assert_eq!(body["total_events"], 3);
    assert!(body["since"].is_string());
}

#[tokio::test]
async fn test_status_reports_version_and_tasks() {
    let test_db = TestDatabase::new().expect("Failed to create test database");

    let (status, body) = get_json(&test_db, "/api/status").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["version"].as_str().is_some_and(|v| !v.is_empty()));
    assert!(body["tasks"].as_object().unwrap().is_empty());
}
