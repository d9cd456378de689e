mod common;

use common::{TestDatabase, bare, minutes, sighting, t0, with_airline, with_owner};
use diesel::prelude::*;
use diesel::sql_types::{Integer, Nullable, Text};
use overhead::classification::Label;
use overhead::db::SqlitePool;
use overhead::event_merger::EventMerger;
use overhead::events_repo::{EventsRepository, SweepScope};
use overhead::reclassify::Reclassifier;

fn set_stored_label(pool: &SqlitePool, id: i32, label: Option<&str>) {
    let mut conn = pool.get().unwrap();
    diesel::sql_query("UPDATE events SET classification = ? WHERE id = ?")
        .bind::<Nullable<Text>, _>(label)
        .bind::<Integer, _>(id)
        .execute(&mut conn)
        .unwrap();
}

#[derive(QueryableByName)]
struct StoredLabel {
    #[diesel(sql_type = Nullable<Text>)]
    classification: Option<String>,
}

fn stored_label(pool: &SqlitePool, id: i32) -> Option<String> {
    let mut conn = pool.get().unwrap();
    diesel::sql_query("SELECT classification FROM events WHERE id = ?")
        .bind::<Integer, _>(id)
        .get_result::<StoredLabel>(&mut conn)
        .unwrap()
        .classification
}

#[tokio::test]
async fn test_sweep_is_idempotent_on_correct_labels() {
    let test_db = TestDatabase::new().expect("Failed to create test database");
    let repo = EventsRepository::new(test_db.pool());
    let merger = EventMerger::new(repo.clone(), minutes(20));

    let delta = merger
        .merge_or_create(
            &with_airline(sighting("A1B2", "N123AB", "DAL123", t0()), "Delta Air Lines"),
            t0(),
        )
        .await
        .unwrap();
    let before = repo.get_by_id(delta.event_id).await.unwrap().unwrap();

    let mut reclassifier = Reclassifier::new(repo.clone(), 250, SweepScope::All);
    assert_eq!(reclassifier.sweep_all().await.unwrap(), 0);

    let after = repo.get_by_id(delta.event_id).await.unwrap().unwrap();
    assert_eq!(after, before);
}

#[tokio::test]
async fn test_sweep_repairs_missing_and_out_of_set_labels() {
    let test_db = TestDatabase::new().expect("Failed to create test database");
    let pool = test_db.pool();
    let repo = EventsRepository::new(pool.clone());
    let merger = EventMerger::new(repo.clone(), minutes(20));

    let fedex = merger
        .merge_or_create(
            &with_airline(sighting("A0F0F0", "N850FD", "FDX850", t0()), "FedEx"),
            t0(),
        )
        .await
        .unwrap();
    let netjets = merger
        .merge_or_create(
            &with_owner(sighting("A0E0E0", "N123QS", "EJA123", t0()), "NetJets Aviation"),
            t0(),
        )
        .await
        .unwrap();
    let nothing = merger
        .merge_or_create(&bare(sighting("A0D0D0", "", "", t0())), t0())
        .await
        .unwrap();

    set_stored_label(&pool, fedex.event_id, None);
    set_stored_label(&pool, netjets.event_id, Some("bizjet"));
    set_stored_label(&pool, nothing.event_id, Some(""));

    let mut reclassifier = Reclassifier::new(repo.clone(), 250, SweepScope::Candidates);
    let batch = reclassifier.sweep_once().await.unwrap();
    assert_eq!(batch.scanned, 3);
    assert_eq!(batch.updated, 3);

    assert_eq!(stored_label(&pool, fedex.event_id).as_deref(), Some("cargo"));
    assert_eq!(stored_label(&pool, netjets.event_id).as_deref(), Some("private"));
    assert_eq!(stored_label(&pool, nothing.event_id).as_deref(), Some("unknown"));

    // Second pass: the unknown row is still a candidate but needs no write
    let batch = reclassifier.sweep_once().await.unwrap();
    assert_eq!(batch.scanned, 1);
    assert_eq!(batch.updated, 0);
}

#[tokio::test]
async fn test_sweep_only_touches_classification() {
    let test_db = TestDatabase::new().expect("Failed to create test database");
    let pool = test_db.pool();
    let repo = EventsRepository::new(pool.clone());
    let merger = EventMerger::new(repo.clone(), minutes(20));

    let outcome = merger
        .merge_or_create(
            &with_airline(sighting("A1B2", "N123AB", "DAL123", t0()), "Delta Air Lines"),
            t0(),
        )
        .await
        .unwrap();
    merger
        .merge_or_create(
            &bare(sighting("A1B2", "N123AB", "DAL123", t0() + minutes(30))),
            t0() + minutes(30),
        )
        .await
        .unwrap();
    let before = repo.get_by_id(outcome.event_id).await.unwrap().unwrap();

    set_stored_label(&pool, outcome.event_id, Some("unknown"));
    let mut reclassifier = Reclassifier::new(repo.clone(), 250, SweepScope::Candidates);
    assert_eq!(reclassifier.sweep_all().await.unwrap(), 1);

    let after = repo.get_by_id(outcome.event_id).await.unwrap().unwrap();
    assert_eq!(after.fields.classification, Some(Label::Commercial));
    assert_eq!(after.fields.times_seen, before.fields.times_seen);
    assert_eq!(after.fields.last_seen, before.fields.last_seen);
    assert_eq!(after.fields.altitude, before.fields.altitude);
}

#[tokio::test]
async fn test_cursor_advances_and_wraps() {
    let test_db = TestDatabase::new().expect("Failed to create test database");
    let repo = EventsRepository::new(test_db.pool());
    let merger = EventMerger::new(repo.clone(), minutes(20));

    // Three permanently unknown rows
    for hex in ["B00001", "B00002", "B00003"] {
        merger
            .merge_or_create(&bare(sighting(hex, "", "", t0())), t0())
            .await
            .unwrap();
    }

    let mut reclassifier = Reclassifier::new(repo, 2, SweepScope::Candidates);
    assert_eq!(reclassifier.cursor(), 0);

    let first = reclassifier.sweep_once().await.unwrap();
    assert_eq!(first.scanned, 2);
    assert_eq!(reclassifier.cursor(), first.last_id.unwrap());

    let second = reclassifier.sweep_once().await.unwrap();
    assert_eq!(second.scanned, 1);
    assert_eq!(reclassifier.cursor(), 0);

    let third = reclassifier.sweep_once().await.unwrap();
    assert_eq!(third.scanned, 2);
}

#[tokio::test]
async fn test_full_sweep_keeps_label_upgraded_mid_window() {
    let test_db = TestDatabase::new().expect("Failed to create test database");
    let pool = test_db.pool();
    let repo = EventsRepository::new(pool.clone());
    let merger = EventMerger::new(repo.clone(), minutes(20));

    let created = merger
        .merge_or_create(&bare(sighting("A0F0F1", "", "FDX1", t0())), t0())
        .await
        .unwrap();
    assert_eq!(created.classification, Label::Unknown);

    // Route lookup lands mid-window: label upgraded, airline not persisted
    let upgraded = merger
        .merge_or_create(
            &with_airline(sighting("A0F0F1", "", "FDX1", t0() + minutes(1)), "FedEx"),
            t0() + minutes(1),
        )
        .await
        .unwrap();
    assert_eq!(upgraded.event_id, created.event_id);
    assert_eq!(upgraded.classification, Label::Cargo);

    let next_bare = merger
        .merge_or_create(
            &bare(sighting("A0F0F1", "", "FDX1", t0() + minutes(2))),
            t0() + minutes(2),
        )
        .await
        .unwrap();
    assert_eq!(next_bare.classification, Label::Cargo);

    let before = repo.get_by_id(created.event_id).await.unwrap().unwrap();
    assert_eq!(before.fields.airline_name, None);

    let mut reclassifier = Reclassifier::new(repo.clone(), 250, SweepScope::All);
    assert_eq!(reclassifier.sweep_all().await.unwrap(), 0);

    assert_eq!(stored_label(&pool, created.event_id).as_deref(), Some("cargo"));
    let after = repo.get_by_id(created.event_id).await.unwrap().unwrap();
    assert_eq!(after, before);
}
