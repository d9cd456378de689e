//! overhead - logs the aircraft flying over a fixed observer.
//!
//! Sightings are polled from an ADS-B feed, enriched from a local reference
//! cache backed by a remote lookup service, merged into deduplicated flight
//! events in SQLite, and classified as commercial, private, government,
//! cargo or unknown. A small read-only HTTP API serves the log.

pub mod actions;
pub mod adsb_lol_client;
pub mod adsbdb;
pub mod adsbdb_client;
pub mod airports;
pub mod airports_repo;
pub mod classification;
pub mod config;
pub mod db;
pub mod enrichment;
pub mod event_merger;
pub mod events;
pub mod events_repo;
pub mod feed;
pub mod ingest;
pub mod instance_lock;
pub mod log_format;
pub mod metrics;
pub mod reclassify;
pub mod reference_cache;
pub mod schema;
pub mod sightings;
pub mod stats;
pub mod stats_repo;
pub mod tasks;
pub mod web;

pub use classification::{Label, classify};
pub use event_merger::{EventMerger, MergeKind, MergeOutcome};
pub use events::{Event, EventKey};
pub use sightings::{EnrichedSighting, Sighting};
