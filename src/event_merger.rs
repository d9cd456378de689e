//! Merge-or-create decision for incoming sightings.
//!
//! A sighting either extends the open event for its key or starts a new
//! one. The decision itself ([`plan_merge`]) is pure; [`EventMerger`] runs
//! it inside a single write transaction against the event store so the
//! lookup of the open row and the write that follows are atomic.

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info};

use crate::classification::{Label, classify, reclassify};
use crate::events::{Event, EventFields, EventKey};
use crate::events_repo::EventsRepository;
use crate::sightings::{EnrichedSighting, non_empty};

/// Default gap separating two legs of the same event
pub const DEFAULT_WINDOW_MINUTES: i64 = 20;

/// What happened to the event store for one sighting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeKind {
    /// No open event for the key (or a degenerate key): a new row was inserted
    Created,
    /// Gap since `last_seen` was at least the window: `times_seen` incremented
    NewLeg,
    /// Gap was under the window: telemetry and label refreshed only
    Continued,
}

impl MergeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MergeKind::Created => "created",
            MergeKind::NewLeg => "new_leg",
            MergeKind::Continued => "continued",
        }
    }
}

/// The write to perform for one sighting
#[derive(Debug, Clone, PartialEq)]
pub enum MergePlan {
    Insert(EventFields),
    Update {
        id: i32,
        kind: MergeKind,
        fields: EventFields,
    },
}

impl MergePlan {
    pub fn kind(&self) -> MergeKind {
        match self {
            MergePlan::Insert(_) => MergeKind::Created,
            MergePlan::Update { kind, .. } => *kind,
        }
    }

    pub fn fields(&self) -> &EventFields {
        match self {
            MergePlan::Insert(fields) => fields,
            MergePlan::Update { fields, .. } => fields,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeOutcome {
    pub event_id: i32,
    pub kind: MergeKind,
    pub classification: Label,
}

fn owned(value: Option<&str>) -> Option<String> {
    value.map(str::to_string)
}

/// Keep the stored value unless it is empty; otherwise take the incoming one.
/// Empty strings and absence both count as "no value yet".
fn sticky(stored: &Option<String>, incoming: Option<&str>) -> Option<String> {
    match non_empty(stored.as_deref()) {
        Some(_) => stored.clone(),
        None => owned(non_empty(incoming)),
    }
}

/// Fill every enrichment field of `fields` that is still empty from the sighting
fn apply_sticky_enrichment(fields: &mut EventFields, sighting: &EnrichedSighting) {
    let aircraft = sighting.aircraft.as_ref();
    let route = sighting.route.as_ref();

    fields.type_code = sticky(&fields.type_code, sighting.type_code());
    fields.model = sticky(&fields.model, aircraft.and_then(|a| a.model.as_deref()));
    fields.manufacturer = sticky(
        &fields.manufacturer,
        aircraft.and_then(|a| a.manufacturer.as_deref()),
    );
    fields.country = sticky(&fields.country, aircraft.and_then(|a| a.country.as_deref()));
    fields.country_iso = sticky(
        &fields.country_iso,
        aircraft.and_then(|a| a.country_iso.as_deref()),
    );
    fields.owner = sticky(&fields.owner, aircraft.and_then(|a| a.owner.as_deref()));
    fields.airline_name = sticky(
        &fields.airline_name,
        route.and_then(|r| r.airline_name.as_deref()),
    );
    fields.origin_iata = sticky(
        &fields.origin_iata,
        route.and_then(|r| r.origin_iata.as_deref()),
    );
    fields.origin_name = sticky(
        &fields.origin_name,
        route.and_then(|r| r.origin_name.as_deref()),
    );
    fields.dest_iata = sticky(&fields.dest_iata, route.and_then(|r| r.dest_iata.as_deref()));
    fields.dest_name = sticky(&fields.dest_name, route.and_then(|r| r.dest_name.as_deref()));
}

/// Overwrite raw telemetry unconditionally, including with absent values
fn apply_telemetry(fields: &mut EventFields, sighting: &EnrichedSighting, now: DateTime<Utc>) {
    let raw = &sighting.sighting;
    fields.altitude = raw.altitude;
    fields.ground_speed_kt = raw.ground_speed_kt;
    fields.distance_nm = raw.distance_nm;
    fields.heading_deg = raw.heading_deg;
    fields.last_seen = now;
    fields.seen_at = now;
}

/// Build the row for a sighting that starts a new event
pub fn new_event_fields(key: &EventKey, sighting: &EnrichedSighting, now: DateTime<Utc>) -> EventFields {
    let raw = &sighting.sighting;
    let aircraft = sighting.aircraft.as_ref();
    let route = sighting.route.as_ref();

    let mut fields = EventFields {
        event_key: key.as_str().to_string(),
        hex: owned(non_empty(raw.hex.as_deref())),
        registration: owned(non_empty(raw.registration.as_deref())),
        callsign: owned(non_empty(raw.callsign.as_deref())),
        type_code: owned(sighting.type_code()),
        model: owned(aircraft.and_then(|a| non_empty(a.model.as_deref()))),
        manufacturer: owned(aircraft.and_then(|a| non_empty(a.manufacturer.as_deref()))),
        country: owned(aircraft.and_then(|a| non_empty(a.country.as_deref()))),
        country_iso: owned(aircraft.and_then(|a| non_empty(a.country_iso.as_deref()))),
        owner: owned(aircraft.and_then(|a| non_empty(a.owner.as_deref()))),
        airline_name: owned(route.and_then(|r| non_empty(r.airline_name.as_deref()))),
        origin_iata: owned(route.and_then(|r| non_empty(r.origin_iata.as_deref()))),
        origin_name: owned(route.and_then(|r| non_empty(r.origin_name.as_deref()))),
        dest_iata: owned(route.and_then(|r| non_empty(r.dest_iata.as_deref()))),
        dest_name: owned(route.and_then(|r| non_empty(r.dest_name.as_deref()))),
        altitude: raw.altitude,
        ground_speed_kt: raw.ground_speed_kt,
        distance_nm: raw.distance_nm,
        heading_deg: raw.heading_deg,
        first_seen: now,
        last_seen: now,
        seen_at: now,
        times_seen: 1,
        classification: None,
    };
    fields.classification = Some(classify(&fields.classification_input()));
    fields
}

/// Decide how a sighting changes the store.
///
/// `existing` must be the most recently updated row for the sighting's key,
/// or `None` when there is none or the key is degenerate.
///
/// - no existing row: insert with `times_seen = 1`
/// - `now - last_seen >= window`: new leg. `times_seen + 1`, telemetry
///   overwritten, each enrichment field filled only if still empty
/// - otherwise: continuation. Telemetry and timestamps only
///
/// The label is always recomputed from the merged record. For a continuation
/// the incoming enrichment is folded into the view being classified (with
/// the same sticky rule) but not persisted, so enrichment that arrives
/// mid-window can still upgrade an `unknown` label. A recomputed `unknown`
/// never replaces a settled label.
pub fn plan_merge(
    existing: Option<&Event>,
    key: &EventKey,
    sighting: &EnrichedSighting,
    now: DateTime<Utc>,
    window: Duration,
) -> MergePlan {
    let Some(existing) = existing else {
        return MergePlan::Insert(new_event_fields(key, sighting, now));
    };

    let gap = now - existing.fields.last_seen;
    let stored_label = existing.fields.classification;
    let mut fields = existing.fields.clone();
    apply_telemetry(&mut fields, sighting, now);

    if gap >= window {
        fields.times_seen += 1;
        apply_sticky_enrichment(&mut fields, sighting);
        fields.classification = Some(reclassify(stored_label, &fields.classification_input()));

        MergePlan::Update {
            id: existing.id,
            kind: MergeKind::NewLeg,
            fields,
        }
    } else {
        let mut view = fields.clone();
        apply_sticky_enrichment(&mut view, sighting);
        fields.classification = Some(reclassify(stored_label, &view.classification_input()));

        MergePlan::Update {
            id: existing.id,
            kind: MergeKind::Continued,
            fields,
        }
    }
}

/// Folds enriched sightings into the event store
#[derive(Clone)]
pub struct EventMerger {
    repo: EventsRepository,
    window: Duration,
}

impl EventMerger {
    pub fn new(repo: EventsRepository, window: Duration) -> Self {
        Self { repo, window }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Insert or update exactly one event row for this sighting and return
    /// its identity. Store failures (for example lock contention) are
    /// returned to the caller.
    pub async fn merge_or_create(
        &self,
        sighting: &EnrichedSighting,
        now: DateTime<Utc>,
    ) -> Result<MergeOutcome> {
        let raw = &sighting.sighting;
        let key = EventKey::new(
            raw.hex.as_deref(),
            raw.registration.as_deref(),
            raw.callsign.as_deref(),
        );
        let window = self.window;
        let planned_sighting = sighting.clone();
        let planned_key = key.clone();

        let outcome = self
            .repo
            .merge_with(key.clone(), move |existing| {
                plan_merge(existing.as_ref(), &planned_key, &planned_sighting, now, window)
            })
            .await?;

        match outcome.kind {
            MergeKind::Created => info!(
                event_id = outcome.event_id,
                event_key = %key,
                classification = %outcome.classification,
                "Created event"
            ),
            MergeKind::NewLeg => info!(
                event_id = outcome.event_id,
                event_key = %key,
                classification = %outcome.classification,
                "New leg for event"
            ),
            MergeKind::Continued => debug!(
                event_id = outcome.event_id,
                event_key = %key,
                "Continued event"
            ),
        }
        metrics::counter!(format!("merge.{}", outcome.kind.as_str())).increment(1);

        Ok(outcome)
    }
}
