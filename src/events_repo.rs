use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use diesel::prelude::*;
use diesel::sql_types::{Integer, Timestamp};
use diesel::sqlite::Sqlite;

use crate::classification::{Label, reclassify};
use crate::db::SqlitePool;
use crate::event_merger::{MergeOutcome, MergePlan};
use crate::events::{Event, EventKey, EventModel, EventRecordModel};

/// Labels that are never reclassification candidates. `unknown` is left out
/// on purpose so that late enrichment can still upgrade those rows.
const SETTLED_LABELS: [&str; 4] = ["commercial", "private", "government", "cargo"];

/// Bounded lookback for time-proximity searches
pub const SEARCH_WINDOW_DAYS: i64 = 7;

/// Which rows a reclassification batch looks at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepScope {
    /// NULL, empty, `unknown`, or out-of-set labels only
    Candidates,
    /// Every row, used after rule changes
    All,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReclassifyBatch {
    pub scanned: usize,
    pub updated: usize,
    /// Highest id scanned in this batch, `None` when nothing was scanned
    pub last_id: Option<i32>,
}

#[derive(Clone)]
pub struct EventsRepository {
    pool: SqlitePool,
}

impl EventsRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Look up the open event for `key`, let `plan` decide the write, and
    /// apply it, all inside one `BEGIN IMMEDIATE` transaction.
    ///
    /// Degenerate keys skip the lookup so `plan` always sees `None`.
    pub async fn merge_with<F>(&self, key: EventKey, plan: F) -> Result<MergeOutcome>
    where
        F: FnOnce(Option<Event>) -> MergePlan + Send + 'static,
    {
        use crate::schema::events::dsl;

        let pool = self.pool.clone();

        tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;

            conn.immediate_transaction::<_, anyhow::Error, _>(|conn| {
                let existing = if key.is_degenerate() {
                    None
                } else {
                    dsl::events
                        .filter(dsl::event_key.eq(key.as_str()))
                        .order((dsl::last_seen.desc(), dsl::id.desc()))
                        .select(EventModel::as_select())
                        .first(conn)
                        .optional()?
                        .map(Event::from)
                };

                let plan = plan(existing);
                let kind = plan.kind();
                let classification = plan.fields().classification.unwrap_or(Label::Unknown);
                let record = EventRecordModel::from(plan.fields());

                let event_id = match plan {
                    MergePlan::Insert(_) => diesel::insert_into(dsl::events)
                        .values(&record)
                        .returning(dsl::id)
                        .get_result::<i32>(conn)?,
                    MergePlan::Update { id, .. } => {
                        diesel::update(dsl::events.find(id))
                            .set(&record)
                            .execute(conn)?;
                        id
                    }
                };

                Ok(MergeOutcome {
                    event_id,
                    kind,
                    classification,
                })
            })
        })
        .await?
    }

    /// Get an event by its id
    pub async fn get_by_id(&self, event_id: i32) -> Result<Option<Event>> {
        use crate::schema::events::dsl;

        let pool = self.pool.clone();

        let model = tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;

            let model = dsl::events
                .find(event_id)
                .select(EventModel::as_select())
                .first(&mut conn)
                .optional()?;

            Ok::<Option<EventModel>, anyhow::Error>(model)
        })
        .await??;

        Ok(model.map(Event::from))
    }

    /// All rows for one key, newest first
    pub async fn find_by_key(&self, key: &EventKey) -> Result<Vec<Event>> {
        use crate::schema::events::dsl;

        let pool = self.pool.clone();
        let key = key.as_str().to_string();

        let models = tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;

            let models = dsl::events
                .filter(dsl::event_key.eq(&key))
                .order((dsl::last_seen.desc(), dsl::id.desc()))
                .select(EventModel::as_select())
                .load(&mut conn)?;

            Ok::<Vec<EventModel>, anyhow::Error>(models)
        })
        .await??;

        Ok(models.into_iter().map(Event::from).collect())
    }

    /// Page of events ordered by `last_seen` descending
    pub async fn list(&self, limit: i64, offset: i64) -> Result<Vec<Event>> {
        use crate::schema::events::dsl;

        let pool = self.pool.clone();

        let models = tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;

            let models = dsl::events
                .order((dsl::last_seen.desc(), dsl::id.desc()))
                .limit(limit)
                .offset(offset)
                .select(EventModel::as_select())
                .load(&mut conn)?;

            Ok::<Vec<EventModel>, anyhow::Error>(models)
        })
        .await??;

        Ok(models.into_iter().map(Event::from).collect())
    }

    /// The `limit` events whose `last_seen` is closest to `target`, looking
    /// no further than [`SEARCH_WINDOW_DAYS`] either side
    pub async fn search_by_time(&self, target: DateTime<Utc>, limit: i64) -> Result<Vec<Event>> {
        let pool = self.pool.clone();
        let target = target.naive_utc();
        let window = Duration::days(SEARCH_WINDOW_DAYS);
        let (start, end) = (target - window, target + window);
        let limit = i32::try_from(limit).unwrap_or(i32::MAX);

        let models = tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;

            let models = diesel::sql_query(
                "SELECT * FROM events
                 WHERE last_seen >= ? AND last_seen <= ?
                 ORDER BY ABS(julianday(last_seen) - julianday(?)) ASC, id DESC
                 LIMIT ?",
            )
            .bind::<Timestamp, _>(start)
            .bind::<Timestamp, _>(end)
            .bind::<Timestamp, _>(target)
            .bind::<Integer, _>(limit)
            .load::<EventModel>(&mut conn)?;

            Ok::<Vec<EventModel>, anyhow::Error>(models)
        })
        .await??;

        Ok(models.into_iter().map(Event::from).collect())
    }

    pub async fn count(&self) -> Result<i64> {
        use crate::schema::events::dsl;

        let pool = self.pool.clone();

        tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;
            let total = dsl::events.count().get_result::<i64>(&mut conn)?;
            Ok::<i64, anyhow::Error>(total)
        })
        .await?
    }

    /// Recompute labels for up to `batch_size` rows with `id > after_id`,
    /// in id order, inside one transaction.
    ///
    /// Only the `classification` column is written, and only when the
    /// recomputed label differs from the stored text.
    pub async fn reclassify_batch(
        &self,
        after_id: i32,
        batch_size: i64,
        scope: SweepScope,
    ) -> Result<ReclassifyBatch> {
        use crate::schema::events::dsl;

        let pool = self.pool.clone();

        tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;

            conn.immediate_transaction::<_, anyhow::Error, _>(|conn| {
                let mut query = dsl::events
                    .filter(dsl::id.gt(after_id))
                    .order(dsl::id.asc())
                    .limit(batch_size)
                    .select(EventModel::as_select())
                    .into_boxed::<Sqlite>();

                if scope == SweepScope::Candidates {
                    query = query.filter(
                        dsl::classification
                            .is_null()
                            .or(dsl::classification.ne_all(SETTLED_LABELS)),
                    );
                }

                let models: Vec<EventModel> = query.load(conn)?;
                let mut batch = ReclassifyBatch {
                    scanned: models.len(),
                    updated: 0,
                    last_id: models.last().map(|m| m.id),
                };

                for model in models {
                    let stored = model.classification.clone();
                    let event = Event::from(model);
                    let label = reclassify(
                        event.fields.classification,
                        &event.fields.classification_input(),
                    );

                    if stored.as_deref() != Some(label.as_str()) {
                        diesel::update(dsl::events.find(event.id))
                            .set(dsl::classification.eq(Some(label.as_str())))
                            .execute(conn)?;
                        batch.updated += 1;
                    }
                }

                Ok(batch)
            })
        })
        .await?
    }
}
