use anyhow::Result;
use chrono::{DateTime, NaiveDateTime, Utc};
use diesel::prelude::*;
use diesel::upsert::excluded;
use serde::{Deserialize, Serialize};

use crate::db::SqlitePool;

/// Registry data for one airframe, keyed by registration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AircraftMetadata {
    pub type_code: Option<String>,
    pub model: Option<String>,
    pub manufacturer: Option<String>,
    pub owner: Option<String>,
    pub country: Option<String>,
    pub country_iso: Option<String>,
}

/// Airline and route data for one callsign
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RouteMetadata {
    pub airline_name: Option<String>,
    pub origin_iata: Option<String>,
    pub origin_name: Option<String>,
    pub dest_iata: Option<String>,
    pub dest_name: Option<String>,
}

/// A cache entry together with when it was written
#[derive(Debug, Clone, PartialEq)]
pub struct Cached<T> {
    pub value: T,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = crate::schema::aircraft_cache)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct AircraftCacheModel {
    pub registration: String,
    pub type_code: Option<String>,
    pub model: Option<String>,
    pub manufacturer: Option<String>,
    pub owner: Option<String>,
    pub country: Option<String>,
    pub country_iso: Option<String>,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = crate::schema::callsign_cache)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct CallsignCacheModel {
    pub callsign: String,
    pub airline_name: Option<String>,
    pub origin_iata: Option<String>,
    pub origin_name: Option<String>,
    pub dest_iata: Option<String>,
    pub dest_name: Option<String>,
    pub updated_at: NaiveDateTime,
}

impl From<AircraftCacheModel> for Cached<AircraftMetadata> {
    fn from(model: AircraftCacheModel) -> Self {
        Self {
            value: AircraftMetadata {
                type_code: model.type_code,
                model: model.model,
                manufacturer: model.manufacturer,
                owner: model.owner,
                country: model.country,
                country_iso: model.country_iso,
            },
            updated_at: model.updated_at.and_utc(),
        }
    }
}

impl From<CallsignCacheModel> for Cached<RouteMetadata> {
    fn from(model: CallsignCacheModel) -> Self {
        Self {
            value: RouteMetadata {
                airline_name: model.airline_name,
                origin_iata: model.origin_iata,
                origin_name: model.origin_name,
                dest_iata: model.dest_iata,
                dest_name: model.dest_name,
            },
            updated_at: model.updated_at.and_utc(),
        }
    }
}

/// Registration → aircraft and callsign → route lookups. Entries never
/// expire; the newest upsert for a key wins.
#[derive(Clone)]
pub struct ReferenceCacheRepository {
    pool: SqlitePool,
}

impl ReferenceCacheRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Look up cached aircraft metadata by registration
    pub async fn lookup_aircraft(&self, registration: &str) -> Result<Option<Cached<AircraftMetadata>>> {
        use crate::schema::aircraft_cache::dsl;

        let key = registration.trim().to_string();
        if key.is_empty() {
            return Ok(None);
        }
        let pool = self.pool.clone();

        let model = tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;

            let model = dsl::aircraft_cache
                .filter(dsl::registration.eq(&key))
                .select(AircraftCacheModel::as_select())
                .first(&mut conn)
                .optional()?;

            Ok::<Option<AircraftCacheModel>, anyhow::Error>(model)
        })
        .await??;

        Ok(model.map(Into::into))
    }

    /// Insert or replace the aircraft metadata for a registration
    pub async fn upsert_aircraft(
        &self,
        registration: &str,
        metadata: &AircraftMetadata,
        updated_at: DateTime<Utc>,
    ) -> Result<()> {
        use crate::schema::aircraft_cache::dsl;

        let key = registration.trim().to_string();
        if key.is_empty() {
            return Ok(());
        }

        let model = AircraftCacheModel {
            registration: key,
            type_code: metadata.type_code.clone(),
            model: metadata.model.clone(),
            manufacturer: metadata.manufacturer.clone(),
            owner: metadata.owner.clone(),
            country: metadata.country.clone(),
            country_iso: metadata.country_iso.clone(),
            updated_at: updated_at.naive_utc(),
        };
        let pool = self.pool.clone();

        tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;

            diesel::insert_into(dsl::aircraft_cache)
                .values(&model)
                .on_conflict(dsl::registration)
                .do_update()
                .set((
                    dsl::type_code.eq(excluded(dsl::type_code)),
                    dsl::model.eq(excluded(dsl::model)),
                    dsl::manufacturer.eq(excluded(dsl::manufacturer)),
                    dsl::owner.eq(excluded(dsl::owner)),
                    dsl::country.eq(excluded(dsl::country)),
                    dsl::country_iso.eq(excluded(dsl::country_iso)),
                    dsl::updated_at.eq(excluded(dsl::updated_at)),
                ))
                .execute(&mut conn)?;

            Ok::<(), anyhow::Error>(())
        })
        .await??;

        Ok(())
    }

    /// Look up cached route metadata by callsign
    pub async fn lookup_route(&self, callsign: &str) -> Result<Option<Cached<RouteMetadata>>> {
        use crate::schema::callsign_cache::dsl;

        let key = callsign.trim().to_string();
        if key.is_empty() {
            return Ok(None);
        }
        let pool = self.pool.clone();

        let model = tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;

            let model = dsl::callsign_cache
                .filter(dsl::callsign.eq(&key))
                .select(CallsignCacheModel::as_select())
                .first(&mut conn)
                .optional()?;

            Ok::<Option<CallsignCacheModel>, anyhow::Error>(model)
        })
        .await??;

        Ok(model.map(Into::into))
    }

    /// Insert or replace the route metadata for a callsign
    pub async fn upsert_route(
        &self,
        callsign: &str,
        metadata: &RouteMetadata,
        updated_at: DateTime<Utc>,
    ) -> Result<()> {
        use crate::schema::callsign_cache::dsl;

        let key = callsign.trim().to_string();
        if key.is_empty() {
            return Ok(());
        }

        let model = CallsignCacheModel {
            callsign: key,
            airline_name: metadata.airline_name.clone(),
            origin_iata: metadata.origin_iata.clone(),
            origin_name: metadata.origin_name.clone(),
            dest_iata: metadata.dest_iata.clone(),
            dest_name: metadata.dest_name.clone(),
            updated_at: updated_at.naive_utc(),
        };
        let pool = self.pool.clone();

        tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;

            diesel::insert_into(dsl::callsign_cache)
                .values(&model)
                .on_conflict(dsl::callsign)
                .do_update()
                .set((
                    dsl::airline_name.eq(excluded(dsl::airline_name)),
                    dsl::origin_iata.eq(excluded(dsl::origin_iata)),
                    dsl::origin_name.eq(excluded(dsl::origin_name)),
                    dsl::dest_iata.eq(excluded(dsl::dest_iata)),
                    dsl::dest_name.eq(excluded(dsl::dest_name)),
                    dsl::updated_at.eq(excluded(dsl::updated_at)),
                ))
                .execute(&mut conn)?;

            Ok::<(), anyhow::Error>(())
        })
        .await??;

        Ok(())
    }
}
