use anyhow::Result;
use diesel::prelude::*;
use std::collections::HashMap;
use tracing::info;

use crate::airports::Airport;
use crate::db::SqlitePool;

/// Rows per INSERT statement, well under SQLite's bound-parameter limit
const BATCH_SIZE: usize = 1000;

#[derive(Clone)]
pub struct AirportsRepository {
    pool: SqlitePool,
}

impl AirportsRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Replace the whole airports table in one transaction. Duplicate IATA
    /// codes keep the first row seen. Returns the number of rows inserted.
    pub async fn replace_all(&self, airports_list: Vec<Airport>) -> Result<usize> {
        use crate::schema::airports::dsl::*;

        let pool = self.pool.clone();
        let total = airports_list.len();

        let inserted = tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;

            conn.immediate_transaction::<_, anyhow::Error, _>(|conn| {
                diesel::delete(airports).execute(conn)?;

                let mut inserted = 0;
                for batch in airports_list.chunks(BATCH_SIZE) {
                    inserted += diesel::insert_or_ignore_into(airports)
                        .values(batch)
                        .execute(conn)?;
                }
                Ok(inserted)
            })
        })
        .await??;

        info!(
            "Loaded {} airports ({} duplicates skipped)",
            inserted,
            total - inserted
        );
        Ok(inserted)
    }

    pub async fn count(&self) -> Result<i64> {
        use crate::schema::airports::dsl::*;

        let pool = self.pool.clone();

        tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;
            let total = airports.count().get_result::<i64>(&mut conn)?;
            Ok::<i64, anyhow::Error>(total)
        })
        .await?
    }

    pub async fn get_by_iata(&self, code: &str) -> Result<Option<Airport>> {
        use crate::schema::airports::dsl::*;

        let pool = self.pool.clone();
        let code = code.trim().to_uppercase();

        tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;
            let airport = airports
                .filter(iata_code.eq(&code))
                .select(Airport::as_select())
                .first(&mut conn)
                .optional()?;
            Ok::<Option<Airport>, anyhow::Error>(airport)
        })
        .await?
    }

    /// Look up several IATA codes at once, keyed by code
    pub async fn get_many(&self, codes: Vec<String>) -> Result<HashMap<String, Airport>> {
        use crate::schema::airports::dsl::*;

        if codes.is_empty() {
            return Ok(HashMap::new());
        }
        let pool = self.pool.clone();

        tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;
            let found: Vec<Airport> = airports
                .filter(iata_code.eq_any(&codes))
                .select(Airport::as_select())
                .load(&mut conn)?;

            Ok::<HashMap<String, Airport>, anyhow::Error>(
                found
                    .into_iter()
                    .map(|a| (a.iata_code.clone(), a))
                    .collect(),
            )
        })
        .await?
    }
}
