use anyhow::Result;
use chrono::{DateTime, NaiveDateTime, Utc};
use diesel::prelude::*;
use diesel::sql_types::{BigInt, Double, Integer, Nullable, Text, Timestamp};
use std::collections::BTreeMap;

use crate::classification::Label;
use crate::db::SqlitePool;
use crate::stats::*;

/// Stored label folded into the label set; NULL, empty and out-of-set text
/// all count as `unknown`
const NORMALIZED_LABEL: &str = "CASE WHEN classification IN ('commercial', 'private', 'government', 'cargo') \
     THEN classification ELSE 'unknown' END";

/// Read-only aggregates over the event table
#[derive(Clone)]
pub struct StatsRepository {
    pool: SqlitePool,
}

impl StatsRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Totals over all events, or those with `last_seen >= since`
    pub async fn summary(&self, since: Option<DateTime<Utc>>) -> Result<Summary> {
        let pool = self.pool.clone();
        let since_naive = since.map(|s| s.naive_utc());

        tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;

            #[derive(QueryableByName)]
            struct Totals {
                #[diesel(sql_type = BigInt)]
                total_events: i64,
                #[diesel(sql_type = BigInt)]
                total_sightings: i64,
                #[diesel(sql_type = BigInt)]
                unique_aircraft: i64,
                #[diesel(sql_type = BigInt)]
                operators: i64,
                #[diesel(sql_type = BigInt)]
                countries: i64,
                #[diesel(sql_type = Nullable<BigInt>)]
                avg_altitude: Option<i64>,
            }

            #[derive(QueryableByName)]
            struct Row {
                #[diesel(sql_type = Text)]
                classification: String,
                #[diesel(sql_type = BigInt)]
                count: i64,
            }

            let totals = diesel::sql_query(
                "SELECT COUNT(*) AS total_events,
                        COALESCE(SUM(times_seen), 0) AS total_sightings,
                        COUNT(DISTINCT NULLIF(TRIM(hex), '')) AS unique_aircraft,
                        COUNT(DISTINCT COALESCE(NULLIF(TRIM(airline_name), ''), NULLIF(TRIM(owner), ''))) AS operators,
                        COUNT(DISTINCT NULLIF(TRIM(country), '')) AS countries,
                        CAST(ROUND(AVG(CASE WHEN on_ground = 0 THEN altitude_ft END)) AS INTEGER) AS avg_altitude
                 FROM events
                 WHERE ? IS NULL OR last_seen >= ?",
            )
            .bind::<Nullable<Timestamp>, _>(since_naive)
            .bind::<Nullable<Timestamp>, _>(since_naive)
            .get_result::<Totals>(&mut conn)?;

            let rows = diesel::sql_query(format!(
                "SELECT {} AS classification, COUNT(*) AS count
                 FROM events
                 WHERE ? IS NULL OR last_seen >= ?
                 GROUP BY 1",
                NORMALIZED_LABEL
            ))
            .bind::<Nullable<Timestamp>, _>(since_naive)
            .bind::<Nullable<Timestamp>, _>(since_naive)
            .load::<Row>(&mut conn)?;

            let mut by_classification: BTreeMap<String, i64> = Label::ALL
                .iter()
                .map(|label| (label.as_str().to_string(), 0))
                .collect();
            for row in rows {
                *by_classification.entry(row.classification).or_default() += row.count;
            }

            Ok(Summary {
                total_events: totals.total_events,
                total_sightings: totals.total_sightings,
                unique_aircraft: totals.unique_aircraft,
                operators: totals.operators,
                countries: totals.countries,
                avg_altitude: totals.avg_altitude,
                by_classification,
                since,
            })
        })
        .await?
    }

    /// Event count for every label, in label order, zeros included
    pub async fn classification_counts(&self) -> Result<Vec<LabelCount>> {
        let summary = self.summary(None).await?;

        Ok(Label::ALL
            .iter()
            .map(|label| LabelCount {
                classification: *label,
                count: summary
                    .by_classification
                    .get(label.as_str())
                    .copied()
                    .unwrap_or_default(),
            })
            .collect())
    }

    /// Events by hour of day (UTC) of `first_seen`, all 24 hours
    pub async fn hourly(&self) -> Result<Vec<HourlyCount>> {
        let pool = self.pool.clone();

        tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;

            #[derive(QueryableByName)]
            struct Row {
                #[diesel(sql_type = Integer)]
                hour: i32,
                #[diesel(sql_type = BigInt)]
                count: i64,
            }

            let rows = diesel::sql_query(
                "SELECT CAST(strftime('%H', first_seen) AS INTEGER) AS hour, COUNT(*) AS count
                 FROM events
                 GROUP BY 1",
            )
            .load::<Row>(&mut conn)?;

            let mut buckets: Vec<HourlyCount> =
                (0..24).map(|hour| HourlyCount { hour, count: 0 }).collect();
            for row in rows {
                if let Some(bucket) = usize::try_from(row.hour).ok().and_then(|h| buckets.get_mut(h)) {
                    bucket.count += row.count;
                }
            }

            Ok(buckets)
        })
        .await?
    }

    /// Most frequently logged airframes by registration
    pub async fn top_aircraft(&self, limit: i64) -> Result<Vec<TopAircraft>> {
        let pool = self.pool.clone();
        let limit = i32::try_from(limit).unwrap_or(i32::MAX);

        tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;

            #[derive(QueryableByName)]
            struct Row {
                #[diesel(sql_type = Text)]
                registration: String,
                #[diesel(sql_type = Nullable<Text>)]
                type_code: Option<String>,
                #[diesel(sql_type = Nullable<Text>)]
                model: Option<String>,
                #[diesel(sql_type = Nullable<Text>)]
                owner: Option<String>,
                #[diesel(sql_type = BigInt)]
                events: i64,
                #[diesel(sql_type = BigInt)]
                sightings: i64,
                #[diesel(sql_type = Timestamp)]
                last_seen: NaiveDateTime,
            }

            let rows = diesel::sql_query(
                "SELECT TRIM(registration) AS registration,
                        MAX(NULLIF(type_code, '')) AS type_code,
                        MAX(NULLIF(model, '')) AS model,
                        MAX(NULLIF(owner, '')) AS owner,
                        COUNT(*) AS events,
                        COALESCE(SUM(times_seen), 0) AS sightings,
                        MAX(last_seen) AS last_seen
                 FROM events
                 WHERE registration IS NOT NULL AND TRIM(registration) <> ''
                 GROUP BY 1
                 ORDER BY events DESC, sightings DESC, registration ASC
                 LIMIT ?",
            )
            .bind::<Integer, _>(limit)
            .load::<Row>(&mut conn)?;

            Ok(rows
                .into_iter()
                .map(|r| TopAircraft {
                    registration: r.registration,
                    type_code: r.type_code,
                    model: r.model,
                    owner: r.owner,
                    events: r.events,
                    sightings: r.sightings,
                    last_seen: r.last_seen.and_utc(),
                })
                .collect())
        })
        .await?
    }

    /// Most frequent operators: airline name, else registered owner
    pub async fn top_operators(&self, limit: i64) -> Result<Vec<TopOperator>> {
        let pool = self.pool.clone();
        let limit = i32::try_from(limit).unwrap_or(i32::MAX);

        tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;

            #[derive(QueryableByName)]
            struct Row {
                #[diesel(sql_type = Text)]
                operator: String,
                #[diesel(sql_type = BigInt)]
                events: i64,
            }

            let rows = diesel::sql_query(
                "SELECT operator, COUNT(*) AS events
                 FROM (
                     SELECT COALESCE(NULLIF(TRIM(airline_name), ''), NULLIF(TRIM(owner), '')) AS operator
                     FROM events
                 )
                 WHERE operator IS NOT NULL
                 GROUP BY operator
                 ORDER BY events DESC, operator ASC
                 LIMIT ?",
            )
            .bind::<Integer, _>(limit)
            .load::<Row>(&mut conn)?;

            Ok(rows
                .into_iter()
                .map(|r| TopOperator {
                    operator: r.operator,
                    events: r.events,
                })
                .collect())
        })
        .await?
    }

    /// Events per registry country
    pub async fn countries(&self, limit: i64) -> Result<Vec<CountryCount>> {
        let pool = self.pool.clone();
        let limit = i32::try_from(limit).unwrap_or(i32::MAX);

        tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;

            #[derive(QueryableByName)]
            struct Row {
                #[diesel(sql_type = Text)]
                country: String,
                #[diesel(sql_type = Nullable<Text>)]
                country_iso: Option<String>,
                #[diesel(sql_type = BigInt)]
                events: i64,
            }

            let rows = diesel::sql_query(
                "SELECT TRIM(country) AS country,
                        MAX(NULLIF(country_iso, '')) AS country_iso,
                        COUNT(*) AS events
                 FROM events
                 WHERE country IS NOT NULL AND TRIM(country) <> ''
                 GROUP BY 1
                 ORDER BY events DESC, country ASC
                 LIMIT ?",
            )
            .bind::<Integer, _>(limit)
            .load::<Row>(&mut conn)?;

            Ok(rows
                .into_iter()
                .map(|r| CountryCount {
                    country: r.country,
                    country_iso: r.country_iso,
                    events: r.events,
                })
                .collect())
        })
        .await?
    }

    /// Most frequent origin → destination pairs, with coordinates from the
    /// airports table when it knows the code
    pub async fn routes(&self, limit: i64) -> Result<Vec<RouteCount>> {
        let pool = self.pool.clone();
        let limit = i32::try_from(limit).unwrap_or(i32::MAX);

        tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;

            #[derive(QueryableByName)]
            struct Row {
                #[diesel(sql_type = Text)]
                origin_iata: String,
                #[diesel(sql_type = Nullable<Text>)]
                origin_name: Option<String>,
                #[diesel(sql_type = Nullable<Double>)]
                origin_lat: Option<f64>,
                #[diesel(sql_type = Nullable<Double>)]
                origin_lon: Option<f64>,
                #[diesel(sql_type = Text)]
                dest_iata: String,
                #[diesel(sql_type = Nullable<Text>)]
                dest_name: Option<String>,
                #[diesel(sql_type = Nullable<Double>)]
                dest_lat: Option<f64>,
                #[diesel(sql_type = Nullable<Double>)]
                dest_lon: Option<f64>,
                #[diesel(sql_type = BigInt)]
                events: i64,
            }

            let rows = diesel::sql_query(
                "SELECT r.origin_iata, COALESCE(r.origin_name, o.name) AS origin_name,
                        o.latitude AS origin_lat, o.longitude AS origin_lon,
                        r.dest_iata, COALESCE(r.dest_name, d.name) AS dest_name,
                        d.latitude AS dest_lat, d.longitude AS dest_lon,
                        r.events
                 FROM (
                     SELECT UPPER(TRIM(origin_iata)) AS origin_iata,
                            MAX(NULLIF(origin_name, '')) AS origin_name,
                            UPPER(TRIM(dest_iata)) AS dest_iata,
                            MAX(NULLIF(dest_name, '')) AS dest_name,
                            COUNT(*) AS events
                     FROM events
                     WHERE origin_iata IS NOT NULL AND TRIM(origin_iata) <> ''
                       AND dest_iata IS NOT NULL AND TRIM(dest_iata) <> ''
                     GROUP BY 1, 3
                 ) r
                 LEFT JOIN airports o ON o.iata_code = r.origin_iata
                 LEFT JOIN airports d ON d.iata_code = r.dest_iata
                 ORDER BY r.events DESC, r.origin_iata ASC, r.dest_iata ASC
                 LIMIT ?",
            )
            .bind::<Integer, _>(limit)
            .load::<Row>(&mut conn)?;

            Ok(rows
                .into_iter()
                .map(|r| RouteCount {
                    origin: RouteEndpoint {
                        iata_code: r.origin_iata,
                        name: r.origin_name,
                        latitude: r.origin_lat,
                        longitude: r.origin_lon,
                    },
                    destination: RouteEndpoint {
                        iata_code: r.dest_iata,
                        name: r.dest_name,
                        latitude: r.dest_lat,
                        longitude: r.dest_lon,
                    },
                    events: r.events,
                })
                .collect())
        })
        .await?
    }
}
