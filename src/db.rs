//! SQLite connection pool and schema migrations.
//!
//! Every pooled connection is configured with:
//! - `journal_mode = WAL` so HTTP readers never block the single writer
//! - `synchronous = NORMAL`
//! - `busy_timeout` so short lock contention waits instead of failing

use anyhow::{Context, Result, anyhow};
use diesel::SqliteConnection;
use diesel::connection::SimpleConnection;
use diesel::r2d2::{ConnectionManager, CustomizeConnection, Pool, PooledConnection};
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use std::path::Path;
use std::time::Duration;
use tracing::info;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Busy timeout applied to every connection.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const DEFAULT_POOL_SIZE: u32 = 8;

pub type SqlitePool = Pool<ConnectionManager<SqliteConnection>>;
pub type SqlitePooledConnection = PooledConnection<ConnectionManager<SqliteConnection>>;

#[derive(Debug, Clone, Copy)]
struct ConnectionPragmas {
    busy_timeout: Duration,
}

impl CustomizeConnection<SqliteConnection, diesel::r2d2::Error> for ConnectionPragmas {
    fn on_acquire(&self, conn: &mut SqliteConnection) -> Result<(), diesel::r2d2::Error> {
        conn.batch_execute(&format!(
            "PRAGMA journal_mode = WAL; \
             PRAGMA synchronous = NORMAL; \
             PRAGMA foreign_keys = ON; \
             PRAGMA busy_timeout = {};",
            self.busy_timeout.as_millis()
        ))
        .map_err(diesel::r2d2::Error::QueryError)
    }
}

/// Open (or create) the database file and build a connection pool for it.
pub fn create_pool(path: &Path) -> Result<SqlitePool> {
    create_pool_with_size(path, DEFAULT_POOL_SIZE)
}

pub fn create_pool_with_size(path: &Path, max_size: u32) -> Result<SqlitePool> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create database directory {}", parent.display()))?;
    }

    let url = path.to_string_lossy().to_string();
    let manager = ConnectionManager::<SqliteConnection>::new(url);

    Pool::builder()
        .max_size(max_size)
        .connection_customizer(Box::new(ConnectionPragmas {
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
        }))
        .build(manager)
        .with_context(|| format!("Failed to open database {}", path.display()))
}

/// Apply any pending migrations, returning the names of those applied.
pub fn run_migrations(pool: &SqlitePool) -> Result<Vec<String>> {
    let mut conn = pool.get().context("Failed to get connection for migrations")?;

    let applied = conn
        .run_pending_migrations(MIGRATIONS)
        .map_err(|e| anyhow!("Failed to run database migrations: {e}"))?
        .into_iter()
        .map(|version| version.to_string())
        .collect::<Vec<_>>();

    if applied.is_empty() {
        info!("Database schema is up to date");
    } else {
        info!("Applied {} migration(s): {:?}", applied.len(), applied);
    }

    Ok(applied)
}
