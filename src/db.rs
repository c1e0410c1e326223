use std::time::Duration;

use anyhow::Context;
use sqlx::{
    pool::PoolConnection,
    postgres::{PgPool, PgPoolOptions},
    Postgres,
};
use tokio::sync::{Mutex, MutexGuard};
use tracing::{error, info};

use crate::config::DatabaseConfig;

pub fn pool_options(cfg: &DatabaseConfig) -> PgPoolOptions {
    PgPoolOptions::new()
        .max_connections(cfg.max_connections)
        .acquire_timeout(Duration::from_secs(cfg.acquire_timeout_secs))
        .max_lifetime(Duration::from_secs(cfg.recycle_secs))
        .test_before_acquire(true)
}

pub async fn connect(cfg: &DatabaseConfig) -> anyhow::Result<PgPool> {
    let pool = pool_options(cfg)
        .connect(&cfg.url)
        .await
        .context("connect to database")?;
    info!(max_connections = cfg.max_connections, "database pool ready");
    Ok(pool)
}

pub async fn migrate(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("run migrations")?;
    Ok(())
}

/// `SELECT 1` round trip.
pub async fn ping(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query_scalar::<_, i32>("SELECT 1").fetch_one(pool).await?;
    Ok(())
}

/// Server version string trimmed to its first segment,
/// e.g. "PostgreSQL 16.2 on x86_64-pc-linux-gnu".
pub async fn server_version(pool: &PgPool) -> Result<String, sqlx::Error> {
    let full = sqlx::query_scalar::<_, String>("SELECT version()")
        .fetch_one(pool)
        .await?;
    Ok(full.split(',').next().unwrap_or_default().trim().to_owned())
}

/// One pooled connection for the lifetime of a request.
///
/// The connection goes back to the pool when the session is dropped, on every
/// exit path. Repositories run mutations inside transactions on it, and an
/// uncommitted transaction rolls back when dropped.
pub struct DbSession {
    conn: Mutex<PoolConnection<Postgres>>,
}

impl DbSession {
    pub async fn acquire(pool: &PgPool) -> Result<Self, sqlx::Error> {
        let conn = pool.acquire().await.map_err(|e| {
            error!(error = %e, "failed to acquire database connection");
            e
        })?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub async fn lock(&self) -> MutexGuard<'_, PoolConnection<Postgres>> {
        self.conn.lock().await
    }
}
