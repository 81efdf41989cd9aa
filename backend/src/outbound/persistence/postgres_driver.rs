//! PostgreSQL implementation of [`DatabaseDriver`].
//!
//! A connect builds a fresh `bb8` pool and proves it with `SELECT 1`.
//! Disconnects are detected by probing the pool on a fixed interval; the
//! first failed probe reports the pool as disconnected.

use std::time::Duration;

use async_trait::async_trait;
use diesel::{Connection, PgConnection};
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use tokio::time::{self, MissedTickBehavior};
use tracing::{info, warn};

use super::connector::{DatabaseDriver, DatabaseError};
use super::pool::{DbPool, PoolConfig};

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Pool-backed PostgreSQL driver.
#[derive(Debug, Clone)]
pub struct PostgresDriver {
    pool: PoolConfig,
    probe_interval: Duration,
}

impl PostgresDriver {
    /// Build a driver probing every `probe_interval`.
    pub fn new(pool: PoolConfig, probe_interval: Duration) -> Self {
        Self {
            pool,
            probe_interval,
        }
    }

    /// Apply pending embedded migrations on a dedicated blocking connection.
    ///
    /// # Errors
    ///
    /// Returns [`DatabaseError::Migration`] when connecting or migrating fails.
    pub async fn run_migrations(&self) -> Result<(), DatabaseError> {
        let url = self.pool.database_url().to_owned();
        let applied = tokio::task::spawn_blocking(move || {
            let mut conn = PgConnection::establish(&url).map_err(migration_error)?;
            conn.run_pending_migrations(MIGRATIONS)
                .map(|versions| versions.len())
                .map_err(migration_error)
        })
        .await
        .map_err(migration_error)??;

        info!(applied, "database migrations applied");
        Ok(())
    }
}

fn migration_error(error: impl std::fmt::Display) -> DatabaseError {
    DatabaseError::Migration {
        message: error.to_string(),
    }
}

#[async_trait]
impl DatabaseDriver for PostgresDriver {
    type Handle = DbPool;

    async fn connect(&self) -> Result<DbPool, DatabaseError> {
        let pool = DbPool::new(self.pool.clone()).await?;
        pool.probe().await?;
        Ok(pool)
    }

    async fn disconnected(&self, pool: &DbPool) {
        let mut interval = time::interval(self.probe_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately; the pool was just probed.
        interval.tick().await;
        loop {
            interval.tick().await;
            if let Err(error) = pool.probe().await {
                warn!(%error, "database probe failed");
                return;
            }
        }
    }
}
