//! Process bootstrap.
//!
//! Startup order:
//! 1. connect to the database; failure is fatal and nothing else starts;
//! 2. apply embedded migrations;
//! 3. build the server shell and start listening;
//! 4. connect the real-time channel and attach it to the running server.
//!
//! A real-time failure is logged and leaves the server running without it.

use std::io;
use std::sync::Arc;

use tracing::{error, info};

use crate::config::AppConfig;
use crate::domain::UserService;
use crate::inbound::ws::{RealtimeChannel, RealtimeError, RealtimeNotifier, RealtimeSlot};
use crate::outbound::persistence::{
    DatabaseConnector, DatabaseError, DieselUserRepository, PoolConfig, PostgresDriver,
};
use crate::outbound::pubsub::connect_fanout;
use crate::server::{RealtimeAttacher, ServerConfig, ServerShell, start};

/// Fatal startup failures.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    /// The initial database connection or migration failed.
    #[error(transparent)]
    Database(#[from] DatabaseError),
    /// The HTTP listener could not be bound or failed while serving.
    #[error("http server failed: {0}")]
    Server(#[from] io::Error),
}

/// Connect the Redis publisher and subscriber concurrently and install them
/// as a new channel's fan-out adapter.
///
/// # Errors
///
/// Returns [`RealtimeError::Connect`] if either connection fails.
pub async fn create_realtime_channel(redis_host: &str) -> Result<RealtimeChannel, RealtimeError> {
    let fanout = connect_fanout(redis_host)
        .await
        .map_err(RealtimeError::Connect)?;
    Ok(RealtimeChannel::new(Arc::new(fanout.publisher), fanout.inbound))
}

async fn attach_realtime(redis_host: String, attacher: RealtimeAttacher) {
    match create_realtime_channel(&redis_host).await {
        Ok(channel) => {
            attacher.attach(channel);
        }
        Err(err) => error!(error = %err, "real-time channel unavailable; continuing without it"),
    }
}

/// Run the server until it stops.
///
/// # Errors
///
/// Returns [`StartupError`] when the database cannot be reached on the first
/// attempt, migrations fail, or the listener cannot be bound.
pub async fn run(config: AppConfig) -> Result<(), StartupError> {
    let driver = PostgresDriver::new(
        PoolConfig::new(config.database_url.clone()),
        config.probe_interval,
    );
    let database = DatabaseConnector::new(driver.clone(), config.backoff)
        .connect()
        .await?;
    driver.run_migrations().await?;

    let slot = RealtimeSlot::new();
    let users = UserService::new(
        Arc::new(DieselUserRepository::new(database.handle())),
        Arc::new(RealtimeNotifier::new(slot.clone())),
    );
    let shell = ServerShell::new(ServerConfig::from_app_config(&config))
        .with_user_service(users)
        .with_realtime_slot(slot);
    let server = start(shell)?;

    let realtime = attach_realtime(config.redis_host.clone(), server.realtime());
    let (served, ()) = tokio::join!(server.run(), realtime);
    info!("server stopped");
    drop(database);
    served.map_err(StartupError::from)
}
