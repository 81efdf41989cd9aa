//! Database connection supervision.
//!
//! [`DatabaseConnector::connect`] performs the first connection attempt and
//! returns the error to the caller, which treats it as fatal. Once connected,
//! a supervisor task waits for the driver to report a disconnect and then
//! re-runs the same connect routine until it succeeds again. Retries are
//! unbounded; failed attempts are spaced by [`ReconnectBackoff`]. The first
//! attempt after a disconnect is immediate.
//!
//! The live handle is shared through [`DatabaseHandle`], which always yields
//! the most recent successful connection.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};

use super::pool::PoolError;

const EVENT_BUFFER: usize = 64;

/// Errors raised while establishing a database connection.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DatabaseError {
    /// Pool construction, checkout or probing failed.
    #[error(transparent)]
    Pool(#[from] PoolError),
    /// Schema migrations could not be applied.
    #[error("database migration failed: {message}")]
    Migration { message: String },
}

/// Driver abstraction the supervisor runs against.
#[async_trait]
pub trait DatabaseDriver: Send + Sync + 'static {
    /// Connection handle produced by a successful connect.
    type Handle: Clone + Send + Sync + 'static;

    /// Open a connection.
    async fn connect(&self) -> Result<Self::Handle, DatabaseError>;

    /// Resolve once `handle` has lost its connection.
    async fn disconnected(&self, handle: &Self::Handle);
}

/// Connection lifecycle notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// The initial connection succeeded.
    Connected,
    /// The active connection was lost.
    Disconnected,
    /// A connection was re-established after `attempts` tries.
    Reconnected { attempts: u32 },
    /// Reconnect attempt number `attempt` failed.
    ReconnectFailed { attempt: u32 },
}

/// Capped exponential backoff between failed reconnect attempts.
///
/// # Examples
/// ```
/// use std::time::Duration;
/// use todo_backend::outbound::persistence::ReconnectBackoff;
///
/// let backoff = ReconnectBackoff::new(Duration::from_millis(100), Duration::from_secs(1));
/// assert_eq!(backoff.delay_for(1), Duration::from_millis(100));
/// assert_eq!(backoff.delay_for(3), Duration::from_millis(400));
/// assert_eq!(backoff.delay_for(10), Duration::from_secs(1));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectBackoff {
    initial: Duration,
    max: Duration,
}

impl Default for ReconnectBackoff {
    fn default() -> Self {
        Self::new(Duration::from_millis(200), Duration::from_secs(30))
    }
}

impl ReconnectBackoff {
    /// Build a backoff policy; `max` is raised to `initial` if smaller.
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self {
            initial,
            max: max.max(initial),
        }
    }

    /// Un-jittered delay after the `failures`-th consecutive failure.
    pub fn delay_for(&self, failures: u32) -> Duration {
        let exponent = failures.saturating_sub(1).min(31);
        self.initial
            .checked_mul(1_u32 << exponent)
            .map_or(self.max, |delay| delay.min(self.max))
    }

    /// Delay with jitter drawn from the upper half of [`Self::delay_for`].
    pub fn jittered(&self, failures: u32) -> Duration {
        let ceiling = self.delay_for(failures);
        let floor = ceiling / 2;
        if ceiling <= floor {
            return ceiling;
        }
        rand::thread_rng().gen_range(floor..=ceiling)
    }
}

/// Shared view of the current connection handle.
#[derive(Clone)]
pub struct DatabaseHandle<H> {
    current: watch::Receiver<H>,
}

impl<H: Clone> DatabaseHandle<H> {
    /// Most recent successfully connected handle.
    pub fn current(&self) -> H {
        self.current.borrow().clone()
    }
}

/// An established, supervised database connection.
///
/// Dropping it stops the supervisor.
pub struct Database<H> {
    handle: DatabaseHandle<H>,
    supervisor: JoinHandle<()>,
}

impl<H: Clone> Database<H> {
    /// Shareable handle for repositories.
    pub fn handle(&self) -> DatabaseHandle<H> {
        self.handle.clone()
    }
}

impl<H> Drop for Database<H> {
    fn drop(&mut self) {
        self.supervisor.abort();
    }
}

/// Opens the database and keeps it connected.
pub struct DatabaseConnector<D> {
    driver: Arc<D>,
    backoff: ReconnectBackoff,
    events: broadcast::Sender<ConnectionEvent>,
}

impl<D: DatabaseDriver> DatabaseConnector<D> {
    /// Build a connector around `driver`.
    pub fn new(driver: D, backoff: ReconnectBackoff) -> Self {
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        Self {
            driver: Arc::new(driver),
            backoff,
            events,
        }
    }

    /// Subscribe to connection lifecycle events.
    pub fn subscribe(&self) -> broadcast::Receiver<ConnectionEvent> {
        self.events.subscribe()
    }

    /// Make the first connection attempt and start supervising it.
    ///
    /// # Errors
    ///
    /// Returns the driver error unchanged; the first attempt is never retried.
    pub async fn connect(&self) -> Result<Database<D::Handle>, DatabaseError> {
        let handle = match self.driver.connect().await {
            Ok(handle) => handle,
            Err(error) => {
                error!(%error, "error connecting to database");
                return Err(error);
            }
        };
        info!("successfully connected to database");
        notify(&self.events, ConnectionEvent::Connected);

        let (sender, receiver) = watch::channel(handle);
        let supervisor = tokio::spawn(supervise(
            Arc::clone(&self.driver),
            self.backoff,
            self.events.clone(),
            sender,
        ));

        Ok(Database {
            handle: DatabaseHandle { current: receiver },
            supervisor,
        })
    }
}

async fn supervise<D: DatabaseDriver>(
    driver: Arc<D>,
    backoff: ReconnectBackoff,
    events: broadcast::Sender<ConnectionEvent>,
    current: watch::Sender<D::Handle>,
) {
    loop {
        let handle = current.borrow().clone();
        driver.disconnected(&handle).await;
        drop(handle);

        warn!("database disconnected; reconnecting");
        notify(&events, ConnectionEvent::Disconnected);

        let replacement = reconnect(driver.as_ref(), backoff, &events).await;
        if current.send(replacement).is_err() {
            debug!("database handle dropped; stopping supervisor");
            return;
        }
    }
}

async fn reconnect<D: DatabaseDriver>(
    driver: &D,
    backoff: ReconnectBackoff,
    events: &broadcast::Sender<ConnectionEvent>,
) -> D::Handle {
    let mut failures: u32 = 0;
    loop {
        match driver.connect().await {
            Ok(handle) => {
                let attempts = failures.saturating_add(1);
                info!(attempts, "successfully reconnected to database");
                notify(events, ConnectionEvent::Reconnected { attempts });
                return handle;
            }
            Err(error) => {
                failures = failures.saturating_add(1);
                let delay = backoff.jittered(failures);
                error!(
                    %error,
                    attempt = failures,
                    retry_in_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    "error reconnecting to database"
                );
                notify(events, ConnectionEvent::ReconnectFailed { attempt: failures });
                tokio::time::sleep(delay).await;
            }
        }
    }
}

fn notify(events: &broadcast::Sender<ConnectionEvent>, event: ConnectionEvent) {
    // No subscribers is the normal case outside tests.
    if events.send(event).is_err() {
        trace!(?event, "no connection event subscribers");
    }
}
