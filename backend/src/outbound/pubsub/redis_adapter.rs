//! Redis implementation of the fan-out port.
//!
//! Publishing goes through a `bb8` pool of multiplexed connections. The
//! subscriber holds a dedicated connection, since a Redis connection in
//! subscribe mode cannot issue other commands.

use async_trait::async_trait;
use bb8_redis::RedisConnectionManager;
use bb8_redis::{bb8, redis};
use futures_util::StreamExt;
use tracing::{debug, info, warn};

use crate::domain::Envelope;
use crate::domain::ports::{FanoutError, FanoutInbound, FanoutPublisher};

/// Pub/sub channel shared by every server process.
pub const REALTIME_CHANNEL: &str = "todo:realtime";

/// Normalise the configured Redis host into a connection URL.
///
/// Bare hosts (`cache` or `cache:6379`) get the `redis://` scheme; values
/// that already carry a scheme are returned unchanged.
///
/// # Examples
/// ```
/// use todo_backend::outbound::pubsub::redis_url;
///
/// assert_eq!(redis_url("localhost"), "redis://localhost");
/// assert_eq!(redis_url("rediss://cache:6380"), "rediss://cache:6380");
/// ```
pub fn redis_url(host: &str) -> String {
    if host.contains("://") {
        host.to_owned()
    } else {
        format!("redis://{host}")
    }
}

/// Pool-backed publisher for [`REALTIME_CHANNEL`].
#[derive(Clone)]
pub struct RedisPublisher {
    pool: bb8::Pool<RedisConnectionManager>,
    channel: String,
}

impl RedisPublisher {
    async fn connect(url: &str, channel: &str) -> Result<Self, FanoutError> {
        let manager =
            RedisConnectionManager::new(url).map_err(|err| FanoutError::connection(err.to_string()))?;
        let pool = bb8::Pool::builder()
            .build(manager)
            .await
            .map_err(|err| FanoutError::connection(err.to_string()))?;
        Ok(Self {
            pool,
            channel: channel.to_owned(),
        })
    }
}

#[async_trait]
impl FanoutPublisher for RedisPublisher {
    async fn publish(&self, envelope: &Envelope) -> Result<(), FanoutError> {
        let payload =
            serde_json::to_string(envelope).map_err(|err| FanoutError::encode(err.to_string()))?;
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|err| FanoutError::connection(err.to_string()))?;
        let receivers: i64 = redis::cmd("PUBLISH")
            .arg(&self.channel)
            .arg(payload)
            .query_async(&mut *conn)
            .await
            .map_err(|err| FanoutError::publish(err.to_string()))?;
        debug!(receivers, event = %envelope.event.event, "envelope published");
        Ok(())
    }
}

/// Both halves of a connected Redis fan-out adapter.
pub struct RedisFanout {
    /// Publishing half.
    pub publisher: RedisPublisher,
    /// Envelopes received on the subscribed channel.
    pub inbound: FanoutInbound,
}

async fn subscribe(url: &str, channel: &str) -> Result<FanoutInbound, FanoutError> {
    let client =
        redis::Client::open(url).map_err(|err| FanoutError::connection(err.to_string()))?;
    let mut pubsub = client
        .get_async_pubsub()
        .await
        .map_err(|err| FanoutError::connection(err.to_string()))?;
    pubsub
        .subscribe(channel)
        .await
        .map_err(|err| FanoutError::connection(err.to_string()))?;

    let stream = pubsub
        .into_on_message()
        .filter_map(|message| async move {
            let payload = match message.get_payload::<String>() {
                Ok(payload) => payload,
                Err(error) => {
                    warn!(%error, "discarding non-text pub/sub payload");
                    return None;
                }
            };
            decode_envelope(&payload)
        });
    Ok(stream.boxed())
}

/// Parse a published envelope, logging and discarding malformed payloads.
pub(crate) fn decode_envelope(payload: &str) -> Option<Envelope> {
    match serde_json::from_str(payload) {
        Ok(envelope) => Some(envelope),
        Err(error) => {
            warn!(%error, "discarding malformed real-time envelope");
            None
        }
    }
}

/// Connect the publisher pool and the subscriber concurrently.
///
/// Both connections must succeed; there is no timeout beyond what the
/// Redis client applies itself.
///
/// # Errors
///
/// Returns [`FanoutError::Connection`] when either connection fails.
pub async fn connect_fanout(host: &str) -> Result<RedisFanout, FanoutError> {
    let url = redis_url(host);
    let (publisher, inbound) = tokio::try_join!(
        RedisPublisher::connect(&url, REALTIME_CHANNEL),
        subscribe(&url, REALTIME_CHANNEL),
    )?;
    info!(channel = REALTIME_CHANNEL, "redis fan-out connected");
    Ok(RedisFanout { publisher, inbound })
}
