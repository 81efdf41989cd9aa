//! Redis publish/subscribe fan-out for the real-time channel.

mod redis_adapter;

pub use redis_adapter::{
    REALTIME_CHANNEL, RedisFanout, RedisPublisher, connect_fanout, redis_url,
};
