//! Shared helpers for integration tests that drive a running server.

use std::net::SocketAddr;
use std::sync::Arc;

use actix_web::cookie::Key;
use actix_web::dev::ServerHandle;
use async_trait::async_trait;
use futures_util::StreamExt;
use futures_util::stream::BoxStream;
use tokio::sync::broadcast;
use url::Url;

use todo_backend::domain::Envelope;
use todo_backend::domain::ports::{FanoutError, FanoutInbound, FanoutPublisher};
use todo_backend::inbound::ws::RealtimeChannel;
use todo_backend::server::{ListeningServer, RealtimeAttacher, ServerConfig, ServerShell, start};

/// Browser origin every test server trusts.
pub const CLIENT_ORIGIN: &str = "http://localhost:3000";

/// In-memory stand-in for the Redis channel: every publish reaches every
/// subscriber, including the publisher's own.
#[derive(Clone)]
pub struct MemoryBus {
    sender: broadcast::Sender<Envelope>,
}

impl MemoryBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(64);
        Self { sender }
    }

    pub fn inbound(&self) -> FanoutInbound {
        let receiver = self.sender.subscribe();
        let stream: BoxStream<'static, Envelope> =
            futures_util::stream::unfold(receiver, |mut receiver| async move {
                receiver.recv().await.ok().map(|envelope| (envelope, receiver))
            })
            .boxed();
        stream
    }

    /// A channel joined to this bus as a new node.
    pub fn channel(&self) -> RealtimeChannel {
        RealtimeChannel::new(Arc::new(self.clone()), self.inbound())
    }
}

#[async_trait]
impl FanoutPublisher for MemoryBus {
    async fn publish(&self, envelope: &Envelope) -> Result<(), FanoutError> {
        self.sender
            .send(envelope.clone())
            .map(|_| ())
            .map_err(|_| FanoutError::publish("no subscribers"))
    }
}

/// A running test server.
pub struct TestServer {
    pub base_url: String,
    pub realtime: RealtimeAttacher,
    pub handle: ServerHandle,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    pub fn ws_url(&self) -> String {
        self.url("/ws")
    }

    pub async fn stop(self) {
        self.handle.stop(false).await;
    }
}

pub fn server_config() -> ServerConfig {
    ServerConfig::new(
        Key::generate(),
        false,
        SocketAddr::from(([127, 0, 0, 1], 0)),
        Url::parse(CLIENT_ORIGIN).expect("valid client url"),
    )
    .with_workers(1)
}

/// Start the full server shell on an ephemeral port.
pub fn spawn_server() -> TestServer {
    let server: ListeningServer =
        start(ServerShell::new(server_config())).expect("server binds to an ephemeral port");
    let addr = *server.addrs().first().expect("bound address");
    let realtime = server.realtime();
    let handle = server.handle();
    actix_web::rt::spawn(server.run());
    TestServer {
        base_url: format!("http://{addr}"),
        realtime,
        handle,
    }
}
