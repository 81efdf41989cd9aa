//! Per-connection WebSocket handler.
//!
//! Pings every 5s and closes a connection idle for 10s without client
//! traffic. Events from the real-time channel are forwarded as JSON text
//! frames `{"event", "payload"}`. Client text is treated as keep-alive only.

use std::time::{Duration, Instant};

use actix_ws::{CloseCode, CloseReason, Closed, Message, MessageStream, ProtocolError, Session};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::time;
use tracing::{debug, warn};

use crate::domain::RealtimeEvent;

/// Time between heartbeats to the client (5s in production, shorter in tests).
#[cfg(not(test))]
pub(crate) const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(5);
#[cfg(test)]
pub(crate) const HEARTBEAT_INTERVAL: Duration = Duration::from_millis(50);

/// Max idle time before disconnecting the client (10s in production, shorter in tests).
#[cfg(not(test))]
pub(crate) const CLIENT_TIMEOUT: Duration = Duration::from_secs(10);
#[cfg(test)]
pub(crate) const CLIENT_TIMEOUT: Duration = Duration::from_millis(100);

pub(super) async fn handle_ws_session(
    events: broadcast::Receiver<RealtimeEvent>,
    session: Session,
    stream: MessageStream,
) {
    WsSession { events }.run(session, stream).await;
}

enum SessionError {
    ClientClosed(Option<CloseReason>),
    StreamClosed,
    HeartbeatTimeout,
    ChannelClosed,
    Protocol(ProtocolError),
    Network(Closed),
}

struct WsSession {
    events: broadcast::Receiver<RealtimeEvent>,
}

impl WsSession {
    async fn run(&mut self, mut session: Session, mut stream: MessageStream) {
        let mut last_heartbeat = Instant::now();
        let mut heartbeat = time::interval(HEARTBEAT_INTERVAL);

        loop {
            let result = tokio::select! {
                _ = heartbeat.tick() => {
                    Self::heartbeat(&mut session, last_heartbeat).await
                }
                message = stream.recv() => {
                    Self::client_message(&mut session, &mut last_heartbeat, message).await
                }
                event = self.events.recv() => {
                    Self::forward(&mut session, event).await
                }
            };

            if let Err(error) = result {
                log_shutdown_reason(&error);
                if let CloseAction::Close(reason) = close_action_for(error) {
                    if let Err(error) = session.close(reason).await {
                        warn!(error = %error, "failed to close WebSocket session");
                    }
                }
                return;
            }
        }
    }

    async fn heartbeat(session: &mut Session, last_heartbeat: Instant) -> Result<(), SessionError> {
        if Instant::now().duration_since(last_heartbeat) > CLIENT_TIMEOUT {
            return Err(SessionError::HeartbeatTimeout);
        }
        session.ping(b"").await.map_err(SessionError::Network)
    }

    async fn client_message(
        session: &mut Session,
        last_heartbeat: &mut Instant,
        message: Option<Result<Message, ProtocolError>>,
    ) -> Result<(), SessionError> {
        let message = match message {
            None => return Err(SessionError::StreamClosed),
            Some(Err(error)) => return Err(SessionError::Protocol(error)),
            Some(Ok(message)) => message,
        };

        match message {
            Message::Ping(payload) => {
                *last_heartbeat = Instant::now();
                session.pong(&payload).await.map_err(SessionError::Network)
            }
            Message::Close(reason) => Err(SessionError::ClientClosed(reason)),
            Message::Text(_)
            | Message::Pong(_)
            | Message::Binary(_)
            | Message::Continuation(_)
            | Message::Nop => {
                *last_heartbeat = Instant::now();
                Ok(())
            }
        }
    }

    async fn forward(
        session: &mut Session,
        event: Result<RealtimeEvent, RecvError>,
    ) -> Result<(), SessionError> {
        let event = match event {
            Ok(event) => event,
            Err(RecvError::Lagged(skipped)) => {
                warn!(skipped, "WebSocket session lagging; events dropped");
                return Ok(());
            }
            Err(RecvError::Closed) => return Err(SessionError::ChannelClosed),
        };

        match serde_json::to_string(&event) {
            Ok(body) => session.text(body).await.map_err(SessionError::Network),
            Err(error) => {
                warn!(error = %error, event = %event.event, "failed to serialise real-time event");
                Ok(())
            }
        }
    }
}

fn log_shutdown_reason(error: &SessionError) {
    match error {
        SessionError::HeartbeatTimeout => warn!("WebSocket heartbeat timeout; closing connection"),
        SessionError::Protocol(error) => warn!(error = %error, "WebSocket protocol error"),
        SessionError::Network(error) => {
            warn!(error = %error, "WebSocket send failed; closing connection");
        }
        SessionError::ChannelClosed => debug!("real-time channel closed; ending session"),
        SessionError::ClientClosed(_) | SessionError::StreamClosed => {}
    }
}

enum CloseAction {
    None,
    Close(Option<CloseReason>),
}

fn close_action_for(error: SessionError) -> CloseAction {
    let reason = |code, description: &str| {
        CloseAction::Close(Some(CloseReason {
            code,
            description: Some(description.to_owned()),
        }))
    };
    match error {
        SessionError::HeartbeatTimeout => reason(CloseCode::Normal, "heartbeat timeout"),
        SessionError::Protocol(_) => reason(CloseCode::Protocol, "protocol error"),
        SessionError::ChannelClosed => reason(CloseCode::Away, "server shutting down"),
        SessionError::ClientClosed(reason) => CloseAction::Close(reason),
        SessionError::StreamClosed | SessionError::Network(_) => CloseAction::None,
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
