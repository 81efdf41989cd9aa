//! WebSocket session handler tests.

use super::*;
use crate::domain::ports::MockFanoutPublisher;
use crate::inbound::ws;
use crate::inbound::ws::channel::RealtimeChannel;
use crate::inbound::ws::state::{RealtimeSlot, WsState};
use actix_web::{App, HttpServer, dev::ServerHandle, http::header, web};
use awc::{BoxedSocket, ws::Codec, ws::Frame};
use futures_util::StreamExt;
use rstest::{fixture, rstest};
use serde_json::{Value, json};
use std::sync::Arc;
use url::Url;

const CLIENT_ORIGIN: &str = "http://localhost:3000";

type Socket = actix_codec::Framed<BoxedSocket, Codec>;

fn attached_slot() -> RealtimeSlot {
    let mut publisher = MockFanoutPublisher::new();
    publisher.expect_publish().returning(|_| Ok(()));
    let slot = RealtimeSlot::new();
    let channel = RealtimeChannel::new(Arc::new(publisher), futures_util::stream::pending().boxed());
    assert!(slot.attach(channel).is_ok(), "fresh slot accepts a channel");
    slot
}

#[fixture]
async fn ws_client() -> (Socket, RealtimeSlot, ServerHandle) {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind test listener");
    let addr = listener.local_addr().expect("listener addr");
    let slot = attached_slot();
    let state = WsState::new(
        slot.clone(),
        Url::parse(CLIENT_ORIGIN).expect("valid client url"),
    );
    let server = HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(state.clone()))
            .service(ws::ws_entry)
    })
    .listen(listener)
    .expect("bind test server")
    .disable_signals()
    .run();
    let handle = server.handle();
    actix_web::rt::spawn(server);

    let (_resp, socket) = awc::Client::default()
        .ws(format!("http://{addr}/ws"))
        .set_header(header::ORIGIN, CLIENT_ORIGIN)
        .connect()
        .await
        .expect("websocket connect");

    (socket, slot, handle)
}

async fn next_text_frame(socket: &mut Socket) -> Vec<u8> {
    loop {
        let frame = socket.next().await.expect("response frame").expect("frame");
        match frame {
            Frame::Text(bytes) => return bytes.to_vec(),
            Frame::Ping(_) | Frame::Pong(_) => continue,
            other => panic!("expected text frame, got {other:?}"),
        }
    }
}

#[rstest]
#[actix_rt::test]
async fn forwards_channel_events_as_text_frames(
    #[future] ws_client: (Socket, RealtimeSlot, ServerHandle),
) {
    let (mut socket, slot, _server) = ws_client.await;
    let channel = slot.get().expect("channel attached");
    // Wait for the session to subscribe before emitting.
    tokio::time::sleep(HEARTBEAT_INTERVAL).await;

    channel
        .emit("task.created", json!({ "id": 3 }))
        .await
        .expect("emit succeeds");

    let text = next_text_frame(&mut socket).await;
    let value: Value = serde_json::from_slice(&text).expect("json");
    assert_eq!(value, json!({ "event": "task.created", "payload": { "id": 3 } }));
}

#[rstest]
#[actix_rt::test]
async fn closes_after_timeout_without_client_messages(
    #[future] ws_client: (Socket, RealtimeSlot, ServerHandle),
) {
    let (mut socket, _slot, _server) = ws_client.await;
    tokio::time::sleep(CLIENT_TIMEOUT + HEARTBEAT_INTERVAL * 3).await;

    let observed_close = tokio::time::timeout(Duration::from_secs(2), async {
        while let Some(frame) = socket.next().await {
            match frame.expect("frame") {
                Frame::Ping(_) | Frame::Pong(_) => continue,
                Frame::Close(reason) => return reason,
                other => panic!("unexpected frame before close: {other:?}"),
            }
        }
        None
    })
    .await
    .expect("close frame missing within timeout")
    .expect("close frame missing after timeout");

    assert_eq!(observed_close.code, CloseCode::Normal);
    assert_eq!(
        observed_close.description.as_deref(),
        Some("heartbeat timeout")
    );
}
