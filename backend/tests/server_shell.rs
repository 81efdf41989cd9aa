//! End-to-end behaviour of the assembled server shell.

mod support;

use actix_web::http::{StatusCode, header};
use futures_util::StreamExt;
use rstest::{fixture, rstest};
use serde_json::{Value, json};

use awc::error::WsClientError;
use support::{CLIENT_ORIGIN, TestServer, spawn_server};
use todo_backend::middleware::{SECURITY_HEADERS, TRACE_ID_HEADER};

#[fixture]
fn server() -> TestServer {
    spawn_server()
}

#[rstest]
#[actix_rt::test]
async fn unknown_path_returns_not_found_message(server: TestServer) {
    let mut res = awc::Client::default()
        .post(server.url("/unknown-path"))
        .send()
        .await
        .expect("request succeeds");

    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert!(res.headers().contains_key(TRACE_ID_HEADER));
    for (name, _) in SECURITY_HEADERS {
        assert!(res.headers().contains_key(*name), "missing {name}");
    }
    assert_eq!(
        res.json::<Value>().await.expect("json body"),
        json!({ "message": "/unknown-path not found" })
    );
    server.stop().await;
}

#[rstest]
#[actix_rt::test]
async fn not_found_echoes_the_query_as_sent(server: TestServer) {
    let mut res = awc::Client::default()
        .get(server.url("/missing?tag=a&tag=b"))
        .send()
        .await
        .expect("request succeeds");

    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        res.json::<Value>().await.expect("json body"),
        json!({ "message": "/missing?tag=a&tag=b not found" })
    );
    server.stop().await;
}

#[rstest]
#[actix_rt::test]
async fn cors_preflight_allows_the_client_origin(server: TestServer) {
    let res = awc::Client::default()
        .request(actix_web::http::Method::OPTIONS, server.url("/health/live"))
        .insert_header((header::ORIGIN, CLIENT_ORIGIN))
        .insert_header((header::ACCESS_CONTROL_REQUEST_METHOD, "PUT"))
        .send()
        .await
        .expect("request succeeds");

    assert_eq!(res.status(), StatusCode::OK);
    let headers = res.headers();
    assert_eq!(
        headers
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .and_then(|v| v.to_str().ok()),
        Some(CLIENT_ORIGIN)
    );
    assert_eq!(
        headers
            .get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS)
            .and_then(|v| v.to_str().ok()),
        Some("true")
    );
    server.stop().await;
}

#[rstest]
#[actix_rt::test]
async fn probes_report_listener_and_realtime_state(server: TestServer) {
    let client = awc::Client::default();
    let status = |path: &'static str| {
        let request = client.get(server.url(path));
        async move { request.send().await.expect("request succeeds").status() }
    };

    assert_eq!(status("/health/live").await, StatusCode::OK);
    assert_eq!(status("/health/ready").await, StatusCode::OK);
    assert_eq!(status("/health/realtime").await, StatusCode::SERVICE_UNAVAILABLE);
    assert!(!server.realtime.is_attached());

    let bus = support::MemoryBus::new();
    assert!(server.realtime.attach(bus.channel()));
    assert!(!server.realtime.attach(bus.channel()), "second attach is refused");

    assert_eq!(status("/health/realtime").await, StatusCode::OK);
    server.stop().await;
}

#[rstest]
#[actix_rt::test]
async fn websocket_is_unavailable_until_realtime_attaches(server: TestServer) {
    let result = awc::Client::default()
        .ws(server.ws_url())
        .origin(CLIENT_ORIGIN)
        .connect()
        .await;

    match result {
        Err(WsClientError::InvalidResponseStatus(status)) => {
            assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        }
        Err(other) => panic!("unexpected handshake error: {other}"),
        Ok(_) => panic!("handshake should be refused"),
    }

    let bus = support::MemoryBus::new();
    assert!(server.realtime.attach(bus.channel()));
    let (res, _frames) = awc::Client::default()
        .ws(server.ws_url())
        .origin(CLIENT_ORIGIN)
        .connect()
        .await
        .expect("handshake succeeds once attached");
    assert_eq!(res.status(), StatusCode::SWITCHING_PROTOCOLS);
    server.stop().await;
}

#[rstest]
#[actix_rt::test]
async fn realtime_probe_fails_once_the_subscription_ends(server: TestServer) {
    let bus = support::MemoryBus::new();
    let channel = todo_backend::inbound::ws::RealtimeChannel::new(
        std::sync::Arc::new(bus),
        futures_util::stream::empty().boxed(),
    );
    assert!(server.realtime.attach(channel));
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;

    let res = awc::Client::default()
        .get(server.url("/health/realtime"))
        .send()
        .await
        .expect("request succeeds");

    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert!(!server.realtime.is_attached());
    server.stop().await;
}
