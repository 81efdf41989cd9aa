//! Requests through the fully assembled application.

use super::*;
use std::net::SocketAddr;

use actix_web::http::{StatusCode, header};
use actix_web::test::{self as actix_test, TestRequest};
use rstest::{fixture, rstest};
use serde_json::{Value, json};
use url::Url;

use crate::middleware::{SECURITY_HEADERS, TRACE_ID_HEADER};

#[fixture]
fn shell() -> ServerShell<ErrorBoundaryAttached> {
    let config = ServerConfig::new(
        Key::generate(),
        false,
        SocketAddr::from(([127, 0, 0, 1], 0)),
        Url::parse("http://localhost:3000").expect("valid client url"),
    );
    ServerShell::new(config)
        .configure_security()
        .configure_standard()
        .attach_error_boundary()
}

#[rstest]
#[actix_web::test]
async fn unknown_route_answers_not_found_through_every_layer(
    shell: ServerShell<ErrorBoundaryAttached>,
) {
    let app = actix_test::init_service(build_app(shell.app_dependencies())).await;

    let res = actix_test::call_service(
        &app,
        TestRequest::post().uri("/unknown-path").to_request(),
    )
    .await;

    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert!(res.headers().contains_key(TRACE_ID_HEADER));
    for (name, _) in SECURITY_HEADERS {
        assert!(res.headers().contains_key(*name), "missing {name}");
    }
    let body: Value = actix_test::read_body_json(res).await;
    assert_eq!(body, json!({ "message": "/unknown-path not found" }));
}

#[rstest]
#[actix_web::test]
async fn routed_handlers_respond_behind_the_boundary(shell: ServerShell<ErrorBoundaryAttached>) {
    let app = actix_test::init_service(build_app(shell.app_dependencies())).await;

    let live_res = actix_test::call_service(
        &app,
        TestRequest::get().uri("/health/live").to_request(),
    )
    .await;
    let realtime_res = actix_test::call_service(
        &app,
        TestRequest::get().uri("/health/realtime").to_request(),
    )
    .await;

    assert_eq!(live_res.status(), StatusCode::OK);
    assert_eq!(realtime_res.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[rstest]
#[actix_web::test]
async fn recorded_body_limits_govern_json_extraction(shell: ServerShell<ErrorBoundaryAttached>) {
    async fn echo(body: web::Json<Value>) -> web::Json<Value> {
        body
    }

    let deps = shell.app_dependencies();
    let app = actix_test::init_service(
        build_app(deps).route("/echo", web::post().to(echo)),
    )
    .await;
    let req = TestRequest::post()
        .uri("/echo")
        .insert_header((header::CONTENT_TYPE, "application/json"))
        .set_payload("{not json")
        .to_request();

    let res = actix_test::call_service(&app, req).await;

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = actix_test::read_body_json(res).await;
    assert_eq!(body["statusCode"], 400);
    assert_eq!(body["status"], "Bad Request");
}
