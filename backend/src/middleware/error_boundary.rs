//! Terminal error handler.
//!
//! Sits innermost in the middleware stack so every handler or extractor
//! failure passes through it before any outer layer sees the response:
//!
//! - [`AppError`] responses keep their status and `{message, statusCode,
//!   status}` body;
//! - other client errors (4xx) keep their status and get the same body shape
//!   with the canonical reason;
//! - everything else is logged and answered with the generic 500 body.

use std::task::{Context, Poll};

use actix_web::body::{EitherBody, MessageBody};
use actix_web::dev::{Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::http::StatusCode;
use actix_web::{Error, HttpResponse};
use futures_util::future::{LocalBoxFuture, Ready, ready};
use tracing::{error, warn};

use crate::domain::AppError;
use crate::inbound::http::error::framework_error_body;

/// Middleware factory for the terminal error handler.
#[derive(Debug, Clone, Copy, Default)]
pub struct ErrorBoundary;

impl<S, B> Transform<S, ServiceRequest> for ErrorBoundary
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = ErrorBoundaryMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(ErrorBoundaryMiddleware { service }))
    }
}

/// Service produced by [`ErrorBoundary`].
pub struct ErrorBoundaryMiddleware<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for ErrorBoundaryMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        // The router needs the request uniquely owned; inspect the response only.
        let fut = self.service.call(req);
        Box::pin(async move {
            let res = fut.await?;
            let Some(response) = res.response().error().and_then(replacement_for) else {
                return Ok(res.map_into_left_body());
            };
            let (request, _) = res.into_parts();
            Ok(ServiceResponse::new(request, response).map_into_right_body())
        })
    }
}

/// Decide the response for an error. `None` keeps the existing response.
fn replacement_for(err: &Error) -> Option<HttpResponse> {
    if let Some(app_error) = err.as_error::<AppError>() {
        log_app_error(app_error);
        return None;
    }

    let status = err.as_response_error().status_code();
    if status.is_client_error() {
        warn!(error = %err, status = status.as_u16(), "request rejected");
    } else {
        error!(error = %err, status = status.as_u16(), "unhandled error");
    }
    let body = framework_error_body(status);
    let status = StatusCode::from_u16(body.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    Some(HttpResponse::build(status).json(body))
}

fn log_app_error(app_error: &AppError) {
    if app_error.is_internal() || app_error.status_code() >= 500 {
        error!(error = %app_error, status = app_error.status_code(), "request failed");
    } else {
        warn!(error = %app_error, status = app_error.status_code(), "request failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{App, ResponseError, test as actix_test, web};
    use rstest::rstest;
    use serde_json::{Value, json};

    #[derive(Debug, thiserror::Error)]
    #[error("socket closed unexpectedly")]
    struct Unrecognised;

    impl ResponseError for Unrecognised {}

    #[derive(Debug, thiserror::Error)]
    #[error("teapot")]
    struct Teapot;

    impl ResponseError for Teapot {
        fn status_code(&self) -> StatusCode {
            StatusCode::IM_A_TEAPOT
        }
    }

    async fn call(path: &str) -> (StatusCode, Value) {
        let app = actix_test::init_service(
            App::new()
                .wrap(ErrorBoundary)
                .route(
                    "/bad",
                    web::get().to(|| async {
                        Err::<HttpResponse, _>(AppError::bad_request("Invalid input"))
                    }),
                )
                .route(
                    "/unrecognised",
                    web::get().to(|| async { Err::<HttpResponse, _>(Unrecognised) }),
                )
                .route(
                    "/teapot",
                    web::get().to(|| async { Err::<HttpResponse, _>(Teapot) }),
                )
                .route(
                    "/internal",
                    web::get().to(|| async {
                        Err::<HttpResponse, _>(AppError::internal("pool exhausted"))
                    }),
                ),
        )
        .await;
        let res = actix_test::call_service(&app, actix_test::TestRequest::get().uri(path).to_request()).await;
        let status = res.status();
        (status, actix_test::read_body_json(res).await)
    }

    #[rstest]
    #[actix_web::test]
    async fn taxonomy_errors_keep_their_shape() {
        let (status, body) = call("/bad").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body,
            json!({"message": "Invalid input", "statusCode": 400, "status": "Bad Request"})
        );
    }

    #[rstest]
    #[case("/unrecognised")]
    #[case("/internal")]
    #[actix_web::test]
    async fn server_errors_get_the_generic_body(#[case] path: &str) {
        let (status, body) = call(path).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body,
            json!({
                "message": "Internal server error",
                "statusCode": 500,
                "status": "Internal Server Error"
            })
        );
    }

    #[rstest]
    #[actix_web::test]
    async fn framework_client_errors_keep_status() {
        let (status, body) = call("/teapot").await;
        assert_eq!(status, StatusCode::IM_A_TEAPOT);
        assert_eq!(body["statusCode"], 418);
        assert_eq!(body["status"], "I'm a teapot");
    }
}
