//! Server construction and middleware wiring.
//!
//! [`ServerShell`] walks a fixed sequence of states: security middleware,
//! then standard middleware, then the error boundary, then listening. Each
//! step consumes the previous state, so the order cannot be changed or
//! skipped. The resulting [`ListeningServer`] accepts the real-time channel
//! once it has been created.

mod config;
mod shell;

pub use config::ServerConfig;
pub use shell::{
    Created, ErrorBoundaryAttached, ListeningServer, RealtimeAttacher, SecurityConfigured,
    ServerShell, StandardConfigured, start,
};

use actix_cors::Cors;
use actix_session::{SessionMiddleware, config::PersistentSession, storage::CookieSessionStore};
use actix_web::body::MessageBody;
use actix_web::cookie::{Key, time::Duration as CookieDuration};
use actix_web::dev::{ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::middleware::{Compress, from_fn};
use actix_web::{App, http::Method, web};

use crate::Trace;
use crate::domain::UserService;
use crate::inbound::http::body_limits::{form_config, json_config, payload_config};
use crate::inbound::http::fallback::not_found;
use crate::inbound::http::health::{HealthState, live, ready, realtime};
use crate::inbound::ws;
use crate::inbound::ws::state::WsState;
use crate::middleware::{ErrorBoundary, parameter_pollution, security_headers};

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "session";

/// Session cookie lifetime.
pub const SESSION_TTL_DAYS: i64 = 7;

/// Methods accepted from the configured client origin.
pub const CORS_METHODS: [Method; 5] = [
    Method::GET,
    Method::POST,
    Method::PUT,
    Method::DELETE,
    Method::OPTIONS,
];

/// Security layer settings recorded by [`ServerShell::configure_security`].
#[derive(Clone)]
pub(crate) struct SecurityLayer {
    key: Key,
    cookie_secure: bool,
    allowed_origin: String,
}

/// Extractor limits recorded by [`ServerShell::configure_standard`].
#[derive(Clone)]
pub(crate) struct StandardLayer {
    json: web::JsonConfig,
    /// Constructor rather than value: `FormConfig` is not `Send`, so it is
    /// built inside each worker's app factory.
    form: fn() -> web::FormConfig,
    payload: web::PayloadConfig,
}

impl StandardLayer {
    fn new() -> Self {
        Self {
            json: json_config(),
            form: form_config,
            payload: payload_config(),
        }
    }
}

#[derive(Clone)]
struct AppDependencies {
    health_state: web::Data<HealthState>,
    ws_state: web::Data<WsState>,
    user_service: Option<web::Data<UserService>>,
    security: SecurityLayer,
    standard: StandardLayer,
    boundary: ErrorBoundary,
}

fn cors(allowed_origin: &str) -> Cors {
    Cors::default()
        .allowed_origin(allowed_origin)
        .allowed_methods(CORS_METHODS)
        .allow_any_header()
        .supports_credentials()
}

fn session(security: &SecurityLayer) -> SessionMiddleware<CookieSessionStore> {
    SessionMiddleware::builder(CookieSessionStore::default(), security.key.clone())
        .cookie_name(SESSION_COOKIE.to_owned())
        .cookie_path("/".to_owned())
        .cookie_secure(security.cookie_secure)
        .cookie_http_only(true)
        .session_lifecycle(
            PersistentSession::default().session_ttl(CookieDuration::days(SESSION_TTL_DAYS)),
        )
        .build()
}

/// Assemble the application. `wrap` order is innermost first: the error
/// boundary sits next to the handlers and tracing is outermost.
fn build_app(
    deps: AppDependencies,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse<impl MessageBody>,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    let AppDependencies {
        health_state,
        ws_state,
        user_service,
        security,
        standard,
        boundary,
    } = deps;

    let app = App::new()
        .app_data(health_state)
        .app_data(ws_state)
        .app_data(standard.json)
        .app_data((standard.form)())
        .app_data(standard.payload);
    let app = match user_service {
        Some(service) => app.app_data(service),
        None => app,
    };

    app.wrap(boundary)
        .wrap(Compress::default())
        .wrap(cors(&security.allowed_origin))
        .wrap(security_headers())
        .wrap(from_fn(parameter_pollution))
        .wrap(session(&security))
        .wrap(Trace)
        .service(ws::ws_entry)
        .service(ready)
        .service(live)
        .service(realtime)
        .default_service(web::to(not_found))
}

#[cfg(test)]
mod tests;
