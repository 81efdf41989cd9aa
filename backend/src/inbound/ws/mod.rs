//! WebSocket inbound adapter pushing real-time events to clients.
//!
//! Responsibilities:
//! - validate upgrade requests against the configured client origin
//! - refuse upgrades while the real-time channel is not attached
//! - run the per-connection session loop

use actix_web::web::{self, Payload};
use actix_web::{
    HttpRequest, HttpResponse, get,
    http::header::{HeaderValue, ORIGIN},
};
use tracing::{error, warn};
use url::{Origin, Url};

use crate::domain::{AppError, AppResult};

pub mod channel;
pub mod notifier;
mod session;
pub mod state;

pub use channel::{RealtimeChannel, RealtimeError};
pub use notifier::RealtimeNotifier;
pub use state::{RealtimeSlot, WsState};

/// Handle WebSocket upgrade for the `/ws` endpoint.
#[get("/ws")]
pub async fn ws_entry(
    state: web::Data<WsState>,
    req: HttpRequest,
    stream: Payload,
) -> AppResult<HttpResponse> {
    let mut origin_iter = req.headers().get_all(ORIGIN);
    let origin_header = origin_iter.next().ok_or_else(|| {
        error!("missing Origin header on WebSocket upgrade");
        AppError::forbidden("Origin not allowed")
    })?;
    if origin_iter.next().is_some() {
        error!("multiple Origin headers on WebSocket upgrade");
        return Err(AppError::bad_request("Invalid Origin header"));
    }

    validate_origin(origin_header, &state.allowed_origin)?;

    let Some(channel) = state.realtime.get() else {
        warn!("WebSocket upgrade refused; real-time channel not attached");
        return Err(AppError::service_unavailable("real-time channel unavailable"));
    };
    let events = channel.subscribe();

    let (response, session, messages) = actix_ws::handle(&req, stream).map_err(|error| {
        warn!(error = %error, "WebSocket upgrade failed");
        AppError::bad_request("WebSocket upgrade failed")
    })?;
    actix_web::rt::spawn(session::handle_ws_session(events, session, messages));
    Ok(response)
}

fn validate_origin(origin_header: &HeaderValue, allowed: &Url) -> AppResult<()> {
    let origin_value = origin_header.to_str().map_err(|error| {
        error!(error = %error, "failed to parse Origin header as string");
        AppError::bad_request("Invalid Origin header")
    })?;

    let origin = Url::parse(origin_value).map_err(|error| {
        error!(error = %error, "failed to parse Origin header as URL");
        AppError::bad_request("Invalid Origin header")
    })?;

    if is_allowed_origin(&origin, allowed) {
        Ok(())
    } else {
        warn!(
            origin = origin_value,
            "rejected WS upgrade due to disallowed Origin"
        );
        Err(AppError::forbidden("Origin not allowed"))
    }
}

/// Returns true when `origin` has the same scheme, host and port as the
/// configured client URL. Opaque origins never match.
fn is_allowed_origin(origin: &Url, allowed: &Url) -> bool {
    let origin = origin.origin();
    matches!(origin, Origin::Tuple(..)) && origin == allowed.origin()
}
