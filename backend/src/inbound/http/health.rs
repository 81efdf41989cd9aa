//! Health endpoints: liveness, readiness and real-time attachment probes.

use actix_web::{HttpResponse, get, http::header, web};
use std::sync::atomic::{AtomicBool, Ordering};

/// Shared health state for orchestrator probes.
///
/// Tracks readiness, liveness and whether the real-time channel has been
/// attached. The shell marks the process ready once the listener is bound;
/// the real-time flag is set only after the fan-out adapter is installed.
pub struct HealthState {
    ready: AtomicBool,
    live: AtomicBool,
    realtime: AtomicBool,
}

impl Default for HealthState {
    fn default() -> Self {
        Self {
            ready: AtomicBool::new(false),
            live: AtomicBool::new(true),
            realtime: AtomicBool::new(false),
        }
    }
}

impl HealthState {
    /// Create a new health state starting as live, not ready, and without a
    /// real-time channel.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the service as ready.
    pub fn mark_ready(&self) {
        self.ready.store(true, Ordering::Release);
    }

    /// Flag the service as unhealthy so liveness checks fail fast during shutdown.
    pub fn mark_unhealthy(&self) {
        self.live.store(false, Ordering::Release);
    }

    /// Record that the real-time channel is attached.
    pub fn mark_realtime_attached(&self) {
        self.realtime.store(true, Ordering::Release);
    }

    /// Record that the real-time channel stopped relaying from other processes.
    pub fn mark_realtime_lost(&self) {
        self.realtime.store(false, Ordering::Release);
    }

    /// Return readiness state.
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    /// Return liveness state.
    pub fn is_alive(&self) -> bool {
        self.live.load(Ordering::Acquire)
    }

    /// Whether the real-time channel is attached.
    pub fn is_realtime_attached(&self) -> bool {
        self.realtime.load(Ordering::Acquire)
    }

    fn probe_response(probe_ok: bool) -> HttpResponse {
        let mut response = if probe_ok {
            HttpResponse::Ok()
        } else {
            HttpResponse::ServiceUnavailable()
        };

        response
            .insert_header((header::CACHE_CONTROL, "no-store"))
            .finish()
    }
}

/// Readiness probe: 200 once the listener is bound, 503 before.
#[get("/health/ready")]
pub async fn ready(state: web::Data<HealthState>) -> HttpResponse {
    HealthState::probe_response(state.is_ready())
}

/// Liveness probe: 200 while alive, 503 once draining.
#[get("/health/live")]
pub async fn live(state: web::Data<HealthState>) -> HttpResponse {
    HealthState::probe_response(state.is_alive())
}

/// Real-time probe: 200 when the channel is attached, 503 otherwise.
#[get("/health/realtime")]
pub async fn realtime(state: web::Data<HealthState>) -> HttpResponse {
    HealthState::probe_response(state.is_realtime_attached())
}
