//! Type-state server shell.

use std::io;
use std::net::SocketAddr;

use actix_web::dev::{Server, ServerHandle};
use actix_web::{HttpServer, web};
use tracing::{error, info, warn};

use crate::domain::UserService;
use crate::inbound::http::health::HealthState;
use crate::inbound::ws::channel::RealtimeChannel;
use crate::inbound::ws::state::{RealtimeSlot, WsState};

use crate::middleware::ErrorBoundary;

use super::{AppDependencies, SecurityLayer, ServerConfig, StandardLayer, build_app};

/// Initial state: nothing configured.
pub struct Created;

/// Session, parameter pollution, header and CORS middleware recorded.
pub struct SecurityConfigured {
    security: SecurityLayer,
}

/// Compression and body limits recorded.
pub struct StandardConfigured {
    security: SecurityLayer,
    standard: StandardLayer,
}

/// Terminal error handler recorded; ready to listen.
pub struct ErrorBoundaryAttached {
    security: SecurityLayer,
    standard: StandardLayer,
    boundary: ErrorBoundary,
}

/// Server under construction; `S` is the current lifecycle state.
pub struct ServerShell<S> {
    config: ServerConfig,
    health: web::Data<HealthState>,
    realtime: RealtimeSlot,
    user_service: Option<web::Data<UserService>>,
    state: S,
}

impl<S> ServerShell<S> {
    fn advance<T>(self, next: impl FnOnce(S) -> T) -> ServerShell<T> {
        ServerShell {
            config: self.config,
            health: self.health,
            realtime: self.realtime,
            user_service: self.user_service,
            state: next(self.state),
        }
    }

    /// Shared health state reported by the probes.
    pub fn health(&self) -> web::Data<HealthState> {
        self.health.clone()
    }
}

impl ServerShell<Created> {
    /// Start building a server from `config`.
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            health: web::Data::new(HealthState::new()),
            realtime: RealtimeSlot::new(),
            user_service: None,
            state: Created,
        }
    }

    /// Expose `service` to handlers as `web::Data<UserService>`.
    #[must_use]
    pub fn with_user_service(mut self, service: UserService) -> Self {
        self.user_service = Some(web::Data::new(service));
        self
    }

    /// Share an existing real-time slot, e.g. one a notifier already holds.
    #[must_use]
    pub fn with_realtime_slot(mut self, slot: RealtimeSlot) -> Self {
        self.realtime = slot;
        self
    }

    /// Record the security middleware: cookie session, query parameter
    /// pollution guard, header hardening and CORS for the client origin.
    pub fn configure_security(self) -> ServerShell<SecurityConfigured> {
        let security = SecurityLayer {
            key: self.config.key.clone(),
            cookie_secure: self.config.cookie_secure,
            allowed_origin: self.config.allowed_origin(),
        };
        info!(
            origin = %security.allowed_origin,
            cookie_secure = security.cookie_secure,
            "security middleware configured"
        );
        self.advance(|Created| SecurityConfigured { security })
    }
}

impl ServerShell<SecurityConfigured> {
    /// Record the standard middleware: compression and 50 MB body limits.
    pub fn configure_standard(self) -> ServerShell<StandardConfigured> {
        info!("standard middleware configured");
        self.advance(|SecurityConfigured { security }| StandardConfigured {
            security,
            standard: StandardLayer::new(),
        })
    }
}

impl ServerShell<StandardConfigured> {
    /// Record the not-found fallback and terminal error handler.
    pub fn attach_error_boundary(self) -> ServerShell<ErrorBoundaryAttached> {
        info!("error boundary attached");
        self.advance(|StandardConfigured { security, standard }| ErrorBoundaryAttached {
            security,
            standard,
            boundary: ErrorBoundary,
        })
    }
}

impl ServerShell<ErrorBoundaryAttached> {
    pub(super) fn app_dependencies(&self) -> AppDependencies {
        AppDependencies {
            health_state: self.health.clone(),
            ws_state: web::Data::new(WsState::new(
                self.realtime.clone(),
                self.config.client_url.clone(),
            )),
            user_service: self.user_service.clone(),
            security: self.state.security.clone(),
            standard: self.state.standard.clone(),
            boundary: self.state.boundary,
        }
    }

    /// Bind the listener and start serving.
    ///
    /// # Errors
    ///
    /// Returns [`io::Error`] when binding the socket fails.
    pub fn listen(self) -> io::Result<ListeningServer> {
        let deps = self.app_dependencies();

        let http = HttpServer::new(move || build_app(deps.clone()));
        let http = match self.config.workers {
            Some(workers) => http.workers(workers),
            None => http,
        };
        let http = http.bind(self.config.bind_addr)?;
        let addrs = http.addrs();
        let server = http.run();

        self.health.mark_ready();
        let port = addrs.first().map_or(self.config.bind_addr.port(), SocketAddr::port);
        let pid = std::process::id();
        info!(pid, "server has started with process {pid}");
        info!(port, "server running at {port}");

        Ok(ListeningServer {
            handle: server.handle(),
            server,
            addrs,
            health: self.health,
            realtime: self.realtime,
        })
    }
}

/// Run every step in order and start listening.
///
/// # Errors
///
/// Returns [`io::Error`] when binding the socket fails.
pub fn start(shell: ServerShell<Created>) -> io::Result<ListeningServer> {
    shell
        .configure_security()
        .configure_standard()
        .attach_error_boundary()
        .listen()
}

/// A bound server, possibly still waiting for its real-time channel.
pub struct ListeningServer {
    server: Server,
    handle: ServerHandle,
    addrs: Vec<SocketAddr>,
    health: web::Data<HealthState>,
    realtime: RealtimeSlot,
}

impl ListeningServer {
    /// Addresses the listener is bound to.
    pub fn addrs(&self) -> &[SocketAddr] {
        &self.addrs
    }

    /// Handle for stopping the server.
    pub fn handle(&self) -> ServerHandle {
        self.handle.clone()
    }

    /// Shared health state.
    pub fn health(&self) -> web::Data<HealthState> {
        self.health.clone()
    }

    /// Handle for installing the real-time channel while the server runs.
    pub fn realtime(&self) -> RealtimeAttacher {
        RealtimeAttacher {
            slot: self.realtime.clone(),
            health: self.health.clone(),
        }
    }

    /// Install the real-time channel. See [`RealtimeAttacher::attach`].
    pub fn attach_realtime(&self, channel: RealtimeChannel) -> bool {
        self.realtime().attach(channel)
    }

    /// Whether the real-time channel has been attached.
    pub fn realtime_attached(&self) -> bool {
        self.health.is_realtime_attached()
    }

    /// Drive the server until it stops.
    ///
    /// # Errors
    ///
    /// Propagates the server's I/O error.
    pub async fn run(self) -> io::Result<()> {
        let result = self.server.await;
        self.health.mark_unhealthy();
        result
    }
}

/// Installs the real-time channel into a running server.
#[derive(Clone)]
pub struct RealtimeAttacher {
    slot: RealtimeSlot,
    health: web::Data<HealthState>,
}

impl RealtimeAttacher {
    /// Install `channel` and mark the real-time probe healthy.
    ///
    /// Returns `false` if a channel was already attached; `channel` is then
    /// dropped. The probe turns unhealthy again if the channel's relay stops.
    pub fn attach(&self, channel: RealtimeChannel) -> bool {
        let node = channel.node();
        let relay_stopped = channel.relay_stopped();
        if self.slot.attach(channel).is_err() {
            warn!(%node, "real-time channel already attached; ignoring replacement");
            return false;
        }
        self.health.mark_realtime_attached();
        info!(%node, "real-time channel attached");

        let health = self.health.clone();
        tokio::spawn(async move {
            relay_stopped.await;
            health.mark_realtime_lost();
            error!(%node, "real-time relay stopped; real-time probe now failing");
        });
        true
    }

    /// Whether a channel is attached.
    pub fn is_attached(&self) -> bool {
        self.health.is_realtime_attached()
    }
}
