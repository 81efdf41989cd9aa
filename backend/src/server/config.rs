//! HTTP server configuration object and helpers.

use std::net::SocketAddr;

use actix_web::cookie::Key;
use url::Url;

use crate::config::AppConfig;

/// Settings the server shell needs from the process configuration.
#[derive(Clone)]
pub struct ServerConfig {
    pub(crate) key: Key,
    pub(crate) cookie_secure: bool,
    pub(crate) bind_addr: SocketAddr,
    pub(crate) client_url: Url,
    pub(crate) workers: Option<usize>,
}

impl ServerConfig {
    /// Construct a server configuration from explicit values.
    #[must_use]
    pub fn new(key: Key, cookie_secure: bool, bind_addr: SocketAddr, client_url: Url) -> Self {
        Self {
            key,
            cookie_secure,
            bind_addr,
            client_url,
            workers: None,
        }
    }

    /// Override the number of worker threads (defaults to one per core).
    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = Some(workers);
        self
    }

    /// Derive the server settings from validated process configuration.
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self::new(
            config.session_key.clone(),
            config.cookie_secure(),
            config.bind_addr(),
            config.client_url.clone(),
        )
    }

    /// Return the socket address the server will bind to.
    #[must_use]
    pub fn bind_addr(&self) -> SocketAddr {
        self.bind_addr
    }

    /// The single origin allowed for CORS and WebSocket upgrades, e.g.
    /// `http://localhost:3000`.
    #[must_use]
    pub fn allowed_origin(&self) -> String {
        self.client_url.origin().ascii_serialization()
    }
}
