//! Process configuration loaded via OrthoConfig.
//!
//! Raw settings come from `TODO_*` environment variables (or matching CLI
//! flags) as [`AppSettings`]. [`AppSettings::validate`] turns them into an
//! [`AppConfig`] with every required value present and parsed; startup aborts
//! on any [`ConfigError`].

use std::fmt;
use std::net::{Ipv4Addr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use actix_web::cookie::Key;
use ortho_config::OrthoConfig;
use serde::Deserialize;
use url::Url;
use zeroize::Zeroize;

use crate::outbound::persistence::ReconnectBackoff;

/// Minimum combined length of the two session secrets, in bytes.
pub const SESSION_SECRET_MIN_LEN: usize = 32;

/// Errors raised while loading or validating configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// Sources could not be read or merged.
    #[error("failed to load configuration: {0}")]
    Load(String),
    /// A required value is absent.
    #[error("missing required setting: {name}")]
    Missing { name: &'static str },
    /// A value is present but invalid.
    #[error("invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Deployment environment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Environment {
    /// Local development; session cookies are not marked `Secure`.
    #[default]
    Development,
    /// Production deployment.
    Production,
    /// Automated test runs.
    Test,
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" => Ok(Self::Development),
            "production" => Ok(Self::Production),
            "test" => Ok(Self::Test),
            other => Err(ConfigError::Invalid {
                name: "environment",
                reason: format!("expected development|production|test, got '{other}'"),
            }),
        }
    }
}

/// Raw settings as read from the environment.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "TODO")]
pub struct AppSettings {
    /// PostgreSQL connection string.
    pub database_url: Option<String>,
    /// First session secret.
    pub secret_key_one: Option<String>,
    /// Second session secret.
    pub secret_key_two: Option<String>,
    /// `development`, `production` or `test`.
    pub environment: Option<String>,
    /// Browser client URL; the only allowed cross-origin caller.
    pub client_url: Option<String>,
    /// HTTP listen port.
    #[ortho_config(default = 5000)]
    pub server_port: u16,
    /// Redis host for the real-time fan-out.
    pub redis_host: Option<String>,
    /// First reconnect delay in milliseconds.
    #[ortho_config(default = 200)]
    pub reconnect_initial_ms: u64,
    /// Reconnect delay cap in milliseconds.
    #[ortho_config(default = 30_000)]
    pub reconnect_max_ms: u64,
    /// Seconds between database liveness probes.
    #[ortho_config(default = 5)]
    pub probe_interval_secs: u64,
}

fn required(value: Option<String>, name: &'static str) -> Result<String, ConfigError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or(ConfigError::Missing { name })
}

impl AppSettings {
    /// Validate raw settings into an [`AppConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] naming the first missing or invalid setting.
    pub fn validate(self) -> Result<AppConfig, ConfigError> {
        let database_url = required(self.database_url, "database_url")?;
        let secret_one = required(self.secret_key_one, "secret_key_one")?;
        let secret_two = required(self.secret_key_two, "secret_key_two")?;
        let session_key = derive_session_key(secret_one, secret_two)?;
        let environment = self
            .environment
            .as_deref()
            .map_or(Ok(Environment::default()), str::parse)?;
        let client_url = required(self.client_url, "client_url")?;
        let client_url = Url::parse(&client_url).map_err(|err| ConfigError::Invalid {
            name: "client_url",
            reason: err.to_string(),
        })?;
        let redis_host = required(self.redis_host, "redis_host")?;
        if self.probe_interval_secs == 0 {
            return Err(ConfigError::Invalid {
                name: "probe_interval_secs",
                reason: String::from("must be greater than zero"),
            });
        }

        Ok(AppConfig {
            database_url,
            session_key,
            environment,
            client_url,
            server_port: self.server_port,
            redis_host,
            backoff: ReconnectBackoff::new(
                Duration::from_millis(self.reconnect_initial_ms),
                Duration::from_millis(self.reconnect_max_ms),
            ),
            probe_interval: Duration::from_secs(self.probe_interval_secs),
        })
    }
}

/// Derive the cookie signing and encryption key from both secrets.
///
/// The secrets are concatenated in order; the buffers are zeroised once the
/// key is derived.
fn derive_session_key(mut one: String, mut two: String) -> Result<Key, ConfigError> {
    let mut material = Vec::with_capacity(one.len() + two.len());
    material.extend_from_slice(one.as_bytes());
    material.extend_from_slice(two.as_bytes());
    one.zeroize();
    two.zeroize();

    if material.len() < SESSION_SECRET_MIN_LEN {
        let length = material.len();
        material.zeroize();
        return Err(ConfigError::Invalid {
            name: "secret_key_one/secret_key_two",
            reason: format!(
                "combined secrets must be at least {SESSION_SECRET_MIN_LEN} bytes, got {length}"
            ),
        });
    }

    let key = Key::derive_from(&material);
    material.zeroize();
    Ok(key)
}

/// Validated process configuration.
#[derive(Clone)]
pub struct AppConfig {
    /// PostgreSQL connection string.
    pub database_url: String,
    /// Cookie session key.
    pub session_key: Key,
    /// Deployment environment.
    pub environment: Environment,
    /// Allowed browser origin.
    pub client_url: Url,
    /// HTTP listen port.
    pub server_port: u16,
    /// Redis host for the real-time fan-out.
    pub redis_host: String,
    /// Delay policy between failed reconnects.
    pub backoff: ReconnectBackoff,
    /// Interval between database liveness probes.
    pub probe_interval: Duration,
}

impl AppConfig {
    /// Load settings from the process environment and arguments, then
    /// validate them.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load() -> Result<Self, ConfigError> {
        AppSettings::load()
            .map_err(|err| ConfigError::Load(err.to_string()))?
            .validate()
    }

    /// Whether session cookies carry the `Secure` attribute.
    pub fn cookie_secure(&self) -> bool {
        self.environment != Environment::Development
    }

    /// Socket address the HTTP server binds to.
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::from((Ipv4Addr::UNSPECIFIED, self.server_port))
    }
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("database_url", &"<redacted>")
            .field("session_key", &"<redacted>")
            .field("environment", &self.environment)
            .field("client_url", &self.client_url.as_str())
            .field("server_port", &self.server_port)
            .field("redis_host", &self.redis_host)
            .field("backoff", &self.backoff)
            .field("probe_interval", &self.probe_interval)
            .finish()
    }
}
