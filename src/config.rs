use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use anyhow::{Context, Result};

/// The service's configuration.
#[derive(Clone, Debug)]
pub struct Config {
    /// The loopback address the RPC transport listens on.
    pub bind_addr: SocketAddr,
    /// Where the password-hash record is persisted.
    pub password_file: PathBuf,
    /// Authentication calls allowed in a burst per peer.
    pub auth_burst: u32,
    /// Milliseconds to replenish one authentication call.
    pub auth_replenish_ms: u64,
    /// The maximum accepted request body size.
    pub body_limit_bytes: usize,
    /// Seconds a session lives before it is treated as closed.
    pub session_max_age_secs: u64,
    /// Seconds between sweeps of expired sessions.
    pub session_sweep_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 7171)),
            password_file: PathBuf::from("./secret-service.passwd"),
            auth_burst: 20,
            auth_replenish_ms: 500,
            body_limit_bytes: 1024 * 1024,
            session_max_age_secs: 60 * 60,
            session_sweep_secs: 60,
        }
    }
}

impl Config {
    /// Creates a new `Config` from environment variables.
    ///
    /// Unset variables fall back to `Config::default()`.
    ///
    /// # Returns
    ///
    /// A `Result` containing the `Config`.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        Ok(Self {
            bind_addr: match env::var("SECRETS_BIND_ADDR") {
                Ok(v) => v.parse().context("Invalid SECRETS_BIND_ADDR")?,
                Err(_) => defaults.bind_addr,
            },
            password_file: env::var("SECRETS_PASSWORD_FILE")
                .map(PathBuf::from)
                .unwrap_or(defaults.password_file),
            auth_burst: match env::var("SECRETS_AUTH_BURST") {
                Ok(v) => v.parse().context("Invalid SECRETS_AUTH_BURST")?,
                Err(_) => defaults.auth_burst,
            },
            auth_replenish_ms: match env::var("SECRETS_AUTH_REPLENISH_MS") {
                Ok(v) => v.parse().context("Invalid SECRETS_AUTH_REPLENISH_MS")?,
                Err(_) => defaults.auth_replenish_ms,
            },
            body_limit_bytes: match env::var("SECRETS_BODY_LIMIT_BYTES") {
                Ok(v) => v.parse().context("Invalid SECRETS_BODY_LIMIT_BYTES")?,
                Err(_) => defaults.body_limit_bytes,
            },
            session_max_age_secs: match env::var("SECRETS_SESSION_MAX_AGE_SECS") {
                Ok(v) => v.parse().context("Invalid SECRETS_SESSION_MAX_AGE_SECS")?,
                Err(_) => defaults.session_max_age_secs,
            },
            session_sweep_secs: match env::var("SECRETS_SESSION_SWEEP_SECS") {
                Ok(v) => v.parse().context("Invalid SECRETS_SESSION_SWEEP_SECS")?,
                Err(_) => defaults.session_sweep_secs,
            },
        })
    }
}
