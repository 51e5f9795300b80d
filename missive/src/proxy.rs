//! Interface for the optional authenticated SOCKS module.
//!
//! SMTP clients rarely speak authenticated SOCKS5. A module implementing
//! [`AuthenticatedSocksModule`] bridges the gap: it starts an anonymous SOCKS5
//! server on localhost that relays to the real, authenticated proxy. Nothing
//! in this crate implements the module; it is loaded by whatever transports
//! the mail.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("Invalid proxy configuration for {field}: {reason}")]
    InvalidConfiguration { field: &'static str, reason: String },

    #[error("Proxy bridge I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ProxyError>;

/// Connection details of the remote SOCKS5 proxy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyConfig {
    pub remote_host: String,
    pub remote_port: u16,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<String>,

    /// Local port of the anonymous bridge, needed when authenticating.
    #[serde(default)]
    pub proxy_bridge_port: Option<u16>,
}

impl ProxyConfig {
    #[must_use]
    pub const fn requires_authentication(&self) -> bool {
        self.username.is_some()
    }

    /// Checks that the configuration is usable.
    ///
    /// # Errors
    ///
    /// Returns [`ProxyError::InvalidConfiguration`] if the host is empty, a
    /// port is zero, only one of username and password is set, or an
    /// authenticated proxy has no bridge port.
    pub fn validate(&self) -> Result<()> {
        let invalid = |field, reason: &str| {
            Err(ProxyError::InvalidConfiguration {
                field,
                reason: reason.to_string(),
            })
        };

        if self.remote_host.trim().is_empty() {
            return invalid("remote_host", "must not be empty");
        }
        if self.remote_port == 0 {
            return invalid("remote_port", "must not be zero");
        }

        match (&self.username, &self.password) {
            (Some(_), None) => return invalid("password", "required when a username is set"),
            (None, Some(_)) => return invalid("username", "required when a password is set"),
            _ => {}
        }

        if self.requires_authentication() {
            match self.proxy_bridge_port {
                None => return invalid("proxy_bridge_port", "required for authenticated proxies"),
                Some(0) => return invalid("proxy_bridge_port", "must not be zero"),
                Some(_) => {}
            }
        }

        Ok(())
    }
}

/// A local SOCKS5 server without authentication, relaying to the remote
/// proxy.
pub trait AnonymousSocks5Server: Send {
    /// Starts accepting connections.
    ///
    /// # Errors
    ///
    /// Returns [`ProxyError::Io`] if the server cannot bind or start.
    fn start(&mut self) -> Result<()>;

    fn stop(&mut self);

    fn is_running(&self) -> bool;
}

/// Factory for anonymous bridges to an authenticated proxy.
pub trait AuthenticatedSocksModule {
    const NAME: &'static str = "Authenticated socks module";

    /// Creates, but does not start, a bridge for `config`.
    ///
    /// # Errors
    ///
    /// Returns [`ProxyError::InvalidConfiguration`] if `config` cannot be
    /// bridged.
    fn create_anonymous_socks5_server(
        &self,
        config: &ProxyConfig,
    ) -> Result<Box<dyn AnonymousSocks5Server>>;
}
