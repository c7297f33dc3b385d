//! Proxy rotation for outgoing search and download requests.
//!
//! Proxies are accepted as configuration and handed through to the
//! navigators: the HTTP navigator rotates through the pool per request, the
//! headless browser is launched behind the first proxy.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use reqwest::{Client, Proxy as ReqwestProxy};
use tracing::debug;

use crate::{Error, Result};

/// Proxy protocol type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProxyProtocol {
    /// HTTP proxy
    #[default]
    Http,
    /// HTTPS proxy
    Https,
    /// SOCKS5 proxy
    Socks5,
}

impl ProxyProtocol {
    fn scheme(&self) -> &'static str {
        match self {
            ProxyProtocol::Http => "http",
            ProxyProtocol::Https => "https",
            ProxyProtocol::Socks5 => "socks5",
        }
    }

    fn default_port(&self) -> u16 {
        match self {
            ProxyProtocol::Http | ProxyProtocol::Https => 8080,
            ProxyProtocol::Socks5 => 1080,
        }
    }
}

/// A single proxy endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyConfig {
    /// Proxy host (IP or domain)
    pub host: String,
    /// Proxy port
    pub port: u16,
    /// Proxy protocol
    pub protocol: ProxyProtocol,
    /// Optional username for authentication
    pub username: Option<String>,
    /// Optional password for authentication
    pub password: Option<String>,
}

impl ProxyConfig {
    /// Creates an HTTP proxy configuration.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            protocol: ProxyProtocol::Http,
            username: None,
            password: None,
        }
    }

    /// Sets the proxy protocol.
    pub fn with_protocol(mut self, protocol: ProxyProtocol) -> Self {
        self.protocol = protocol;
        self
    }

    /// Sets authentication credentials.
    pub fn with_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Parses `scheme://[user:pass@]host[:port]`. A bare `host:port` is
    /// treated as an HTTP proxy.
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        let with_scheme = if raw.contains("://") {
            raw.to_string()
        } else {
            format!("http://{}", raw)
        };
        let url = url::Url::parse(&with_scheme)?;

        let protocol = match url.scheme() {
            "http" => ProxyProtocol::Http,
            "https" => ProxyProtocol::Https,
            "socks5" | "socks5h" => ProxyProtocol::Socks5,
            scheme => {
                return Err(Error::InvalidConfig(format!(
                    "Unsupported proxy protocol: {}",
                    scheme
                )))
            }
        };

        let host = url
            .host_str()
            .ok_or_else(|| Error::InvalidConfig(format!("Missing proxy host in '{}'", raw)))?;
        let port = url.port().unwrap_or(protocol.default_port());

        let mut config = ProxyConfig::new(host, port).with_protocol(protocol);
        if let Some(password) = url.password() {
            config = config.with_auth(url.username(), password);
        }
        Ok(config)
    }

    /// Returns the proxy URL string.
    pub fn url(&self) -> String {
        let scheme = self.protocol.scheme();
        match (&self.username, &self.password) {
            (Some(user), Some(pass)) => {
                format!("{}://{}:{}@{}:{}", scheme, user, pass, self.host, self.port)
            }
            _ => format!("{}://{}:{}", scheme, self.host, self.port),
        }
    }
}

/// A fixed set of proxies handed out round-robin.
#[derive(Debug, Default)]
pub struct ProxyPool {
    proxies: Vec<ProxyConfig>,
    current_index: AtomicUsize,
}

impl ProxyPool {
    /// Creates a pool from parsed proxies.
    pub fn with_proxies(proxies: Vec<ProxyConfig>) -> Self {
        Self {
            proxies,
            current_index: AtomicUsize::new(0),
        }
    }

    /// Parses every URL and builds a pool from them.
    pub fn from_urls<S: AsRef<str>>(urls: &[S]) -> Result<Self> {
        let proxies = urls
            .iter()
            .map(|u| ProxyConfig::parse(u.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::with_proxies(proxies))
    }

    /// Returns the number of proxies in the pool.
    pub fn len(&self) -> usize {
        self.proxies.len()
    }

    /// Returns whether the pool is empty.
    pub fn is_empty(&self) -> bool {
        self.proxies.is_empty()
    }

    /// First configured proxy, used where only one can be set.
    pub fn first(&self) -> Option<&ProxyConfig> {
        self.proxies.first()
    }

    /// Gets the next proxy in rotation.
    pub fn next_proxy(&self) -> Option<&ProxyConfig> {
        if self.proxies.is_empty() {
            return None;
        }
        let index = self.current_index.fetch_add(1, Ordering::SeqCst) % self.proxies.len();
        self.proxies.get(index)
    }

    /// Creates a reqwest client routed through the next proxy, if any.
    pub fn create_client(&self, user_agent: &str, timeout: Duration) -> Result<Client> {
        let mut builder = Client::builder().user_agent(user_agent).timeout(timeout);

        if let Some(proxy_config) = self.next_proxy() {
            debug!("Using proxy: {}:{}", proxy_config.host, proxy_config.port);
            let proxy = ReqwestProxy::all(proxy_config.url())
                .map_err(|e| Error::InvalidConfig(format!("Failed to create proxy: {}", e)))?;
            builder = builder.proxy(proxy);
        }

        Ok(builder.build()?)
    }
}
