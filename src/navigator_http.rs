//! HTTP-based navigator using reqwest.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::navigator::{Navigator, PageResponse};
use crate::proxy::ProxyPool;
use crate::Result;

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

/// A navigator that issues plain HTTP GET requests.
///
/// Returns the raw response bytes, which makes it the right choice for
/// downloading documents. Search engines that need JavaScript rendering
/// should use `BrowserNavigator` instead. Each request is routed through
/// the next proxy of the pool.
pub struct HttpNavigator {
    proxies: ProxyPool,
    user_agent: String,
}

impl HttpNavigator {
    /// Creates a navigator without proxies.
    pub fn new() -> Self {
        Self::with_proxies(ProxyPool::default())
    }

    /// Creates a navigator rotating through `proxies`.
    pub fn with_proxies(proxies: ProxyPool) -> Self {
        Self {
            proxies,
            user_agent: USER_AGENT.to_string(),
        }
    }

    /// Sets a custom user agent.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

impl Default for HttpNavigator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Navigator for HttpNavigator {
    async fn navigate(&self, url: &str, timeout: Duration) -> Result<Option<PageResponse>> {
        let client = self.proxies.create_client(&self.user_agent, timeout)?;
        let response = client.get(url).send().await?;
        let status = response.status().as_u16();
        let content = response.bytes().await?;
        debug!("GET {} -> {} ({} bytes)", url, status, content.len());
        Ok(Some(PageResponse::new(status, content.to_vec())))
    }
}
