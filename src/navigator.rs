//! Page navigation abstraction shared by the search loop and the downloader.

use std::time::Duration;

use async_trait::async_trait;

use crate::Result;

/// Status and body of a completed navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageResponse {
    /// HTTP status code of the main document.
    pub status: u16,
    /// Raw response body (rendered HTML for browser navigations).
    pub content: Vec<u8>,
}

impl PageResponse {
    /// Creates a response from a status and body.
    pub fn new(status: u16, content: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            content: content.into(),
        }
    }

    /// Returns true for a `200 OK` response.
    pub fn is_ok(&self) -> bool {
        self.status == 200
    }

    /// Body decoded lossily as UTF-8.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.content).into_owned()
    }
}

/// Capability to load a URL and report its status and content.
///
/// `Ok(None)` means the navigation produced no response object at all
/// (for example the browser committed no document). Transport failures are
/// `Err`. All other configuration (proxies, user agent) is fixed when the
/// navigator is built.
#[async_trait]
pub trait Navigator: Send + Sync {
    /// Navigates to `url`, giving up after `timeout`.
    async fn navigate(&self, url: &str, timeout: Duration) -> Result<Option<PageResponse>>;
}
