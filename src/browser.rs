//! Headless browser navigation for search result pages.
//!
//! This module is only available when the `headless` Cargo feature is enabled.
//! Search engines serve bot-detection pages to plain HTTP clients far more
//! often than to a real browser, so result pages are rendered in
//! Chrome/Chromium via the Chrome DevTools Protocol.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::Page;
use futures::StreamExt;
use tokio::sync::{Mutex, Semaphore};
use tracing::{debug, warn};

use crate::navigator::{Navigator, PageResponse};
use crate::{Error, Result};

/// Configuration for the browser pool.
#[derive(Debug, Clone)]
pub struct BrowserPoolConfig {
    /// Maximum number of concurrent browser tabs.
    pub max_tabs: usize,
    /// Whether to run the browser in headless mode.
    pub headless: bool,
    /// Path to the Chrome/Chromium executable. If `None`, auto-detected.
    pub chrome_path: Option<String>,
    /// Proxy URL for the browser to use.
    pub proxy_url: Option<String>,
}

impl Default for BrowserPoolConfig {
    fn default() -> Self {
        Self {
            max_tabs: 4,
            headless: true,
            chrome_path: None,
            proxy_url: None,
        }
    }
}

/// A single lazily launched browser process with a cap on open tabs.
pub struct BrowserPool {
    config: BrowserPoolConfig,
    browser: Mutex<Option<Arc<Browser>>>,
    tab_semaphore: Arc<Semaphore>,
}

impl BrowserPool {
    /// Creates a new browser pool with the given configuration.
    pub fn new(config: BrowserPoolConfig) -> Self {
        let max_tabs = config.max_tabs.max(1);
        Self {
            config,
            browser: Mutex::new(None),
            tab_semaphore: Arc::new(Semaphore::new(max_tabs)),
        }
    }

    /// Returns the tab semaphore for acquiring permits before opening tabs.
    pub fn tab_semaphore(&self) -> &Arc<Semaphore> {
        &self.tab_semaphore
    }

    /// Lazily launches the browser and returns a shared handle.
    pub async fn acquire_browser(&self) -> Result<Arc<Browser>> {
        let mut guard = self.browser.lock().await;

        if let Some(ref browser) = *guard {
            return Ok(Arc::clone(browser));
        }

        debug!("Launching headless browser");

        let mut builder = BrowserConfig::builder();

        if self.config.headless {
            builder = builder.arg("--headless=new");
        }

        if let Some(ref path) = self.config.chrome_path {
            builder = builder.chrome_executable(path);
        } else {
            let chrome_path = crate::browser_setup::ensure_chrome().await?;
            debug!("Using Chrome at: {}", chrome_path.display());
            builder = builder.chrome_executable(chrome_path);
        }

        // --headless=new puts "HeadlessChrome" in the UA, which search engines block.
        builder = builder
            .arg(
                "--user-agent=Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
                 AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
            )
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .arg("--mute-audio")
            .arg("--no-first-run");

        if let Some(ref proxy) = self.config.proxy_url {
            builder = builder.arg(format!("--proxy-server={}", proxy));
        }

        let browser_config = builder
            .build()
            .map_err(|e| Error::Browser(format!("Failed to build browser config: {}", e)))?;

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| Error::Browser(format!("Failed to launch browser: {}", e)))?;

        tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    warn!("Browser CDP handler error: {}", e);
                }
            }
            debug!("Browser CDP handler exited");
        });

        let browser = Arc::new(browser);
        *guard = Some(Arc::clone(&browser));

        Ok(browser)
    }

    /// Shuts down the browser process.
    pub async fn shutdown(&self) {
        let mut guard = self.browser.lock().await;
        if guard.take().is_some() {
            debug!("Browser pool shut down");
        }
    }
}

/// A [`Navigator`] that renders pages in a headless browser tab.
///
/// Each navigation opens a tab, loads the URL, reads the main document's
/// HTTP status from the navigation response, extracts the rendered HTML and
/// closes the tab. The whole sequence is bounded by the navigation timeout.
pub struct BrowserNavigator {
    pool: Arc<BrowserPool>,
}

impl BrowserNavigator {
    /// Creates a navigator that opens its tabs in `pool`.
    pub fn new(pool: Arc<BrowserPool>) -> Self {
        Self { pool }
    }

    /// Loads `url` in `page` and reads the main document status and HTML.
    async fn load(page: &Page, url: &str) -> Result<Option<PageResponse>> {
        page.goto(url)
            .await
            .map_err(|e| Error::Browser(format!("Navigation to {} failed: {}", url, e)))?;

        let request = page
            .wait_for_navigation_response()
            .await
            .map_err(|e| Error::Browser(format!("Navigation wait failed: {}", e)))?;

        let status = request
            .as_ref()
            .and_then(|req| req.response.as_ref())
            .map(|resp| resp.status);

        let Some(status) = status else {
            return Ok(None);
        };

        let html = page
            .content()
            .await
            .map_err(|e| Error::Browser(format!("Failed to get page content: {}", e)))?;

        Ok(Some(PageResponse::new(
            u16::try_from(status).unwrap_or(0),
            html.into_bytes(),
        )))
    }
}

#[async_trait]
impl Navigator for BrowserNavigator {
    async fn navigate(&self, url: &str, timeout: Duration) -> Result<Option<PageResponse>> {
        let _permit = self
            .pool
            .tab_semaphore()
            .acquire()
            .await
            .map_err(|e| Error::Browser(format!("Tab semaphore closed: {}", e)))?;

        let browser = self.pool.acquire_browser().await?;

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| Error::Browser(format!("Failed to open tab: {}", e)))?;

        let outcome = tokio::time::timeout(timeout, Self::load(&page, url)).await;

        // Close the tab (best-effort, don't fail the navigation)
        if let Err(e) = page.close().await {
            warn!("Failed to close browser tab: {}", e);
        }

        match outcome {
            Ok(result) => result,
            Err(_) => Err(Error::Browser(format!(
                "Navigation to {} timed out after {:?}",
                url, timeout
            ))),
        }
    }
}
