//! Time-bounded result collection for one engine, target and file type.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::interrupt::Interrupt;
use crate::links::extract_links_from_bytes;
use crate::matcher::MatchPattern;
use crate::navigator::{Navigator, PageResponse};
use crate::timer::SearchTimer;
use crate::{Result, SearchConfig, SearchEngine};

/// Why a search session stopped paginating.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionEnd {
    /// The session timeout elapsed.
    Timeout,
    /// The configured result cap was reached.
    MaxResults,
    /// A navigation produced no response.
    NoResponse,
    /// The engine answered with a non-200 status.
    HttpStatus(u16),
    /// The navigation itself failed (transport error, browser error, timeout).
    NavigationFailed(String),
    /// The user interrupted the search.
    Interrupted,
}

impl fmt::Display for SessionEnd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionEnd::Timeout => f.write_str("timeout"),
            SessionEnd::MaxResults => f.write_str("max results reached"),
            SessionEnd::NoResponse => f.write_str("no response"),
            SessionEnd::HttpStatus(status) => write!(f, "HTTP {}", status),
            SessionEnd::NavigationFailed(e) => write!(f, "navigation failed: {}", e),
            SessionEnd::Interrupted => f.write_str("interrupted"),
        }
    }
}

/// Outcome of one search session.
///
/// The URL list is whatever was collected before the session ended; an
/// empty list is a valid outcome, not an error.
#[derive(Debug, Clone, Serialize)]
pub struct SearchSummary {
    /// Engine that was paginated.
    pub engine: SearchEngine,
    /// File type searched for.
    pub file_type: String,
    /// Matched URLs in discovery order, duplicates included.
    pub urls: Vec<String>,
    /// Number of result pages fetched.
    pub pages: usize,
    /// Reason the session ended.
    pub end: SessionEnd,
    /// Wall-clock time spent.
    pub duration_ms: u64,
}

/// Paginates one search engine and collects links to target documents.
pub struct FileSearch {
    config: SearchConfig,
    pattern: MatchPattern,
    navigator: Arc<dyn Navigator>,
}

impl FileSearch {
    /// Validates the configuration and compiles its match pattern.
    pub fn new(config: SearchConfig, navigator: Arc<dyn Navigator>) -> Result<Self> {
        config.validate()?;
        let pattern = MatchPattern::new(&config.target, &config.file_type)?;
        debug!("Match pattern for {}: {}", config.target, pattern.as_str());
        Ok(Self {
            config,
            pattern,
            navigator,
        })
    }

    /// Returns the session configuration.
    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Runs the session, stopping early once the user interrupts.
    pub async fn run(&self, interrupt: &Interrupt) -> SearchSummary {
        self.run_with_interrupt(interrupt.triggered()).await
    }

    /// Runs the session, stopping early once `interrupt` completes.
    ///
    /// The timer is checked once per page, so a slow navigation can overrun
    /// the timeout by up to one connection timeout.
    pub async fn run_with_interrupt<F>(&self, interrupt: F) -> SearchSummary
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(interrupt);

        let timer = SearchTimer::start(self.config.timeout_duration());
        let conn_timeout = self.config.connection_timeout_duration();
        let jitter = self.config.jitter_duration();
        let mut urls = Vec::new();
        let mut pages = 0;

        let end = loop {
            if !timer.is_running() {
                break SessionEnd::Timeout;
            }
            if self.config.max_results > 0 && urls.len() >= self.config.max_results {
                break SessionEnd::MaxResults;
            }

            let page_url = self.config.page_url(urls.len());
            let navigation = tokio::select! {
                biased;
                _ = &mut interrupt => None,
                nav = self.navigator.navigate(&page_url, conn_timeout) => Some(nav),
            };

            let response = match navigation {
                None => {
                    warn!("Search interrupted by user");
                    break SessionEnd::Interrupted;
                }
                Some(Ok(Some(response))) => response,
                Some(Ok(None)) => {
                    warn!("No response for URL: {}", page_url);
                    break SessionEnd::NoResponse;
                }
                Some(Err(e)) => {
                    warn!("Search request failed for {}: {}", page_url, e);
                    break SessionEnd::NavigationFailed(e.to_string());
                }
            };
            pages += 1;

            if !response.is_ok() {
                self.log_progress(urls.len(), &page_url, response.status);
                warn!("Non-200 response, exiting search ({})", response.status);
                break SessionEnd::HttpStatus(response.status);
            }

            self.collect_matches(&response, &mut urls);
            self.log_progress(urls.len(), &page_url, response.status);

            if !jitter.is_zero() {
                let interrupted = tokio::select! {
                    biased;
                    _ = &mut interrupt => true,
                    _ = tokio::time::sleep(jitter) => false,
                };
                if interrupted {
                    warn!("Search interrupted by user");
                    break SessionEnd::Interrupted;
                }
            }
        };

        timer.stop();
        debug!(
            "{} search for {} ({}) ended: {}",
            self.config.search_engine, self.config.target, self.config.file_type, end
        );

        SearchSummary {
            engine: self.config.search_engine,
            file_type: self.config.file_type.clone(),
            urls,
            pages,
            end,
            duration_ms: timer.elapsed().as_millis() as u64,
        }
    }

    fn collect_matches(&self, response: &PageResponse, urls: &mut Vec<String>) {
        for anchor in extract_links_from_bytes(&response.content) {
            let Some(href) = anchor.href else {
                debug!("Skipping anchor without href ('{}')", anchor.text);
                continue;
            };
            if self.pattern.matches(&href) {
                debug!("Added URL: {}", href);
                urls.push(href);
            }
        }
    }

    fn log_progress(&self, count: usize, url: &str, status: u16) {
        info!(
            "{:<3} | {:<4} - {} ({})",
            count, self.config.file_type, url, status
        );
    }
}

/// Runs a session for each configuration in turn, sharing one navigator.
///
/// Stops after the first interrupted session.
pub async fn search_all(
    configs: Vec<SearchConfig>,
    navigator: Arc<dyn Navigator>,
    interrupt: &Interrupt,
) -> Result<Vec<SearchSummary>> {
    let mut summaries = Vec::with_capacity(configs.len());
    for config in configs {
        let search = FileSearch::new(config, Arc::clone(&navigator))?;
        let summary = search.run(interrupt).await;
        let interrupted = summary.end == SessionEnd::Interrupted;
        summaries.push(summary);
        if interrupted {
            break;
        }
    }
    Ok(summaries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    enum Reply {
        Page(u16, String),
        NoResponse,
        Fail,
    }

    /// Replies from a script; once exhausted, repeats the fallback page.
    struct ScriptedNavigator {
        replies: Mutex<VecDeque<Reply>>,
        fallback: String,
        delay: Duration,
        requests: Mutex<Vec<String>>,
    }

    impl ScriptedNavigator {
        fn new(replies: Vec<Reply>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                fallback: page(&[]),
                delay: Duration::ZERO,
                requests: Mutex::new(Vec::new()),
            }
        }

        fn with_fallback(mut self, html: String) -> Self {
            self.fallback = html;
            self
        }

        fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }

        fn requests(&self) -> Vec<String> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Navigator for ScriptedNavigator {
        async fn navigate(&self, url: &str, _timeout: Duration) -> Result<Option<PageResponse>> {
            self.requests.lock().unwrap().push(url.to_string());
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            let reply = self.replies.lock().unwrap().pop_front();
            match reply {
                Some(Reply::Page(status, html)) => Ok(Some(PageResponse::new(status, html))),
                Some(Reply::NoResponse) => Ok(None),
                Some(Reply::Fail) => Err(crate::Error::Browser("tab crashed".to_string())),
                None => Ok(Some(PageResponse::new(200, self.fallback.clone()))),
            }
        }
    }

    fn page(hrefs: &[&str]) -> String {
        let anchors: String = hrefs
            .iter()
            .map(|h| format!(r#"<a href="{}">result</a>"#, h))
            .collect();
        format!("<html><body>{}<a>no href</a></body></html>", anchors)
    }

    fn config(engine: SearchEngine) -> SearchConfig {
        SearchConfig::new(engine, "example.com", "pdf")
            .with_timeout(30)
            .with_jitter(0)
            .with_max_results(0)
    }

    async fn run(config: SearchConfig, navigator: Arc<ScriptedNavigator>) -> SearchSummary {
        FileSearch::new(config, navigator)
            .unwrap()
            .run_with_interrupt(std::future::pending())
            .await
    }

    #[tokio::test]
    async fn test_non_200_on_second_page_keeps_first_page() {
        let navigator = Arc::new(ScriptedNavigator::new(vec![
            Reply::Page(
                200,
                page(&[
                    "https://example.com/a.pdf",
                    "https://other.org/b.pdf",
                    "https://example.com/c.pdf",
                    "https://example.com/page.html",
                ]),
            ),
            Reply::Page(429, page(&["https://example.com/late.pdf"])),
        ]));
        let summary = run(config(SearchEngine::Google), Arc::clone(&navigator)).await;

        assert_eq!(
            summary.urls,
            vec!["https://example.com/a.pdf", "https://example.com/c.pdf"]
        );
        assert_eq!(summary.end, SessionEnd::HttpStatus(429));
        assert_eq!(summary.pages, 2);

        let requests = navigator.requests();
        assert_eq!(requests.len(), 2);
        assert!(requests[0].ends_with("&start=0"));
        assert!(requests[1].ends_with("&start=2"));
    }

    #[tokio::test]
    async fn test_bing_pagination_uses_result_count() {
        let navigator = Arc::new(ScriptedNavigator::new(vec![
            Reply::Page(200, page(&["https://example.com/a.pdf"])),
            Reply::Page(200, page(&["https://example.com/b.pdf", "https://example.com/c.pdf"])),
            Reply::Page(503, String::new()),
        ]));
        let summary = run(config(SearchEngine::Bing), Arc::clone(&navigator)).await;

        assert_eq!(summary.urls.len(), 3);
        let requests = navigator.requests();
        assert!(requests[0].ends_with("&first=0"));
        assert!(requests[1].ends_with("&first=1"));
        assert!(requests[2].ends_with("&first=3"));
    }

    #[tokio::test]
    async fn test_zero_timeout_makes_bounded_requests() {
        let navigator = Arc::new(
            ScriptedNavigator::new(vec![])
                .with_fallback(page(&["https://example.com/a.pdf"])),
        );
        let config = config(SearchEngine::Google).with_timeout(0);
        let summary = run(config, Arc::clone(&navigator)).await;

        assert!(navigator.requests().len() <= 1);
        assert_eq!(summary.end, SessionEnd::Timeout);
    }

    #[tokio::test]
    async fn test_timeout_ends_always_successful_session() {
        let navigator = Arc::new(
            ScriptedNavigator::new(vec![]).with_delay(Duration::from_millis(50)),
        );
        let config = config(SearchEngine::Google).with_timeout(1);
        let summary = run(config, Arc::clone(&navigator)).await;

        assert_eq!(summary.end, SessionEnd::Timeout);
        let requests = navigator.requests().len();
        assert!(requests > 1, "expected pagination before timeout, got {}", requests);
        assert!(requests <= 21, "timer not honoured, got {}", requests);
        assert!(summary.urls.is_empty());
    }

    #[tokio::test]
    async fn test_no_response_ends_session() {
        let navigator = Arc::new(ScriptedNavigator::new(vec![
            Reply::Page(200, page(&["https://example.com/a.pdf"])),
            Reply::NoResponse,
        ]));
        let summary = run(config(SearchEngine::Google), Arc::clone(&navigator)).await;

        assert_eq!(summary.end, SessionEnd::NoResponse);
        assert_eq!(summary.urls, vec!["https://example.com/a.pdf"]);
        assert_eq!(navigator.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_navigation_error_ends_session_with_partial_results() {
        let navigator = Arc::new(ScriptedNavigator::new(vec![
            Reply::Page(200, page(&["https://example.com/a.pdf"])),
            Reply::Fail,
        ]));
        let summary = run(config(SearchEngine::Google), navigator).await;

        assert!(matches!(
            summary.end,
            SessionEnd::NavigationFailed(ref e) if e.contains("tab crashed")
        ));
        assert_eq!(summary.urls.len(), 1);
    }

    #[tokio::test]
    async fn test_duplicates_are_kept() {
        let navigator = Arc::new(ScriptedNavigator::new(vec![
            Reply::Page(
                200,
                page(&["https://example.com/a.pdf", "https://example.com/a.pdf"]),
            ),
            Reply::Page(404, String::new()),
        ]));
        let summary = run(config(SearchEngine::Google), navigator).await;
        assert_eq!(summary.urls.len(), 2);
    }

    #[tokio::test]
    async fn test_max_results_caps_pagination() {
        let navigator = Arc::new(
            ScriptedNavigator::new(vec![]).with_fallback(page(&[
                "https://example.com/a.pdf",
                "https://example.com/b.pdf",
            ])),
        );
        let summary = run(
            config(SearchEngine::Google).with_max_results(5),
            Arc::clone(&navigator),
        )
        .await;

        assert_eq!(summary.end, SessionEnd::MaxResults);
        assert_eq!(navigator.requests().len(), 3);
        assert_eq!(summary.urls.len(), 6);
    }

    #[tokio::test]
    async fn test_interrupt_stops_before_navigation() {
        let navigator = Arc::new(ScriptedNavigator::new(vec![]));
        let search = FileSearch::new(config(SearchEngine::Google), navigator.clone()).unwrap();
        let summary = search.run_with_interrupt(async {}).await;

        assert_eq!(summary.end, SessionEnd::Interrupted);
        assert!(navigator.requests().is_empty());
        assert!(summary.urls.is_empty());
    }

    #[tokio::test]
    async fn test_interrupt_during_jitter() {
        let navigator = Arc::new(
            ScriptedNavigator::new(vec![]).with_fallback(page(&["https://example.com/a.pdf"])),
        );
        let search = FileSearch::new(
            config(SearchEngine::Google).with_jitter(30),
            navigator.clone(),
        )
        .unwrap();
        let summary = search
            .run_with_interrupt(tokio::time::sleep(Duration::from_millis(100)))
            .await;

        assert_eq!(summary.end, SessionEnd::Interrupted);
        assert_eq!(navigator.requests().len(), 1);
        assert_eq!(summary.urls, vec!["https://example.com/a.pdf"]);
    }

    #[tokio::test]
    async fn test_run_sees_press_made_before_session() {
        let navigator = Arc::new(ScriptedNavigator::new(vec![]));
        let search = FileSearch::new(config(SearchEngine::Bing), navigator.clone()).unwrap();
        let (handle, interrupt) = Interrupt::manual();
        handle.trigger();

        let summary = search.run(&interrupt).await;

        assert_eq!(summary.end, SessionEnd::Interrupted);
        assert!(navigator.requests().is_empty());
    }

    #[tokio::test]
    async fn test_search_all_stops_after_interrupt() {
        let navigator = Arc::new(
            ScriptedNavigator::new(vec![]).with_delay(Duration::from_millis(200)),
        );
        let (handle, interrupt) = Interrupt::manual();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            handle.trigger();
            tokio::time::sleep(Duration::from_secs(5)).await;
        });

        let configs = vec![config(SearchEngine::Google), config(SearchEngine::Bing)];
        let summaries = search_all(configs, navigator.clone(), &interrupt).await.unwrap();

        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].end, SessionEnd::Interrupted);
        assert_eq!(navigator.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_search_all_runs_every_session() {
        let navigator = Arc::new(ScriptedNavigator::new(vec![
            Reply::Page(200, page(&["https://example.com/a.pdf"])),
            Reply::Page(429, String::new()),
            Reply::Page(403, String::new()),
        ]));
        let configs = vec![config(SearchEngine::Google), config(SearchEngine::Bing)];
        let summaries = search_all(configs, navigator, &Interrupt::never()).await.unwrap();

        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].urls, vec!["https://example.com/a.pdf"]);
        assert_eq!(summaries[0].end, SessionEnd::HttpStatus(429));
        assert_eq!(summaries[1].engine, SearchEngine::Bing);
        assert_eq!(summaries[1].end, SessionEnd::HttpStatus(403));
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let navigator = Arc::new(ScriptedNavigator::new(vec![]));
        let config = SearchConfig::new(SearchEngine::Google, "", "pdf");
        assert!(FileSearch::new(config, navigator).is_err());
    }

    #[test]
    fn test_session_end_display() {
        assert_eq!(SessionEnd::HttpStatus(429).to_string(), "HTTP 429");
        assert_eq!(SessionEnd::Timeout.to_string(), "timeout");
        assert_eq!(SessionEnd::Interrupted.to_string(), "interrupted");
    }

    #[test]
    fn test_search_summary_serialization() {
        let summary = SearchSummary {
            engine: SearchEngine::Bing,
            file_type: "pdf".to_string(),
            urls: vec!["https://example.com/a.pdf".to_string()],
            pages: 1,
            end: SessionEnd::HttpStatus(403),
            duration_ms: 12,
        };
        let json = serde_json::to_string(&summary).unwrap();
        assert!(json.contains("\"engine\":\"bing\""));
        assert!(json.contains("\"http_status\":403"));
    }
}
