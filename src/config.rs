//! Search session configuration and per-engine pagination.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Search engines that can be scraped for indexed documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchEngine {
    Google,
    Bing,
}

impl SearchEngine {
    /// Every supported engine, in the order `all` runs them.
    pub const ALL: [SearchEngine; 2] = [SearchEngine::Google, SearchEngine::Bing];

    /// Lowercase engine identifier.
    pub fn name(&self) -> &'static str {
        match self {
            SearchEngine::Google => "google",
            SearchEngine::Bing => "bing",
        }
    }

    /// Builds the result page URL for a `site:`/`filetype:` query.
    ///
    /// `offset` is the number of results collected so far. Both engines take a
    /// result offset rather than a page index, but under different names.
    pub fn page_url(&self, target: &str, file_type: &str, offset: usize) -> String {
        let target = urlencoding::encode(target);
        let file_type = urlencoding::encode(file_type);
        match self {
            SearchEngine::Google => format!(
                "https://www.google.com/search?q=site:{}+filetype:{}&num=100&start={}",
                target, file_type, offset
            ),
            SearchEngine::Bing => format!(
                "https://www.bing.com/search?q=site:{}%20filetype:{}&first={}",
                target, file_type, offset
            ),
        }
    }
}

impl fmt::Display for SearchEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SearchEngine {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "google" | "g" => Ok(SearchEngine::Google),
            "bing" | "b" => Ok(SearchEngine::Bing),
            other => Err(Error::InvalidConfig(format!("Unknown search engine '{}'", other))),
        }
    }
}

/// Configuration for one search session (one engine, one target, one file type).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Engine to paginate.
    pub search_engine: SearchEngine,
    /// Domain searched for documents.
    pub target: String,
    /// Lowercase document extension.
    pub file_type: String,
    /// Session wall-clock budget in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    /// Per-navigation timeout in seconds.
    #[serde(default = "default_connection_timeout")]
    pub connection_timeout: u64,
    /// Delay between result pages in seconds.
    #[serde(default = "default_jitter")]
    pub jitter: u64,
    /// Stop once this many URLs are collected; zero disables the cap.
    #[serde(default = "default_max_results")]
    pub max_results: usize,
    /// Proxy URLs handed through to the navigator.
    #[serde(default)]
    pub proxies: Vec<String>,
}

fn default_timeout() -> u64 {
    8
}

fn default_connection_timeout() -> u64 {
    3
}

fn default_jitter() -> u64 {
    1
}

fn default_max_results() -> usize {
    50
}

impl SearchConfig {
    /// Creates a configuration with default timing and limits.
    pub fn new(search_engine: SearchEngine, target: impl Into<String>, file_type: &str) -> Self {
        Self {
            search_engine,
            target: target.into(),
            file_type: file_type.trim().trim_start_matches('.').to_lowercase(),
            timeout: default_timeout(),
            connection_timeout: default_connection_timeout(),
            jitter: default_jitter(),
            max_results: default_max_results(),
            proxies: Vec::new(),
        }
    }

    /// Sets the session timeout in seconds.
    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout = seconds;
        self
    }

    /// Sets the per-navigation timeout in seconds.
    pub fn with_connection_timeout(mut self, seconds: u64) -> Self {
        self.connection_timeout = seconds;
        self
    }

    /// Sets the delay between pages in seconds.
    pub fn with_jitter(mut self, seconds: u64) -> Self {
        self.jitter = seconds;
        self
    }

    /// Sets the result cap (zero for no cap).
    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    /// Sets the proxy list.
    pub fn with_proxies(mut self, proxies: Vec<String>) -> Self {
        self.proxies = proxies;
        self
    }

    /// Session budget as a `Duration`.
    pub fn timeout_duration(&self) -> Duration {
        seconds(self.timeout)
    }

    /// Navigation timeout as a `Duration`.
    pub fn connection_timeout_duration(&self) -> Duration {
        seconds(self.connection_timeout)
    }

    /// Politeness delay as a `Duration`.
    pub fn jitter_duration(&self) -> Duration {
        seconds(self.jitter)
    }

    /// Result page URL for the given offset.
    pub fn page_url(&self, offset: usize) -> String {
        self.search_engine.page_url(&self.target, &self.file_type, offset)
    }

    /// Checks that the target and file type can form a query.
    pub fn validate(&self) -> Result<()> {
        if self.target.trim().is_empty() {
            return Err(Error::InvalidConfig("Target cannot be empty".into()));
        }
        if self.file_type.is_empty() {
            return Err(Error::InvalidConfig("File type cannot be empty".into()));
        }
        if !self.file_type.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(Error::InvalidConfig(format!(
                "File type '{}' must be alphanumeric",
                self.file_type
            )));
        }
        Ok(())
    }
}

/// Converts a user-facing seconds value into a `Duration`.
///
/// Search pagination and downloads both use this so the two paths never
/// disagree about units.
pub fn seconds(value: u64) -> Duration {
    Duration::from_secs(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_google_page_url_uses_result_offset() {
        let url = SearchEngine::Google.page_url("example.com", "pdf", 37);
        assert_eq!(
            url,
            "https://www.google.com/search?q=site:example.com+filetype:pdf&num=100&start=37"
        );
    }

    #[test]
    fn test_bing_page_url_uses_result_offset() {
        let url = SearchEngine::Bing.page_url("example.com", "docx", 12);
        assert_eq!(
            url,
            "https://www.bing.com/search?q=site:example.com%20filetype:docx&first=12"
        );
    }

    #[test]
    fn test_page_url_encodes_target() {
        let url = SearchEngine::Google.page_url("a b.com", "pdf", 0);
        assert!(url.contains("site:a%20b.com"));
    }

    #[test]
    fn test_search_engine_from_str() {
        assert_eq!("google".parse::<SearchEngine>().unwrap(), SearchEngine::Google);
        assert_eq!(" BING ".parse::<SearchEngine>().unwrap(), SearchEngine::Bing);
        assert!("yahoo".parse::<SearchEngine>().is_err());
    }

    #[test]
    fn test_search_engine_display() {
        assert_eq!(SearchEngine::Google.to_string(), "google");
        assert_eq!(SearchEngine::Bing.to_string(), "bing");
    }

    #[test]
    fn test_search_engine_serialization() {
        let json = serde_json::to_string(&SearchEngine::Bing).unwrap();
        assert_eq!(json, "\"bing\"");
        let engine: SearchEngine = serde_json::from_str("\"google\"").unwrap();
        assert_eq!(engine, SearchEngine::Google);
    }

    #[test]
    fn test_search_config_new_defaults() {
        let config = SearchConfig::new(SearchEngine::Google, "example.com", ".PDF");
        assert_eq!(config.file_type, "pdf");
        assert_eq!(config.timeout, 8);
        assert_eq!(config.connection_timeout, 3);
        assert_eq!(config.jitter, 1);
        assert_eq!(config.max_results, 50);
        assert!(config.proxies.is_empty());
    }

    #[test]
    fn test_search_config_builder() {
        let config = SearchConfig::new(SearchEngine::Bing, "example.com", "xlsx")
            .with_timeout(30)
            .with_connection_timeout(5)
            .with_jitter(0)
            .with_max_results(0)
            .with_proxies(vec!["http://127.0.0.1:8080".to_string()]);
        assert_eq!(config.timeout_duration(), Duration::from_secs(30));
        assert_eq!(config.connection_timeout_duration(), Duration::from_secs(5));
        assert_eq!(config.jitter_duration(), Duration::ZERO);
        assert_eq!(config.max_results, 0);
        assert_eq!(config.proxies.len(), 1);
    }

    #[test]
    fn test_search_config_page_url() {
        let config = SearchConfig::new(SearchEngine::Bing, "example.com", "pdf");
        assert!(config.page_url(50).ends_with("&first=50"));
    }

    #[test]
    fn test_search_config_validate() {
        assert!(SearchConfig::new(SearchEngine::Google, "example.com", "pdf")
            .validate()
            .is_ok());
        assert!(SearchConfig::new(SearchEngine::Google, "  ", "pdf")
            .validate()
            .is_err());
        assert!(SearchConfig::new(SearchEngine::Google, "example.com", "")
            .validate()
            .is_err());
        assert!(SearchConfig::new(SearchEngine::Google, "example.com", "p/f")
            .validate()
            .is_err());
    }

    #[test]
    fn test_search_config_deserialization_defaults() {
        let json = r#"{"search_engine":"google","target":"example.com","file_type":"pdf"}"#;
        let config: SearchConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.timeout, 8);
        assert_eq!(config.connection_timeout, 3);
        assert_eq!(config.max_results, 50);
    }

    #[test]
    fn test_seconds_conversion() {
        assert_eq!(seconds(3), Duration::from_millis(3000));
    }
}
