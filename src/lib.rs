//! # docmeta
//!
//! Discover publicly indexed documents on a domain through search engines,
//! download them, and annotate their extracted metadata with the URL each
//! file was found at.
//!
//! The library provides:
//!
//! - Time-bounded pagination of Google and Bing `site:`/`filetype:` queries
//! - Filtering of result links against the target and file type
//! - Best-effort document downloads with safe local file names
//! - ExifTool report generation and source URL annotation
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use docmeta::{FileSearch, HttpNavigator, Interrupt, SearchConfig, SearchEngine};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = SearchConfig::new(SearchEngine::Bing, "example.com", "pdf").with_timeout(20);
//!     let search = FileSearch::new(config, Arc::new(HttpNavigator::new()))?;
//!
//!     let summary = search.run(&Interrupt::ctrl_c()).await;
//!     for url in &summary.urls {
//!         println!("{}", url);
//!     }
//!     Ok(())
//! }
//! ```

mod config;
mod error;
mod interrupt;
mod navigator;
mod navigator_http;
mod search;
mod timer;

pub mod annotate;
pub mod downloader;
pub mod exif;
pub mod links;
pub mod matcher;
pub mod proxy;

#[cfg(feature = "headless")]
pub mod browser;
#[cfg(feature = "headless")]
mod browser_setup;

pub use config::{seconds, SearchConfig, SearchEngine};
pub use error::{Error, Result};
pub use interrupt::{Interrupt, InterruptHandle};
pub use navigator::{Navigator, PageResponse};
pub use navigator_http::HttpNavigator;
pub use search::{search_all, FileSearch, SearchSummary, SessionEnd};
pub use timer::SearchTimer;

#[cfg(feature = "headless")]
pub use browser::{BrowserNavigator, BrowserPool, BrowserPoolConfig};
#[cfg(feature = "headless")]
pub use browser_setup::detect_chrome;
