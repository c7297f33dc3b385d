//! Best-effort document downloads.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use futures::stream::{self, StreamExt};
use tracing::{debug, warn};

use crate::interrupt::Interrupt;
use crate::matcher::{clean_filename, last_segment};
use crate::navigator::Navigator;
use crate::Result;

/// Downloads `url` into `dir`, returning the written path.
///
/// A missing response or a non-200 status is logged and yields `None`; any
/// other failure is logged at debug level and also yields `None`. Existing
/// files are overwritten.
pub async fn download_file(
    navigator: &dyn Navigator,
    url: &str,
    dir: &Path,
    timeout: Duration,
) -> Option<PathBuf> {
    match try_download(navigator, url, dir, timeout).await {
        Ok(path) => path,
        Err(e) => {
            debug!("Download Error: {} - {}", url, e);
            None
        }
    }
}

async fn try_download(
    navigator: &dyn Navigator,
    url: &str,
    dir: &Path,
    timeout: Duration,
) -> Result<Option<PathBuf>> {
    debug!("Downloading: {}", url);

    let Some(response) = navigator.navigate(url, timeout).await? else {
        warn!("Download Failed (no response) - {}", url);
        return Ok(None);
    };

    if !response.is_ok() {
        warn!("Download Failed ({}) - {}", response.status, url);
        return Ok(None);
    }

    let path = dir.join(local_filename(url));
    tokio::fs::write(&path, &response.content).await?;
    debug!("Saved {} ({} bytes)", path.display(), response.content.len());
    Ok(Some(path))
}

/// Local filename for a document URL.
///
/// URLs ending in `/` have no last segment; those fall back to a name
/// derived from the whole URL.
pub fn local_filename(url: &str) -> String {
    let name = clean_filename(last_segment(url));
    if name.is_empty() || name == "." || name == ".." {
        clean_filename(url.trim_end_matches('/')).replace('/', "_")
    } else {
        name
    }
}

/// URLs grouped by local file name, in first-seen order.
///
/// Repeated URLs are listed once per group.
fn group_by_filename(urls: &[String]) -> Vec<Vec<&str>> {
    let mut groups: Vec<Vec<&str>> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for url in urls {
        match index.entry(local_filename(url)) {
            Entry::Occupied(entry) => {
                let group = &mut groups[*entry.get()];
                if !group.contains(&url.as_str()) {
                    group.push(url);
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(groups.len());
                groups.push(vec![url.as_str()]);
            }
        }
    }
    groups
}

/// Tries each URL of a group in order until one is saved.
async fn download_first(
    navigator: &dyn Navigator,
    sources: &[&str],
    dir: &Path,
    timeout: Duration,
) -> Option<PathBuf> {
    for url in sources {
        if let Some(path) = download_file(navigator, url, dir, timeout).await {
            return Some(path);
        }
    }
    None
}

/// Downloads every URL into `dir` with at most `concurrency` in flight.
///
/// The directory is created if needed. URLs that map to the same local file
/// name share one writer: they are tried in discovery order and the first
/// successful download is kept. Failed downloads are skipped. A user
/// interrupt newer than the call stops the batch; the returned paths are the
/// distinct files written so far, in completion order.
pub async fn download_all(
    navigator: &dyn Navigator,
    urls: &[String],
    dir: &Path,
    timeout: Duration,
    concurrency: usize,
    interrupt: &Interrupt,
) -> Result<Vec<PathBuf>> {
    tokio::fs::create_dir_all(dir).await?;

    let groups = group_by_filename(urls);
    let seen = interrupt.presses();
    let written: Vec<PathBuf> = stream::iter(&groups)
        .map(|sources| download_first(navigator, sources, dir, timeout))
        .buffer_unordered(concurrency.max(1))
        .filter_map(|path| async move { path })
        .take_until(interrupt.pressed_after(seen))
        .collect()
        .await;

    if interrupt.presses() > seen {
        warn!(
            "Downloads interrupted after {} of {} files",
            written.len(),
            groups.len()
        );
    }
    debug!(
        "Downloaded {}/{} files to {}",
        written.len(),
        groups.len(),
        dir.display()
    );
    Ok(written)
}
