//! Chrome/Chromium discovery and on-demand installation.
//!
//! The headless navigator needs a Chrome binary. An installed browser is
//! preferred; otherwise Chrome for Testing is downloaded once and cached in
//! `~/.docmeta/chromium/<version>/`.

use std::cmp::Reverse;
use std::io::{Cursor, Read, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::{Error, Result};

/// JSON API endpoint for Chrome for Testing stable versions.
const CHROME_VERSIONS_URL: &str = concat!(
    "https://googlechromelabs.github.io/chrome-for-testing/",
    "last-known-good-versions-with-downloads.json"
);

#[cfg(target_os = "macos")]
const KNOWN_PATHS: &[&str] = &[
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    "/Applications/Chromium.app/Contents/MacOS/Chromium",
];

#[cfg(not(target_os = "macos"))]
const KNOWN_PATHS: &[&str] = &[
    "/opt/google/chrome/chrome",
    "/usr/bin/google-chrome",
    "/usr/bin/chromium",
    "/usr/bin/chromium-browser",
    "/snap/bin/chromium",
];

const KNOWN_COMMANDS: &[&str] = &[
    "google-chrome",
    "google-chrome-stable",
    "chromium",
    "chromium-browser",
    "chrome",
];

/// Chrome for Testing platform identifier for this build target.
fn platform_id() -> Result<&'static str> {
    match (std::env::consts::OS, std::env::consts::ARCH) {
        ("macos", "aarch64") => Ok("mac-arm64"),
        ("macos", "x86_64") => Ok("mac-x64"),
        ("linux", "x86_64") => Ok("linux64"),
        ("windows", "x86_64") => Ok("win64"),
        (os, arch) => Err(Error::Browser(format!(
            "No Chrome for Testing build for {}-{}",
            os, arch
        ))),
    }
}

/// Executable location inside the extracted archive.
fn chrome_executable_in_zip(platform: &str) -> PathBuf {
    let root = PathBuf::from(format!("chrome-{}", platform));
    match platform {
        "mac-arm64" | "mac-x64" => root
            .join("Google Chrome for Testing.app")
            .join("Contents/MacOS/Google Chrome for Testing"),
        "win64" => root.join("chrome.exe"),
        _ => root.join("chrome"),
    }
}

fn cache_dir() -> Result<PathBuf> {
    let home = std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .ok_or_else(|| Error::Browser("Cannot determine home directory".to_string()))?;
    Ok(PathBuf::from(home).join(".docmeta").join("chromium"))
}

/// Looks for an installed Chrome: `CHROME` env var, then PATH, then known paths.
pub fn detect_chrome() -> Option<PathBuf> {
    if let Some(path) = std::env::var_os("CHROME").map(PathBuf::from) {
        if path.exists() {
            debug!("Chrome found via CHROME env var: {}", path.display());
            return Some(path);
        }
    }

    if let Some(path) = KNOWN_COMMANDS.iter().find_map(|cmd| which::which(cmd).ok()) {
        debug!("Chrome found in PATH: {}", path.display());
        return Some(path);
    }

    KNOWN_PATHS
        .iter()
        .map(PathBuf::from)
        .find(|p| p.exists())
}

/// Returns a usable Chrome executable, downloading one if nothing is installed.
pub async fn ensure_chrome() -> Result<PathBuf> {
    if let Some(path) = detect_chrome() {
        info!("Using system Chrome: {}", path.display());
        return Ok(path);
    }

    let base = cache_dir()?;
    let platform = platform_id()?;
    if let Some(path) = find_cached_chrome(&base, platform) {
        info!("Using cached Chrome: {}", path.display());
        return Ok(path);
    }

    info!("No Chrome installation found, downloading Chrome for Testing");
    download_chrome(&base, platform).await
}

/// Newest cached version under `base` that contains an executable.
fn find_cached_chrome(base: &Path, platform: &str) -> Option<PathBuf> {
    let mut versions: Vec<PathBuf> = std::fs::read_dir(base)
        .ok()?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_dir())
        .collect();
    versions.sort_by_key(|dir| Reverse(version_key(dir)));

    versions
        .into_iter()
        .map(|dir| dir.join(chrome_executable_in_zip(platform)))
        .find(|exe| exe.exists())
}

/// Numeric parts of a version directory name; `131.0.6778.85` sorts above `99.0.1`.
fn version_key(dir: &Path) -> Vec<u64> {
    dir.file_name()
        .and_then(|name| name.to_str())
        .map(|name| name.split('.').map(|part| part.parse().unwrap_or(0)).collect())
        .unwrap_or_default()
}

async fn download_chrome(base: &Path, platform: &str) -> Result<PathBuf> {
    let client = reqwest::Client::new();
    let body: serde_json::Value = client.get(CHROME_VERSIONS_URL).send().await?.json().await?;

    let stable = &body["channels"]["Stable"];
    let version = stable["version"]
        .as_str()
        .ok_or_else(|| Error::Browser("No version in Stable channel".to_string()))?;
    let download_url = stable["downloads"]["chrome"]
        .as_array()
        .and_then(|downloads| {
            downloads
                .iter()
                .find(|d| d["platform"].as_str() == Some(platform))
        })
        .and_then(|d| d["url"].as_str())
        .ok_or_else(|| {
            Error::Browser(format!("No Chrome download available for '{}'", platform))
        })?;

    info!("Downloading Chrome for Testing v{} ({})", version, platform);
    let archive = client.get(download_url).send().await?.bytes().await?;

    let version_dir = base.join(version);
    std::fs::create_dir_all(&version_dir)?;
    extract_zip(&archive, &version_dir)?;

    let exe_path = version_dir.join(chrome_executable_in_zip(platform));
    if !exe_path.exists() {
        return Err(Error::Browser(format!(
            "Chrome executable not found after extraction at {}",
            exe_path.display()
        )));
    }

    info!("Chrome installed at: {}", exe_path.display());
    Ok(exe_path)
}

fn extract_zip(bytes: &[u8], target_dir: &Path) -> Result<()> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| Error::Browser(format!("Failed to open zip archive: {}", e)))?;

    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|e| Error::Browser(format!("Failed to read zip entry {}: {}", i, e)))?;
        let out_path = target_dir.join(entry.mangled_name());

        if entry.is_dir() {
            std::fs::create_dir_all(&out_path)?;
            continue;
        }
        if let Some(parent) = out_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut buf = Vec::new();
        entry.read_to_end(&mut buf)?;
        std::fs::File::create(&out_path)?.write_all(&buf)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Some(mode) = entry.unix_mode() {
                std::fs::set_permissions(&out_path, std::fs::Permissions::from_mode(mode))?;
            }
        }
    }

    Ok(())
}
