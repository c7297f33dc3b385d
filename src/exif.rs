//! ExifTool integration for extracting document metadata.
//!
//! ExifTool is an external binary; it is located once at startup and then
//! invoked to write a CSV report for a download directory.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, warn};

use crate::{Error, Result};

const EXIFTOOL: &str = "exiftool";

/// Location used by Arch Linux packages, which is not on the default PATH.
const VENDOR_PERL_PATH: &str = "/usr/bin/vendor_perl/exiftool";

/// A located, version-checked ExifTool binary.
#[derive(Debug, Clone)]
pub struct ExifTool {
    path: PathBuf,
    version: f64,
}

impl ExifTool {
    /// Finds ExifTool on PATH (or the vendor_perl fallback) and checks its version.
    pub async fn locate() -> Result<Self> {
        let path = which::which(EXIFTOOL)
            .ok()
            .or_else(|| {
                let fallback = PathBuf::from(VENDOR_PERL_PATH);
                fallback.exists().then_some(fallback)
            })
            .ok_or_else(|| Error::DependencyMissing(EXIFTOOL.to_string()))?;
        Self::from_path(path).await
    }

    /// Uses the binary at `path`, failing if it cannot report a numeric version.
    pub async fn from_path(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if !path.exists() {
            return Err(Error::DependencyMissing(path.display().to_string()));
        }

        let output = Command::new(&path)
            .arg("-ver")
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await?;
        let raw = String::from_utf8_lossy(&output.stdout).trim().to_string();
        let version = raw
            .parse::<f64>()
            .map_err(|_| Error::DependencyVersionUnparsable {
                path: path.clone(),
                version: raw.clone(),
            })?;

        debug!("Using ExifTool {} at {}", version, path.display());
        Ok(Self { path, version })
    }

    /// Path to the binary.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reported version number.
    pub fn version(&self) -> f64 {
        self.version
    }

    /// Writes a CSV metadata report for every file under `dir` to `report`.
    ///
    /// ExifTool exits non-zero when some files could not be read; the report
    /// is still written as long as it produced output. Dropping the returned
    /// future (for example on interrupt) kills the ExifTool process.
    pub async fn extract_csv(&self, dir: &Path, report: &Path) -> Result<()> {
        let output = Command::new(&self.path)
            .arg("-csv")
            .arg("-r")
            .arg(dir)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await?;

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        if output.stdout.is_empty() {
            return Err(Error::ExifTool {
                status: output.status.to_string(),
                stderr,
            });
        }
        if !output.status.success() {
            warn!("ExifTool reported errors ({}): {}", output.status, stderr);
        }

        tokio::fs::write(report, &output.stdout).await?;
        debug!("Metadata report written to {}", report.display());
        Ok(())
    }
}
