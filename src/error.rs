//! Error types for the document discovery library.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for docmeta operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while searching, downloading or annotating.
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Headless browser failure.
    #[error("Browser error: {0}")]
    Browser(String),

    /// Filesystem or process I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The target/file type could not be compiled into a match pattern.
    #[error("Invalid match pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// Invalid search configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// URL parsing error.
    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// A required external binary could not be found.
    #[error("Required dependency '{0}' not installed or not found in PATH")]
    DependencyMissing(String),

    /// The external binary reported a version that is not a number.
    #[error("Could not parse version of {path}: '{version}'")]
    DependencyVersionUnparsable {
        /// Path to the binary that was queried.
        path: PathBuf,
        /// Raw version output.
        version: String,
    },

    /// ExifTool ran but exited unsuccessfully.
    #[error("ExifTool failed ({status}): {stderr}")]
    ExifTool {
        /// Exit status description.
        status: String,
        /// Captured standard error.
        stderr: String,
    },

    /// Generic error.
    #[error("{0}")]
    Other(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_browser() {
        let err = Error::Browser("tab crashed".to_string());
        assert_eq!(err.to_string(), "Browser error: tab crashed");
    }

    #[test]
    fn test_error_display_invalid_config() {
        let err = Error::InvalidConfig("empty target".to_string());
        assert_eq!(err.to_string(), "Invalid configuration: empty target");
    }

    #[test]
    fn test_error_display_dependency_missing() {
        let err = Error::DependencyMissing("exiftool".to_string());
        assert_eq!(
            err.to_string(),
            "Required dependency 'exiftool' not installed or not found in PATH"
        );
    }

    #[test]
    fn test_error_display_version_unparsable() {
        let err = Error::DependencyVersionUnparsable {
            path: PathBuf::from("/usr/bin/exiftool"),
            version: "garbage".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Could not parse version of /usr/bin/exiftool: 'garbage'"
        );
    }

    #[test]
    fn test_error_from_io() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io(_)));
        assert!(err.to_string().contains("gone"));
    }

    #[test]
    fn test_error_display_other() {
        let err = Error::Other("something went wrong".to_string());
        assert_eq!(err.to_string(), "something went wrong");
    }
}
