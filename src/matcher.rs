//! Result URL matching and local filename normalization.

use std::sync::LazyLock;

use regex::Regex;

use crate::Result;

/// Document extensions the downloader knows how to name.
pub const SUPPORTED_EXTENSIONS: &[&str] =
    &["pdf", "xls", "xlsx", "csv", "doc", "docx", "ppt", "pptx"];

static EXTENSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)\.({})($|[?#])",
        SUPPORTED_EXTENSIONS.join("|")
    ))
    .expect("extension pattern is valid")
});

static UNSAFE_CHARS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-zA-Z0-9_.-]").expect("unsafe char pattern is valid"));

/// Compiled pattern deciding whether a result link points at a target document.
///
/// A URL matches when it starts with an `http` or `https` scheme, contains the
/// target somewhere after it, and later has a literal `.` followed by the file
/// type as a whole word (`.pdf` matches, `.pdfx` does not).
#[derive(Debug, Clone)]
pub struct MatchPattern {
    regex: Regex,
}

impl MatchPattern {
    /// Builds the pattern for a target domain and file type.
    pub fn new(target: &str, file_type: &str) -> Result<Self> {
        let pattern = format!(
            r"(?i)^(https?)://.*{}.*\.{}\b",
            regex::escape(target),
            regex::escape(&file_type.to_lowercase())
        );
        Ok(Self {
            regex: Regex::new(&pattern)?,
        })
    }

    /// Returns true if `url` satisfies the pattern.
    pub fn matches(&self, url: &str) -> bool {
        self.regex.is_match(url)
    }

    /// Returns the underlying regular expression source.
    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }
}

/// Returns true if `url` satisfies `pattern`.
pub fn matches(pattern: &MatchPattern, url: &str) -> bool {
    pattern.matches(url)
}

/// Normalizes a URL or path into a safe local filename.
///
/// Everything after the first supported extension is dropped, the last path
/// segment of what remains is percent-decoded and any character outside
/// `[a-zA-Z0-9_.-]` becomes `_`.
/// Inputs without a supported extension are returned unchanged.
pub fn clean_filename(filename: &str) -> String {
    let end = match EXTENSION_RE.captures(filename).and_then(|c| c.get(1)) {
        Some(ext) => ext.end(),
        None => return filename.to_string(),
    };

    let decoded = urlencoding::decode_binary(last_segment(&filename[..end]).as_bytes());
    let decoded = String::from_utf8_lossy(&decoded);
    UNSAFE_CHARS_RE.replace_all(&decoded, "_").into_owned()
}

/// Returns the final `/`-separated segment of a URL or path.
pub fn last_segment(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}
