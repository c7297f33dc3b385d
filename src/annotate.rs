//! Provenance annotation of ExifTool metadata reports.
//!
//! Each report row describes a downloaded file. The annotator maps that file
//! back to the URL it was downloaded from and prepends the URL as a new
//! first column, rewriting the report in place.

use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::matcher::{clean_filename, last_segment};
use crate::Result;

/// Header of the identifying column in an ExifTool CSV report.
pub const SOURCE_FILE_HEADER: &str = "SourceFile";

/// Header of the inserted provenance column.
pub const SOURCE_URL_HEADER: &str = "SourceURL";

/// Value written when no URL matches a row.
pub const NOT_AVAILABLE: &str = "n/a";

/// Counts from one annotation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnnotateSummary {
    /// Data rows written (header and blank lines excluded).
    pub rows: usize,
    /// Rows matched to a source URL.
    pub resolved: usize,
}

impl AnnotateSummary {
    /// Rows that got the `n/a` sentinel.
    pub fn unresolved(&self) -> usize {
        self.rows - self.resolved
    }
}

/// Resolves the source URL for a report's first-column value.
///
/// URLs are tried in order; for each one the candidate's file name is
/// first looked for inside the URL's last segment, then compared with the
/// cleaned form of that segment. The first URL that satisfies either wins.
pub fn resolve_source_url<'a>(urls: &'a [String], candidate: &str) -> &'a str {
    if candidate == SOURCE_FILE_HEADER {
        return SOURCE_URL_HEADER;
    }

    let name = last_segment(candidate);
    if name.is_empty() {
        return NOT_AVAILABLE;
    }

    urls.iter()
        .find(|url| {
            let segment = last_segment(url);
            segment.contains(name) || clean_filename(segment) == name
        })
        .map(String::as_str)
        .unwrap_or(NOT_AVAILABLE)
}

/// Prepends a source URL column to every row of the report at `path`.
///
/// Lines are decoded as UTF-8, falling back to ISO-8859-1 for lines that are
/// not valid UTF-8. The new report is written to a sibling temporary file and
/// moved over the original only once it is complete; on failure the original
/// is left untouched.
pub async fn annotate_report(path: &Path, urls: &[String]) -> Result<AnnotateSummary> {
    let input = fs::read(path).await?;
    let (annotated, summary) = annotate_lines(&input, urls);

    let tmp_path = temp_path(path);
    if let Err(e) = write_synced(&tmp_path, &annotated).await {
        let _ = fs::remove_file(&tmp_path).await;
        return Err(e);
    }

    fs::rename(&tmp_path, path).await?;
    info!(
        "Annotated {} rows in {} ({} without a source URL)",
        summary.rows,
        path.display(),
        summary.unresolved()
    );
    Ok(summary)
}

async fn write_synced(path: &Path, content: &[u8]) -> Result<()> {
    let mut file = fs::File::create(path).await?;
    file.write_all(content).await?;
    file.sync_all().await?;
    Ok(())
}

fn annotate_lines(input: &[u8], urls: &[String]) -> (Vec<u8>, AnnotateSummary) {
    let mut out = Vec::with_capacity(input.len() + input.len() / 4);
    let mut summary = AnnotateSummary::default();

    for raw in input.split_inclusive(|b| *b == b'\n') {
        let line = decode_line(raw);
        if line.trim().is_empty() {
            out.extend_from_slice(line.as_bytes());
            continue;
        }

        let candidate = first_field(&line);
        let url = resolve_source_url(urls, candidate);
        if candidate != SOURCE_FILE_HEADER {
            summary.rows += 1;
            if url != NOT_AVAILABLE {
                summary.resolved += 1;
            } else {
                debug!("No source URL for {}", candidate);
            }
        }

        out.extend_from_slice(csv_field(url).as_bytes());
        out.push(b',');
        out.extend_from_slice(line.as_bytes());
    }

    (out, summary)
}

/// UTF-8 when valid, otherwise each byte as its ISO-8859-1 code point.
fn decode_line(raw: &[u8]) -> String {
    match std::str::from_utf8(raw) {
        Ok(s) => s.to_string(),
        Err(_) => raw.iter().map(|&b| b as char).collect(),
    }
}

fn first_field(line: &str) -> &str {
    let field = line.split(',').next().unwrap_or_default().trim_end_matches(['\r', '\n']);
    field
        .strip_prefix('"')
        .and_then(|f| f.strip_suffix('"'))
        .unwrap_or(field)
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "report.csv".to_string());
    path.with_file_name(format!(".{}.tmp", name))
}
