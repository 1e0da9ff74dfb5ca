//! Build driver: discover sources, run each through the pipeline, write pages.
//!
//! ```text
//! posts/*.md ──discover──▶ [relative paths, sorted]
//!                               │ for each, sequentially
//!                               ▼
//!       read ─▶ process_document ─▶ relocate ─▶ minify ─▶ write <output>/<path>.html
//!                               │
//!                               ▼
//!                     index.html (listed posts, newest first)
//! ```
//!
//! A failing document either stops the build ([`FailurePolicy::Abort`]) or is
//! recorded in the [`BuildReport`] while the rest continue
//! ([`FailurePolicy::Continue`]). Writes are not transactional: pages written
//! before an abort stay on disk.

use crate::config::{FailurePolicy, SiteConfig};
use crate::context::{BuildContext, ConfigurationError};
use crate::minify::minify;
use crate::pipeline::{DocumentError, process_document};
use crate::relocate::{RelocateError, relocate};
use crate::templates::{IndexEntry, index_document};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Broad error category, used when reporting failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Parse,
    Render,
    Io,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ErrorKind::Configuration => "configuration error",
            ErrorKind::Parse => "parse error",
            ErrorKind::Render => "render error",
            ErrorKind::Io => "I/O error",
        })
    }
}

#[derive(Error, Debug)]
pub enum BuildError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error("invalid source pattern `{pattern}`: {source}")]
    Pattern {
        pattern: String,
        source: glob::PatternError,
    },
    #[error("{}: cannot read: {source}", .path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("{}: cannot write: {source}", .path.display())]
    Write { path: PathBuf, source: io::Error },
    #[error("{}: {source}", .path.display())]
    Document {
        path: PathBuf,
        source: DocumentError,
    },
    #[error("{}: {source}", .path.display())]
    Relocate {
        path: PathBuf,
        source: RelocateError,
    },
}

impl BuildError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BuildError::Configuration(_) | BuildError::Pattern { .. } => ErrorKind::Configuration,
            BuildError::Read { .. } | BuildError::Write { .. } => ErrorKind::Io,
            BuildError::Document {
                source: DocumentError::Parse(_),
                ..
            } => ErrorKind::Parse,
            BuildError::Document {
                source: DocumentError::Render(_),
                ..
            }
            | BuildError::Relocate { .. } => ErrorKind::Render,
        }
    }
}

/// Returned when a `continue` build finished with failed documents.
#[derive(Error, Debug)]
#[error("{failed} of {total} documents failed")]
pub struct BuildFailed {
    pub failed: usize,
    pub total: usize,
}

/// Knobs that differ between `build` and `check`.
#[derive(Debug, Clone, Copy)]
pub struct BuildOptions {
    pub policy: FailurePolicy,
    /// Write pages to disk. `check` runs everything but this.
    pub write: bool,
    pub minify: bool,
}

impl BuildOptions {
    pub fn from_config(config: &SiteConfig) -> Self {
        Self {
            policy: config.on_error,
            write: true,
            minify: config.minify.enabled,
        }
    }
}

/// A page that went through the whole pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRecord {
    /// Source path relative to the site root.
    pub source: PathBuf,
    pub destination: PathBuf,
    pub title: String,
    pub subtitle: String,
    pub date: String,
    pub unlisted: bool,
}

#[derive(Debug)]
pub struct DocumentFailure {
    pub source: PathBuf,
    pub error: BuildError,
}

#[derive(Debug, Default)]
pub struct BuildReport {
    pub pages: Vec<PageRecord>,
    pub failures: Vec<DocumentFailure>,
    /// Destination of the index page, when one was built.
    pub index: Option<PathBuf>,
}

impl BuildReport {
    pub fn total(&self) -> usize {
        self.pages.len() + self.failures.len()
    }

    pub fn ensure_success(&self) -> Result<(), BuildFailed> {
        if self.failures.is_empty() {
            Ok(())
        } else {
            Err(BuildFailed {
                failed: self.failures.len(),
                total: self.total(),
            })
        }
    }
}

/// Source files matching `pattern` under `root`, relative to `root`, sorted.
pub fn discover(root: &Path, pattern: &str) -> Result<Vec<PathBuf>, BuildError> {
    let escaped_root = glob::Pattern::escape(&root.to_string_lossy());
    let full = format!("{}/{}", escaped_root.trim_end_matches('/'), pattern);

    let entries = glob::glob(&full).map_err(|source| BuildError::Pattern {
        pattern: pattern.to_string(),
        source,
    })?;

    let mut sources = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| BuildError::Read {
            path: e.path().to_path_buf(),
            source: e.into_error(),
        })?;
        if path.is_file() {
            let relative = path.strip_prefix(root).unwrap_or(&path).to_path_buf();
            sources.push(relative);
        }
    }
    sources.sort();
    Ok(sources)
}

/// `posts/2020/hello.md` → `<output_root>/posts/2020/hello.md.html`.
pub fn destination_path(output_root: &Path, relative: &Path) -> PathBuf {
    let mut name = relative.as_os_str().to_owned();
    name.push(".html");
    output_root.join(name)
}

/// Link from the index page to a page, always with forward slashes.
fn page_href(relative: &Path) -> String {
    let parts: Vec<_> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect();
    format!("{}.html", parts.join("/"))
}

/// Build every source document, then the index page.
pub fn build(ctx: &BuildContext, options: &BuildOptions) -> Result<BuildReport, BuildError> {
    let sources = discover(&ctx.root, &ctx.config.posts)?;
    tracing::info!(
        count = sources.len(),
        pattern = %ctx.config.posts,
        "discovered sources"
    );

    let output_root = ctx.output_root();
    let mut report = BuildReport::default();

    for relative in &sources {
        match build_page(ctx, relative, &output_root, options) {
            Ok(page) => {
                tracing::debug!(
                    source = %page.source.display(),
                    destination = %page.destination.display(),
                    "page built"
                );
                report.pages.push(page);
            }
            Err(error) => match options.policy {
                FailurePolicy::Abort => return Err(error),
                FailurePolicy::Continue => {
                    tracing::warn!(source = %relative.display(), %error, "document failed");
                    report.failures.push(DocumentFailure {
                        source: relative.clone(),
                        error,
                    });
                }
            },
        }
    }

    if ctx.config.index {
        report.index = Some(build_index(ctx, &report.pages, &output_root, options)?);
    }

    tracing::info!(
        pages = report.pages.len(),
        failed = report.failures.len(),
        "build finished"
    );
    Ok(report)
}

fn build_page(
    ctx: &BuildContext,
    relative: &Path,
    output_root: &Path,
    options: &BuildOptions,
) -> Result<PageRecord, BuildError> {
    let path = ctx.root.join(relative);
    let source = fs::read_to_string(&path).map_err(|source| BuildError::Read {
        path: relative.to_path_buf(),
        source,
    })?;

    let rendered =
        process_document(ctx, relative, &source).map_err(|source| BuildError::Document {
            path: relative.to_path_buf(),
            source,
        })?;

    let destination = destination_path(output_root, relative);
    finish_page(&rendered.html, relative, &destination, options)?;

    let fm = rendered.frontmatter;
    Ok(PageRecord {
        source: relative.to_path_buf(),
        destination,
        title: fm.title,
        subtitle: fm.subtitle,
        date: fm.date,
        unlisted: fm.unlisted,
    })
}

/// Relocate, minify and (optionally) write one page.
fn finish_page(
    html: &str,
    label: &Path,
    destination: &Path,
    options: &BuildOptions,
) -> Result<(), BuildError> {
    let relocated = relocate(html).map_err(|source| BuildError::Relocate {
        path: label.to_path_buf(),
        source,
    })?;

    let bytes = if options.minify {
        minify(relocated.as_bytes())
    } else {
        relocated.into_bytes()
    };

    if options.write {
        let write_error = |source| BuildError::Write {
            path: destination.to_path_buf(),
            source,
        };
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent).map_err(write_error)?;
        }
        fs::write(destination, bytes).map_err(write_error)?;
    }
    Ok(())
}

/// Listed pages, newest first. Dates compare as written, so `YYYY-MM-DD`
/// dates sort chronologically; equal dates keep source order.
pub fn index_entries(pages: &[PageRecord]) -> Vec<IndexEntry> {
    let mut listed: Vec<&PageRecord> = pages.iter().filter(|p| !p.unlisted).collect();
    listed.sort_by(|a, b| b.date.cmp(&a.date));
    listed
        .into_iter()
        .map(|page| IndexEntry {
            title: page.title.clone(),
            subtitle: page.subtitle.clone(),
            date: crate::frontmatter::format_date(&page.date),
            href: page_href(&page.source),
        })
        .collect()
}

fn build_index(
    ctx: &BuildContext,
    pages: &[PageRecord],
    output_root: &Path,
    options: &BuildOptions,
) -> Result<PathBuf, BuildError> {
    let entries = index_entries(pages);
    let html = index_document(&entries, &ctx.page_assets());
    let destination = output_root.join("index.html");
    finish_page(&html, Path::new("index.html"), &destination, options)?;
    tracing::debug!(entries = entries.len(), "index built");
    Ok(destination)
}
