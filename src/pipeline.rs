//! Document pipeline: one source file in, one HTML string out.
//!
//! ```text
//! source ──parse──▶ Node tree ──transform──▶ Node tree ──render──▶ Markup
//!                                                                   │
//!                      frontmatter ──────────▶ templates::document ◀┘
//! ```
//!
//! Relocation and minification happen afterwards in the
//! [driver](crate::driver), so this stage stays a pure function of the source
//! text and the shared [`BuildContext`].

use crate::context::BuildContext;
use crate::frontmatter::{Frontmatter, FrontmatterError};
use crate::markup::{self, ParseError, RenderContext, TransformConfig};
use crate::templates;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("unknown highlighting language `{language}`")]
    UnknownLanguage { language: String },
    #[error("highlighting `{language}` failed: {message}")]
    Highlight { language: String, message: String },
    #[error("frontmatter is missing required field `{0}`")]
    MissingField(&'static str),
    #[error("no component registered as `{0}`")]
    UnknownComponent(String),
}

#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),
    #[error("render error: {0}")]
    Render(#[from] RenderError),
}

impl From<FrontmatterError> for DocumentError {
    fn from(err: FrontmatterError) -> Self {
        match err {
            FrontmatterError::Json(e) => DocumentError::Parse(ParseError::Frontmatter(e)),
            FrontmatterError::Render(e) => DocumentError::Render(e),
        }
    }
}

/// A rendered page, before relocation and minification.
#[derive(Debug, Clone)]
pub struct RenderedDocument {
    pub frontmatter: Frontmatter,
    pub html: String,
}

/// Parse, transform and render one document.
///
/// `path` is recorded on the document root; it is not read.
pub fn process_document(
    ctx: &BuildContext,
    path: &Path,
    source: &str,
) -> Result<RenderedDocument, DocumentError> {
    let parsed = markup::parse(source)?;
    let transformed = markup::transform(
        parsed,
        &TransformConfig {
            source: path,
            registry: &ctx.registry,
        },
    )?;

    let frontmatter = Frontmatter::from_json(transformed.frontmatter().unwrap_or("{}"))?;

    let body = markup::render(
        &transformed,
        &RenderContext {
            highlighter: &ctx.highlighter,
            registry: &ctx.registry,
        },
    )?;

    let html = templates::document(&frontmatter, &ctx.page_assets(), body);
    tracing::trace!(path = %path.display(), bytes = html.len(), "document rendered");

    Ok(RenderedDocument { frontmatter, html })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{doc, test_context};

    const FM: &str = r#"{"title":"Pipeline","subtitle":"Sub","date":"2020-05-17"}"#;

    #[test]
    fn renders_full_document() {
        let ctx = test_context();
        let out = process_document(&ctx, Path::new("posts/a.md"), &doc(FM, "Hello *there*\n"))
            .unwrap();
        assert_eq!(out.frontmatter.title, "Pipeline");
        assert!(out.html.starts_with("<!DOCTYPE html>"));
        assert!(out.html.contains("<em>there</em>"));
        assert!(out.html.contains("17 May 2020"));
    }

    #[test]
    fn missing_frontmatter_is_parse_error() {
        let ctx = test_context();
        let err = process_document(&ctx, Path::new("a.md"), "just text\n").unwrap_err();
        assert!(matches!(err, DocumentError::Parse(ParseError::MissingFrontmatter)));
    }

    #[test]
    fn missing_title_is_render_error() {
        let ctx = test_context();
        let err = process_document(
            &ctx,
            Path::new("a.md"),
            &doc(r#"{"subtitle":"S","date":"d"}"#, "x\n"),
        )
        .unwrap_err();
        assert!(matches!(err, DocumentError::Render(RenderError::MissingField("title"))));
    }

    #[test]
    fn unknown_language_is_render_error() {
        let ctx = test_context();
        let err = process_document(&ctx, Path::new("a.md"), &doc(FM, "```zzz\nx\n```\n"))
            .unwrap_err();
        assert!(matches!(
            err,
            DocumentError::Render(RenderError::UnknownLanguage { .. })
        ));
    }

    #[test]
    fn unregistered_component_is_parse_error() {
        let ctx = test_context();
        let err = process_document(&ctx, Path::new("a.md"), &doc(FM, "{% Nope /%}\n"))
            .unwrap_err();
        assert!(matches!(err, DocumentError::Parse(ParseError::UnknownComponent(_))));
    }

    #[test]
    fn code_posts_carry_highlight_css() {
        let ctx = test_context();
        let fm = r#"{"title":"T","subtitle":"S","date":"d","code":true}"#;
        let out = process_document(&ctx, Path::new("a.md"), &doc(fm, "```python\nx = 1\n```\n"))
            .unwrap();
        assert!(out.html.contains(&ctx.stylesheets.code));
        assert!(out.html.contains("highlighttable"));
    }

    #[test]
    fn processing_is_deterministic() {
        let ctx = test_context();
        let source = doc(FM, "Same *input*\n\n```rust\nfn f() {}\n```\n");
        let a = process_document(&ctx, Path::new("a.md"), &source).unwrap();
        let b = process_document(&ctx, Path::new("a.md"), &source).unwrap();
        assert_eq!(a.html, b.html);
    }
}
