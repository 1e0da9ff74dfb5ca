//! Shared test utilities.
//!
//! Building a [`Highlighter`] loads syntect's whole bundled syntax set, so the
//! read-only resources are built once per test binary and handed out as
//! `&'static` references.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let ctx = test_context();
//! let source = doc(r#"{"title":"T","subtitle":"S","date":"2021-01-02"}"#, "Hello\n");
//! let page = process_document(ctx, Path::new("posts/a.md"), &source).unwrap();
//! ```

use std::fs;
use std::path::Path;
use std::sync::OnceLock;
use tempfile::TempDir;

use crate::config::SiteConfig;
use crate::context::BuildContext;
use crate::frontmatter::Frontmatter;
use crate::highlight::Highlighter;
use crate::stylesheet::Stylesheets;

// =========================================================================
// Shared resources
// =========================================================================

pub fn test_highlighter() -> &'static Highlighter {
    static HIGHLIGHTER: OnceLock<Highlighter> = OnceLock::new();
    HIGHLIGHTER.get_or_init(|| Highlighter::new(&SiteConfig::default().highlight.theme).unwrap())
}

pub fn test_stylesheets() -> &'static Stylesheets {
    static STYLESHEETS: OnceLock<Stylesheets> = OnceLock::new();
    STYLESHEETS.get_or_init(|| Stylesheets::compile(test_highlighter()).unwrap())
}

/// A context with default config, rooted where no asset manifest exists.
pub fn test_context() -> &'static BuildContext {
    static CONTEXT: OnceLock<BuildContext> = OnceLock::new();
    CONTEXT.get_or_init(|| {
        let root = Path::new(env!("CARGO_MANIFEST_DIR")).join("target/quire-test-root");
        BuildContext::init(&root, SiteConfig::default()).unwrap()
    })
}

// =========================================================================
// Documents
// =========================================================================

/// A source document: frontmatter on lines 1-3, body from line 4.
pub fn doc(frontmatter_json: &str, body: &str) -> String {
    format!("---\n{frontmatter_json}\n---\n{body}")
}

/// Frontmatter for template tests with the given `code`/`math` flags.
pub fn frontmatter(code: bool, math: bool) -> Frontmatter {
    Frontmatter {
        title: "Test Post".to_string(),
        subtitle: "A subtitle".to_string(),
        date: "2021-01-02".to_string(),
        code,
        math,
        unlisted: false,
    }
}

// =========================================================================
// Filesystem
// =========================================================================

/// Write `content` to `root/relative`, creating parent directories.
pub fn write_post(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

/// Copy `fixtures/site/` to a temp directory and return it.
pub fn setup_fixtures() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let fixtures = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/site");
    copy_dir_recursive(&fixtures, tmp.path()).unwrap();
    tmp
}

fn copy_dir_recursive(src: &Path, dst: &Path) -> std::io::Result<()> {
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        if src_path.is_dir() {
            fs::create_dir_all(&dst_path)?;
            copy_dir_recursive(&src_path, &dst_path)?;
        } else {
            fs::copy(&src_path, &dst_path)?;
        }
    }
    Ok(())
}
