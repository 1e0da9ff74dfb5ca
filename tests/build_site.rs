//! End-to-end build of the fixture site, through the library and the binary.
//!
//! The fixture under `fixtures/site/` has three posts: one with code, one with
//! math nested two directories deep, and one unlisted draft. It also ships a
//! bundler manifest so hashed asset links show up in every page.

use quire::config;
use quire::context::BuildContext;
use quire::driver::{self, BuildOptions};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn fixture_site() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let fixtures = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/site");
    copy_dir(&fixtures, tmp.path());
    tmp
}

fn copy_dir(src: &Path, dst: &Path) {
    for entry in fs::read_dir(src).unwrap() {
        let entry = entry.unwrap();
        let target = dst.join(entry.file_name());
        if entry.path().is_dir() {
            fs::create_dir_all(&target).unwrap();
            copy_dir(&entry.path(), &target);
        } else {
            fs::copy(entry.path(), &target).unwrap();
        }
    }
}

fn build(root: &Path) -> driver::BuildReport {
    let site_config = config::load_config(root, None).unwrap();
    let ctx = BuildContext::init(root, site_config).unwrap();
    driver::build(&ctx, &BuildOptions::from_config(&ctx.config)).unwrap()
}

fn read(root: &Path, relative: &str) -> String {
    fs::read_to_string(root.join(relative)).unwrap()
}

/// Byte offset of `needle`, panicking with context if it is missing.
fn offset(html: &str, needle: &str) -> usize {
    html.find(needle)
        .unwrap_or_else(|| panic!("`{needle}` not found in output"))
}

#[test]
fn every_post_lands_at_its_source_path() {
    let site = fixture_site();
    let report = build(site.path());

    assert_eq!(report.pages.len(), 3);
    for page in ["posts/hello.md", "posts/draft.md", "posts/2020/retro.md"] {
        let expected: PathBuf = site.path().join("public").join(format!("{page}.html"));
        assert!(expected.is_file(), "missing {}", expected.display());
    }
    assert!(site.path().join("public/index.html").is_file());
}

#[test]
fn assets_end_up_in_head_and_body() {
    let site = fixture_site();
    build(site.path());
    let html = read(site.path(), "public/posts/2020/retro.md.html");

    let head_end = offset(&html, "</head>");
    let body_end = offset(&html, "</body>");

    // Stylesheets, font links and the title are hoisted into <head>.
    assert!(offset(&html, "<title>") < head_end);
    assert!(offset(&html, "<style>") < head_end);
    assert!(offset(&html, "/assets/css/styles.5e1f0c.css") < head_end);
    assert!(!html[head_end..].contains("<style"));
    assert!(!html[head_end..].contains("<link"));

    // Every script sits after the article, at the end of <body>.
    let article_end = offset(&html, "</article>");
    let mut from = 0;
    while let Some(pos) = html[from..].find("<script") {
        let at = from + pos;
        assert!(at > article_end && at < body_end, "script at {at} outside body tail");
        from = at + 1;
    }
    assert!(html.contains("MathJax-script"));
    assert!(html.contains("/assets/js/bundle.5e1f0c.js"));
}

#[test]
fn code_and_math_assets_follow_frontmatter() {
    let site = fixture_site();
    build(site.path());

    let hello = read(site.path(), "public/posts/hello.md.html");
    assert!(hello.contains("fonts.googleapis.com"));
    assert!(hello.contains("highlighttable"));
    assert!(!hello.contains("MathJax"));
    // Source `<world>` is escaped by the highlighter.
    assert!(!hello.contains("<world>"));

    let retro = read(site.path(), "public/posts/2020/retro.md.html");
    assert!(retro.contains("MathJax"));
    // main.scss names Inconsolata on every page; only code posts load it.
    assert!(!retro.contains("fonts.googleapis.com"));
    assert!(!retro.contains("fonts.gstatic.com"));
    // The nested python block is highlighted too.
    assert!(retro.contains("highlighttable"));
}

#[test]
fn index_lists_listed_posts_newest_first() {
    let site = fixture_site();
    build(site.path());
    let index = read(site.path(), "public/index.html");

    let hello = offset(&index, "Hello, world");
    let retro = offset(&index, "A look back");
    assert!(hello < retro);
    assert!(!index.contains("Work in progress"));
    assert!(index.contains("posts/2020/retro.md.html"));
}

#[test]
fn rebuild_is_byte_identical() {
    let site = fixture_site();
    build(site.path());
    let first = read(site.path(), "public/posts/hello.md.html");
    build(site.path());
    let second = read(site.path(), "public/posts/hello.md.html");
    assert_eq!(first, second);
}

#[test]
fn cli_keep_going_reports_failures_and_exits_non_zero() {
    let site = fixture_site();
    fs::write(
        site.path().join("posts/broken.md"),
        "no frontmatter here\n",
    )
    .unwrap();

    let out = Command::new(env!("CARGO_BIN_EXE_quire"))
        .arg("--root")
        .arg(site.path())
        .args(["build", "--keep-going"])
        .output()
        .unwrap();

    assert!(!out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("posts/broken.md"));
    assert!(stdout.contains("Built 3 pages, 1 failed"));
    // The good posts were still written.
    assert!(site.path().join("public/posts/hello.md.html").is_file());
}

#[test]
fn cli_check_writes_nothing() {
    let site = fixture_site();
    let out = Command::new(env!("CARGO_BIN_EXE_quire"))
        .arg("--root")
        .arg(site.path())
        .arg("check")
        .output()
        .unwrap();

    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("Checked 3 documents"));
    assert!(!site.path().join("public").exists());
}

#[test]
fn cli_gen_config_parses_back() {
    let out = Command::new(env!("CARGO_BIN_EXE_quire"))
        .arg("gen-config")
        .output()
        .unwrap();
    assert!(out.status.success());
    let text = String::from_utf8(out.stdout).unwrap();
    let parsed: config::SiteConfig = toml::from_str(&text).unwrap();
    assert_eq!(parsed.posts, "posts/*.md");
}
