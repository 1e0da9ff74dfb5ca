//! CLI output formatting.
//!
//! # Information-First Display
//!
//! Every page leads with its positional index and title; filesystem paths
//! follow as indented context lines. The output reads as a content inventory
//! while still letting users trace each page back to its source.
//!
//! ## Build
//!
//! ```text
//! Pages
//! 001 A look back → posts/2020/retro.md.html
//!     Source: posts/2020/retro.md
//! 002 Work in progress → posts/draft.md.html (unlisted)
//!     Source: posts/draft.md
//!
//! Index → index.html
//!
//! Failed
//!     posts/broken.md
//!         parse error: posts/broken.md: parse error: document has no frontmatter block …
//!
//! Built 2 pages, 1 failed
//! ```
//!
//! ## Check
//!
//! ```text
//! 001 A look back
//!     Source: posts/2020/retro.md
//! Checked 1 document
//! ```
//!
//! # Architecture
//!
//! Each report has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format functions
//! are pure: no I/O, no side effects.

use crate::driver::{BuildReport, DocumentFailure, PageRecord};
use std::error::Error;
use std::path::Path;

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// `1 page`, `2 pages`.
fn count(n: usize, noun: &str) -> String {
    if n == 1 {
        format!("{n} {noun}")
    } else {
        format!("{n} {noun}s")
    }
}

/// Path relative to `base` when possible, with forward slashes.
fn display_relative(path: &Path, base: &Path) -> String {
    let relative = path.strip_prefix(base).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn page_header(index: usize, page: &PageRecord) -> String {
    format!("{} {}", format_index(index), page.title)
}

/// An error and each of its sources, one per line, innermost last.
pub fn format_error_chain(error: &dyn Error) -> Vec<String> {
    let mut lines = vec![error.to_string()];
    let mut current = error.source();
    let mut depth = 1;
    while let Some(cause) = current {
        let message = cause.to_string();
        // thiserror `{0}` messages often embed their source; skip repeats.
        if !lines.iter().any(|l| l.trim_start().ends_with(&message)) {
            lines.push(format!("{}caused by: {}", indent(depth), message));
            depth += 1;
        }
        current = cause.source();
    }
    lines
}

fn format_failures(failures: &[DocumentFailure]) -> Vec<String> {
    let mut lines = Vec::new();
    if failures.is_empty() {
        return lines;
    }
    lines.push("Failed".to_string());
    for failure in failures {
        lines.push(format!(
            "{}{}",
            indent(1),
            display_relative(&failure.source, Path::new(""))
        ));
        let kind = failure.error.kind();
        for (i, line) in format_error_chain(&failure.error).into_iter().enumerate() {
            if i == 0 {
                lines.push(format!("{}{}: {}", indent(2), kind, line));
            } else {
                lines.push(format!("{}{}", indent(2), line.trim_start()));
            }
        }
    }
    lines
}

/// Format the result of a `build` run.
pub fn format_build_output(report: &BuildReport, output_root: &Path) -> Vec<String> {
    let mut lines = Vec::new();

    if !report.pages.is_empty() {
        lines.push("Pages".to_string());
        for (i, page) in report.pages.iter().enumerate() {
            let marker = if page.unlisted { " (unlisted)" } else { "" };
            lines.push(format!(
                "{} → {}{}",
                page_header(i + 1, page),
                display_relative(&page.destination, output_root),
                marker
            ));
            lines.push(format!(
                "{}Source: {}",
                indent(1),
                display_relative(&page.source, Path::new(""))
            ));
        }
    }

    if let Some(index) = &report.index {
        lines.push(String::new());
        lines.push(format!("Index → {}", display_relative(index, output_root)));
    }

    if !report.failures.is_empty() {
        lines.push(String::new());
        lines.extend(format_failures(&report.failures));
    }

    lines.push(String::new());
    let mut summary = format!("Built {}", count(report.pages.len(), "page"));
    if !report.failures.is_empty() {
        summary.push_str(&format!(", {} failed", report.failures.len()));
    }
    lines.push(summary);
    lines
}

/// Print build output to stdout.
pub fn print_build_output(report: &BuildReport, output_root: &Path) {
    for line in format_build_output(report, output_root) {
        println!("{}", line);
    }
}

/// Format the result of a `check` run: nothing was written.
pub fn format_check_output(report: &BuildReport) -> Vec<String> {
    let mut lines = Vec::new();
    for (i, page) in report.pages.iter().enumerate() {
        lines.push(page_header(i + 1, page));
        lines.push(format!(
            "{}Source: {}",
            indent(1),
            display_relative(&page.source, Path::new(""))
        ));
    }
    if !report.failures.is_empty() {
        lines.extend(format_failures(&report.failures));
    }
    lines.push(format!("Checked {}", count(report.total(), "document")));
    lines
}

/// Print check output to stdout.
pub fn print_check_output(report: &BuildReport) {
    for line in format_check_output(report) {
        println!("{}", line);
    }
}
