//! # quire
//!
//! A static site generator for a personal blog. Posts are CommonMark files
//! with a JSON frontmatter block and block-level `{% Component %}` tags; the
//! output is one minified HTML file per post plus an index page.
//!
//! # Architecture: One Sequential Pipeline
//!
//! ```text
//! BuildContext::init      config → highlighter, stylesheets, registry, asset manifest
//!        │
//!        ▼
//! for each posts/*.md (sorted):
//!   parse → transform → render → templates → relocate → minify → public/<path>.html
//! ```
//!
//! Everything that is expensive or can be misconfigured is built once, up
//! front, in [`context::BuildContext::init`]. A failure there stops the build
//! before any document is read. Each document then runs through pure
//! functions that only borrow the context, one after the other.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`config`] | `config.toml` loading, stock defaults, merging, and validation |
//! | [`context`] | Build-wide resources and configuration errors |
//! | [`highlight`] | syntect-based highlighter for fenced code blocks |
//! | [`stylesheet`] | SCSS compilation with grass, plus the generated code stylesheet |
//! | [`manifest`] | Bundler manifest lookups for hashed asset filenames |
//! | [`frontmatter`] | Frontmatter splitting, validation, and date display |
//! | [`markup`] | Markup tree: parse, transform, and render post bodies |
//! | [`components`] | `{% Name %}` component trait, registry, and built-ins |
//! | [`templates`] | Maud page templates: base, post, and index |
//! | [`pipeline`] | Per-document pipeline and its error types |
//! | [`relocate`] | lol_html pass moving assets into `<head>` and `<body>` |
//! | [`minify`] | minify-html wrapper |
//! | [`driver`] | Source discovery, failure policy, writing, and the index page |
//! | [`output`] | CLI output formatting for build and check reports |
//!
//! # Design Decisions
//!
//! ## Maud Over Template Engines
//!
//! Pages are built with [Maud](https://maud.lambda.xyz/), so templates are
//! checked at compile time and interpolation is escaped by default. The only
//! pre-escaped content is the highlighter's output and the compiled CSS.
//!
//! ## Assets Live Next to What Needs Them
//!
//! Templates emit `<style>`, `<link>` and `<script>` inline where the content
//! requires them (a code stylesheet only on posts with code, MathJax only on
//! posts with math). The [`relocate`] stage then hoists them, so no template
//! has to know what its children will need in `<head>`.
//!
//! ## Failure Policy
//!
//! By default the first failing document aborts the build. With
//! `on_error = "continue"` (or `build --keep-going`) every document is
//! attempted, every failure is reported, and the process still exits
//! non-zero.

pub mod components;
pub mod config;
pub mod context;
pub mod driver;
pub mod frontmatter;
pub mod highlight;
pub mod manifest;
pub mod markup;
pub mod minify;
pub mod output;
pub mod pipeline;
pub mod relocate;
pub mod stylesheet;
pub mod templates;

#[cfg(test)]
pub(crate) mod test_helpers;
