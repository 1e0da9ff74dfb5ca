//! Page templates.
//!
//! Pure functions from frontmatter and a rendered body to markup, built with
//! maud. Templates emit their `<style>`, `<link>`, `<title>` and `<script>`
//! tags right next to the content that needs them; the
//! [relocator](crate::relocate) moves them to `<head>` and the end of
//! `<body>` afterwards.
//!
//! ```text
//! document            doctype, <html>, <head> skeleton, <body>
//! └── post_page       article shell + code/math assets
//!     └── base_page   site stylesheet, fonts, bundle, <title>
//!         └── body    rendered markup tree
//! ```

use crate::frontmatter::Frontmatter;
use crate::manifest::AssetManifest;
use crate::stylesheet::Stylesheets;
use maud::{DOCTYPE, Markup, PreEscaped, html};

const INCONSOLATA_PRECONNECT: &str = "https://fonts.gstatic.com";
const INCONSOLATA_STYLESHEET: &str =
    "https://fonts.googleapis.com/css2?family=Inconsolata:wght@400;700&display=swap";

const MATHJAX_CONFIG: &str = r#"
MathJax = {
  tex: {
    inlineMath: [['$', '$'], ["\\(", "\\)"]],
    processEscapes: true,
  }
};"#;
const MATHJAX_POLYFILL: &str = "https://polyfill.io/v3/polyfill.min.js?features=es6";
const MATHJAX_LOADER: &str = "https://cdn.jsdelivr.net/npm/mathjax@3/es5/tex-mml-chtml.js";

/// Stylesheets and external assets referenced by every page.
#[derive(Debug, Clone, Copy)]
pub struct PageAssets<'a> {
    pub stylesheets: &'a Stylesheets,
    pub font_stylesheet: &'a str,
    pub bundle: Option<&'a AssetManifest>,
}

/// Base template: site stylesheet, fonts, bundle assets, and the page title.
pub fn base_page(title: &str, assets: &PageAssets<'_>, children: Markup) -> Markup {
    let bundle_css = assets.bundle.and_then(|b| b.url("main.css"));
    let bundle_js = assets.bundle.and_then(|b| b.url("main.js"));

    html! {
        style { (PreEscaped(assets.stylesheets.main.as_str())) }
        link rel="stylesheet" href=(assets.font_stylesheet);
        @if let Some(href) = bundle_css {
            link rel="stylesheet" href=(href);
        }
        title { (title) }
        (children)
        @if let Some(src) = bundle_js {
            script src=(src) defer {}
        }
    }
}

/// Post template: the article shell, plus code and math assets when the
/// frontmatter asks for them.
pub fn post_page(frontmatter: &Frontmatter, assets: &PageAssets<'_>, body: Markup) -> Markup {
    let content = html! {
        div.content {
            article.post {
                time.posted-at { (frontmatter.display_date()) }
                h1.title { (frontmatter.title) }
                section.subtitle { (frontmatter.subtitle) }
                noscript {
                    p.italic {
                        "Some content (math) may not display properly with JavaScript blocked."
                    }
                }
                main { (body) }
            }
        }
        @if frontmatter.code {
            style { (PreEscaped(assets.stylesheets.code.as_str())) }
            link rel="preconnect" href=(INCONSOLATA_PRECONNECT);
            link href=(INCONSOLATA_STYLESHEET) rel="stylesheet";
        }
        @if frontmatter.math {
            script { (PreEscaped(MATHJAX_CONFIG)) }
            script src=(MATHJAX_POLYFILL) {}
            script id="MathJax-script" async src=(MATHJAX_LOADER) {}
        }
    };

    base_page(&frontmatter.title, assets, content)
}

/// Wrap page markup in the fixed outer skeleton. The empty head `<script>`
/// is a placeholder the relocator moves like any other script.
fn skeleton(page: Markup) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1";
                script {}
            }
            body {
                (page)
            }
        }
    }
}

/// Full HTML for a post, before relocation and minification.
pub fn document(frontmatter: &Frontmatter, assets: &PageAssets<'_>, body: Markup) -> String {
    skeleton(post_page(frontmatter, assets, body)).into_string()
}

/// One row of the index page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    pub title: String,
    pub subtitle: String,
    pub date: String,
    pub href: String,
}

/// Full HTML for the post listing, before relocation and minification.
pub fn index_document(entries: &[IndexEntry], assets: &PageAssets<'_>) -> String {
    let content = html! {
        div.content.list {
            h1 { "Posts" }
            table {
                @for entry in entries {
                    tr {
                        td.posted-at { (entry.date) }
                        td {
                            a href=(entry.href) title=(entry.subtitle) { (entry.title) }
                        }
                    }
                }
            }
        }
    };
    skeleton(base_page("Posts", assets, content)).into_string()
}
