//! Stylesheets compiled once per build.
//!
//! The site stylesheet is SCSS embedded at compile time from
//! `static/main.scss` and compiled with grass; the code stylesheet is
//! generated from the highlighter's theme. Both are inlined into pages by the
//! templates, so they are plain strings by the time a document is rendered.

use crate::context::ConfigurationError;
use crate::highlight::Highlighter;
use grass::{Options, OutputStyle};

const MAIN_SCSS: &str = include_str!("../static/main.scss");

/// Compiled CSS shared by every page.
#[derive(Debug, Clone)]
pub struct Stylesheets {
    /// Global site stylesheet, always inlined.
    pub main: String,
    /// Syntax highlighting colours, inlined only on posts with `code: true`.
    pub code: String,
}

impl Stylesheets {
    /// Compile the embedded site SCSS and generate the code stylesheet.
    pub fn compile(highlighter: &Highlighter) -> Result<Self, ConfigurationError> {
        Ok(Self {
            main: compile_scss(MAIN_SCSS)?,
            code: highlighter.stylesheet()?,
        })
    }
}

/// Compile SCSS source to compressed CSS.
pub fn compile_scss(scss: &str) -> Result<String, ConfigurationError> {
    let options = Options::default().style(OutputStyle::Compressed);
    grass::from_string(scss, &options).map_err(|e| ConfigurationError::Stylesheet(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::test_highlighter;

    #[test]
    fn embedded_stylesheet_compiles() {
        let css = compile_scss(MAIN_SCSS).unwrap();
        assert!(css.contains(".post .subtitle"));
        assert!(!css.contains('$'));
        assert!(!css.contains("@include"));
    }

    #[test]
    fn variables_nesting_and_media_queries_flatten() {
        let css = compile_scss(
            "$w: 700px;\n.a { .b { color: red; } @media (min-width: $w) { color: blue; } }",
        )
        .unwrap();
        assert!(css.contains(".a .b{color:red}"));
        assert!(css.contains("@media"));
        assert!(css.contains("700px"));
        assert!(!css.contains("$w"));
    }

    #[test]
    fn syntax_error_is_configuration_error() {
        let err = compile_scss(".a { color: red;").unwrap_err();
        assert!(matches!(err, ConfigurationError::Stylesheet(_)));
    }

    #[test]
    fn compile_produces_both_sheets() {
        let sheets = Stylesheets::compile(test_highlighter()).unwrap();
        assert!(!sheets.main.is_empty());
        assert!(sheets.code.contains(".hl-"));
    }
}
