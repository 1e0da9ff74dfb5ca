//! Syntax highlighting for fenced code blocks.
//!
//! Built once per build (loading syntect's bundled syntaxes and themes is the
//! expensive part) and shared read-only by every document. Output is
//! class-based HTML with a line-number column:
//!
//! ```text
//! <div class="highlight">
//!   <table class="highlighttable"><tr>
//!     <td class="linenos"><div class="linenodiv"><pre>1
//! 2</pre></div></td>
//!     <td class="code"><pre><span class="hl-source hl-python">…</span></pre></td>
//!   </tr></table>
//! </div>
//! ```
//!
//! The matching colours come from [`Highlighter::stylesheet`], which the post
//! template inlines when a post sets `code: true`.

use crate::context::ConfigurationError;
use crate::pipeline::RenderError;
use syntect::highlighting::{Theme, ThemeSet};
use syntect::html::{ClassStyle, ClassedHTMLGenerator, css_for_theme_with_class_style};
use syntect::parsing::{SyntaxReference, SyntaxSet};
use syntect::util::LinesWithEndings;

/// Prefix keeps token classes from colliding with page classes like `.title`.
const CLASS_STYLE: ClassStyle = ClassStyle::SpacedPrefixed { prefix: "hl-" };

/// Fence tags rendered without highlighting. TOML and INI have no bundled
/// syntax.
const PLAIN_TEXT: &[&str] = &[
    "text", "plaintext", "plain", "txt", "none", "nohighlight", "toml", "ini", "cfg",
];

/// Common fence tags that bundled syntaxes don't answer to, mapped to a
/// token they do.
const ALIASES: &[(&str, &str)] = &[
    ("console", "bash"),
    ("shell", "bash"),
    ("shell-session", "bash"),
    ("zsh", "bash"),
    ("ts", "js"),
    ("typescript", "js"),
    ("tsx", "js"),
    ("jsx", "js"),
    ("python3", "py"),
    ("py3", "py"),
    ("golang", "go"),
    ("c++", "cpp"),
    ("yml", "yaml"),
];

pub struct Highlighter {
    syntax_set: SyntaxSet,
    theme: Theme,
    theme_name: String,
}

impl std::fmt::Debug for Highlighter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Highlighter")
            .field("theme", &self.theme_name)
            .field("syntaxes", &self.syntax_set.syntaxes().len())
            .finish()
    }
}

impl Highlighter {
    /// Load bundled syntaxes and the named theme.
    pub fn new(theme_name: &str) -> Result<Self, ConfigurationError> {
        let mut themes = ThemeSet::load_defaults();
        let Some(theme) = themes.themes.remove(theme_name) else {
            let mut available: Vec<String> = themes.themes.into_keys().collect();
            available.sort();
            return Err(ConfigurationError::UnknownTheme {
                name: theme_name.to_string(),
                available,
            });
        };
        Ok(Self {
            syntax_set: SyntaxSet::load_defaults_newlines(),
            theme,
            theme_name: theme_name.to_string(),
        })
    }

    pub fn theme_name(&self) -> &str {
        &self.theme_name
    }

    /// Whether `language` resolves to a known syntax.
    pub fn supports(&self, language: &str) -> bool {
        self.find_syntax(language).is_some()
    }

    /// Empty and plain-text tags map to plain text; aliases are rewritten
    /// before syntect's own name and extension lookup.
    fn find_syntax(&self, language: &str) -> Option<&SyntaxReference> {
        let token = language.trim();
        let lower = token.to_ascii_lowercase();
        if token.is_empty() || PLAIN_TEXT.contains(&lower.as_str()) {
            return Some(self.syntax_set.find_syntax_plain_text());
        }
        let token = ALIASES
            .iter()
            .find(|(alias, _)| *alias == lower)
            .map_or(token, |&(_, target)| target);
        self.syntax_set.find_syntax_by_token(token)
    }

    /// Highlight `code` as `language` (a syntax name, file extension or
    /// common alias such as `console`, case-insensitive). An empty language
    /// or `text` means plain text.
    ///
    /// Leading blank lines and trailing whitespace are stripped first.
    pub fn highlight(&self, language: &str, code: &str) -> Result<String, RenderError> {
        let token = language.trim();
        let syntax = self
            .find_syntax(token)
            .ok_or_else(|| RenderError::UnknownLanguage {
                language: token.to_string(),
            })?;

        let code = code.trim_start_matches(['\n', '\r']).trim_end();
        let source = format!("{code}\n");

        let mut generator =
            ClassedHTMLGenerator::new_with_class_style(syntax, &self.syntax_set, CLASS_STYLE);
        for line in LinesWithEndings::from(&source) {
            generator
                .parse_html_for_line_which_includes_newline(line)
                .map_err(|e| RenderError::Highlight {
                    language: token.to_string(),
                    message: e.to_string(),
                })?;
        }
        let body = generator.finalize();

        let line_count = code.lines().count().max(1);
        let numbers = (1..=line_count)
            .map(|n| n.to_string())
            .collect::<Vec<_>>()
            .join("\n");

        Ok(format!(
            concat!(
                r#"<div class="highlight"><table class="highlighttable"><tr>"#,
                r#"<td class="linenos"><div class="linenodiv"><pre>{numbers}</pre></div></td>"#,
                r#"<td class="code"><pre>{body}</pre></td>"#,
                "</tr></table></div>"
            ),
            numbers = numbers,
            body = body,
        ))
    }

    /// CSS for the configured theme, matching the classes [`highlight`](Self::highlight) emits.
    pub fn stylesheet(&self) -> Result<String, ConfigurationError> {
        css_for_theme_with_class_style(&self.theme, CLASS_STYLE)
            .map_err(|e| ConfigurationError::HighlightStylesheet(e.to_string()))
    }
}
