//! Post frontmatter: the JSON metadata block at the top of every document.
//!
//! ```text
//! ---
//! {
//!   "title": "Hello",
//!   "subtitle": "A first post",
//!   "date": "2021-01-02",
//!   "code": true
//! }
//! ---
//! Body text…
//! ```
//!
//! Splitting happens during parsing (a missing block or malformed JSON is a
//! [`ParseError`](crate::markup::ParseError)); checking the required fields
//! happens when the page is rendered, so a well-formed block that lacks
//! `title` surfaces as a [`RenderError`](crate::pipeline::RenderError).

use crate::pipeline::RenderError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

const DELIMITER: &str = "---";

/// Validated frontmatter handed to the page templates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Frontmatter {
    pub title: String,
    pub subtitle: String,
    pub date: String,
    pub code: bool,
    pub math: bool,
    pub unlisted: bool,
}

/// Frontmatter as written, before required fields are checked.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawFrontmatter {
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub date: Option<String>,
    #[serde(default)]
    pub code: bool,
    #[serde(default)]
    pub math: bool,
    #[serde(default)]
    pub unlisted: bool,
}

impl TryFrom<RawFrontmatter> for Frontmatter {
    type Error = RenderError;

    fn try_from(raw: RawFrontmatter) -> Result<Self, Self::Error> {
        let required = |value: Option<String>, field: &'static str| {
            value.ok_or(RenderError::MissingField(field))
        };
        Ok(Self {
            title: required(raw.title, "title")?,
            subtitle: required(raw.subtitle, "subtitle")?,
            date: required(raw.date, "date")?,
            code: raw.code,
            math: raw.math,
            unlisted: raw.unlisted,
        })
    }
}

impl Frontmatter {
    /// Parse the JSON text stored on the document root.
    pub fn from_json(json: &str) -> Result<Self, FrontmatterError> {
        let raw: RawFrontmatter = serde_json::from_str(json)?;
        Ok(Self::try_from(raw)?)
    }

    pub fn display_date(&self) -> String {
        format_date(&self.date)
    }
}

/// Human-readable date: `2021-01-02` becomes `02 Jan 2021`, anything else is
/// shown verbatim.
pub fn format_date(date: &str) -> String {
    match NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d") {
        Ok(parsed) => parsed.format("%d %b %Y").to_string(),
        Err(_) => date.to_string(),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FrontmatterError {
    #[error("invalid frontmatter JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Render(#[from] RenderError),
}

/// Split a document into its frontmatter text and body.
///
/// The block opens on the first line with `---` and closes at the next line
/// that is exactly `---`. Returns `None` when there is no such block.
pub fn split(source: &str) -> Option<(&str, &str)> {
    let source = source.strip_prefix('\u{feff}').unwrap_or(source);
    let mut lines = source.split_inclusive('\n');
    let first = lines.next()?;
    if first.trim_end() != DELIMITER {
        return None;
    }

    let start = first.len();
    let mut offset = start;
    for line in lines {
        if line.trim_end() == DELIMITER {
            let block = &source[start..offset];
            let body = &source[offset + line.len()..];
            return Some((block, body));
        }
        offset += line.len();
    }
    None
}
