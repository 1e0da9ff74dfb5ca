//! Asset relocation.
//!
//! Templates emit `<style>`, `<link>`, `<title>` and `<script>` wherever the
//! content that needs them lives. This stage gathers them and moves them to
//! where the browser wants them:
//!
//! ```text
//! <head>  … existing children …  <title> <style>* <link>*  </head>
//! <body>  … existing children …  <script>*                 </body>
//! ```
//!
//! Two lol_html passes: the first collects every asset in document order, the
//! second removes them and appends the groups. Each group keeps its original
//! order, and only the last `<title>` survives. Running the relocator on its
//! own output changes nothing.

use lol_html::errors::RewritingError;
use lol_html::html_content::ContentType;
use lol_html::{RewriteStrSettings, element, rewrite_str, text};
use std::cell::{Cell, RefCell};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RelocateError {
    #[error("HTML rewriting failed: {0}")]
    Rewrite(#[from] RewritingError),
    #[error("document has head assets but no <head> element")]
    MissingHead,
    #[error("document has scripts but no <body> element")]
    MissingBody,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TagKind {
    Script,
    Style,
    Link,
    Title,
    Head,
    Body,
    Other,
}

impl TagKind {
    fn of(tag_name: &str) -> Self {
        match tag_name {
            "script" => TagKind::Script,
            "style" => TagKind::Style,
            "link" => TagKind::Link,
            "title" => TagKind::Title,
            "head" => TagKind::Head,
            "body" => TagKind::Body,
            _ => TagKind::Other,
        }
    }

    fn name(self) -> &'static str {
        match self {
            TagKind::Script => "script",
            TagKind::Style => "style",
            TagKind::Link => "link",
            TagKind::Title => "title",
            TagKind::Head => "head",
            TagKind::Body => "body",
            TagKind::Other => "",
        }
    }
}

/// A collected element. Attribute values and text are kept raw, exactly as
/// lol_html hands them over, so re-serialising does not double-escape.
#[derive(Debug)]
struct Asset {
    kind: TagKind,
    attributes: Vec<(String, String)>,
    text: String,
}

impl Asset {
    fn write_html(&self, out: &mut String) {
        out.push('<');
        out.push_str(self.kind.name());
        for (name, value) in &self.attributes {
            out.push(' ');
            out.push_str(name);
            out.push_str("=\"");
            out.push_str(&value.replace('"', "&quot;"));
            out.push('"');
        }
        out.push('>');
        if self.kind != TagKind::Link {
            out.push_str(&self.text);
            out.push_str("</");
            out.push_str(self.kind.name());
            out.push('>');
        }
    }
}

#[derive(Debug, Default)]
struct Collected {
    assets: Vec<Asset>,
    has_head: bool,
    has_body: bool,
}

impl Collected {
    fn of_kind(&self, kind: TagKind) -> impl Iterator<Item = &Asset> {
        self.assets.iter().filter(move |a| a.kind == kind)
    }

    fn head_html(&self) -> String {
        let mut out = String::new();
        if let Some(title) = self.of_kind(TagKind::Title).last() {
            title.write_html(&mut out);
        }
        for asset in self.of_kind(TagKind::Style).chain(self.of_kind(TagKind::Link)) {
            asset.write_html(&mut out);
        }
        out
    }

    fn body_html(&self) -> String {
        let mut out = String::new();
        for asset in self.of_kind(TagKind::Script) {
            asset.write_html(&mut out);
        }
        out
    }
}

/// Move page assets into `<head>` and to the end of `<body>`.
pub fn relocate(html: &str) -> Result<String, RelocateError> {
    let collected = collect(html)?;

    let head_html = collected.head_html();
    let body_html = collected.body_html();
    if !head_html.is_empty() && !collected.has_head {
        return Err(RelocateError::MissingHead);
    }
    if !body_html.is_empty() && !collected.has_body {
        return Err(RelocateError::MissingBody);
    }

    // Only the first <head>/<body> receives assets.
    let head_done = Cell::new(false);
    let body_done = Cell::new(false);

    let output = rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers: vec![element!("*", |el| {
                match TagKind::of(&el.tag_name()) {
                    TagKind::Script | TagKind::Style | TagKind::Link | TagKind::Title => {
                        el.remove();
                    }
                    TagKind::Head => {
                        if !head_done.replace(true) {
                            el.append(&head_html, ContentType::Html);
                        }
                    }
                    TagKind::Body => {
                        if !body_done.replace(true) {
                            el.append(&body_html, ContentType::Html);
                        }
                    }
                    TagKind::Other => {}
                }
                Ok(())
            })],
            ..RewriteStrSettings::new()
        },
    )?;

    tracing::trace!(
        assets = collected.assets.len(),
        bytes = output.len(),
        "assets relocated"
    );
    Ok(output)
}

fn collect(html: &str) -> Result<Collected, RelocateError> {
    let collected = RefCell::new(Collected::default());
    let push_text = |text: &str| {
        if let Some(asset) = collected.borrow_mut().assets.last_mut() {
            asset.text.push_str(text);
        }
    };

    rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers: vec![
                element!("*", |el| {
                    let kind = TagKind::of(&el.tag_name());
                    let mut c = collected.borrow_mut();
                    match kind {
                        TagKind::Head => c.has_head = true,
                        TagKind::Body => c.has_body = true,
                        TagKind::Other => {}
                        TagKind::Script | TagKind::Style | TagKind::Link | TagKind::Title => {
                            let attributes = el
                                .attributes()
                                .iter()
                                .map(|a| (a.name(), a.value()))
                                .collect();
                            c.assets.push(Asset {
                                kind,
                                attributes,
                                text: String::new(),
                            });
                        }
                    }
                    Ok(())
                }),
                text!("script", |t| {
                    push_text(t.as_str());
                    Ok(())
                }),
                text!("style", |t| {
                    push_text(t.as_str());
                    Ok(())
                }),
                text!("title", |t| {
                    push_text(t.as_str());
                    Ok(())
                }),
            ],
            ..RewriteStrSettings::new()
        },
    )?;

    Ok(collected.into_inner())
}
