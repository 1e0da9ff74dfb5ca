//! The markup tree: parsing, transforming, and rendering post bodies.
//!
//! A post body is CommonMark plus block-level component tags:
//!
//! ````text
//! Some *prose*.
//!
//! {% Callout kind="warning" %}
//! Careful with that axe.
//! {% /Callout %}
//!
//! {% Figure src="/img/a.png" caption="A figure" /%}
//!
//! ```python title="demo.py"
//! print("hi")
//! ```
//! ````
//!
//! The tree goes through three steps, mirroring the build pipeline:
//!
//! 1. [`parse`] splits off the frontmatter and builds [`Node`]s. Tag lines are
//!    recognised outside code blocks only, and a tag anywhere else in prose is
//!    an error; top-level fences become [`Node::Fence`], everything else stays
//!    as [`Node::Prose`]. Link reference definitions and footnote order are
//!    collected from the whole body and stored on the root.
//! 2. [`transform`] resolves component names against the [`Registry`] and
//!    merges fence attributes.
//! 3. [`render`] produces a `maud` element tree. Prose goes through
//!    pulldown-cmark; every fenced block, nested or not, goes through the
//!    [`Highlighter`]. Each prose chunk resolves links and numbers footnotes
//!    against the document-wide tables, so splitting at fences and tags is
//!    invisible in the output.

use crate::components::Registry;
use crate::frontmatter;
use crate::highlight::Highlighter;
use crate::pipeline::RenderError;
use maud::{Markup, PreEscaped, html};
use pulldown_cmark::{
    BrokenLink, CodeBlockKind, CowStr, Event, Options, Parser, Tag, TagEnd, html as md_html,
};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::ops::Range;
use std::path::Path;
use thiserror::Error;

/// Node attributes. Values are JSON scalars, as written in tag syntax.
pub type Attributes = BTreeMap<String, Value>;

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("document has no frontmatter block (expected leading `---` lines)")]
    MissingFrontmatter,
    #[error("frontmatter is not valid JSON: {0}")]
    Frontmatter(#[from] serde_json::Error),
    #[error("frontmatter must be a JSON object")]
    FrontmatterNotObject,
    #[error("line {line}: malformed tag: {message}")]
    InvalidTag { line: usize, message: String },
    #[error("line {line}: {message}")]
    Attribute { line: usize, message: String },
    #[error("code fence attributes: {0}")]
    FenceAttribute(String),
    #[error("line {line}: tag `{name}` is never closed")]
    UnclosedTag { name: String, line: usize },
    #[error("line {line}: closing tag `{name}` does not match an open tag")]
    UnexpectedClose { name: String, line: usize },
    #[error("unknown component `{0}`")]
    UnknownComponent(String),
}

/// A node of the markup tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Root. Renders its children with no wrapping element.
    Document {
        attributes: Attributes,
        children: Vec<Node>,
    },
    /// Fenced code block.
    Fence {
        language: String,
        content: String,
        attributes: Attributes,
    },
    /// A `{% Name %}` tag resolved through the component registry.
    Component {
        name: String,
        attributes: Attributes,
        children: Vec<Node>,
    },
    /// Plain CommonMark.
    Prose(String),
}

impl Node {
    pub fn attributes(&self) -> Option<&Attributes> {
        match self {
            Node::Document { attributes, .. }
            | Node::Fence { attributes, .. }
            | Node::Component { attributes, .. } => Some(attributes),
            Node::Prose(_) => None,
        }
    }

    pub fn children(&self) -> &[Node] {
        match self {
            Node::Document { children, .. } | Node::Component { children, .. } => children,
            Node::Fence { .. } | Node::Prose(_) => &[],
        }
    }

    /// JSON-encoded frontmatter stored on the root.
    pub fn frontmatter(&self) -> Option<&str> {
        match self {
            Node::Document { attributes, .. } => {
                attributes.get("frontmatter").and_then(Value::as_str)
            }
            _ => None,
        }
    }
}

// ============================================================================
// Parse
// ============================================================================

/// Parse a whole source document into a [`Node::Document`].
pub fn parse(source: &str) -> Result<Node, ParseError> {
    let (block, body) = frontmatter::split(source).ok_or(ParseError::MissingFrontmatter)?;
    let value: Value = serde_json::from_str(block)?;
    if !value.is_object() {
        return Err(ParseError::FrontmatterNotObject);
    }

    // `body` is a suffix of `source`, so the prefix is the frontmatter block.
    let first_line = source[..source.len() - body.len()].lines().count() + 1;

    let mut attributes = Attributes::new();
    attributes.insert("frontmatter".to_string(), Value::String(value.to_string()));
    let (references, footnotes) = document_tables(body);
    if !references.is_empty() {
        attributes.insert("references".to_string(), Value::Object(references));
    }
    if !footnotes.is_empty() {
        attributes.insert("footnotes".to_string(), Value::Array(footnotes));
    }

    Ok(Node::Document {
        attributes,
        children: parse_blocks(body, first_line)?,
    })
}

struct OpenTag {
    name: String,
    attributes: Attributes,
    children: Vec<Node>,
    line: usize,
}

fn parse_blocks(body: &str, first_line: usize) -> Result<Vec<Node>, ParseError> {
    let code = code_ranges(body);
    let mut root = Vec::new();
    let mut stack: Vec<OpenTag> = Vec::new();
    let mut prose = String::new();
    let mut prose_line = first_line;
    let mut offset = 0;

    for (index, line) in body.split_inclusive('\n').enumerate() {
        let line_no = first_line + index;
        let start = offset;
        offset += line.len();

        let content = start..start + line.trim_end().len();
        let tag = if overlaps(&code, &content) {
            None
        } else {
            TagLine::parse(line, line_no)?
        };
        let Some(tag) = tag else {
            if prose.is_empty() {
                prose_line = line_no;
            }
            prose.push_str(line);
            continue;
        };

        flush_prose(&mut prose, prose_line, target(&mut stack, &mut root))?;

        match tag {
            TagLine::Open { name, attributes } => stack.push(OpenTag {
                name,
                attributes,
                children: Vec::new(),
                line: line_no,
            }),
            TagLine::SelfClosing { name, attributes } => {
                target(&mut stack, &mut root).push(Node::Component {
                    name,
                    attributes,
                    children: Vec::new(),
                });
            }
            TagLine::Close { name } => {
                let open = match stack.pop() {
                    Some(open) if open.name == name => open,
                    _ => return Err(ParseError::UnexpectedClose { name, line: line_no }),
                };
                target(&mut stack, &mut root).push(Node::Component {
                    name: open.name,
                    attributes: open.attributes,
                    children: open.children,
                });
            }
        }
    }

    if let Some(open) = stack.pop() {
        return Err(ParseError::UnclosedTag {
            name: open.name,
            line: open.line,
        });
    }
    flush_prose(&mut prose, prose_line, &mut root)?;
    Ok(root)
}

/// Byte ranges of every code block in `body`, fenced or indented, at any
/// nesting depth.
fn code_ranges(body: &str) -> Vec<Range<usize>> {
    Parser::new_ext(body, markdown_options())
        .into_offset_iter()
        .filter_map(|(event, range)| {
            matches!(event, Event::Start(Tag::CodeBlock(_))).then_some(range)
        })
        .collect()
}

fn overlaps(ranges: &[Range<usize>], span: &Range<usize>) -> bool {
    ranges
        .iter()
        .any(|range| range.start < span.end && span.start < range.end)
}

/// Link reference definitions keyed by normalised label, and footnote labels
/// in order of first appearance, across the whole body.
fn document_tables(body: &str) -> (Map<String, Value>, Vec<Value>) {
    let mut parser = Parser::new_ext(body, markdown_options());

    let mut references = Map::new();
    for (label, definition) in parser.reference_definitions().iter() {
        let mut entry = Map::new();
        entry.insert("dest".to_string(), Value::String(definition.dest.to_string()));
        if let Some(title) = &definition.title {
            entry.insert("title".to_string(), Value::String(title.to_string()));
        }
        references.insert(link_key(label), Value::Object(entry));
    }

    let mut footnotes: Vec<Value> = Vec::new();
    for event in parser.by_ref() {
        let label = match event {
            Event::FootnoteReference(label) | Event::Start(Tag::FootnoteDefinition(label)) => label,
            _ => continue,
        };
        let label = Value::String(label.to_string());
        if !footnotes.contains(&label) {
            footnotes.push(label);
        }
    }
    (references, footnotes)
}

/// Link labels match case-insensitively with whitespace collapsed.
fn link_key(label: &str) -> String {
    label
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Children list new nodes are appended to: the innermost open tag, or the root.
fn target<'a>(stack: &'a mut [OpenTag], root: &'a mut Vec<Node>) -> &'a mut Vec<Node> {
    match stack.last_mut() {
        Some(open) => &mut open.children,
        None => root,
    }
}

fn flush_prose(
    prose: &mut String,
    first_line: usize,
    children: &mut Vec<Node>,
) -> Result<(), ParseError> {
    if !prose.trim().is_empty() {
        children.extend(split_fences(prose, first_line)?);
    }
    prose.clear();
    Ok(())
}

/// Split a CommonMark chunk into prose and top-level fenced code blocks.
///
/// Every fence, nested or not, has its info string validated here. A `{%`
/// in prose text means a tag that is not on a line of its own.
fn split_fences(text: &str, first_line: usize) -> Result<Vec<Node>, ParseError> {
    let mut nodes = Vec::new();
    let mut last = 0;
    let mut depth = 0usize;
    let mut in_code = false;
    // (start offset, fence node collecting its content)
    let mut current: Option<(usize, Node)> = None;

    for (event, range) in Parser::new_ext(text, markdown_options()).into_offset_iter() {
        match event {
            Event::Start(Tag::CodeBlock(kind)) => {
                if let CodeBlockKind::Fenced(info) = kind {
                    let fence = fence_from_info(&info, String::new())?;
                    if depth == 0 {
                        current = Some((range.start, fence));
                    }
                }
                in_code = true;
                depth += 1;
            }
            Event::Start(_) => depth += 1,
            Event::End(TagEnd::CodeBlock) => {
                in_code = false;
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    if let Some((start, fence)) = current.take() {
                        push_prose(&mut nodes, &text[last..start]);
                        nodes.push(fence);
                        last = range.end;
                    }
                }
            }
            Event::End(_) => depth = depth.saturating_sub(1),
            Event::Text(t) if in_code => {
                if let Some((_, Node::Fence { content, .. })) = current.as_mut() {
                    content.push_str(&t);
                }
            }
            Event::Text(t) if t.contains("{%") => {
                let line = first_line + text[..range.start].matches('\n').count();
                return Err(ParseError::InvalidTag {
                    line,
                    message: format!("`{}` must be on a line of its own", t.trim()),
                });
            }
            _ => {}
        }
    }
    push_prose(&mut nodes, &text[last..]);
    Ok(nodes)
}

fn push_prose(nodes: &mut Vec<Node>, text: &str) {
    if !text.trim().is_empty() {
        nodes.push(Node::Prose(text.to_string()));
    }
}

/// Build a fence node from an info string like `python title="a.py"` or
/// `python {% title="a.py" %}`.
fn fence_from_info(info: &str, content: String) -> Result<Node, ParseError> {
    let info = info.trim();
    let (language, rest) = info.split_once(char::is_whitespace).unwrap_or((info, ""));
    let rest = rest.trim();
    let rest = rest
        .strip_prefix("{%")
        .and_then(|r| r.strip_suffix("%}"))
        .unwrap_or(rest);
    let attributes = parse_attributes(rest).map_err(ParseError::FenceAttribute)?;
    Ok(Node::Fence {
        language: language.to_string(),
        content,
        attributes,
    })
}

/// Footnotes use the non-GFM flavour so a reference still parses when its
/// definition sits in another prose chunk.
fn markdown_options() -> Options {
    Options::ENABLE_TABLES
        | Options::ENABLE_OLD_FOOTNOTES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS
}

enum TagLine {
    Open { name: String, attributes: Attributes },
    SelfClosing { name: String, attributes: Attributes },
    Close { name: String },
}

impl TagLine {
    /// `Ok(None)` if the line is not a tag line at all.
    fn parse(line: &str, line_no: usize) -> Result<Option<Self>, ParseError> {
        let Some(inner) = line
            .trim()
            .strip_prefix("{%")
            .and_then(|s| s.strip_suffix("%}"))
        else {
            return Ok(None);
        };
        let inner = inner.trim();
        let invalid = |message: String| ParseError::InvalidTag {
            line: line_no,
            message,
        };

        if let Some(name) = inner.strip_prefix('/') {
            let name = name.trim();
            if !is_valid_name(name) {
                return Err(invalid(format!("bad closing tag name `{name}`")));
            }
            return Ok(Some(TagLine::Close {
                name: name.to_string(),
            }));
        }

        let (inner, self_closing) = match inner.strip_suffix('/') {
            Some(rest) => (rest.trim_end(), true),
            None => (inner, false),
        };
        let (name, rest) = inner.split_once(char::is_whitespace).unwrap_or((inner, ""));
        if !is_valid_name(name) {
            return Err(invalid(format!("bad tag name `{name}`")));
        }
        let attributes = parse_attributes(rest).map_err(|message| ParseError::Attribute {
            line: line_no,
            message,
        })?;

        let name = name.to_string();
        Ok(Some(if self_closing {
            TagLine::SelfClosing { name, attributes }
        } else {
            TagLine::Open { name, attributes }
        }))
    }
}

fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Parse `key="string" flag count=3 enabled=false` into attributes.
///
/// A bare key is `true`. Values are JSON scalars.
pub fn parse_attributes(input: &str) -> Result<Attributes, String> {
    let mut attributes = Attributes::new();
    let mut rest = input.trim_start();

    while !rest.is_empty() {
        let key_end = rest
            .find(|c: char| c == '=' || c.is_whitespace())
            .unwrap_or(rest.len());
        let key = &rest[..key_end];
        if !is_valid_name(key) {
            return Err(format!("invalid attribute name near `{rest}`"));
        }
        rest = &rest[key_end..];

        let value = match rest.strip_prefix('=') {
            Some(after) => {
                let (value, remaining) = parse_value(after)?;
                rest = remaining;
                value
            }
            None => Value::Bool(true),
        };
        attributes.insert(key.to_string(), value);
        rest = rest.trim_start();
    }
    Ok(attributes)
}

fn parse_value(input: &str) -> Result<(Value, &str), String> {
    if input.starts_with('"') {
        let mut escaped = false;
        for (i, c) in input.char_indices().skip(1) {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => {
                    let literal = &input[..=i];
                    let value = serde_json::from_str(literal)
                        .map_err(|e| format!("bad string {literal}: {e}"))?;
                    return Ok((value, &input[i + 1..]));
                }
                _ => {}
            }
        }
        return Err(format!("unterminated string `{input}`"));
    }

    let end = input.find(char::is_whitespace).unwrap_or(input.len());
    let token = &input[..end];
    match serde_json::from_str::<Value>(token) {
        Ok(value) if !value.is_object() && !value.is_array() => Ok((value, &input[end..])),
        _ => Err(format!("unsupported attribute value `{token}`")),
    }
}

// ============================================================================
// Transform
// ============================================================================

/// Inputs needed to transform a parsed tree.
pub struct TransformConfig<'a> {
    /// Source path, recorded on the document node.
    pub source: &'a Path,
    pub registry: &'a Registry,
}

/// Resolve components and normalise fence attributes.
pub fn transform(node: Node, config: &TransformConfig<'_>) -> Result<Node, ParseError> {
    match node {
        Node::Document {
            mut attributes,
            children,
        } => {
            attributes.insert(
                "source".to_string(),
                Value::String(config.source.display().to_string()),
            );
            Ok(Node::Document {
                attributes,
                children: transform_children(children, config)?,
            })
        }
        Node::Fence {
            language,
            content,
            attributes: explicit,
        } => {
            let mut attributes = Attributes::new();
            attributes.insert("language".to_string(), Value::String(language));
            attributes.insert("content".to_string(), Value::String(content));
            attributes.insert("process".to_string(), Value::Bool(true));
            attributes.extend(explicit);

            let language = string_attribute(&attributes, "language")?;
            let content = string_attribute(&attributes, "content")?;
            Ok(Node::Fence {
                language,
                content,
                attributes,
            })
        }
        Node::Component {
            name,
            attributes,
            children,
        } => {
            if !config.registry.contains(&name) {
                return Err(ParseError::UnknownComponent(name));
            }
            Ok(Node::Component {
                name,
                attributes,
                children: transform_children(children, config)?,
            })
        }
        prose @ Node::Prose(_) => Ok(prose),
    }
}

fn transform_children(
    children: Vec<Node>,
    config: &TransformConfig<'_>,
) -> Result<Vec<Node>, ParseError> {
    children
        .into_iter()
        .map(|child| transform(child, config))
        .collect()
}

fn string_attribute(attributes: &Attributes, key: &str) -> Result<String, ParseError> {
    match attributes.get(key) {
        Some(Value::String(s)) => Ok(s.clone()),
        _ => Err(ParseError::FenceAttribute(format!(
            "`{key}` must be a string"
        ))),
    }
}

// ============================================================================
// Render
// ============================================================================

/// Read-only collaborators used while rendering.
pub struct RenderContext<'a> {
    pub highlighter: &'a Highlighter,
    pub registry: &'a Registry,
}

/// Render a transformed tree into an element tree.
pub fn render(node: &Node, ctx: &RenderContext<'_>) -> Result<Markup, RenderError> {
    render_node(node, ctx, DocumentTables::default())
}

/// Link and footnote tables stored on the root by [`parse`].
#[derive(Clone, Copy, Default)]
struct DocumentTables<'a> {
    references: Option<&'a Map<String, Value>>,
    footnotes: Option<&'a [Value]>,
}

impl<'a> DocumentTables<'a> {
    fn of(attributes: &'a Attributes) -> Self {
        Self {
            references: attributes.get("references").and_then(Value::as_object),
            footnotes: attributes
                .get("footnotes")
                .and_then(Value::as_array)
                .map(Vec::as_slice),
        }
    }

    /// Destination and title of a reference defined anywhere in the document.
    fn reference(&self, label: &str) -> Option<(String, String)> {
        let entry = self.references?.get(&link_key(label))?;
        let dest = entry.get("dest")?.as_str()?.to_string();
        let title = entry.get("title").and_then(Value::as_str).unwrap_or("");
        Some((dest, title.to_string()))
    }

    fn footnote_number(&self, label: &str) -> usize {
        let footnotes = self.footnotes.unwrap_or(&[]);
        footnotes
            .iter()
            .position(|l| l.as_str() == Some(label))
            .unwrap_or(footnotes.len())
            + 1
    }
}

fn render_node(
    node: &Node,
    ctx: &RenderContext<'_>,
    tables: DocumentTables<'_>,
) -> Result<Markup, RenderError> {
    match node {
        Node::Document {
            attributes,
            children,
        } => render_children(children, ctx, DocumentTables::of(attributes)),
        Node::Fence {
            language, content, ..
        } => render_fence(language, content, ctx.highlighter),
        Node::Component {
            name,
            attributes,
            children,
        } => {
            let component = ctx
                .registry
                .get(name)
                .ok_or_else(|| RenderError::UnknownComponent(name.clone()))?;
            let inner = render_children(children, ctx, tables)?;
            Ok(component.render(attributes, inner))
        }
        Node::Prose(text) => render_prose(text, ctx.highlighter, tables),
    }
}

fn render_children(
    children: &[Node],
    ctx: &RenderContext<'_>,
    tables: DocumentTables<'_>,
) -> Result<Markup, RenderError> {
    let mut out = String::new();
    for child in children {
        out.push_str(&render_node(child, ctx, tables)?.into_string());
    }
    Ok(PreEscaped(out))
}

/// A highlighted code block. The highlighter output is already escaped.
pub fn render_fence(
    language: &str,
    content: &str,
    highlighter: &Highlighter,
) -> Result<Markup, RenderError> {
    let highlighted = highlighter.highlight(language, content)?;
    Ok(html! {
        div.code-block data-language=(language) {
            (PreEscaped(highlighted))
        }
    })
}

/// Language of a nested fence, resolved the way [`transform`] resolves a
/// top-level one: an explicit `language` attribute wins.
fn fence_language(info: &str) -> String {
    match fence_from_info(info, String::new()) {
        Ok(Node::Fence {
            language,
            attributes,
            ..
        }) => attributes
            .get("language")
            .and_then(Value::as_str)
            .map_or(language, str::to_string),
        _ => info.split_whitespace().next().unwrap_or("").to_string(),
    }
}

/// CommonMark to HTML, routing nested fenced blocks through the highlighter.
fn render_prose(
    text: &str,
    highlighter: &Highlighter,
    tables: DocumentTables<'_>,
) -> Result<Markup, RenderError> {
    let resolve = |link: BrokenLink<'_>| {
        let (dest, title) = tables.reference(&link.reference)?;
        Some((CowStr::from(dest), CowStr::from(title)))
    };
    let parser = Parser::new_with_broken_link_callback(text, markdown_options(), Some(resolve));

    let mut events = Vec::new();
    let mut fence: Option<(String, String)> = None;

    for event in parser {
        match event {
            Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(info))) => {
                fence = Some((fence_language(&info), String::new()));
            }
            Event::Text(t) if fence.is_some() => {
                if let Some((_, code)) = fence.as_mut() {
                    code.push_str(&t);
                }
            }
            Event::End(TagEnd::CodeBlock) if fence.is_some() => {
                if let Some((language, code)) = fence.take() {
                    let block = render_fence(&language, &code, highlighter)?;
                    events.push(Event::Html(CowStr::from(block.into_string())));
                }
            }
            // Footnotes are numbered per document, not per chunk.
            Event::FootnoteReference(label) => {
                let number = tables.footnote_number(&label);
                let marker = html! {
                    sup.footnote-reference { a href={ "#" (&*label) } { (number) } }
                };
                events.push(Event::InlineHtml(CowStr::from(marker.into_string())));
            }
            Event::Start(Tag::FootnoteDefinition(label)) => {
                let number = tables.footnote_number(&label);
                let id = html! { (&*label) }.into_string();
                events.push(Event::Html(CowStr::from(format!(
                    r#"<div class="footnote-definition" id="{id}"><sup class="footnote-definition-label">{number}</sup>"#
                ))));
            }
            Event::End(TagEnd::FootnoteDefinition) => {
                events.push(Event::Html(CowStr::Borrowed("</div>\n")));
            }
            other => events.push(other),
        }
    }

    let mut out = String::new();
    md_html::push_html(&mut out, events.into_iter());
    Ok(PreEscaped(out))
}
