//! Component registry for `{% Name %}` tags.
//!
//! A component receives the tag's attributes and its already-rendered
//! children and returns markup. Anything implementing [`Component`] can be
//! registered, including plain closures:
//!
//! ```rust
//! use maud::html;
//! use quire::components::Registry;
//!
//! let mut registry = Registry::with_builtins();
//! registry.register("Aside", |_attrs: &quire::markup::Attributes, children: maud::Markup| {
//!     html! { aside { (children) } }
//! });
//! assert!(registry.contains("Aside"));
//! ```

use crate::markup::Attributes;
use maud::{Markup, html};
use std::collections::BTreeMap;

pub trait Component: Send + Sync {
    fn render(&self, attributes: &Attributes, children: Markup) -> Markup;
}

impl<F> Component for F
where
    F: Fn(&Attributes, Markup) -> Markup + Send + Sync,
{
    fn render(&self, attributes: &Attributes, children: Markup) -> Markup {
        self(attributes, children)
    }
}

/// Name → component mapping consulted while transforming and rendering.
#[derive(Default)]
pub struct Registry {
    components: BTreeMap<String, Box<dyn Component>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with `Callout` and `Figure`.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("Callout", Callout);
        registry.register("Figure", Figure);
        registry
    }

    /// Register (or replace) a component under `name`.
    pub fn register(&mut self, name: impl Into<String>, component: impl Component + 'static) {
        self.components.insert(name.into(), Box::new(component));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.components.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&dyn Component> {
        self.components.get(name).map(|c| c.as_ref())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.components.keys().map(String::as_str)
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

fn text_attribute<'a>(attributes: &'a Attributes, key: &str) -> Option<&'a str> {
    attributes.get(key).and_then(|v| v.as_str())
}

/// `{% Callout kind="note" title="…" %}…{% /Callout %}`
struct Callout;

impl Component for Callout {
    fn render(&self, attributes: &Attributes, children: Markup) -> Markup {
        let kind = text_attribute(attributes, "kind").unwrap_or("note");
        html! {
            aside class={ "callout callout-" (kind) } {
                @if let Some(title) = text_attribute(attributes, "title") {
                    p.callout-title { (title) }
                }
                (children)
            }
        }
    }
}

/// `{% Figure src="…" alt="…" caption="…" /%}`
struct Figure;

impl Component for Figure {
    fn render(&self, attributes: &Attributes, children: Markup) -> Markup {
        let src = text_attribute(attributes, "src").unwrap_or_default();
        let caption = text_attribute(attributes, "caption");
        let alt = text_attribute(attributes, "alt").or(caption).unwrap_or_default();
        html! {
            figure {
                img src=(src) alt=(alt) loading="lazy";
                @if let Some(caption) = caption {
                    figcaption { (caption) }
                }
                (children)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markup::parse_attributes;

    #[test]
    fn builtins_are_registered() {
        let registry = Registry::with_builtins();
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["Callout", "Figure"]);
    }

    #[test]
    fn closures_register_as_components() {
        let mut registry = Registry::new();
        registry.register("Shout", |_: &Attributes, children: Markup| {
            html! { strong { (children) } }
        });
        let out = registry
            .get("Shout")
            .unwrap()
            .render(&Attributes::new(), html! { "hey" });
        assert_eq!(out.into_string(), "<strong>hey</strong>");
    }

    #[test]
    fn callout_defaults_to_note() {
        let out = Callout.render(&Attributes::new(), html! { "x" }).into_string();
        assert!(out.contains(r#"class="callout callout-note""#));
    }

    #[test]
    fn callout_renders_title() {
        let attrs = parse_attributes(r#"kind="tip" title="Heads up""#).unwrap();
        let out = Callout.render(&attrs, html! {}).into_string();
        assert!(out.contains("callout-tip"));
        assert!(out.contains(r#"<p class="callout-title">Heads up</p>"#));
    }

    #[test]
    fn figure_escapes_attributes() {
        let attrs = parse_attributes(r#"src="a.png" caption="<b>x</b>""#).unwrap();
        let out = Figure.render(&attrs, html! {}).into_string();
        assert!(out.contains(r#"src="a.png""#));
        assert!(out.contains("&lt;b&gt;x&lt;/b&gt;"));
    }
}
