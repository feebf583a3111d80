//! Applies a locale to a [`Document`]

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::{
    dictionary::Catalog,
    document::{Document, NodeId},
    locale::{Locale, initial_language},
};

const TRANSLATED_ATTRS: [&str; 5] = ["placeholder", "title", "aria-label", "alt", "value"];
const META_CONTENT_KEYS: [&str; 6] = [
    "description",
    "keywords",
    "og:title",
    "og:description",
    "twitter:title",
    "twitter:description",
];
const RAW_TEXT_TAGS: [&str; 3] = ["script", "style", "noscript"];
const IGNORE_ATTR: &str = "data-i18n-ignore";

/// A change observed in the document after the initial pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    /// `node` was inserted under an element
    NodeAdded { node: NodeId },
    /// Attribute `name` of `element` was set by the host
    AttributeChanged { element: NodeId, name: String },
}

#[derive(Debug, Clone)]
struct Captured {
    original: String,
    rendered: String,
}

/// Stateful translator bound to one document
///
/// The first value seen for every text node and attribute is kept as its
/// original; all renders are computed from it. A value that differs from the
/// last render was written by the host and becomes the new original.
pub struct Translator {
    catalog: Arc<Catalog>,
    locale: Locale,
    texts: HashMap<NodeId, Captured>,
    attrs: HashMap<(NodeId, String), Captured>,
}

impl Translator {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self {
            catalog,
            locale: Locale::En,
            texts: HashMap::new(),
            attrs: HashMap::new(),
        }
    }

    pub fn locale(&self) -> Locale {
        self.locale
    }

    /// Translate a standalone string into the current locale
    pub fn translate(&self, text: &str) -> String {
        self.catalog.translate_string(text, self.locale)
    }

    /// Pick the initial language and translate the whole document
    pub fn init(&mut self, doc: &mut Document, stored: Option<&str>) -> Locale {
        let root = doc.root();
        self.locale = initial_language(stored, doc.attr(root, "lang"));
        self.apply_document_language(doc);
        self.translate_subtree(doc, root);
        self.locale
    }

    /// Switch the document to `code`. Unsupported codes and the current
    /// locale are ignored; returns whether anything changed.
    pub fn set_language(&mut self, doc: &mut Document, code: &str) -> bool {
        let Some(locale) = Locale::from_code(code) else {
            debug!(code, "Ignoring unsupported language");
            return false;
        };
        if locale == self.locale {
            return false;
        }

        self.locale = locale;
        self.apply_document_language(doc);
        let root = doc.root();
        self.translate_subtree(doc, root);
        true
    }

    /// Re-translate only what a mutation touched
    pub fn apply_mutation(&mut self, doc: &mut Document, mutation: &Mutation) {
        match mutation {
            Mutation::NodeAdded { node } => self.translate_subtree(doc, *node),
            Mutation::AttributeChanged { element, name } => {
                if doc.is_element(*element)
                    && !self.attr_ignored(doc, *element)
                    && translatable_attrs(doc, *element).contains(&name.as_str())
                {
                    self.translate_attr(doc, *element, name);
                }
            }
        }
    }

    fn apply_document_language(&self, doc: &mut Document) {
        let root = doc.root();
        doc.set_attr(root, "lang", self.locale.code());
        doc.set_attr(root, "dir", self.locale.direction().as_str());

        for locale in Locale::ALL {
            let class = format!("lang-{}", locale.code());
            if locale == self.locale {
                doc.add_class(root, &class);
            } else {
                doc.remove_class(root, &class);
            }
        }
    }

    /// Translate every text node and attribute at or below `root`
    pub fn translate_subtree(&mut self, doc: &mut Document, root: NodeId) {
        for node in doc.descendants(root) {
            if doc.is_element(node) {
                if !self.attr_ignored(doc, node) {
                    for name in translatable_attrs(doc, node) {
                        self.translate_attr(doc, node, name);
                    }
                }
            } else if !self.text_ignored(doc, node) {
                self.translate_text(doc, node);
            }
        }
    }

    fn text_ignored(&self, doc: &Document, node: NodeId) -> bool {
        let Some(parent) = doc.parent(node) else {
            return false;
        };
        if doc
            .tag(parent)
            .map(|tag| RAW_TEXT_TAGS.contains(&tag))
            .unwrap_or(false)
        {
            return true;
        }
        doc.ancestors(node).any(|a| doc.has_attr(a, IGNORE_ATTR))
    }

    fn attr_ignored(&self, doc: &Document, element: NodeId) -> bool {
        doc.has_attr(element, IGNORE_ATTR) || doc.ancestors(element).any(|a| doc.has_attr(a, IGNORE_ATTR))
    }

    fn translate_text(&mut self, doc: &mut Document, node: NodeId) {
        let Some(current) = doc.text(node) else {
            return;
        };
        if current.trim().is_empty() && !self.texts.contains_key(&node) {
            return;
        }

        let original = capture(self.texts.get(&node), current);
        let rendered = self.catalog.translate_string(&original, self.locale);
        doc.set_text(node, &rendered);
        self.texts.insert(node, Captured { original, rendered });
    }

    fn translate_attr(&mut self, doc: &mut Document, element: NodeId, name: &str) {
        let Some(current) = doc.attr(element, name) else {
            return;
        };

        let key = (element, name.to_string());
        let original = capture(self.attrs.get(&key), current);
        let rendered = self.catalog.translate_string(&original, self.locale);
        if doc.attr(element, name) != Some(rendered.as_str()) {
            doc.set_attr(element, name, &rendered);
        }
        self.attrs.insert(key, Captured { original, rendered });
    }
}

fn capture(previous: Option<&Captured>, current: &str) -> String {
    match previous {
        Some(captured) if captured.rendered == current => captured.original.clone(),
        _ => current.to_string(),
    }
}

fn translatable_attrs(doc: &Document, element: NodeId) -> Vec<&'static str> {
    let mut names = TRANSLATED_ATTRS.to_vec();
    if doc.tag(element) == Some("meta") {
        let key = |attr: &str| doc.attr(element, attr).unwrap_or("").to_ascii_lowercase();
        let name = key("name");
        let property = key("property");
        if META_CONTENT_KEYS.contains(&name.as_str()) || META_CONTENT_KEYS.contains(&property.as_str()) {
            names.push("content");
        }
    }
    names
}
