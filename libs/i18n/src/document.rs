//! Minimal arena-backed document tree
//!
//! Enough of a DOM for the translator: elements with ordered attributes and
//! children, and text nodes. Nodes are addressed by [`NodeId`] and never
//! freed, so ids stay valid for the lifetime of the document.

/// Handle to a node in a [`Document`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

#[derive(Debug, Clone)]
pub struct Element {
    pub tag: String,
    attrs: Vec<(String, String)>,
    children: Vec<NodeId>,
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone)]
struct Node {
    parent: Option<NodeId>,
    kind: NodeKind,
}

#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
    root: NodeId,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// New document with an empty `html` root element
    pub fn new() -> Self {
        let mut doc = Self {
            nodes: Vec::new(),
            root: NodeId(0),
        };
        doc.root = doc.create_element("html");
        doc
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    fn push(&mut self, kind: NodeKind) -> NodeId {
        self.nodes.push(Node { parent: None, kind });
        NodeId(self.nodes.len() - 1)
    }

    /// Create a detached element
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.push(NodeKind::Element(Element {
            tag: tag.to_ascii_lowercase(),
            attrs: Vec::new(),
            children: Vec::new(),
        }))
    }

    /// Create a detached text node
    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.push(NodeKind::Text(text.to_string()))
    }

    /// Attach `child` as the last child of `parent`. Returns false when
    /// `parent` is not an element, `child` is already attached, or `parent`
    /// lies inside `child`'s subtree.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> bool {
        if self.nodes[child.0].parent.is_some() || child == self.root || parent == child {
            return false;
        }
        if self.ancestors(parent).any(|node| node == child) {
            return false;
        }
        match &mut self.nodes[parent.0].kind {
            NodeKind::Element(el) => el.children.push(child),
            NodeKind::Text(_) => return false,
        }
        self.nodes[child.0].parent = Some(parent);
        true
    }

    /// Create an element and append it to `parent`
    pub fn append_element(&mut self, parent: NodeId, tag: &str) -> NodeId {
        let id = self.create_element(tag);
        self.append_child(parent, id);
        id
    }

    /// Create a text node and append it to `parent`
    pub fn append_text(&mut self, parent: NodeId, text: &str) -> NodeId {
        let id = self.create_text(text);
        self.append_child(parent, id);
        id
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.0].kind
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        matches!(self.kind(id), NodeKind::Element(_))
    }

    pub fn tag(&self, id: NodeId) -> Option<&str> {
        match self.kind(id) {
            NodeKind::Element(el) => Some(&el.tag),
            NodeKind::Text(_) => None,
        }
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        match self.kind(id) {
            NodeKind::Element(el) => &el.children,
            NodeKind::Text(_) => &[],
        }
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        match self.kind(id) {
            NodeKind::Text(text) => Some(text),
            NodeKind::Element(_) => None,
        }
    }

    pub fn set_text(&mut self, id: NodeId, value: &str) {
        if let NodeKind::Text(text) = &mut self.nodes[id.0].kind {
            if text.as_str() != value {
                *text = value.to_string();
            }
        }
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        match self.kind(id) {
            NodeKind::Element(el) => el
                .attrs
                .iter()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value.as_str()),
            NodeKind::Text(_) => None,
        }
    }

    pub fn has_attr(&self, id: NodeId, name: &str) -> bool {
        self.attr(id, name).is_some()
    }

    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) {
        if let NodeKind::Element(el) = &mut self.nodes[id.0].kind {
            match el.attrs.iter_mut().find(|(key, _)| key == name) {
                Some((_, existing)) => *existing = value.to_string(),
                None => el.attrs.push((name.to_string(), value.to_string())),
            }
        }
    }

    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.attr(id, "class")
            .map(|classes| classes.split_whitespace().any(|c| c == class))
            .unwrap_or(false)
    }

    pub fn add_class(&mut self, id: NodeId, class: &str) {
        if !self.has_class(id, class) {
            let mut classes: Vec<String> = self
                .attr(id, "class")
                .map(|c| c.split_whitespace().map(str::to_string).collect())
                .unwrap_or_default();
            classes.push(class.to_string());
            self.set_attr(id, "class", &classes.join(" "));
        }
    }

    pub fn remove_class(&mut self, id: NodeId, class: &str) {
        if self.has_class(id, class) {
            let remaining: Vec<&str> = self
                .attr(id, "class")
                .map(|c| c.split_whitespace().filter(|c| *c != class).collect())
                .unwrap_or_default();
            let joined = remaining.join(" ");
            self.set_attr(id, "class", &joined);
        }
    }

    /// Ancestors from the parent up to the root
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |&node| self.parent(node))
    }

    /// `id` and all nodes below it, in document order
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(self.children(node).iter().rev().copied());
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_tree_in_document_order() {
        let mut doc = Document::new();
        let body = doc.append_element(doc.root(), "BODY");
        let p = doc.append_element(body, "p");
        let t1 = doc.append_text(p, "one");
        let t2 = doc.append_text(body, "two");

        assert_eq!(doc.tag(body), Some("body"));
        assert_eq!(doc.descendants(doc.root()), vec![doc.root(), body, p, t1, t2]);
        assert_eq!(doc.ancestors(t1).collect::<Vec<_>>(), vec![p, body, doc.root()]);
    }

    #[test]
    fn nodes_attach_once() {
        let mut doc = Document::new();
        let a = doc.create_element("div");
        let b = doc.create_element("div");
        assert!(doc.append_child(doc.root(), a));
        assert!(!doc.append_child(b, a));
        let text = doc.append_text(a, "x");
        assert!(!doc.append_child(text, b));
    }

    #[test]
    fn cannot_attach_under_own_descendant() {
        let mut doc = Document::new();
        let outer = doc.create_element("section");
        let inner = doc.append_element(outer, "div");
        let leaf = doc.append_element(inner, "span");

        assert!(!doc.append_child(leaf, outer));
        assert!(!doc.append_child(inner, outer));
        assert_eq!(doc.parent(outer), None);
        assert_eq!(doc.descendants(outer), vec![outer, inner, leaf]);

        assert!(doc.append_child(doc.root(), outer));
        assert_eq!(doc.ancestors(leaf).last(), Some(doc.root()));
    }

    #[test]
    fn attributes_and_classes() {
        let mut doc = Document::new();
        let root = doc.root();
        doc.set_attr(root, "lang", "en");
        doc.set_attr(root, "lang", "fr");
        assert_eq!(doc.attr(root, "lang"), Some("fr"));

        doc.add_class(root, "lang-fr");
        doc.add_class(root, "theme");
        doc.add_class(root, "lang-fr");
        assert_eq!(doc.attr(root, "class"), Some("lang-fr theme"));

        doc.remove_class(root, "lang-fr");
        assert!(!doc.has_class(root, "lang-fr"));
        assert!(doc.has_class(root, "theme"));
    }
}
