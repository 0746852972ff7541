//! In-memory live document for the OOB engine.
//!
//! [`Document`] is a `scraper::Html` tree whose nodes are addressed by
//! [`NodeId`]. Parsing, serialization and selector matching are scraper's; the
//! mutations a swap needs go through `ego_tree` node handles on the same tree.
//!
//! Removing a node only unlinks it. The arena keeps every node ever created
//! until the document is dropped, so an id held by a scheduled swap can always
//! be checked with [`Document::is_connected`] before it is touched. The price is
//! that a document swapped into over and over grows with every replaced node;
//! re-parse it from [`Document::to_html`] once no swap is pending if that matters.

mod select;

use std::cell::RefCell;
use std::rc::Rc;

use ego_tree::NodeRef;
use html5ever::tendril::StrTendril;
use html5ever::{LocalName, QualName, namespace_url, ns};
use scraper::node::{Element, Text};
use scraper::{ElementRef, Html, Node};
use tracing::{instrument, trace};

use oobswap_fragment::{FragmentNode, FragmentTree, TEMPLATE_TAG};

/// Shared, single-threaded handle to a live document.
///
/// Deferred swap and settle steps hold a clone and take a mutable borrow only
/// while they run. A caller keeping a `borrow()` alive across an `.await` makes
/// every step that fires meanwhile skip its work with a warning, so release
/// borrows before yielding.
pub type DocumentHandle = Rc<RefCell<Document>>;

/// Node of a [`Document`]. Stays valid for the document's lifetime, also after
/// the node is removed from the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(ego_tree::NodeId);

// ---------------------------------------------------------------------------
// Document
// ---------------------------------------------------------------------------

/// Mutable tree of live nodes.
#[derive(Debug, Clone)]
pub struct Document {
    html: Html,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// An empty document (root only).
    pub fn new() -> Self {
        Self {
            html: Html::new_document(),
        }
    }

    /// Parse a full page (`<html>`, `<head>` and `<body>` are implied when missing).
    #[instrument(skip_all, fields(len = markup.len()))]
    pub fn parse(markup: &str) -> Self {
        let html = Html::parse_document(markup);
        if !html.errors.is_empty() {
            trace!(errors = html.errors.len(), "recovered from malformed page markup");
        }
        Self { html }
    }

    /// Build a document whose root children are copies of `tree`'s nodes.
    ///
    /// Nothing is re-parsed, so the structure is exactly `tree`'s, including
    /// nestings a parser would have repaired.
    pub fn from_tree(tree: &FragmentTree) -> Self {
        let mut doc = Self::new();
        let root = doc.root();
        for node in &tree.nodes {
            doc.append_fragment(root, node);
        }
        doc
    }

    /// Wrap into a shareable handle.
    pub fn into_handle(self) -> DocumentHandle {
        Rc::new(RefCell::new(self))
    }

    pub fn root(&self) -> NodeId {
        NodeId(self.html.tree.root().id())
    }

    fn node(&self, id: NodeId) -> Option<NodeRef<'_, Node>> {
        self.html.tree.get(id.0)
    }

    fn element(&self, id: NodeId) -> Option<ElementRef<'_>> {
        self.node(id).and_then(ElementRef::wrap)
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id)?.parent().map(|p| NodeId(p.id()))
    }

    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.node(id)
            .map(|n| n.children().map(|c| NodeId(c.id())).collect())
            .unwrap_or_default()
    }

    /// Tag name, for element nodes.
    pub fn tag(&self, id: NodeId) -> Option<&str> {
        Some(self.element(id)?.value().name())
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        self.element(id).is_some()
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id)?.value().attr(name)
    }

    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.attr(id, "class")
            .is_some_and(|list| list.split_ascii_whitespace().any(|c| c == class))
    }

    /// Short label such as `li#todo-2.done`, for logs and reports.
    pub fn describe(&self, id: NodeId) -> String {
        let Some(tag) = self.tag(id) else {
            return String::from("#text");
        };
        let mut label = tag.to_owned();
        if let Some(value) = self.attr(id, "id").filter(|v| !v.is_empty()) {
            label.push('#');
            label.push_str(value);
        }
        for class in self.attr(id, "class").unwrap_or_default().split_ascii_whitespace() {
            label.push('.');
            label.push_str(class);
        }
        label
    }

    /// Whether `id` is still reachable from the root.
    pub fn is_connected(&self, id: NodeId) -> bool {
        let Some(node) = self.node(id) else {
            return false;
        };
        let top = node.ancestors().last().unwrap_or(node);
        top.id() == self.html.tree.root().id()
    }

    /// Whether `id` sits inside a `<template>`, whose content is not part of the
    /// rendered document and never matches a lookup.
    pub fn is_inert(&self, id: NodeId) -> bool {
        self.node(id)
            .is_some_and(|n| n.ancestors().any(|a| a.value().is_fragment()))
    }

    /// Pre-order list of `id` and everything below it.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        self.node(id)
            .map(|n| n.descendants().map(|d| NodeId(d.id())).collect())
            .unwrap_or_default()
    }

    /// Connected elements outside template content, in document order.
    pub(crate) fn live_elements(&self) -> impl Iterator<Item = ElementRef<'_>> {
        self.html
            .tree
            .root()
            .descendants()
            .filter_map(ElementRef::wrap)
            .filter(|el| !el.ancestors().any(|a| a.value().is_fragment()))
    }

    /// First connected element whose `id` attribute equals `value`, in document order.
    pub fn element_by_id(&self, value: &str) -> Option<NodeId> {
        if value.is_empty() {
            return None;
        }
        self.live_elements()
            .find(|el| el.value().attr("id") == Some(value))
            .map(|el| NodeId(el.id()))
    }

    /// Concatenated text below `id`.
    pub fn text_content(&self, id: NodeId) -> String {
        let Some(node) = self.node(id) else {
            return String::new();
        };
        node.descendants()
            .filter_map(|n| n.value().as_text())
            .map(|t| &**t)
            .collect()
    }

    // -----------------------------------------------------------------------
    // Serialization
    // -----------------------------------------------------------------------

    /// Serialized children of `id`.
    pub fn inner_html(&self, id: NodeId) -> String {
        match self.element(id) {
            Some(el) => el.inner_html(),
            None if id == self.root() => self.to_html(),
            None => String::new(),
        }
    }

    /// Serialized element including its own tag.
    pub fn outer_html(&self, id: NodeId) -> String {
        match self.element(id) {
            Some(el) => el.html(),
            None if id == self.root() => self.to_html(),
            None => String::new(),
        }
    }

    /// The whole document.
    pub fn to_html(&self) -> String {
        self.html.html()
    }

    // -----------------------------------------------------------------------
    // Mutation
    // -----------------------------------------------------------------------

    /// Build `fragment` as a detached subtree and return its top node.
    fn build(&mut self, fragment: &FragmentNode) -> NodeId {
        let el = match fragment {
            FragmentNode::Text(t) => return NodeId(self.html.tree.orphan(text_node(&t.text)).id()),
            FragmentNode::Element(el) => el,
        };

        let attrs = el.attrs.iter().map(|a| (a.name.as_str(), a.value.as_str()));
        let mut node = self.html.tree.orphan(element_node(&el.tag, attrs));
        let id = node.id();
        // template content goes below a document fragment, as the parser puts it
        let parent = if el.tag == TEMPLATE_TAG {
            node.append(Node::Fragment).id()
        } else {
            id
        };

        for child in &el.children {
            let child = self.build(child);
            if let Some(mut parent) = self.html.tree.get_mut(parent) {
                parent.append_id(child.0);
            }
        }
        NodeId(id)
    }

    /// Append a copy of `fragment` as the last child of `parent`.
    pub fn append_fragment(&mut self, parent: NodeId, fragment: &FragmentNode) -> NodeId {
        let id = self.build(fragment);
        if let Some(mut parent) = self.html.tree.get_mut(parent.0) {
            parent.append_id(id.0);
        }
        id
    }

    /// Put a copy of `fragment` in `target`'s slot and unlink `target`.
    ///
    /// Returns the new node, or `None` when `target` has no parent.
    pub fn replace_with(&mut self, target: NodeId, fragment: &FragmentNode) -> Option<NodeId> {
        self.node(target)?.parent()?;
        let id = self.build(fragment);
        let mut node = self.html.tree.get_mut(target.0)?;
        node.insert_id_before(id.0);
        node.detach();
        trace!(?target, replacement = ?id, "replaced node");
        Some(id)
    }

    /// Replace all children of `target` with copies of `fragments`.
    ///
    /// Returns the ids of the inserted top-level nodes.
    pub fn replace_children(&mut self, target: NodeId, fragments: &[FragmentNode]) -> Vec<NodeId> {
        if !self.is_element(target) {
            return Vec::new();
        }
        for child in self.children(target) {
            if let Some(mut child) = self.html.tree.get_mut(child.0) {
                child.detach();
            }
        }
        let inserted: Vec<NodeId> = fragments
            .iter()
            .map(|f| self.append_fragment(target, f))
            .collect();
        trace!(?target, inserted = inserted.len(), "replaced children");
        inserted
    }

    /// Unlink `target` from the document. Returns `false` if it was already detached.
    pub fn remove(&mut self, target: NodeId) -> bool {
        if self.parent(target).is_none() {
            return false;
        }
        if let Some(mut node) = self.html.tree.get_mut(target.0) {
            node.detach();
        }
        trace!(?target, "removed node");
        true
    }

    /// Rebuild an element's attribute list through `edit`.
    ///
    /// scraper caches `id` and `class` inside the element, so the element is
    /// replaced rather than edited in place.
    fn edit_attrs<R>(
        &mut self,
        id: NodeId,
        edit: impl FnOnce(&mut Vec<html5ever::Attribute>) -> R,
    ) -> Option<R> {
        let mut node = self.html.tree.get_mut(id.0)?;
        let Node::Element(element) = node.value() else {
            return None;
        };
        let mut attrs: Vec<html5ever::Attribute> = element
            .attrs
            .iter()
            .map(|(name, value)| html5ever::Attribute {
                name: name.clone(),
                value: value.clone(),
            })
            .collect();
        let out = edit(&mut attrs);
        *element = Element::new(element.name.clone(), attrs);
        Some(out)
    }

    /// Set an attribute on an element, keeping its position if it exists.
    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) {
        self.edit_attrs(id, |attrs| {
            match attrs.iter_mut().find(|a| &*a.name.local == name) {
                Some(existing) => existing.value = StrTendril::from(value),
                None => attrs.push(attribute(name, value)),
            }
        });
    }

    /// Remove an attribute, returning its old value.
    pub fn remove_attr(&mut self, id: NodeId, name: &str) -> Option<String> {
        self.edit_attrs(id, |attrs| {
            let pos = attrs.iter().position(|a| &*a.name.local == name)?;
            Some(String::from(&*attrs.remove(pos).value))
        })
        .flatten()
    }

    /// Add `class` to the element's class list (no-op if present).
    pub fn add_class(&mut self, id: NodeId, class: &str) {
        if !self.is_element(id) || self.has_class(id, class) {
            return;
        }
        let list = match self.attr(id, "class") {
            Some(existing) if !existing.trim().is_empty() => format!("{} {class}", existing.trim()),
            _ => class.to_owned(),
        };
        self.set_attr(id, "class", &list);
    }

    /// Remove `class` from the element's class list. An emptied list drops the attribute.
    pub fn remove_class(&mut self, id: NodeId, class: &str) {
        if !self.has_class(id, class) {
            return;
        }
        let remaining = self
            .attr(id, "class")
            .unwrap_or_default()
            .split_ascii_whitespace()
            .filter(|c| *c != class)
            .collect::<Vec<_>>()
            .join(" ");
        if remaining.is_empty() {
            self.remove_attr(id, "class");
        } else {
            self.set_attr(id, "class", &remaining);
        }
    }
}

fn attribute(name: &str, value: &str) -> html5ever::Attribute {
    html5ever::Attribute {
        name: QualName::new(None, ns!(), LocalName::from(name)),
        value: StrTendril::from(value),
    }
}

fn element_node<'a>(tag: &str, attrs: impl Iterator<Item = (&'a str, &'a str)>) -> Node {
    let name = QualName::new(None, ns!(html), LocalName::from(tag));
    let attrs = attrs.map(|(name, value)| attribute(name, value)).collect();
    Node::Element(Element::new(name, attrs))
}

fn text_node(text: &str) -> Node {
    Node::Text(Text {
        text: StrTendril::from(text),
    })
}
