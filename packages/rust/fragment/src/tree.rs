//! Fragment tree: a tagged union of element and text nodes, plus a
//! detaching pre-order walk.

use crate::serialize;

// ---------------------------------------------------------------------------
// Node types
// ---------------------------------------------------------------------------

/// A single `name="value"` attribute, in source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

impl Attribute {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// An element with its attributes and children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementNode {
    /// Lower-case local tag name.
    pub tag: String,
    pub attrs: Vec<Attribute>,
    pub children: Vec<FragmentNode>,
}

/// A run of character data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextNode {
    pub text: String,
}

/// Element or text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FragmentNode {
    Element(ElementNode),
    Text(TextNode),
}

impl ElementNode {
    /// Create an element without children.
    pub fn new(tag: impl Into<String>, attrs: Vec<Attribute>) -> Self {
        Self {
            tag: tag.into(),
            attrs,
            children: Vec::new(),
        }
    }

    /// Value of the attribute `name`, if present.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    /// The `id` attribute, if non-empty.
    pub fn id(&self) -> Option<&str> {
        self.attr("id").filter(|id| !id.is_empty())
    }

    /// Concatenated text of all descendants.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        collect_text(&self.children, &mut out);
        out
    }
}

impl FragmentNode {
    /// Shorthand for a text node.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(TextNode { text: text.into() })
    }

    pub fn as_element(&self) -> Option<&ElementNode> {
        match self {
            Self::Element(el) => Some(el),
            Self::Text(_) => None,
        }
    }

    pub fn into_element(self) -> Option<ElementNode> {
        match self {
            Self::Element(el) => Some(el),
            Self::Text(_) => None,
        }
    }
}

fn collect_text(nodes: &[FragmentNode], out: &mut String) {
    for node in nodes {
        match node {
            FragmentNode::Text(t) => out.push_str(&t.text),
            FragmentNode::Element(el) => collect_text(&el.children, out),
        }
    }
}

// ---------------------------------------------------------------------------
// FragmentTree
// ---------------------------------------------------------------------------

/// Ordered forest of nodes parsed from one response body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FragmentTree {
    pub nodes: Vec<FragmentNode>,
}

impl FragmentTree {
    pub fn new(nodes: Vec<FragmentNode>) -> Self {
        Self { nodes }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn to_html(&self) -> String {
        serialize::nodes_to_html(&self.nodes)
    }

    pub fn text_content(&self) -> String {
        let mut out = String::new();
        collect_text(&self.nodes, &mut out);
        out
    }

    /// Merge adjacent text nodes and drop empty ones, at every depth.
    pub fn normalize(&mut self) {
        normalize_nodes(&mut self.nodes);
    }

    /// Detaching walk over the whole forest. See [`walk`].
    pub fn walk(&mut self, visitor: &mut impl Visitor) -> Vec<FragmentNode> {
        walk(&mut self.nodes, visitor)
    }
}

pub(crate) fn normalize_nodes(nodes: &mut Vec<FragmentNode>) {
    let mut merged: Vec<FragmentNode> = Vec::with_capacity(nodes.len());
    for node in nodes.drain(..) {
        match node {
            FragmentNode::Text(t) if t.text.is_empty() => {}
            FragmentNode::Text(t) => match merged.last_mut() {
                Some(FragmentNode::Text(prev)) => prev.text.push_str(&t.text),
                _ => merged.push(FragmentNode::Text(t)),
            },
            FragmentNode::Element(mut el) => {
                normalize_nodes(&mut el.children);
                merged.push(FragmentNode::Element(el));
            }
        }
    }
    *nodes = merged;
}

// ---------------------------------------------------------------------------
// Visitor walk
// ---------------------------------------------------------------------------

/// What a [`Visitor`] wants done with the node it was shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visit {
    /// Keep the node and walk its children.
    Descend,
    /// Keep the node, do not walk its children.
    Skip,
    /// Splice the node out of its parent and hand it back; its children are not walked.
    Detach,
}

/// Decides, per node, how a [`walk`] proceeds.
pub trait Visitor {
    fn visit(&mut self, node: &FragmentNode) -> Visit;
}

impl<F> Visitor for F
where
    F: FnMut(&FragmentNode) -> Visit,
{
    fn visit(&mut self, node: &FragmentNode) -> Visit {
        self(node)
    }
}

/// Depth-first pre-order walk over `nodes`.
///
/// Detached nodes are removed from their parent (siblings close the gap) and
/// returned in document order.
pub fn walk(nodes: &mut Vec<FragmentNode>, visitor: &mut impl Visitor) -> Vec<FragmentNode> {
    let mut detached = Vec::new();
    walk_into(nodes, visitor, &mut detached);
    detached
}

fn walk_into(
    nodes: &mut Vec<FragmentNode>,
    visitor: &mut impl Visitor,
    detached: &mut Vec<FragmentNode>,
) {
    let mut i = 0;
    while i < nodes.len() {
        match visitor.visit(&nodes[i]) {
            Visit::Detach => {
                detached.push(nodes.remove(i));
                continue;
            }
            Visit::Descend => {
                if let FragmentNode::Element(el) = &mut nodes[i] {
                    walk_into(&mut el.children, visitor, detached);
                }
            }
            Visit::Skip => {}
        }
        i += 1;
    }
}
