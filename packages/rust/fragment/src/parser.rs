//! Response parsing on top of `scraper` (html5ever).
//!
//! Parsing never fails: html5ever applies the HTML error-recovery rules and
//! whatever tree it produces is what we convert.

use ego_tree::NodeRef;
use scraper::node::Element;
use scraper::{Html, Node};
use tracing::{instrument, trace};

use crate::tree::{Attribute, ElementNode, FragmentNode, FragmentTree, TextNode, normalize_nodes};

/// Tag used to smuggle context-sensitive markup (`<tr>`, `<td>`, ...) through a
/// generic container.
pub const TEMPLATE_TAG: &str = "template";

/// Parse a response body into a [`FragmentTree`].
///
/// Every `<template>` at any depth, nested templates included, is replaced by its
/// content. Template content is parsed in template context, so table-only markup
/// survives the trip.
#[instrument(skip_all, fields(len = markup.len()))]
pub fn parse_fragment(markup: &str) -> FragmentTree {
    let html = Html::parse_fragment(markup);
    if !html.errors.is_empty() {
        trace!(errors = html.errors.len(), "recovered from malformed markup");
    }

    let mut nodes = Vec::new();
    convert_children(*html.root_element(), &mut nodes);
    normalize_nodes(&mut nodes);
    FragmentTree::new(nodes)
}

fn convert_element(el: &Element) -> ElementNode {
    let attrs = el
        .attrs()
        .map(|(name, value)| Attribute::new(name, value))
        .collect();
    ElementNode::new(el.name(), attrs)
}

fn convert_children(parent: NodeRef<'_, Node>, out: &mut Vec<FragmentNode>) {
    for child in parent.children() {
        match child.value() {
            Node::Text(text) => {
                let text: &str = text;
                out.push(FragmentNode::Text(TextNode { text: text.to_owned() }));
            }
            // a template's content hangs off a document fragment below it; both
            // are inlined in the template's place
            Node::Fragment => convert_children(child, out),
            Node::Element(el) if el.name() == TEMPLATE_TAG => convert_children(child, out),
            Node::Element(el) => {
                let mut element = convert_element(el);
                convert_children(child, &mut element.children);
                out.push(FragmentNode::Element(element));
            }
            // comments, doctypes and processing instructions are not part of the tree
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn first_element(tree: &FragmentTree) -> &ElementNode {
        tree.nodes
            .iter()
            .find_map(FragmentNode::as_element)
            .expect("an element")
    }

    #[test]
    fn parses_text_and_elements() {
        let tree = parse_fragment("Clicked<div id='d1' hx-swap-oob='true'>Swapped</div>");
        assert_eq!(tree.nodes.len(), 2);
        assert_eq!(tree.nodes[0], FragmentNode::text("Clicked"));
        let div = first_element(&tree);
        assert_eq!(div.tag, "div");
        assert_eq!(div.attr("hx-swap-oob"), Some("true"));
        assert_eq!(div.text_content(), "Swapped");
    }

    #[test]
    fn unwraps_template_with_table_rows() {
        let tree = parse_fragment(
            "<template><tr id='r1' hx-swap-oob='true'><td>new</td></tr></template>",
        );
        let row = first_element(&tree);
        assert_eq!(row.tag, "tr");
        assert_eq!(row.id(), Some("r1"));
        assert_eq!(FragmentTree::new(row.children.clone()).to_html(), "<td>new</td>");
        assert!(!tree.to_html().contains("template"));
    }

    #[test]
    fn unwraps_nested_templates_at_depth() {
        let tree = parse_fragment(
            "<div><template><template><td id='c'>x</td></template>tail</template></div>",
        );
        assert_eq!(tree.to_html(), "<div><td id=\"c\">x</td>tail</div>");
    }

    #[test]
    fn malformed_markup_is_recovered() {
        let tree = parse_fragment("<div><span>open<p>para</div>stray</b>");
        assert!(tree.text_content().contains("open"));
        assert!(tree.text_content().contains("stray"));
    }

    #[test]
    fn comments_are_dropped() {
        let tree = parse_fragment("a<!-- note -->b");
        assert_eq!(tree.nodes, vec![FragmentNode::text("ab")]);
    }

    #[test]
    fn template_rows_inside_an_element() {
        let tree = parse_fragment(
            "<div hx-swap-oob='true'><template><tr><td>a</td></tr><tr><td>b</td></tr></template></div>",
        );
        let div = first_element(&tree);
        assert_eq!(
            FragmentTree::new(div.children.clone()).to_html(),
            "<tr><td>a</td></tr><tr><td>b</td></tr>"
        );
    }

    #[test]
    fn sibling_templates_keep_their_order() {
        let tree = parse_fragment("<template><li>1</li></template>mid<template><li>2</li></template>");
        assert_eq!(tree.to_html(), "<li>1</li>mid<li>2</li>");
    }
}
