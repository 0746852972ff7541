//! OOB node discovery.
//!
//! One depth-first pre-order pass over the whole fragment. Marked elements are
//! detached and collected; the walk does not enter them, so markers nested inside
//! an OOB node stay put until that node is executed and [`discover_nested`] runs
//! over its children.

use oobswap_fragment::{ElementNode, FragmentNode, FragmentTree, Visit, Visitor, walk};

use crate::directive::is_oob;

/// Primary content plus the OOB nodes taken out of it, in document order.
#[derive(Debug, Clone, Default)]
pub struct Discovery {
    pub primary: FragmentTree,
    pub oob_nodes: Vec<ElementNode>,
}

struct MarkerVisitor;

impl Visitor for MarkerVisitor {
    fn visit(&mut self, node: &FragmentNode) -> Visit {
        if is_oob(node) {
            Visit::Detach
        } else {
            Visit::Descend
        }
    }
}

/// Split a parsed response into primary content and OOB nodes.
pub fn discover(mut tree: FragmentTree) -> Discovery {
    let detached = tree.walk(&mut MarkerVisitor);
    tree.normalize();
    Discovery {
        primary: tree,
        oob_nodes: into_elements(detached),
    }
}

/// Detach OOB nodes nested inside an already discovered node, treating its
/// children as a walk of their own.
pub fn discover_nested(node: &mut ElementNode) -> Vec<ElementNode> {
    let detached = walk(&mut node.children, &mut MarkerVisitor);
    if !detached.is_empty() {
        let mut rest = FragmentTree::new(std::mem::take(&mut node.children));
        rest.normalize();
        node.children = rest.nodes;
    }
    into_elements(detached)
}

fn into_elements(nodes: Vec<FragmentNode>) -> Vec<ElementNode> {
    nodes.into_iter().filter_map(FragmentNode::into_element).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use oobswap_fragment::parse_fragment;

    fn ids(nodes: &[ElementNode]) -> Vec<&str> {
        nodes.iter().filter_map(ElementNode::id).collect()
    }

    #[test]
    fn top_level_markers() {
        let d = discover(parse_fragment(
            "Clicked<div id='d1' hx-swap-oob='true'>Swapped1</div><div id='d2' hx-swap-oob='true'>Swapped2</div>",
        ));
        assert_eq!(d.primary.to_html(), "Clicked");
        assert_eq!(ids(&d.oob_nodes), ["d1", "d2"]);
    }

    #[test]
    fn deep_markers_leave_structure_intact() {
        let d = discover(parse_fragment(
            "<section><p>a<span id='x' data-hx-swap-oob='true'>X</span>b</p>\
             <ul><li>1</li><li id='y' hx-swap-oob='delete'></li><li>3</li></ul></section>",
        ));
        assert_eq!(
            d.primary.to_html(),
            "<section><p>ab</p><ul><li>1</li><li>3</li></ul></section>"
        );
        assert_eq!(ids(&d.oob_nodes), ["x", "y"]);
    }

    #[test]
    fn nested_markers_wait_for_their_outer_node() {
        let mut d = discover(parse_fragment(
            "<div id='outer' hx-swap-oob='true'>o<b id='inner' hx-swap-oob='true'>i</b></div>",
        ));
        assert_eq!(ids(&d.oob_nodes), ["outer"]);

        let outer = &mut d.oob_nodes[0];
        let nested = discover_nested(outer);
        assert_eq!(ids(&nested), ["inner"]);
        assert_eq!(FragmentTree::new(outer.children.clone()).to_html(), "o");
    }

    #[test]
    fn no_markers_is_identity() {
        let markup = "<div><p>plain</p></div>";
        let d = discover(parse_fragment(markup));
        assert!(d.oob_nodes.is_empty());
        assert_eq!(d.primary.to_html(), markup);
    }
}
