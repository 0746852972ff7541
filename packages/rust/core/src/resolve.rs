//! Target resolution: which live nodes an OOB node addresses.

use tracing::debug;

use oobswap_document::{Document, NodeId};
use oobswap_fragment::ElementNode;
use oobswap_shared::Result;

use crate::directive::OobDirective;

/// Live targets of one directive, in document order. Empty is a valid no-op.
pub type TargetSet = Vec<NodeId>;

/// Resolve `node` against `doc`.
///
/// A selector (override attribute first, then the inline suffix) is evaluated
/// against the whole document and every match is returned; it replaces the `id`
/// rule rather than adding to it. Without a selector the element sharing the
/// node's `id` is the only target.
pub fn resolve_targets(
    node: &ElementNode,
    directive: &OobDirective,
    doc: &Document,
) -> Result<TargetSet> {
    if let Some(selector) = directive.target_selector() {
        let targets = doc.select_all(selector)?;
        if targets.is_empty() {
            debug!(selector, "OOB selector matched nothing");
        }
        return Ok(targets);
    }

    let Some(id) = node.id() else {
        debug!(tag = %node.tag, "OOB node has neither id nor selector, dropping");
        return Ok(Vec::new());
    };

    match doc.element_by_id(id) {
        Some(target) => Ok(vec![target]),
        None => {
            debug!(id, "no element with OOB id, dropping");
            Ok(Vec::new())
        }
    }
}
