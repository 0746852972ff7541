//! CSS selector evaluation.
//!
//! Selectors are parsed and matched by `scraper` directly against the live
//! tree, so combinators see exactly the nesting the swaps produced.

use scraper::Selector;
use tracing::debug;

use oobswap_shared::{OobError, Result};

use crate::{Document, NodeId};

impl Document {
    /// All connected elements matching `selector`, in document order.
    ///
    /// Elements inside `<template>` never match. A selector that does not parse
    /// is reported as [`OobError::Selector`].
    pub fn select_all(&self, selector: &str) -> Result<Vec<NodeId>> {
        let parsed = Selector::parse(selector)
            .map_err(|e| OobError::selector(selector, e.to_string()))?;

        let matches: Vec<NodeId> = self
            .live_elements()
            .filter(|el| parsed.matches(el))
            .map(|el| NodeId(el.id()))
            .collect();

        debug!(selector, matches = matches.len(), "evaluated selector");
        Ok(matches)
    }
}
