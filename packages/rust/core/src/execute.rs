//! Swap strategy execution and the swap/settle timing protocol.
//!
//! Every target gets its own [`SwapJob`]. A job mutates the document either
//! inline or, with a swap delay, from a task queued on the executor's
//! [`SwapScheduler`]. The mutation leaves the new content in a pre-settle state
//! (added/settling classes, old values of the settled attributes) and hands a
//! [`Settle`] step back; that step runs inline when the settle delay is zero and
//! as a second queued task otherwise.
//!
//! Deferred work is fire-and-forget: nothing is cancelled, and a job whose node
//! has left the document when it fires does nothing.

use std::rc::Rc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, instrument, warn};

use oobswap_document::{Document, DocumentHandle, NodeId};
use oobswap_fragment::{ElementNode, FragmentNode};
use oobswap_shared::{SwapConfig, SwapStrategy, SwapTiming};

use crate::directive::{OobDirective, strip_markers};
use crate::schedule::SwapScheduler;

/// Record of one swap applied (or scheduled) against one target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SwapResult {
    /// The live node the directive resolved to.
    #[serde(skip)]
    pub target: NodeId,
    /// The target as it looked when resolved, e.g. `tr#todo-2`.
    #[serde(rename = "target")]
    pub label: String,
    /// Strategy carried out (`Default` is reported as `outerHTML`).
    pub strategy: SwapStrategy,
    pub timing: SwapTiming,
}

// ---------------------------------------------------------------------------
// Executor
// ---------------------------------------------------------------------------

/// Applies directives to resolved targets.
#[derive(Debug, Clone)]
pub struct SwapExecutor {
    config: Rc<SwapConfig>,
    scheduler: SwapScheduler,
}

impl SwapExecutor {
    /// Executor that applies every swap inline.
    pub fn new(config: SwapConfig) -> Self {
        Self::with_scheduler(config, SwapScheduler::immediate())
    }

    pub fn with_scheduler(config: SwapConfig, scheduler: SwapScheduler) -> Self {
        Self {
            config: Rc::new(config),
            scheduler,
        }
    }

    pub fn config(&self) -> &SwapConfig {
        &self.config
    }

    pub fn scheduler(&self) -> &SwapScheduler {
        &self.scheduler
    }

    /// Swap `node` into every target.
    ///
    /// Delays are honoured only with a deferred scheduler; otherwise the swap
    /// and settle steps run immediately and the recorded timing says so.
    #[instrument(skip_all, fields(strategy = %directive.strategy, targets = targets.len()))]
    pub fn execute(
        &self,
        doc: &DocumentHandle,
        node: &ElementNode,
        directive: &OobDirective,
        targets: &[NodeId],
        default_settle: Duration,
    ) -> Vec<SwapResult> {
        if targets.is_empty() {
            return Vec::new();
        }

        let strategy = directive.strategy.effective();
        let mut content = node.clone();
        strip_markers(&mut content);
        let content = Rc::new(content);

        let mut swap_delay = directive.swap_delay.unwrap_or_default();
        let mut settle_delay = directive.settle_delay.unwrap_or(default_settle);
        if !self.scheduler.is_deferred() && !(swap_delay.is_zero() && settle_delay.is_zero()) {
            warn!(
                ?swap_delay,
                ?settle_delay,
                "no deferred scheduler for swap, applying immediately"
            );
            swap_delay = Duration::ZERO;
            settle_delay = Duration::ZERO;
        }
        let timing = SwapTiming {
            swap_delay,
            settle_delay,
            deferred: !swap_delay.is_zero(),
        };

        let labels: Vec<String> = {
            let doc = doc.borrow();
            targets.iter().map(|&target| doc.describe(target)).collect()
        };

        targets
            .iter()
            .zip(labels)
            .map(|(&target, label)| {
                let job = SwapJob {
                    doc: Rc::clone(doc),
                    config: Rc::clone(&self.config),
                    scheduler: self.scheduler.clone(),
                    content: Rc::clone(&content),
                    strategy,
                    target,
                    settle_delay,
                };
                if timing.deferred {
                    job.schedule(swap_delay);
                } else {
                    job.run();
                }
                SwapResult {
                    target,
                    label,
                    strategy,
                    timing,
                }
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Swap phase
// ---------------------------------------------------------------------------

/// Structural mutation of one target.
struct SwapJob {
    doc: DocumentHandle,
    config: Rc<SwapConfig>,
    scheduler: SwapScheduler,
    /// The OOB node with marker attributes removed.
    content: Rc<ElementNode>,
    strategy: SwapStrategy,
    target: NodeId,
    settle_delay: Duration,
}

impl SwapJob {
    fn schedule(self, delay: Duration) {
        match self.doc.try_borrow_mut() {
            Ok(mut doc) => doc.add_class(self.target, &self.config.swapping_class),
            Err(_) => warn!(target = ?self.target, "document is borrowed, swap not marked as pending"),
        }
        debug!(target = ?self.target, ?delay, "swap scheduled");
        let scheduler = self.scheduler.clone();
        scheduler.spawn(async move {
            tokio::time::sleep(delay).await;
            self.run();
        });
    }

    fn run(self) {
        let Some(settle) = self.swap() else {
            return;
        };
        if self.settle_delay.is_zero() {
            settle.finish();
        } else {
            settle.schedule(&self.scheduler, self.settle_delay);
        }
    }

    fn swap(&self) -> Option<Settle> {
        let Ok(mut doc) = self.doc.try_borrow_mut() else {
            warn!(target = ?self.target, "document is borrowed elsewhere, skipping swap");
            return None;
        };
        if !doc.is_connected(self.target) {
            debug!(target = ?self.target, "target left the document before its swap");
            return None;
        }

        match self.strategy {
            SwapStrategy::Delete => {
                doc.remove(self.target);
                None
            }
            SwapStrategy::InnerHtml => Some(self.swap_inner(&mut doc)),
            SwapStrategy::Default | SwapStrategy::OuterHtml => self.swap_outer(&mut doc),
        }
    }

    fn swap_inner(&self, doc: &mut Document) -> Settle {
        let config = &self.config;
        doc.remove_class(self.target, &config.swapping_class);

        let added: Vec<NodeId> = doc
            .replace_children(self.target, &self.content.children)
            .into_iter()
            .filter(|&id| doc.is_element(id))
            .collect();
        for &id in &added {
            doc.add_class(id, &config.added_class);
        }
        doc.add_class(self.target, &config.settling_class);

        self.settle(self.target, added, Vec::new())
    }

    fn swap_outer(&self, doc: &mut Document) -> Option<Settle> {
        let config = &self.config;
        let settled = &config.attributes_to_settle;

        let old_values: Vec<(&str, Option<String>)> = settled
            .iter()
            .map(|name| (name.as_str(), doc.attr(self.target, name).map(str::to_owned)))
            .collect();
        let final_values: Vec<(String, Option<String>)> = settled
            .iter()
            .map(|name| (name.clone(), self.content.attr(name).map(str::to_owned)))
            .collect();

        let fragment = FragmentNode::Element(ElementNode::clone(&self.content));
        let Some(replacement) = doc.replace_with(self.target, &fragment) else {
            debug!(target = ?self.target, "target has no parent, cannot replace");
            return None;
        };

        // the replacement starts from the old node's look
        for (name, value) in old_values {
            match value {
                Some(value) => doc.set_attr(replacement, name, &value),
                None => {
                    doc.remove_attr(replacement, name);
                }
            }
        }
        doc.remove_class(replacement, &config.swapping_class);
        doc.add_class(replacement, &config.added_class);
        doc.add_class(replacement, &config.settling_class);

        Some(self.settle(replacement, vec![replacement], final_values))
    }

    fn settle(
        &self,
        anchor: NodeId,
        added: Vec<NodeId>,
        restore: Vec<(String, Option<String>)>,
    ) -> Settle {
        Settle {
            doc: Rc::clone(&self.doc),
            config: Rc::clone(&self.config),
            anchor,
            added,
            restore,
        }
    }
}

// ---------------------------------------------------------------------------
// Settle phase
// ---------------------------------------------------------------------------

/// Cosmetic finalization after a structural mutation.
struct Settle {
    doc: DocumentHandle,
    config: Rc<SwapConfig>,
    /// Replacement element (outer) or target (inner); carries the settling class.
    anchor: NodeId,
    /// Inserted elements carrying the added class.
    added: Vec<NodeId>,
    /// Final attribute values for the anchor; `None` removes the attribute.
    restore: Vec<(String, Option<String>)>,
}

impl Settle {
    fn schedule(self, scheduler: &SwapScheduler, delay: Duration) {
        debug!(anchor = ?self.anchor, ?delay, "settle scheduled");
        scheduler.spawn(async move {
            tokio::time::sleep(delay).await;
            self.finish();
        });
    }

    fn finish(self) {
        let Ok(mut doc) = self.doc.try_borrow_mut() else {
            warn!(anchor = ?self.anchor, "document is borrowed elsewhere, skipping settle");
            return;
        };
        if doc.is_connected(self.anchor) {
            for (name, value) in &self.restore {
                match value {
                    Some(value) => doc.set_attr(self.anchor, name, value),
                    None => {
                        doc.remove_attr(self.anchor, name);
                    }
                }
            }
            doc.remove_class(self.anchor, &self.config.settling_class);
        }
        for &id in &self.added {
            if doc.is_connected(id) {
                doc.remove_class(id, &self.config.added_class);
            }
        }
    }
}
