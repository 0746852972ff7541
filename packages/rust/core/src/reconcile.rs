//! One reconciliation pass: response body in, primary content and swap record out.

use std::collections::VecDeque;
use std::time::Duration;

use tracing::{debug, info, instrument, warn};

use oobswap_document::DocumentHandle;
use oobswap_fragment::{ElementNode, FragmentTree, parse_fragment};
use oobswap_shared::{OobError, SwapConfig, SwapStrategy};

use crate::directive::OobDirective;
use crate::discover::{Discovery, discover, discover_nested};
use crate::execute::{SwapExecutor, SwapResult};
use crate::resolve::resolve_targets;
use crate::schedule::SwapScheduler;

/// Outcome of a reconciliation pass.
#[derive(Debug, Clone, Default)]
pub struct Reconciliation {
    /// The response with every OOB node removed; left for the caller to place.
    pub primary: FragmentTree,
    /// Swaps in execution order. Deferred ones may still be pending.
    pub swaps: Vec<SwapResult>,
}

/// Directives that could not be evaluated, alongside everything that could.
#[derive(Debug, thiserror::Error)]
#[error("{} OOB directive(s) failed: {}", .errors.len(), first_message(.errors))]
pub struct ReconcileFailure {
    pub errors: Vec<OobError>,
    pub partial: Reconciliation,
}

fn first_message(errors: &[OobError]) -> String {
    errors.first().map(ToString::to_string).unwrap_or_default()
}

/// Drives discovery, resolution and execution for response bodies.
#[derive(Debug, Clone)]
pub struct Reconciler {
    executor: SwapExecutor,
}

impl Reconciler {
    /// Reconciler that applies every swap inline, delays included.
    pub fn new(config: SwapConfig) -> Self {
        Self {
            executor: SwapExecutor::new(config),
        }
    }

    /// Reconciler whose delayed steps run on `scheduler`.
    pub fn with_scheduler(config: SwapConfig, scheduler: SwapScheduler) -> Self {
        Self {
            executor: SwapExecutor::with_scheduler(config, scheduler),
        }
    }

    pub fn config(&self) -> &SwapConfig {
        self.executor.config()
    }

    pub fn scheduler(&self) -> &SwapScheduler {
        self.executor.scheduler()
    }

    /// Apply every OOB node in `body` to `doc`.
    ///
    /// Nodes run in discovery order; a node's nested OOB nodes run right after
    /// it, before its later siblings. `default_settle` applies to directives
    /// without a `settle:` modifier. Primary content is returned, never inserted.
    #[instrument(skip_all, fields(len = body.len()))]
    pub fn reconcile(
        &self,
        body: &str,
        doc: &DocumentHandle,
        default_settle: Duration,
    ) -> Result<Reconciliation, ReconcileFailure> {
        let Discovery { primary, oob_nodes } = discover(parse_fragment(body));
        debug!(count = oob_nodes.len(), "discovered OOB nodes");

        let mut queue: VecDeque<ElementNode> = oob_nodes.into();
        let mut swaps = Vec::new();
        let mut errors = Vec::new();

        while let Some(mut node) = queue.pop_front() {
            let Some(directive) = OobDirective::from_element(&node) else {
                continue;
            };
            let nested = discover_nested(&mut node);

            // the borrow must end before the executor mutates the document
            let resolved = resolve_targets(&node, &directive, &doc.borrow());
            match resolved {
                Ok(targets) => swaps.extend(self.executor.execute(
                    doc,
                    &node,
                    &directive,
                    &targets,
                    default_settle,
                )),
                Err(err) => {
                    warn!(error = %err, "skipping OOB directive");
                    errors.push(err);
                }
            }

            if directive.strategy == SwapStrategy::Delete {
                if !nested.is_empty() {
                    debug!(discarded = nested.len(), "dropping OOB nodes nested in a delete");
                }
                continue;
            }
            for inner in nested.into_iter().rev() {
                queue.push_front(inner);
            }
        }

        info!(
            swaps = swaps.len(),
            failed = errors.len(),
            primary_empty = primary.is_empty(),
            "reconciliation pass complete"
        );

        let reconciliation = Reconciliation { primary, swaps };
        if errors.is_empty() {
            Ok(reconciliation)
        } else {
            Err(ReconcileFailure {
                errors,
                partial: reconciliation,
            })
        }
    }
}
