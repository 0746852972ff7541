//! Where the deferred half of the swap/settle protocol runs.

use std::cell::RefCell;
use std::fmt;
use std::future::Future;
use std::rc::Rc;

use tokio::task::{JoinHandle, LocalSet};
use tracing::{debug, warn};

/// Runs delayed swap and settle steps.
///
/// [`SwapScheduler::immediate`] (the default) has nowhere to put deferred work:
/// the executor runs every step inline and records zero timing.
/// [`SwapScheduler::local`] owns a tokio `LocalSet` and spawns delayed steps onto
/// it. Those steps only make progress while the scheduler is driven, through
/// [`SwapScheduler::run_until`] or [`SwapScheduler::settled`], from inside a tokio
/// runtime. No ambient `LocalSet` is needed.
#[derive(Clone, Default)]
pub struct SwapScheduler {
    local: Option<Rc<LocalTasks>>,
}

struct LocalTasks {
    set: LocalSet,
    pending: RefCell<Vec<JoinHandle<()>>>,
}

impl fmt::Debug for SwapScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pending = self.local.as_ref().map(|l| l.pending.borrow().len());
        f.debug_struct("SwapScheduler")
            .field("deferred", &self.is_deferred())
            .field("pending", &pending)
            .finish()
    }
}

impl SwapScheduler {
    /// Every step runs before `execute` returns.
    pub fn immediate() -> Self {
        Self::default()
    }

    /// Delayed steps run on a `LocalSet` owned by this scheduler and its clones.
    pub fn local() -> Self {
        Self {
            local: Some(Rc::new(LocalTasks {
                set: LocalSet::new(),
                pending: RefCell::default(),
            })),
        }
    }

    /// Whether delays are honoured.
    pub fn is_deferred(&self) -> bool {
        self.local.is_some()
    }

    /// Queue `task`. Only called for deferred schedulers; an immediate one drops
    /// the task with a warning.
    pub(crate) fn spawn(&self, task: impl Future<Output = ()> + 'static) {
        match &self.local {
            Some(local) => {
                let handle = local.set.spawn_local(task);
                local.pending.borrow_mut().push(handle);
            }
            None => warn!("deferred swap step on an immediate scheduler, dropping it"),
        }
    }

    /// Drive `future` while letting deferred steps run alongside it.
    pub async fn run_until<F: Future>(&self, future: F) -> F::Output {
        match &self.local {
            Some(local) => local.set.run_until(future).await,
            None => future.await,
        }
    }

    /// Wait until every deferred step queued so far, and every settle step those
    /// queue in turn, has run.
    ///
    /// Must not be awaited from inside [`SwapScheduler::run_until`].
    pub async fn settled(&self) {
        let Some(local) = &self.local else {
            return;
        };
        local
            .set
            .run_until(async {
                loop {
                    let batch = std::mem::take(&mut *local.pending.borrow_mut());
                    if batch.is_empty() {
                        break;
                    }
                    debug!(tasks = batch.len(), "waiting for deferred swap steps");
                    for handle in batch {
                        if let Err(err) = handle.await {
                            warn!(error = %err, "deferred swap step did not complete");
                        }
                    }
                }
            })
            .await;
    }
}
