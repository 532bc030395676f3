//! Render roots.
//!
//! A [`Root`] owns the fiber tree rendered into one container element and
//! the commit scheduler that writes it to the document. State updates from
//! hooks are queued here and re-rendered before the next commit.

use crate::arena::FiberId;
use crate::context::Context;
use crate::error::{RenderError, RenderResult};
use crate::mutation::CommitStats;
use crate::reconciler::Reconciler;
use crate::scheduler::{
    CommitScheduler, FrameRequester, ImmediateFrames, SchedulerOptions, SharedDocument,
};
use crate::scope::UpdateSink;
use crate::sync::lock;
use crate::vnode::VNode;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, TryLockError, Weak};
use tracing::{debug, error, instrument, warn};
use trellis_dom::NodeId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RootOptions {
    #[serde(flatten)]
    pub scheduler: SchedulerOptions,
    /// Start the background commit loop when a tokio runtime is available.
    pub background: bool,
    /// Re-renders allowed while draining one batch of state updates.
    pub max_updates: usize,
}

impl Default for RootOptions {
    fn default() -> Self {
        Self {
            scheduler: SchedulerOptions::default(),
            background: true,
            max_updates: 256,
        }
    }
}

pub struct RootBuilder {
    document: SharedDocument,
    target: NodeId,
    options: RootOptions,
    frames: Arc<dyn FrameRequester>,
    context: Context,
}

impl RootBuilder {
    pub fn new(document: SharedDocument, target: NodeId) -> Self {
        Self {
            document,
            target,
            options: RootOptions::default(),
            frames: Arc::new(ImmediateFrames),
            context: Context::new(),
        }
    }

    pub fn options(mut self, options: RootOptions) -> Self {
        self.options = options;
        self
    }

    pub fn frames(mut self, frames: Arc<dyn FrameRequester>) -> Self {
        self.frames = frames;
        self
    }

    /// Context visible to every component under the root.
    pub fn context(mut self, context: Context) -> Self {
        self.context = context;
        self
    }

    pub fn build(self) -> Root {
        let scheduler =
            CommitScheduler::new(self.document, self.frames, self.options.scheduler.clone());
        let target = self.target;
        let context = self.context;
        let max_updates = self.options.max_updates.max(1);

        let shared = Arc::new_cyclic(|weak: &Weak<RootShared>| {
            let sink: Weak<dyn UpdateSink> = weak.clone();
            RootShared {
                reconciler: Mutex::new(Reconciler::new(
                    target,
                    context,
                    scheduler.clone(),
                    sink,
                )),
                updates: Mutex::new(VecDeque::new()),
                scheduler: scheduler.clone(),
                target,
                max_updates,
            }
        });

        if self.options.background {
            scheduler.start();
        }
        debug!(target = %target, "root created");
        Root { shared }
    }
}

/// Creates a root rendering into `target` with default options.
pub fn create_root(document: SharedDocument, target: NodeId) -> Root {
    RootBuilder::new(document, target).build()
}

pub struct Root {
    shared: Arc<RootShared>,
}

impl Root {
    pub fn builder(document: SharedDocument, target: NodeId) -> RootBuilder {
        RootBuilder::new(document, target)
    }

    /// Reconciles `vnode` against the previous render and commits the result.
    #[instrument(skip(self, vnode), fields(target = %self.shared.target))]
    pub fn render(&self, vnode: VNode) -> RenderResult<()> {
        {
            let mut reconciler = self.shared.reconciler();
            reconciler.render(vnode)?;
            self.shared.drain_updates(&mut reconciler)?;
        }
        self.shared.process_updates()?;
        self.flush()
    }

    /// Runs `f`, then processes the state updates it caused and commits.
    #[instrument(skip_all, fields(target = %self.shared.target))]
    pub fn act<R>(&self, f: impl FnOnce() -> R) -> RenderResult<R> {
        let result = f();
        self.shared.process_updates()?;
        self.flush()?;
        Ok(result)
    }

    /// Re-renders queued updates and applies every pending operation.
    pub fn flush(&self) -> RenderResult<()> {
        loop {
            self.shared.process_updates()?;
            self.shared.scheduler.force_commit()?;
            // Effects that ran during the commit may have queued more work.
            if lock(&self.shared.updates).is_empty() {
                return Ok(());
            }
        }
    }

    /// Removes everything rendered so far. The root can render again.
    #[instrument(skip(self), fields(target = %self.shared.target))]
    pub fn unmount(&self) -> RenderResult<()> {
        self.shared.reconciler().unmount_all()?;
        lock(&self.shared.updates).clear();
        self.shared.scheduler.force_commit()?;
        Ok(())
    }

    /// Stops the scheduler. Later renders fail with a closed-scheduler error.
    pub fn close(&self) -> RenderResult<()> {
        self.shared.scheduler.close()?;
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.shared.scheduler.is_closed()
    }

    pub fn scheduler(&self) -> &CommitScheduler {
        &self.shared.scheduler
    }

    pub fn stats(&self) -> CommitStats {
        self.shared.scheduler.stats()
    }

    pub fn reset_stats(&self) {
        self.shared.scheduler.reset_stats();
    }

    pub fn document(&self) -> SharedDocument {
        self.shared.scheduler.document()
    }

    pub fn target(&self) -> NodeId {
        self.shared.target
    }

    /// Number of mounted fibers, including the root itself.
    pub fn fiber_count(&self) -> usize {
        self.shared.reconciler().len()
    }
}

impl Drop for Root {
    fn drop(&mut self) {
        if !self.shared.scheduler.is_closed() {
            let _ = self.shared.scheduler.close();
        }
    }
}

struct RootShared {
    reconciler: Mutex<Reconciler>,
    updates: Mutex<VecDeque<FiberId>>,
    scheduler: CommitScheduler,
    target: NodeId,
    max_updates: usize,
}

impl RootShared {
    fn reconciler(&self) -> MutexGuard<'_, Reconciler> {
        lock(&self.reconciler)
    }

    /// Re-renders queued instances unless a render pass is already running.
    ///
    /// The running pass drains the queue itself, and rechecks it after
    /// releasing the reconciler, so no request is lost.
    fn process_updates(&self) -> RenderResult<()> {
        loop {
            {
                let mut reconciler = match self.reconciler.try_lock() {
                    Ok(guard) => guard,
                    Err(TryLockError::WouldBlock) => return Ok(()),
                    Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
                };
                self.drain_updates(&mut reconciler)?;
            }
            if lock(&self.updates).is_empty() {
                return Ok(());
            }
        }
    }

    fn drain_updates(&self, reconciler: &mut Reconciler) -> RenderResult<()> {
        let mut rerenders = 0;
        while let Some(fiber) = self.pop_update() {
            if rerenders == self.max_updates {
                lock(&self.updates).clear();
                warn!(limit = self.max_updates, "update loop detected, dropping queued updates");
                return Err(RenderError::TooManyUpdates(self.max_updates));
            }
            reconciler.rerender(fiber)?;
            rerenders += 1;
        }
        Ok(())
    }

    fn pop_update(&self) -> Option<FiberId> {
        lock(&self.updates).pop_front()
    }
}

impl UpdateSink for RootShared {
    fn request_update(&self, fiber: FiberId) {
        {
            let mut updates = lock(&self.updates);
            if !updates.contains(&fiber) {
                updates.push_back(fiber);
            }
        }
        if let Err(err) = self.process_updates() {
            error!(fiber = %fiber, error = %err, "state update failed");
        }
        self.scheduler.wake();
    }
}
