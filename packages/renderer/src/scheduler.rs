//! Commit scheduler.
//!
//! The reconciler never touches the document directly. It dispatches
//! [`CommitOp`]s into a pending buffer; a background loop periodically swaps
//! that buffer out, splits it into chunks and requests one animation frame
//! per chunk. [`CommitScheduler::force_commit`] drains everything
//! synchronously instead.
//!
//! Two locks keep forced and background flushes from double-applying or
//! dropping work: the queue lock covers the buffer swap and chunk hand-off,
//! the apply lock serializes chunk application in enqueue order.

use crate::error::{CommitError, SchedulerError};
use crate::mutation::{CommitOp, CommitStats, Mutation};
use crate::sync::lock;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, Weak};
use std::thread::{self, ThreadId};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::{oneshot, Notify};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, instrument, trace, warn};
use trellis_dom::Document;

pub type SharedDocument = Arc<Mutex<dyn Document>>;

pub type Frame = Box<dyn FnOnce() + Send>;

/// Source of animation-frame callbacks.
pub trait FrameRequester: Send + Sync {
    fn request_animation_frame(&self, frame: Frame);
}

/// Runs every frame immediately on the requesting thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImmediateFrames;

impl FrameRequester for ImmediateFrames {
    fn request_animation_frame(&self, frame: Frame) {
        frame();
    }
}

/// Delivers frames on the tokio runtime after a fixed frame interval.
///
/// Falls back to running inline when no runtime is available.
#[derive(Debug, Clone, Copy)]
pub struct TokioFrames {
    interval: Duration,
}

impl TokioFrames {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl Default for TokioFrames {
    fn default() -> Self {
        Self::new(Duration::from_millis(16))
    }
}

impl FrameRequester for TokioFrames {
    fn request_animation_frame(&self, frame: Frame) {
        match Handle::try_current() {
            Ok(handle) => {
                let interval = self.interval;
                handle.spawn(async move {
                    tokio::time::sleep(interval).await;
                    frame();
                });
            }
            Err(_) => frame(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SchedulerOptions {
    /// Background loop period in milliseconds.
    pub tick_ms: u64,
    /// Operations applied per animation frame.
    pub chunk_size: usize,
    /// Upper bound on drain passes in one forced commit.
    pub max_flush_passes: usize,
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        Self {
            tick_ms: 10,
            chunk_size: 2048,
            max_flush_passes: 64,
        }
    }
}

#[derive(Default)]
struct Queue {
    pending: Vec<CommitOp>,
    ready: VecDeque<Vec<CommitOp>>,
    closed: bool,
}

struct Inner {
    document: SharedDocument,
    frames: Arc<dyn FrameRequester>,
    options: SchedulerOptions,
    queue: Mutex<Queue>,
    apply: Mutex<()>,
    applying_on: Mutex<Option<ThreadId>>,
    stats: Mutex<CommitStats>,
    wake: Arc<Notify>,
    shutdown: Mutex<Option<oneshot::Sender<()>>>,
}

/// Cloneable handle to a shared commit queue.
#[derive(Clone)]
pub struct CommitScheduler {
    inner: Arc<Inner>,
}

impl CommitScheduler {
    pub fn new(
        document: SharedDocument,
        frames: Arc<dyn FrameRequester>,
        options: SchedulerOptions,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                document,
                frames,
                options,
                queue: Mutex::new(Queue::default()),
                apply: Mutex::new(()),
                applying_on: Mutex::new(None),
                stats: Mutex::new(CommitStats::default()),
                wake: Arc::new(Notify::new()),
                shutdown: Mutex::new(None),
            }),
        }
    }

    /// Spawns the background flush loop on the current tokio runtime.
    ///
    /// Returns false when there is no runtime; only forced commits flush then.
    pub fn start(&self) -> bool {
        let Ok(handle) = Handle::try_current() else {
            debug!("no tokio runtime, background commits disabled");
            return false;
        };

        let mut shutdown = lock(&self.inner.shutdown);
        if shutdown.is_some() || lock(&self.inner.queue).closed {
            return false;
        }
        let (tx, rx) = oneshot::channel();
        *shutdown = Some(tx);

        let tick = Duration::from_millis(self.inner.options.tick_ms.max(1));
        handle.spawn(run_loop(
            Arc::downgrade(&self.inner),
            self.inner.wake.clone(),
            rx,
            tick,
        ));
        debug!(tick_ms = tick.as_millis() as u64, "commit loop started");
        true
    }

    pub fn dispatch(&self, op: impl Into<CommitOp>) -> Result<(), SchedulerError> {
        let mut queue = lock(&self.inner.queue);
        if queue.closed {
            return Err(SchedulerError::Closed);
        }
        queue.pending.push(op.into());
        Ok(())
    }

    /// Asks the background loop to flush without waiting for the next tick.
    pub fn wake(&self) {
        self.inner.wake.notify_one();
    }

    /// Operations queued and not yet applied.
    pub fn pending_len(&self) -> usize {
        let queue = lock(&self.inner.queue);
        queue.pending.len() + queue.ready.iter().map(Vec::len).sum::<usize>()
    }

    /// Moves the pending buffer into frame-sized chunks and requests frames.
    pub fn schedule_frames(&self) {
        self.inner.schedule_frames();
    }

    /// Applies every queued operation on the calling thread.
    ///
    /// Scheduled chunks go first, then the pending buffer, repeating while
    /// callbacks enqueue follow-up work. Returns the first failed mutation;
    /// the remaining operations are still applied. Called from inside a
    /// commit callback it returns immediately and the outer flush picks up
    /// the new work.
    #[instrument(skip(self))]
    pub fn force_commit(&self) -> Result<(), SchedulerError> {
        if self.inner.is_applying_on_current_thread() {
            trace!("nested force commit deferred to the running flush");
            return Ok(());
        }

        let _apply = self.inner.begin_apply();
        let mut first_error: Option<CommitError> = None;
        let max_passes = self.inner.options.max_flush_passes.max(1);

        for pass in 0..max_passes {
            let ops: Vec<CommitOp> = {
                let mut queue = lock(&self.inner.queue);
                let mut ops: Vec<CommitOp> = queue.ready.drain(..).flatten().collect();
                ops.append(&mut queue.pending);
                ops
            };
            if ops.is_empty() {
                return first_error.map_or(Ok(()), |err| Err(err.into()));
            }

            debug!(pass, ops = ops.len(), "force commit");
            if let Err(err) = self.inner.apply_ops(ops) {
                first_error.get_or_insert(err);
            }
        }

        warn!(
            passes = max_passes,
            remaining = self.pending_len(),
            "commit queue still busy after the maximum number of flush passes"
        );
        first_error.map_or(Ok(()), |err| Err(err.into()))
    }

    /// Stops the background loop. Later dispatches fail with `Closed`.
    pub fn close(&self) -> Result<(), SchedulerError> {
        {
            let mut queue = lock(&self.inner.queue);
            if queue.closed {
                return Err(SchedulerError::Closed);
            }
            queue.closed = true;
        }
        if let Some(tx) = lock(&self.inner.shutdown).take() {
            let _ = tx.send(());
        }
        debug!("commit scheduler closed");
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        lock(&self.inner.queue).closed
    }

    pub fn stats(&self) -> CommitStats {
        *lock(&self.inner.stats)
    }

    pub fn reset_stats(&self) {
        *lock(&self.inner.stats) = CommitStats::default();
    }

    pub fn document(&self) -> SharedDocument {
        self.inner.document.clone()
    }

    pub fn options(&self) -> &SchedulerOptions {
        &self.inner.options
    }
}

/// Clears the applying-thread marker when a flush finishes.
struct ApplyGuard<'a> {
    inner: &'a Inner,
    _apply: std::sync::MutexGuard<'a, ()>,
}

impl Drop for ApplyGuard<'_> {
    fn drop(&mut self) {
        *lock(&self.inner.applying_on) = None;
    }
}

impl Inner {
    fn begin_apply(&self) -> ApplyGuard<'_> {
        let apply = lock(&self.apply);
        *lock(&self.applying_on) = Some(thread::current().id());
        ApplyGuard {
            inner: self,
            _apply: apply,
        }
    }

    fn is_applying_on_current_thread(&self) -> bool {
        *lock(&self.applying_on) == Some(thread::current().id())
    }

    fn schedule_frames(self: &Arc<Self>) {
        let chunks = {
            let mut queue = lock(&self.queue);
            if queue.pending.is_empty() {
                return;
            }
            let ops = std::mem::take(&mut queue.pending);
            let chunks = chunk_ops(ops, self.options.chunk_size);
            let count = chunks.len();
            queue.ready.extend(chunks);
            count
        };

        trace!(chunks, "requesting animation frames");
        for _ in 0..chunks {
            let inner = Arc::downgrade(self);
            self.frames.request_animation_frame(Box::new(move || {
                if let Some(inner) = inner.upgrade() {
                    inner.run_next_chunk();
                }
            }));
        }
    }

    fn run_next_chunk(&self) {
        if self.is_applying_on_current_thread() {
            return;
        }
        let _apply = self.begin_apply();
        let chunk = lock(&self.queue).ready.pop_front();
        if let Some(chunk) = chunk {
            if let Err(err) = self.apply_ops(chunk) {
                error!(error = %err, "frame commit failed");
            }
        }
    }

    fn apply_ops(&self, ops: Vec<CommitOp>) -> Result<(), CommitError> {
        let mut first_error = None;
        for op in ops {
            match op {
                CommitOp::Mutation(mutation) => {
                    if let Err(err) = self.apply_mutation(&mutation) {
                        first_error.get_or_insert(err);
                    }
                }
                CommitOp::Callback(callback) => {
                    callback();
                    lock(&self.stats).callbacks += 1;
                }
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    fn apply_mutation(&self, mutation: &Mutation) -> Result<(), CommitError> {
        let result = {
            let mut document = lock(&self.document);
            mutation.apply(&mut *document)
        };

        let mut stats = lock(&self.stats);
        match result {
            Ok(()) => {
                stats.record(mutation);
                Ok(())
            }
            Err(err) => {
                stats.failures += 1;
                warn!(op = mutation.name(), error = %err, "mutation aborted");
                Err(err)
            }
        }
    }
}

async fn run_loop(
    inner: Weak<Inner>,
    wake: Arc<Notify>,
    mut shutdown: oneshot::Receiver<()>,
    tick: Duration,
) {
    let mut ticker = tokio::time::interval(tick);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            _ = ticker.tick() => {}
            _ = wake.notified() => {}
        }
        match inner.upgrade() {
            Some(inner) => inner.schedule_frames(),
            None => break,
        }
    }
    debug!("commit loop stopped");
}

/// Splits `ops` into consecutive chunks of at most `size` operations.
pub(crate) fn chunk_ops(ops: Vec<CommitOp>, size: usize) -> Vec<Vec<CommitOp>> {
    let size = size.max(1);
    let mut chunks = Vec::with_capacity(ops.len().div_ceil(size));
    let mut iter = ops.into_iter();
    loop {
        let chunk: Vec<CommitOp> = iter.by_ref().take(size).collect();
        if chunk.is_empty() {
            break;
        }
        chunks.push(chunk);
    }
    chunks
}
