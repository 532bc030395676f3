use crate::arena::FiberId;
use crate::context::Context;
use crate::hooks::HookSlots;
use std::any::Any;
use std::fmt;
use std::sync::{Arc, Weak};
use tracing::trace;

/// Receiver of re-render requests, implemented by the root.
pub(crate) trait UpdateSink: Send + Sync {
    fn request_update(&self, fiber: FiberId);
}

/// Schedules a re-render of one component instance.
///
/// Holds the root weakly; requests for an unmounted instance or a dropped
/// root are ignored.
#[derive(Clone, Default)]
pub struct Updater {
    target: Option<(Weak<dyn UpdateSink>, FiberId)>,
}

impl Updater {
    pub(crate) fn new(sink: Weak<dyn UpdateSink>, fiber: FiberId) -> Self {
        Self {
            target: Some((sink, fiber)),
        }
    }

    /// An updater bound to nothing.
    pub fn detached() -> Self {
        Self::default()
    }

    pub fn request_update(&self) {
        let Some((sink, fiber)) = &self.target else {
            return;
        };
        match sink.upgrade() {
            Some(sink) => sink.request_update(*fiber),
            None => trace!(fiber = %fiber, "update requested after root was dropped"),
        }
    }
}

impl fmt::Debug for Updater {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.target {
            Some((_, fiber)) => write!(f, "Updater({})", fiber),
            None => write!(f, "Updater(detached)"),
        }
    }
}

/// The component instance currently rendering.
///
/// Passed to every component render; hooks take it as their first argument
/// and resolve to the instance's persistent slots.
pub struct Scope<'a> {
    slots: &'a HookSlots,
    context: &'a Context,
    updater: &'a Updater,
}

impl<'a> Scope<'a> {
    pub(crate) fn new(slots: &'a HookSlots, context: &'a Context, updater: &'a Updater) -> Self {
        Self {
            slots,
            context,
            updater,
        }
    }

    pub fn context(&self) -> &Context {
        self.context
    }

    /// Looks up a value provided by an ancestor.
    pub fn consume<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.context.get::<T>()
    }

    /// Handle that re-renders this instance when called.
    pub fn updater(&self) -> Updater {
        self.updater.clone()
    }

    pub(crate) fn slots(&self) -> &HookSlots {
        self.slots
    }
}
