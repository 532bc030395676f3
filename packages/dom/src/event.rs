use crate::document::{Document, NodeId};
use crate::error::DomResult;
use crate::value::Value;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

pub type EventListener = Arc<dyn Fn(&Event) + Send + Sync>;

#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub name: String,
    pub target: NodeId,
    pub detail: Value,
}

impl Event {
    pub fn new(name: impl Into<String>, target: NodeId) -> Self {
        Self {
            name: name.into(),
            target,
            detail: Value::Null,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<Value>) -> Self {
        self.detail = detail.into();
        self
    }
}

/// Delivers `event` to the listeners of its target.
///
/// The document lock is released before listeners run, so a listener may
/// trigger renders that commit to the same document. Returns the number of
/// listeners invoked.
pub fn dispatch_event<D>(document: &Mutex<D>, event: &Event) -> DomResult<usize>
where
    D: Document + ?Sized,
{
    let listeners = document
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .event_listeners(event.target, &event.name)?;

    trace!(event = %event.name, target = %event.target, listeners = listeners.len(), "dispatching event");
    for listener in &listeners {
        listener(event);
    }
    Ok(listeners.len())
}
