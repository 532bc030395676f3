//! Hook slots: per-instance persistent state addressed by call order.
//!
//! Each component instance owns one [`HookSlots`] array that survives across
//! renders. The Nth hook call of a render resolves to the Nth slot; the
//! reconciler resets the cursor before every render.

use crate::compare::{deps_changed, Deps};
use crate::handle::NodeHandle;
use crate::scope::{Scope, Updater};
use crate::sync::lock;
use crate::vnode::ComponentType;
use std::any::Any;
use std::fmt;
use std::sync::{Arc, Mutex};
use tracing::warn;
use trellis_dom::NodeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookKind {
    State,
    Effect,
    Memo,
    Ref,
}

trait SlotCell: Send + Sync {
    fn kind(&self) -> HookKind;

    /// Runs work that was deferred until the owner's mutations committed.
    fn commit(&self) {}

    fn destroy(&self) {}

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

#[derive(Default)]
struct SlotState {
    slots: Vec<Arc<dyn SlotCell>>,
    cursor: usize,
}

#[derive(Default)]
pub struct HookSlots {
    state: Mutex<SlotState>,
}

impl fmt::Debug for HookSlots {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookSlots").field("len", &self.len()).finish()
    }
}

impl HookSlots {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        lock(&self.state).slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn will_render(&self) {
        lock(&self.state).cursor = 0;
    }

    pub(crate) fn did_render(&self, component: &str) {
        let state = lock(&self.state);
        if state.cursor < state.slots.len() {
            warn!(
                component,
                called = state.cursor,
                slots = state.slots.len(),
                "component called fewer hooks than in its previous render"
            );
        }
    }

    /// Runs pending effects in slot order.
    pub(crate) fn commit(&self) {
        for cell in self.cells() {
            cell.commit();
        }
    }

    /// Runs effect cleanups in slot order and releases all slots.
    pub(crate) fn destroy(&self) {
        let cells = std::mem::take(&mut lock(&self.state).slots);
        for cell in cells {
            cell.destroy();
        }
    }

    fn cells(&self) -> Vec<Arc<dyn SlotCell>> {
        lock(&self.state).slots.clone()
    }

    fn use_slot<C>(&self, kind: HookKind, init: impl FnOnce() -> C) -> Arc<C>
    where
        C: SlotCell + 'static,
    {
        let mut state = lock(&self.state);
        let index = state.cursor;
        state.cursor += 1;

        let stale = match state.slots.get(index) {
            Some(slot) if slot.kind() == kind => match slot.clone().into_any().downcast::<C>() {
                Ok(cell) => return cell,
                Err(_) => {
                    warn!(position = index, kind = ?kind, "hook value type changed between renders, resetting slot");
                    Some(index)
                }
            },
            Some(slot) => {
                warn!(
                    position = index,
                    expected = ?slot.kind(),
                    found = ?kind,
                    "hook call order changed between renders, resetting slot"
                );
                Some(index)
            }
            None => None,
        };

        let cell = Arc::new(init());
        let stale = match stale {
            Some(index) => Some(std::mem::replace(
                &mut state.slots[index],
                cell.clone() as Arc<dyn SlotCell>,
            )),
            None => {
                state.slots.push(cell.clone());
                None
            }
        };
        drop(state);

        if let Some(stale) = stale {
            stale.destroy();
        }
        cell
    }
}

struct StateCell<T> {
    value: Mutex<T>,
    updater: Mutex<Updater>,
}

impl<T: Send + 'static> SlotCell for StateCell<T> {
    fn kind(&self) -> HookKind {
        HookKind::State
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// Writes a state slot and re-renders its instance when the value changes.
pub struct Setter<T> {
    cell: Arc<StateCell<T>>,
}

impl<T> Clone for Setter<T> {
    fn clone(&self) -> Self {
        Self {
            cell: self.cell.clone(),
        }
    }
}

impl<T> fmt::Debug for Setter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Setter")
    }
}

impl<T: Clone + PartialEq + Send + 'static> Setter<T> {
    /// Stores `value` and, if it changed, re-renders the owning component
    /// synchronously on this thread. Callers must not hold locks the render takes.
    pub fn set(&self, value: T) {
        self.update(move |_| value);
    }

    /// Computes the next value from the current one.
    pub fn update(&self, f: impl FnOnce(&T) -> T) {
        let changed = {
            let mut current = lock(&self.cell.value);
            let next = f(&current);
            if next == *current {
                false
            } else {
                *current = next;
                true
            }
        };

        if changed {
            let updater = lock(&self.cell.updater).clone();
            updater.request_update();
        }
    }

    pub fn get(&self) -> T {
        lock(&self.cell.value).clone()
    }
}

/// Persistent state: `initial` is used on the first render only.
pub fn use_state<T>(scope: &mut Scope<'_>, initial: T) -> (T, Setter<T>)
where
    T: Clone + PartialEq + Send + 'static,
{
    let cell = scope.slots().use_slot(HookKind::State, || StateCell {
        value: Mutex::new(initial),
        updater: Mutex::new(Updater::detached()),
    });
    *lock(&cell.updater) = scope.updater();
    let value = lock(&cell.value).clone();
    (value, Setter { cell })
}

pub type Cleanup = Box<dyn FnOnce() + Send>;

type Setup = Box<dyn FnOnce() -> Option<Cleanup> + Send>;

/// Wraps a teardown closure for returning from an effect.
pub fn cleanup(f: impl FnOnce() + Send + 'static) -> Option<Cleanup> {
    Some(Box::new(f))
}

#[derive(Default)]
struct EffectState {
    committed: bool,
    deps: Deps,
    cleanup: Option<Cleanup>,
    pending: Option<(Setup, Deps)>,
}

#[derive(Default)]
struct EffectCell {
    state: Mutex<EffectState>,
}

impl SlotCell for EffectCell {
    fn kind(&self) -> HookKind {
        HookKind::Effect
    }

    fn commit(&self) {
        let Some((setup, deps)) = lock(&self.state).pending.take() else {
            return;
        };
        let previous = {
            let mut state = lock(&self.state);
            state.deps = deps;
            state.committed = true;
            state.cleanup.take()
        };
        if let Some(previous) = previous {
            previous();
        }

        // Setup may update state and re-render this instance.
        let cleanup = setup();
        lock(&self.state).cleanup = cleanup;
    }

    fn destroy(&self) {
        let cleanup = {
            let mut state = lock(&self.state);
            state.pending = None;
            state.cleanup.take()
        };
        if let Some(cleanup) = cleanup {
            cleanup();
        }
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// Side effect run after the instance's mutations commit.
///
/// Re-runs, after the previous cleanup, when `deps` is `None` or shallow
/// unequal to the deps of the last run. An empty list runs once.
pub fn use_effect<F>(scope: &mut Scope<'_>, setup: F, deps: Deps)
where
    F: FnOnce() -> Option<Cleanup> + Send + 'static,
{
    let cell = scope
        .slots()
        .use_slot(HookKind::Effect, EffectCell::default);
    let mut state = lock(&cell.state);
    let run = !state.committed || deps_changed(state.deps.as_deref(), deps.as_deref());
    state.pending = if run {
        Some((Box::new(setup) as Setup, deps))
    } else {
        None
    };
}

struct MemoState<T> {
    deps: Deps,
    value: Option<T>,
}

struct MemoCell<T> {
    state: Mutex<MemoState<T>>,
}

impl<T: Send + 'static> SlotCell for MemoCell<T> {
    fn kind(&self) -> HookKind {
        HookKind::Memo
    }

    fn destroy(&self) {
        lock(&self.state).value = None;
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// Cached value recomputed only when `deps` is `None` or changed.
pub fn use_memo<T, F>(scope: &mut Scope<'_>, compute: F, deps: Deps) -> T
where
    T: Clone + Send + 'static,
    F: FnOnce() -> T,
{
    let cell = scope.slots().use_slot(HookKind::Memo, || MemoCell {
        state: Mutex::new(MemoState::<T> {
            deps: None,
            value: None,
        }),
    });

    {
        let state = lock(&cell.state);
        if let Some(value) = &state.value {
            if !deps_changed(state.deps.as_deref(), deps.as_deref()) {
                return value.clone();
            }
        }
    }

    let value = compute();
    let mut state = lock(&cell.state);
    state.value = Some(value.clone());
    state.deps = deps;
    value
}

/// Mutable cell whose identity is stable for the life of its owner.
pub struct Ref<T> {
    current: Arc<Mutex<T>>,
}

impl<T> Clone for Ref<T> {
    fn clone(&self) -> Self {
        Self {
            current: self.current.clone(),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Ref<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Ref").field(&*lock(&self.current)).finish()
    }
}

impl<T> Ref<T> {
    pub fn new(value: T) -> Self {
        Self {
            current: Arc::new(Mutex::new(value)),
        }
    }

    pub fn set(&self, value: T) {
        *lock(&self.current) = value;
    }

    pub fn with<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        f(&mut lock(&self.current))
    }

    pub fn ptr_eq(&self, other: &Ref<T>) -> bool {
        Arc::ptr_eq(&self.current, &other.current)
    }
}

impl<T: Clone> Ref<T> {
    pub fn get(&self) -> T {
        lock(&self.current).clone()
    }
}

impl<T: Send + 'static> SlotCell for Ref<T> {
    fn kind(&self) -> HookKind {
        HookKind::Ref
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

pub fn use_ref<T: Send + 'static>(scope: &mut Scope<'_>, initial: T) -> Ref<T> {
    let cell = scope
        .slots()
        .use_slot(HookKind::Ref, || Ref::new(initial));
    (*cell).clone()
}

/// What an element ref points at once its owner is mounted.
#[derive(Debug, Clone)]
pub enum RefTarget {
    Element(NodeHandle),
    Component(ComponentType),
}

impl RefTarget {
    pub fn node_id(&self) -> Option<NodeId> {
        match self {
            RefTarget::Element(handle) => handle.get(),
            RefTarget::Component(_) => None,
        }
    }
}

pub type ElementRef = Ref<Option<RefTarget>>;

impl Ref<Option<RefTarget>> {
    /// Document node of the referenced element, if mounted.
    pub fn node_id(&self) -> Option<NodeId> {
        self.with(|target| target.as_ref().and_then(RefTarget::node_id))
    }
}

pub fn use_element_ref(scope: &mut Scope<'_>) -> ElementRef {
    use_ref(scope, None)
}
