//! Render-and-diff pass.
//!
//! The reconciler walks a new [`VNode`] tree against the committed fibers,
//! renders components, and dispatches the resulting mutations to the commit
//! scheduler. It never writes to the document itself.
//!
//! Fibers that own no element (fragments, components, providers) keep an
//! empty text node as end anchor in their parent element. Their content
//! always sits directly before that anchor, which makes them movable and
//! appendable without knowing what their descendants rendered.

mod differ;
mod fiber;

use crate::arena::{Arena, FiberId};
use crate::attrs::Attrs;
use crate::context::Context;
use crate::error::{RenderError, RenderResult};
use crate::handle::{Anchor, NodeHandle};
use crate::hooks::{HookSlots, RefTarget};
use crate::mutation::{CommitOp, Mutation, Placement};
use crate::scheduler::CommitScheduler;
use crate::scope::{Scope, UpdateSink, Updater};
use crate::vnode::{Child, Key, NodeKind, VNode};
use fiber::{classify_children, Fiber};
use crate::sync::panic_message;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Weak};
use tracing::{debug, error, trace};
use trellis_dom::NodeId;

pub(crate) struct Reconciler {
    fibers: Arena<Fiber>,
    root: FiberId,
    scheduler: CommitScheduler,
    sink: Weak<dyn UpdateSink>,
}

impl Reconciler {
    pub fn new(
        target: NodeId,
        context: Context,
        scheduler: CommitScheduler,
        sink: Weak<dyn UpdateSink>,
    ) -> Self {
        let mut fibers = Arena::new();
        let root = fibers.insert(Fiber::new(VNode::portal(target, []), None, context));
        Self {
            fibers,
            root,
            scheduler,
            sink,
        }
    }

    /// Number of mounted fibers, the root included.
    pub fn len(&self) -> usize {
        self.fibers.len()
    }

    /// Diffs `vnode` against the committed root subtree.
    pub fn render(&mut self, vnode: VNode) -> RenderResult<()> {
        let root = self.fiber(self.root)?;
        let context = root.context.clone();
        let next = VNode {
            kind: NodeKind::Fragment,
            key: Key::default(),
            input_children: vec![Child::Node(vnode)],
            is_root: true,
            target: root.node.clone(),
        };
        self.patch(Some(self.root), next, None, &context, &Anchor::End)?;
        debug!(fibers = self.fibers.len(), "render pass complete");
        Ok(())
    }

    /// Removes everything rendered under the root.
    pub fn unmount_all(&mut self) -> RenderResult<()> {
        let (target, children) = {
            let root = self.fiber_mut(self.root)?;
            (root.node.clone(), std::mem::take(&mut root.children))
        };
        let target = target.ok_or(RenderError::Detached(self.root))?;
        self.remove_children(&target, &children)
    }

    /// Re-renders one component instance in place.
    pub fn rerender(&mut self, id: FiberId) -> RenderResult<()> {
        let Some(fiber) = self.fibers.get(id) else {
            trace!(fiber = %id, "skipping update for unmounted instance");
            return Ok(());
        };
        let vnode = fiber.to_vnode();
        let parent = fiber.parent;
        let context = fiber.context.clone();
        debug!(fiber = %id, component = vnode.kind.describe(), "re-rendering instance");
        self.patch(Some(id), vnode, parent, &context, &Anchor::End)?;
        Ok(())
    }

    fn fiber(&self, id: FiberId) -> RenderResult<&Fiber> {
        self.fibers.get(id).ok_or(RenderError::UnknownFiber(id))
    }

    fn fiber_mut(&mut self, id: FiberId) -> RenderResult<&mut Fiber> {
        self.fibers.get_mut(id).ok_or(RenderError::UnknownFiber(id))
    }

    fn dispatch(&self, mutation: Mutation) -> RenderResult<()> {
        self.scheduler.dispatch(mutation)?;
        Ok(())
    }

    fn insert(
        &self,
        parent: &NodeHandle,
        child: &NodeHandle,
        anchor: &Anchor,
        placement: Placement,
    ) -> RenderResult<()> {
        self.dispatch(Mutation::InsertBefore {
            parent: parent.clone(),
            child: child.clone(),
            anchor: anchor.clone(),
            placement,
        })
    }

    /// Mounts `vnode` fresh (`old == None`) or patches the fiber `old` in
    /// place. Fresh nodes are inserted at `placement` in their parent element.
    fn patch(
        &mut self,
        old: Option<FiberId>,
        vnode: VNode,
        parent: Option<FiberId>,
        context: &Context,
        placement: &Anchor,
    ) -> RenderResult<FiberId> {
        match vnode.kind {
            NodeKind::Text(_) => self.patch_text(old, vnode, parent, context, placement),
            NodeKind::Element(_) | NodeKind::Fragment => {
                self.patch_host(old, vnode, parent, context, placement)
            }
            NodeKind::Component(_) | NodeKind::Provider(_) => {
                self.patch_component(old, vnode, parent, context, placement)
            }
        }
    }

    /// Stores the new fiber, reusing the slot of `old` and carrying its
    /// element, anchor, root flag and hook slots forward.
    fn install(
        &mut self,
        old: Option<FiberId>,
        vnode: VNode,
        parent: Option<FiberId>,
        context: &Context,
    ) -> RenderResult<(FiberId, Option<Fiber>)> {
        let mut fiber = Fiber::new(vnode, parent, context.clone());
        match old {
            Some(id) => {
                let slot = self.fiber_mut(id)?;
                fiber.node = slot.node.clone();
                fiber.anchor = slot.anchor.clone();
                fiber.is_root = slot.is_root;
                fiber.hooks = slot.hooks.clone();
                let previous = std::mem::replace(slot, fiber);
                Ok((id, Some(previous)))
            }
            None => Ok((self.fibers.insert(fiber), None)),
        }
    }

    fn patch_text(
        &mut self,
        old: Option<FiberId>,
        vnode: VNode,
        parent: Option<FiberId>,
        context: &Context,
        placement: &Anchor,
    ) -> RenderResult<FiberId> {
        let (id, previous) = self.install(old, vnode, parent, context)?;
        let text = match &self.fiber(id)?.kind {
            NodeKind::Text(text) => text.clone(),
            _ => String::new(),
        };

        match previous {
            Some(previous) => {
                let changed = !matches!(&previous.kind, NodeKind::Text(old_text) if *old_text == text);
                if changed {
                    let node = previous.node.ok_or(RenderError::Detached(id))?;
                    self.dispatch(Mutation::SetTextContent { node, text })?;
                }
            }
            None => {
                let handle = NodeHandle::pending();
                self.dispatch(Mutation::CreateTextNode {
                    handle: handle.clone(),
                    text,
                })?;
                self.fiber_mut(id)?.node = Some(handle.clone());
                let container = self.parent_element(id)?;
                self.insert(&container, &handle, placement, Placement::Insert)?;
            }
        }
        Ok(id)
    }

    fn patch_host(
        &mut self,
        old: Option<FiberId>,
        vnode: VNode,
        parent: Option<FiberId>,
        context: &Context,
        placement: &Anchor,
    ) -> RenderResult<FiberId> {
        let (id, previous) = self.install(old, vnode, parent, context)?;
        let children = {
            let fiber = self.fiber_mut(id)?;
            let input = std::mem::take(&mut fiber.input_children);
            classify_children(
                input,
                &fiber.kind,
                &mut fiber.attrs,
                &mut fiber.node_ref,
                context,
            )
        };
        self.mount(id, previous, children, context, placement)?;
        self.did_mount(id)?;
        Ok(id)
    }

    fn patch_component(
        &mut self,
        old: Option<FiberId>,
        vnode: VNode,
        parent: Option<FiberId>,
        context: &Context,
        placement: &Anchor,
    ) -> RenderResult<FiberId> {
        let (id, previous) = self.install(old, vnode, parent, context)?;
        let (children, child_context) = self.render_component(id, context)?;
        self.mount(id, previous, children, &child_context, placement)?;
        self.did_mount(id)?;
        Ok(id)
    }

    /// Runs a component's render function, or derives a provider's context.
    fn render_component(
        &mut self,
        id: FiberId,
        context: &Context,
    ) -> RenderResult<(Vec<VNode>, Context)> {
        let updater = Updater::new(self.sink.clone(), id);
        let fiber = self.fiber_mut(id)?;

        let (output, child_context) = match &fiber.kind {
            NodeKind::Component(component) => {
                // A ref passed to a component binds to the component itself.
                fiber.node_ref = fiber.input_children.iter().rev().find_map(|child| match child {
                    Child::Ref(cell) => Some(cell.clone()),
                    _ => None,
                });
                let hooks = fiber
                    .hooks
                    .get_or_insert_with(|| Arc::new(HookSlots::new()))
                    .clone();

                hooks.will_render();
                let rendered = panic::catch_unwind(AssertUnwindSafe(|| {
                    let mut scope = Scope::new(&hooks, context, &updater);
                    component.render(&mut scope, &fiber.input_children)
                }));
                let output = match rendered {
                    Ok(output) => {
                        hooks.did_render(component.name());
                        output
                    }
                    // The failed subtree renders nothing; siblings and ancestors still mount.
                    Err(payload) => {
                        error!(
                            component = component.name(),
                            panic = panic_message(payload.as_ref()),
                            "component panicked while rendering"
                        );
                        Child::Empty
                    }
                };
                (vec![output], context.clone())
            }
            NodeKind::Provider(provider) => {
                (fiber.input_children.clone(), provider.derive(context))
            }
            _ => (Vec::new(), context.clone()),
        };

        let mut ignored_ref = None;
        let children = classify_children(
            output,
            &fiber.kind,
            &mut fiber.attrs,
            &mut ignored_ref,
            &child_context,
        );
        Ok((children, child_context))
    }

    fn mount(
        &mut self,
        id: FiberId,
        previous: Option<Fiber>,
        children: Vec<VNode>,
        context: &Context,
        placement: &Anchor,
    ) -> RenderResult<()> {
        let Some(previous) = previous else {
            return self.mount_new(id, children, context, placement);
        };

        self.patch_attrs(id, &previous.attrs)?;
        let (container, tail) = self.child_container(id)?;
        let old_children = previous.children;
        let has_old = old_children.iter().any(Option::is_some);

        let next = match (has_old, children.is_empty()) {
            (true, false) => {
                self.patch_children(id, &container, old_children, children, context, &tail)?
            }
            (false, false) => self.add_children(id, children, context, &tail)?,
            (true, true) => {
                self.remove_children(&container, &old_children)?;
                Vec::new()
            }
            (false, true) => Vec::new(),
        };
        self.fiber_mut(id)?.children = next;
        Ok(())
    }

    fn mount_new(
        &mut self,
        id: FiberId,
        children: Vec<VNode>,
        context: &Context,
        placement: &Anchor,
    ) -> RenderResult<()> {
        enum Shell {
            Element(String),
            Portal,
            Nodeless,
        }

        let shell = {
            let fiber = self.fiber(id)?;
            match &fiber.kind {
                NodeKind::Element(tag) => Shell::Element(tag.clone()),
                _ if fiber.is_root => Shell::Portal,
                _ => Shell::Nodeless,
            }
        };

        let element = match shell {
            Shell::Element(tag) => {
                let handle = NodeHandle::pending();
                self.dispatch(Mutation::CreateElement {
                    handle: handle.clone(),
                    tag,
                })?;
                self.fiber_mut(id)?.node = Some(handle.clone());
                self.patch_attrs(id, &Attrs::new())?;
                Some(handle)
            }
            Shell::Portal => None,
            Shell::Nodeless => {
                let anchor = NodeHandle::pending();
                self.dispatch(Mutation::CreateTextNode {
                    handle: anchor.clone(),
                    text: String::new(),
                })?;
                self.fiber_mut(id)?.anchor = Some(anchor.clone());
                let container = self.parent_element(id)?;
                self.insert(&container, &anchor, placement, Placement::Insert)?;
                None
            }
        };

        let (_, tail) = self.child_container(id)?;
        let ids = self.add_children(id, children, context, &tail)?;
        self.fiber_mut(id)?.children = ids;

        // Elements are attached once their subtree is built.
        if let Some(handle) = element {
            let container = self.parent_element(id)?;
            self.insert(&container, &handle, placement, Placement::Insert)?;
        }
        Ok(())
    }

    /// Writes changed and new attributes, removes dropped ones.
    fn patch_attrs(&self, id: FiberId, previous: &Attrs) -> RenderResult<()> {
        let fiber = self.fiber(id)?;
        if !matches!(fiber.kind, NodeKind::Element(_)) {
            return Ok(());
        }
        let Some(node) = &fiber.node else {
            return Ok(());
        };

        for (key, value) in &fiber.attrs {
            if previous.get(key) != Some(value) {
                self.dispatch(Mutation::SetAttribute {
                    node: node.clone(),
                    key: key.clone(),
                    value: value.clone(),
                })?;
            }
        }
        for key in previous.keys() {
            if !fiber.attrs.contains_key(key) {
                self.dispatch(Mutation::RemoveAttribute {
                    node: node.clone(),
                    key: key.clone(),
                })?;
            }
        }
        Ok(())
    }

    /// Binds the ref and commits pending effects once the mutations queued
    /// so far have been applied.
    fn did_mount(&self, id: FiberId) -> RenderResult<()> {
        let fiber = self.fiber(id)?;
        let node_ref = fiber.node_ref.clone();
        let hooks = fiber.hooks.clone();
        if node_ref.is_none() && hooks.is_none() {
            return Ok(());
        }

        let target = match &fiber.kind {
            NodeKind::Component(component) => Some(RefTarget::Component(component.clone())),
            _ => fiber.node.clone().map(RefTarget::Element),
        };
        self.scheduler.dispatch(CommitOp::callback(move || {
            if let Some(node_ref) = node_ref {
                node_ref.set(target);
            }
            if let Some(hooks) = hooks {
                hooks.commit();
            }
        }))?;
        Ok(())
    }

    fn add_children(
        &mut self,
        parent: FiberId,
        children: Vec<VNode>,
        context: &Context,
        before: &Anchor,
    ) -> RenderResult<Vec<Option<FiberId>>> {
        children
            .into_iter()
            .map(|vnode| {
                self.patch(None, vnode, Some(parent), context, before)
                    .map(Some)
            })
            .collect()
    }

    fn remove_children(
        &mut self,
        container: &NodeHandle,
        children: &[Option<FiberId>],
    ) -> RenderResult<()> {
        for id in children.iter().flatten() {
            self.unmount(Some(container), *id)?;
        }
        Ok(())
    }

    /// Destroys a fiber and its subtree.
    ///
    /// `container` is the element the fiber's top-level nodes must be
    /// detached from, or `None` when an ancestor element is already being
    /// removed. Portal content is always detached from its target.
    fn unmount(&mut self, container: Option<&NodeHandle>, id: FiberId) -> RenderResult<()> {
        let fiber = self.fibers.remove(id).ok_or(RenderError::UnknownFiber(id))?;
        trace!(fiber = %id, kind = fiber.kind.describe(), "unmounting");

        let detach_from = if fiber.is_root {
            fiber.node.clone()
        } else if let Some(node) = &fiber.node {
            if let Some(container) = container {
                self.dispatch(Mutation::RemoveChild {
                    parent: container.clone(),
                    child: node.clone(),
                })?;
            }
            None
        } else {
            container.cloned()
        };

        if let (Some(anchor), Some(container)) = (&fiber.anchor, container) {
            self.dispatch(Mutation::RemoveChild {
                parent: container.clone(),
                child: anchor.clone(),
            })?;
        }

        let Fiber {
            children,
            hooks,
            node_ref,
            node,
            ..
        } = fiber;
        if hooks.is_some() || node_ref.is_some() {
            self.scheduler.dispatch(CommitOp::callback(move || {
                if let Some(node_ref) = node_ref {
                    release_ref(&node_ref, node.as_ref());
                }
                if let Some(hooks) = hooks {
                    hooks.destroy();
                }
            }))?;
        }

        for child in children.into_iter().flatten() {
            self.unmount(detach_from.as_ref(), child)?;
        }
        Ok(())
    }

    /// Nearest element above `id` that its nodes are inserted into.
    fn parent_element(&self, id: FiberId) -> RenderResult<NodeHandle> {
        let mut cursor = self.fiber(id)?.parent;
        while let Some(current) = cursor {
            let fiber = self.fiber(current)?;
            if let Some(node) = &fiber.node {
                return Ok(node.clone());
            }
            cursor = fiber.parent;
        }
        Err(RenderError::Detached(id))
    }

    /// Element that receives `id`'s children, and the position new children
    /// are appended at.
    fn child_container(&self, id: FiberId) -> RenderResult<(NodeHandle, Anchor)> {
        let fiber = self.fiber(id)?;
        if let Some(node) = &fiber.node {
            return Ok((node.clone(), Anchor::End));
        }
        let tail = fiber.anchor.clone().map_or(Anchor::End, Anchor::Before);
        Ok((self.parent_element(id)?, tail))
    }

    fn first_handle(&self, id: FiberId) -> RenderResult<Option<NodeHandle>> {
        let fiber = self.fiber(id)?;
        if fiber.is_root {
            return Ok(None);
        }
        if let Some(node) = &fiber.node {
            return Ok(Some(node.clone()));
        }
        for child in fiber.children.iter().flatten() {
            if let Some(handle) = self.first_handle(*child)? {
                return Ok(Some(handle));
            }
        }
        Ok(fiber.anchor.clone())
    }

    /// Top-level nodes of `id` in document order.
    fn collect_handles(&self, id: FiberId, out: &mut Vec<NodeHandle>) -> RenderResult<()> {
        let fiber = self.fiber(id)?;
        if fiber.is_root {
            return Ok(());
        }
        if let Some(node) = &fiber.node {
            out.push(node.clone());
            return Ok(());
        }
        for child in fiber.children.iter().flatten() {
            self.collect_handles(*child, out)?;
        }
        if let Some(anchor) = &fiber.anchor {
            out.push(anchor.clone());
        }
        Ok(())
    }

    /// Repositions every top-level node of `id` at `anchor`, keeping order.
    fn move_fiber(&self, container: &NodeHandle, id: FiberId, mut anchor: Anchor) -> RenderResult<()> {
        let mut handles = Vec::new();
        self.collect_handles(id, &mut handles)?;
        trace!(fiber = %id, nodes = handles.len(), "moving");

        for handle in handles {
            self.insert(container, &handle, &anchor, Placement::Move)?;
            if matches!(anchor, Anchor::After(_)) {
                anchor = Anchor::After(handle);
            }
        }
        Ok(())
    }
}

/// Clears `node_ref` unless it has been rebound to another owner.
fn release_ref(node_ref: &crate::hooks::ElementRef, node: Option<&NodeHandle>) {
    node_ref.with(|current| {
        let owned = match (current.as_ref(), node) {
            (Some(RefTarget::Element(bound)), Some(node)) => bound.ptr_eq(node),
            (Some(RefTarget::Component(_)), None) => true,
            _ => false,
        };
        if owned {
            *current = None;
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::children;
    use crate::hooks::{use_state, Setter};
    use crate::mutation::CommitStats;
    use crate::scheduler::{ImmediateFrames, SchedulerOptions, SharedDocument};
    use crate::vnode::{component, element, fragment, key, text};
    use std::sync::Mutex;
    use trellis_dom::{Document, MemoryDocument};

    struct NoSink;

    impl UpdateSink for NoSink {
        fn request_update(&self, _fiber: FiberId) {}
    }

    struct Harness {
        doc: Arc<Mutex<MemoryDocument>>,
        body: NodeId,
        scheduler: CommitScheduler,
        reconciler: Reconciler,
        _sink: Arc<NoSink>,
    }

    impl Harness {
        fn new() -> Self {
            let mut doc = MemoryDocument::new();
            let body = doc.create_element("body");
            let doc = Arc::new(Mutex::new(doc));
            let shared: SharedDocument = doc.clone();
            let scheduler =
                CommitScheduler::new(shared, Arc::new(ImmediateFrames), SchedulerOptions::default());
            let sink = Arc::new(NoSink);
            let weak: Weak<dyn UpdateSink> = Arc::downgrade(&sink) as Weak<dyn UpdateSink>;
            let reconciler = Reconciler::new(body, Context::new(), scheduler.clone(), weak);
            Self {
                doc,
                body,
                scheduler,
                reconciler,
                _sink: sink,
            }
        }

        fn render(&mut self, vnode: VNode) -> CommitStats {
            self.scheduler.reset_stats();
            self.reconciler.render(vnode).unwrap();
            self.scheduler.force_commit().unwrap();
            self.scheduler.stats()
        }

        fn html(&self) -> String {
            self.doc.lock().unwrap().to_html(self.body).unwrap()
        }

        fn root_child(&self) -> FiberId {
            let root = self.reconciler.fiber(self.reconciler.root).unwrap();
            root.children[0].unwrap()
        }
    }

    fn list(keys: &[&str]) -> VNode {
        element(
            "ul",
            keys.iter()
                .map(|k| element("li", children![key(*k), *k]).into())
                .collect::<Vec<Child>>(),
        )
    }

    #[test]
    fn test_in_place_patch_keeps_fiber_and_element() {
        let mut harness = Harness::new();
        harness.render(element("div", children![text("a")]));
        let id = harness.root_child();
        let node = harness.reconciler.fiber(id).unwrap().node.clone();

        harness.render(element("div", children![text("b")]));
        assert_eq!(harness.root_child(), id);
        assert_eq!(harness.reconciler.fiber(id).unwrap().node, node);
        assert_eq!(harness.html(), "<body><div>b</div></body>");
    }

    #[test]
    fn test_hook_slots_survive_rerender() {
        fn counter(scope: &mut Scope<'_>, _: &[Child]) -> Child {
            let (count, _): (i64, Setter<i64>) = use_state(scope, 0);
            count.into()
        }

        let mut harness = Harness::new();
        harness.render(component(counter, []));
        let id = harness.root_child();
        let hooks = harness.reconciler.fiber(id).unwrap().hooks.clone().unwrap();

        harness.render(component(counter, []));
        let again = harness.reconciler.fiber(id).unwrap().hooks.clone().unwrap();
        assert!(Arc::ptr_eq(&hooks, &again));
    }

    #[test]
    fn test_unmount_frees_fibers() {
        let mut harness = Harness::new();
        harness.render(list(&["a", "b", "c"]));
        // root + ul + 3 li + 3 text
        assert_eq!(harness.reconciler.len(), 8);

        harness.render(list(&["a"]));
        assert_eq!(harness.reconciler.len(), 4);
        assert_eq!(harness.html(), "<body><ul><li>a</li></ul></body>");
    }

    #[test]
    fn test_fragment_anchor_keeps_order() {
        let mut harness = Harness::new();
        harness.render(element(
            "div",
            children![fragment(children!["a", "b"]), "c"],
        ));
        assert_eq!(harness.html(), "<body><div>abc</div></body>");

        let stats = harness.render(element(
            "div",
            children![fragment(children!["a", "b", "x"]), "c"],
        ));
        assert_eq!(harness.html(), "<body><div>abxc</div></body>");
        assert_eq!(stats.inserted, 1);
        assert_eq!(stats.moved, 0);
    }

    #[test]
    fn test_unmount_all() {
        let mut harness = Harness::new();
        harness.render(list(&["a", "b"]));
        harness.reconciler.unmount_all().unwrap();
        harness.scheduler.force_commit().unwrap();
        assert_eq!(harness.html(), "<body></body>");
        assert_eq!(harness.reconciler.len(), 1);
    }
}
