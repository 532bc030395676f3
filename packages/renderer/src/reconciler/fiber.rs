use crate::arena::FiberId;
use crate::attrs::Attrs;
use crate::context::Context;
use crate::handle::NodeHandle;
use crate::hooks::{ElementRef, HookSlots};
use crate::vnode::{Child, Key, NodeKind, VNode};
use std::sync::Arc;
use tracing::warn;
use trellis_dom::Value;

/// Committed record of one mounted node.
pub(crate) struct Fiber {
    pub kind: NodeKind,
    pub key: Key,
    pub attrs: Attrs,
    pub node_ref: Option<ElementRef>,
    /// Kept for components and providers, which re-render from them.
    pub input_children: Vec<Child>,
    pub children: Vec<Option<FiberId>>,
    pub parent: Option<FiberId>,
    /// Owned element or text node; the target element for portals.
    pub node: Option<NodeHandle>,
    /// End anchor of a nodeless fiber.
    pub anchor: Option<NodeHandle>,
    pub is_root: bool,
    pub hooks: Option<Arc<HookSlots>>,
    pub context: Context,
}

impl Fiber {
    pub fn new(vnode: VNode, parent: Option<FiberId>, context: Context) -> Self {
        Self {
            kind: vnode.kind,
            key: vnode.key,
            attrs: Attrs::new(),
            node_ref: None,
            input_children: vnode.input_children,
            children: Vec::new(),
            parent,
            node: vnode.target,
            anchor: None,
            is_root: vnode.is_root,
            hooks: None,
            context,
        }
    }

    /// Identity rule: same type, same key, and for portals the same target.
    pub fn matches(&self, vnode: &VNode) -> bool {
        self.key == vnode.key
            && self.kind.same_type(&vnode.kind)
            && self.is_root == vnode.is_root
            && (!self.is_root
                || self.node.as_ref().and_then(NodeHandle::get)
                    == vnode.target.as_ref().and_then(NodeHandle::get))
    }

    /// Description that re-renders this fiber in place.
    pub fn to_vnode(&self) -> VNode {
        VNode {
            kind: self.kind.clone(),
            key: self.key.clone(),
            input_children: self.input_children.clone(),
            is_root: self.is_root,
            target: if self.is_root { self.node.clone() } else { None },
        }
    }
}

/// Splits authored children into child nodes, attributes and a ref.
pub(crate) fn classify_children(
    children: impl IntoIterator<Item = Child>,
    owner: &NodeKind,
    attrs: &mut Attrs,
    node_ref: &mut Option<ElementRef>,
    context: &Context,
) -> Vec<VNode> {
    let mut nodes = Vec::new();
    for child in children {
        match child {
            Child::Node(vnode) => nodes.push(vnode),
            Child::Attrs(values) => attrs.extend(values),
            Child::Source(source) => attrs.extend(source.resolve(context)),
            Child::Ref(cell) => *node_ref = Some(cell),
            Child::Key(_) | Child::Empty | Child::Value(Value::Null) => {}
            Child::Value(Value::String(text)) => nodes.push(VNode::text(text)),
            Child::Value(Value::Int(n)) => nodes.push(VNode::text(n.to_string())),
            Child::Value(Value::Float(n)) => nodes.push(VNode::text(n.to_string())),
            Child::Value(other) => {
                warn!(parent = owner.describe(), child = ?other, "unsupported child skipped");
            }
        }
    }
    nodes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attrs::{attr, Style};
    use crate::hooks::Ref;
    use crate::vnode::{element, key, portal};
    use trellis_dom::NodeId;

    #[test]
    fn test_classify_children() {
        let node_ref: ElementRef = Ref::new(None);
        let children = crate::children![
            attr("role", "value"),
            Style::new().set("color", "red"),
            node_ref.clone(),
            element("span", []),
            Value::from("text"),
            Value::from(2),
            Value::Bool(true),
            Value::Null,
        ];

        let mut attrs = Attrs::new();
        let mut captured = None;
        let nodes = classify_children(
            children,
            &NodeKind::Element("div".into()),
            &mut attrs,
            &mut captured,
            &Context::new(),
        );

        assert_eq!(nodes.len(), 3);
        assert_eq!(attrs.len(), 2);
        assert_eq!(attrs["style"], Value::from("color:red;"));
        assert!(captured.is_some_and(|cell| cell.ptr_eq(&node_ref)));
    }

    #[test]
    fn test_matches_identity() {
        let fiber = Fiber::new(element("li", crate::children![key("a")]), None, Context::new());
        assert!(fiber.matches(&element("li", crate::children![key("a")])));
        assert!(!fiber.matches(&element("li", crate::children![key("b")])));
        assert!(!fiber.matches(&element("p", crate::children![key("a")])));

        let portal_fiber = Fiber::new(portal(NodeId(1), []), None, Context::new());
        assert!(portal_fiber.matches(&portal(NodeId(1), [])));
        assert!(!portal_fiber.matches(&portal(NodeId(2), [])));
        assert!(!portal_fiber.matches(&crate::vnode::fragment([])));
    }
}
