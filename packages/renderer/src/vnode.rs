//! Virtual nodes: the per-render description of a tree.

use crate::attrs::{AttrSource, Attrs, Style};
use crate::context::Context;
use crate::handle::NodeHandle;
use crate::hooks::ElementRef;
use crate::scope::Scope;
use std::any::TypeId;
use std::fmt;
use std::sync::Arc;
use trellis_dom::{NodeId, Value};

/// Stable identity among siblings. Empty means unkeyed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Key(String);

impl Key {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A render function with persistent per-instance hook state.
///
/// Instances are identified by the implementing type, so two components
/// with the same type and key share state across renders while their field
/// values (props) may change.
pub trait Component: Send + Sync + 'static {
    fn render(&self, scope: &mut Scope<'_>, children: &[Child]) -> Child;
}

impl<F> Component for F
where
    F: Fn(&mut Scope<'_>, &[Child]) -> Child + Send + Sync + 'static,
{
    fn render(&self, scope: &mut Scope<'_>, children: &[Child]) -> Child {
        self(scope, children)
    }
}

#[derive(Clone)]
pub struct ComponentType {
    id: TypeId,
    name: &'static str,
    component: Arc<dyn Component>,
}

impl ComponentType {
    pub fn of<C: Component>(component: C) -> Self {
        Self {
            id: TypeId::of::<C>(),
            name: std::any::type_name::<C>(),
            component: Arc::new(component),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn same_type(&self, other: &ComponentType) -> bool {
        self.id == other.id
    }

    pub(crate) fn render(&self, scope: &mut Scope<'_>, children: &[Child]) -> Child {
        self.component.render(scope, children)
    }
}

impl fmt::Debug for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Component({})", self.name)
    }
}

/// Derives the context seen by a provider's descendants.
#[derive(Clone)]
pub struct Provider(Arc<dyn Fn(&Context) -> Context + Send + Sync>);

impl Provider {
    pub fn new(derive: impl Fn(&Context) -> Context + Send + Sync + 'static) -> Self {
        Self(Arc::new(derive))
    }

    pub(crate) fn derive(&self, context: &Context) -> Context {
        (self.0)(context)
    }
}

impl fmt::Debug for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Provider")
    }
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    Text(String),
    Element(String),
    Fragment,
    Component(ComponentType),
    Provider(Provider),
}

impl NodeKind {
    /// Type half of the identity rule; keys are compared separately.
    pub fn same_type(&self, other: &NodeKind) -> bool {
        match (self, other) {
            (NodeKind::Text(_), NodeKind::Text(_))
            | (NodeKind::Fragment, NodeKind::Fragment)
            | (NodeKind::Provider(_), NodeKind::Provider(_)) => true,
            (NodeKind::Element(a), NodeKind::Element(b)) => a == b,
            (NodeKind::Component(a), NodeKind::Component(b)) => a.same_type(b),
            _ => false,
        }
    }

    /// Short label for logs.
    pub fn describe(&self) -> &str {
        match self {
            NodeKind::Text(_) => "#text",
            NodeKind::Element(tag) => tag.as_str(),
            NodeKind::Fragment => "#fragment",
            NodeKind::Component(component) => component.name(),
            NodeKind::Provider(_) => "#provider",
        }
    }
}

/// One authored child, classified when its parent is walked.
#[derive(Clone)]
pub enum Child {
    Node(VNode),
    Attrs(Attrs),
    Source(Arc<dyn AttrSource>),
    Key(Key),
    Ref(ElementRef),
    /// Loose value: strings and numbers become text, anything else is skipped.
    Value(Value),
    Empty,
}

impl fmt::Debug for Child {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Child::Node(vnode) => vnode.fmt(f),
            Child::Attrs(attrs) => f.debug_tuple("Attrs").field(attrs).finish(),
            Child::Source(_) => write!(f, "Source"),
            Child::Key(key) => write!(f, "Key({})", key),
            Child::Ref(_) => write!(f, "Ref"),
            Child::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Child::Empty => write!(f, "Empty"),
        }
    }
}

impl Child {
    pub fn as_node(&self) -> Option<&VNode> {
        match self {
            Child::Node(vnode) => Some(vnode),
            _ => None,
        }
    }
}

impl From<VNode> for Child {
    fn from(vnode: VNode) -> Self {
        Child::Node(vnode)
    }
}

impl From<&str> for Child {
    fn from(text: &str) -> Self {
        Child::Node(VNode::text(text))
    }
}

impl From<String> for Child {
    fn from(text: String) -> Self {
        Child::Node(VNode::text(text))
    }
}

impl From<&String> for Child {
    fn from(text: &String) -> Self {
        Child::Node(VNode::text(text.as_str()))
    }
}

impl From<i32> for Child {
    fn from(n: i32) -> Self {
        Child::Node(VNode::text(n.to_string()))
    }
}

impl From<i64> for Child {
    fn from(n: i64) -> Self {
        Child::Node(VNode::text(n.to_string()))
    }
}

impl From<usize> for Child {
    fn from(n: usize) -> Self {
        Child::Node(VNode::text(n.to_string()))
    }
}

impl From<f64> for Child {
    fn from(n: f64) -> Self {
        Child::Node(VNode::text(n.to_string()))
    }
}

impl From<Value> for Child {
    fn from(value: Value) -> Self {
        Child::Value(value)
    }
}

impl From<Attrs> for Child {
    fn from(attrs: Attrs) -> Self {
        Child::Attrs(attrs)
    }
}

impl From<Style> for Child {
    fn from(style: Style) -> Self {
        Child::Source(Arc::new(style))
    }
}

impl From<Key> for Child {
    fn from(key: Key) -> Self {
        Child::Key(key)
    }
}

impl From<ElementRef> for Child {
    fn from(node_ref: ElementRef) -> Self {
        Child::Ref(node_ref)
    }
}

impl From<Vec<Child>> for Child {
    fn from(children: Vec<Child>) -> Self {
        Child::Node(VNode::fragment(children))
    }
}

impl From<Vec<VNode>> for Child {
    fn from(children: Vec<VNode>) -> Self {
        Child::Node(VNode::fragment(children.into_iter().map(Child::Node)))
    }
}

impl<T: Into<Child>> From<Option<T>> for Child {
    fn from(child: Option<T>) -> Self {
        child.map(Into::into).unwrap_or(Child::Empty)
    }
}

impl From<()> for Child {
    fn from(_: ()) -> Self {
        Child::Empty
    }
}

/// Immutable description of one node for one render.
#[derive(Debug, Clone)]
pub struct VNode {
    pub(crate) kind: NodeKind,
    pub(crate) key: Key,
    pub(crate) input_children: Vec<Child>,
    pub(crate) is_root: bool,
    pub(crate) target: Option<NodeHandle>,
}

impl VNode {
    /// Builds a node; `Child::Key` entries set the key and are dropped.
    pub fn new(kind: NodeKind, children: impl IntoIterator<Item = Child>) -> Self {
        let mut key = Key::default();
        let input_children = children
            .into_iter()
            .filter_map(|child| match child {
                Child::Key(k) => {
                    key = k;
                    None
                }
                Child::Empty => None,
                child => Some(child),
            })
            .collect();

        Self {
            kind,
            key,
            input_children,
            is_root: false,
            target: None,
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::new(NodeKind::Text(text.into()), [])
    }

    pub fn element(tag: impl Into<String>, children: impl IntoIterator<Item = Child>) -> Self {
        Self::new(NodeKind::Element(tag.into()), children)
    }

    pub fn fragment(children: impl IntoIterator<Item = Child>) -> Self {
        Self::new(NodeKind::Fragment, children)
    }

    pub fn component<C: Component>(component: C, children: impl IntoIterator<Item = Child>) -> Self {
        Self::new(NodeKind::Component(ComponentType::of(component)), children)
    }

    pub fn provider(
        derive: impl Fn(&Context) -> Context + Send + Sync + 'static,
        children: impl IntoIterator<Item = Child>,
    ) -> Self {
        Self::new(NodeKind::Provider(Provider::new(derive)), children)
    }

    /// Fragment rendered into `target` instead of its logical parent.
    pub fn portal(target: NodeId, children: impl IntoIterator<Item = Child>) -> Self {
        let mut vnode = Self::fragment(children);
        vnode.is_root = true;
        vnode.target = Some(NodeHandle::resolved(target));
        vnode
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Key::new(key);
        self
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn key(&self) -> &Key {
        &self.key
    }

    pub fn children(&self) -> &[Child] {
        &self.input_children
    }

    pub fn is_root(&self) -> bool {
        self.is_root
    }
}

pub fn text(text: impl Into<String>) -> VNode {
    VNode::text(text)
}

pub fn element(tag: impl Into<String>, children: impl IntoIterator<Item = Child>) -> VNode {
    VNode::element(tag, children)
}

pub fn fragment(children: impl IntoIterator<Item = Child>) -> VNode {
    VNode::fragment(children)
}

pub fn component<C: Component>(component: C, children: impl IntoIterator<Item = Child>) -> VNode {
    VNode::component(component, children)
}

pub fn provider(
    derive: impl Fn(&Context) -> Context + Send + Sync + 'static,
    children: impl IntoIterator<Item = Child>,
) -> VNode {
    VNode::provider(derive, children)
}

pub fn portal(target: NodeId, children: impl IntoIterator<Item = Child>) -> VNode {
    VNode::portal(target, children)
}

pub fn key(key: impl Into<String>) -> Child {
    Child::Key(Key::new(key))
}

/// Builds a `Vec<Child>` from heterogeneous child expressions.
#[macro_export]
macro_rules! children {
    () => {
        ::std::vec::Vec::<$crate::Child>::new()
    };
    ($($child:expr),+ $(,)?) => {
        ::std::vec![$($crate::Child::from($child)),+]
    };
}

/// Builds a dependency list for effect and memo hooks.
#[macro_export]
macro_rules! deps {
    () => {
        Some(::std::vec::Vec::<$crate::Value>::new())
    };
    ($($dep:expr),+ $(,)?) => {
        Some(::std::vec![$($crate::Value::from($dep)),+])
    };
}
