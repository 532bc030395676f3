use crate::error::DomResult;
use crate::event::{EventListener, ListenerId};
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Handle to a node owned by a [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    Element,
    Text,
}

/// The mutable tree the reconciler commits to.
///
/// Structural operations follow DOM semantics: inserting a node that is
/// already a child of `parent` moves it, `reference == None` appends.
/// Attaching a node that belongs to a different parent is an error; callers
/// detach it first.
pub trait Document: Send {
    fn create_element(&mut self, tag: &str) -> NodeId;

    fn create_text_node(&mut self, text: &str) -> NodeId;

    fn node_type(&self, node: NodeId) -> DomResult<NodeType>;

    /// Tag name for elements, `#text` for text nodes.
    fn node_name(&self, node: NodeId) -> DomResult<String>;

    fn insert_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        reference: Option<NodeId>,
    ) -> DomResult<()>;

    fn append_child(&mut self, parent: NodeId, child: NodeId) -> DomResult<()> {
        self.insert_before(parent, child, None)
    }

    fn remove_child(&mut self, parent: NodeId, child: NodeId) -> DomResult<()>;

    fn set_attribute(&mut self, node: NodeId, key: &str, value: Value) -> DomResult<()>;

    fn get_attribute(&self, node: NodeId, key: &str) -> DomResult<Option<Value>>;

    /// Attribute names in sorted order.
    fn attribute_names(&self, node: NodeId) -> DomResult<Vec<String>>;

    fn remove_attribute(&mut self, node: NodeId, key: &str) -> DomResult<()>;

    fn text_content(&self, node: NodeId) -> DomResult<String>;

    /// Replaces the text of a text node, or all children of an element.
    fn set_text_content(&mut self, node: NodeId, text: &str) -> DomResult<()>;

    fn parent_node(&self, node: NodeId) -> DomResult<Option<NodeId>>;

    fn first_child(&self, node: NodeId) -> DomResult<Option<NodeId>>;

    fn next_sibling(&self, node: NodeId) -> DomResult<Option<NodeId>>;

    fn child_nodes(&self, node: NodeId) -> DomResult<Vec<NodeId>> {
        let mut children = Vec::new();
        let mut cursor = self.first_child(node)?;
        while let Some(child) = cursor {
            children.push(child);
            cursor = self.next_sibling(child)?;
        }
        Ok(children)
    }

    fn add_event_listener(
        &mut self,
        node: NodeId,
        event: &str,
        listener: EventListener,
    ) -> DomResult<ListenerId>;

    fn remove_event_listener(&mut self, node: NodeId, listener: ListenerId) -> DomResult<()>;

    /// Listeners registered on `node` for `event`, in registration order.
    fn event_listeners(&self, node: NodeId, event: &str) -> DomResult<Vec<EventListener>>;
}
