//! In-memory [`Document`] backed by an append-only node table.

use crate::document::{Document, NodeId, NodeType};
use crate::error::{DomError, DomResult};
use crate::event::{EventListener, ListenerId};
use crate::html::render_to_html;
use crate::value::Value;
use std::collections::BTreeMap;
use std::fmt;

enum NodeData {
    Element {
        tag: String,
        attributes: BTreeMap<String, Value>,
    },
    Text(String),
}

struct Node {
    data: NodeData,
    parent: Option<NodeId>,
    first_child: Option<NodeId>,
    last_child: Option<NodeId>,
    prev_sibling: Option<NodeId>,
    next_sibling: Option<NodeId>,
    listeners: Vec<(ListenerId, String, EventListener)>,
}

impl Node {
    fn new(data: NodeData) -> Self {
        Self {
            data,
            parent: None,
            first_child: None,
            last_child: None,
            prev_sibling: None,
            next_sibling: None,
            listeners: Vec::new(),
        }
    }
}

/// Document whose nodes live in a vector indexed by [`NodeId`].
///
/// Ids are never reused; removed nodes stay addressable as detached nodes.
#[derive(Default)]
pub struct MemoryDocument {
    nodes: Vec<Node>,
    next_listener: u64,
}

impl fmt::Debug for MemoryDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryDocument")
            .field("nodes", &self.nodes.len())
            .finish()
    }
}

impl MemoryDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Serializes `node` and its subtree as HTML.
    pub fn to_html(&self, node: NodeId) -> DomResult<String> {
        render_to_html(self, node)
    }

    fn push(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len() as u64);
        self.nodes.push(Node::new(data));
        id
    }

    fn node(&self, id: NodeId) -> DomResult<&Node> {
        self.nodes
            .get(id.0 as usize)
            .ok_or(DomError::UnknownNode(id))
    }

    fn node_mut(&mut self, id: NodeId) -> DomResult<&mut Node> {
        self.nodes
            .get_mut(id.0 as usize)
            .ok_or(DomError::UnknownNode(id))
    }

    fn element(&self, id: NodeId) -> DomResult<&BTreeMap<String, Value>> {
        match &self.node(id)?.data {
            NodeData::Element { attributes, .. } => Ok(attributes),
            NodeData::Text(_) => Err(DomError::NotAnElement(id)),
        }
    }

    fn element_mut(&mut self, id: NodeId) -> DomResult<&mut BTreeMap<String, Value>> {
        match &mut self.node_mut(id)?.data {
            NodeData::Element { attributes, .. } => Ok(attributes),
            NodeData::Text(_) => Err(DomError::NotAnElement(id)),
        }
    }

    fn is_inclusive_ancestor(&self, ancestor: NodeId, node: NodeId) -> DomResult<bool> {
        let mut cursor = Some(node);
        while let Some(current) = cursor {
            if current == ancestor {
                return Ok(true);
            }
            cursor = self.node(current)?.parent;
        }
        Ok(false)
    }

    fn unlink(&mut self, child: NodeId) -> DomResult<()> {
        let (parent, prev, next) = {
            let node = self.node(child)?;
            (node.parent, node.prev_sibling, node.next_sibling)
        };
        let Some(parent) = parent else {
            return Ok(());
        };

        match prev {
            Some(prev) => self.node_mut(prev)?.next_sibling = next,
            None => self.node_mut(parent)?.first_child = next,
        }
        match next {
            Some(next) => self.node_mut(next)?.prev_sibling = prev,
            None => self.node_mut(parent)?.last_child = prev,
        }

        let node = self.node_mut(child)?;
        node.parent = None;
        node.prev_sibling = None;
        node.next_sibling = None;
        Ok(())
    }

    fn link_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        reference: Option<NodeId>,
    ) -> DomResult<()> {
        let prev = match reference {
            Some(reference) => self.node(reference)?.prev_sibling,
            None => self.node(parent)?.last_child,
        };

        {
            let node = self.node_mut(child)?;
            node.parent = Some(parent);
            node.prev_sibling = prev;
            node.next_sibling = reference;
        }
        match prev {
            Some(prev) => self.node_mut(prev)?.next_sibling = Some(child),
            None => self.node_mut(parent)?.first_child = Some(child),
        }
        match reference {
            Some(reference) => self.node_mut(reference)?.prev_sibling = Some(child),
            None => self.node_mut(parent)?.last_child = Some(child),
        }
        Ok(())
    }

    fn collect_text(&self, node: NodeId, out: &mut String) -> DomResult<()> {
        match &self.node(node)?.data {
            NodeData::Text(text) => out.push_str(text),
            NodeData::Element { .. } => {
                let mut cursor = self.node(node)?.first_child;
                while let Some(child) = cursor {
                    self.collect_text(child, out)?;
                    cursor = self.node(child)?.next_sibling;
                }
            }
        }
        Ok(())
    }
}

impl Document for MemoryDocument {
    fn create_element(&mut self, tag: &str) -> NodeId {
        self.push(NodeData::Element {
            tag: tag.to_string(),
            attributes: BTreeMap::new(),
        })
    }

    fn create_text_node(&mut self, text: &str) -> NodeId {
        self.push(NodeData::Text(text.to_string()))
    }

    fn node_type(&self, node: NodeId) -> DomResult<NodeType> {
        Ok(match self.node(node)?.data {
            NodeData::Element { .. } => NodeType::Element,
            NodeData::Text(_) => NodeType::Text,
        })
    }

    fn node_name(&self, node: NodeId) -> DomResult<String> {
        Ok(match &self.node(node)?.data {
            NodeData::Element { tag, .. } => tag.clone(),
            NodeData::Text(_) => "#text".to_string(),
        })
    }

    fn insert_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        reference: Option<NodeId>,
    ) -> DomResult<()> {
        self.element(parent)?;
        let current_parent = self.node(child)?.parent;

        if let Some(reference) = reference {
            if self.node(reference)?.parent != Some(parent) {
                return Err(DomError::NotAChild {
                    parent,
                    child: reference,
                });
            }
            // Inserting a node before itself leaves it in place.
            if reference == child {
                return Ok(());
            }
        }

        if self.is_inclusive_ancestor(child, parent)? {
            return Err(DomError::HierarchyRequest { parent, child });
        }

        match current_parent {
            Some(owner) if owner != parent => {
                return Err(DomError::AlreadyAttached {
                    child,
                    parent: owner,
                })
            }
            Some(_) => self.unlink(child)?,
            None => {}
        }

        self.link_before(parent, child, reference)
    }

    fn remove_child(&mut self, parent: NodeId, child: NodeId) -> DomResult<()> {
        if self.node(child)?.parent != Some(parent) {
            return Err(DomError::NotAChild { parent, child });
        }
        self.unlink(child)
    }

    fn set_attribute(&mut self, node: NodeId, key: &str, value: Value) -> DomResult<()> {
        self.element_mut(node)?.insert(key.to_string(), value);
        Ok(())
    }

    fn get_attribute(&self, node: NodeId, key: &str) -> DomResult<Option<Value>> {
        Ok(self.element(node)?.get(key).cloned())
    }

    fn attribute_names(&self, node: NodeId) -> DomResult<Vec<String>> {
        Ok(self.element(node)?.keys().cloned().collect())
    }

    fn remove_attribute(&mut self, node: NodeId, key: &str) -> DomResult<()> {
        self.element_mut(node)?.remove(key);
        Ok(())
    }

    fn text_content(&self, node: NodeId) -> DomResult<String> {
        let mut out = String::new();
        self.collect_text(node, &mut out)?;
        Ok(out)
    }

    fn set_text_content(&mut self, node: NodeId, text: &str) -> DomResult<()> {
        if let NodeData::Text(data) = &mut self.node_mut(node)?.data {
            *data = text.to_string();
            return Ok(());
        }

        while let Some(child) = self.node(node)?.first_child {
            self.unlink(child)?;
        }
        if !text.is_empty() {
            let child = self.create_text_node(text);
            self.link_before(node, child, None)?;
        }
        Ok(())
    }

    fn parent_node(&self, node: NodeId) -> DomResult<Option<NodeId>> {
        Ok(self.node(node)?.parent)
    }

    fn first_child(&self, node: NodeId) -> DomResult<Option<NodeId>> {
        Ok(self.node(node)?.first_child)
    }

    fn next_sibling(&self, node: NodeId) -> DomResult<Option<NodeId>> {
        Ok(self.node(node)?.next_sibling)
    }

    fn add_event_listener(
        &mut self,
        node: NodeId,
        event: &str,
        listener: EventListener,
    ) -> DomResult<ListenerId> {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        self.node_mut(node)?
            .listeners
            .push((id, event.to_string(), listener));
        Ok(id)
    }

    fn remove_event_listener(&mut self, node: NodeId, listener: ListenerId) -> DomResult<()> {
        let listeners = &mut self.node_mut(node)?.listeners;
        let before = listeners.len();
        listeners.retain(|(id, _, _)| *id != listener);
        if listeners.len() == before {
            return Err(DomError::UnknownListener(listener));
        }
        Ok(())
    }

    fn event_listeners(&self, node: NodeId, event: &str) -> DomResult<Vec<EventListener>> {
        Ok(self
            .node(node)?
            .listeners
            .iter()
            .filter(|(_, name, _)| name == event)
            .map(|(_, _, listener)| listener.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{dispatch_event, Event};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_append_and_traverse() {
        let mut doc = MemoryDocument::new();
        let body = doc.create_element("body");
        let a = doc.create_element("a");
        let b = doc.create_text_node("b");
        doc.append_child(body, a).unwrap();
        doc.append_child(body, b).unwrap();

        assert_eq!(doc.first_child(body).unwrap(), Some(a));
        assert_eq!(doc.next_sibling(a).unwrap(), Some(b));
        assert_eq!(doc.next_sibling(b).unwrap(), None);
        assert_eq!(doc.parent_node(b).unwrap(), Some(body));
        assert_eq!(doc.node_name(b).unwrap(), "#text");
        assert_eq!(doc.to_html(body).unwrap(), "<body><a></a>b</body>");
    }

    #[test]
    fn test_insert_before_moves_within_parent() {
        let mut doc = MemoryDocument::new();
        let ul = doc.create_element("ul");
        let items: Vec<_> = ["1", "2", "3"]
            .iter()
            .map(|text| {
                let li = doc.create_element("li");
                doc.set_text_content(li, text).unwrap();
                doc.append_child(ul, li).unwrap();
                li
            })
            .collect();

        doc.insert_before(ul, items[2], Some(items[0])).unwrap();
        assert_eq!(doc.child_nodes(ul).unwrap(), vec![items[2], items[0], items[1]]);

        doc.insert_before(ul, items[2], None).unwrap();
        assert_eq!(doc.child_nodes(ul).unwrap(), vec![items[0], items[1], items[2]]);

        doc.insert_before(ul, items[1], Some(items[1])).unwrap();
        assert_eq!(doc.child_nodes(ul).unwrap(), vec![items[0], items[1], items[2]]);
    }

    #[test]
    fn test_invariant_violations() {
        let mut doc = MemoryDocument::new();
        let a = doc.create_element("a");
        let b = doc.create_element("b");
        let child = doc.create_element("i");
        let text = doc.create_text_node("t");
        doc.append_child(a, child).unwrap();

        assert_eq!(
            doc.append_child(b, child),
            Err(DomError::AlreadyAttached { child, parent: a })
        );
        assert_eq!(
            doc.remove_child(b, child),
            Err(DomError::NotAChild { parent: b, child })
        );
        assert_eq!(
            doc.append_child(child, a),
            Err(DomError::HierarchyRequest { parent: child, child: a })
        );
        assert_eq!(doc.append_child(text, b), Err(DomError::NotAnElement(text)));
        assert_eq!(
            doc.insert_before(a, b, Some(text)),
            Err(DomError::NotAChild { parent: a, child: text })
        );
    }

    #[test]
    fn test_remove_child_detaches() {
        let mut doc = MemoryDocument::new();
        let a = doc.create_element("a");
        let b = doc.create_element("b");
        doc.append_child(a, b).unwrap();
        doc.remove_child(a, b).unwrap();

        assert_eq!(doc.first_child(a).unwrap(), None);
        assert_eq!(doc.parent_node(b).unwrap(), None);
        // Detached nodes can be attached elsewhere.
        let c = doc.create_element("c");
        doc.append_child(c, b).unwrap();
        assert_eq!(doc.to_html(c).unwrap(), "<c><b></b></c>");
    }

    #[test]
    fn test_attributes_and_text_content() {
        let mut doc = MemoryDocument::new();
        let div = doc.create_element("div");
        doc.set_attribute(div, "role", "value".into()).unwrap();
        doc.set_attribute(div, "id", "x".into()).unwrap();
        assert_eq!(doc.attribute_names(div).unwrap(), vec!["id", "role"]);

        doc.remove_attribute(div, "id").unwrap();
        assert_eq!(doc.get_attribute(div, "id").unwrap(), None);

        let span = doc.create_element("span");
        doc.append_child(div, span).unwrap();
        doc.set_text_content(div, "hello").unwrap();
        assert_eq!(doc.text_content(div).unwrap(), "hello");
        assert_eq!(doc.parent_node(span).unwrap(), None);
    }

    #[test]
    fn test_event_listeners() {
        let mut doc = MemoryDocument::new();
        let button = doc.create_element("button");
        let clicks = Arc::new(AtomicUsize::new(0));
        let counter = clicks.clone();
        let id = doc
            .add_event_listener(
                button,
                "click",
                Arc::new(move |_: &Event| {
                    counter.fetch_add(1, Ordering::SeqCst);
                }),
            )
            .unwrap();

        let doc = Mutex::new(doc);
        let event = Event::new("click", button);
        assert_eq!(dispatch_event(&doc, &event).unwrap(), 1);
        assert_eq!(dispatch_event(&doc, &Event::new("focus", button)).unwrap(), 0);
        assert_eq!(clicks.load(Ordering::SeqCst), 1);

        doc.lock().unwrap().remove_event_listener(button, id).unwrap();
        assert_eq!(dispatch_event(&doc, &event).unwrap(), 0);
        assert_eq!(
            doc.lock().unwrap().remove_event_listener(button, id),
            Err(DomError::UnknownListener(id))
        );
    }
}
