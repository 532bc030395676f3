//! Deferred element handles and insert positions.
//!
//! Render passes run before their mutations commit, so the reconciler refers
//! to elements through [`NodeHandle`]s that the create operation resolves
//! when it is applied.

use crate::error::CommitError;
use std::fmt;
use std::sync::{Arc, OnceLock};
use trellis_dom::{Document, NodeId};

#[derive(Clone)]
pub struct NodeHandle(Arc<OnceLock<NodeId>>);

impl NodeHandle {
    pub fn pending() -> Self {
        Self(Arc::new(OnceLock::new()))
    }

    pub fn resolved(id: NodeId) -> Self {
        let cell = OnceLock::new();
        let _ = cell.set(id);
        Self(Arc::new(cell))
    }

    /// The document node, once its create operation has committed.
    pub fn get(&self) -> Option<NodeId> {
        self.0.get().copied()
    }

    pub fn id(&self) -> Result<NodeId, CommitError> {
        self.get().ok_or(CommitError::UnresolvedHandle)
    }

    /// Returns false when the handle was already resolved.
    pub(crate) fn resolve(&self, id: NodeId) -> bool {
        self.0.set(id).is_ok()
    }

    pub fn ptr_eq(&self, other: &NodeHandle) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for NodeHandle {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for NodeHandle {}

impl fmt::Debug for NodeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.get() {
            Some(id) => write!(f, "NodeHandle({})", id),
            None => write!(f, "NodeHandle(pending)"),
        }
    }
}

/// Where an insert lands among the parent's children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Anchor {
    Before(NodeHandle),
    /// Immediately after the node, resolved against the live tree at commit.
    After(NodeHandle),
    End,
}

impl Anchor {
    pub(crate) fn resolve(&self, document: &dyn Document) -> Result<Option<NodeId>, CommitError> {
        match self {
            Anchor::Before(handle) => Ok(Some(handle.id()?)),
            Anchor::After(handle) => Ok(document.next_sibling(handle.id()?)?),
            Anchor::End => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_dom::MemoryDocument;

    #[test]
    fn test_pending_handle_resolves_once() {
        let handle = NodeHandle::pending();
        assert_eq!(handle.id(), Err(CommitError::UnresolvedHandle));
        assert!(handle.resolve(NodeId(4)));
        assert!(!handle.resolve(NodeId(5)));
        assert_eq!(handle.get(), Some(NodeId(4)));

        let copy = handle.clone();
        assert_eq!(copy, handle);
        assert_ne!(NodeHandle::resolved(NodeId(4)), handle);
    }

    #[test]
    fn test_after_anchor_reads_live_sibling() {
        let mut doc = MemoryDocument::new();
        let parent = doc.create_element("ul");
        let a = doc.create_element("li");
        let b = doc.create_element("li");
        doc.append_child(parent, a).unwrap();

        let after_a = Anchor::After(NodeHandle::resolved(a));
        assert_eq!(after_a.resolve(&doc).unwrap(), None);
        doc.append_child(parent, b).unwrap();
        assert_eq!(after_a.resolve(&doc).unwrap(), Some(b));
    }
}
