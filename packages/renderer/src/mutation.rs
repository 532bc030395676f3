//! Deferred document mutations queued by the reconciler.

use crate::error::CommitError;
use crate::handle::{Anchor, NodeHandle};
use serde::Serialize;
use std::fmt;
use tracing::warn;
use trellis_dom::{Document, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// First attachment of a freshly created node.
    Insert,
    /// Repositioning of an already attached node.
    Move,
}

#[derive(Debug, Clone)]
pub enum Mutation {
    CreateElement {
        handle: NodeHandle,
        tag: String,
    },
    CreateTextNode {
        handle: NodeHandle,
        text: String,
    },
    InsertBefore {
        parent: NodeHandle,
        child: NodeHandle,
        anchor: Anchor,
        placement: Placement,
    },
    RemoveChild {
        parent: NodeHandle,
        child: NodeHandle,
    },
    SetAttribute {
        node: NodeHandle,
        key: String,
        value: Value,
    },
    RemoveAttribute {
        node: NodeHandle,
        key: String,
    },
    SetTextContent {
        node: NodeHandle,
        text: String,
    },
}

impl Mutation {
    pub fn name(&self) -> &'static str {
        match self {
            Mutation::CreateElement { .. } => "create_element",
            Mutation::CreateTextNode { .. } => "create_text_node",
            Mutation::InsertBefore {
                placement: Placement::Insert,
                ..
            } => "insert_before",
            Mutation::InsertBefore {
                placement: Placement::Move,
                ..
            } => "move_before",
            Mutation::RemoveChild { .. } => "remove_child",
            Mutation::SetAttribute { .. } => "set_attribute",
            Mutation::RemoveAttribute { .. } => "remove_attribute",
            Mutation::SetTextContent { .. } => "set_text_content",
        }
    }

    pub fn apply(&self, document: &mut dyn Document) -> Result<(), CommitError> {
        match self {
            Mutation::CreateElement { handle, tag } => {
                let id = document.create_element(tag);
                if !handle.resolve(id) {
                    warn!(tag = %tag, "element handle created twice");
                }
            }
            Mutation::CreateTextNode { handle, text } => {
                let id = document.create_text_node(text);
                if !handle.resolve(id) {
                    warn!("text handle created twice");
                }
            }
            Mutation::InsertBefore {
                parent,
                child,
                anchor,
                ..
            } => {
                let reference = anchor.resolve(document)?;
                document.insert_before(parent.id()?, child.id()?, reference)?;
            }
            Mutation::RemoveChild { parent, child } => {
                document.remove_child(parent.id()?, child.id()?)?;
            }
            Mutation::SetAttribute { node, key, value } => {
                document.set_attribute(node.id()?, key, value.clone())?;
            }
            Mutation::RemoveAttribute { node, key } => {
                document.remove_attribute(node.id()?, key)?;
            }
            Mutation::SetTextContent { node, text } => {
                document.set_text_content(node.id()?, text)?;
            }
        }
        Ok(())
    }
}

pub type Callback = Box<dyn FnOnce() + Send>;

/// One unit of queued work: a document mutation or post-mount callback.
pub enum CommitOp {
    Mutation(Mutation),
    Callback(Callback),
}

impl CommitOp {
    pub fn callback(callback: impl FnOnce() + Send + 'static) -> Self {
        CommitOp::Callback(Box::new(callback))
    }
}

impl From<Mutation> for CommitOp {
    fn from(mutation: Mutation) -> Self {
        CommitOp::Mutation(mutation)
    }
}

impl fmt::Debug for CommitOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommitOp::Mutation(mutation) => mutation.fmt(f),
            CommitOp::Callback(_) => write!(f, "Callback"),
        }
    }
}

/// Counters for committed work.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitStats {
    pub created_elements: usize,
    pub created_text_nodes: usize,
    pub inserted: usize,
    pub moved: usize,
    pub removed: usize,
    pub attributes_set: usize,
    pub attributes_removed: usize,
    pub text_updates: usize,
    pub callbacks: usize,
    pub failures: usize,
}

impl CommitStats {
    pub(crate) fn record(&mut self, mutation: &Mutation) {
        match mutation {
            Mutation::CreateElement { .. } => self.created_elements += 1,
            Mutation::CreateTextNode { .. } => self.created_text_nodes += 1,
            Mutation::InsertBefore {
                placement: Placement::Insert,
                ..
            } => self.inserted += 1,
            Mutation::InsertBefore {
                placement: Placement::Move,
                ..
            } => self.moved += 1,
            Mutation::RemoveChild { .. } => self.removed += 1,
            Mutation::SetAttribute { .. } => self.attributes_set += 1,
            Mutation::RemoveAttribute { .. } => self.attributes_removed += 1,
            Mutation::SetTextContent { .. } => self.text_updates += 1,
        }
    }

    /// Structural and content writes, excluding node creation.
    pub fn writes(&self) -> usize {
        self.inserted
            + self.moved
            + self.removed
            + self.attributes_set
            + self.attributes_removed
            + self.text_updates
    }

    pub fn created(&self) -> usize {
        self.created_elements + self.created_text_nodes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_dom::{MemoryDocument, NodeId};

    #[test]
    fn test_apply_sequence() {
        let mut doc = MemoryDocument::new();
        let body = doc.create_element("body");
        let parent = NodeHandle::resolved(body);
        let div = NodeHandle::pending();
        let text = NodeHandle::pending();

        let ops = vec![
            Mutation::CreateElement {
                handle: div.clone(),
                tag: "div".into(),
            },
            Mutation::SetAttribute {
                node: div.clone(),
                key: "role".into(),
                value: "value".into(),
            },
            Mutation::CreateTextNode {
                handle: text.clone(),
                text: "1".into(),
            },
            Mutation::InsertBefore {
                parent: div.clone(),
                child: text.clone(),
                anchor: Anchor::End,
                placement: Placement::Insert,
            },
            Mutation::InsertBefore {
                parent: parent.clone(),
                child: div.clone(),
                anchor: Anchor::End,
                placement: Placement::Insert,
            },
        ];

        let mut stats = CommitStats::default();
        for op in &ops {
            op.apply(&mut doc).unwrap();
            stats.record(op);
        }

        assert_eq!(
            doc.to_html(body).unwrap(),
            r#"<body><div role="value">1</div></body>"#
        );
        assert_eq!(stats.created(), 2);
        assert_eq!(stats.inserted, 2);
        assert_eq!(stats.attributes_set, 1);
    }

    #[test]
    fn test_unresolved_handle_fails() {
        let mut doc = MemoryDocument::new();
        let op = Mutation::SetTextContent {
            node: NodeHandle::pending(),
            text: "x".into(),
        };
        assert_eq!(op.apply(&mut doc), Err(CommitError::UnresolvedHandle));

        let op = Mutation::RemoveChild {
            parent: NodeHandle::resolved(NodeId(0)),
            child: NodeHandle::resolved(NodeId(1)),
        };
        assert!(matches!(op.apply(&mut doc), Err(CommitError::Dom(_))));
    }
}
