use crate::document::NodeId;
use crate::event::ListenerId;
use thiserror::Error;

/// Invariant violations raised by a document when a mutation cannot apply.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomError {
    #[error("Unknown node {0}")]
    UnknownNode(NodeId),

    #[error("Node {child} is already attached to {parent}")]
    AlreadyAttached { child: NodeId, parent: NodeId },

    #[error("Node {child} is not a child of {parent}")]
    NotAChild { parent: NodeId, child: NodeId },

    #[error("Cannot insert {child} into itself or one of its descendants ({parent})")]
    HierarchyRequest { parent: NodeId, child: NodeId },

    #[error("Node {0} is a text node and cannot hold children or attributes")]
    NotAnElement(NodeId),

    #[error("Unknown event listener {0:?}")]
    UnknownListener(ListenerId),
}

pub type DomResult<T> = Result<T, DomError>;
