//! # Trellis DOM
//!
//! The abstract mutable-tree surface the Trellis reconciler writes to, plus an
//! in-memory implementation used for tests and server-side rendering.
//!
//! ```text
//! reconciler ──► commit scheduler ──► dyn Document
//!                                        │
//!                                        ├── MemoryDocument (this crate)
//!                                        └── host bindings (browser, native, ...)
//! ```
//!
//! Nodes are addressed by [`NodeId`]; attribute values use [`Value`].

pub mod document;
pub mod error;
pub mod event;
pub mod html;
pub mod memory;
pub mod value;

pub use document::{Document, NodeId, NodeType};
pub use error::{DomError, DomResult};
pub use event::{dispatch_event, Event, EventListener, ListenerId};
pub use html::render_to_html;
pub use memory::MemoryDocument;
pub use value::Value;
