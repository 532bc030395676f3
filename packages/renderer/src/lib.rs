//! # Trellis Renderer
//!
//! Declarative UI reconciliation over an abstract document.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ VNode tree: elements, text, fragments,      │
//! │ components, providers, portals              │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ reconciler: fibers + hooks + keyed differ   │
//! │  - Patch matching fibers in place           │
//! │  - Move keyed siblings, mount the rest      │
//! │  - Re-render components on state updates    │
//! └─────────────────────────────────────────────┘
//!                     ↓  CommitOp
//! ┌─────────────────────────────────────────────┐
//! │ commit scheduler: queue, chunks, frames     │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ trellis_dom::Document                       │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::{Arc, Mutex};
//! use trellis_renderer::{attr, children, create_root, tags::*, Document, MemoryDocument};
//!
//! let mut document = MemoryDocument::new();
//! let body = document.create_element("body");
//! let root = create_root(Arc::new(Mutex::new(document)), body);
//!
//! root.render(div(children![attr("role", "value"), span(children!["1"])]))?;
//! ```

pub mod arena;
pub mod attrs;
pub mod compare;
pub mod context;
pub mod error;
pub mod handle;
pub mod hooks;
pub mod mutation;
mod reconciler;
pub mod render;
pub mod root;
pub mod scheduler;
pub mod scope;
mod sync;
pub mod tags;
pub mod vnode;

pub use arena::FiberId;
pub use attrs::{attr, attrs, provide_style_cache, AttrSource, Attrs, SharedStyleCache, Style, StyleCache};
pub use compare::{deps_equal, shallow_equal, Deps};
pub use context::Context;
pub use error::{CommitError, RenderError, RenderResult, SchedulerError};
pub use handle::{Anchor, NodeHandle};
pub use hooks::{
    cleanup, use_effect, use_element_ref, use_memo, use_ref, use_state, Cleanup, ElementRef,
    HookKind, HookSlots, Ref, RefTarget, Setter,
};
pub use mutation::{Callback, CommitOp, CommitStats, Mutation, Placement};
pub use render::{render_to_string, render_to_string_with_context};
pub use root::{create_root, Root, RootBuilder, RootOptions};
pub use scheduler::{
    CommitScheduler, Frame, FrameRequester, ImmediateFrames, SchedulerOptions, SharedDocument,
    TokioFrames,
};
pub use scope::{Scope, Updater};
pub use vnode::{
    component, element, fragment, key, portal, provider, text, Child, Component, ComponentType,
    Key, NodeKind, Provider, VNode,
};

pub use trellis_dom::{dispatch_event, Document, Event, MemoryDocument, NodeId, Value};
