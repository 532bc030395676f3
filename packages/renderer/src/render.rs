//! One-shot rendering to an HTML string.

use crate::context::Context;
use crate::root::{RootBuilder, RootOptions};
use crate::scheduler::SharedDocument;
use crate::sync::panic_message;
use crate::vnode::VNode;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex};
use tracing::error;
use trellis_dom::{Document, MemoryDocument};

/// Renders `vnode` into a detached `<html>` element and serializes it.
///
/// Render errors and panicking components are logged; whatever was
/// committed before the failure is still returned.
pub fn render_to_string(vnode: VNode) -> String {
    render_to_string_with_context(vnode, Context::new())
}

pub fn render_to_string_with_context(vnode: VNode, context: Context) -> String {
    let mut document = MemoryDocument::new();
    let html = document.create_element("html");
    let document = Arc::new(Mutex::new(document));
    let shared: SharedDocument = document.clone();

    let root = RootBuilder::new(shared, html)
        .options(RootOptions {
            background: false,
            ..RootOptions::default()
        })
        .context(context)
        .build();

    match panic::catch_unwind(AssertUnwindSafe(|| root.render(vnode))) {
        Ok(Ok(())) => {}
        Ok(Err(err)) => error!(error = %err, "render to string failed"),
        Err(payload) => {
            error!(panic = panic_message(payload.as_ref()), "component panicked while rendering to string");
            if let Err(err) = root.scheduler().force_commit() {
                error!(error = %err, "committing partial output failed");
            }
        }
    }
    if let Err(err) = root.close() {
        error!(error = %err, "closing render root failed");
    }

    let document = crate::sync::lock(&*document);
    match document.to_html(html) {
        Ok(output) => output,
        Err(err) => {
            error!(error = %err, "serializing rendered document failed");
            String::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attrs::attr;
    use crate::children;
    use crate::vnode::{element, fragment};

    #[test]
    fn test_render_to_string() {
        let html = render_to_string(element(
            "body",
            children![element("p", children![attr("class", "lead"), "a < b"])],
        ));
        assert_eq!(html, r#"<html><body><p class="lead">a &lt; b</p></body></html>"#);
    }

    #[test]
    fn test_fragment_anchor_is_invisible() {
        let html = render_to_string(fragment(children!["a", "b"]));
        assert_eq!(html, "<html>ab</html>");
    }
}
