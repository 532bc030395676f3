//! Shorthand constructors for common HTML elements.
//!
//! `div(children![...])` is `element("div", children![...])`.

use crate::vnode::{element, Child, VNode};

macro_rules! tags {
    ($($name:ident),+ $(,)?) => {
        $(
            pub fn $name(children: impl IntoIterator<Item = Child>) -> VNode {
                element(stringify!($name), children)
            }
        )+
    };
}

tags!(
    a, article, aside, body, button, code, div, em, footer, form, h1, h2, h3, header, html, img,
    input, label, li, main, nav, ol, p, pre, section, select, span, strong, table, tbody, td, th,
    thead, tr, ul,
);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vnode::NodeKind;

    #[test]
    fn test_tag_constructor() {
        let node = span(crate::children!["x"]);
        assert!(matches!(node.kind(), NodeKind::Element(tag) if tag == "span"));
        assert_eq!(node.children().len(), 1);
    }
}
