//! HTML serialization for any [`Document`].

use crate::document::{Document, NodeId, NodeType};
use crate::error::DomResult;
use crate::value::Value;

/// Elements that never have a closing tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];

/// Serializes `node` and its subtree.
///
/// Attributes are written in sorted order. Boolean `true` attributes render
/// as bare names; `false` and null attributes are omitted.
pub fn render_to_html<D>(document: &D, node: NodeId) -> DomResult<String>
where
    D: Document + ?Sized,
{
    let mut buffer = String::new();
    write_node(document, node, &mut buffer)?;
    Ok(buffer)
}

fn write_node<D>(document: &D, node: NodeId, buffer: &mut String) -> DomResult<()>
where
    D: Document + ?Sized,
{
    if document.node_type(node)? == NodeType::Text {
        buffer.push_str(&escape_text(&document.text_content(node)?));
        return Ok(());
    }

    let tag = document.node_name(node)?;
    buffer.push('<');
    buffer.push_str(&tag);
    for key in document.attribute_names(node)? {
        let Some(value) = document.get_attribute(node, &key)? else {
            continue;
        };
        match value {
            Value::Null | Value::Bool(false) => {}
            Value::Bool(true) => {
                buffer.push(' ');
                buffer.push_str(&key);
            }
            value => {
                buffer.push(' ');
                buffer.push_str(&key);
                buffer.push_str("=\"");
                buffer.push_str(&escape_attribute(&value.to_attribute_string()));
                buffer.push('"');
            }
        }
    }
    buffer.push('>');

    if VOID_ELEMENTS.contains(&tag.as_str()) && document.first_child(node)?.is_none() {
        return Ok(());
    }

    for child in document.child_nodes(node)? {
        write_node(document, child, buffer)?;
    }

    buffer.push_str("</");
    buffer.push_str(&tag);
    buffer.push('>');
    Ok(())
}

pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            c => out.push(c),
        }
    }
    out
}

pub fn escape_attribute(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '<' => out.push_str("&lt;"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryDocument;

    #[test]
    fn test_escaping() {
        let mut doc = MemoryDocument::new();
        let div = doc.create_element("div");
        doc.set_attribute(div, "title", "a \"b\" & c".into())
            .unwrap();
        let text = doc.create_text_node("1 < 2 & 3");
        doc.append_child(div, text).unwrap();

        assert_eq!(
            render_to_html(&doc, div).unwrap(),
            r#"<div title="a &quot;b&quot; &amp; c">1 &lt; 2 &amp; 3</div>"#
        );
    }

    #[test]
    fn test_attribute_values() {
        let mut doc = MemoryDocument::new();
        let input = doc.create_element("input");
        doc.set_attribute(input, "disabled", true.into()).unwrap();
        doc.set_attribute(input, "hidden", false.into()).unwrap();
        doc.set_attribute(input, "value", 3.into()).unwrap();
        doc.set_attribute(
            input,
            "class",
            Value::List(vec!["a".into(), "b".into()]),
        )
        .unwrap();

        assert_eq!(
            render_to_html(&doc, input).unwrap(),
            r#"<input class="a b" disabled value="3">"#
        );
    }

    #[test]
    fn test_empty_text_nodes_render_nothing() {
        let mut doc = MemoryDocument::new();
        let body = doc.create_element("body");
        let anchor = doc.create_text_node("");
        doc.append_child(body, anchor).unwrap();
        assert_eq!(render_to_html(&doc, body).unwrap(), "<body></body>");
    }
}
