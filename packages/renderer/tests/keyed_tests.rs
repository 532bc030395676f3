use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use trellis_renderer::tags::{div, li, ul};
use trellis_renderer::{
    children, component, create_root, fragment, key, Child, CommitStats, Component, Document,
    ElementRef, MemoryDocument, NodeId, Ref, Root, Scope, VNode,
};

fn setup() -> (Arc<Mutex<MemoryDocument>>, NodeId, Root) {
    let mut document = MemoryDocument::new();
    let body = document.create_element("body");
    let document = Arc::new(Mutex::new(document));
    let root = create_root(document.clone(), body);
    (document, body, root)
}

fn html(document: &Arc<Mutex<MemoryDocument>>, node: NodeId) -> String {
    document.lock().unwrap().to_html(node).unwrap()
}

fn list(keys: &[&str]) -> VNode {
    ul(keys
        .iter()
        .map(|k| li(children![key(*k), *k]).into())
        .collect::<Vec<Child>>())
}

fn expected(keys: &[&str]) -> String {
    let items: String = keys.iter().map(|k| format!("<li>{}</li>", k)).collect();
    format!("<body><ul>{}</ul></body>", items)
}

/// Renders `from`, then `to`, and returns the stats of the second render.
fn transition(from: &[&str], to: &[&str]) -> CommitStats {
    let (document, body, root) = setup();
    root.render(list(from)).unwrap();
    assert_eq!(html(&document, body), expected(from));

    root.reset_stats();
    root.render(list(to)).unwrap();
    assert_eq!(html(&document, body), expected(to));
    root.stats()
}

#[test]
fn test_swap_is_single_move() {
    let (document, body, root) = setup();
    root.render(div(children![div(children![key("a")]), div(children![key("b")])]))
        .unwrap();

    root.reset_stats();
    root.render(div(children![div(children![key("b")]), div(children![key("a")])]))
        .unwrap();

    let stats = root.stats();
    assert_eq!(stats.moved, 1);
    assert_eq!(stats.created(), 0);
    assert_eq!(stats.removed, 0);
    assert_eq!(stats.inserted, 0);
    assert_eq!(
        html(&document, body),
        "<body><div><div></div><div></div></div></body>"
    );
}

#[test]
fn test_rotation_moves_only() {
    let stats = transition(&["1", "2", "3"], &["3", "1", "2"]);
    assert_eq!(stats.moved, 1);
    assert_eq!(stats.created(), 0);
    assert_eq!(stats.removed, 0);
    assert_eq!(stats.writes(), 1);
}

#[test]
fn test_reverse() {
    let stats = transition(&["a", "b", "c", "d"], &["d", "c", "b", "a"]);
    assert_eq!(stats.moved, 3);
    assert_eq!(stats.created(), 0);
    assert_eq!(stats.removed, 0);
}

#[test]
fn test_insert_in_middle() {
    let stats = transition(&["a", "c"], &["a", "b", "c"]);
    assert_eq!(stats.created_elements, 1);
    assert_eq!(stats.moved, 0);
    assert_eq!(stats.removed, 0);
}

#[test]
fn test_remove_from_middle() {
    let stats = transition(&["a", "b", "c"], &["a", "c"]);
    assert_eq!(stats.removed, 1);
    assert_eq!(stats.moved, 0);
    assert_eq!(stats.created(), 0);
}

#[test]
fn test_shuffle_with_additions_and_removals() {
    let stats = transition(&["a", "b", "c", "d", "e"], &["e", "x", "c", "a", "y"]);
    assert_eq!(stats.created_elements, 2);
    assert_eq!(stats.removed, 2);
}

#[test]
fn test_replace_all() {
    let stats = transition(&["a", "b"], &["c", "d", "e"]);
    assert_eq!(stats.created_elements, 3);
    assert_eq!(stats.removed, 2);
}

#[test]
fn test_clear_and_refill() {
    let (document, body, root) = setup();
    root.render(list(&["a", "b"])).unwrap();
    root.render(list(&[])).unwrap();
    assert_eq!(html(&document, body), "<body><ul></ul></body>");
    root.render(list(&["c"])).unwrap();
    assert_eq!(html(&document, body), expected(&["c"]));
}

#[test]
fn test_keyed_elements_keep_identity() {
    let (_document, _body, root) = setup();
    let refs: HashMap<&str, ElementRef> = ["a", "b", "c"]
        .into_iter()
        .map(|k| (k, Ref::new(None)))
        .collect();
    let render = |order: &[&str]| {
        ul(order
            .iter()
            .map(|k| li(children![key(*k), refs[k].clone(), *k]).into())
            .collect::<Vec<Child>>())
    };

    root.render(render(&["a", "b", "c"])).unwrap();
    let before: Vec<NodeId> = ["a", "b", "c"]
        .iter()
        .map(|k| refs[k].node_id().unwrap())
        .collect();

    root.render(render(&["c", "a", "b"])).unwrap();
    let after: Vec<NodeId> = ["a", "b", "c"]
        .iter()
        .map(|k| refs[k].node_id().unwrap())
        .collect();
    assert_eq!(before, after);

    root.render(render(&["a"])).unwrap();
    assert!(refs["b"].node_id().is_none());
    assert!(refs["c"].node_id().is_none());
    assert_eq!(refs["a"].node_id(), Some(before[0]));
}

struct Item {
    label: &'static str,
}

impl Component for Item {
    fn render(&self, _scope: &mut Scope<'_>, _children: &[Child]) -> Child {
        li(children![self.label]).into()
    }
}

fn items(keys: &[&'static str]) -> VNode {
    ul(keys
        .iter()
        .map(|k| component(Item { label: *k }, children![key(*k)]).into())
        .collect::<Vec<Child>>())
}

#[test]
fn test_keyed_components_move_with_anchor() {
    let (document, body, root) = setup();
    root.render(items(&["a", "b", "c"])).unwrap();
    assert_eq!(html(&document, body), expected(&["a", "b", "c"]));

    root.reset_stats();
    root.render(items(&["c", "b", "a"])).unwrap();
    assert_eq!(html(&document, body), expected(&["c", "b", "a"]));

    let stats = root.stats();
    assert_eq!(stats.created(), 0);
    assert_eq!(stats.removed, 0);
    // Each moved component carries its element and its end anchor.
    assert_eq!(stats.moved, 4);
}

#[test]
fn test_keyed_fragments_move() {
    let (document, body, root) = setup();
    let render = |order: &[&str]| {
        div(order
            .iter()
            .map(|k| fragment(children![key(*k), *k, *k]).into())
            .collect::<Vec<Child>>())
    };

    root.render(render(&["x", "y"])).unwrap();
    assert_eq!(html(&document, body), "<body><div>xxyy</div></body>");

    root.reset_stats();
    root.render(render(&["y", "x"])).unwrap();
    assert_eq!(html(&document, body), "<body><div>yyxx</div></body>");
    assert_eq!(root.stats().created(), 0);

    root.render(render(&["y", "z", "x"])).unwrap();
    assert_eq!(html(&document, body), "<body><div>yyzzxx</div></body>");
}

#[test]
fn test_unkeyed_siblings_patch_in_place() {
    let (document, body, root) = setup();
    root.render(ul(children![li(children!["1"]), li(children!["2"])]))
        .unwrap();

    root.reset_stats();
    root.render(ul(children![li(children!["2"]), li(children!["1"])]))
        .unwrap();
    assert_eq!(
        html(&document, body),
        "<body><ul><li>2</li><li>1</li></ul></body>"
    );
    let stats = root.stats();
    assert_eq!(stats.moved, 0);
    assert_eq!(stats.text_updates, 2);
}
