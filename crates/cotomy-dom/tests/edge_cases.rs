//! Edge case tests for cotomy-dom
//!
//! Tree mutation, mutation records, selectors and dispatch corner cases.

use std::cell::RefCell;
use std::rc::Rc;

use cotomy_dom::{
    dispatch_event, parse_fragment, Document, DomError, DomEvent, DomTree, FormData, ListenerOptions, NodeId,
};
use pretty_assertions::assert_eq;

fn attached(doc: &mut Document, html: &str) -> NodeId {
    let node = parse_fragment(doc.tree_mut(), html).unwrap();
    let body = doc.body();
    doc.tree_mut().append_child(body, node).unwrap();
    node
}

// ============================================================================
// MUTATION RECORDS
// ============================================================================

#[test]
fn test_detached_subtree_mutations_not_recorded() {
    let mut tree = DomTree::new();
    let root = parse_fragment(&mut tree, "<div><p>a</p><p>b</p></div>").unwrap();
    let first = tree.first_element_child(root).unwrap();
    tree.remove(first).unwrap();
    assert!(!tree.has_pending_records());
}

#[test]
fn test_removing_ancestor_records_only_ancestor() {
    let mut doc = Document::new("http://localhost/");
    let outer = attached(&mut doc, "<section><div><span></span></div></section>");
    doc.tree_mut().take_records();

    doc.tree_mut().remove(outer).unwrap();
    let records = doc.tree_mut().take_records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].removed_nodes, vec![outer]);
    assert_eq!(records[0].target, doc.body());
}

#[test]
fn test_remove_detached_is_noop() {
    let mut tree = DomTree::new();
    let div = tree.create_element("div");
    assert!(tree.remove(div).is_ok());
    assert!(tree.remove(div).is_ok());
}

#[test]
fn test_set_inner_html_records_both_sides() {
    let mut doc = Document::new("http://localhost/");
    let host = attached(&mut doc, "<div><b>old</b></div>");
    doc.tree_mut().take_records();

    doc.tree_mut().set_inner_html(host, "<i>new</i>").unwrap();
    let records = doc.tree_mut().take_records();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].removed_nodes.len(), 1);
    assert_eq!(records[1].added_nodes.len(), 1);
    assert_eq!(doc.tree().inner_html(host), "<i>new</i>");
}

// ============================================================================
// TREE OPERATIONS
// ============================================================================

#[test]
fn test_insert_before_self_reference() {
    let mut tree = DomTree::new();
    let list = parse_fragment(&mut tree, "<ul><li>a</li><li>b</li></ul>").unwrap();
    let items = tree.element_children(list);
    tree.insert_before(list, items[0], Some(items[0])).unwrap();
    assert_eq!(tree.element_children(list), items);
}

#[test]
fn test_insert_before_foreign_reference() {
    let mut tree = DomTree::new();
    let list = tree.create_element("ul");
    let other = tree.create_element("li");
    let item = tree.create_element("li");
    assert!(matches!(
        tree.insert_before(list, item, Some(other)),
        Err(DomError::HierarchyRequest(_))
    ));
}

#[test]
fn test_sibling_insert_without_parent() {
    let mut tree = DomTree::new();
    let lone = tree.create_element("div");
    let other = tree.create_element("div");
    assert!(tree.insert_sibling_after(lone, other).is_err());
}

#[test]
fn test_unknown_node() {
    let mut tree = DomTree::new();
    let div = tree.create_element("div");
    let mut other = DomTree::new();
    for _ in 0..3 {
        other.create_element("p");
    }
    let far = other.create_element("p");
    assert!(matches!(tree.append_child(div, far), Err(DomError::NotFound(_))));
}

#[test]
fn test_text_content_unicode() {
    let mut tree = DomTree::new();
    let root = parse_fragment(&mut tree, "<p>こんにちは <b>世界</b></p>").unwrap();
    assert_eq!(tree.text_content(root), "こんにちは 世界");
}

// ============================================================================
// SELECTORS
// ============================================================================

#[test]
fn test_query_bracketed_names() {
    let mut tree = DomTree::new();
    let form = parse_fragment(
        &mut tree,
        r#"<form><input name="items[0].name"><input name="Items[0].Name"></form>"#,
    )
    .unwrap();
    let exact = tree
        .query_selector_all(form, r#"input[name="items[0].name"]"#)
        .unwrap();
    let loose = tree
        .query_selector_all(form, r#"input[name="items[0].name" i]"#)
        .unwrap();
    assert_eq!(exact.len(), 1);
    assert_eq!(loose.len(), 2);
}

#[test]
fn test_query_excludes_scope() {
    let mut tree = DomTree::new();
    let div = parse_fragment(&mut tree, "<div class=\"x\"><div class=\"x\"></div></div>").unwrap();
    assert_eq!(tree.query_selector_all(div, ".x").unwrap().len(), 1);
}

#[test]
fn test_not_with_list() {
    let mut tree = DomTree::new();
    let form = parse_fragment(
        &mut tree,
        r#"<form><input type="text"><input type="checkbox"><input type="radio"></form>"#,
    )
    .unwrap();
    let found = tree
        .query_selector_all(form, r#"input:not([type="checkbox"], [type="radio"])"#)
        .unwrap();
    assert_eq!(found.len(), 1);
}

// ============================================================================
// DISPATCH
// ============================================================================

#[test]
fn test_stop_propagation_at_target_blocks_bubble() {
    let mut doc = Document::new("http://localhost/");
    let outer = attached(&mut doc, "<div><button></button></div>");
    let button = doc.tree().first_element_child(outer).unwrap();
    let log = Rc::new(RefCell::new(Vec::<&str>::new()));
    let doc = RefCell::new(doc);

    let l = log.clone();
    doc.borrow_mut().listeners_mut().add(
        button,
        "click",
        Rc::new(move |e: &mut DomEvent| {
            l.borrow_mut().push("button");
            e.stop_propagation();
        }),
        ListenerOptions::default(),
    );
    let l = log.clone();
    doc.borrow_mut().listeners_mut().add(
        outer,
        "click",
        Rc::new(move |_e: &mut DomEvent| l.borrow_mut().push("outer")),
        ListenerOptions::default(),
    );

    dispatch_event(&doc, button, &mut DomEvent::bubbling("click"));
    assert_eq!(*log.borrow(), vec!["button"]);
}

#[test]
fn test_listener_may_mutate_tree() {
    let mut doc = Document::new("http://localhost/");
    let outer = attached(&mut doc, "<div><button></button></div>");
    let button = doc.tree().first_element_child(outer).unwrap();
    let doc = Rc::new(RefCell::new(doc));

    let d = doc.clone();
    doc.borrow_mut().listeners_mut().add(
        button,
        "click",
        Rc::new(move |_e: &mut DomEvent| {
            let _ = d.borrow_mut().tree_mut().remove(outer);
        }),
        ListenerOptions::default(),
    );
    dispatch_event(&doc, button, &mut DomEvent::bubbling("click"));
    assert!(!doc.borrow().tree().is_connected(button));
}

// ============================================================================
// FORM DATA
// ============================================================================

#[test]
fn test_form_data_multiple_select() {
    let mut tree = DomTree::new();
    let form = parse_fragment(
        &mut tree,
        r#"<form><select name="tags" multiple><option value="a" selected>A</option><option value="b">B</option><option value="c" selected>C</option></select></form>"#,
    )
    .unwrap();
    let data = FormData::from_form(&tree, form);
    assert_eq!(data.get_all("tags"), vec!["a", "c"]);
}
