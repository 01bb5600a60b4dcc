//! HTML fragment parsing
//!
//! Uses html5ever's RcDom and converts the parsed nodes into the arena as
//! detached subtrees.

use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use markup5ever_rcdom::{Handle, NodeData as RcNodeData, RcDom};

use crate::{DomError, DomResult, DomTree, Node, NodeId};

/// Parse `html` and return the root element of the fragment, detached.
///
/// The fragment root is the first element html5ever produced; markup
/// without any element fails with [`DomError::EmptyFragment`].
pub fn parse_fragment(tree: &mut DomTree, html: &str) -> DomResult<NodeId> {
    parse_nodes(tree, html)
        .into_iter()
        .find(|id| tree.is_element(*id))
        .ok_or(DomError::EmptyFragment)
}

/// Parse `html` into detached top-level nodes in source order
pub(crate) fn parse_nodes(tree: &mut DomTree, html: &str) -> Vec<NodeId> {
    tracing::trace!("Parsing HTML fragment ({} bytes)", html.len());
    let dom = parse_document(RcDom::default(), Default::default()).one(html);

    // Head-only content (style, meta, link) lands in <head>; body content after it.
    let mut sources = Vec::new();
    for html_el in dom.document.children.borrow().iter() {
        if element_name(html_el).as_deref() != Some("html") {
            continue;
        }
        for section in html_el.children.borrow().iter() {
            if matches!(element_name(section).as_deref(), Some("head" | "body")) {
                sources.extend(section.children.borrow().iter().cloned());
            }
        }
    }

    sources
        .iter()
        .filter_map(|handle| convert_node(handle, tree))
        .collect()
}

fn element_name(handle: &Handle) -> Option<String> {
    match &handle.data {
        RcNodeData::Element { name, .. } => Some(name.local.to_string()),
        _ => None,
    }
}

fn convert_node(handle: &Handle, tree: &mut DomTree) -> Option<NodeId> {
    let id = match &handle.data {
        RcNodeData::Text { contents } => tree.create_text(contents.borrow().to_string()),
        RcNodeData::Comment { contents } => tree.create_comment(contents.to_string()),
        RcNodeData::Element { name, attrs, .. } => {
            let mut node = Node::element(&name.local);
            if let Some(elem) = node.as_element_mut() {
                for attr in attrs.borrow().iter() {
                    elem.set_attr(&attr.name.local, attr.value.to_string());
                }
            }
            tree.push(node)
        }
        RcNodeData::Document | RcNodeData::Doctype { .. } | RcNodeData::ProcessingInstruction { .. } => {
            return None;
        }
    };
    for child in handle.children.borrow().iter() {
        if let Some(child_id) = convert_node(child, tree) {
            // Both nodes are detached, so this cannot fail or record.
            let _ = tree.append_child(id, child_id);
        }
    }
    Some(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_fragment_root() {
        let mut tree = DomTree::new();
        let root = parse_fragment(&mut tree, r#"<form id="f"><input name="a"></form>"#).unwrap();
        assert_eq!(tree.tag_name(root), Some("form"));
        assert_eq!(tree.attr(root, "id"), Some("f"));
        assert!(!tree.is_connected(root));
        assert_eq!(tree.element_children(root).len(), 1);
    }

    #[test]
    fn test_parse_fragment_skips_leading_text() {
        let mut tree = DomTree::new();
        let root = parse_fragment(&mut tree, "  <p>hi</p>").unwrap();
        assert_eq!(tree.tag_name(root), Some("p"));
        assert_eq!(tree.text_content(root), "hi");
    }

    #[test]
    fn test_parse_fragment_empty() {
        let mut tree = DomTree::new();
        assert_eq!(parse_fragment(&mut tree, ""), Err(DomError::EmptyFragment));
        assert_eq!(parse_fragment(&mut tree, "just text"), Err(DomError::EmptyFragment));
    }

    #[test]
    fn test_parse_head_content() {
        let mut tree = DomTree::new();
        let root = parse_fragment(&mut tree, "<style>p { color: red; }</style>").unwrap();
        assert_eq!(tree.tag_name(root), Some("style"));
    }
}
