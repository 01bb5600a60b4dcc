//! Document - High-level document API

use crate::{DomTree, ListenerStore, NodeId};

/// HTML Document
#[derive(Debug)]
pub struct Document {
    tree: DomTree,
    listeners: ListenerStore,
    /// Document URL
    url: String,
    html_element: NodeId,
    head_element: NodeId,
    body_element: NodeId,
}

impl Document {
    /// Create a document with `<html><head></head><body></body></html>`
    pub fn new(url: &str) -> Self {
        let mut tree = DomTree::new();

        let html = tree.create_element("html");
        let head = tree.create_element("head");
        let body = tree.create_element("body");

        // Fresh detached nodes under the document node cannot violate hierarchy.
        let _ = tree.append_child(tree.root(), html);
        let _ = tree.append_child(html, head);
        let _ = tree.append_child(html, body);
        tree.take_records();

        Self {
            tree,
            listeners: ListenerStore::default(),
            url: url.to_string(),
            html_element: html,
            head_element: head,
            body_element: body,
        }
    }

    /// Get document URL
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn set_url(&mut self, url: &str) {
        self.url = url.to_string();
    }

    pub fn document_element(&self) -> NodeId {
        self.html_element
    }

    pub fn head(&self) -> NodeId {
        self.head_element
    }

    pub fn body(&self) -> NodeId {
        self.body_element
    }

    pub fn tree(&self) -> &DomTree {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut DomTree {
        &mut self.tree
    }

    pub fn listeners(&self) -> &ListenerStore {
        &self.listeners
    }

    pub fn listeners_mut(&mut self) -> &mut ListenerStore {
        &mut self.listeners
    }

    /// First connected element with the given id
    pub fn get_element_by_id(&self, id: &str) -> Option<NodeId> {
        self.tree
            .descendants(self.tree.root())
            .into_iter()
            .find(|n| self.tree.element(*n).and_then(|e| e.id()) == Some(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_structure() {
        let doc = Document::new("http://localhost/");
        let tree = doc.tree();
        assert_eq!(tree.tag_name(doc.document_element()), Some("html"));
        assert_eq!(tree.parent(doc.head()), Some(doc.document_element()));
        assert_eq!(tree.parent(doc.body()), Some(doc.document_element()));
        assert!(tree.is_connected(doc.body()));
        assert!(!tree.has_pending_records());
    }

    #[test]
    fn test_get_element_by_id() {
        let mut doc = Document::new("http://localhost/");
        let div = doc.tree_mut().create_element("div");
        doc.tree_mut().set_attr(div, "id", "main");
        assert_eq!(doc.get_element_by_id("main"), None);
        let body = doc.body();
        doc.tree_mut().append_child(body, div).unwrap();
        assert_eq!(doc.get_element_by_id("main"), Some(div));
    }
}
