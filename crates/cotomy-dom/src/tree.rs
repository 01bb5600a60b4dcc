//! DOM Tree (arena-based allocation)
//!
//! Core node manipulation: appendChild, insertBefore, remove, cloneNode.
//! Child-list changes under a connected parent are queued as
//! [`MutationRecord`]s.

use crate::observer::{MutationQueue, MutationRecord};
use crate::{DomError, DomResult, ElementData, Node, NodeData, NodeId, SelectorList};

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track", "wbr",
];

const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

/// Arena-based DOM tree
#[derive(Debug)]
pub struct DomTree {
    nodes: Vec<Node>,
    mutations: MutationQueue,
}

impl Default for DomTree {
    fn default() -> Self {
        Self::new()
    }
}

impl DomTree {
    /// Create a tree holding only the document node
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::document()],
            mutations: MutationQueue::default(),
        }
    }

    /// Document node
    #[inline]
    pub fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    /// Get a node by ID
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    /// Get a mutable node by ID
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.index())
    }

    /// Number of nodes ever allocated
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always false: the document node exists from construction
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn node(&self, id: NodeId) -> DomResult<&Node> {
        self.get(id).ok_or(DomError::NotFound(id))
    }

    pub(crate) fn push(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    /// Create a detached element
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.push(Node::element(tag))
    }

    /// Create a detached text node
    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.push(Node::text(text))
    }

    /// Create a detached comment node
    pub fn create_comment(&mut self, text: impl Into<String>) -> NodeId {
        self.push(Node::comment(text))
    }

    /// Element data of `id`, if it is an element
    pub fn element(&self, id: NodeId) -> Option<&ElementData> {
        self.get(id).and_then(Node::as_element)
    }

    pub fn element_mut(&mut self, id: NodeId) -> Option<&mut ElementData> {
        self.get_mut(id).and_then(Node::as_element_mut)
    }

    /// Lowercase tag name
    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|e| e.tag.as_str())
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        self.element(id).is_some()
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.parent)
    }

    /// Parent if it is an element
    pub fn parent_element(&self, id: NodeId) -> Option<NodeId> {
        self.parent(id).filter(|p| self.is_element(*p))
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.get(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    pub fn element_children(&self, id: NodeId) -> Vec<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .filter(|c| self.is_element(*c))
            .collect()
    }

    pub fn first_element_child(&self, id: NodeId) -> Option<NodeId> {
        self.children(id).iter().copied().find(|c| self.is_element(*c))
    }

    pub fn previous_sibling(&self, id: NodeId) -> Option<NodeId> {
        let siblings = self.children(self.parent(id)?);
        let pos = siblings.iter().position(|c| *c == id)?;
        pos.checked_sub(1).map(|p| siblings[p])
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let siblings = self.children(self.parent(id)?);
        let pos = siblings.iter().position(|c| *c == id)?;
        siblings.get(pos + 1).copied()
    }

    /// Ancestors, nearest first (excluding `id`)
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut cursor = self.parent(id);
        while let Some(node) = cursor {
            out.push(node);
            cursor = self.parent(node);
        }
        out
    }

    /// Inclusive descendant check
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        node == ancestor || self.ancestors(node).contains(&ancestor)
    }

    /// Whether `id` is attached to the document node
    pub fn is_connected(&self, id: NodeId) -> bool {
        id == NodeId::ROOT || self.ancestors(id).last() == Some(&NodeId::ROOT)
    }

    /// Descendants in document order (excluding `id`)
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(self.children(node).iter().rev().copied());
        }
        out
    }

    // Attributes

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id).and_then(|e| e.get_attr(name))
    }

    pub fn has_attr(&self, id: NodeId, name: &str) -> bool {
        self.element(id).is_some_and(|e| e.has_attr(name))
    }

    /// Set an attribute; ignored for non-elements
    pub fn set_attr(&mut self, id: NodeId, name: &str, value: impl Into<String>) {
        if let Some(elem) = self.element_mut(id) {
            elem.set_attr(name, value);
        }
    }

    pub fn remove_attr(&mut self, id: NodeId, name: &str) -> Option<String> {
        self.element_mut(id).and_then(|e| e.remove_attr(name))
    }

    // Child list mutation

    fn validate_insert(&self, parent: NodeId, child: NodeId) -> DomResult<()> {
        let parent_node = self.node(parent)?;
        self.node(child)?;
        if !parent_node.can_have_children() {
            return Err(DomError::HierarchyRequest(format!("{parent} cannot have children")));
        }
        if child == NodeId::ROOT {
            return Err(DomError::HierarchyRequest("document cannot be inserted".into()));
        }
        if self.contains(child, parent) {
            return Err(DomError::HierarchyRequest(format!("{child} is an ancestor of {parent}")));
        }
        Ok(())
    }

    fn detach(&mut self, child: NodeId) {
        let Some(parent) = self.parent(child) else {
            return;
        };
        let previous = self.previous_sibling(child);
        let next = self.next_sibling(child);
        if let Some(node) = self.get_mut(parent) {
            node.children.retain(|c| *c != child);
        }
        if let Some(node) = self.get_mut(child) {
            node.parent = None;
        }
        if self.is_connected(parent) {
            self.mutations
                .push_record(MutationRecord::removed(parent, child, previous, next));
        }
    }

    fn attach_at(&mut self, parent: NodeId, child: NodeId, index: usize) {
        if let Some(node) = self.get_mut(parent) {
            let index = index.min(node.children.len());
            node.children.insert(index, child);
        }
        if let Some(node) = self.get_mut(child) {
            node.parent = Some(parent);
        }
        if self.is_connected(parent) {
            let previous = self.previous_sibling(child);
            let next = self.next_sibling(child);
            self.mutations
                .push_record(MutationRecord::added(parent, child, previous, next));
        }
    }

    /// Append `child` as the last child of `parent`, moving it if attached
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> DomResult<()> {
        self.validate_insert(parent, child)?;
        self.detach(child);
        let index = self.children(parent).len();
        self.attach_at(parent, child, index);
        Ok(())
    }

    /// Insert `child` as the first child of `parent`
    pub fn prepend_child(&mut self, parent: NodeId, child: NodeId) -> DomResult<()> {
        self.validate_insert(parent, child)?;
        self.detach(child);
        self.attach_at(parent, child, 0);
        Ok(())
    }

    /// Insert `child` under `parent` before `reference` (append when `None`)
    pub fn insert_before(&mut self, parent: NodeId, child: NodeId, reference: Option<NodeId>) -> DomResult<()> {
        self.validate_insert(parent, child)?;
        let mut reference = reference;
        if let Some(r) = reference {
            if self.parent(r) != Some(parent) {
                return Err(DomError::HierarchyRequest(format!("{r} is not a child of {parent}")));
            }
            if r == child {
                reference = self.next_sibling(child);
            }
        }
        self.detach(child);
        let index = match reference {
            Some(r) => self.children(parent).iter().position(|c| *c == r).unwrap_or(0),
            None => self.children(parent).len(),
        };
        self.attach_at(parent, child, index);
        Ok(())
    }

    /// Insert `child` as the previous sibling of `sibling`
    pub fn insert_sibling_before(&mut self, sibling: NodeId, child: NodeId) -> DomResult<()> {
        let parent = self
            .parent(sibling)
            .ok_or_else(|| DomError::HierarchyRequest(format!("{sibling} has no parent")))?;
        if sibling == child {
            return Ok(());
        }
        self.insert_before(parent, child, Some(sibling))
    }

    /// Insert `child` as the next sibling of `sibling`
    pub fn insert_sibling_after(&mut self, sibling: NodeId, child: NodeId) -> DomResult<()> {
        let parent = self
            .parent(sibling)
            .ok_or_else(|| DomError::HierarchyRequest(format!("{sibling} has no parent")))?;
        if sibling == child {
            return Ok(());
        }
        self.validate_insert(parent, child)?;
        self.detach(child);
        let index = self
            .children(parent)
            .iter()
            .position(|c| *c == sibling)
            .map_or(0, |p| p + 1);
        self.attach_at(parent, child, index);
        Ok(())
    }

    /// Detach `id` from its parent; a detached node is left as is
    pub fn remove(&mut self, id: NodeId) -> DomResult<()> {
        self.node(id)?;
        self.detach(id);
        Ok(())
    }

    /// Remove every child of `id`
    pub fn remove_children(&mut self, id: NodeId) {
        for child in self.children(id).to_vec() {
            self.detach(child);
        }
    }

    /// Deep copy of the subtree at `id`, detached
    pub fn clone_subtree(&mut self, id: NodeId) -> DomResult<NodeId> {
        let node = self.node(id)?;
        let copy = Node {
            parent: None,
            children: Vec::new(),
            data: node.data.clone(),
        };
        let children = node.children.clone();
        let new_id = self.push(copy);
        for child in children {
            let child_copy = self.clone_subtree(child)?;
            if let Some(node) = self.get_mut(child_copy) {
                node.parent = Some(new_id);
            }
            if let Some(node) = self.get_mut(new_id) {
                node.children.push(child_copy);
            }
        }
        Ok(new_id)
    }

    // Text and markup

    /// Concatenated text of all descendant text nodes
    pub fn text_content(&self, id: NodeId) -> String {
        if let Some(text) = self.get(id).and_then(Node::as_text) {
            return text.to_string();
        }
        self.descendants(id)
            .into_iter()
            .filter_map(|d| self.get(d).and_then(Node::as_text))
            .collect()
    }

    /// Replace the children of `id` with a single text node
    pub fn set_text_content(&mut self, id: NodeId, text: &str) {
        if let Some(NodeData::Text(t)) = self.get_mut(id).map(|n| &mut n.data) {
            *t = text.to_string();
            return;
        }
        self.remove_children(id);
        if !text.is_empty() {
            let node = self.create_text(text);
            let _ = self.append_child(id, node);
        }
    }

    /// Replace the children of `id` with parsed markup
    pub fn set_inner_html(&mut self, id: NodeId, html: &str) -> DomResult<()> {
        self.node(id)?;
        self.remove_children(id);
        for node in crate::parser::parse_nodes(self, html) {
            self.append_child(id, node)?;
        }
        Ok(())
    }

    /// Serialized children of `id`
    pub fn inner_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        let raw = self
            .tag_name(id)
            .is_some_and(|t| RAW_TEXT_ELEMENTS.contains(&t));
        for child in self.children(id) {
            self.serialize(*child, raw, &mut out);
        }
        out
    }

    /// Serialized markup of `id` including itself
    pub fn outer_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.serialize(id, false, &mut out);
        out
    }

    fn serialize(&self, id: NodeId, raw_text: bool, out: &mut String) {
        let Some(node) = self.get(id) else {
            return;
        };
        match &node.data {
            NodeData::Document => out.push_str(&self.inner_html(id)),
            NodeData::Text(text) if raw_text => out.push_str(text),
            NodeData::Text(text) => out.push_str(&escape_text(text)),
            NodeData::Comment(text) => {
                out.push_str("<!--");
                out.push_str(text);
                out.push_str("-->");
            }
            NodeData::Element(elem) => {
                out.push('<');
                out.push_str(&elem.tag);
                for attr in &elem.attrs {
                    out.push(' ');
                    out.push_str(&attr.name);
                    out.push_str("=\"");
                    out.push_str(&escape_attr(&attr.value));
                    out.push('"');
                }
                out.push('>');
                if VOID_ELEMENTS.contains(&elem.tag.as_str()) {
                    return;
                }
                out.push_str(&self.inner_html(id));
                out.push_str("</");
                out.push_str(&elem.tag);
                out.push('>');
            }
        }
    }

    // Selectors

    /// Descendant elements of `scope` matching `selector`, in document order
    pub fn query_all(&self, scope: NodeId, selector: &SelectorList) -> Vec<NodeId> {
        self.descendants(scope)
            .into_iter()
            .filter(|d| selector.matches(self, *d))
            .collect()
    }

    pub fn query_selector_all(&self, scope: NodeId, selector: &str) -> DomResult<Vec<NodeId>> {
        Ok(self.query_all(scope, &SelectorList::parse(selector)?))
    }

    pub fn query_selector(&self, scope: NodeId, selector: &str) -> DomResult<Option<NodeId>> {
        let selector = SelectorList::parse(selector)?;
        Ok(self
            .descendants(scope)
            .into_iter()
            .find(|d| selector.matches(self, *d)))
    }

    /// Nearest inclusive ancestor element matching `selector`
    pub fn closest(&self, id: NodeId, selector: &str) -> DomResult<Option<NodeId>> {
        let selector = SelectorList::parse(selector)?;
        let mut cursor = Some(id);
        while let Some(node) = cursor {
            if selector.matches(self, node) {
                return Ok(Some(node));
            }
            cursor = self.parent(node);
        }
        Ok(None)
    }

    pub fn matches(&self, id: NodeId, selector: &str) -> DomResult<bool> {
        Ok(SelectorList::parse(selector)?.matches(self, id))
    }

    // Form control state

    /// Current value of a form control
    pub fn value(&self, id: NodeId) -> String {
        let Some(elem) = self.element(id) else {
            return String::new();
        };
        if let Some(value) = &elem.value {
            return value.clone();
        }
        match elem.tag.as_str() {
            "textarea" => self.text_content(id),
            "select" => self
                .selected_option(id)
                .map(|opt| self.value(opt))
                .unwrap_or_default(),
            "option" => elem
                .get_attr("value")
                .map(str::to_string)
                .unwrap_or_else(|| self.text_content(id).trim().to_string()),
            "input" => match elem.get_attr("value") {
                Some(v) => v.to_string(),
                None if matches!(elem.get_attr("type"), Some(t) if t.eq_ignore_ascii_case("checkbox") || t.eq_ignore_ascii_case("radio")) => {
                    "on".to_string()
                }
                None => String::new(),
            },
            _ => elem.get_attr("value").unwrap_or_default().to_string(),
        }
    }

    /// Set the dirty value of a form control
    pub fn set_value(&mut self, id: NodeId, value: &str) {
        if self.tag_name(id) == Some("select") {
            let options: Vec<NodeId> = self
                .descendants(id)
                .into_iter()
                .filter(|d| self.tag_name(*d) == Some("option"))
                .collect();
            for opt in options {
                if self.value(opt) == value {
                    self.set_attr(opt, "selected", "");
                } else {
                    self.remove_attr(opt, "selected");
                }
            }
            return;
        }
        if let Some(elem) = self.element_mut(id) {
            elem.value = Some(value.to_string());
        }
    }

    fn selected_option(&self, select: NodeId) -> Option<NodeId> {
        let options: Vec<NodeId> = self
            .descendants(select)
            .into_iter()
            .filter(|d| self.tag_name(*d) == Some("option"))
            .collect();
        options
            .iter()
            .copied()
            .find(|o| self.has_attr(*o, "selected"))
            .or_else(|| options.first().copied())
    }

    /// Checkedness of a checkbox or radio
    pub fn checked(&self, id: NodeId) -> bool {
        self.has_attr(id, "checked")
    }

    pub fn set_checked(&mut self, id: NodeId, checked: bool) {
        if checked {
            self.set_attr(id, "checked", "");
        } else {
            self.remove_attr(id, "checked");
        }
    }

    // Mutation records

    /// Drain queued mutation records
    pub fn take_records(&mut self) -> Vec<MutationRecord> {
        self.mutations.take_records()
    }

    pub fn has_pending_records(&self) -> bool {
        !self.mutations.is_empty()
    }

    /// Sequence the next mutation record will get
    pub fn mutation_sequence(&self) -> u64 {
        self.mutations.next_sequence()
    }
}

fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

fn escape_attr(text: &str) -> String {
    text.replace('&', "&amp;").replace('"', "&quot;")
}
