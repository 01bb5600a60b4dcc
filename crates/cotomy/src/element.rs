//! Element wrapper
//!
//! [`CotomyElement`] wraps one node of the window's document. Every wrapper
//! over the same node shares an [`ElementCore`] holding the instance id and
//! lifecycle state; once the core is `Removed` it points at an inert detached
//! placeholder, so later mutation through any wrapper never touches the
//! original node.
//!
//! Tree mutations that move an element run inside a transit scope:
//! `cotomy:transitstart` fires before the mutation, the node carries the
//! moving marker until the next flush, and `cotomy:transitend` fires after
//! the mutation whether or not it succeeded. The removal records queued by
//! the move itself never retire the element; a later detachment does.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use cotomy_dom::{DomEvent, DomResult, DomTree, ListenerOptions, NodeId, SelectorList};
use ulid::Ulid;

use crate::events::{EventHandler, EventNames, HandlerEntry};
use crate::window::CotomyWindow;
use crate::{CotomyError, CotomyResult};

pub(crate) const INSTANCE_ATTR: &str = "data-cotomy-instance";
pub(crate) const SCOPE_ATTR: &str = "data-cotomy-scopeid";
pub(crate) const MOVING_ATTR: &str = "data-cotomy-moving";
pub(crate) const LAYOUT_ATTR: &str = "data-cotomy-layout";

const TRANSIT_START: &str = "cotomy:transitstart";
const TRANSIT_END: &str = "cotomy:transitend";

/// Elements that never receive scoped CSS
const UNSTYLABLE: [&str; 4] = ["script", "style", "link", "meta"];

pub(crate) fn new_instance_id() -> String {
    Ulid::new().to_string().to_ascii_lowercase()
}

/// Double-quoted selector string
pub(crate) fn quoted(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        if matches!(c, '"' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}

/// Lifecycle of a wrapped element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementState {
    Live,
    /// Being relocated; removal records are ignored
    Transiting,
    /// Terminal
    Removed,
}

/// State shared by every wrapper over one node
#[derive(Debug)]
pub(crate) struct ElementCore {
    node: Cell<NodeId>,
    instance_id: String,
    state: Cell<ElementState>,
    parent: RefCell<Weak<ElementCore>>,
}

impl ElementCore {
    pub(crate) fn new(node: NodeId, instance_id: String) -> Self {
        Self {
            node: Cell::new(node),
            instance_id,
            state: Cell::new(ElementState::Live),
            parent: RefCell::new(Weak::new()),
        }
    }

    pub(crate) fn node(&self) -> NodeId {
        self.node.get()
    }

    pub(crate) fn instance_id(&self) -> &str {
        &self.instance_id
    }

    pub(crate) fn state(&self) -> ElementState {
        self.state.get()
    }

    /// Point at `placeholder` and become `Removed`
    pub(crate) fn retire(&self, placeholder: NodeId) {
        self.node.set(placeholder);
        self.state.set(ElementState::Removed);
        *self.parent.borrow_mut() = Weak::new();
    }
}

/// Construction strategy for typed wrappers
pub trait ElementWrap: Sized {
    fn wrap(element: CotomyElement) -> Self;
}

impl ElementWrap for CotomyElement {
    fn wrap(element: CotomyElement) -> Self {
        element
    }
}

/// Brackets a move with transit signals and the `Transiting` state
struct TransitScope<'a> {
    element: &'a CotomyElement,
    node: NodeId,
    first_record: u64,
}

impl<'a> TransitScope<'a> {
    fn begin(element: &'a CotomyElement) -> Self {
        element.dispatch(DomEvent::new(TRANSIT_START));
        element.core.state.set(ElementState::Transiting);
        let node = element.node();
        element.window.mark_moving(node);
        let first_record = element.window.mutation_sequence();
        Self { element, node, first_record }
    }
}

impl Drop for TransitScope<'_> {
    fn drop(&mut self) {
        // Only the records queued by this move are exempt from retirement
        self.element.window.note_transit(self.node, self.first_record);
        if self.element.core.state() == ElementState::Transiting {
            self.element.core.state.set(ElementState::Live);
        }
        self.element.dispatch(DomEvent::new(TRANSIT_END));
    }
}

/// Wrapper over one document node
#[derive(Clone)]
pub struct CotomyElement {
    window: Rc<CotomyWindow>,
    core: Rc<ElementCore>,
}

impl PartialEq for CotomyElement {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.core, &other.core)
    }
}

impl Eq for CotomyElement {}

impl fmt::Debug for CotomyElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CotomyElement")
            .field("node", &self.node())
            .field("tag", &self.tag_name())
            .field("instance", &self.core.instance_id)
            .field("state", &self.core.state())
            .finish()
    }
}

impl CotomyElement {
    pub(crate) fn from_parts(window: Rc<CotomyWindow>, core: Rc<ElementCore>) -> Self {
        Self { window, core }
    }

    pub fn window(&self) -> &Rc<CotomyWindow> {
        &self.window
    }

    /// Current node; the placeholder once removed
    pub fn node(&self) -> NodeId {
        self.core.node()
    }

    pub fn instance_id(&self) -> &str {
        &self.core.instance_id
    }

    pub fn state(&self) -> ElementState {
        self.core.state()
    }

    pub fn is_removed(&self) -> bool {
        self.core.state() == ElementState::Removed
    }

    fn read<R>(&self, f: impl FnOnce(&DomTree, NodeId) -> R) -> R {
        let doc = self.window.document();
        f(doc.tree(), self.node())
    }

    fn write<R>(&self, f: impl FnOnce(&mut DomTree, NodeId) -> R) -> R {
        let mut doc = self.window.document_mut();
        f(doc.tree_mut(), self.node())
    }

    // Identity

    /// Scope token shared by clones; assigned on first use
    pub fn scope_id(&self) -> String {
        if let Some(scope) = self.attribute(SCOPE_ATTR) {
            return scope;
        }
        let scope = format!("_{}", new_instance_id());
        self.write(|tree, node| {
            tree.set_attr(node, &scope, "");
            tree.set_attr(node, SCOPE_ATTR, scope.clone());
        });
        scope
    }

    /// Attribute selector matching this element's scope
    pub fn scope(&self) -> String {
        format!("[{}]", self.scope_id())
    }

    pub fn id(&self) -> Option<String> {
        self.attribute("id")
    }

    pub fn set_id(&self, id: &str) -> &Self {
        self.set_attribute("id", id)
    }

    /// Assign `{prefix}{ulid}` as id unless one is present
    pub fn generate_id(&self, prefix: &str) -> &Self {
        if self.id().is_none_or(|id| id.is_empty()) {
            self.set_id(&format!("{prefix}{}", new_instance_id()));
        }
        self
    }

    pub fn tag_name(&self) -> String {
        self.read(|tree, node| tree.tag_name(node).unwrap_or_default().to_string())
    }

    pub fn is(&self, selector: &str) -> CotomyResult<bool> {
        Ok(self.read(|tree, node| tree.matches(node, selector))?)
    }

    /// Placeholder created by [`CotomyWindow::empty`]
    pub fn empty(&self) -> bool {
        self.has_attribute("data-empty")
    }

    pub fn attached(&self) -> bool {
        !self.is_removed() && self.read(|tree, node| tree.is_connected(node))
    }

    // Scoped CSS

    fn stylable(&self) -> bool {
        !UNSTYLABLE.contains(&self.tag_name().as_str())
    }

    /// Inject `css` with `[scope]` bound to this element's scope
    pub fn use_scoped_css(&self, css: &str) -> CotomyResult<&Self> {
        if self.is_removed() {
            return Err(CotomyError::RemovedElement);
        }
        if css.is_empty() || !self.stylable() {
            return Ok(self);
        }
        let scope = self.scope_id();
        let rendered = css.replace("[scope]", &format!("[{scope}]"));
        self.window.register_style(&scope, rendered)?;
        Ok(self)
    }

    /// Whether the stylesheet of this element's scope is in the document
    pub fn has_scoped_css(&self) -> bool {
        self.attribute(SCOPE_ATTR).is_some_and(|s| self.window.has_style(&s))
    }

    // Attributes

    pub fn attribute(&self, name: &str) -> Option<String> {
        self.read(|tree, node| tree.attr(node, name).map(str::to_string))
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.read(|tree, node| tree.has_attr(node, name))
    }

    pub fn set_attribute(&self, name: &str, value: &str) -> &Self {
        self.write(|tree, node| tree.set_attr(node, name, value));
        self
    }

    pub fn remove_attribute(&self, name: &str) -> &Self {
        self.write(|tree, node| tree.remove_attr(node, name));
        self
    }

    pub fn attributes(&self) -> Vec<(String, String)> {
        self.read(|tree, node| {
            tree.element(node)
                .map(|e| e.attrs.iter().map(|a| (a.name.clone(), a.value.clone())).collect())
                .unwrap_or_default()
        })
    }

    pub fn classes(&self) -> Vec<String> {
        self.read(|tree, node| {
            tree.element(node)
                .map(|e| e.classes().map(str::to_string).collect())
                .unwrap_or_default()
        })
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes().iter().any(|c| c == class)
    }

    pub fn add_class(&self, class: &str) -> &Self {
        let mut classes = self.classes();
        if !classes.iter().any(|c| c == class) {
            classes.push(class.to_string());
            self.set_attribute("class", &classes.join(" "));
        }
        self
    }

    pub fn remove_class(&self, class: &str) -> &Self {
        let classes: Vec<String> = self.classes().into_iter().filter(|c| c != class).collect();
        self.set_attribute("class", &classes.join(" "))
    }

    pub fn toggle_class(&self, class: &str, force: Option<bool>) -> &Self {
        let add = force.unwrap_or(!self.has_class(class));
        if add { self.add_class(class) } else { self.remove_class(class) }
    }

    // Inline style

    fn inline_styles(&self) -> Vec<(String, String)> {
        self.attribute("style")
            .unwrap_or_default()
            .split(';')
            .filter_map(|decl| {
                let (name, value) = decl.split_once(':')?;
                let name = name.trim();
                (!name.is_empty()).then(|| (name.to_ascii_lowercase(), value.trim().to_string()))
            })
            .collect()
    }

    fn write_styles(&self, styles: &[(String, String)]) -> &Self {
        if styles.is_empty() {
            return self.remove_attribute("style");
        }
        let text: Vec<String> = styles.iter().map(|(n, v)| format!("{n}: {v};")).collect();
        self.set_attribute("style", &text.join(" "))
    }

    pub fn style(&self, name: &str) -> Option<String> {
        let name = name.to_ascii_lowercase();
        self.inline_styles().into_iter().find(|(n, _)| *n == name).map(|(_, v)| v)
    }

    pub fn set_style(&self, name: &str, value: &str) -> &Self {
        let name = name.to_ascii_lowercase();
        let mut styles = self.inline_styles();
        match styles.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value.to_string(),
            None => styles.push((name, value.to_string())),
        }
        self.write_styles(&styles)
    }

    pub fn remove_style(&self, name: &str) -> &Self {
        let name = name.to_ascii_lowercase();
        let styles: Vec<_> = self.inline_styles().into_iter().filter(|(n, _)| *n != name).collect();
        self.write_styles(&styles)
    }

    // Content and form state

    pub fn text(&self) -> String {
        self.read(|tree, node| tree.text_content(node))
    }

    pub fn set_text(&self, text: &str) -> &Self {
        self.write(|tree, node| tree.set_text_content(node, text));
        self
    }

    pub fn html(&self) -> String {
        self.read(|tree, node| tree.inner_html(node))
    }

    pub fn outer_html(&self) -> String {
        self.read(|tree, node| tree.outer_html(node))
    }

    pub fn set_html(&self, html: &str) -> CotomyResult<&Self> {
        self.write(|tree, node| tree.set_inner_html(node, html))?;
        Ok(self)
    }

    /// Control value for form controls, `data-value` otherwise
    pub fn value(&self) -> String {
        self.read(|tree, node| {
            if tree.element(node).is_some_and(|e| e.is_form_control()) {
                tree.value(node)
            } else {
                tree.attr(node, "data-value").unwrap_or_default().to_string()
            }
        })
    }

    pub fn set_value(&self, value: &str) -> &Self {
        self.write(|tree, node| {
            if tree.element(node).is_some_and(|e| e.is_form_control()) {
                tree.set_value(node, value);
            } else {
                tree.set_attr(node, "data-value", value);
            }
        });
        self
    }

    pub fn checked(&self) -> bool {
        self.read(|tree, node| tree.checked(node))
    }

    pub fn set_checked(&self, checked: bool) -> &Self {
        self.write(|tree, node| tree.set_checked(node, checked));
        self
    }

    pub fn readonly(&self) -> bool {
        self.has_attribute("readonly")
    }

    pub fn set_readonly(&self, readonly: bool) -> &Self {
        if readonly {
            self.set_attribute("readonly", "readonly")
        } else {
            self.remove_attribute("readonly")
        }
    }

    pub fn enabled(&self) -> bool {
        !self.has_attribute("disabled")
    }

    pub fn set_enabled(&self, enabled: bool) -> &Self {
        if enabled {
            self.remove_attribute("disabled")
        } else {
            self.set_attribute("disabled", "disabled")
        }
    }

    // Navigation

    /// Parent element, or an empty placeholder
    pub fn parent(&self) -> CotomyElement {
        let current = self.read(|tree, node| tree.parent_element(node));
        let Some(parent) = current else {
            *self.core.parent.borrow_mut() = Weak::new();
            return self.window.empty();
        };
        let cached = self.core.parent.borrow().upgrade();
        if let Some(core) = cached.filter(|c| c.node() == parent && c.state() != ElementState::Removed) {
            return Self::from_parts(Rc::clone(&self.window), core);
        }
        let element = self.window.wrap(parent);
        *self.core.parent.borrow_mut() = Rc::downgrade(&element.core);
        element
    }

    /// Ancestor elements, nearest first
    pub fn parents(&self) -> Vec<CotomyElement> {
        let nodes = self.read(|tree, node| {
            tree.ancestors(node)
                .into_iter()
                .filter(|n| tree.is_element(*n))
                .collect::<Vec<_>>()
        });
        nodes.into_iter().map(|n| self.window.wrap(n)).collect()
    }

    /// Child elements, optionally filtered by `selector`
    pub fn children(&self, selector: Option<&str>) -> CotomyResult<Vec<CotomyElement>> {
        let filter = selector.map(SelectorList::parse).transpose()?;
        let nodes = self.read(|tree, node| {
            tree.element_children(node)
                .into_iter()
                .filter(|c| filter.as_ref().is_none_or(|f| f.matches(tree, *c)))
                .collect::<Vec<_>>()
        });
        Ok(nodes.into_iter().map(|n| self.window.wrap(n)).collect())
    }

    pub fn first_child(&self, selector: Option<&str>) -> CotomyResult<Option<CotomyElement>> {
        Ok(self.children(selector)?.into_iter().next())
    }

    pub fn last_child(&self, selector: Option<&str>) -> CotomyResult<Option<CotomyElement>> {
        Ok(self.children(selector)?.into_iter().next_back())
    }

    pub fn previous_sibling(&self) -> Option<CotomyElement> {
        let node = self.read(|tree, node| {
            let mut cursor = tree.previous_sibling(node);
            while let Some(n) = cursor {
                if tree.is_element(n) {
                    return Some(n);
                }
                cursor = tree.previous_sibling(n);
            }
            None
        })?;
        Some(self.window.wrap(node))
    }

    pub fn next_sibling(&self) -> Option<CotomyElement> {
        let node = self.read(|tree, node| {
            let mut cursor = tree.next_sibling(node);
            while let Some(n) = cursor {
                if tree.is_element(n) {
                    return Some(n);
                }
                cursor = tree.next_sibling(n);
            }
            None
        })?;
        Some(self.window.wrap(node))
    }

    /// Nearest inclusive ancestor matching `selector`
    pub fn closest(&self, selector: &str) -> CotomyResult<Option<CotomyElement>> {
        let node = self.read(|tree, node| tree.closest(node, selector))?;
        Ok(node.map(|n| self.window.wrap(n)))
    }

    pub fn closest_as<T: ElementWrap>(&self, selector: &str) -> CotomyResult<Option<T>> {
        Ok(self.closest(selector)?.map(T::wrap))
    }

    /// Descendants matching `selector`
    pub fn find(&self, selector: &str) -> CotomyResult<Vec<CotomyElement>> {
        let nodes = self.read(|tree, node| tree.query_selector_all(node, selector))?;
        Ok(nodes.into_iter().map(|n| self.window.wrap(n)).collect())
    }

    pub fn find_as<T: ElementWrap>(&self, selector: &str) -> CotomyResult<Vec<T>> {
        Ok(self.find(selector)?.into_iter().map(T::wrap).collect())
    }

    pub fn first(&self, selector: &str) -> CotomyResult<Option<CotomyElement>> {
        let node = self.read(|tree, node| tree.query_selector(node, selector))?;
        Ok(node.map(|n| self.window.wrap(n)))
    }

    pub fn first_as<T: ElementWrap>(&self, selector: &str) -> CotomyResult<Option<T>> {
        Ok(self.first(selector)?.map(T::wrap))
    }

    pub fn contains(&self, selector: &str) -> CotomyResult<bool> {
        Ok(self.read(|tree, node| tree.query_selector(node, selector))?.is_some())
    }

    // Tree mutation

    /// Run `op` on this element's node inside a transit scope
    fn transit(&self, op: impl FnOnce(&mut DomTree, NodeId) -> DomResult<()>) -> CotomyResult<()> {
        if self.is_removed() {
            return Err(CotomyError::RemovedElement);
        }
        let _scope = TransitScope::begin(self);
        self.write(op)?;
        self.window.materialize_styles(self.node());
        Ok(())
    }

    pub fn append(&self, child: &CotomyElement) -> CotomyResult<&Self> {
        let parent = self.node();
        child.transit(|tree, node| tree.append_child(parent, node))?;
        Ok(self)
    }

    pub fn appends(&self, children: &[CotomyElement]) -> CotomyResult<&Self> {
        for child in children {
            self.append(child)?;
        }
        Ok(self)
    }

    pub fn prepend(&self, child: &CotomyElement) -> CotomyResult<&Self> {
        let parent = self.node();
        child.transit(|tree, node| tree.prepend_child(parent, node))?;
        Ok(self)
    }

    /// Place `other` right before this element
    pub fn insert_before(&self, other: &CotomyElement) -> CotomyResult<&Self> {
        let sibling = self.node();
        other.transit(|tree, node| tree.insert_sibling_before(sibling, node))?;
        Ok(self)
    }

    /// Place `other` right after this element
    pub fn insert_after(&self, other: &CotomyElement) -> CotomyResult<&Self> {
        let sibling = self.node();
        other.transit(|tree, node| tree.insert_sibling_after(sibling, node))?;
        Ok(self)
    }

    pub fn append_to(&self, parent: &CotomyElement) -> CotomyResult<&Self> {
        parent.append(self)?;
        Ok(self)
    }

    pub fn prepend_to(&self, parent: &CotomyElement) -> CotomyResult<&Self> {
        parent.prepend(self)?;
        Ok(self)
    }

    /// Detach and run the removal transition now
    pub fn remove(&self) {
        if self.is_removed() {
            return;
        }
        let node = self.node();
        if let Err(e) = self.write(|tree, node| tree.remove(node)) {
            tracing::warn!("Failed to detach {}: {}", node, e);
        }
        self.window.retire_subtree(node);
    }

    /// Remove every child
    pub fn clear(&self) -> &Self {
        self.write(|tree, node| tree.remove_children(node));
        self
    }

    /// Deep copy with fresh instance ids; the scope id is kept
    pub fn clone_element(&self) -> CotomyResult<CotomyElement> {
        if self.is_removed() {
            return Err(CotomyError::RemovedElement);
        }
        let copy = self.write(|tree, node| -> DomResult<NodeId> {
            let copy = tree.clone_subtree(node)?;
            let nodes: Vec<NodeId> = std::iter::once(copy).chain(tree.descendants(copy)).collect();
            for n in nodes {
                tree.remove_attr(n, MOVING_ATTR);
                if tree.has_attr(n, INSTANCE_ATTR) {
                    tree.set_attr(n, INSTANCE_ATTR, new_instance_id());
                }
            }
            Ok(copy)
        })?;
        Ok(self.window.wrap(copy))
    }

    // Events

    fn dispatch(&self, mut event: DomEvent) -> bool {
        self.window.dispatch(self.node(), &mut event)
    }

    fn register(&self, event: &str, entry: HandlerEntry) {
        if self.is_removed() {
            return;
        }
        self.window.register(&self.core.instance_id, self.node(), event, entry);
    }

    pub fn on(&self, events: impl Into<EventNames>, handler: &EventHandler) -> &Self {
        self.on_with(events, handler, ListenerOptions::default())
    }

    pub fn on_with(&self, events: impl Into<EventNames>, handler: &EventHandler, options: ListenerOptions) -> &Self {
        for event in events.into().iter() {
            self.register(event, HandlerEntry::new(handler.clone(), None, options.clone()));
        }
        self
    }

    pub fn once(&self, events: impl Into<EventNames>, handler: &EventHandler) -> &Self {
        self.once_with(events, handler, ListenerOptions::default())
    }

    pub fn once_with(&self, events: impl Into<EventNames>, handler: &EventHandler, options: ListenerOptions) -> &Self {
        let options = ListenerOptions { once: true, ..options };
        self.on_with(events, handler, options)
    }

    /// Delegate: `handler` runs when the event came from a descendant matching `selector`
    pub fn on_sub_tree(&self, events: impl Into<EventNames>, selector: &str, handler: &EventHandler) -> CotomyResult<&Self> {
        self.on_sub_tree_with(events, selector, handler, ListenerOptions::default())
    }

    pub fn on_sub_tree_with(
        &self,
        events: impl Into<EventNames>,
        selector: &str,
        handler: &EventHandler,
        options: ListenerOptions,
    ) -> CotomyResult<&Self> {
        let wrapper = delegate(Rc::downgrade(&self.window), SelectorList::parse(selector)?, handler.clone());
        for event in events.into().iter() {
            self.register(
                event,
                HandlerEntry::new(handler.clone(), Some(wrapper.clone()), options.clone()),
            );
        }
        Ok(self)
    }

    /// Remove every handler for `events`, or those registered with `handler` and default options
    pub fn off(&self, events: impl Into<EventNames>, handler: Option<&EventHandler>) -> &Self {
        let pattern = handler.map(|h| HandlerEntry::new(h.clone(), None, ListenerOptions::default()));
        for event in events.into().iter() {
            self.window.unregister(&self.core.instance_id, event, pattern.as_ref());
        }
        self
    }

    pub fn off_with(&self, events: impl Into<EventNames>, handler: &EventHandler, options: ListenerOptions) -> &Self {
        let pattern = HandlerEntry::new(handler.clone(), None, options);
        for event in events.into().iter() {
            self.window.unregister(&self.core.instance_id, event, Some(&pattern));
        }
        self
    }

    /// Registered handlers for `event`
    pub fn handler_count(&self, event: &str) -> usize {
        self.window.registered(&self.core.instance_id, event)
    }

    /// Dispatch a bubbling, cancelable event
    pub fn trigger(&self, event: &str) -> &Self {
        self.dispatch(DomEvent::bubbling(event));
        self
    }

    /// Dispatch `event` with its own flags; false when cancelled
    pub fn trigger_event(&self, event: DomEvent) -> bool {
        self.dispatch(event)
    }

    /// Dispatch a bubbling, cancelable event carrying `detail`
    pub fn trigger_detail<T: 'static>(&self, event: &str, detail: T) -> bool {
        self.dispatch(DomEvent::bubbling(event).with_detail(detail))
    }

    pub fn click(&self) -> &Self {
        self.trigger("click")
    }

    pub fn change(&self) -> &Self {
        self.trigger("change")
    }

    pub fn input(&self) -> &Self {
        self.trigger("input")
    }

    pub fn focus(&self) -> &Self {
        self.trigger_event(DomEvent::new("focus"));
        self
    }

    pub fn blur(&self) -> &Self {
        self.trigger_event(DomEvent::new("blur"));
        self
    }

    /// Handler for the `removed` signal
    pub fn removed(&self, handler: &EventHandler) -> &Self {
        self.on("removed", handler)
    }

    /// Opt in to `cotomy:resize`, `cotomy:scroll` and `cotomy:changelayout`
    pub fn listen_layout_events(&self) -> &Self {
        self.set_attribute(LAYOUT_ATTR, "")
    }

    pub fn resize(&self, handler: &EventHandler) -> &Self {
        self.listen_layout_events().on("cotomy:resize", handler)
    }

    pub fn scroll(&self, handler: &EventHandler) -> &Self {
        self.listen_layout_events().on("cotomy:scroll", handler)
    }

    pub fn changelayout(&self, handler: &EventHandler) -> &Self {
        self.listen_layout_events().on("cotomy:changelayout", handler)
    }
}

/// Wrapper that finds the nearest match between `event.target` and the listening element
fn delegate(window: Weak<CotomyWindow>, selector: SelectorList, handler: EventHandler) -> EventHandler {
    EventHandler::new(move |event| {
        let Some(window) = window.upgrade() else {
            return;
        };
        let (Some(target), Some(scope)) = (event.target, event.current_target) else {
            return;
        };
        let matched = {
            let doc = window.document();
            let tree = doc.tree();
            let mut cursor = Some(target);
            let mut found = None;
            while let Some(node) = cursor {
                if selector.matches(tree, node) {
                    found = Some(node);
                    break;
                }
                if node == scope {
                    break;
                }
                cursor = tree.parent(node);
            }
            found
        };
        if let Some(node) = matched {
            let previous = event.delegate_target.replace(node);
            handler.call(event);
            event.delegate_target = previous;
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::WindowConfig;
    use cotomy_net::mock::MockTransport;
    use pretty_assertions::assert_eq;

    fn window() -> Rc<CotomyWindow> {
        CotomyWindow::with_config("https://example.com/", Rc::new(MockTransport::new()), WindowConfig::utc())
    }

    fn counter() -> (Rc<Cell<usize>>, EventHandler) {
        let count = Rc::new(Cell::new(0));
        let seen = Rc::clone(&count);
        (count, EventHandler::new(move |_| seen.set(seen.get() + 1)))
    }

    #[test]
    fn test_scope_id_is_lazy_and_stable() {
        let window = window();
        let div = window.create("<div></div>").unwrap();
        assert!(!div.has_attribute(SCOPE_ATTR));
        let scope = div.scope_id();
        assert!(scope.starts_with('_'));
        assert_eq!(div.scope_id(), scope);
        assert_eq!(window.wrap(div.node()).scope_id(), scope);
        assert!(div.has_attribute(&scope));
    }

    #[test]
    fn test_scoped_css() {
        let window = window();
        let div = window.create("<div></div>").unwrap();
        window.append(&div).unwrap();
        div.use_scoped_css("[scope] p { color: red; }").unwrap();

        let scope = div.scope_id();
        let style = window.by_id(&format!("css-{scope}")).unwrap();
        assert_eq!(style.text(), format!("[{scope}] p {{ color: red; }}"));

        let script = window.create("<script></script>").unwrap();
        script.use_scoped_css("[scope] {}").unwrap();
        assert!(!script.has_attribute(SCOPE_ATTR));
    }

    #[test]
    fn test_inline_style() {
        let window = window();
        let div = window.create(r#"<div style="color: red; Margin: 0"></div>"#).unwrap();
        assert_eq!(div.style("margin").as_deref(), Some("0"));
        div.set_style("color", "blue").remove_style("margin");
        assert_eq!(div.attribute("style").as_deref(), Some("color: blue;"));
        div.remove_style("color");
        assert!(!div.has_attribute("style"));
    }

    #[test]
    fn test_classes() {
        let window = window();
        let div = window.create(r#"<div class="a b"></div>"#).unwrap();
        div.add_class("c").remove_class("a").toggle_class("b", None);
        assert_eq!(div.classes(), vec!["c".to_string()]);
    }

    #[test]
    fn test_value_of_non_control() {
        let window = window();
        let div = window.create(r#"<div data-value="7"></div>"#).unwrap();
        assert_eq!(div.value(), "7");
        let input = window.create(r#"<input name="a" value="x">"#).unwrap();
        input.set_value("y");
        assert_eq!(input.value(), "y");
    }

    #[test]
    fn test_navigation() {
        let window = window();
        let list = window
            .create(r#"<ul><li class="a">1</li><li>2</li><li class="a">3</li></ul>"#)
            .unwrap();
        assert_eq!(list.children(None).unwrap().len(), 3);
        assert_eq!(list.children(Some(".a")).unwrap().len(), 2);
        let last = list.last_child(None).unwrap().unwrap();
        assert_eq!(last.text(), "3");
        assert_eq!(last.parent(), list);
        assert_eq!(last.parent(), list);
        assert_eq!(last.previous_sibling().unwrap().text(), "2");
        assert_eq!(last.closest("ul").unwrap().unwrap(), list);
        assert!(list.parent().empty());
    }

    #[test]
    fn test_detached_parent_reuses_placeholder() {
        let window = window();
        let item = window.create("<p></p>").unwrap();
        let first = item.parent();
        let instances = window.instance_count();
        for _ in 0..5 {
            assert_eq!(item.parent(), first);
        }
        assert_eq!(window.instance_count(), instances);

        let host = window.create("<div></div>").unwrap();
        host.append(&first).unwrap();
        let fresh = item.parent();
        assert_ne!(fresh, first);
        assert!(fresh.empty());
    }

    #[test]
    fn test_generate_id() {
        let window = window();
        let div = window.create("<div></div>").unwrap();
        div.generate_id("__item__");
        let id = div.id().unwrap();
        assert!(id.starts_with("__item__"));
        div.generate_id("__other__");
        assert_eq!(div.id().unwrap(), id);
    }

    #[test]
    fn test_off_with_list() {
        let window = window();
        let div = window.create("<div></div>").unwrap();
        let (count, handler) = counter();
        div.on(["a", "b"], &handler);
        div.trigger("a").trigger("b");
        assert_eq!(count.get(), 2);
        div.off(["a", "b"], Some(&handler));
        div.trigger("a").trigger("b");
        assert_eq!(count.get(), 2);
        assert!(!window.has_registry(div.instance_id()));
    }

    #[test]
    fn test_trigger_event_honours_flags() {
        let window = window();
        let outer = window.create("<div><span></span></div>").unwrap();
        let inner = outer.first("span").unwrap().unwrap();
        let (count, handler) = counter();
        outer.on("ping", &handler);

        inner.trigger("ping");
        assert_eq!(count.get(), 1);
        inner.trigger_event(DomEvent::new("ping"));
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_delegate_target() {
        let window = window();
        let list = window.create(r#"<ul><li><b>x</b></li></ul>"#).unwrap();
        let bold = list.first("b").unwrap().unwrap();
        let item = list.first("li").unwrap().unwrap();
        let target = Rc::new(Cell::new(None));
        let seen = Rc::clone(&target);
        list.on_sub_tree("click", "li", &EventHandler::new(move |e| seen.set(e.delegate_target)))
            .unwrap();
        bold.click();
        assert_eq!(target.get(), Some(item.node()));
    }

    #[test]
    fn test_removed_element_is_inert() {
        let window = window();
        let div = window.create(r#"<div id="a"></div>"#).unwrap();
        window.append(&div).unwrap();
        let original = div.node();
        div.remove();

        assert!(div.is_removed());
        assert_ne!(div.node(), original);
        div.set_attribute("title", "x");
        assert_eq!(window.document().tree().attr(original, "title"), None);
        assert!(matches!(div.clone_element(), Err(CotomyError::RemovedElement)));

        let (count, handler) = counter();
        div.on("click", &handler);
        div.click();
        assert_eq!(count.get(), 0);
    }
}
