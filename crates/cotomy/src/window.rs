//! Window facade
//!
//! Per-run context owning the host document, the event registry, the table
//! of live element cores, scoped stylesheet sources and a local executor for
//! form tasks. Child-list mutation records are delivered by
//! [`CotomyWindow::flush_mutations`], which raises `removed` on every wrapped
//! element that left the tree for good.

use std::cell::{Cell, Ref, RefCell, RefMut};
use std::collections::HashMap;
use std::future::Future;
use std::ops::Range;
use std::rc::{Rc, Weak};

use cotomy_dom::{DomError, DomEvent, Document, ListenerOptions, NodeId, dispatch_event, parse_fragment};
use cotomy_net::{ApiClient, Transport};
use smol::LocalExecutor;
use url::Url;

use crate::element::{
    CotomyElement, ElementCore, ElementState, ElementWrap, INSTANCE_ATTR, LAYOUT_ATTR, MOVING_ATTR, SCOPE_ATTR,
    new_instance_id,
};
use crate::events::{EventHandler, EventNames, EventRegistry, HandlerEntry};
use crate::{CotomyError, CotomyResult, DebugFeature, DebugSettings, WindowConfig};

/// Registry identity of the window itself
const WINDOW_INSTANCE: &str = "__cotomy_window__";

/// Window events that also signal a layout change
const LAYOUT_SOURCES: [&str; 5] = ["resize", "scroll", "orientationchange", "fullscreenchange", "cotomy:ready"];

/// Rounds of flushing before records queued by `removed` handlers are left for the next flush
const MAX_FLUSH_ROUNDS: usize = 16;

/// Detail of a `pageshow` event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PageTransition {
    /// Page restored from the back/forward cache
    pub persisted: bool,
}

/// Per-run window context
pub struct CotomyWindow {
    document: RefCell<Document>,
    registry: RefCell<EventRegistry>,
    instances: RefCell<HashMap<String, Rc<ElementCore>>>,
    /// Scope id -> rendered stylesheet
    styles: RefCell<HashMap<String, String>>,
    /// Nodes carrying the moving marker until the next flush
    moving: RefCell<Vec<NodeId>>,
    /// Moved node and the record sequences its move queued
    transits: RefCell<Vec<(NodeId, Range<u64>)>>,
    /// Node handed out by [`CotomyWindow::empty`]
    placeholder: Cell<Option<NodeId>>,
    executor: LocalExecutor<'static>,
    config: WindowConfig,
    debug: RefCell<DebugSettings>,
    transport: Rc<dyn Transport>,
    initialized: Cell<bool>,
    reloading: Cell<bool>,
    navigations: RefCell<Vec<String>>,
}

impl CotomyWindow {
    /// Window over an empty document at `url`
    pub fn new(url: &str, transport: Rc<dyn Transport>) -> Rc<Self> {
        Self::with_config(url, transport, WindowConfig::default())
    }

    pub fn with_config(url: &str, transport: Rc<dyn Transport>, config: WindowConfig) -> Rc<Self> {
        tracing::debug!("Creating window at {}", url);
        Rc::new(Self {
            document: RefCell::new(Document::new(url)),
            registry: RefCell::new(EventRegistry::new()),
            instances: RefCell::new(HashMap::new()),
            styles: RefCell::new(HashMap::new()),
            moving: RefCell::new(Vec::new()),
            transits: RefCell::new(Vec::new()),
            placeholder: Cell::new(None),
            executor: LocalExecutor::new(),
            config,
            debug: RefCell::new(DebugSettings::from_env()),
            transport,
            initialized: Cell::new(false),
            reloading: Cell::new(false),
            navigations: RefCell::new(Vec::new()),
        })
    }

    // Document access

    pub fn document(&self) -> Ref<'_, Document> {
        self.document.borrow()
    }

    pub fn document_mut(&self) -> RefMut<'_, Document> {
        self.document.borrow_mut()
    }

    pub fn config(&self) -> &WindowConfig {
        &self.config
    }

    pub fn debug(&self) -> Ref<'_, DebugSettings> {
        self.debug.borrow()
    }

    pub fn debug_mut(&self) -> RefMut<'_, DebugSettings> {
        self.debug.borrow_mut()
    }

    pub(crate) fn debugging(&self, feature: DebugFeature) -> bool {
        self.debug.borrow().is_enabled(Some(feature))
    }

    pub fn transport(&self) -> Rc<dyn Transport> {
        Rc::clone(&self.transport)
    }

    /// Client configured from [`WindowConfig::api`]
    pub fn api_client(&self) -> ApiClient {
        ApiClient::with_config(self.config.api.clone(), self.transport())
    }

    // Location

    pub fn location(&self) -> String {
        self.document.borrow().url().to_string()
    }

    /// Move to `url`, resolved against the current location; the document stays
    pub fn navigate(&self, url: &str) {
        let target = Url::parse(&self.location())
            .and_then(|base| base.join(url))
            .map(String::from)
            .unwrap_or_else(|_| url.to_string());
        tracing::info!("Navigating to {}", target);
        self.document.borrow_mut().set_url(&target);
        self.navigations.borrow_mut().push(target);
    }

    /// Request a reload of the current location
    pub fn reload(&self) {
        let url = self.location();
        tracing::info!("Reloading {}", url);
        self.reloading.set(true);
        self.navigations.borrow_mut().push(url);
    }

    /// Whether a reload was requested
    pub fn reloading(&self) -> bool {
        self.reloading.get()
    }

    /// Locations requested through [`navigate`](Self::navigate) and [`reload`](Self::reload)
    pub fn navigations(&self) -> Vec<String> {
        self.navigations.borrow().clone()
    }

    // Elements

    /// Wrapper for `node`; wrappers over one node share a lifecycle core
    pub fn wrap(self: &Rc<Self>, node: NodeId) -> CotomyElement {
        let core = self.core_for(node);
        CotomyElement::from_parts(Rc::clone(self), core)
    }

    pub fn wrap_as<T: ElementWrap>(self: &Rc<Self>, node: NodeId) -> T {
        T::wrap(self.wrap(node))
    }

    fn core_for(&self, node: NodeId) -> Rc<ElementCore> {
        let existing = self.document.borrow().tree().attr(node, INSTANCE_ATTR).map(str::to_string);
        if let Some(id) = &existing {
            if let Some(core) = self.instances.borrow().get(id) {
                if core.node() == node {
                    return Rc::clone(core);
                }
            }
        }

        // An id already owned by another node was copied outside clone_element
        let id = match existing {
            Some(id) if !self.instances.borrow().contains_key(&id) => id,
            _ => new_instance_id(),
        };
        self.document.borrow_mut().tree_mut().set_attr(node, INSTANCE_ATTR, id.clone());
        let core = Rc::new(ElementCore::new(node, id.clone()));
        self.instances.borrow_mut().insert(id, Rc::clone(&core));
        core
    }

    /// Detached element parsed from `html`
    pub fn create(self: &Rc<Self>, html: &str) -> CotomyResult<CotomyElement> {
        if self.debugging(DebugFeature::Html) {
            tracing::debug!("Creating element from HTML: {}", html);
        }
        let node = {
            let mut doc = self.document.borrow_mut();
            parse_fragment(doc.tree_mut(), html).map_err(|e| match e {
                DomError::EmptyFragment => CotomyError::InvalidHtml,
                other => CotomyError::Dom(other),
            })?
        };
        Ok(self.wrap(node))
    }

    pub fn create_as<T: ElementWrap>(self: &Rc<Self>, html: &str) -> CotomyResult<T> {
        self.create(html).map(T::wrap)
    }

    /// Detached inert placeholder, shared until it is attached, filled or removed
    pub fn empty(self: &Rc<Self>) -> CotomyElement {
        if let Some(node) = self.placeholder.get() {
            let reusable = {
                let doc = self.document.borrow();
                let tree = doc.tree();
                tree.parent(node).is_none() && tree.children(node).is_empty() && tree.has_attr(node, "data-empty")
            };
            if reusable && self.core_state(node) == Some(ElementState::Live) {
                return self.wrap(node);
            }
        }
        let node = {
            let mut doc = self.document.borrow_mut();
            let tree = doc.tree_mut();
            let node = tree.create_element("div");
            tree.set_attr(node, "data-empty", "");
            tree.set_attr(node, "style", "display: none;");
            node
        };
        self.placeholder.set(Some(node));
        self.wrap(node)
    }

    pub fn body(self: &Rc<Self>) -> CotomyElement {
        let body = self.document.borrow().body();
        self.wrap(body)
    }

    pub fn head(self: &Rc<Self>) -> CotomyElement {
        let head = self.document.borrow().head();
        self.wrap(head)
    }

    /// Append to `<body>`
    pub fn append(self: &Rc<Self>, element: &CotomyElement) -> CotomyResult<()> {
        self.body().append(element).map(|_| ())
    }

    /// All connected elements matching `selector`
    pub fn find(self: &Rc<Self>, selector: &str) -> CotomyResult<Vec<CotomyElement>> {
        let nodes = self.document.borrow().tree().query_selector_all(NodeId::ROOT, selector)?;
        Ok(nodes.into_iter().map(|n| self.wrap(n)).collect())
    }

    pub fn find_as<T: ElementWrap>(self: &Rc<Self>, selector: &str) -> CotomyResult<Vec<T>> {
        Ok(self.find(selector)?.into_iter().map(T::wrap).collect())
    }

    pub fn first(self: &Rc<Self>, selector: &str) -> CotomyResult<Option<CotomyElement>> {
        let node = self.document.borrow().tree().query_selector(NodeId::ROOT, selector)?;
        Ok(node.map(|n| self.wrap(n)))
    }

    pub fn first_as<T: ElementWrap>(self: &Rc<Self>, selector: &str) -> CotomyResult<Option<T>> {
        Ok(self.first(selector)?.map(T::wrap))
    }

    pub fn by_id(self: &Rc<Self>, id: &str) -> Option<CotomyElement> {
        let node = self.document.borrow().get_element_by_id(id)?;
        Some(self.wrap(node))
    }

    pub fn contains(&self, selector: &str) -> CotomyResult<bool> {
        Ok(self.document.borrow().tree().query_selector(NodeId::ROOT, selector)?.is_some())
    }

    pub(crate) fn instance_count(&self) -> usize {
        self.instances.borrow().len()
    }

    // Registration plumbing for element wrappers

    pub(crate) fn register(&self, instance: &str, target: NodeId, event: &str, entry: HandlerEntry) -> bool {
        let mut registry = self.registry.borrow_mut();
        let mut doc = self.document.borrow_mut();
        registry.on(doc.listeners_mut(), instance, target, event, entry)
    }

    pub(crate) fn unregister(&self, instance: &str, event: &str, pattern: Option<&HandlerEntry>) -> usize {
        let mut registry = self.registry.borrow_mut();
        let mut doc = self.document.borrow_mut();
        registry.off(doc.listeners_mut(), instance, event, pattern)
    }

    pub(crate) fn registered(&self, instance: &str, event: &str) -> usize {
        let mut registry = self.registry.borrow_mut();
        let mut doc = self.document.borrow_mut();
        registry.count(doc.listeners_mut(), instance, event)
    }

    /// Whether `instance` still owns a handler registry
    pub fn has_registry(&self, instance: &str) -> bool {
        self.registry.borrow().contains(instance)
    }

    /// Dispatch `event` at `target`; false when a listener cancelled it
    pub fn dispatch(&self, target: NodeId, event: &mut DomEvent) -> bool {
        dispatch_event(&self.document, target, event)
    }

    // Window events

    pub fn on(&self, events: impl Into<EventNames>, handler: &EventHandler) -> &Self {
        self.on_with(events, handler, ListenerOptions::default())
    }

    pub fn on_with(&self, events: impl Into<EventNames>, handler: &EventHandler, options: ListenerOptions) -> &Self {
        for event in events.into().iter() {
            let entry = HandlerEntry::new(handler.clone(), None, options.clone());
            self.register(WINDOW_INSTANCE, NodeId::ROOT, event, entry);
        }
        self
    }

    pub fn once(&self, events: impl Into<EventNames>, handler: &EventHandler) -> &Self {
        self.on_with(events, handler, ListenerOptions::once())
    }

    pub fn off(&self, events: impl Into<EventNames>, handler: Option<&EventHandler>) -> &Self {
        for event in events.into().iter() {
            let pattern = handler.map(|h| HandlerEntry::new(h.clone(), None, ListenerOptions::default()));
            self.unregister(WINDOW_INSTANCE, event, pattern.as_ref());
        }
        self
    }

    /// Dispatch a plain event at the window
    pub fn trigger(&self, event: &str) -> bool {
        self.trigger_event(DomEvent::new(event))
    }

    pub fn trigger_event(&self, mut event: DomEvent) -> bool {
        self.dispatch(NodeId::ROOT, &mut event)
    }

    pub fn load(&self, handler: &EventHandler) -> &Self {
        self.on("load", handler)
    }

    pub fn ready(&self, handler: &EventHandler) -> &Self {
        self.on("cotomy:ready", handler)
    }

    /// Register a `resize` handler, or dispatch `resize` with `None`
    pub fn resize(&self, handler: Option<&EventHandler>) -> &Self {
        self.on_or_trigger("resize", handler)
    }

    /// Register a `scroll` handler, or dispatch `scroll` with `None`
    pub fn scroll(&self, handler: Option<&EventHandler>) -> &Self {
        self.on_or_trigger("scroll", handler)
    }

    /// Register a `cotomy:changelayout` handler, or dispatch it with `None`
    pub fn change_layout(&self, handler: Option<&EventHandler>) -> &Self {
        self.on_or_trigger("cotomy:changelayout", handler)
    }

    /// Register a `pageshow` handler
    pub fn pageshow(&self, handler: &EventHandler) -> &Self {
        self.on("pageshow", handler)
    }

    /// Dispatch `pageshow` with a [`PageTransition`] detail
    pub fn show_page(&self, persisted: bool) -> bool {
        self.trigger_event(DomEvent::new("pageshow").with_detail(PageTransition { persisted }))
    }

    fn on_or_trigger(&self, event: &str, handler: Option<&EventHandler>) -> &Self {
        match handler {
            Some(h) => {
                self.on(event, h);
            }
            None => {
                self.trigger(event);
            }
        }
        self
    }

    /// Install the layout rebroadcast and drag guards; later calls are no-ops
    pub fn initialize(self: &Rc<Self>) {
        if self.initialized.replace(true) {
            return;
        }
        tracing::debug!("Initializing window");

        let weak = Rc::downgrade(self);
        let changed = EventHandler::new(move |_| {
            if let Some(window) = weak.upgrade() {
                window.trigger("cotomy:changelayout");
            }
        });
        for event in LAYOUT_SOURCES {
            self.on_with(event, &changed, ListenerOptions::passive());
        }

        self.on(
            "dragover",
            &EventHandler::new(|event| {
                event.stop_propagation();
                event.prevent_default();
            }),
        );

        for (source, target) in [
            ("resize", "cotomy:resize"),
            ("scroll", "cotomy:scroll"),
            ("cotomy:changelayout", "cotomy:changelayout"),
        ] {
            self.on(source, &Self::rebroadcast(Rc::downgrade(self), target));
        }
    }

    pub fn initialized(&self) -> bool {
        self.initialized.get()
    }

    fn rebroadcast(window: Weak<Self>, event: &'static str) -> EventHandler {
        EventHandler::new(move |_| {
            let Some(window) = window.upgrade() else {
                return;
            };
            let selector = format!("[{LAYOUT_ATTR}]");
            let targets = window
                .document
                .borrow()
                .tree()
                .query_selector_all(NodeId::ROOT, &selector)
                .unwrap_or_default();
            for target in targets {
                window.dispatch(target, &mut DomEvent::new(event));
            }
        })
    }

    // Lifecycle

    /// Deliver queued mutation records
    pub fn flush_mutations(self: &Rc<Self>) {
        for _ in 0..MAX_FLUSH_ROUNDS {
            let records = self.document.borrow_mut().tree_mut().take_records();
            if records.is_empty() {
                break;
            }

            for record in &records {
                for &node in &record.removed_nodes {
                    if self.survives_removal(node, record.sequence) {
                        continue;
                    }
                    self.retire_subtree(node);
                }
            }

            for node in records.iter().flat_map(|r| r.added_nodes.iter().copied()) {
                if self.document.borrow().tree().is_connected(node) {
                    self.materialize_styles(node);
                }
            }
        }
        let drained = self.mutation_sequence();
        self.transits.borrow_mut().retain(|(_, records)| records.end > drained);
        self.clear_moving();
    }

    /// Connected again, or removed by its own move
    fn survives_removal(&self, node: NodeId, sequence: u64) -> bool {
        if self.document.borrow().tree().is_connected(node) {
            return true;
        }
        self.transits
            .borrow()
            .iter()
            .any(|(moved, records)| *moved == node && records.contains(&sequence))
    }

    pub(crate) fn mutation_sequence(&self) -> u64 {
        self.document.borrow().tree().mutation_sequence()
    }

    /// Exempt the records `node`'s move queued since `first_record`
    pub(crate) fn note_transit(&self, node: NodeId, first_record: u64) {
        let end = self.mutation_sequence();
        if end > first_record {
            self.transits.borrow_mut().push((node, first_record..end));
        }
    }

    pub(crate) fn mark_moving(&self, node: NodeId) {
        self.document.borrow_mut().tree_mut().set_attr(node, MOVING_ATTR, "");
        self.moving.borrow_mut().push(node);
    }

    fn clear_moving(&self) {
        let nodes: Vec<NodeId> = self.moving.borrow_mut().drain(..).collect();
        let mut still_moving = Vec::new();
        for node in nodes {
            if self.core_state(node) == Some(ElementState::Transiting) {
                still_moving.push(node);
                continue;
            }
            self.document.borrow_mut().tree_mut().remove_attr(node, MOVING_ATTR);
        }
        self.moving.borrow_mut().extend(still_moving);
    }

    fn core_state(&self, node: NodeId) -> Option<ElementState> {
        let id = self.document.borrow().tree().attr(node, INSTANCE_ATTR)?.to_string();
        self.instances.borrow().get(&id).map(|c| c.state())
    }

    fn wrapped_core(&self, node: NodeId) -> Option<Rc<ElementCore>> {
        let id = self.document.borrow().tree().attr(node, INSTANCE_ATTR)?.to_string();
        self.instances
            .borrow()
            .get(&id)
            .filter(|c| c.node() == node)
            .cloned()
    }

    /// Run the removal transition for `root` and every wrapped descendant
    pub(crate) fn retire_subtree(self: &Rc<Self>, root: NodeId) {
        let nodes: Vec<NodeId> = {
            let doc = self.document.borrow();
            std::iter::once(root).chain(doc.tree().descendants(root)).collect()
        };
        for node in nodes {
            if let Some(core) = self.wrapped_core(node) {
                self.retire(&core);
            }
        }
    }

    /// Terminal `Live -> Removed` transition
    pub(crate) fn retire(self: &Rc<Self>, core: &Rc<ElementCore>) {
        if core.state() == ElementState::Removed {
            return;
        }
        let node = core.node();
        let instance = core.instance_id().to_string();

        self.dispatch(node, &mut DomEvent::new("removed"));

        {
            let mut registry = self.registry.borrow_mut();
            let mut doc = self.document.borrow_mut();
            registry.release(doc.listeners_mut(), &instance);
        }

        let scope = {
            let mut doc = self.document.borrow_mut();
            let tree = doc.tree_mut();
            tree.remove_attr(node, INSTANCE_ATTR);
            let scope = tree.attr(node, SCOPE_ATTR).map(str::to_string);
            let placeholder = tree.create_element("div");
            tree.set_attr(placeholder, "data-empty", "");
            core.retire(placeholder);
            scope
        };
        self.instances.borrow_mut().remove(&instance);
        if let Some(scope) = scope {
            self.release_scope(&scope);
        }
        tracing::debug!("Element {} removed", instance);
    }

    // Scoped stylesheets

    /// Store and inject the stylesheet of `scope`
    pub(crate) fn register_style(&self, scope: &str, css: String) -> CotomyResult<()> {
        self.styles.borrow_mut().insert(scope.to_string(), css.clone());
        self.remove_style(scope);
        self.inject_style(scope, &css)
    }

    fn inject_style(&self, scope: &str, css: &str) -> CotomyResult<()> {
        let mut doc = self.document.borrow_mut();
        let head = doc.head();
        let tree = doc.tree_mut();
        let style = tree.create_element("style");
        tree.set_attr(style, "id", format!("css-{scope}"));
        let text = tree.create_text(css);
        tree.append_child(style, text)?;
        tree.append_child(head, style)?;
        Ok(())
    }

    fn remove_style(&self, scope: &str) {
        let id = format!("css-{scope}");
        loop {
            let found = self.document.borrow().get_element_by_id(&id);
            let Some(style) = found else {
                break;
            };
            if self.document.borrow_mut().tree_mut().remove(style).is_err() {
                break;
            }
        }
    }

    pub(crate) fn has_style(&self, scope: &str) -> bool {
        self.document.borrow().get_element_by_id(&format!("css-{scope}")).is_some()
    }

    /// Drop the stylesheet once no connected element carries `scope`
    fn release_scope(&self, scope: &str) {
        let in_use = {
            let doc = self.document.borrow();
            let tree = doc.tree();
            tree.descendants(NodeId::ROOT)
                .into_iter()
                .any(|n| tree.attr(n, SCOPE_ATTR) == Some(scope))
        };
        if !in_use {
            self.remove_style(scope);
        }
    }

    /// Re-inject known stylesheets for scopes under `node` that lost theirs
    pub(crate) fn materialize_styles(&self, node: NodeId) {
        let scopes: Vec<String> = {
            let doc = self.document.borrow();
            let tree = doc.tree();
            std::iter::once(node)
                .chain(tree.descendants(node))
                .filter_map(|n| tree.attr(n, SCOPE_ATTR).map(str::to_string))
                .collect()
        };
        for scope in scopes {
            if self.has_style(&scope) {
                continue;
            }
            let Some(css) = self.styles.borrow().get(&scope).cloned() else {
                continue;
            };
            if let Err(e) = self.inject_style(&scope, &css) {
                tracing::warn!("Failed to restore stylesheet for {}: {}", scope, e);
            }
        }
    }

    // Executor

    /// Run `future` on the window executor in the background
    pub fn spawn(&self, future: impl Future<Output = ()> + 'static) {
        self.executor.spawn(future).detach();
    }

    /// Yield once, then deliver queued mutation records
    pub async fn tick(self: &Rc<Self>) {
        smol::future::yield_now().await;
        self.flush_mutations();
    }

    /// Run every ready task, then flush
    pub fn run_pending(self: &Rc<Self>) {
        while self.executor.try_tick() {}
        self.flush_mutations();
    }

    /// Drive `future` and the window executor to completion of `future`
    pub fn block_on<T>(self: &Rc<Self>, future: impl Future<Output = T>) -> T {
        let output = smol::block_on(self.executor.run(future));
        self.run_pending();
        output
    }
}

impl std::fmt::Debug for CotomyWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CotomyWindow")
            .field("location", &self.location())
            .field("instances", &self.instances.borrow().len())
            .field("initialized", &self.initialized.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cotomy_net::mock::MockTransport;
    use std::cell::Cell;

    fn window() -> Rc<CotomyWindow> {
        CotomyWindow::with_config("https://example.com/", Rc::new(MockTransport::new()), WindowConfig::utc())
    }

    #[test]
    fn test_wrappers_share_core() {
        let window = window();
        let div = window.create("<div></div>").unwrap();
        let again = window.wrap(div.node());
        assert_eq!(div, again);
        assert_eq!(div.instance_id(), again.instance_id());
    }

    #[test]
    fn test_preserves_rendered_instance_id() {
        let window = window();
        let div = window.create(r#"<div data-cotomy-instance="server-1"></div>"#).unwrap();
        assert_eq!(div.instance_id(), "server-1");
    }

    #[test]
    fn test_create_invalid_html() {
        let window = window();
        assert!(matches!(window.create("just text"), Err(CotomyError::InvalidHtml)));
    }

    #[test]
    fn test_layout_rebroadcast() {
        let window = window();
        window.initialize();
        window.initialize();

        let panel = window.create("<div></div>").unwrap();
        window.append(&panel).unwrap();
        let count = Rc::new(Cell::new(0));
        let seen = Rc::clone(&count);
        panel.changelayout(&EventHandler::new(move |_| seen.set(seen.get() + 1)));

        window.resize(None);
        assert_eq!(count.get(), 1);
        window.trigger("cotomy:ready");
        assert_eq!(count.get(), 2);
    }

    #[test]
    fn test_navigation() {
        let window = window();
        window.navigate("https://example.com/users?page=2");
        assert_eq!(window.location(), "https://example.com/users?page=2");
        assert!(!window.reloading());
        window.reload();
        assert!(window.reloading());
        assert_eq!(window.navigations().len(), 2);
    }

    #[test]
    fn test_pageshow_detail() {
        let window = window();
        let persisted = Rc::new(Cell::new(false));
        let seen = Rc::clone(&persisted);
        window.pageshow(&EventHandler::new(move |e| {
            seen.set(e.detail::<PageTransition>().is_some_and(|t| t.persisted));
        }));
        window.show_page(true);
        assert!(persisted.get());
    }
}
