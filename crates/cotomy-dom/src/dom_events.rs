//! DOM Events
//!
//! Event objects, listener storage and capture/target/bubble dispatch.
//! Listeners are snapshotted before each node is visited and the document
//! borrow is released while callbacks run, so a listener may add or remove
//! listeners and mutate the tree.

use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::{AbortSignal, Document, NodeId};

/// Phase of a dispatch in progress
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EventPhase {
    #[default]
    None,
    Capturing,
    AtTarget,
    Bubbling,
}

/// Construction flags for [`DomEvent`]
#[derive(Clone, Default)]
pub struct EventInit {
    pub bubbles: bool,
    pub cancelable: bool,
    pub detail: Option<Rc<dyn Any>>,
}

/// DOM event
#[derive(Clone)]
pub struct DomEvent {
    pub event_type: String,
    pub target: Option<NodeId>,
    pub current_target: Option<NodeId>,
    /// Element matched by a delegated listener, set while it runs
    pub delegate_target: Option<NodeId>,
    pub phase: EventPhase,
    pub bubbles: bool,
    pub cancelable: bool,
    detail: Option<Rc<dyn Any>>,
    default_prevented: bool,
    propagation_stopped: bool,
    immediate_propagation_stopped: bool,
    in_passive_listener: bool,
}

impl DomEvent {
    /// Non-bubbling, non-cancelable event
    pub fn new(event_type: impl Into<String>) -> Self {
        Self::with_init(event_type, EventInit::default())
    }

    /// Bubbling, cancelable event
    pub fn bubbling(event_type: impl Into<String>) -> Self {
        Self::with_init(
            event_type,
            EventInit {
                bubbles: true,
                cancelable: true,
                detail: None,
            },
        )
    }

    pub fn with_init(event_type: impl Into<String>, init: EventInit) -> Self {
        Self {
            event_type: event_type.into(),
            target: None,
            current_target: None,
            delegate_target: None,
            phase: EventPhase::None,
            bubbles: init.bubbles,
            cancelable: init.cancelable,
            detail: init.detail,
            default_prevented: false,
            propagation_stopped: false,
            immediate_propagation_stopped: false,
            in_passive_listener: false,
        }
    }

    /// Attach a custom payload
    pub fn with_detail<T: Any>(mut self, detail: T) -> Self {
        self.detail = Some(Rc::new(detail));
        self
    }

    /// Custom payload, if present and of type `T`
    pub fn detail<T: Any>(&self) -> Option<&T> {
        self.detail.as_ref().and_then(|d| d.downcast_ref::<T>())
    }

    pub fn has_detail(&self) -> bool {
        self.detail.is_some()
    }

    /// Prevent default action; ignored for non-cancelable events and passive listeners
    pub fn prevent_default(&mut self) {
        if self.cancelable && !self.in_passive_listener {
            self.default_prevented = true;
        }
    }

    pub fn default_prevented(&self) -> bool {
        self.default_prevented
    }

    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }

    pub fn stop_immediate_propagation(&mut self) {
        self.propagation_stopped = true;
        self.immediate_propagation_stopped = true;
    }

    pub fn propagation_stopped(&self) -> bool {
        self.propagation_stopped
    }
}

impl fmt::Debug for DomEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DomEvent")
            .field("event_type", &self.event_type)
            .field("target", &self.target)
            .field("current_target", &self.current_target)
            .field("phase", &self.phase)
            .field("bubbles", &self.bubbles)
            .field("default_prevented", &self.default_prevented)
            .finish()
    }
}

/// Listener callback
pub type ListenerCallback = Rc<dyn Fn(&mut DomEvent)>;

/// Listener identifier, unique per store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// addEventListener options
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListenerOptions {
    pub capture: bool,
    pub once: bool,
    pub passive: bool,
    pub signal: Option<AbortSignal>,
}

impl ListenerOptions {
    pub fn capture() -> Self {
        Self {
            capture: true,
            ..Self::default()
        }
    }

    pub fn once() -> Self {
        Self {
            once: true,
            ..Self::default()
        }
    }

    pub fn passive() -> Self {
        Self {
            passive: true,
            ..Self::default()
        }
    }

    pub fn with_signal(mut self, signal: AbortSignal) -> Self {
        self.signal = Some(signal);
        self
    }
}

/// Registered listener
#[derive(Clone)]
pub struct EventListener {
    pub id: ListenerId,
    pub callback: ListenerCallback,
    pub options: ListenerOptions,
}

impl fmt::Debug for EventListener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventListener")
            .field("id", &self.id)
            .field("options", &self.options)
            .finish()
    }
}

/// Listeners per node and event type
#[derive(Debug, Default)]
pub struct ListenerStore {
    listeners: HashMap<NodeId, HashMap<String, Vec<EventListener>>>,
    next_id: u64,
}

impl ListenerStore {
    /// Register a listener. Returns `None` when its signal is already aborted.
    pub fn add(
        &mut self,
        node: NodeId,
        event_type: &str,
        callback: ListenerCallback,
        options: ListenerOptions,
    ) -> Option<ListenerId> {
        if options.signal.as_ref().is_some_and(AbortSignal::is_aborted) {
            return None;
        }
        self.next_id += 1;
        let id = ListenerId(self.next_id);
        self.listeners
            .entry(node)
            .or_default()
            .entry(event_type.to_string())
            .or_default()
            .push(EventListener {
                id,
                callback,
                options,
            });
        Some(id)
    }

    /// Remove by id; returns whether it was registered
    pub fn remove(&mut self, node: NodeId, event_type: &str, id: ListenerId) -> bool {
        let Some(by_type) = self.listeners.get_mut(&node) else {
            return false;
        };
        let Some(list) = by_type.get_mut(event_type) else {
            return false;
        };
        let before = list.len();
        list.retain(|l| l.id != id);
        let removed = list.len() != before;
        if list.is_empty() {
            by_type.remove(event_type);
        }
        if by_type.is_empty() {
            self.listeners.remove(&node);
        }
        removed
    }

    pub fn contains(&self, node: NodeId, event_type: &str, id: ListenerId) -> bool {
        self.listeners
            .get(&node)
            .and_then(|m| m.get(event_type))
            .is_some_and(|list| list.iter().any(|l| l.id == id))
    }

    /// Snapshot of listeners for one phase
    pub fn snapshot(&self, node: NodeId, event_type: &str, capture: bool) -> Vec<EventListener> {
        self.listeners
            .get(&node)
            .and_then(|m| m.get(event_type))
            .map(|list| {
                list.iter()
                    .filter(|l| l.options.capture == capture)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn count(&self, node: NodeId, event_type: &str) -> usize {
        self.listeners
            .get(&node)
            .and_then(|m| m.get(event_type))
            .map_or(0, Vec::len)
    }

    /// Drop every listener of `node`
    pub fn clear_node(&mut self, node: NodeId) {
        self.listeners.remove(&node);
    }
}

/// Dispatch `event` at `target`.
///
/// Returns `false` if a listener called `prevent_default`.
pub fn dispatch_event(document: &RefCell<Document>, target: NodeId, event: &mut DomEvent) -> bool {
    let path = {
        let doc = document.borrow();
        let mut path = vec![target];
        path.extend(doc.tree().ancestors(target));
        path
    };
    tracing::trace!("dispatch {} at {} (path {})", event.event_type, target, path.len());

    event.target = Some(target);
    event.propagation_stopped = false;
    event.immediate_propagation_stopped = false;

    // Capture: outermost ancestor down to the parent
    event.phase = EventPhase::Capturing;
    for node in path.iter().skip(1).rev() {
        invoke(document, *node, event, true);
        if event.propagation_stopped {
            return finish(event);
        }
    }

    event.phase = EventPhase::AtTarget;
    invoke(document, target, event, true);
    if !event.propagation_stopped {
        invoke(document, target, event, false);
    }

    if event.bubbles {
        event.phase = EventPhase::Bubbling;
        for node in path.iter().skip(1) {
            if event.propagation_stopped {
                break;
            }
            invoke(document, *node, event, false);
        }
    }

    finish(event)
}

fn finish(event: &mut DomEvent) -> bool {
    event.phase = EventPhase::None;
    event.current_target = None;
    !event.default_prevented
}

fn invoke(document: &RefCell<Document>, node: NodeId, event: &mut DomEvent, capture: bool) {
    let snapshot = document
        .borrow()
        .listeners()
        .snapshot(node, &event.event_type, capture);
    if snapshot.is_empty() {
        return;
    }
    event.current_target = Some(node);
    for listener in snapshot {
        {
            let mut doc = document.borrow_mut();
            if !doc.listeners().contains(node, &event.event_type, listener.id) {
                continue;
            }
            let aborted = listener
                .options
                .signal
                .as_ref()
                .is_some_and(AbortSignal::is_aborted);
            if aborted || listener.options.once {
                doc.listeners_mut().remove(node, &event.event_type, listener.id);
            }
            if aborted {
                continue;
            }
        }
        event.in_passive_listener = listener.options.passive;
        (listener.callback)(event);
        event.in_passive_listener = false;
        if event.immediate_propagation_stopped {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn doc_with_chain() -> (RefCell<Document>, NodeId, NodeId) {
        let mut doc = Document::new("http://localhost/");
        let outer = doc.tree_mut().create_element("div");
        let inner = doc.tree_mut().create_element("button");
        let body = doc.body();
        doc.tree_mut().append_child(body, outer).unwrap();
        doc.tree_mut().append_child(outer, inner).unwrap();
        (RefCell::new(doc), outer, inner)
    }

    fn recorder(log: &Rc<RefCell<Vec<String>>>, label: &str) -> ListenerCallback {
        let log = log.clone();
        let label = label.to_string();
        Rc::new(move |_e: &mut DomEvent| log.borrow_mut().push(label.clone()))
    }

    #[test]
    fn test_phase_order() {
        let (doc, outer, inner) = doc_with_chain();
        let log = Rc::new(RefCell::new(Vec::new()));
        {
            let mut d = doc.borrow_mut();
            d.listeners_mut().add(outer, "click", recorder(&log, "outer-capture"), ListenerOptions::capture());
            d.listeners_mut().add(outer, "click", recorder(&log, "outer-bubble"), ListenerOptions::default());
            d.listeners_mut().add(inner, "click", recorder(&log, "target"), ListenerOptions::default());
        }
        let mut event = DomEvent::bubbling("click");
        assert!(dispatch_event(&doc, inner, &mut event));
        assert_eq!(*log.borrow(), vec!["outer-capture", "target", "outer-bubble"]);
    }

    #[test]
    fn test_non_bubbling_stays_at_target() {
        let (doc, outer, inner) = doc_with_chain();
        let log = Rc::new(RefCell::new(Vec::new()));
        doc.borrow_mut()
            .listeners_mut()
            .add(outer, "removed", recorder(&log, "outer"), ListenerOptions::default());
        let mut event = DomEvent::new("removed");
        dispatch_event(&doc, inner, &mut event);
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn test_once_listener_fires_once() {
        let (doc, _, inner) = doc_with_chain();
        let count = Rc::new(Cell::new(0));
        let c = count.clone();
        doc.borrow_mut().listeners_mut().add(
            inner,
            "click",
            Rc::new(move |_e: &mut DomEvent| c.set(c.get() + 1)),
            ListenerOptions::once(),
        );
        dispatch_event(&doc, inner, &mut DomEvent::bubbling("click"));
        dispatch_event(&doc, inner, &mut DomEvent::bubbling("click"));
        assert_eq!(count.get(), 1);
        assert_eq!(doc.borrow().listeners().count(inner, "click"), 0);
    }

    #[test]
    fn test_listener_removed_mid_dispatch_is_skipped() {
        let (doc, _, inner) = doc_with_chain();
        let log = Rc::new(RefCell::new(Vec::new()));
        let second = Rc::new(Cell::new(None));
        let doc = Rc::new(doc);
        {
            let doc2 = doc.clone();
            let second = second.clone();
            let log = log.clone();
            doc.borrow_mut().listeners_mut().add(
                inner,
                "click",
                Rc::new(move |_e: &mut DomEvent| {
                    log.borrow_mut().push("first".to_string());
                    if let Some(id) = second.get() {
                        doc2.borrow_mut().listeners_mut().remove(inner, "click", id);
                    }
                }),
                ListenerOptions::default(),
            );
        }
        let id = doc
            .borrow_mut()
            .listeners_mut()
            .add(inner, "click", recorder(&log, "second"), ListenerOptions::default());
        second.set(id);

        dispatch_event(&doc, inner, &mut DomEvent::bubbling("click"));
        assert_eq!(*log.borrow(), vec!["first"]);
    }

    #[test]
    fn test_aborted_signal_listener() {
        let (doc, _, inner) = doc_with_chain();
        let controller = crate::AbortController::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        doc.borrow_mut().listeners_mut().add(
            inner,
            "click",
            recorder(&log, "x"),
            ListenerOptions::default().with_signal(controller.signal()),
        );
        controller.abort();
        dispatch_event(&doc, inner, &mut DomEvent::bubbling("click"));
        assert!(log.borrow().is_empty());
        assert!(doc.borrow_mut().listeners_mut().add(
            inner,
            "click",
            recorder(&log, "y"),
            ListenerOptions::default().with_signal(controller.signal()),
        ).is_none());
    }

    #[test]
    fn test_prevent_default_and_passive() {
        let (doc, _, inner) = doc_with_chain();
        doc.borrow_mut().listeners_mut().add(
            inner,
            "submit",
            Rc::new(|e: &mut DomEvent| e.prevent_default()),
            ListenerOptions::passive(),
        );
        assert!(dispatch_event(&doc, inner, &mut DomEvent::bubbling("submit")));

        doc.borrow_mut().listeners_mut().add(
            inner,
            "submit",
            Rc::new(|e: &mut DomEvent| e.prevent_default()),
            ListenerOptions::default(),
        );
        assert!(!dispatch_event(&doc, inner, &mut DomEvent::bubbling("submit")));
    }

    #[test]
    fn test_detail_downcast() {
        let event = DomEvent::bubbling("custom").with_detail(42u32);
        assert_eq!(event.detail::<u32>(), Some(&42));
        assert_eq!(event.detail::<String>(), None);
    }
}
