//! Handler registration
//!
//! [`HandlerEntry`] is one registered listener, [`HandlerRegistry`] holds the
//! entries of one element instance and attaches/detaches them on the
//! document's listener store, and [`EventRegistry`] maps instance identities
//! to their registries.
//!
//! Entries are compared in two modes. Strict equality (callback, delegating
//! wrapper and options) decides whether a registration is a duplicate.
//! Remove equality ignores the wrapper, `once` and `passive`, so
//! `off(event, callback)` also removes a delegated or one-shot registration
//! of the same callback; capture and signal still have to match.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use cotomy_dom::{AbortSignal, DomEvent, ListenerCallback, ListenerId, ListenerOptions, ListenerStore, NodeId};

/// Event callback; identity is the allocation
#[derive(Clone)]
pub struct EventHandler(ListenerCallback);

impl EventHandler {
    pub fn new(callback: impl Fn(&mut DomEvent) + 'static) -> Self {
        Self(Rc::new(callback))
    }

    /// Same callback allocation
    pub fn ptr_eq(&self, other: &EventHandler) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn callback(&self) -> ListenerCallback {
        self.0.clone()
    }

    pub fn call(&self, event: &mut DomEvent) {
        (self.0)(event)
    }
}

impl fmt::Debug for EventHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EventHandler({:p})", Rc::as_ptr(&self.0))
    }
}

/// One event name or an ordered list of them
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventNames(Vec<String>);

impl EventNames {
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl From<&str> for EventNames {
    fn from(name: &str) -> Self {
        Self(vec![name.to_string()])
    }
}

impl From<String> for EventNames {
    fn from(name: String) -> Self {
        Self(vec![name])
    }
}

impl From<&[&str]> for EventNames {
    fn from(names: &[&str]) -> Self {
        Self(names.iter().map(|n| n.to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for EventNames {
    fn from(names: [&str; N]) -> Self {
        Self(names.iter().map(|n| n.to_string()).collect())
    }
}

impl From<Vec<&str>> for EventNames {
    fn from(names: Vec<&str>) -> Self {
        Self(names.into_iter().map(str::to_string).collect())
    }
}

/// A registered `(callback, delegating wrapper, options)` tuple
#[derive(Debug, Clone)]
pub struct HandlerEntry {
    pub handle: EventHandler,
    pub wrapper: Option<EventHandler>,
    pub options: ListenerOptions,
}

impl HandlerEntry {
    pub fn new(handle: EventHandler, wrapper: Option<EventHandler>, options: ListenerOptions) -> Self {
        Self {
            handle,
            wrapper,
            options,
        }
    }

    /// The function actually attached to the node
    pub fn current(&self) -> &EventHandler {
        self.wrapper.as_ref().unwrap_or(&self.handle)
    }

    /// Duplicate check: callback, wrapper identity and options
    pub fn strict_eq(&self, other: &HandlerEntry) -> bool {
        let wrapper_eq = match (&self.wrapper, &other.wrapper) {
            (None, None) => true,
            (Some(a), Some(b)) => a.ptr_eq(b),
            _ => false,
        };
        self.handle.ptr_eq(&other.handle) && wrapper_eq && self.options == other.options
    }

    /// Removal match: callback, capture and signal; the wrapper is a wildcard
    /// and `once`/`passive` never affect which listener is removed
    pub fn remove_eq(&self, other: &HandlerEntry) -> bool {
        self.handle.ptr_eq(&other.handle)
            && self.options.capture == other.options.capture
            && self.options.signal == other.options.signal
    }
}

#[derive(Debug, Clone)]
struct Registration {
    entry: HandlerEntry,
    listener: ListenerId,
}

/// Entries of one element instance, per event name
#[derive(Debug)]
pub struct HandlerRegistry {
    target: NodeId,
    handlers: HashMap<String, Vec<Registration>>,
}

impl HandlerRegistry {
    pub fn new(target: NodeId) -> Self {
        Self {
            target,
            handlers: HashMap::new(),
        }
    }

    pub fn target(&self) -> NodeId {
        self.target
    }

    /// Drop registrations the store no longer holds (fired `once`, aborted signal)
    fn sync(&mut self, store: &mut ListenerStore) {
        let target = self.target;
        for (event, list) in self.handlers.iter_mut() {
            list.retain(|r| {
                let aborted = r.entry.options.signal.as_ref().is_some_and(AbortSignal::is_aborted);
                if aborted {
                    store.remove(target, event, r.listener);
                }
                !aborted && store.contains(target, event, r.listener)
            });
        }
        self.handlers.retain(|_, list| !list.is_empty());
    }

    /// Attach `entry` for `event`.
    ///
    /// Returns `false` for a strict duplicate or an already aborted signal.
    pub fn add(&mut self, store: &mut ListenerStore, event: &str, entry: HandlerEntry) -> bool {
        self.sync(store);
        if self
            .handlers
            .get(event)
            .is_some_and(|list| list.iter().any(|r| r.entry.strict_eq(&entry)))
        {
            tracing::trace!("duplicate {} handler on {}", event, self.target);
            return false;
        }
        if entry.options.once {
            self.remove(store, event, &entry);
        }
        let Some(listener) = store.add(self.target, event, entry.current().callback(), entry.options.clone()) else {
            return false;
        };
        self.handlers
            .entry(event.to_string())
            .or_default()
            .push(Registration { entry, listener });
        true
    }

    /// Detach entries matching `pattern` in remove mode; returns how many
    pub fn remove(&mut self, store: &mut ListenerStore, event: &str, pattern: &HandlerEntry) -> usize {
        let target = self.target;
        let Some(list) = self.handlers.get_mut(event) else {
            return 0;
        };
        let before = list.len();
        list.retain(|r| {
            if r.entry.remove_eq(pattern) {
                store.remove(target, event, r.listener);
                false
            } else {
                true
            }
        });
        let removed = before - list.len();
        if list.is_empty() {
            self.handlers.remove(event);
        }
        removed
    }

    /// Detach every entry for `event`
    pub fn clear(&mut self, store: &mut ListenerStore, event: &str) -> usize {
        let Some(list) = self.handlers.remove(event) else {
            return 0;
        };
        for r in &list {
            store.remove(self.target, event, r.listener);
        }
        list.len()
    }

    /// Detach everything
    pub fn release(&mut self, store: &mut ListenerStore) {
        for (event, list) in self.handlers.drain() {
            for r in list {
                store.remove(self.target, &event, r.listener);
            }
        }
    }

    pub fn count(&mut self, store: &mut ListenerStore, event: &str) -> usize {
        self.sync(store);
        self.handlers.get(event).map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Event names with at least one entry
    pub fn events(&self) -> Vec<String> {
        let mut events: Vec<String> = self.handlers.keys().cloned().collect();
        events.sort();
        events
    }
}

/// Instance identity to [`HandlerRegistry`]
#[derive(Debug, Default)]
pub struct EventRegistry {
    registries: HashMap<String, HandlerRegistry>,
}

impl EventRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `entry` on `target`, creating the instance's registry on first use
    pub fn on(&mut self, store: &mut ListenerStore, instance: &str, target: NodeId, event: &str, entry: HandlerEntry) -> bool {
        let registry = self
            .registries
            .entry(instance.to_string())
            .or_insert_with(|| HandlerRegistry::new(target));
        let added = registry.add(store, event, entry);
        self.prune(instance);
        added
    }

    /// Remove matching entries, or all entries of `event` with `pattern == None`
    pub fn off(&mut self, store: &mut ListenerStore, instance: &str, event: &str, pattern: Option<&HandlerEntry>) -> usize {
        let Some(registry) = self.registries.get_mut(instance) else {
            return 0;
        };
        let removed = match pattern {
            Some(pattern) => registry.remove(store, event, pattern),
            None => registry.clear(store, event),
        };
        self.prune(instance);
        removed
    }

    /// Detach and drop the instance's registry
    pub fn release(&mut self, store: &mut ListenerStore, instance: &str) -> bool {
        match self.registries.remove(instance) {
            Some(mut registry) => {
                registry.release(store);
                true
            }
            None => false,
        }
    }

    pub fn count(&mut self, store: &mut ListenerStore, instance: &str, event: &str) -> usize {
        let count = self
            .registries
            .get_mut(instance)
            .map_or(0, |r| r.count(store, event));
        self.prune(instance);
        count
    }

    pub fn get(&self, instance: &str) -> Option<&HandlerRegistry> {
        self.registries.get(instance)
    }

    pub fn contains(&self, instance: &str) -> bool {
        self.registries.contains_key(instance)
    }

    pub fn len(&self) -> usize {
        self.registries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registries.is_empty()
    }

    fn prune(&mut self, instance: &str) {
        if self.registries.get(instance).is_some_and(HandlerRegistry::is_empty) {
            self.registries.remove(instance);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cotomy_dom::AbortController;

    fn entry(handle: &EventHandler, options: ListenerOptions) -> HandlerEntry {
        HandlerEntry::new(handle.clone(), None, options)
    }

    #[test]
    fn test_strict_and_remove_equality() {
        let f = EventHandler::new(|_| {});
        let g = EventHandler::new(|_| {});
        let wrapper = EventHandler::new(|_| {});

        let direct = entry(&f, ListenerOptions::default());
        let delegated = HandlerEntry::new(f.clone(), Some(wrapper), ListenerOptions::default());

        assert!(direct.strict_eq(&entry(&f, ListenerOptions::default())));
        assert!(!direct.strict_eq(&delegated));
        assert!(direct.remove_eq(&delegated));
        assert!(!direct.remove_eq(&entry(&g, ListenerOptions::default())));
        assert!(!direct.strict_eq(&entry(&f, ListenerOptions::capture())));
        assert!(!direct.remove_eq(&entry(&f, ListenerOptions::capture())));
    }

    #[test]
    fn test_remove_ignores_once_and_passive() {
        let f = EventHandler::new(|_| {});
        let plain = entry(&f, ListenerOptions::default());
        assert!(entry(&f, ListenerOptions::once()).remove_eq(&plain));
        assert!(entry(&f, ListenerOptions::passive()).remove_eq(&plain));
        assert!(!entry(&f, ListenerOptions::once()).strict_eq(&plain));

        let a = AbortController::new();
        assert!(!entry(&f, ListenerOptions::default().with_signal(a.signal())).remove_eq(&plain));
    }

    #[test]
    fn test_signal_compared_by_identity() {
        let f = EventHandler::new(|_| {});
        let a = AbortController::new();
        let b = AbortController::new();
        let with_a = entry(&f, ListenerOptions::default().with_signal(a.signal()));
        assert!(with_a.strict_eq(&entry(&f, ListenerOptions::default().with_signal(a.signal()))));
        assert!(!with_a.strict_eq(&entry(&f, ListenerOptions::default().with_signal(b.signal()))));
    }

    #[test]
    fn test_duplicate_rejected() {
        let mut store = ListenerStore::default();
        let mut registry = HandlerRegistry::new(NodeId::ROOT);
        let f = EventHandler::new(|_| {});

        assert!(registry.add(&mut store, "click", entry(&f, ListenerOptions::default())));
        assert!(!registry.add(&mut store, "click", entry(&f, ListenerOptions::default())));
        assert!(registry.add(&mut store, "click", entry(&f, ListenerOptions::capture())));
        assert_eq!(store.count(NodeId::ROOT, "click"), 2);
    }

    #[test]
    fn test_once_replaces_colliding_entry() {
        let mut store = ListenerStore::default();
        let mut registry = HandlerRegistry::new(NodeId::ROOT);
        let f = EventHandler::new(|_| {});
        let wrapper = EventHandler::new(|_| {});

        let delegated = HandlerEntry::new(f.clone(), Some(wrapper), ListenerOptions::once());
        assert!(registry.add(&mut store, "click", delegated));
        assert!(registry.add(&mut store, "click", entry(&f, ListenerOptions::once())));
        assert_eq!(registry.count(&mut store, "click"), 1);
        assert_eq!(store.count(NodeId::ROOT, "click"), 1);
    }

    #[test]
    fn test_registry_dropped_when_empty() {
        let mut store = ListenerStore::default();
        let mut registries = EventRegistry::new();
        let f = EventHandler::new(|_| {});

        registries.on(&mut store, "a", NodeId::ROOT, "click", entry(&f, ListenerOptions::default()));
        assert!(registries.contains("a"));
        assert_eq!(registries.off(&mut store, "a", "click", Some(&entry(&f, ListenerOptions::default()))), 1);
        assert!(!registries.contains("a"));
        assert_eq!(store.count(NodeId::ROOT, "click"), 0);
    }

    #[test]
    fn test_release_detaches_everything() {
        let mut store = ListenerStore::default();
        let mut registries = EventRegistry::new();
        let f = EventHandler::new(|_| {});

        registries.on(&mut store, "a", NodeId::ROOT, "click", entry(&f, ListenerOptions::default()));
        registries.on(&mut store, "a", NodeId::ROOT, "input", entry(&f, ListenerOptions::default()));
        assert!(registries.release(&mut store, "a"));
        assert!(registries.is_empty());
        assert_eq!(store.count(NodeId::ROOT, "click"), 0);
        assert_eq!(store.count(NodeId::ROOT, "input"), 0);
    }

    #[test]
    fn test_aborted_signal_not_registered() {
        let mut store = ListenerStore::default();
        let mut registries = EventRegistry::new();
        let f = EventHandler::new(|_| {});
        let controller = AbortController::new();
        controller.abort();

        let options = ListenerOptions::default().with_signal(controller.signal());
        assert!(!registries.on(&mut store, "a", NodeId::ROOT, "click", entry(&f, options)));
        assert!(registries.is_empty());
    }
}
