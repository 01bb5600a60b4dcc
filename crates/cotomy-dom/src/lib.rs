//! Cotomy DOM - host document model
//!
//! Arena-based document tree with the browser facilities the Cotomy
//! toolkit builds on: attribute storage, CSS selector queries, event
//! listeners with capture/bubble dispatch, abort signals, child-list
//! mutation records and form data collection.

mod abort;
mod document;
mod dom_events;
mod forms;
mod node;
mod observer;
mod parser;
mod selector;
mod tree;

pub use abort::{AbortController, AbortSignal};
pub use document::Document;
pub use dom_events::{
    DomEvent, EventInit, EventListener, EventPhase, ListenerCallback, ListenerId, ListenerOptions,
    ListenerStore, dispatch_event,
};
pub use forms::{FormData, FormDataValue, FormFile};
pub use node::{Attribute, ElementData, Node, NodeData};
pub use observer::MutationRecord;
pub use parser::parse_fragment;
pub use selector::SelectorList;
pub use tree::DomTree;

use thiserror::Error;

/// Node identifier (index into arena)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// Root node ID
    pub const ROOT: NodeId = NodeId(0);

    /// Arena index
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// DOM errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomError {
    #[error("Node not found: {0}")]
    NotFound(NodeId),

    #[error("Hierarchy request error: {0}")]
    HierarchyRequest(String),

    #[error("Node {0} is not an element")]
    NotAnElement(NodeId),

    #[error("Invalid selector: {0}")]
    Selector(String),

    #[error("HTML fragment has no element")]
    EmptyFragment,
}

/// Result alias for DOM operations
pub type DomResult<T> = Result<T, DomError>;
