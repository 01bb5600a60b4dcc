//! Cotomy
//!
//! A UI toolkit over an explicit host document.
//!
//! # Layers
//! - [`CotomyElement`]: wraps one DOM node, owns scope and instance identity,
//!   scoped CSS and lifecycle-aware event registration
//! - [`CotomyWindow`]: per-run context owning the document, the
//!   [`EventRegistry`], the mutation flush that raises `removed` and the
//!   layout event rebroadcast
//! - [`form`]: `<form>` bindings to REST endpoints, including entity key
//!   inference from `Location` headers and response-driven field fill
//!
//! # Example
//! ```rust,ignore
//! use cotomy::{CotomyWindow, EventHandler};
//! use cotomy_net::mock::MockTransport;
//!
//! let window = CotomyWindow::new("https://example.com/", Rc::new(MockTransport::new()));
//! let button = window.create(r#"<button type="button">Save</button>"#)?;
//! window.body().append(&button)?;
//! button.on("click", &EventHandler::new(|_| tracing::info!("clicked")));
//! button.click();
//! ```

mod bind_name;
mod config;
mod datetime;
mod debug;
mod element;
mod events;
pub mod form;
mod page;
mod renderer;
mod window;

pub use bind_name::{BindNameGenerator, BracketBindNameGenerator, DotBindNameGenerator};
pub use config::WindowConfig;
pub use debug::{DebugFeature, DebugSettings};
pub use element::{CotomyElement, ElementState, ElementWrap};
pub use events::{EventHandler, EventNames, EventRegistry, HandlerEntry, HandlerRegistry};
pub use page::PageController;
pub use renderer::{Renderer, ViewRenderer};
pub use window::{CotomyWindow, PageTransition};

// Re-export sub-crates for advanced usage
pub use cotomy_dom as dom;
pub use cotomy_net as net;

use cotomy_dom::DomError;
use cotomy_net::ApiError;
use thiserror::Error;

/// Toolkit version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Result alias for toolkit operations
pub type CotomyResult<T> = Result<T, CotomyError>;

/// Toolkit errors
#[derive(Debug, Clone, Error)]
pub enum CotomyError {
    #[error(transparent)]
    Dom(#[from] DomError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("Element has already been removed")]
    RemovedElement,

    #[error("Location path does not start with action path. action=\"{action}\", location=\"{location}\"")]
    LocationMismatch { action: String, location: String },

    #[error(
        "Location does not contain a single entity key segment. action=\"{action}\", location=\"{location}\", added={added:?}"
    )]
    AmbiguousLocation {
        action: String,
        location: String,
        added: Vec<String>,
    },

    #[error("Entity key conflict: {0}")]
    KeyConflict(String),

    #[error("Invalid HTML string provided")]
    InvalidHtml,

    #[error("Response is not available")]
    ResponseUnavailable,

    #[error("Form \"{0}\" is not an instance of the expected type")]
    FormType(String),
}

impl CotomyError {
    /// The API error, if this is one
    pub fn api(&self) -> Option<&ApiError> {
        match self {
            Self::Api(e) => Some(e),
            _ => None,
        }
    }
}
