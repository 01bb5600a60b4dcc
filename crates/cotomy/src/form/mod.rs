//! Forms
//!
//! `<form>` wrappers bound to their submit event:
//! - [`QueryForm`] navigates with the form's values merged into the query
//! - [`ApiForm`] submits the form data through an [`ApiClient`](cotomy_net::ApiClient)
//! - [`EntityApiForm`] infers method and URL from the entity key and picks up
//!   the key of a created entity from the `Location` header
//! - [`EntityFillApiForm`] loads the entity before the page is ready and
//!   fills the inputs from every successful response

mod api;
mod entity;
mod fill;
mod query;

pub use api::{API_FAILED, ApiForm, SUBMIT_FAILED};
pub use entity::{EntityApiForm, EntityKey};
pub use fill::{EntityFillApiForm, Filler};
pub use query::QueryForm;

use std::any::Any;

use cotomy_dom::DomEvent;
use cotomy_net::LocalFuture;

use crate::events::EventHandler;
use crate::{CotomyElement, CotomyResult};

pub(crate) const INITIALIZED_ATTR: &str = "data-cotomy-initialized";
pub(crate) const AUTO_RELOAD_ATTR: &str = "data-cotomy-autoreload";

/// Common form behaviour
pub trait Form {
    fn element(&self) -> &CotomyElement;

    /// HTTP method used on submit
    fn method(&self) -> String;

    /// Submit target
    fn action_url(&self) -> String;

    fn submit(&self) -> LocalFuture<'_, CotomyResult<()>>;

    /// Refresh the form; reloads the page unless overridden
    fn reload(&self) -> LocalFuture<'_, CotomyResult<()>> {
        let window = self.element().window().clone();
        Box::pin(async move {
            window.reload();
            Ok(())
        })
    }

    /// Bind the submit handler; repeated calls are no-ops
    fn initialize(&self) -> CotomyResult<()>;

    fn as_any(&self) -> &dyn Any;

    fn initialized(&self) -> bool {
        self.element().has_attribute(INITIALIZED_ATTR)
    }

    /// Reload on page restore unless `data-cotomy-autoreload="false"`
    fn auto_reload(&self) -> bool {
        self.element().attribute(AUTO_RELOAD_ATTR).as_deref() != Some("false")
    }

    fn set_auto_reload(&self, enabled: bool) {
        if enabled {
            self.element().remove_attribute(AUTO_RELOAD_ATTR);
        } else {
            self.element().set_attribute(AUTO_RELOAD_ATTR, "false");
        }
    }

    fn id(&self) -> Option<String> {
        self.element().id()
    }

    fn generate_id(&self) {
        self.element().generate_id("__cotomy_form__");
    }
}

/// Register the submit handler of `form` and mark it initialized
///
/// The handler cancels the native submit and runs [`Form::submit`] on the
/// window executor; a failed submit is logged.
pub(crate) fn bind_submit<F: Form + Clone + 'static>(form: &F) {
    if form.initialized() {
        return;
    }
    let target = form.clone();
    let handler = EventHandler::new(move |event: &mut DomEvent| {
        event.prevent_default();
        event.stop_propagation();
        let form = target.clone();
        target.element().window().spawn(async move {
            if let Err(e) = form.submit().await {
                tracing::error!("Form submit failed: {}", e);
            }
        });
    });
    form.element().on("submit", &handler);
    form.element().set_attribute(INITIALIZED_ATTR, "");
}
