//! Page controller
//!
//! Boots a page once the window raises `load`: initializes the window,
//! formats `[data-cotomy-datetime]` elements, installs the restore handler and
//! raises `cotomy:ready`. Forms registered with [`PageController::set_form`]
//! are initialized, tracked by id until removed and reloaded when the page is
//! restored from the back/forward cache.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use chrono::FixedOffset;

use crate::form::Form;
use crate::{CotomyError, CotomyResult, CotomyWindow, DebugFeature, EventHandler, PageTransition, datetime};

const DATETIME_ATTR: &str = "data-cotomy-datetime";
const FORMATTED_ATTR: &str = "data-cotomy-formatted";
const TIMEZONE_ATTR: &str = "data-cotomy-timezone";
const FORMAT_ATTR: &str = "data-cotomy-format";
const DEFAULT_DATETIME_FORMAT: &str = "YYYY-MM-DD HH:mm";

struct PageState {
    window: Rc<CotomyWindow>,
    forms: RefCell<Vec<(String, Rc<dyn Form>)>>,
    started: Cell<bool>,
}

/// Per-page form registry and boot sequence
#[derive(Clone)]
pub struct PageController {
    state: Rc<PageState>,
}

impl std::fmt::Debug for PageController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let ids: Vec<String> = self.state.forms.borrow().iter().map(|(id, _)| id.clone()).collect();
        f.debug_struct("PageController").field("forms", &ids).finish()
    }
}

impl PageController {
    pub fn new(window: Rc<CotomyWindow>) -> Self {
        Self {
            state: Rc::new(PageState {
                window,
                forms: RefCell::new(Vec::new()),
                started: Cell::new(false),
            }),
        }
    }

    pub fn window(&self) -> &Rc<CotomyWindow> {
        &self.state.window
    }

    /// Run the boot sequence on the window's `load`; later calls are no-ops
    pub fn start(&self) {
        if self.state.started.replace(true) {
            return;
        }
        let weak = Rc::downgrade(&self.state);
        self.state.window.load(&EventHandler::new(move |_| {
            let Some(state) = weak.upgrade() else {
                return;
            };
            let page = PageController { state };
            if page.window().debugging(DebugFeature::Page) {
                tracing::debug!("PageController initialize.");
            }
            page.window().initialize();
            page.initialize();
            page.window().trigger("cotomy:ready");
        }));
    }

    /// Format date-time elements and install the restore handler
    pub fn initialize(&self) {
        self.format_datetime_elements();

        let weak = Rc::downgrade(&self.state);
        self.state.window.pageshow(&EventHandler::new(move |event| {
            let persisted = event.detail::<PageTransition>().is_some_and(|t| t.persisted);
            if !persisted {
                return;
            }
            let Some(state) = weak.upgrade() else {
                return;
            };
            let page = PageController { state };
            if page.window().reloading() {
                event.stop_immediate_propagation();
                return;
            }
            let window = page.window().clone();
            window.spawn(async move {
                if let Err(e) = page.restore().await {
                    tracing::error!("Page restore failed: {}", e);
                }
            });
        }));
    }

    /// Register `form` under its id, generating one when absent, and initialize it
    pub fn set_form<F: Form + Clone + 'static>(&self, form: F) -> CotomyResult<F> {
        form.generate_id();
        let id = form.id().unwrap_or_default();

        {
            let mut forms = self.state.forms.borrow_mut();
            forms.retain(|(existing, _)| *existing != id);
            forms.push((id.clone(), Rc::new(form.clone())));
        }

        let weak: Weak<PageState> = Rc::downgrade(&self.state);
        let removed_id = id.clone();
        form.element().removed(&EventHandler::new(move |_| {
            if let Some(state) = weak.upgrade() {
                state.forms.borrow_mut().retain(|(existing, _)| *existing != removed_id);
            }
        }));

        if self.window().debugging(DebugFeature::Page) {
            tracing::debug!("Form registered: {}", id);
        }
        form.initialize()?;
        Ok(form)
    }

    pub fn get_form(&self, id: &str) -> Option<Rc<dyn Form>> {
        self.state
            .forms
            .borrow()
            .iter()
            .find(|(existing, _)| existing == id)
            .map(|(_, form)| Rc::clone(form))
    }

    /// Registered form `id` as `F`; fails when it has another type
    pub fn get_form_as<F: Form + Clone + 'static>(&self, id: &str) -> CotomyResult<Option<F>> {
        let Some(form) = self.get_form(id) else {
            return Ok(None);
        };
        form.as_any()
            .downcast_ref::<F>()
            .cloned()
            .map(Some)
            .ok_or_else(|| CotomyError::FormType(id.to_string()))
    }

    /// Registered forms in registration order
    pub fn forms(&self) -> Vec<Rc<dyn Form>> {
        self.state.forms.borrow().iter().map(|(_, form)| Rc::clone(form)).collect()
    }

    /// Reload auto-reload forms until the window starts reloading
    pub async fn restore(&self) -> CotomyResult<()> {
        for form in self.forms() {
            if self.window().reloading() {
                break;
            }
            if form.auto_reload() {
                form.reload().await?;
            }
        }
        Ok(())
    }

    fn format_datetime_elements(&self) {
        let window = self.window();
        let selector = format!("[{DATETIME_ATTR}]:not([{FORMATTED_ATTR}])");
        let elements = match window.body().find(&selector) {
            Ok(elements) => elements,
            Err(e) => {
                tracing::error!("Date-time lookup failed: {}", e);
                return;
            }
        };

        for element in elements {
            let Some(value) = datetime::parse_utc(&element.text()) else {
                continue;
            };
            let zone = element.attribute(TIMEZONE_ATTR).filter(|z| !z.trim().is_empty()).or_else(|| {
                element
                    .closest(&format!("[{TIMEZONE_ATTR}]"))
                    .ok()
                    .flatten()
                    .and_then(|e| e.attribute(TIMEZONE_ATTR))
            });
            let zone_offset = zone.as_deref().and_then(|z| {
                let offset = datetime::parse_offset(z.trim());
                if offset.is_none() {
                    tracing::warn!("Unsupported time zone \"{}\"; only ±hh:mm offsets are supported", z);
                }
                offset
            });
            let offset = zone_offset.unwrap_or_else(|| {
                if element.attribute(DATETIME_ATTR).as_deref() == Some("local") {
                    window.config().utc_offset
                } else {
                    FixedOffset::east_opt(0).unwrap_or(window.config().utc_offset)
                }
            });
            let format = element
                .attribute(FORMAT_ATTR)
                .unwrap_or_else(|| DEFAULT_DATETIME_FORMAT.to_string());
            element.set_text(&datetime::format_tokens(&value.with_timezone(&offset), &format));
            element.set_attribute(FORMATTED_ATTR, "");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::{ApiForm, QueryForm};
    use crate::{CotomyElement, WindowConfig};
    use cotomy_net::mock::MockTransport;
    use pretty_assertions::assert_eq;

    fn window() -> Rc<CotomyWindow> {
        CotomyWindow::with_config(
            "https://example.com/orders",
            Rc::new(MockTransport::new()),
            WindowConfig::utc().with_utc_offset(FixedOffset::east_opt(9 * 3600).unwrap()),
        )
    }

    #[test]
    fn test_set_form_generates_id_and_forgets_removed() {
        let window = window();
        let page = PageController::new(window.clone());
        let form: ApiForm = window.create_as(r#"<form action="/api/a"></form>"#).unwrap();
        window.append(&form).unwrap();

        let form = page.set_form(form).unwrap();
        let id = form.id().unwrap();
        assert!(id.starts_with("__cotomy_form__"));
        assert!(form.initialized());
        assert!(page.get_form(&id).is_some());

        form.remove();
        window.flush_mutations();
        assert!(page.get_form(&id).is_none());
        assert!(page.forms().is_empty());
    }

    #[test]
    fn test_get_form_as_checks_type() {
        let window = window();
        let page = PageController::new(window.clone());
        let form: QueryForm = window.create_as(r#"<form id="search"></form>"#).unwrap();
        window.append(&form).unwrap();
        page.set_form(form).unwrap();

        assert!(page.get_form_as::<QueryForm>("search").unwrap().is_some());
        assert!(matches!(
            page.get_form_as::<ApiForm>("search"),
            Err(CotomyError::FormType(id)) if id == "search"
        ));
        assert!(page.get_form_as::<ApiForm>("missing").unwrap().is_none());
    }

    #[test]
    fn test_start_formats_datetimes_and_raises_ready() {
        let window = window();
        let body = window.body();
        let local: CotomyElement = window
            .create(r#"<span data-cotomy-datetime="local">2024-05-01T01:30:00Z</span>"#)
            .unwrap();
        let utc: CotomyElement = window
            .create(r#"<span data-cotomy-datetime data-cotomy-format="YYYY/MM/DD">2024-05-01 23:30</span>"#)
            .unwrap();
        let zoned: CotomyElement = window
            .create(r#"<div data-cotomy-timezone="-05:00"><span data-cotomy-datetime>2024-05-01T12:00:00+00:00</span></div>"#)
            .unwrap();
        body.append(&local).unwrap();
        body.append(&utc).unwrap();
        body.append(&zoned).unwrap();

        let ready = Rc::new(Cell::new(false));
        let seen = Rc::clone(&ready);
        window.ready(&EventHandler::new(move |_| seen.set(true)));

        let page = PageController::new(window.clone());
        page.start();
        window.trigger("load");

        assert!(ready.get());
        assert!(window.initialized());
        assert_eq!(local.text(), "2024-05-01 10:30");
        assert_eq!(utc.text(), "2024/05/01");
        assert_eq!(zoned.first("span").unwrap().unwrap().text(), "2024-05-01 07:00");
        assert!(local.has_attribute("data-cotomy-formatted"));
    }

    #[test]
    fn test_restore_reloads_until_reloading() {
        let window = window();
        let page = PageController::new(window.clone());
        for html in [r#"<form id="a"></form>"#, r#"<form id="b"></form>"#] {
            let form: QueryForm = window.create_as(html).unwrap();
            window.append(&form).unwrap();
            page.set_form(form).unwrap();
        }
        page.initialize();

        window.show_page(true);
        window.run_pending();
        assert_eq!(window.navigations().len(), 1);
        assert!(window.reloading());

        let later = Rc::new(Cell::new(false));
        let seen = Rc::clone(&later);
        window.pageshow(&EventHandler::new(move |_| seen.set(true)));
        window.show_page(true);
        assert!(!later.get());
    }

    #[test]
    fn test_restore_skips_opted_out_forms() {
        let window = window();
        let page = PageController::new(window.clone());
        let form: QueryForm = window
            .create_as(r#"<form id="a" data-cotomy-autoreload="false"></form>"#)
            .unwrap();
        window.append(&form).unwrap();
        page.set_form(form).unwrap();

        window.block_on(page.restore()).unwrap();
        assert!(!window.reloading());
    }
}
