//! Entity fill form
//!
//! An [`EntityApiForm`] that loads its entity when the window becomes ready
//! and writes every successful response back into its inputs.

use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::ops::Deref;
use std::rc::Rc;

use cotomy_dom::FormData;
use cotomy_net::{ApiError, ApiResponse, LocalFuture};
use serde_json::{Map, Value};

use super::{EntityApiForm, Form, bind_submit};
use crate::bind_name::{BindNameGenerator, BracketBindNameGenerator};
use crate::element::quoted;
use crate::events::EventHandler;
use crate::renderer::{is_truthy, value_text};
use crate::{CotomyElement, CotomyResult, DebugFeature, ElementWrap, ViewRenderer, datetime};

/// Writes one value into one input
pub type Filler = Rc<dyn Fn(&CotomyElement, &Value)>;

fn datetime_filler(input: &CotomyElement, value: &Value) {
    let offset = input.window().config().utc_offset;
    let text = datetime::parse_utc(&value_text(value))
        .map(|t| t.with_timezone(&offset).format("%Y-%m-%dT%H:%M").to_string())
        .unwrap_or_default();
    input.set_value(&text);
}

fn checkbox_filler(input: &CotomyElement, value: &Value) {
    input.set_checked(is_truthy(value));
}

fn radio_filler(input: &CotomyElement, value: &Value) {
    input.set_checked(input.value() == value_text(value));
}

/// Entity form with load and fill
#[derive(Clone)]
pub struct EntityFillApiForm {
    entity: EntityApiForm,
    fillers: Rc<RefCell<HashMap<String, Filler>>>,
    generator: Rc<dyn BindNameGenerator>,
}

impl fmt::Debug for EntityFillApiForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityFillApiForm")
            .field("entity", &self.entity)
            .field("fillers", &self.fillers.borrow().keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ElementWrap for EntityFillApiForm {
    fn wrap(element: CotomyElement) -> Self {
        Self {
            entity: EntityApiForm::wrap(element),
            fillers: Rc::new(RefCell::new(HashMap::new())),
            generator: Rc::new(BracketBindNameGenerator),
        }
    }
}

impl Deref for EntityFillApiForm {
    type Target = EntityApiForm;

    fn deref(&self) -> &EntityApiForm {
        &self.entity
    }
}

impl EntityFillApiForm {
    pub fn entity_form(&self) -> &EntityApiForm {
        &self.entity
    }

    /// Use `generator` for nested field names
    pub fn with_generator(mut self, generator: Rc<dyn BindNameGenerator>) -> Self {
        self.generator = generator;
        self
    }

    /// Register `filler` for inputs of `input_type`, replacing any previous one
    pub fn filler(&self, input_type: &str, filler: impl Fn(&CotomyElement, &Value) + 'static) -> &Self {
        self.fillers
            .borrow_mut()
            .insert(input_type.to_ascii_lowercase(), Rc::new(filler));
        self
    }

    fn register_builtin_fillers(&self) {
        self.filler("datetime-local", datetime_filler);
        self.filler("checkbox", checkbox_filler);
        self.filler("radio", radio_filler);
    }

    /// Renderer applied after each fill
    pub fn renderer(&self) -> ViewRenderer {
        ViewRenderer::with_generator(self.element().clone(), Rc::clone(&self.generator))
    }

    /// An entity key is known
    pub fn loadable(&self) -> bool {
        self.entity.has_entity_key()
    }

    /// GET the entity and fill the form
    ///
    /// Returns an unavailable response when nothing is loadable and the 404
    /// response when the entity does not exist.
    pub async fn load(&self) -> CotomyResult<ApiResponse> {
        if !self.loadable() {
            return Ok(ApiResponse::unavailable());
        }
        let url = self.entity.load_action_url()?;
        if self.element().window().debugging(DebugFeature::FormLoad) {
            tracing::debug!("Loading entity from {}", url);
        }

        match self.entity.api_client().get(&url, None).await {
            Ok(response) => {
                self.fill(&response)?;
                Ok(response)
            }
            Err(error) => {
                if let ApiError::Http(exception) = &error {
                    self.entity.trigger_api_failed(&exception.response);
                    if error.is_not_found() {
                        return Ok(exception.response.clone());
                    }
                }
                Err(error.into())
            }
        }
    }

    /// Fill inputs and bound views from an OK response
    pub fn fill(&self, response: &ApiResponse) -> CotomyResult<()> {
        if response.ok() && response.available() {
            let object = response.object(Value::Object(Map::new()))?;
            self.fill_object(&object, None)?;
            self.renderer().apply(response)?;
            self.entity.lock_key_inputs()?;
        }
        for textarea in self.element().find("textarea")? {
            textarea.input();
        }
        Ok(())
    }

    fn fill_object(&self, value: &Value, parent: Option<&str>) -> CotomyResult<()> {
        let Value::Object(map) = value else {
            return Ok(());
        };
        for (key, value) in map {
            if key.ends_with("[]") {
                continue;
            }
            let name = self.generator.create(key, parent);
            match value {
                Value::Array(_) => continue,
                Value::Object(_) => {
                    self.fill_object(value, Some(&name))?;
                    continue;
                }
                _ => {}
            }

            let name = quoted(&name);
            let selector = format!(
                "input[name={name} i]:not([data-cotomy-fill=\"false\"]):not([multiple]), \
                 textarea[name={name} i]:not([data-cotomy-fill=\"false\"]), \
                 select[name={name} i]:not([data-cotomy-fill=\"false\"]):not([multiple])"
            );
            for input in self.element().find(&selector)? {
                self.fill_input(&input, value);
            }
        }
        Ok(())
    }

    fn fill_input(&self, input: &CotomyElement, value: &Value) {
        if self.element().window().debugging(DebugFeature::Fill) {
            tracing::debug!(
                "Filling input[name=\"{}\"] with value: {}",
                input.attribute("name").unwrap_or_default(),
                value
            );
        }
        let filler = input
            .attribute("type")
            .and_then(|t| self.fillers.borrow().get(&t.to_ascii_lowercase()).cloned());
        match filler {
            Some(filler) => filler(input, value),
            None => {
                input.set_value(&value_text(value));
            }
        }
    }

    /// Submit `body` and fill from an OK response
    pub async fn submit_form_data(&self, body: FormData) -> CotomyResult<ApiResponse> {
        let response = self.entity.submit_form_data(body).await?;
        if response.ok() {
            self.fill(&response)?;
        }
        Ok(response)
    }
}

impl Form for EntityFillApiForm {
    fn element(&self) -> &CotomyElement {
        self.entity.element()
    }

    fn method(&self) -> String {
        self.entity.method()
    }

    fn action_url(&self) -> String {
        self.entity.action_url()
    }

    fn submit(&self) -> LocalFuture<'_, CotomyResult<()>> {
        Box::pin(async move {
            let body = self.entity.form_data()?;
            self.submit_form_data(body).await?;
            Ok(())
        })
    }

    fn reload(&self) -> LocalFuture<'_, CotomyResult<()>> {
        Box::pin(async move {
            self.load().await?;
            Ok(())
        })
    }

    /// Bind submit, install the built-in fillers and load once the window is ready
    fn initialize(&self) -> CotomyResult<()> {
        if self.initialized() {
            return Ok(());
        }
        if let Err(e) = self.entity.check_key_sources() {
            tracing::warn!("{}", e);
        }
        bind_submit(self);
        self.register_builtin_fillers();

        let form = self.clone();
        let window = self.element().window().clone();
        window.ready(&EventHandler::new(move |_| {
            let form = form.clone();
            form.element().window().clone().spawn(async move {
                if let Err(e) = form.load().await {
                    tracing::error!("Form load failed: {}", e);
                }
            });
        }));
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
