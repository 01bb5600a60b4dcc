//! API form

use std::any::Any;
use std::ops::Deref;

use cotomy_dom::FormData;
use cotomy_net::{ApiClient, ApiError, ApiResponse, LocalFuture, RequestBody, SubmitRequest};

use super::{Form, bind_submit};
use crate::events::EventHandler;
use crate::{CotomyElement, CotomyResult, DebugFeature, ElementWrap, datetime};

/// Raised on the form when any API call fails with an HTTP status
pub const API_FAILED: &str = "cotomy:apifailed";
/// Raised on the form when a submit fails with an HTTP status
pub const SUBMIT_FAILED: &str = "cotomy:submitfailed";

/// Form submitted through an [`ApiClient`]
#[derive(Debug, Clone)]
pub struct ApiForm {
    element: CotomyElement,
}

impl ElementWrap for ApiForm {
    fn wrap(element: CotomyElement) -> Self {
        Self { element }
    }
}

impl Deref for ApiForm {
    type Target = CotomyElement;

    fn deref(&self) -> &CotomyElement {
        &self.element
    }
}

impl ApiForm {
    /// Client built from the window configuration
    pub fn api_client(&self) -> ApiClient {
        self.element.window().api_client()
    }

    /// Named enabled controls; `datetime-local` values get the window offset appended
    pub fn form_data(&self) -> CotomyResult<FormData> {
        let mut data = {
            let doc = self.element.window().document();
            FormData::from_form(doc.tree(), self.element.node())
        };

        let window = self.element.window();
        let offset = window.config().utc_offset;
        for input in self.element.find("input[type=datetime-local][name]:not([disabled])")? {
            let value = input.value();
            let Some(name) = input.attribute("name") else {
                continue;
            };
            if value.is_empty() {
                continue;
            }
            let Some(naive) = datetime::parse_naive(&value) else {
                continue;
            };
            if let Some(local) = naive.and_local_timezone(offset).single() {
                data.set(&name, local.format("%Y-%m-%dT%H:%M%:z").to_string());
            }
        }

        if window.debugging(DebugFeature::FormData) {
            let entries: Vec<(&str, &str)> = data.text_entries().collect();
            tracing::debug!("FormData: {:?}", entries);
        }
        Ok(data)
    }

    /// Send `body` to `action`; HTTP failures raise the failure events before returning the error
    pub async fn send(&self, method: &str, action: &str, body: RequestBody) -> CotomyResult<ApiResponse> {
        let client = self.api_client();
        let request = SubmitRequest {
            method: method.to_string(),
            action: action.to_string(),
            body,
        };
        match client.submit(request).await {
            Ok(response) => Ok(response),
            Err(error) => {
                if let ApiError::Http(exception) = &error {
                    self.trigger_api_failed(&exception.response);
                    self.trigger_submit_failed(&exception.response);
                }
                Err(error.into())
            }
        }
    }

    /// Submit the form data with [`Form::method`] to [`Form::action_url`]
    pub async fn submit_form_data(&self, body: FormData) -> CotomyResult<ApiResponse> {
        self.send(&self.method(), &self.action_url(), body.into()).await
    }

    pub fn api_failed(&self, handler: &EventHandler) -> &Self {
        self.element.on(API_FAILED, handler);
        self
    }

    pub fn submit_failed(&self, handler: &EventHandler) -> &Self {
        self.element.on(SUBMIT_FAILED, handler);
        self
    }

    pub(crate) fn trigger_api_failed(&self, response: &ApiResponse) {
        self.element.trigger_detail(API_FAILED, response.clone());
        if self.element.window().debugging(DebugFeature::Api) {
            tracing::error!("API request failed: {}", response.status());
        }
    }

    pub(crate) fn trigger_submit_failed(&self, response: &ApiResponse) {
        self.element.trigger_detail(SUBMIT_FAILED, response.clone());
        if self.element.window().debugging(DebugFeature::Api) {
            tracing::error!("Submit failed: {}", response.status());
        }
    }
}

impl Form for ApiForm {
    fn element(&self) -> &CotomyElement {
        &self.element
    }

    fn method(&self) -> String {
        self.element
            .attribute("method")
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| "post".to_string())
    }

    fn action_url(&self) -> String {
        self.element.attribute("action").unwrap_or_default()
    }

    fn submit(&self) -> LocalFuture<'_, CotomyResult<()>> {
        Box::pin(async move {
            let body = self.form_data()?;
            self.submit_form_data(body).await?;
            Ok(())
        })
    }

    fn initialize(&self) -> CotomyResult<()> {
        bind_submit(self);
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CotomyWindow, WindowConfig};
    use chrono::FixedOffset;
    use cotomy_net::mock::{MockResponse, MockTransport};
    use cotomy_net::{ApiOptions, Method};
    use pretty_assertions::assert_eq;
    use std::cell::Cell;
    use std::rc::Rc;

    fn setup(config: WindowConfig) -> (Rc<CotomyWindow>, Rc<MockTransport>) {
        let transport = Rc::new(MockTransport::new());
        let window = CotomyWindow::with_config("https://example.com/", transport.clone(), config);
        (window, transport)
    }

    fn api_config() -> WindowConfig {
        WindowConfig::utc().with_api(ApiOptions {
            base_url: "https://api.example.com".to_string(),
            ..ApiOptions::default()
        })
    }

    #[test]
    fn test_form_data_datetime_offset() {
        let (window, _) = setup(WindowConfig::utc().with_utc_offset(FixedOffset::east_opt(9 * 3600).unwrap()));
        let form: ApiForm = window
            .create_as(
                r#"<form action="/api/events">
                    <input name="title" value="launch">
                    <input type="datetime-local" name="at" value="2024-05-01T10:30">
                    <input type="datetime-local" name="empty" value="">
                    <input type="datetime-local" name="off" value="2024-05-01T10:30" disabled>
                </form>"#,
            )
            .unwrap();
        let data = form.form_data().unwrap();
        assert_eq!(data.get("title"), Some("launch"));
        assert_eq!(data.get("at"), Some("2024-05-01T10:30+09:00"));
        assert_eq!(data.get("empty"), Some(""));
        assert!(!data.has("off"));
    }

    #[test]
    fn test_method_default_and_override() {
        let (window, _) = setup(WindowConfig::utc());
        let form: ApiForm = window.create_as(r#"<form action="/a"></form>"#).unwrap();
        assert_eq!(form.method(), "post");
        form.set_attribute("method", "patch");
        assert_eq!(form.method(), "patch");
    }

    #[test]
    fn test_submit_failure_events() {
        let (window, transport) = setup(api_config());
        transport.on(Method::Post, "https://api.example.com/api/users", MockResponse::status(422));
        let form: ApiForm = window
            .create_as(r#"<form action="/api/users"><input name="name" value="x"></form>"#)
            .unwrap();
        window.append(&form).unwrap();

        let api_status = Rc::new(Cell::new(0));
        let submit_status = Rc::new(Cell::new(0));
        let seen = Rc::clone(&api_status);
        form.api_failed(&EventHandler::new(move |e| {
            seen.set(e.detail::<ApiResponse>().map_or(0, ApiResponse::status));
        }));
        let seen = Rc::clone(&submit_status);
        form.submit_failed(&EventHandler::new(move |e| {
            seen.set(e.detail::<ApiResponse>().map_or(0, ApiResponse::status));
        }));

        let result = window.block_on(form.submit());
        let error = result.unwrap_err();
        assert_eq!(error.api().and_then(ApiError::status), Some(422));
        assert_eq!(api_status.get(), 422);
        assert_eq!(submit_status.get(), 422);
    }

    #[test]
    fn test_submit_sends_form_body() {
        let (window, transport) = setup(api_config());
        transport.on(Method::Post, "https://api.example.com/api/users", MockResponse::status(200));
        let form: ApiForm = window
            .create_as(r#"<form action="/api/users"><input name="name" value="Alice"></form>"#)
            .unwrap();
        window.block_on(form.submit()).unwrap();

        let request = transport.last_request().unwrap();
        assert_eq!(request.body_form().and_then(|f| f.get("name")), Some("Alice"));
    }
}
