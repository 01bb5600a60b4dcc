//! Entity form
//!
//! An entity form targets one REST resource. Its key comes from, in order:
//! the external key attribute, inputs carrying a path index
//! (`data-cotomy-keyindex`, joined as path segments) or inputs marked as
//! named key fields (`data-cotomy-keyfield`, sent as query parameters). With
//! an external key, or with every key input read-only, the form updates with
//! PUT; otherwise it creates with POST and takes the new key from the
//! `Location` header of a `201 Created` response.

use std::any::Any;
use std::ops::Deref;

use cotomy_dom::FormData;
use cotomy_net::{ApiResponse, LocalFuture};
use url::{Url, form_urlencoded};

use super::{ApiForm, Form, bind_submit};
use crate::{CotomyElement, CotomyError, CotomyResult, DebugFeature, ElementWrap};

pub(crate) const KEY_ATTR: &str = "data-cotomy-key";
pub(crate) const KEY_INDEX_ATTR: &str = "data-cotomy-keyindex";
pub(crate) const KEY_FIELD_ATTR: &str = "data-cotomy-keyfield";
const IDENTIFY_ATTR: &str = "data-cotomy-identify";

const CREATED: u16 = 201;

/// Identity of the entity a form edits
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityKey {
    /// Known outside the inputs
    External(String),
    /// Path key input values in index order
    Path(Vec<String>),
    /// `(name, value)` of the named key inputs
    Named(Vec<(String, String)>),
}

/// Percent-encode one path segment
fn encode_segment(segment: &str) -> String {
    let Ok(mut url) = Url::parse("http://localhost/") else {
        return segment.to_string();
    };
    if let Ok(mut segments) = url.path_segments_mut() {
        segments.clear().push(segment);
    }
    url.path().trim_start_matches('/').to_string()
}

/// Path without query, fragment and one trailing slash
fn normalize_path(path: &str) -> &str {
    let end = path.find(['?', '#']).unwrap_or(path.len());
    let path = &path[..end];
    path.strip_suffix('/').unwrap_or(path)
}

/// Single segment that `location` adds to `action`
///
/// Relative paths resolve against `location` when it is absolute, else
/// against `page`.
pub(crate) fn key_from_location(action: &str, location: &str, page: &str) -> CotomyResult<String> {
    let base = Url::parse(location)
        .or_else(|_| Url::parse(page).and_then(|p| p.join(location)))
        .ok();
    let to_path = |value: &str| -> String {
        base.as_ref()
            .and_then(|b| b.join(value).ok())
            .map(|u| u.path().to_string())
            .unwrap_or_else(|| value.to_string())
    };

    let action_path = to_path(action);
    let location_path = to_path(location);
    let action_path = normalize_path(&action_path);
    let location_path = normalize_path(&location_path);

    let action_parts: Vec<&str> = action_path.split('/').collect();
    let location_parts: Vec<&str> = location_path.split('/').collect();
    let is_prefix = location_parts.len() >= action_parts.len()
        && action_parts.iter().zip(&location_parts).all(|(a, l)| a == l);
    if !is_prefix {
        return Err(CotomyError::LocationMismatch {
            action: action_path.to_string(),
            location: location_path.to_string(),
        });
    }

    let added: Vec<String> = location_parts[action_parts.len()..]
        .iter()
        .filter(|p| !p.is_empty())
        .map(|p| p.to_string())
        .collect();
    match added.as_slice() {
        [key] => Ok(key.clone()),
        _ => Err(CotomyError::AmbiguousLocation {
            action: action_path.to_string(),
            location: location_path.to_string(),
            added,
        }),
    }
}

/// Form bound to one REST entity
#[derive(Debug, Clone)]
pub struct EntityApiForm {
    api: ApiForm,
}

impl ElementWrap for EntityApiForm {
    fn wrap(element: CotomyElement) -> Self {
        Self {
            api: ApiForm::wrap(element),
        }
    }
}

impl Deref for EntityApiForm {
    type Target = ApiForm;

    fn deref(&self) -> &ApiForm {
        &self.api
    }
}

impl EntityApiForm {
    pub fn api_form(&self) -> &ApiForm {
        &self.api
    }

    /// Non-empty external key attribute
    pub fn external_key(&self) -> Option<String> {
        self.api.attribute(KEY_ATTR).filter(|k| !k.is_empty())
    }

    pub fn set_external_key(&self, key: Option<&str>) {
        match key {
            Some(key) => self.api.set_attribute(KEY_ATTR, key),
            None => self.api.remove_attribute(KEY_ATTR),
        };
    }

    /// Path key inputs ordered by index
    pub fn path_key_inputs(&self) -> CotomyResult<Vec<CotomyElement>> {
        let mut inputs: Vec<(i64, CotomyElement)> = self
            .api
            .find(&format!("[{KEY_INDEX_ATTR}]"))?
            .into_iter()
            .map(|input| {
                let raw = input.attribute(KEY_INDEX_ATTR).unwrap_or_default();
                let index = raw.trim().parse().unwrap_or_else(|_| {
                    tracing::warn!("Invalid key index \"{}\"", raw);
                    i64::MAX
                });
                (index, input)
            })
            .collect();
        inputs.sort_by_key(|(index, _)| *index);
        Ok(inputs.into_iter().map(|(_, input)| input).collect())
    }

    pub fn named_key_inputs(&self) -> CotomyResult<Vec<CotomyElement>> {
        self.api.find(&format!("[{KEY_FIELD_ATTR}]:not([{KEY_INDEX_ATTR}])"))
    }

    fn key_inputs(&self) -> CotomyResult<Vec<CotomyElement>> {
        let mut inputs = self.path_key_inputs()?;
        inputs.extend(self.named_key_inputs()?);
        Ok(inputs)
    }

    fn composite_key(&self) -> CotomyResult<Option<EntityKey>> {
        let path = self.path_key_inputs()?;
        if !path.is_empty() {
            let values: Vec<String> = path.iter().map(CotomyElement::value).collect();
            return Ok(values.iter().all(|v| !v.is_empty()).then_some(EntityKey::Path(values)));
        }

        let named = self.named_key_inputs()?;
        if named.is_empty() {
            return Ok(None);
        }
        let pairs: Vec<(String, String)> = named
            .iter()
            .map(|input| {
                let name = input
                    .attribute(KEY_FIELD_ATTR)
                    .filter(|n| !n.is_empty())
                    .or_else(|| input.attribute("name"))
                    .unwrap_or_default();
                (name, input.value())
            })
            .collect();
        Ok(pairs
            .iter()
            .all(|(n, v)| !n.is_empty() && !v.is_empty())
            .then_some(EntityKey::Named(pairs)))
    }

    /// Key from the first source that yields one
    pub fn entity_key(&self) -> CotomyResult<Option<EntityKey>> {
        if let Some(key) = self.external_key() {
            return Ok(Some(EntityKey::External(key)));
        }
        self.composite_key()
    }

    pub fn has_entity_key(&self) -> bool {
        matches!(self.entity_key(), Ok(Some(_)))
    }

    /// Fails when an external key and key inputs are both present
    pub fn check_key_sources(&self) -> CotomyResult<()> {
        if let Some(key) = self.external_key() {
            if !self.key_inputs()?.is_empty() {
                return Err(CotomyError::KeyConflict(format!(
                    "form has external key \"{key}\" and key inputs; the external key is used"
                )));
            }
        }
        Ok(())
    }

    /// Every key input is read-only
    pub fn key_locked(&self) -> bool {
        self.key_inputs()
            .is_ok_and(|inputs| !inputs.is_empty() && inputs.iter().all(CotomyElement::readonly))
    }

    pub fn lock_key_inputs(&self) -> CotomyResult<()> {
        for input in self.key_inputs()? {
            input.set_readonly(true);
        }
        Ok(())
    }

    /// `data-cotomy-identify` is not `false`
    pub fn requires_entity_key(&self) -> bool {
        self.api.attribute(IDENTIFY_ATTR).as_deref() != Some("false")
    }

    /// Existing entity: external key or locked key inputs
    pub fn updating(&self) -> bool {
        self.external_key().is_some() || self.key_locked()
    }

    fn base_action(&self) -> String {
        self.api.attribute("action").unwrap_or_default()
    }

    fn keyed_url(&self, key: &EntityKey) -> String {
        let action = self.base_action();
        let trimmed = action.trim_end_matches('/');
        match key {
            EntityKey::External(key) => format!("{trimmed}/{}", encode_segment(key)),
            EntityKey::Path(values) => {
                let segments: Vec<String> = values.iter().map(|v| encode_segment(v)).collect();
                format!("{trimmed}/{}", segments.join("/"))
            }
            EntityKey::Named(pairs) => {
                let query = form_urlencoded::Serializer::new(String::new())
                    .extend_pairs(pairs)
                    .finish();
                format!("{trimmed}?{query}")
            }
        }
    }

    fn collection_url(&self) -> String {
        let action = self.base_action();
        if action.ends_with('/') {
            action
        } else {
            format!("{}/", action.trim_end_matches('/'))
        }
    }

    /// URL the entity is loaded from
    pub fn load_action_url(&self) -> CotomyResult<String> {
        Ok(match self.entity_key()? {
            Some(key) => self.keyed_url(&key),
            None => self.collection_url(),
        })
    }

    /// Adopt the key of a created entity from a `201` response
    pub fn set_entity_key(&self, response: &ApiResponse) -> CotomyResult<()> {
        if !self.requires_entity_key() || response.status() != CREATED {
            return Ok(());
        }
        match self.entity_key()? {
            Some(EntityKey::External(_)) => {
                if self.api.window().debugging(DebugFeature::FormLoad) {
                    tracing::warn!(
                        "Entity key already exists, but server responded with 201 Created. Possible duplicate POST."
                    );
                }
                return Ok(());
            }
            Some(_) => return self.lock_key_inputs(),
            None => {}
        }

        let Some(location) = response.header("location") else {
            return Ok(());
        };
        let page = self.api.window().location();
        let key = key_from_location(&self.base_action(), location, &page)?;
        tracing::debug!("Entity key {} taken from Location {}", key, location);
        self.api.set_attribute(KEY_ATTR, &key);
        Ok(())
    }

    /// Submit `body` and adopt the key of a created entity
    pub async fn submit_form_data(&self, body: FormData) -> CotomyResult<ApiResponse> {
        let response = self.api.send(&self.method(), &self.action_url(), body.into()).await?;
        self.set_entity_key(&response)?;
        Ok(response)
    }
}

impl Form for EntityApiForm {
    fn element(&self) -> &CotomyElement {
        self.api.element()
    }

    /// Non-empty `method` attribute, else PUT when updating and POST when creating
    fn method(&self) -> String {
        if let Some(method) = self.api.attribute("method").filter(|m| !m.is_empty()) {
            return method;
        }
        let method = if self.updating() { "put" } else { "post" };
        method.to_string()
    }

    fn action_url(&self) -> String {
        match self.entity_key() {
            Ok(Some(key)) if self.updating() => self.keyed_url(&key),
            _ => self.collection_url(),
        }
    }

    fn submit(&self) -> LocalFuture<'_, CotomyResult<()>> {
        Box::pin(async move {
            let body = self.api.form_data()?;
            self.submit_form_data(body).await?;
            Ok(())
        })
    }

    fn initialize(&self) -> CotomyResult<()> {
        if let Err(e) = self.check_key_sources() {
            tracing::warn!("{}", e);
        }
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
    use cotomy_net::mock::{MockResponse, MockTransport};
    use cotomy_net::{ApiOptions, Method};
    use pretty_assertions::assert_eq;
    use std::rc::Rc;

    fn setup() -> (Rc<CotomyWindow>, Rc<MockTransport>) {
        let transport = Rc::new(MockTransport::new());
        let config = WindowConfig::utc().with_api(ApiOptions {
            base_url: "https://example.com".to_string(),
            ..ApiOptions::default()
        });
        let window = CotomyWindow::with_config("https://example.com/users/new", transport.clone(), config);
        (window, transport)
    }

    #[test]
    fn test_key_from_location() {
        let page = "https://example.com/users/new";
        assert_eq!(key_from_location("/api/users", "/api/users/456", page).unwrap(), "456");
        assert_eq!(
            key_from_location("/api/users/", "https://example.com/api/users/9/?x=1#top", page).unwrap(),
            "9"
        );
        assert!(matches!(
            key_from_location("/api/users", "/api/other/456", page),
            Err(CotomyError::LocationMismatch { .. })
        ));
        match key_from_location("/api/users", "/api/users/456/extra", page) {
            Err(CotomyError::AmbiguousLocation { added, .. }) => assert_eq!(added, vec!["456", "extra"]),
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(
            key_from_location("/api/users", "/api/users", page),
            Err(CotomyError::AmbiguousLocation { .. })
        ));
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("/a/b/?q=1"), "/a/b");
        assert_eq!(normalize_path("/a#x"), "/a");
        assert_eq!(normalize_path("/"), "");
    }

    #[test]
    fn test_encode_segment() {
        assert_eq!(encode_segment("a b/c"), "a%20b%2Fc");
        assert_eq!(encode_segment("42"), "42");
    }

    #[test]
    fn test_path_key_order_and_urls() {
        let (window, _) = setup();
        let form: EntityApiForm = window
            .create_as(
                r#"<form action="/api/orders/">
                    <input name="line" data-cotomy-keyindex="2" value="3" readonly>
                    <input name="order" data-cotomy-keyindex="1" value="A 1" readonly>
                </form>"#,
            )
            .unwrap();
        assert_eq!(
            form.entity_key().unwrap(),
            Some(EntityKey::Path(vec!["A 1".to_string(), "3".to_string()]))
        );
        assert_eq!(form.method(), "put");
        assert_eq!(form.action_url(), "/api/orders/A%201/3");

        form.path_key_inputs().unwrap()[0].set_readonly(false);
        assert_eq!(form.method(), "post");
        assert_eq!(form.action_url(), "/api/orders/");
        assert_eq!(form.load_action_url().unwrap(), "/api/orders/A%201/3");
    }

    #[test]
    fn test_named_key_load_url() {
        let (window, _) = setup();
        let form: EntityApiForm = window
            .create_as(
                r#"<form action="/api/settings">
                    <input name="tenant" data-cotomy-keyfield value="acme">
                    <input name="code" data-cotomy-keyfield="key" value="x&y">
                </form>"#,
            )
            .unwrap();
        assert_eq!(form.load_action_url().unwrap(), "/api/settings?tenant=acme&key=x%26y");

        form.find("[name=code]").unwrap()[0].set_value("");
        assert_eq!(form.entity_key().unwrap(), None);
    }

    #[test]
    fn test_key_conflict() {
        let (window, _) = setup();
        let form: EntityApiForm = window
            .create_as(r#"<form action="/api/a" data-cotomy-key="7"><input data-cotomy-keyindex="0" value="1"></form>"#)
            .unwrap();
        assert!(matches!(form.check_key_sources(), Err(CotomyError::KeyConflict(_))));
        assert_eq!(form.entity_key().unwrap(), Some(EntityKey::External("7".to_string())));
    }

    #[test]
    fn test_created_then_updated() {
        let (window, transport) = setup();
        transport.on(
            Method::Post,
            "https://example.com/api/users/",
            MockResponse::status(201).with_header("Location", "/api/users/456"),
        );
        transport.on(Method::Put, "https://example.com/api/users/456", MockResponse::status(200));

        let form: EntityApiForm = window
            .create_as(r#"<form action="/api/users"><input name="name" value="x"></form>"#)
            .unwrap();
        assert_eq!(form.method(), "post");
        window.block_on(form.submit()).unwrap();
        assert_eq!(form.external_key().as_deref(), Some("456"));

        assert_eq!(form.method(), "put");
        window.block_on(form.submit()).unwrap();
        let request = transport.last_request().unwrap();
        assert_eq!(request.method, Method::Put);
        assert_eq!(request.url, "https://example.com/api/users/456");
    }

    #[test]
    fn test_identify_false_ignores_location() {
        let (window, transport) = setup();
        transport.on(
            Method::Post,
            "https://example.com/api/logs/",
            MockResponse::status(201).with_header("Location", "/elsewhere/1/2"),
        );
        let form: EntityApiForm = window
            .create_as(r#"<form action="/api/logs" data-cotomy-identify="false"></form>"#)
            .unwrap();
        window.block_on(form.submit()).unwrap();
        assert_eq!(form.external_key(), None);
    }

    #[test]
    fn test_mismatched_location_fails_submit() {
        let (window, transport) = setup();
        transport.on(
            Method::Post,
            "https://example.com/api/users/",
            MockResponse::status(201).with_header("Location", "/api/other/1"),
        );
        let form: EntityApiForm = window.create_as(r#"<form action="/api/users"></form>"#).unwrap();
        let result = window.block_on(form.submit());
        assert!(matches!(result, Err(CotomyError::LocationMismatch { .. })));
    }
}
