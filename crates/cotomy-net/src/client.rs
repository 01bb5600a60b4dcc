//! API Client
//!
//! Builds requests from [`ApiOptions`], transforms bodies by content type,
//! sends them through a [`Transport`] and maps 4xx/5xx statuses to
//! [`ApiException`]s.

use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

use cotomy_dom::{AbortController, AbortSignal, FormData};
use serde_json::Value;
use smol::future::FutureExt;
use url::form_urlencoded;

use crate::error::{ApiError, ApiException, ApiResult};
use crate::options::{ApiOptions, Cache, Credentials, Mode, Redirect, ReferrerPolicy};
use crate::{ApiResponse, Body, Method, Request, Transport};

const MULTIPART: &str = "multipart/form-data";
const JSON: &str = "application/json";
const URLENCODED: &str = "application/x-www-form-urlencoded";

/// Request body before content-type transformation
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Form(FormData),
    Map(Vec<(String, String)>),
    Json(Value),
    Text(String),
}

impl From<FormData> for RequestBody {
    fn from(form: FormData) -> Self {
        Self::Form(form)
    }
}

impl From<Value> for RequestBody {
    fn from(value: Value) -> Self {
        Self::Json(value)
    }
}

impl From<&str> for RequestBody {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for RequestBody {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl<K: Into<String>, V: Into<String>> From<Vec<(K, V)>> for RequestBody {
    fn from(pairs: Vec<(K, V)>) -> Self {
        Self::Map(pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl From<BTreeMap<String, String>> for RequestBody {
    fn from(map: BTreeMap<String, String>) -> Self {
        Self::Map(map.into_iter().collect())
    }
}

impl From<HashMap<String, String>> for RequestBody {
    fn from(map: HashMap<String, String>) -> Self {
        let mut pairs: Vec<(String, String)> = map.into_iter().collect();
        pairs.sort();
        Self::Map(pairs)
    }
}

impl RequestBody {
    /// Name/value pairs for urlencoded and multipart encodings
    fn pairs(&self) -> Option<Vec<(String, String)>> {
        match self {
            Self::Form(form) => Some(
                form.text_entries()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            ),
            Self::Map(pairs) => Some(pairs.clone()),
            Self::Json(Value::Object(map)) => Some(
                map.iter()
                    .map(|(k, v)| (k.clone(), value_to_string(v)))
                    .collect(),
            ),
            Self::Json(_) | Self::Text(_) => None,
        }
    }
}

/// Method, action and body of a form submission
#[derive(Debug, Clone, PartialEq)]
pub struct SubmitRequest {
    pub method: String,
    pub action: String,
    pub body: RequestBody,
}

/// API client builder
#[derive(Debug, Clone, Default)]
pub struct ApiClientBuilder {
    options: ApiOptions,
}

impl ApiClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn options(mut self, options: ApiOptions) -> Self {
        self.options = options;
        self
    }

    pub fn base_url(mut self, url: &str) -> Self {
        self.options.base_url = url.to_string();
        self
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.options.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.options.credentials = credentials;
        self
    }

    pub fn redirect(mut self, redirect: Redirect) -> Self {
        self.options.redirect = redirect;
        self
    }

    pub fn cache(mut self, cache: Cache) -> Self {
        self.options.cache = cache;
        self
    }

    pub fn referrer_policy(mut self, policy: ReferrerPolicy) -> Self {
        self.options.referrer_policy = policy;
        self
    }

    pub fn mode(mut self, mode: Mode) -> Self {
        self.options.mode = mode;
        self
    }

    pub fn keepalive(mut self, keepalive: bool) -> Self {
        self.options.keepalive = keepalive;
        self
    }

    pub fn integrity(mut self, integrity: &str) -> Self {
        self.options.integrity = integrity.to_string();
        self
    }

    pub fn debug(mut self, enabled: bool) -> Self {
        self.options.debug = enabled;
        self
    }

    pub fn build(self, transport: Rc<dyn Transport>) -> ApiClient {
        ApiClient::with_config(self.options, transport)
    }
}

/// API client
pub struct ApiClient {
    config: ApiOptions,
    transport: Rc<dyn Transport>,
    controller: AbortController,
}

impl ApiClient {
    /// Client with default options
    pub fn new(transport: Rc<dyn Transport>) -> Self {
        Self::with_config(ApiOptions::default(), transport)
    }

    /// Create a client builder
    pub fn builder() -> ApiClientBuilder {
        ApiClientBuilder::new()
    }

    /// Create with custom config
    pub fn with_config(config: ApiOptions, transport: Rc<dyn Transport>) -> Self {
        Self {
            config,
            transport,
            controller: AbortController::new(),
        }
    }

    pub fn config(&self) -> &ApiOptions {
        &self.config
    }

    /// Controller whose signal cancels calls made without their own signal
    pub fn abort_controller(&self) -> &AbortController {
        &self.controller
    }

    /// Abort in-flight and future calls that use the shared signal
    pub fn abort(&self) {
        self.controller.abort();
    }

    /// Resolve `path` against the base URL.
    ///
    /// A path starting with an ASCII letter is an absolute or relative URL
    /// and is used unchanged.
    pub fn compose_url(&self, path: &str) -> String {
        if path.starts_with(|c: char| c.is_ascii_alphabetic()) {
            return path.to_string();
        }
        format!(
            "{}/{}",
            self.config.base_url.strip_suffix('/').unwrap_or(&self.config.base_url),
            path.strip_prefix('/').unwrap_or(path)
        )
    }

    /// Send a request.
    ///
    /// `signal` overrides the client's shared abort signal for this call.
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<RequestBody>,
        signal: Option<&AbortSignal>,
    ) -> ApiResult<ApiResponse> {
        if self.config.debug {
            tracing::debug!("API request: {} {} body={:?}", method, path, body);
        }

        let url = self.compose_url(path);
        let mut headers = self.config.headers.clone();
        headers.retain(|(k, v)| !(k.eq_ignore_ascii_case("content-type") && mime_essence(v) == MULTIPART));
        let content_type = headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case("content-type"))
            .map(|(_, v)| mime_essence(v))
            .unwrap_or_else(|| MULTIPART.to_string());
        let body = body.map(|b| transform_body(&content_type, b)).transpose()?;

        let signal = signal.cloned().unwrap_or_else(|| self.controller.signal());
        if signal.is_aborted() {
            return Err(ApiError::Aborted);
        }

        let request = Request {
            method,
            url,
            headers,
            body,
            credentials: self.config.credentials,
            redirect: self.config.redirect,
            cache: self.config.cache,
            referrer_policy: self.config.referrer_policy,
            mode: self.config.mode,
            keepalive: self.config.keepalive,
            integrity: self.config.integrity.clone(),
        };

        let fetch = self.transport.fetch(request);
        let outcome = async { Some(fetch.await) }
            .or(async {
                signal.aborted().await;
                None
            })
            .await;
        let raw = outcome.ok_or(ApiError::Aborted)??;
        let response = ApiResponse::from(raw);

        if let Some(exception) = ApiException::from_response(response.clone()) {
            if self.config.debug {
                tracing::error!("API request failed: {} ({})", exception.message, exception.status);
            }
            return Err(exception.into());
        }
        Ok(response)
    }

    /// GET with optional query parameters
    pub async fn get(&self, path: &str, parameters: Option<RequestBody>) -> ApiResult<ApiResponse> {
        let query = parameters.as_ref().map(query_string).unwrap_or_default();
        let full = if query.is_empty() {
            path.to_string()
        } else {
            format!("{}?{}", path, query)
        };
        if self.config.debug {
            tracing::debug!("GET request to: {}", full);
        }
        self.send(Method::Get, &full, None, None).await
    }

    pub async fn post(&self, path: &str, body: impl Into<RequestBody>) -> ApiResult<ApiResponse> {
        self.send(Method::Post, path, Some(body.into()), None).await
    }

    pub async fn put(&self, path: &str, body: impl Into<RequestBody>) -> ApiResult<ApiResponse> {
        self.send(Method::Put, path, Some(body.into()), None).await
    }

    pub async fn patch(&self, path: &str, body: impl Into<RequestBody>) -> ApiResult<ApiResponse> {
        self.send(Method::Patch, path, Some(body.into()), None).await
    }

    pub async fn delete(&self, path: &str) -> ApiResult<ApiResponse> {
        self.send(Method::Delete, path, None, None).await
    }

    pub async fn head(&self, path: &str) -> ApiResult<ApiResponse> {
        self.send(Method::Head, path, None, None).await
    }

    pub async fn options(&self, path: &str) -> ApiResult<ApiResponse> {
        self.send(Method::Options, path, None, None).await
    }

    pub async fn trace(&self, path: &str) -> ApiResult<ApiResponse> {
        self.send(Method::Trace, path, None, None).await
    }

    pub async fn connect(&self, path: &str) -> ApiResult<ApiResponse> {
        self.send(Method::Connect, path, None, None).await
    }

    /// Submit a form: GET becomes a query string, other methods send the body
    pub async fn submit(&self, form: SubmitRequest) -> ApiResult<ApiResponse> {
        let method = Method::parse(&form.method)?;
        if method == Method::Get {
            self.get(&form.action, Some(form.body)).await
        } else {
            self.send(method, &form.action, Some(form.body), None).await
        }
    }
}

/// Lowercase media type without parameters
fn mime_essence(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn urlencode(pairs: &[(String, String)]) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (k, v) in pairs {
        serializer.append_pair(k, v);
    }
    serializer.finish()
}

fn query_string(parameters: &RequestBody) -> String {
    match parameters.pairs() {
        Some(pairs) => urlencode(&pairs),
        None => match parameters {
            RequestBody::Text(text) => text.trim_start_matches('?').to_string(),
            _ => String::new(),
        },
    }
}

fn transform_body(content_type: &str, body: RequestBody) -> ApiResult<Body> {
    match content_type {
        JSON => {
            let value = match body {
                RequestBody::Json(value) => value,
                RequestBody::Text(text) => Value::String(text),
                other => Value::Object(
                    other
                        .pairs()
                        .unwrap_or_default()
                        .into_iter()
                        .map(|(k, v)| (k, Value::String(v)))
                        .collect(),
                ),
            };
            Ok(Body::Text(value.to_string()))
        }
        URLENCODED => match body.pairs() {
            Some(pairs) => Ok(Body::Text(urlencode(&pairs))),
            None => match body {
                RequestBody::Text(text) => Ok(Body::Text(text)),
                RequestBody::Json(value) => Ok(Body::Text(value_to_string(&value))),
                _ => Ok(Body::Text(String::new())),
            },
        },
        MULTIPART => match body {
            RequestBody::Form(form) => Ok(Body::Form(form)),
            other => {
                let pairs = other.pairs().ok_or(ApiError::InvalidFormDataBody)?;
                let mut form = FormData::new();
                for (k, v) in pairs {
                    form.append(k, v);
                }
                Ok(Body::Form(form))
            }
        },
        _ => Ok(match body {
            RequestBody::Form(form) => Body::Form(form),
            RequestBody::Text(text) => Body::Text(text),
            RequestBody::Json(value) => Body::Text(value.to_string()),
            RequestBody::Map(pairs) => Body::Text(urlencode(&pairs)),
        }),
    }
}
