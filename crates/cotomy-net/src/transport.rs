//! Transport
//!
//! The seam between [`ApiClient`](crate::ApiClient) and the host's `fetch`.
//! A transport receives a fully prepared [`Request`] and resolves to the raw
//! status, headers and body.

use std::future::Future;
use std::pin::Pin;

use cotomy_dom::FormData;

use crate::options::{Cache, Credentials, Mode, Redirect, ReferrerPolicy};
use crate::NetError;

/// Boxed single-threaded future
pub type LocalFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

/// HTTP method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Method {
    #[default]
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
    Trace,
    Connect,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
            Method::Head => "HEAD",
            Method::Options => "OPTIONS",
            Method::Trace => "TRACE",
            Method::Connect => "CONNECT",
        }
    }

    /// Parse a method name case-insensitively
    pub fn parse(s: &str) -> Result<Self, NetError> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "PATCH" => Ok(Method::Patch),
            "DELETE" => Ok(Method::Delete),
            "HEAD" => Ok(Method::Head),
            "OPTIONS" => Ok(Method::Options),
            "TRACE" => Ok(Method::Trace),
            "CONNECT" => Ok(Method::Connect),
            _ => Err(NetError::InvalidMethod(s.to_string())),
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request body after content-type transformation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Body {
    /// Serialized text (JSON or urlencoded)
    Text(String),
    /// Multipart fields; the transport supplies the boundary header
    Form(FormData),
}

/// Prepared request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Body>,
    pub credentials: Credentials,
    pub redirect: Redirect,
    pub cache: Cache,
    pub referrer_policy: ReferrerPolicy,
    pub mode: Mode,
    pub keepalive: bool,
    pub integrity: String,
}

impl Request {
    pub fn new(method: Method, url: &str) -> Self {
        Self {
            method,
            url: url.to_string(),
            headers: Vec::new(),
            body: None,
            credentials: Credentials::default(),
            redirect: Redirect::default(),
            cache: Cache::default(),
            referrer_policy: ReferrerPolicy::default(),
            mode: Mode::default(),
            keepalive: true,
            integrity: String::new(),
        }
    }

    pub fn get(url: &str) -> Self {
        Self::new(Method::Get, url)
    }

    pub fn post(url: &str) -> Self {
        Self::new(Method::Post, url)
    }

    pub fn with_header(mut self, key: &str, value: &str) -> Self {
        self.headers.push((key.to_string(), value.to_string()));
        self
    }

    pub fn with_body(mut self, body: Body) -> Self {
        self.body = Some(body);
        self
    }

    /// Header value by case-insensitive name
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Body text, if the body is textual
    pub fn body_text(&self) -> Option<&str> {
        match &self.body {
            Some(Body::Text(s)) => Some(s),
            _ => None,
        }
    }

    /// Multipart fields, if the body is a form
    pub fn body_form(&self) -> Option<&FormData> {
        match &self.body {
            Some(Body::Form(f)) => Some(f),
            _ => None,
        }
    }
}

/// Raw response delivered by a transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub status_text: String,
    pub headers: Vec<(String, String)>,
    /// Body bytes, or the error raised while reading them
    pub body: Result<Vec<u8>, NetError>,
}

impl TransportResponse {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            status_text: String::new(),
            headers: Vec::new(),
            body: Ok(Vec::new()),
        }
    }
}

/// The host's fetch
pub trait Transport {
    /// Send `request`; resolves once headers and body are available
    fn fetch(&self, request: Request) -> LocalFuture<'_, Result<TransportResponse, NetError>>;
}

/// Blocking reqwest transport for native hosts
#[cfg(feature = "reqwest")]
pub struct ReqwestTransport {
    client: reqwest::blocking::Client,
}

#[cfg(feature = "reqwest")]
impl ReqwestTransport {
    pub fn new() -> Result<Self, NetError> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("cotomy/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| NetError::Network(e.to_string()))?;
        Ok(Self { client })
    }

    fn send(&self, request: Request) -> Result<TransportResponse, NetError> {
        tracing::info!("HTTP {} {}", request.method, request.url);

        let method = reqwest::Method::from_bytes(request.method.as_str().as_bytes())
            .map_err(|_| NetError::InvalidMethod(request.method.to_string()))?;
        let mut builder = self.client.request(method, &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if !request.integrity.is_empty() {
            tracing::debug!("integrity metadata is not verified by the native transport");
        }
        builder = match request.body {
            Some(Body::Text(text)) => builder.body(text),
            Some(Body::Form(form)) => builder.multipart(multipart(&form)?),
            None => builder,
        };

        let response = builder
            .send()
            .map_err(|e| NetError::Network(format!("Request failed: {}", e)))?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_str().unwrap_or_default().to_string()))
            .collect();
        // reqwest does not expose the reason phrase
        let body = response
            .bytes()
            .map(|b| b.to_vec())
            .map_err(|e| NetError::Body(e.to_string()));

        Ok(TransportResponse {
            status,
            status_text: String::new(),
            headers,
            body,
        })
    }
}

#[cfg(feature = "reqwest")]
fn multipart(form: &FormData) -> Result<reqwest::blocking::multipart::Form, NetError> {
    use cotomy_dom::FormDataValue;
    use reqwest::blocking::multipart::{Form, Part};

    let mut out = Form::new();
    for (name, value) in form.entries() {
        out = match value {
            FormDataValue::Text(text) => out.text(name.to_string(), text.clone()),
            FormDataValue::File(file) => {
                let part = Part::bytes(file.content.clone())
                    .file_name(file.filename.clone())
                    .mime_str(&file.mime_type)
                    .map_err(|e| NetError::Network(e.to_string()))?;
                out.part(name.to_string(), part)
            }
        };
    }
    Ok(out)
}

#[cfg(feature = "reqwest")]
impl Transport for ReqwestTransport {
    fn fetch(&self, request: Request) -> LocalFuture<'_, Result<TransportResponse, NetError>> {
        Box::pin(async move { self.send(request) })
    }
}
