//! API response
//!
//! Shared, cheaply cloned response wrapper. The body is parsed as JSON at
//! most once; the parsed value is cached for every clone.

use std::cell::OnceCell;
use std::rc::Rc;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{ApiError, ApiResult};
use crate::{NetError, TransportResponse};

#[derive(Debug)]
struct ResponseInner {
    raw: TransportResponse,
    json: OnceCell<Value>,
}

/// Response wrapper; `ApiResponse::default()` is the unavailable response
#[derive(Debug, Clone, Default)]
pub struct ApiResponse {
    inner: Option<Rc<ResponseInner>>,
}

impl From<TransportResponse> for ApiResponse {
    fn from(raw: TransportResponse) -> Self {
        Self {
            inner: Some(Rc::new(ResponseInner {
                raw,
                json: OnceCell::new(),
            })),
        }
    }
}

impl ApiResponse {
    /// Response with no underlying HTTP exchange
    pub fn unavailable() -> Self {
        Self::default()
    }

    /// Whether an HTTP exchange backs this response
    pub fn available(&self) -> bool {
        self.inner.is_some()
    }

    /// Unavailable, or status 0
    pub fn empty(&self) -> bool {
        self.status() == 0
    }

    /// Check if response is OK (2xx)
    pub fn ok(&self) -> bool {
        (200..300).contains(&self.status())
    }

    pub fn status(&self) -> u16 {
        self.inner.as_ref().map_or(0, |i| i.raw.status)
    }

    pub fn status_text(&self) -> &str {
        self.inner.as_ref().map_or("", |i| i.raw.status_text.as_str())
    }

    /// Get header value
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers()
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Get all headers
    pub fn headers(&self) -> &[(String, String)] {
        match &self.inner {
            Some(inner) => &inner.raw.headers,
            None => &[],
        }
    }

    /// Get raw body bytes
    pub fn bytes(&self) -> Result<&[u8], NetError> {
        match &self.inner {
            Some(inner) => inner.raw.body.as_deref().map_err(Clone::clone),
            None => Ok(&[]),
        }
    }

    /// Get body as text
    pub fn text(&self) -> Result<String, NetError> {
        let bytes = self.bytes()?;
        String::from_utf8(bytes.to_vec()).map_err(|e| NetError::Body(e.to_string()))
    }

    fn parsed(&self, default: &Value) -> ApiResult<Value> {
        let Some(inner) = &self.inner else {
            return Ok(default.clone());
        };
        if let Some(value) = inner.json.get() {
            return Ok(if value.is_null() { default.clone() } else { value.clone() });
        }
        let text = self
            .text()
            .map_err(|e| ApiError::JsonParse(e.to_string()))?;
        let value = if text.is_empty() {
            default.clone()
        } else {
            serde_json::from_str(&text).map_err(|e| ApiError::JsonParse(e.to_string()))?
        };
        let value = inner.json.get_or_init(|| value);
        Ok(if value.is_null() { default.clone() } else { value.clone() })
    }

    /// Body parsed as a JSON value; `default` for an empty body
    pub fn object(&self, default: Value) -> ApiResult<Value> {
        self.parsed(&default)
    }

    /// Body parsed as a JSON array; `default` when empty or not an array
    pub fn array(&self, default: Vec<Value>) -> ApiResult<Vec<Value>> {
        match self.parsed(&Value::Array(default.clone()))? {
            Value::Array(items) => Ok(items),
            _ => Ok(default),
        }
    }

    /// Body deserialized into `T`
    pub fn json<T: DeserializeOwned>(&self) -> ApiResult<T> {
        let value = self.parsed(&Value::Null)?;
        serde_json::from_value(value).map_err(|e| ApiError::JsonParse(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn with_body(status: u16, body: &str) -> ApiResponse {
        let mut raw = TransportResponse::new(status);
        raw.body = Ok(body.as_bytes().to_vec());
        ApiResponse::from(raw)
    }

    #[test]
    fn test_unavailable_defaults() {
        let response = ApiResponse::unavailable();
        assert!(!response.available());
        assert!(response.empty());
        assert!(!response.ok());
        assert_eq!(response.text().unwrap(), "");
        assert_eq!(response.object(json!({"a": 1})).unwrap(), json!({"a": 1}));
    }

    #[test]
    fn test_empty_body_uses_default() {
        let response = with_body(200, "");
        assert_eq!(response.object(json!({})).unwrap(), json!({}));
        assert_eq!(response.array(vec![json!(1)]).unwrap(), vec![json!(1)]);
    }

    #[test]
    fn test_json_cached_across_clones() {
        let response = with_body(200, r#"{"name":"x"}"#);
        let clone = response.clone();
        assert_eq!(response.object(json!({})).unwrap()["name"], "x");
        assert_eq!(clone.object(json!({})).unwrap()["name"], "x");
        assert!(clone.inner.as_ref().unwrap().json.get().is_some());
    }

    #[test]
    fn test_array_of_object_body() {
        let response = with_body(200, r#"{"a":1}"#);
        assert_eq!(response.array(vec![]).unwrap(), Vec::<Value>::new());
        let response = with_body(200, "[1,2]");
        assert_eq!(response.array(vec![]).unwrap(), vec![json!(1), json!(2)]);
    }

    #[test]
    fn test_malformed_json() {
        let response = with_body(200, "{not json");
        assert!(matches!(response.object(json!({})), Err(ApiError::JsonParse(_))));
    }

    #[test]
    fn test_typed_json() {
        #[derive(serde::Deserialize)]
        struct User {
            id: u32,
        }
        let response = with_body(200, r#"{"id":7}"#);
        assert_eq!(response.json::<User>().unwrap().id, 7);
    }
}
