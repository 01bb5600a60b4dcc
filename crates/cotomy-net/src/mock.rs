//! In-memory transport
//!
//! Records every request and replays canned responses, so clients and forms
//! can be exercised without a network.

use std::cell::RefCell;
use std::rc::Rc;

use serde_json::Value;

use crate::{LocalFuture, Method, NetError, Request, Transport, TransportResponse};

/// Canned reply
#[derive(Debug, Clone)]
pub enum MockReply {
    Respond(TransportResponse),
    Fail(NetError),
    /// Never resolves; for abort tests
    Pending,
}

/// Response builder for [`MockTransport`]
#[derive(Debug, Clone)]
pub struct MockResponse {
    raw: TransportResponse,
}

impl MockResponse {
    pub fn status(status: u16) -> Self {
        Self {
            raw: TransportResponse::new(status),
        }
    }

    pub fn json(status: u16, value: Value) -> Self {
        Self::text(status, &value.to_string()).with_header("Content-Type", "application/json")
    }

    pub fn text(status: u16, body: &str) -> Self {
        let mut raw = TransportResponse::new(status);
        raw.body = Ok(body.as_bytes().to_vec());
        Self { raw }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.raw.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn with_status_text(mut self, text: &str) -> Self {
        self.raw.status_text = text.to_string();
        self
    }

    /// Body read fails with `message`
    pub fn with_body_error(mut self, message: &str) -> Self {
        self.raw.body = Err(NetError::Body(message.to_string()));
        self
    }
}

impl From<MockResponse> for MockReply {
    fn from(response: MockResponse) -> Self {
        MockReply::Respond(response.raw)
    }
}

#[derive(Debug)]
struct Route {
    method: Option<Method>,
    url: String,
    reply: MockReply,
}

#[derive(Debug, Default)]
struct MockState {
    routes: Vec<Route>,
    requests: Vec<Request>,
}

/// Recording transport; clones share routes and history
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    state: Rc<RefCell<MockState>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reply to `method url`; the latest matching route wins
    pub fn on(&self, method: Method, url: &str, reply: impl Into<MockReply>) -> &Self {
        self.state.borrow_mut().routes.push(Route {
            method: Some(method),
            url: url.to_string(),
            reply: reply.into(),
        });
        self
    }

    /// Reply to any method on `url`
    pub fn on_any(&self, url: &str, reply: impl Into<MockReply>) -> &Self {
        self.state.borrow_mut().routes.push(Route {
            method: None,
            url: url.to_string(),
            reply: reply.into(),
        });
        self
    }

    /// Requests seen so far
    pub fn requests(&self) -> Vec<Request> {
        self.state.borrow().requests.clone()
    }

    pub fn last_request(&self) -> Option<Request> {
        self.state.borrow().requests.last().cloned()
    }

    pub fn request_count(&self) -> usize {
        self.state.borrow().requests.len()
    }

    fn reply_for(&self, request: &Request) -> MockReply {
        let state = self.state.borrow();
        state
            .routes
            .iter()
            .rev()
            .find(|r| r.url == request.url && r.method.is_none_or(|m| m == request.method))
            .map(|r| r.reply.clone())
            .unwrap_or_else(|| {
                MockReply::Fail(NetError::Network(format!(
                    "no mock response for {} {}",
                    request.method, request.url
                )))
            })
    }
}

impl Transport for MockTransport {
    fn fetch(&self, request: Request) -> LocalFuture<'_, Result<TransportResponse, NetError>> {
        let reply = self.reply_for(&request);
        tracing::debug!("mock {} {}", request.method, request.url);
        self.state.borrow_mut().requests.push(request);
        Box::pin(async move {
            match reply {
                MockReply::Respond(raw) => Ok(raw),
                MockReply::Fail(error) => Err(error),
                MockReply::Pending => smol::future::pending().await,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latest_route_wins() {
        let mock = MockTransport::new();
        mock.on(Method::Get, "/a", MockResponse::status(200));
        mock.on(Method::Get, "/a", MockResponse::status(204));
        let raw = smol::block_on(mock.fetch(Request::get("/a"))).unwrap();
        assert_eq!(raw.status, 204);
        assert_eq!(mock.request_count(), 1);
    }

    #[test]
    fn test_unmatched_request_fails() {
        let mock = MockTransport::new();
        mock.on(Method::Post, "/a", MockResponse::status(200));
        let result = smol::block_on(mock.fetch(Request::get("/a")));
        assert!(matches!(result, Err(NetError::Network(_))));
    }
}
