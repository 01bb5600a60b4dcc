//! Cotomy Networking
//!
//! HTTP client used by Cotomy forms: request options, content-type body
//! transforms, a pluggable transport, response wrapper with cached JSON and
//! the status-to-exception mapping.

mod client;
mod error;
pub mod mock;
mod options;
mod response;
mod transport;

pub use client::{ApiClient, ApiClientBuilder, RequestBody, SubmitRequest};
pub use error::{ApiError, ApiException, ApiResult, ExceptionKind, status_message};
pub use options::{ApiOptions, Cache, Credentials, Mode, Redirect, ReferrerPolicy};
pub use response::ApiResponse;
#[cfg(feature = "reqwest")]
pub use transport::ReqwestTransport;
pub use transport::{Body, LocalFuture, Method, Request, Transport, TransportResponse};
pub use url::Url;

/// Network error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NetError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Unsupported method: {0}")]
    InvalidMethod(String),

    #[error("Failed to read response body: {0}")]
    Body(String),
}
