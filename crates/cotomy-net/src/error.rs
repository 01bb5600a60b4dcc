//! API errors
//!
//! HTTP 4xx/5xx responses become an [`ApiException`] whose [`ExceptionKind`]
//! classifies the status.

use thiserror::Error;

use crate::{ApiResponse, NetError};

/// Result alias for client operations
pub type ApiResult<T> = Result<T, ApiError>;

/// Classification of a failing HTTP status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExceptionKind {
    /// 400, 422
    Validation,
    /// 401
    Unauthorized,
    /// 403
    Forbidden,
    /// 404
    NotFound,
    /// 409, 410
    Conflict,
    /// Any other 4xx
    Client,
    /// Any 5xx
    Server,
}

impl ExceptionKind {
    /// Kind for `status`, or `None` outside 400-599
    pub fn from_status(status: u16) -> Option<Self> {
        match status {
            400 | 422 => Some(Self::Validation),
            401 => Some(Self::Unauthorized),
            403 => Some(Self::Forbidden),
            404 => Some(Self::NotFound),
            409 | 410 => Some(Self::Conflict),
            402..=499 => Some(Self::Client),
            500..=599 => Some(Self::Server),
            _ => None,
        }
    }

    /// Every kind except `Server` is a client error
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Self::Server)
    }
}

/// Failing HTTP response
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ApiException {
    pub kind: ExceptionKind,
    pub status: u16,
    pub message: String,
    pub response: ApiResponse,
    /// Raw body text, or a placeholder when it could not be read
    pub body: String,
}

impl ApiException {
    /// Build from a response with a 4xx/5xx status
    pub fn from_response(response: ApiResponse) -> Option<Self> {
        let status = response.status();
        let kind = ExceptionKind::from_status(status)?;
        let message = if response.status_text().is_empty() {
            status_message(status)
        } else {
            response.status_text().to_string()
        };
        let body = response
            .text()
            .unwrap_or_else(|_| "No response body available".to_string());
        Some(Self {
            kind,
            status,
            message,
            response,
            body,
        })
    }
}

/// API client error
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    #[error(transparent)]
    Http(#[from] ApiException),

    #[error("Failed to parse JSON response: {0}")]
    JsonParse(String),

    #[error("Body must be an instance of FormData.")]
    InvalidFormDataBody,

    #[error("Request aborted")]
    Aborted,

    #[error(transparent)]
    Net(#[from] NetError),
}

impl ApiError {
    /// The HTTP exception, if this is one
    pub fn exception(&self) -> Option<&ApiException> {
        match self {
            Self::Http(e) => Some(e),
            _ => None,
        }
    }

    pub fn kind(&self) -> Option<ExceptionKind> {
        self.exception().map(|e| e.kind)
    }

    pub fn status(&self) -> Option<u16> {
        self.exception().map(|e| e.status)
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == Some(ExceptionKind::NotFound)
    }
}

/// Built-in message for `status`
pub fn status_message(status: u16) -> String {
    let message = match status {
        400 => "There is an error in the input. Please check and try again.",
        401 => "You are not authenticated. Please log in again.",
        402 => "Payment is required for this operation. Please check.",
        403 => "You do not have permission to use this feature. If necessary, please contact the administrator.",
        404 => "The specified information could not be found. It may have been deleted. Please start over or contact the administrator.",
        405 => "This operation is currently prohibited on the server.",
        406 => "The request cannot be accepted. Processing has been stopped.",
        407 => "Proxy authentication is required for internet access.",
        408 => "The request timed out. Please try again.",
        409 => "The identifier you are trying to register already exists. Please check the content and try again.",
        410 => "The requested resource is no longer available.",
        411 => "The Content-Length header field is required for the request.",
        412 => "The request failed because the precondition was not met.",
        413 => "The payload of the request is too large. Please check the size.",
        414 => "The request URI is too long.",
        415 => "The requested media type is not supported.",
        416 => "The requested range is invalid.",
        417 => "The server cannot meet the Expect header of the request.",
        421 => "The server cannot appropriately process this request.",
        422 => "There is an error in the request content.",
        423 => "The requested resource is locked.",
        424 => "The request failed due to dependency on a previous failed request.",
        426 => "A protocol upgrade is required to perform this operation.",
        428 => "This request requires a precondition.",
        429 => "Too many requests have been sent in a short time. Please wait and try again.",
        431 => "The request headers are too large.",
        500 => "An unexpected error occurred. Please try again later.",
        501 => "The server does not support the requested functionality.",
        502 => "The server is currently overloaded. Please wait and try again later.",
        503 => "The service is temporarily unavailable. Please try again later.",
        504 => "The communication timed out. Please try again.",
        505 => "The current communication method is not supported.",
        507 => "The server has insufficient storage.",
        508 => "The server detected a loop.",
        510 => "The request does not include the required extensions.",
        511 => "Network authentication is required.",
        _ => return format!("Unexpected error: {}", status),
    };
    message.to_string()
}
