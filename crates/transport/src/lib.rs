//! HTTP transport abstraction for the Berbix client
//!
//! Defines the `Transport` trait the client issues every request through.
//! `ReqwestTransport` is the production implementation; tests substitute a
//! recording stub. The transport owns everything about the wire: TLS,
//! connect/read timeouts, JSON encoding of the body, and status
//! classification. It knows nothing about tokens.

pub mod reqwest_transport;

pub use reqwest_transport::{ReqwestTransport, TransportConfig};

use reqwest::header::HeaderMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;

/// HTTP methods used by the Berbix API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

/// HTTP Basic credentials. A `None` password is sent as empty (`user:`).
#[derive(Clone)]
pub struct BasicAuth {
    pub username: String,
    pub password: Option<String>,
}

impl fmt::Debug for BasicAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicAuth")
            .field("username", &"[REDACTED]")
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// A single outbound request.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    /// Absolute URL (host + path)
    pub url: String,
    pub headers: HeaderMap,
    /// JSON body; `None` for GET/DELETE and body-less POSTs
    pub body: Option<serde_json::Value>,
    pub basic_auth: Option<BasicAuth>,
}

impl Request {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HeaderMap::new(),
            body: None,
            basic_auth: None,
        }
    }
}

/// Failures surfaced by a transport.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Any status outside [200, 300)
    #[error("unexpected status code returned: {status}")]
    UnexpectedStatus { status: u16 },

    /// Connection, TLS, or timeout failure
    #[error("HTTP request failed: {0}")]
    Request(String),

    /// 2xx response whose body is not valid JSON
    #[error("invalid response body: {0}")]
    Decode(String),

    #[error("failed to build HTTP client: {0}")]
    Build(String),
}

impl TransportError {
    /// HTTP status carried by the failure, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::UnexpectedStatus { status } => Some(*status),
            _ => None,
        }
    }
}

/// Result alias for transport operations.
pub type Result<T> = std::result::Result<T, TransportError>;

/// Performs one HTTP request and returns the parsed JSON body.
///
/// `Ok(None)` means the server answered 2xx with no content (204). Uses
/// `Pin<Box<dyn Future>>` so the client can hold an `Arc<dyn Transport>`.
pub trait Transport: Send + Sync {
    fn request(
        &self,
        request: Request,
    ) -> Pin<Box<dyn Future<Output = Result<Option<serde_json::Value>>> + Send + '_>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_maps_to_reqwest() {
        assert_eq!(reqwest::Method::from(Method::Get), reqwest::Method::GET);
        assert_eq!(reqwest::Method::from(Method::Post), reqwest::Method::POST);
        assert_eq!(reqwest::Method::from(Method::Patch), reqwest::Method::PATCH);
        assert_eq!(
            reqwest::Method::from(Method::Delete),
            reqwest::Method::DELETE
        );
        assert_eq!(Method::Patch.to_string(), "PATCH");
    }

    #[test]
    fn status_is_exposed_only_for_http_failures() {
        assert_eq!(
            TransportError::UnexpectedStatus { status: 401 }.status(),
            Some(401)
        );
        assert_eq!(TransportError::Request("reset".into()).status(), None);
    }

    #[test]
    fn basic_auth_debug_is_redacted() {
        let auth = BasicAuth {
            username: "sk_test_secret".into(),
            password: None,
        };
        let debug = format!("{auth:?}");
        assert!(!debug.contains("sk_test_secret"), "got: {debug}");
    }

    #[test]
    fn new_request_has_no_body_or_auth() {
        let req = Request::new(Method::Get, "https://api.berbix.com/v0/transactions");
        assert!(req.body.is_none());
        assert!(req.basic_auth.is_none());
        assert!(req.headers.is_empty());
    }
}
