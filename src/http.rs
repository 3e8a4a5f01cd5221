//! Outbound HTTP model and transports.
//!
//! Requests and responses are plain owned values so that interceptors can
//! inspect and rewrite them. A [`Transport`] turns a request into either a
//! 2xx [`Response`] or an [`HttpFailure`]; non-success statuses are failures.

use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::http::HeaderMap;
use hyper::{Method, StatusCode};
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioExecutor;
use serde::Serialize;
use serde::de::DeserializeOwned;
use url::Url;

use crate::Result;

/// Boxed future for dyn-compatible async traits.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// An outbound request.
#[derive(Clone, Debug)]
pub struct Request {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl Request {
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url)
    }

    /// Request with a JSON body.
    pub fn json<T: Serialize>(method: Method, url: Url, body: &T) -> Result<Self> {
        let mut request = Self::new(method, url);
        request.body = Bytes::from(serde_json::to_vec(body)?);
        request.headers.insert(
            hyper::header::CONTENT_TYPE,
            hyper::http::HeaderValue::from_static("application/json"),
        );
        Ok(request)
    }

    /// Path component of the URL, without scheme, host or query.
    pub fn path(&self) -> &str {
        self.url.path()
    }
}

/// A successful response.
#[derive(Clone, Debug)]
pub struct Response {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl Response {
    pub fn new(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    /// Parse the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }
}

/// Why a request failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailureKind {
    /// The server answered with a non-success status.
    Status,
    /// The server could not be reached.
    Connect,
    /// No answer within the request timeout.
    Timeout,
    /// The request could not be built.
    Invalid,
}

/// A failed request, as seen by interceptors and callers.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
#[error("{method} {url} failed: {detail}")]
pub struct HttpFailure {
    pub method: Method,
    pub url: String,
    pub kind: FailureKind,
    /// `None` for transport-level failures.
    pub status: Option<StatusCode>,
    pub body: Bytes,
    pub detail: String,
}

impl HttpFailure {
    /// The server answered `status` with `body`.
    pub fn status(
        method: Method,
        url: impl Into<String>,
        status: StatusCode,
        body: impl Into<Bytes>,
    ) -> Self {
        Self {
            method,
            url: url.into(),
            kind: FailureKind::Status,
            status: Some(status),
            body: body.into(),
            detail: status.to_string(),
        }
    }

    /// The request never produced a status.
    pub fn transport(
        method: Method,
        url: impl Into<String>,
        kind: FailureKind,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            method,
            url: url.into(),
            kind,
            status: None,
            body: Bytes::new(),
            detail: detail.into(),
        }
    }

    /// Human-readable message carried in the error payload, if any.
    ///
    /// Looks for a `message` or `error` string in a JSON body.
    pub fn payload_message(&self) -> Option<String> {
        let value: serde_json::Value = serde_json::from_slice(&self.body).ok()?;
        ["message", "error"]
            .iter()
            .find_map(|key| value.get(key)?.as_str())
            .filter(|msg| !msg.trim().is_empty())
            .map(str::to_string)
    }
}

/// Result of sending a request.
pub type Outcome = std::result::Result<Response, HttpFailure>;

/// HTTP client abstraction the interceptor chain dispatches through.
pub trait Transport: Send + Sync {
    fn send(&self, request: Request) -> BoxFuture<'_, Outcome>;
}

/// [`Transport`] over hyper's pooled client.
#[derive(Clone)]
pub struct HyperTransport {
    client: Client<HttpConnector, Full<Bytes>>,
}

impl HyperTransport {
    pub fn new() -> Self {
        Self {
            client: Client::builder(TokioExecutor::new()).build_http(),
        }
    }
}

impl Default for HyperTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for HyperTransport {
    fn send(&self, request: Request) -> BoxFuture<'_, Outcome> {
        Box::pin(async move {
            let Request {
                method,
                url,
                headers,
                body,
            } = request;

            let mut builder = hyper::Request::builder()
                .method(method.clone())
                .uri(url.as_str());
            if let Some(h) = builder.headers_mut() {
                h.extend(headers);
            }
            let failed = |kind: FailureKind, detail: String| {
                HttpFailure::transport(method.clone(), url.as_str(), kind, detail)
            };
            let req = builder
                .body(Full::new(body))
                .map_err(|e| failed(FailureKind::Invalid, e.to_string()))?;

            let response = self
                .client
                .request(req)
                .await
                .map_err(|e| failed(FailureKind::Connect, e.to_string()))?;

            let (parts, incoming) = response.into_parts();
            let body = incoming
                .collect()
                .await
                .map_err(|e| failed(FailureKind::Connect, e.to_string()))?
                .to_bytes();

            if !parts.status.is_success() {
                return Err(HttpFailure::status(method, url, parts.status, body));
            }

            Ok(Response {
                status: parts.status,
                headers: parts.headers,
                body,
            })
        })
    }
}
