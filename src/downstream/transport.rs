//! Transport interface to the downstream API provider.
//!
//! [`DownstreamTransport`] is the raw `issue(method, path, headers, body)`
//! boundary between the relay core and the wire. The reqwest-backed
//! [`HttpTransport`] is the production implementation; tests substitute
//! recording fakes.

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use http::{HeaderMap, Method, StatusCode};
use url::Url;

/// One outbound request to the downstream service.
#[derive(Debug, Clone)]
pub struct DownstreamRequest {
    pub method: Method,
    /// Path and optional query string, relative to the transport's base URL.
    pub path: String,
    pub headers: HeaderMap,
    pub body: Option<Vec<u8>>,
}

impl DownstreamRequest {
    /// Create a request with no extra headers and no body.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: HeaderMap::new(),
            body: None,
        }
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_body(mut self, body: Vec<u8>) -> Self {
        self.body = Some(body);
        self
    }
}

/// Response from the downstream service. Any HTTP status is a successful
/// transport outcome; only failures to reach the service are errors.
#[derive(Debug, Clone)]
pub struct DownstreamResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl DownstreamResponse {
    /// Whether the downstream rejected the presented credential.
    pub fn is_auth_failure(&self) -> bool {
        matches!(
            self.status,
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN
        )
    }

    /// Body rendered as UTF-8 for logging and error payloads.
    pub fn body_string(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Transport-level failure reaching the downstream service.
#[derive(Debug, Clone)]
pub enum TransportError {
    /// The request target could not be constructed from the base URL.
    InvalidTarget(String),
    /// The service could not be reached or the connection failed mid-flight.
    Unavailable(String),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidTarget(msg) => write!(f, "Invalid downstream target: {}", msg),
            Self::Unavailable(msg) => write!(f, "Downstream unavailable: {}", msg),
        }
    }
}

impl std::error::Error for TransportError {}

/// Raw call interface to the downstream service.
///
/// The authenticated call wrapper is the only core-owned caller of this
/// interface; embedding applications may provide their own implementation
/// (e.g. to route through a service mesh or an in-process fake).
pub trait DownstreamTransport: Send + Sync {
    /// Issue one request and return the downstream response.
    fn issue(
        &self,
        request: DownstreamRequest,
    ) -> Pin<Box<dyn Future<Output = Result<DownstreamResponse, TransportError>> + Send + '_>>;
}

/// reqwest-backed transport targeting a fixed downstream base URL.
///
/// No timeouts are imposed here beyond what the supplied client carries;
/// deadline policy belongs to the client configuration, not the relay core.
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpTransport {
    /// Create a transport with a default client.
    pub fn new(base_url: Url) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    /// Create a transport with a caller-configured client (timeouts, proxies, TLS).
    pub fn with_client(client: reqwest::Client, base_url: Url) -> Self {
        Self { client, base_url }
    }

    /// Resolve a path-and-query string against the base URL, preserving any
    /// path prefix the base carries.
    fn target_url(&self, path_and_query: &str) -> Result<Url, TransportError> {
        let mut base = self.base_url.clone();
        if !base.path().ends_with('/') {
            base.set_path(&format!("{}/", base.path()));
        }
        base.join(path_and_query.trim_start_matches('/'))
            .map_err(|e| TransportError::InvalidTarget(format!("{path_and_query}: {e}")))
    }
}

impl DownstreamTransport for HttpTransport {
    fn issue(
        &self,
        request: DownstreamRequest,
    ) -> Pin<Box<dyn Future<Output = Result<DownstreamResponse, TransportError>> + Send + '_>>
    {
        Box::pin(async move {
            let url = self.target_url(&request.path)?;

            let mut builder = self
                .client
                .request(request.method.clone(), url)
                .headers(request.headers.clone());
            if let Some(body) = request.body {
                builder = builder.body(body);
            }

            let response = builder
                .send()
                .await
                .map_err(|e| TransportError::Unavailable(e.to_string()))?;

            let status = response.status();
            let headers = response.headers().clone();
            let body = response
                .bytes()
                .await
                .map_err(|e| TransportError::Unavailable(e.to_string()))?
                .to_vec();

            Ok(DownstreamResponse {
                status,
                headers,
                body,
            })
        })
    }
}
