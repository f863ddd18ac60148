//! Authenticated call wrapper around the downstream transport.
//!
//! Every outbound call to the downstream API goes through
//! [`DownstreamClient::call`]: headers are resolved from the auth provider
//! immediately before the call, and an authentication-class failure gives
//! the provider exactly one chance to request a retry with fresh headers.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::auth::{AuthError, AuthProvider};
use crate::downstream::transport::{
    DownstreamRequest, DownstreamResponse, DownstreamTransport, TransportError,
};

/// Failure of an authenticated downstream call.
#[derive(Debug)]
pub enum DownstreamError {
    /// No credential was resolvable; nothing was issued.
    CredentialUnavailable,
    /// Downstream rejected the credential (401/403) and the provider
    /// declined to retry. Carries the downstream response so callers can
    /// surface status and body unchanged.
    AuthenticationRejected(DownstreamResponse),
    /// Transport-level failure reaching the downstream service.
    Unavailable(String),
}

impl fmt::Display for DownstreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CredentialUnavailable => {
                write!(f, "No credential available for the downstream call")
            }
            Self::AuthenticationRejected(response) => {
                write!(f, "Downstream rejected authentication ({})", response.status)
            }
            Self::Unavailable(msg) => write!(f, "Downstream unavailable: {}", msg),
        }
    }
}

impl std::error::Error for DownstreamError {}

impl From<AuthError> for DownstreamError {
    fn from(error: AuthError) -> Self {
        match error {
            AuthError::CredentialUnavailable => Self::CredentialUnavailable,
        }
    }
}

impl From<TransportError> for DownstreamError {
    fn from(error: TransportError) -> Self {
        Self::Unavailable(error.to_string())
    }
}

/// Issues downstream calls with per-call auth header resolution.
#[derive(Clone)]
pub struct DownstreamClient {
    transport: Arc<dyn DownstreamTransport>,
    provider: AuthProvider,
}

impl DownstreamClient {
    pub fn new(transport: Arc<dyn DownstreamTransport>, provider: AuthProvider) -> Self {
        Self {
            transport,
            provider,
        }
    }

    /// Issue one authenticated call.
    ///
    /// Auth headers are resolved freshly, merged over the request's own
    /// headers, and the call is issued. On a 401/403 the provider is
    /// consulted once: if it asks for a retry the call is reissued exactly
    /// once with freshly resolved headers, otherwise the rejection is
    /// surfaced carrying the downstream status and body unchanged.
    /// Non-authentication statuses are returned as-is without consulting
    /// the provider.
    pub async fn call(
        &self,
        request: DownstreamRequest,
    ) -> Result<DownstreamResponse, DownstreamError> {
        let auth_headers = self.provider.auth_headers()?;
        let response = self
            .transport
            .issue(apply_auth_headers(request.clone(), &auth_headers))
            .await?;

        if !response.is_auth_failure() {
            return Ok(response);
        }

        if self.provider.handle_auth_error(&response) {
            debug!(
                status = %response.status,
                "Downstream rejected authentication, retrying once with fresh headers"
            );
            let auth_headers = self.provider.auth_headers()?;
            let retried = self
                .transport
                .issue(apply_auth_headers(request, &auth_headers))
                .await?;
            if retried.is_auth_failure() {
                return Err(DownstreamError::AuthenticationRejected(retried));
            }
            return Ok(retried);
        }

        warn!(
            status = %response.status,
            "Downstream rejected authentication, surfacing to caller"
        );
        Err(DownstreamError::AuthenticationRejected(response))
    }
}

/// Merge resolved auth headers over the request's own, auth winning on conflict.
fn apply_auth_headers(
    mut request: DownstreamRequest,
    auth_headers: &http::HeaderMap,
) -> DownstreamRequest {
    for (name, value) in auth_headers {
        request.headers.insert(name.clone(), value.clone());
    }
    request
}
