//! Auth provider strategies for outbound downstream calls.
//!
//! A provider is a process-wide strategy value, immutable after construction
//! and consulted freshly before every outbound call so credentials are never
//! cached stale. Exactly two behaviors exist, so the abstraction is a closed
//! tagged enum rather than an open trait.

use std::fmt;

use http::header::AUTHORIZATION;
use http::{HeaderMap, HeaderValue};

use crate::auth::context;
use crate::downstream::DownstreamResponse;

/// Failure to resolve credentials for an outbound call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// No usable credential exists for the current call.
    CredentialUnavailable,
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CredentialUnavailable => {
                write!(f, "No credential available for the downstream call")
            }
        }
    }
}

impl std::error::Error for AuthError {}

/// Source of outbound auth headers.
#[derive(Debug, Clone)]
pub enum AuthProvider {
    /// Fixed headers supplied at construction. Single-tenant deployments;
    /// cannot recover from an authentication failure.
    Static { headers: HeaderMap },
    /// Reads the bearer token from the current request's context and fails
    /// fast when none is present. No server-side refresh: the owning caller
    /// obtains a fresh token and retries the whole outer request.
    ContextBound,
    /// Test-only variant that asks the wrapper for one retry after an
    /// authentication failure, so the retry path stays exercised.
    #[cfg(test)]
    RetryOnce { headers: HeaderMap },
}

impl AuthProvider {
    /// Provider with a fixed set of outbound headers.
    pub fn static_headers(headers: HeaderMap) -> Self {
        Self::Static { headers }
    }

    /// Provider with a fixed `Authorization: Bearer <token>` header.
    pub fn static_bearer(token: &str) -> anyhow::Result<Self> {
        let value = HeaderValue::try_from(format!("Bearer {token}"))
            .map_err(|_| anyhow::anyhow!("static token is not a valid header value"))?;
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, value);
        Ok(Self::Static { headers })
    }

    /// Provider that forwards the current request's own credential.
    pub fn context_bound() -> Self {
        Self::ContextBound
    }

    /// Resolve the auth headers for the downstream call about to be issued.
    ///
    /// Resolution happens immediately before each call and is never cached
    /// across calls.
    pub fn auth_headers(&self) -> Result<HeaderMap, AuthError> {
        match self {
            Self::Static { headers } => Ok(headers.clone()),
            Self::ContextBound => {
                let token = context::bearer_token().ok_or(AuthError::CredentialUnavailable)?;
                if token.is_empty() {
                    return Err(AuthError::CredentialUnavailable);
                }
                let value = HeaderValue::try_from(format!("Bearer {}", token.as_str()))
                    .map_err(|_| AuthError::CredentialUnavailable)?;
                let mut headers = HeaderMap::new();
                headers.insert(AUTHORIZATION, value);
                Ok(headers)
            }
            #[cfg(test)]
            Self::RetryOnce { headers } => Ok(headers.clone()),
        }
    }

    /// React to an authentication-class failure (401/403) from downstream.
    ///
    /// Returns whether the caller should retry the call with freshly
    /// resolved headers. Neither production variant can refresh, so both
    /// decline.
    pub fn handle_auth_error(&self, _failed: &DownstreamResponse) -> bool {
        match self {
            Self::Static { .. } => false,
            Self::ContextBound => false,
            #[cfg(test)]
            Self::RetryOnce { .. } => true,
        }
    }
}
