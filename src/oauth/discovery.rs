//! OAuth discovery documents served by the relay.
//!
//! Two fixed-shape metadata documents point callers at the relay's own
//! endpoints: protected-resource metadata (RFC 9728) and authorization
//! server metadata (RFC 8414). Both are config-echoing only; the relay's
//! endpoints in turn forward to the downstream authorization server.

use std::sync::Arc;

use axum::extract::State;
use axum::response::Json;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::RelayConfig;
use crate::server::AppState;

/// Protected resource metadata (RFC 9728).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtectedResourceMetadata {
    /// URL of the protected resource.
    pub resource: String,
    /// Authorization servers that can issue tokens for this resource.
    pub authorization_servers: Vec<String>,
    /// Bearer token methods supported.
    pub bearer_methods_supported: Vec<String>,
}

impl ProtectedResourceMetadata {
    pub fn from_config(config: &RelayConfig) -> Self {
        Self {
            resource: base_str(&config.public_url),
            authorization_servers: vec![base_str(&config.public_url)],
            bearer_methods_supported: vec!["header".to_string()],
        }
    }
}

/// Authorization server metadata (RFC 8414).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizationServerMetadata {
    pub issuer: String,
    pub authorization_endpoint: String,
    pub token_endpoint: String,
    pub response_types_supported: Vec<String>,
    /// Grant types the relay forwards; the downstream server decides what
    /// it actually accepts.
    pub grant_types_supported: Vec<String>,
    pub token_endpoint_auth_methods_supported: Vec<String>,
}

impl AuthorizationServerMetadata {
    pub fn from_config(config: &RelayConfig) -> Self {
        Self {
            issuer: base_str(&config.public_url),
            authorization_endpoint: config.public_endpoint("/authorize").to_string(),
            token_endpoint: config.public_endpoint("/token").to_string(),
            response_types_supported: vec!["code".to_string()],
            grant_types_supported: vec![
                "authorization_code".to_string(),
                "refresh_token".to_string(),
            ],
            token_endpoint_auth_methods_supported: vec!["client_secret_post".to_string()],
        }
    }
}

fn base_str(url: &Url) -> String {
    url.as_str().trim_end_matches('/').to_string()
}

/// `GET /.well-known/oauth-protected-resource`
pub async fn protected_resource_metadata(
    State(state): State<Arc<AppState>>,
) -> Json<ProtectedResourceMetadata> {
    Json(ProtectedResourceMetadata::from_config(&state.config))
}

/// `GET /.well-known/oauth-authorization-server`
pub async fn authorization_server_metadata(
    State(state): State<Arc<AppState>>,
) -> Json<AuthorizationServerMetadata> {
    Json(AuthorizationServerMetadata::from_config(&state.config))
}
