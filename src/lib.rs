// Core modules
mod config;
mod types;

pub mod auth;
pub mod downstream;
pub mod oauth;
pub mod server;

// Re-export key types and functions
pub use config::RelayConfig;
pub use types::BearerToken;

pub use auth::{AuthError, AuthProvider, RequestContext, context_from_headers};
pub use downstream::{
    DownstreamClient, DownstreamError, DownstreamRequest, DownstreamResponse, DownstreamTransport,
    HttpTransport,
};
pub use oauth::{AuthorizationServerMetadata, OAuthRelay, ProtectedResourceMetadata};
pub use server::{AppState, create_router, start_relay};
